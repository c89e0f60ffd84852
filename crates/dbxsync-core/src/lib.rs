//! dbxsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RemoteFile`, `LocalFile`, `Action`, `RelativePath`, `Cursor`
//! - **Content hash** - Dropbox's block-based SHA-256 content identity
//! - **Port definitions** - `IRemoteStore`, the capability surface of the remote store
//! - **Configuration** - YAML config file with root pairs and app credentials
//!
//! # Architecture
//!
//! The domain module contains pure data types with no I/O beyond hashing.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
