//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote content store operations (Dropbox)

pub mod remote_store;

pub use remote_store::{EntryTag, IRemoteStore, ListFolderPage, LongPollResult, RemoteEntry};
