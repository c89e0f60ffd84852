//! Integration tests for dbxsync-dropbox
//!
//! Uses wiremock to simulate the Dropbox API and verifies end-to-end
//! behavior of the DropboxClient: listing, long-poll, metadata lookup,
//! uploads, downloads and error reporting.

mod common;

mod test_files;
mod test_list_folder;
