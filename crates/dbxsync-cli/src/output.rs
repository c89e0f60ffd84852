//! Command output, human-readable or JSON
//!
//! Logs go to stderr through `tracing`; this is what a command reports to
//! the user on stdout.

use std::path::Path;

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn warn(&self, message: &str);
    /// One synchronized pair, announced when `sync` starts it
    fn folder_pair(&self, local: &Path, remote: &str);
    /// Final line of a `sync` run that ended without error
    fn sync_stopped(&self, folders: usize);
    fn print_json(&self, value: &Value);
}

/// `/notes` stays as is, the Dropbox root is shown as `/`
fn display_remote(remote: &str) -> &str {
    if remote.is_empty() {
        "/"
    } else {
        remote
    }
}

fn folder_pair_line(local: &Path, remote: &str) -> String {
    format!("{} <-> Dropbox:{}", local.display(), display_remote(remote))
}

fn folder_pair_json(local: &Path, remote: &str) -> Value {
    json!({
        "event": "folder",
        "local": local.display().to_string(),
        "remote": display_remote(remote),
    })
}

fn sync_stopped_json(folders: usize) -> Value {
    json!({"success": true, "event": "stopped", "folders": folders})
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn folder_pair(&self, local: &Path, remote: &str) {
        println!("  {}", folder_pair_line(local, remote));
    }
    fn sync_stopped(&self, folders: usize) {
        println!("\u{2713} Stopped syncing {} folder(s)", folders);
    }
    fn print_json(&self, _value: &Value) {}
}

/// JSON output formatter, one object per line
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json!({"success": true, "message": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", json!({"level": "warning", "message": message}));
    }
    fn folder_pair(&self, local: &Path, remote: &str) {
        println!("{}", folder_pair_json(local, remote));
    }
    fn sync_stopped(&self, folders: usize) {
        println!("{}", sync_stopped_json(folders));
    }
    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
