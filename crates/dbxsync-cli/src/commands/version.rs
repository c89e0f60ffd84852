//! Version command - Build metadata

use std::fmt;

use anyhow::Result;
use clap::Args;

use crate::output::{OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct VersionCommand;

impl VersionCommand {
    pub fn execute(&self, format: OutputFormat, fmt: &dyn OutputFormatter) -> Result<()> {
        let info = VersionInfo::current();
        match format {
            OutputFormat::Json => fmt.print_json(&info.to_json()),
            OutputFormat::Human => println!("{info}"),
        }
        Ok(())
    }
}

/// Version, platform and build details of the running binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    /// `os/arch`
    pub platform: String,
    /// Set through `DBXSYNC_GIT_COMMIT` at build time
    pub commit: Option<&'static str>,
    /// `debug` or `release`
    pub profile: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            commit: option_env!("DBXSYNC_GIT_COMMIT"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "version": self.version,
            "platform": self.platform,
            "commit": self.commit,
            "profile": self.profile,
        })
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dbxsync {}", self.version)?;
        writeln!(f, "platform: {}", self.platform)?;
        writeln!(f, "commit:   {}", self.commit.unwrap_or("unknown"))?;
        write!(f, "profile:  {}", self.profile)
    }
}
