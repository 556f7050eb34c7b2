//! Command-line interface definitions
//!
//! Provides CLI argument parsing using clap for the one-shot collector.

use std::path::PathBuf;

use clap::Parser;

use crate::types::{CollectorConfig, DEFAULT_HELPER, HELPER_ENV_VAR, Parameter};

/// Collect the attributes of a login session the way the session daemon does
#[derive(Parser, Debug, Clone)]
#[command(name = "seatkit-collect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// User owning the session
    #[arg(long)]
    pub uid: u32,

    /// Process that opened the session
    #[arg(long)]
    pub pid: u32,

    /// PAM service name of the requesting login manager
    #[arg(long, value_name = "NAME")]
    pub service: Option<String>,

    /// Override a parameter (repeatable); `id` and `cookie` are ignored
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<Parameter>,

    /// Helper command line used to discover session attributes
    #[arg(long, value_name = "CMD", env = HELPER_ENV_VAR, default_value = DEFAULT_HELPER)]
    pub helper: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable diagnostic mode (auto-log to temp file)
    #[arg(short, long)]
    pub diagnostic: bool,

    /// Log directory (implies diagnostic mode)
    #[arg(short = 'l', long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log file name (implies diagnostic mode)
    #[arg(short = 'f', long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    /// Note: RUST_LOG env var takes priority over this flag
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    /// Note: RUST_LOG env var takes priority over this flag
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_override(assignment: &str) -> Result<Parameter, String> {
    Parameter::parse_assignment(assignment)
        .ok_or_else(|| format!("expected KEY=VALUE, got `{assignment}`"))
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            uid: 0,
            pid: 0,
            service: None,
            overrides: Vec::new(),
            helper: DEFAULT_HELPER.to_string(),
            json: false,
            diagnostic: false,
            log_dir: None,
            log_file: None,
            verbose: 0,
            quiet: false,
        }
    }
}

impl Cli {
    /// Collector configuration selected on the command line
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::new(self.helper.clone())
    }

    /// Check if diagnostic mode is enabled (output to file)
    ///
    /// Returns true if `--diagnostic` is set, or if `--log-dir` or `--log-file` is specified.
    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic || self.log_dir.is_some() || self.log_file.is_some()
    }

    /// Get the log level based on CLI arguments
    ///
    /// - `--quiet`: ERROR
    /// - default: WARN
    /// - `-v`: INFO
    /// - `-vv`: DEBUG
    /// - `-vvv` or more: TRACE
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::WARN,
                1 => tracing::Level::INFO,
                2 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }

    /// Get the log file path for diagnostic mode
    ///
    /// Uses the specified log directory and file name, or defaults to:
    /// - Directory: system temp directory
    /// - File: `seatkit-collect-{timestamp}.log`
    pub fn log_path(&self) -> PathBuf {
        let dir = self.log_dir.clone().unwrap_or_else(std::env::temp_dir);

        let filename = self.log_file.clone().unwrap_or_else(|| {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            format!("seatkit-collect-{timestamp}.log")
        });

        dir.join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["seatkit-collect", "--uid", "1000", "--pid", "42"]).unwrap();
        assert_eq!(cli.uid, 1000);
        assert_eq!(cli.pid, 42);
        assert!(cli.overrides.is_empty());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "seatkit-collect",
            "--uid",
            "0",
            "--pid",
            "1",
            "--set",
            "is-local=false",
            "--set",
            "seat=seat1",
        ])
        .unwrap();
        assert_eq!(
            cli.overrides,
            vec![
                Parameter::boolean("is-local", false),
                Parameter::string("seat", "seat1"),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_override() {
        let result =
            Cli::try_parse_from(["seatkit-collect", "--uid", "0", "--pid", "1", "--set", "oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_helper_flag() {
        let cli = Cli::try_parse_from([
            "seatkit-collect",
            "--uid",
            "0",
            "--pid",
            "1",
            "--helper",
            "/bin/sh /tmp/helper.sh",
        ])
        .unwrap();
        assert_eq!(cli.collector_config().helper, "/bin/sh /tmp/helper.sh");
    }

    #[test]
    fn test_default_cli() {
        let cli = Cli::default();
        assert!(!cli.is_diagnostic());
        assert_eq!(cli.log_level(), tracing::Level::WARN);
        assert_eq!(cli.collector_config().helper, DEFAULT_HELPER);
    }

    #[test]
    fn test_log_dir_implies_diagnostic() {
        let cli = Cli {
            log_dir: Some(PathBuf::from("/tmp")),
            ..Default::default()
        };
        assert!(cli.is_diagnostic());
    }

    #[test]
    fn test_log_levels() {
        let cli = Cli {
            quiet: true,
            verbose: 3,
            ..Default::default()
        };
        assert_eq!(cli.log_level(), tracing::Level::ERROR);

        let cli = Cli {
            verbose: 2,
            ..Default::default()
        };
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);

        let cli = Cli {
            verbose: 5,
            ..Default::default()
        };
        assert_eq!(cli.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_log_path_custom_dir() {
        let cli = Cli {
            log_dir: Some(PathBuf::from("/var/log")),
            log_file: Some("collect.log".to_string()),
            ..Default::default()
        };
        assert_eq!(cli.log_path(), PathBuf::from("/var/log/collect.log"));
    }

    #[test]
    fn test_log_path_default_generates_timestamp() {
        let cli = Cli::default();
        let path = cli.log_path();

        assert!(path.starts_with(std::env::temp_dir()));
        let filename = path.file_name().unwrap().to_str().unwrap();
        assert!(filename.starts_with("seatkit-collect-"));
        assert!(filename.ends_with(".log"));
    }
}
