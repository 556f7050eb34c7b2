//! Collector configuration from environment variables

/// Environment variable naming the helper command
pub const HELPER_ENV_VAR: &str = "SEATKIT_COLLECT_HELPER";

/// Helper command used when nothing else is configured
pub const DEFAULT_HELPER: &str = "/usr/libexec/ck-collect-session-info";

/// Configuration for session parameter collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Helper command line prefix
    ///
    /// This is a command line, not a bare path: it may name an interpreter
    /// followed by a script. `--uid <uid> --pid <pid>` is appended to it.
    /// Environment variable: `SEATKIT_COLLECT_HELPER`
    pub helper: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            helper: DEFAULT_HELPER.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Create a configuration with an explicit helper command
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let helper = lookup(HELPER_ENV_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HELPER.to_string());

        Self { helper }
    }

    /// Command line used to collect parameters for one session
    pub fn helper_command(&self, uid: u32, pid: u32) -> String {
        format!("{} --uid {} --pid {}", self.helper, uid, pid)
    }
}
