//! Configuration from the environment

/// Where the recipe backend lives
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub user_agent: String,
}

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            user_agent: concat!("grace_kitchen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("GRACE_API_BASE")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.base_url),
            user_agent: defaults.user_agent,
        }
    }
}

/// Output format for the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("GRACE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}
