//! Server configuration
//!
//! Resolved once at startup from the command line and environment.

use std::env;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Environment variable overriding the listen address
pub const ADDR_ENV: &str = "CHAT_ADDR";

/// Nickname given to every new session
pub const DEFAULT_NICKNAME: &str = "anonymous";

/// Longest accepted input line, terminator included
pub const DEFAULT_MAX_LINE_LEN: usize = 2048;

/// Output chunks queued per client before further output is refused
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub addr: String,
    /// Nickname a session starts with
    pub default_nickname: String,
    /// Longest accepted input line in bytes
    pub max_line_len: usize,
    /// Per-client output queue size
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            default_nickname: DEFAULT_NICKNAME.to_string(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build from process arguments and environment
    ///
    /// The first CLI argument wins, then `CHAT_ADDR`, then the default.
    pub fn from_env() -> Self {
        Self::resolve(env::args().nth(1), env::var(ADDR_ENV).ok())
    }

    fn resolve(arg: Option<String>, env_addr: Option<String>) -> Self {
        let present = |addr: &String| !addr.trim().is_empty();
        let addr = arg
            .filter(present)
            .or(env_addr.filter(present))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        Self {
            addr,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(None, None);
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.default_nickname, "anonymous");
    }

    #[test]
    fn test_arg_beats_env() {
        let config = ServerConfig::resolve(
            Some("0.0.0.0:9000".to_string()),
            Some("127.0.0.1:7000".to_string()),
        );
        assert_eq!(config.addr, "0.0.0.0:9000");

        let config = ServerConfig::resolve(None, Some("127.0.0.1:7000".to_string()));
        assert_eq!(config.addr, "127.0.0.1:7000");
    }

    #[test]
    fn test_blank_value_falls_back() {
        let config = ServerConfig::resolve(None, Some("  ".to_string()));
        assert_eq!(config.addr, DEFAULT_ADDR);
    }

    #[test]
    fn test_blank_arg_does_not_hide_env() {
        let config =
            ServerConfig::resolve(Some(String::new()), Some("127.0.0.1:7000".to_string()));
        assert_eq!(config.addr, "127.0.0.1:7000");
    }
}
