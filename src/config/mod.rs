//! Server configuration from the process environment.
//!
//! `.env` files are honored (loaded by `main` before anything reads the
//! environment). The API credential is the only hard requirement:
//! without it the process refuses to start, so a missing key is never
//! discovered mid-session.

use crate::core::LiveConfig;
use crate::core::live::config::{DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION};
use crate::errors::{RelayError, RelayResult};

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host for the relay server
    pub host: String,
    /// Bind port for the relay server
    pub port: u16,
    /// API key for the remote live endpoint (required)
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// System instruction for the assistant
    pub system_instruction: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Fails fast when `GOOGLE_API_KEY` is absent or a present value
    /// cannot be parsed.
    pub fn from_env() -> RelayResult<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(RelayError::MissingConfig("GOOGLE_API_KEY"))?;

        let host = std::env::var("PARLANCE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match std::env::var("PARLANCE_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| RelayError::InvalidConfig(format!("PARLANCE_PORT: {raw:?}")))?,
            Err(_) => DEFAULT_PORT,
        };
        let model =
            std::env::var("PARLANCE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let system_instruction = std::env::var("PARLANCE_SYSTEM_INSTRUCTION")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_INSTRUCTION.to_string());

        Ok(Self {
            host,
            port,
            api_key,
            model,
            system_instruction,
        })
    }

    /// Bind address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Live-session configuration for one connection.
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig::new(self.api_key.clone())
            .with_model(self.model.clone())
            .with_system_instruction(self.system_instruction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "GOOGLE_API_KEY",
            "PARLANCE_HOST",
            "PARLANCE_PORT",
            "PARLANCE_MODEL",
            "PARLANCE_SYSTEM_INSTRUCTION",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_missing_api_key_is_fatal() {
        clear_env();
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, RelayError::MissingConfig("GOOGLE_API_KEY")));
    }

    #[test]
    #[serial]
    fn test_defaults_with_key_present() {
        clear_env();
        unsafe { std::env::set_var("GOOGLE_API_KEY", "test-key") };
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "0.0.0.0:8000");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.live_config().api_key, "test-key");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_rejected() {
        clear_env();
        unsafe {
            std::env::set_var("GOOGLE_API_KEY", "test-key");
            std::env::set_var("PARLANCE_PORT", "not-a-port");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(RelayError::InvalidConfig(_))
        ));
        clear_env();
    }
}
