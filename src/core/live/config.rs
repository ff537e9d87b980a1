//! Live session configuration and endpoint constants.

/// WebSocket endpoint for the bidirectional generate-content stream.
pub const LIVE_WS_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Default model if not specified.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Default system instruction for the assistant.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You're an expert assistant, you work by the principles of scientific method, \
     you're curious, you ask questions to understand the user's problem deeply. \
     You provide detailed, clear and concise answers without leaving any room for ambiguity. \
     Please introduce yourself (nicely!) and ask the user how they're feeling today.";

/// Configuration for one live session.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// API key for authentication
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// System instruction for the assistant
    pub system_instruction: Option<String>,
    /// Enable the hosted search tool
    pub search_tool: bool,
    /// Requested response modalities; audio-only in both deployment
    /// shapes
    pub response_modalities: Vec<String>,
}

impl LiveConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            search_tool: true,
            response_modalities: vec!["AUDIO".to_string()],
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Full endpoint URL with the key attached.
    pub fn endpoint_url(&self) -> String {
        format!("{LIVE_WS_ENDPOINT}?key={}", self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LiveConfig::new("test-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.search_tool);
        assert_eq!(config.response_modalities, vec!["AUDIO"]);
        assert!(config.system_instruction.is_some());
    }

    #[test]
    fn test_endpoint_url_carries_key() {
        let config = LiveConfig::new("abc123");
        assert!(config.endpoint_url().ends_with("?key=abc123"));
        assert!(config.endpoint_url().starts_with("wss://"));
    }
}
