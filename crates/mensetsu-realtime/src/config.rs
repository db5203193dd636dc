//! Connection configuration for the live realtime variant.

use secrecy::SecretString;

pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_VOICE: &str = "alloy";

/// Channel capacity for both the outbound queue and the event stream.
const DEFAULT_CAPACITY: usize = 1024;

pub struct ConnectionConfig {
    pub api_key: SecretString,
    pub url: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub capacity: usize,
}

impl ConnectionConfig {
    pub fn new(api_key: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            url: DEFAULT_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: instructions.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}
