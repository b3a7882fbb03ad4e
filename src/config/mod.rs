//! Process configuration, read once at startup.

use bon::Builder;

use crate::error::{PortalError, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Configuration for the relay server and the chat client.
///
/// Values come from the environment (see [`PortalConfig::from_env`]) or from
/// the builder:
///
/// ```
/// use portal_ai::config::PortalConfig;
///
/// let config = PortalConfig::builder()
///     .openai_api_key("sk-test")
///     .assistant_id("asst_123")
///     .build();
/// assert_eq!(config.require_assistant_id().unwrap(), "asst_123");
/// ```
#[derive(Clone, Builder)]
pub struct PortalConfig {
    #[builder(into)]
    pub openai_api_key: Option<String>,
    #[builder(into, default = DEFAULT_OPENAI_BASE_URL.to_string())]
    pub openai_base_url: String,
    #[builder(into)]
    pub assistant_id: Option<String>,
    /// Base URL of the genomics tool backend.
    #[builder(into)]
    pub tools_base_url: Option<String>,
    /// When set, only sessions whose email ends with `@<domain>` pass the gate.
    #[builder(into)]
    pub allowed_email_domain: Option<String>,
    #[builder(into, default = DEFAULT_BIND_ADDR.to_string())]
    pub bind_addr: String,
    /// Relay server the chat client talks to.
    #[builder(into, default = DEFAULT_SERVER_URL.to_string())]
    pub server_url: String,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| ".."))
            .field("openai_base_url", &self.openai_base_url)
            .field("assistant_id", &self.assistant_id)
            .field("tools_base_url", &self.tools_base_url)
            .field("allowed_email_domain", &self.allowed_email_domain)
            .field("bind_addr", &self.bind_addr)
            .field("server_url", &self.server_url)
            .finish()
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PortalConfig {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            assistant_id: get("OPENAI_ASSISTANT_ID"),
            tools_base_url: get("PORTAL_API_BASE_URL"),
            allowed_email_domain: get("ALLOWED_EMAIL_DOMAIN"),
            bind_addr: get("PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            server_url: get("PORTAL_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        require(&self.openai_api_key, "OPENAI_API_KEY")
    }

    pub fn require_assistant_id(&self) -> Result<&str> {
        require(&self.assistant_id, "OPENAI_ASSISTANT_ID")
    }

    pub fn require_tools_base_url(&self) -> Result<&str> {
        require(&self.tools_base_url, "PORTAL_API_BASE_URL")
    }
}

fn require<'a>(value: &'a Option<String>, var: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| PortalError::Configuration(format!("Missing {var}")))
}
