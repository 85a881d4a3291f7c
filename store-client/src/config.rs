//! Client configuration

/// Configuration for connecting to the hosted store backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Auth API base URL (e.g. "https://backend.example/api:auth")
    pub auth_base: String,

    /// Store API base URL (products, orders, order items)
    pub store_base: String,

    /// Bearer token for authenticated requests
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Create a configuration where auth lives under `<base>/auth`
    pub fn new(store_base: impl Into<String>) -> Self {
        let store_base = store_base.into();
        let store_base = store_base.trim_end_matches('/').to_string();
        Self {
            auth_base: format!("{store_base}/auth"),
            store_base,
            token: None,
            timeout: 30,
        }
    }

    /// Set a distinct auth base URL
    pub fn with_auth_base(mut self, auth_base: impl Into<String>) -> Self {
        self.auth_base = auth_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the environment (reads `.env` first).
    ///
    /// Variables: `BEYSTORE_STORE_BASE` (required), `BEYSTORE_AUTH_BASE`
    /// (defaults to `<store_base>/auth`), `BEYSTORE_TOKEN` (optional).
    pub fn from_env() -> Result<Self, std::env::VarError> {
        dotenv::dotenv().ok();
        let store_base = std::env::var("BEYSTORE_STORE_BASE")?;
        let mut config = Self::new(store_base);
        if let Ok(auth_base) = std::env::var("BEYSTORE_AUTH_BASE") {
            config = config.with_auth_base(auth_base);
        }
        if let Ok(token) = std::env::var("BEYSTORE_TOKEN") {
            if !token.is_empty() {
                config = config.with_token(token);
            }
        }
        Ok(config)
    }
}
