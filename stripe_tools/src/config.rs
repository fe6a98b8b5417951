use log::*;
use spg_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeApiConfig {
    pub api_base: String,
    pub secret_key: Secret<String>,
}

impl Default for StripeApiConfig {
    fn default() -> Self {
        Self { api_base: DEFAULT_API_BASE.to_string(), secret_key: Secret::default() }
    }
}

impl StripeApiConfig {
    pub fn new(secret_key: Secret<String>) -> Self {
        Self { secret_key, ..Default::default() }
    }

    /// Point the client at a different API host. Used by tests to talk to a local stub server.
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("SPG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("SPG_STRIPE_SECRET_KEY not set. Payment intent creation will fail until it is configured.");
            String::default()
        }));
        let api_base = std::env::var("SPG_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self { api_base, secret_key }
    }
}
