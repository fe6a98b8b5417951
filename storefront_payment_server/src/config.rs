use std::env;

use log::*;
use spg_common::Secret;

use crate::errors::ServerError;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 5000;
const DEFAULT_EMAIL_PORT: u16 = 587;
/// Webhook events whose timestamp deviates more than this from the server clock are rejected.
const DEFAULT_SIG_TOLERANCE_SECS: i64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Storefront origin allowed to call the API cross-origin. When unset, any origin is allowed.
    pub frontend_url: Option<String>,
    pub stripe_secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub signature_tolerance_secs: i64,
    /// Outbound mail settings. `None` disables notification emails; everything else keeps working.
    pub email: Option<EmailConfig>,
}

impl ServerConfig {
    /// Assemble the configuration from the environment.
    ///
    /// The database URL, processor secret key and webhook signing secret have no sensible defaults; a missing
    /// value is a fatal startup condition, not a per-request error.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}.");
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = required_env("SPG_DATABASE_URL")?;
        let stripe_secret_key = Secret::new(required_env("SPG_STRIPE_SECRET_KEY")?);
        let webhook_secret = Secret::new(required_env("SPG_STRIPE_WEBHOOK_SECRET")?);
        let signature_tolerance_secs = env::var("SPG_STRIPE_SIG_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid value for SPG_STRIPE_SIG_TOLERANCE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SIG_TOLERANCE_SECS);
        let frontend_url = env::var("SPG_FRONTEND_URL").ok();
        if frontend_url.is_none() {
            warn!("🪛️ SPG_FRONTEND_URL is not set. Cross-origin requests will be accepted from any origin.");
        }
        let email = EmailConfig::from_env_or_none();
        info!(
            "🪛️ Configuration loaded. Database: set. Processor key: set. Webhook secret: set. Email: {}.",
            if email.is_some() { "configured" } else { "disabled" }
        );
        Ok(Self {
            host,
            port,
            database_url,
            frontend_url,
            stripe_secret_key,
            webhook_secret,
            signature_tolerance_secs,
            email,
        })
    }
}

fn required_env(name: &str) -> Result<String, ServerError> {
    env::var(name).map_err(|_| {
        ServerError::ConfigurationError(format!("{name} is not set. The server cannot run without it."))
    })
}

//-------------------------------------------------  EmailConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    /// Back-office recipient for the second copy of each confirmation.
    pub office_address: String,
}

impl EmailConfig {
    /// Email is optional: if any required variable is missing the notifier is disabled with a warning, and the
    /// rest of the gateway keeps running.
    pub fn from_env_or_none() -> Option<Self> {
        let vars = ["SPG_EMAIL_HOST", "SPG_EMAIL_USER", "SPG_EMAIL_PASSWORD", "SPG_OFFICE_EMAIL"];
        let missing = vars.iter().filter(|v| env::var(v).is_err()).copied().collect::<Vec<_>>();
        if !missing.is_empty() {
            warn!(
                "🪛️ Email is not fully configured (missing {}). Order notification emails are disabled.",
                missing.join(", ")
            );
            return None;
        }
        let port = env::var("SPG_EMAIL_PORT")
            .ok()
            .and_then(|s| {
                s.parse::<u16>().map_err(|e| warn!("🪛️ Invalid value for SPG_EMAIL_PORT. {e}")).ok()
            })
            .unwrap_or(DEFAULT_EMAIL_PORT);
        Some(Self {
            host: env::var("SPG_EMAIL_HOST").ok()?,
            port,
            username: env::var("SPG_EMAIL_USER").ok()?,
            password: Secret::new(env::var("SPG_EMAIL_PASSWORD").ok()?),
            office_address: env::var("SPG_OFFICE_EMAIL").ok()?,
        })
    }
}
