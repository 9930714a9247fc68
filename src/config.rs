//! Command line and environment configuration.
//!
//! Every setting is a flag with an environment fallback, so the same binary
//! runs from a shell or from a container's env file.

use crate::application::auth::{AuthSettings, DEFAULT_FRONTEND_URL, parse_expiry};
use crate::error::{PosError, Result};
use crate::interfaces::http::state::HttpSettings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "restopos", author, version, about = "Restaurant point-of-sale API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API (the default)
    Serve,
    /// Create the owner account if none exists yet
    SeedOwner {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Set a new password for an existing account
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Load menu items from a CSV file
    ImportMenu {
        /// CSV with header name,price,category,subcategory,description,image_url,is_available
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000, global = true)]
    pub port: u16,

    /// HS256 signing key for bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    /// Token lifetime, e.g. 7d, 12h, 30m
    #[arg(long, env = "JWT_EXPIRES_IN", default_value = "7d", global = true)]
    pub jwt_expires_in: String,

    #[arg(long, env = "MIDTRANS_SERVER_KEY", hide_env_values = true, global = true)]
    pub midtrans_server_key: Option<String>,

    #[arg(long, env = "MIDTRANS_CLIENT_KEY", global = true)]
    pub midtrans_client_key: Option<String>,

    /// Use the production Snap endpoint instead of the sandbox
    #[arg(long, env = "MIDTRANS_IS_PRODUCTION", global = true)]
    pub midtrans_production: bool,

    /// Frontend origin, used for CORS and password reset links
    #[arg(long, env = "FRONTEND_URL", global = true)]
    pub frontend_url: Option<String>,

    /// `development` also allows any http://localhost:<port> origin
    #[arg(long, env = "APP_ENV", default_value = "development", global = true)]
    pub environment: String,

    /// Take the client address from X-Forwarded-For
    #[arg(long, env = "TRUST_PROXY", global = true)]
    pub trust_proxy: bool,

    /// Name used in outgoing mail
    #[arg(long, env = "APP_NAME", default_value = "POS SO", global = true)]
    pub app_name: String,

    /// Path to persistent database (optional). Requires the storage-rocksdb feature.
    #[arg(long, env = "DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: bool,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// The secret, which the API cannot run without.
    pub fn require_jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PosError::Config("JWT_SECRET is required".into()))
    }

    pub fn auth_settings(&self) -> Result<AuthSettings> {
        let mut settings = AuthSettings::new(self.jwt_secret.clone().unwrap_or_default());
        settings.token_ttl = parse_expiry(&self.jwt_expires_in)?;
        settings.frontend_url = self
            .frontend_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        Ok(settings)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            trust_proxy: self.trust_proxy,
            frontend_url: self.frontend_url.clone(),
            development: self.is_development(),
            midtrans_client_key: self.midtrans_client_key.clone(),
            ..HttpSettings::default()
        }
    }
}
