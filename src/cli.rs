//! CLI argument parsing, validation, and startup helpers.

use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::ServerConfig;
use crate::db::Database;
use crate::mailer::Mailer;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "geogate", about = "Country catalog API with bearer-session authentication")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7310")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "geogate.db")]
    pub database: String,

    /// Path to file containing the token signing secret. Prefer using TOKEN_SECRET env var instead
    #[arg(long)]
    pub token_secret_file: Option<String>,

    /// Base URL of the upstream country data API. When set, the catalog is
    /// refreshed on startup and every 24 hours
    #[arg(long)]
    pub country_api_url: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the token signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_token_secret(token_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("TOKEN_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("TOKEN_SECRET") };
        secret
    } else if let Some(path) = token_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set TOKEN_SECRET environment variable (recommended) or use --token-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "Token secret is shorter than {} characters. Use a longer secret",
            MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the country API base URL.
/// Returns None and logs an error if validation fails.
pub fn validate_country_api_url(raw: &str) -> Option<Url> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %raw, error = %e, "Invalid country API URL");
            return None;
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        error!(url = %raw, "Country API URL must use http or https");
        return None;
    }

    Some(url)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(db: Database, token_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        token_secret: token_secret.into_bytes(),
        mailer: Mailer::new(),
    }
}
