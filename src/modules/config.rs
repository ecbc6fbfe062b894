use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::{AppError, AppResult};

/// Gateway configuration, sourced from the process environment at startup.
///
/// A missing or malformed required variable is a startup error; nothing here
/// is re-read at runtime.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address.
    pub bind_address: String,
    /// Listen port.
    pub port: u16,
    /// Frontend origin allowed by CORS.
    pub frontend_origin: String,

    /// Authority endpoint issuing bearer tokens.
    pub token_endpoint: String,
    /// Fixed service credentials for the authority endpoint.
    pub token_username: String,
    pub token_password: String,

    /// Verify upstream TLS certificates.
    pub verify_tls: bool,

    /// Proxied entity base URLs, normalized to a trailing slash.
    pub employee_api_url: String,
    pub customer_api_url: String,
    pub product_api_url: String,

    /// Session lifetime in minutes.
    pub session_minutes: u64,
    /// Hash passwords at the proxy before forwarding create/update payloads.
    /// When off, the upstream API is responsible for hashing.
    pub hash_passwords: bool,

    /// Directory for rolling log files.
    pub log_dir: PathBuf,
}

impl GatewayConfig {
    pub fn from_env() -> AppResult<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_map(&vars)
    }

    pub fn from_map(vars: &HashMap<String, String>) -> AppResult<Self> {
        Ok(Self {
            bind_address: vars
                .get("GATEWAY_BIND")
                .cloned()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_number(vars, "GATEWAY_PORT", 8080)?,
            frontend_origin: vars
                .get("FRONTEND_URL")
                .cloned()
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            token_endpoint: endpoint_url(vars, "TOKEN_ENDPOINT", false)?,
            token_username: required(vars, "TOKEN_USERNAME")?,
            token_password: required(vars, "TOKEN_PASSWORD")?,
            verify_tls: parse_flag(vars, "TLS_VERIFY", true)?,
            employee_api_url: endpoint_url(vars, "EMPLOYEE_API_URL", true)?,
            customer_api_url: endpoint_url(vars, "CUSTOMER_API_URL", true)?,
            product_api_url: endpoint_url(vars, "PRODUCT_API_URL", true)?,
            session_minutes: parse_number(vars, "SESSION_MINUTES", 30)?,
            hash_passwords: parse_flag(vars, "HASH_PASSWORDS", true)?,
            log_dir: vars
                .get("GATEWAY_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> AppResult<String> {
    match vars.get(key) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(AppError::Config(format!("{} must be set", key))),
    }
}

fn endpoint_url(
    vars: &HashMap<String, String>,
    key: &str,
    trailing_slash: bool,
) -> AppResult<String> {
    let raw = required(vars, key)?;
    Url::parse(&raw)
        .map_err(|e| AppError::Config(format!("{} is not a valid URL: {}", key, e)))?;
    if trailing_slash && !raw.ends_with('/') {
        Ok(format!("{}/", raw))
    } else {
        Ok(raw)
    }
}

fn parse_flag(vars: &HashMap<String, String>, key: &str, default: bool) -> AppResult<bool> {
    match vars.get(key) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(AppError::Config(format!(
                "{} has invalid boolean value {:?}",
                key, other
            ))),
        },
    }
}

fn parse_number<T>(vars: &HashMap<String, String>, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match vars.get(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| AppError::Config(format!("{} is not a valid number: {}", key, e))),
    }
}
