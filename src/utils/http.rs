use reqwest::Client;
use std::time::Duration;

/// Create the HTTP client used for authority and upstream calls.
///
/// `verify_tls = false` accepts invalid upstream certificates; deployments
/// fronting a self-signed staging API turn this off via `TLS_VERIFY`.
pub fn create_client(timeout_secs: u64, verify_tls: bool) -> Client {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));

    if !verify_tls {
        tracing::warn!("TLS certificate verification disabled for upstream requests");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().unwrap_or_else(|_| Client::new())
}
