//! API response types.

use serde::Serialize;

/// `GET /health` body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Configured farm identifiers.
    pub farms: Vec<String>,
    /// Server time, RFC 3339.
    pub timestamp: String,
}

/// `GET /ready` body.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// `"ready"` or `"not ready"`.
    pub status: &'static str,
}
