//! API Models

use serde::{Deserialize, Serialize};

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Liveness response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy`
    pub status: String,
    /// Server version
    pub version: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}
