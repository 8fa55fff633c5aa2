//! Delivery-boundary error type.

use thiserror::Error;

/// Errors raised while handing a trace to a backend.
///
/// None of these cross the report boundary: every variant is logged at the
/// delivery layer and folded into the boolean delivery result, so losing a
/// trace can never destabilize the host application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    /// The HTTP request could not be completed.
    #[error("trace backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("trace backend returned status {0}")]
    Backend(reqwest::StatusCode),

    /// The wire payload could not be encoded.
    #[error("failed to encode trace payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The batch queue rejected the trace: full, or its workers are gone.
    #[error("delivery queue unavailable")]
    QueueUnavailable,
}
