//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap guarded calls with an optional deadline
//! - Translate operation errors and deadline expiry into `BreakerError`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Expiry drops the operation future, which cancels it

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::resilience::types::BreakerError;

/// Run an operation, failing with `BreakerError::Timeout` if it outlives `deadline`.
pub async fn with_deadline<T, E, Fut>(operation: Fut, deadline: Option<Duration>) -> Result<T, BreakerError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let outcome = match deadline {
        Some(limit) => match time::timeout(limit, operation).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(BreakerError::Timeout(limit)),
        },
        None => operation.await,
    };

    outcome.map_err(|e| BreakerError::Operation(e.to_string()))
}
