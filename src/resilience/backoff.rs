//! Exponential backoff with jitter between guarded generation attempts.

use std::time::Duration;
use rand::Rng;

/// Pause before regenerating after attempt number `retry` (1 = first
/// rejected or failed attempt).
///
/// `base * 2^(retry-1)`, capped at `max`, plus up to 10% jitter so several
/// pipelines sharing one LLM breaker do not regenerate in lockstep.
/// `GuardedGeneration` feeds it `[pipeline] base_delay_ms` and `max_delay_ms`.
pub fn calculate_backoff(retry: u32, base: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let exponential = 2u64.saturating_pow(retry - 1);
    let capped_ms = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_ms + jitter)
}
