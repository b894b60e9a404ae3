//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and validators produce:
//!     → tracing events (state transitions, fallbacks, verdicts)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber installed by the binary
//!     → whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers/recorders is the
//!   binary's (or embedder's) job
//! - Metrics are cheap (no-op without a recorder)

pub mod logging;
pub mod metrics;
