//! Headless match runner for AI testing and balance batches.
//!
//! Runs Elemental Wars matches without any front end:
//!
//! - **Single matches**: one seed, a tick budget, a summary on stdout
//! - **Batches**: consecutive seeds in parallel, aggregated metrics
//! - **Determinism checks**: the same setup replayed to the same hash
//!
//! Logs go to stderr so stdout stays machine-readable.
//!
//! # Example
//!
//! ```bash
//! # One match, JSON summary
//! cargo run -p elemental_headless -- run --seed 7 --ai-players 2 --json
//!
//! # 100 matches from seed 0
//! cargo run -p elemental_headless -- batch --count 100 --seed 0
//! ```

pub mod batch;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use error::{Result, RunnerError};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector, PlayerMetrics};
pub use runner::{run_match, RunConfig, RunOutcome};
pub use scenario::{load_match, load_rules};
