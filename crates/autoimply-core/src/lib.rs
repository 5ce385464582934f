//! autoimply core library
//!
//! Infers missing tag implications for configured series and batches them
//! into review-ready change requests:
//!
//! 1. [`decompose`] splits compound tag names into base + qualifier chain.
//! 2. [`ledger`] recovers previously requested implications from history.
//! 3. [`resolver`] picks the most specific live ancestor for each tag.
//! 4. [`groups`] folds pairs into per-parent groups and clusters them.
//! 5. [`scheduler`] cuts clusters into batches under a line budget and quota.
//!
//! The crate never edits the tag graph; it only emits proposals.

pub mod collect;
pub mod context;
pub mod decompose;
pub mod error;
pub mod groups;
pub mod ledger;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod scheduler;
pub mod series;
pub mod telemetry;

pub use context::{RunContext, TagIndex};
pub use decompose::{decompose, CostumePattern, Decomposition, PatternError};
pub use error::{AutoimplyError, ConfigError, LedgerError, Result};
pub use groups::{build_groups, cluster_by_qualifier, ImplicationGroup, QualifierCluster};
pub use ledger::{parse_script, ImplicationRecord, Ledger};
pub use resolver::{candidate_parents, ordered_candidates, resolve_parent};
pub use runner::{RunOptions, Runner, SeriesReport};
pub use scheduler::{Batch, BatchScheduler, QuotaExceeded, Schedule};
pub use series::{select_series, Series};
pub use telemetry::init_tracing;

/// autoimply version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
