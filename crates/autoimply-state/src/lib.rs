//! autoimply-state: records and collaborators around the inference core
//!
//! This crate holds everything that moves data in or out of an autoimply
//! run: the record schema, the async source/sink traits, in-memory
//! implementations, the JSON snapshot loader and the HTTP submission sink.
//!
//! ## Key Components
//!
//! - `TagRecord` / `ChangeRequestRecord`: explicit schema shared with the core
//! - `TagSource` / `HistorySource`: read side (catalog + request history)
//! - `SubmissionSink`: write side (finished batches)

mod error;
mod http_sink;
pub mod memory;
mod schema;
pub mod snapshot;
pub mod storage_traits;

pub use error::StateError;
pub use http_sink::{ApiConfig, HttpSubmissionSink};
pub use memory::{MemoryHistorySource, MemoryTagSource, RecordingSink};
pub use schema::{ChangeRequestRecord, RequestStatus, TagRecord, WikiPageRecord};
pub use snapshot::Snapshot;
pub use storage_traits::{
    BatchSubmission, HistorySource, StateResult, SubmissionReceipt, SubmissionSink, TagSource,
};
