//! Side-effecting actions
//!
//! - `orchestrator`: generate, edit, publish against the Design Service
//! - `normalize`: generate response shapes → `Design` groups
//! - `publish`: canonical keys, publish state, batch outcome resolution
//! - `error`: local rejections and user-facing failure messages

mod error;
mod normalize;
mod orchestrator;
mod publish;

pub use error::{failure_message, ActionError};
pub use normalize::normalize_generate_response;
pub use orchestrator::{ActionOrchestrator, ActionOutcome};
pub use publish::{
    canonical_key, resolve_batch_outcome, BatchFailure, BatchReport, PublishState,
    ReportedCounts,
};
