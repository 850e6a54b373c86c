//! Prompt-to-parameter agent
//!
//! ```text
//! prompt → AgentRouter → ParameterMatcher → ParameterUpdater → validate → apply
//! ```
//!
//! The router is keyword based and makes no external calls. The matcher and
//! updater each make one language-model call, strictly in sequence.

pub mod matcher;
pub mod pipeline;
pub mod router;
pub mod updater;

pub use matcher::{MatchReply, ParameterMatcher};
pub use pipeline::{ChatOutcome, ChatPipeline, PipelineStage};
pub use router::AgentRouter;
pub use updater::{ParameterUpdater, ProposedUpdate, UpdateReply};
