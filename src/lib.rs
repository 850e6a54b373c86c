//! Form-io: conversational control of a parametric building model
//!
//! A design prompt is routed to one of three parameter domains (building,
//! envelope, facade), matched to exactly one allow-listed parameter key by a
//! language model, given a new value by a second model call, and validated
//! before it is applied. Flat form inputs are shaped into Rhino Compute data
//! trees and solved against a Grasshopper definition.
//!
//! # Modules
//!
//! - [`parameters`]: allow-list catalog, key and value normalization
//! - [`agent`]: router, matcher, updater and the chat pipeline
//! - [`llm`]: OpenAI and Anthropic clients behind one trait
//! - [`compute`]: payload building and the Rhino Compute client
//! - [`project`]: saved projects and their stores
//! - `api`: axum routes (feature `server`)

pub mod agent;
pub mod compute;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod parameters;
pub mod project;

#[cfg(feature = "server")]
pub mod api;

pub use agent::{ChatOutcome, ChatPipeline, PipelineStage};
pub use compute::{ComputeClient, ComputePayloadBuilder, ComputeService, DefinitionStore};
pub use config::AppConfig;
pub use error::{FormIoError, KeyOrigin, Result};
pub use parameters::{AgentDomain, ParamValue, ParameterCatalog, ParameterMap};
pub use project::{InMemoryProjectStore, Project, ProjectStore};
