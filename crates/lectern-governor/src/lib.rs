//! # Lectern Governor
//!
//! Orchestration of every AI request the editor makes: credential
//! resolution, system prompt construction, token preflight, admission
//! control, transport dispatch, and post-flight bucket/credential
//! bookkeeping.
//!
//! The governor performs no retries and reserves no tokens ahead of a
//! response; every failure returns to the caller typed and annotated, and a
//! cancelled dispatch leaves no state to roll back.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod governor;
pub mod prompt;

pub use governor::{AssistantReply, DispatchPreflight, ProviderStatus, RequestGovernor};
pub use prompt::build_system_prompt;
