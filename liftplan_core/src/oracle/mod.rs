//! The generation oracle boundary.
//!
//! An oracle takes one prompt and returns free text that is expected to
//! contain one JSON plan. Nothing it returns is trusted until the
//! validator has seen it.

pub mod http;
pub mod scripted;

use crate::Result;
use async_trait::async_trait;

pub use http::HttpOracle;
pub use scripted::{ScriptedOracle, ScriptedReply};

/// Asynchronous generative text service
///
/// Implementations bound their own latency; callers never add a timeout.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Send a prompt and return the raw response text
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// Compile-time assertion: GenerationOracle must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerationOracle) {}
};
