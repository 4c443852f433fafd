// ABOUTME: The ParsingModel capability trait shared by every schema interpreter.
// ABOUTME: Lets HTML and JSON models nest inside each other interchangeably.

//! Parsing model composition.
//!
//! A parsing model is anything that can turn a source string into a
//! structured value. Nesting is expressed against this capability rather
//! than a concrete type, so an HTML model can embed a JSON model (for inline
//! script payloads) and vice versa.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod html;
pub mod json;

/// A schema interpreter that parses a source string into a structured value.
///
/// Implementations are immutable after construction and carry no per-call
/// state, so a single instance is safe to share across concurrent parses.
#[async_trait]
pub trait ParsingModel: Send + Sync {
    async fn parse(&self, source: &str) -> Result<Value>;
}
