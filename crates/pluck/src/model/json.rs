// ABOUTME: Flat JSON parsing model mapping output keys to JMESPath expressions.
// ABOUTME: Nested JSON is reached through deeper path expressions, not sub-models.

//! JSON parsing model.
//!
//! Unlike the HTML variant there is no nesting construct: a deeper value is
//! addressed by a deeper path expression. Malformed source propagates the
//! deserializer's own error; a path that evaluates to null falls back to the
//! field's default when one is declared, and is otherwise a legitimate null
//! result.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PluckError, Result};
use crate::model::ParsingModel;

/// One entry in a JSON parsing schema: a path expression plus an optional
/// default applied when the path evaluates to null.
pub struct JsonFieldSpec {
    pub query: String,
    pub default: Option<Value>,
}

impl JsonFieldSpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            default: None,
        }
    }

    pub fn or_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A flat key-to-path schema interpreter over JSON documents.
///
/// Expressions are kept as strings and compiled per call, which keeps the
/// model freely shareable across threads.
pub struct JsonParsingModel {
    shape: Vec<(String, JsonFieldSpec)>,
}

impl JsonParsingModel {
    pub fn new<K: Into<String>>(shape: Vec<(K, JsonFieldSpec)>) -> Self {
        Self {
            shape: shape.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parses a JSON source into a record, one entry per schema key.
    ///
    /// Synchronous: path evaluation never suspends. The async trait surface
    /// exists only so JSON models can nest inside HTML models.
    pub fn parse(&self, source: &str) -> Result<Value> {
        let root: Value = serde_json::from_str(source)?;
        let root = jmespath::Rcvar::new(
            jmespath::Variable::from_serializable(&root)
                .map_err(|e| PluckError::path("<document>", e))?,
        );

        let mut record = serde_json::Map::with_capacity(self.shape.len());
        for (key, spec) in &self.shape {
            let mut value = evaluate(&spec.query, jmespath::Rcvar::clone(&root))?;
            if value.is_null() {
                if let Some(default) = &spec.default {
                    value = default.clone();
                }
            }
            record.insert(key.clone(), value);
        }

        Ok(Value::Object(record))
    }
}

#[async_trait]
impl ParsingModel for JsonParsingModel {
    async fn parse(&self, source: &str) -> Result<Value> {
        JsonParsingModel::parse(self, source)
    }
}

/// Evaluates a JMESPath expression against a deserialized document.
fn evaluate(expression: &str, root: jmespath::Rcvar) -> Result<Value> {
    let compiled =
        jmespath::compile(expression).map_err(|e| PluckError::path(expression, e))?;
    let result = compiled
        .search(root)
        .map_err(|e| PluckError::path(expression, e))?;
    serde_json::to_value(result.as_ref()).map_err(PluckError::from)
}
