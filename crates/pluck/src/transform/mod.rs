// ABOUTME: The transformation model and its per-field middleware pipeline.
// ABOUTME: Runs an ordered chain over each field with explicit short-circuit semantics.

//! Field transformation.
//!
//! A [`TransformingModel`] maps field keys to either an ordered middleware
//! pipeline or a nested transforming model. Pipelines are executed as an
//! explicit fold over the middleware sequence: each step receives the full
//! working context (so cross-field reads observe values already applied at
//! that point) and returns [`Flow::Next`] to continue or [`Flow::Halt`] to
//! stop the remaining chain for that field only. After each step, the
//! read-back of the field's key from the returned context becomes the
//! field's running value.
//!
//! Any middleware error aborts the whole `transform` call; no partial record
//! is returned.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::{PluckError, Result};

pub mod middlewares;

/// The working record threaded through pipelines.
pub type Record = Map<String, Value>;

/// The outcome of one middleware step.
pub enum Flow {
    /// Continue with the remaining chain.
    Next(Record),
    /// Stop the chain for this field, keeping the returned context.
    Halt(Record),
}

/// One step in a field's transformation chain.
pub type Middleware =
    Arc<dyn Fn(Record) -> BoxFuture<'static, Result<Flow>> + Send + Sync>;

/// How one field of the record is transformed.
pub enum FieldTransform {
    /// An ordered middleware chain applied to the field.
    Pipeline(Vec<Middleware>),
    /// A nested model applied to the sub-record (or mapped over an array of
    /// sub-records when `multiple`).
    Nested {
        multiple: bool,
        model: Arc<TransformingModel>,
    },
}

impl FieldTransform {
    pub fn pipeline(middlewares: Vec<Middleware>) -> Self {
        FieldTransform::Pipeline(middlewares)
    }

    pub fn nested(model: Arc<TransformingModel>) -> Self {
        FieldTransform::Nested {
            multiple: false,
            model,
        }
    }

    pub fn nested_multiple(model: Arc<TransformingModel>) -> Self {
        FieldTransform::Nested {
            multiple: true,
            model,
        }
    }
}

/// An immutable per-field transformation schema.
pub struct TransformingModel {
    shape: Vec<(String, FieldTransform)>,
}

impl TransformingModel {
    pub fn new<K: Into<String>>(shape: Vec<(K, FieldTransform)>) -> Self {
        Self {
            shape: shape.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Rewrites the record field by field. Every key in the shape runs: a
    /// field absent from the input is seeded as null, so middlewares must
    /// tolerate missing fields or guard with [`ensure_field`].
    pub async fn transform(&self, record: Record) -> Result<Record> {
        self.transform_inner(record).await
    }

    // Boxed for recursion through nested models.
    fn transform_inner(&self, record: Record) -> BoxFuture<'_, Result<Record>> {
        Box::pin(async move {
            let mut result = record;

            for (key, transform) in &self.shape {
                match transform {
                    FieldTransform::Pipeline(middlewares) => {
                        result = run_pipeline(key, middlewares, result).await?;
                    }
                    FieldTransform::Nested { multiple, model } => {
                        let current = result.get(key).cloned();
                        match (multiple, current) {
                            (false, Some(Value::Object(sub))) => {
                                let transformed = model.transform_inner(sub).await?;
                                result.insert(key.clone(), Value::Object(transformed));
                            }
                            (true, Some(Value::Array(items))) => {
                                let mut transformed = Vec::with_capacity(items.len());
                                for item in items {
                                    match item {
                                        Value::Object(sub) => transformed.push(Value::Object(
                                            model.transform_inner(sub).await?,
                                        )),
                                        other => transformed.push(other),
                                    }
                                }
                                result.insert(key.clone(), Value::Array(transformed));
                            }
                            // A sub-value of the wrong shape (or missing) is
                            // left untouched.
                            _ => {}
                        }
                    }
                }
            }

            Ok(result)
        })
    }
}

/// Folds the middleware chain for one field.
async fn run_pipeline(key: &str, middlewares: &[Middleware], result: Record) -> Result<Record> {
    let mut value = result.get(key).cloned().unwrap_or(Value::Null);
    let mut context = result;
    context.insert(key.to_string(), value.clone());

    for middleware in middlewares {
        let outcome = middleware(context).await?;
        let (next, halted) = match outcome {
            Flow::Next(ctx) => (ctx, false),
            Flow::Halt(ctx) => (ctx, true),
        };
        context = next;
        // Only the read-back of the field's own key is retained as the
        // field's value; a middleware that removed the key leaves the
        // previous value in place.
        if let Some(read_back) = context.get(key) {
            value = read_back.clone();
        }
        if halted {
            break;
        }
    }

    context.insert(key.to_string(), value);
    Ok(context)
}

/// Returns the value of a required context field, treating an absent key and
/// an explicit null the same way: pipelines seed missing fields with null.
pub fn ensure_field<'a>(key: &str, record: &'a Record) -> Result<&'a Value> {
    match record.get(key) {
        None | Some(Value::Null) => Err(PluckError::FieldNotFound(key.to_string())),
        Some(value) => Ok(value),
    }
}
