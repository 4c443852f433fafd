// ABOUTME: Built-in middleware factories for common field rewrites.
// ABOUTME: Each factory is keyed by the field it rewrites and returns a pipeline step.

//! Built-in middlewares.
//!
//! Every factory takes the key of the field it operates on. String-typed
//! middlewares require the field to be present and a string: an absent or
//! null field raises [`PluckError::FieldNotFound`] (use [`map_value`] for a
//! tolerant rewrite), a non-string raises
//! [`PluckError::InvalidFieldType`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::error::{PluckError, Result};
use crate::transform::{ensure_field, Flow, Middleware, Record};

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[^>]+(>|$)").unwrap());

fn ensure_string(key: &str, record: &Record) -> Result<String> {
    match ensure_field(key, record)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(PluckError::InvalidFieldType {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

/// Builds a middleware that rewrites a required string field.
fn rewrite_string<F>(key: &str, f: F) -> Middleware
where
    F: Fn(&str) -> Value + Send + Sync + 'static,
{
    let key = key.to_string();
    let f = Arc::new(f);
    Arc::new(move |mut ctx: Record| {
        let key = key.clone();
        let f = Arc::clone(&f);
        Box::pin(async move {
            let current = ensure_string(&key, &ctx)?;
            ctx.insert(key, f(&current));
            Ok(Flow::Next(ctx))
        })
    })
}

/// Trims surrounding whitespace.
pub fn trim(key: &str) -> Middleware {
    rewrite_string(key, |s| Value::String(s.trim().to_string()))
}

/// Uppercases the field.
pub fn uppercase(key: &str) -> Middleware {
    rewrite_string(key, |s| Value::String(s.to_uppercase()))
}

/// Lowercases the field.
pub fn lowercase(key: &str) -> Middleware {
    rewrite_string(key, |s| Value::String(s.to_lowercase()))
}

/// Title-cases the field: the first letter of each whitespace-separated word
/// is uppercased, the rest lowercased.
pub fn title_case(key: &str) -> Middleware {
    rewrite_string(key, |s| {
        let cased = s
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Value::String(cased)
    })
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn collapse_whitespace(key: &str) -> Middleware {
    rewrite_string(key, |s| {
        Value::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

/// Removes HTML tags from the field.
pub fn strip_html_tags(key: &str) -> Middleware {
    rewrite_string(key, |s| Value::String(HTML_TAG_RE.replace_all(s, "").into_owned()))
}

/// Splits the field on a separator into an array of strings.
pub fn split(key: &str, separator: &str) -> Middleware {
    let separator = separator.to_string();
    let key = key.to_string();
    Arc::new(move |mut ctx: Record| {
        let key = key.clone();
        let separator = separator.clone();
        Box::pin(async move {
            let current = ensure_string(&key, &ctx)?;
            let parts = current
                .split(separator.as_str())
                .map(|part| Value::String(part.to_string()))
                .collect();
            ctx.insert(key, Value::Array(parts));
            Ok(Flow::Next(ctx))
        })
    })
}

/// Parses the field as a number; a non-numeric string becomes null.
pub fn to_number(key: &str) -> Middleware {
    rewrite_string(key, |s| number_or_null(s.trim()))
}

/// Strips a currency symbol and thousands separators, then parses the rest
/// as a number; a non-numeric remainder becomes null.
pub fn parse_currency(key: &str, symbol: Option<&str>) -> Middleware {
    let symbol = symbol.map(str::to_string);
    let key = key.to_string();
    Arc::new(move |mut ctx: Record| {
        let key = key.clone();
        let symbol = symbol.clone();
        Box::pin(async move {
            let current = ensure_string(&key, &ctx)?;
            let mut cleaned = current;
            if let Some(symbol) = &symbol {
                cleaned = cleaned.replace(symbol.as_str(), "");
            }
            let cleaned = cleaned.replace(',', "");
            ctx.insert(key, number_or_null(cleaned.trim()));
            Ok(Flow::Next(ctx))
        })
    })
}

/// Rewrites the field with an arbitrary function of its current value and
/// the full context. Tolerates absent fields (the value is null).
pub fn map_value<F>(key: &str, f: F) -> Middleware
where
    F: Fn(&Value, &Record) -> Result<Value> + Send + Sync + 'static,
{
    let key = key.to_string();
    let f = Arc::new(f);
    Arc::new(move |mut ctx: Record| {
        let key = key.clone();
        let f = Arc::clone(&f);
        Box::pin(async move {
            let current = ctx.get(&key).cloned().unwrap_or(Value::Null);
            let next = f(&current, &ctx)?;
            ctx.insert(key, next);
            Ok(Flow::Next(ctx))
        })
    })
}

/// Halts the chain for this field when the predicate holds. The field must
/// be present.
pub fn stop_if<F>(key: &str, predicate: F) -> Middleware
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    let key = key.to_string();
    let predicate = Arc::new(predicate);
    Arc::new(move |ctx: Record| {
        let key = key.clone();
        let predicate = Arc::clone(&predicate);
        Box::pin(async move {
            let current = ensure_field(&key, &ctx)?.clone();
            if predicate(&current) {
                Ok(Flow::Halt(ctx))
            } else {
                Ok(Flow::Next(ctx))
            }
        })
    })
}

/// Halts the chain when the string field contains a substring.
pub fn stop_if_contains(key: &str, substring: &str) -> Middleware {
    let substring = substring.to_string();
    stop_if(key, move |value| {
        matches!(value, Value::String(s) if s.contains(substring.as_str()))
    })
}

fn number_or_null(s: &str) -> Value {
    match s.parse::<f64>() {
        Ok(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}
