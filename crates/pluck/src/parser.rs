// ABOUTME: Thin façade binding an HTML source string to ad-hoc field extraction.
// ABOUTME: Offers parse-first/parse-many scalar entry points and extract-first/extract-many model recursion.

//! Document parser façade.
//!
//! [`HtmlParser`] binds a source string to one-off extraction calls without
//! requiring a full schema: pull one scalar, pull all matching scalars, or
//! hand a matched fragment (or the whole document) to a [`ParsingModel`].
//!
//! The document is re-parsed per call and never held across an await point,
//! so every returned future is `Send` and the parser itself can live inside
//! shared state.

use std::sync::Arc;

use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::error::{PluckError, Result};
use crate::extract::Extractor;
use crate::model::ParsingModel;
use crate::selector::get_or_compile;

/// Options for [`HtmlParser::parse_first`]. A `query` of `None` extracts
/// from the document root.
pub struct ParseFirstOptions {
    pub query: Option<String>,
    pub extractor: Extractor,
    pub default: Option<Value>,
}

/// Options for [`HtmlParser::parse_many`].
pub struct ParseManyOptions {
    pub query: String,
    pub extractor: Extractor,
    pub limit: Option<usize>,
}

/// Options for [`HtmlParser::extract_first`]. A `query` of `None` parses the
/// whole document with the model.
pub struct ExtractFirstOptions {
    pub query: Option<String>,
    pub model: Arc<dyn ParsingModel>,
}

/// Options for [`HtmlParser::extract_many`].
pub struct ExtractManyOptions {
    pub query: String,
    pub model: Arc<dyn ParsingModel>,
    pub limit: Option<usize>,
}

/// A parser bound to one HTML source string.
#[derive(Debug)]
pub struct HtmlParser {
    source: String,
}

impl HtmlParser {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Extracts a single scalar value.
    ///
    /// A missing element yields `default` when one is supplied, otherwise
    /// [`PluckError::ElementNotFound`]. Unlike the model path, an extractor
    /// miss also falls back to `default` when the query is absent.
    pub async fn parse_first(&self, opts: &ParseFirstOptions) -> Result<Value> {
        let doc = Html::parse_document(&self.source);

        let node = match &opts.query {
            Some(query) => {
                let Some(node) = select_first(&doc, query) else {
                    return opts
                        .default
                        .clone()
                        .ok_or_else(|| PluckError::element_not_found(Some(query.clone())));
                };
                node
            }
            None => doc.root_element(),
        };

        match (opts.extractor)(&node) {
            Some(text) => Ok(Value::String(text)),
            None => Ok(opts.default.clone().unwrap_or(Value::Null)),
        }
    }

    /// Extracts a scalar from every matching node, in document order.
    /// Extractor misses become null entries, never errors.
    pub async fn parse_many(&self, opts: &ParseManyOptions) -> Result<Vec<Value>> {
        let doc = Html::parse_document(&self.source);

        Ok(select_all(&doc, &opts.query, opts.limit)
            .iter()
            .map(|el| match (opts.extractor)(el) {
                Some(text) => Value::String(text),
                None => Value::Null,
            })
            .collect())
    }

    /// Parses the first matching fragment with a model.
    pub async fn extract_first(&self, opts: &ExtractFirstOptions) -> Result<Value> {
        let fragment = {
            let doc = Html::parse_document(&self.source);
            match &opts.query {
                Some(query) => select_first(&doc, query)
                    .map(|el| el.html())
                    .ok_or_else(|| PluckError::element_not_found(Some(query.clone())))?,
                None => doc.root_element().html(),
            }
        };

        opts.model.parse(&fragment).await
    }

    /// Parses every matching fragment with a model, preserving document
    /// order. An empty match set yields an empty vector.
    pub async fn extract_many(&self, opts: &ExtractManyOptions) -> Result<Vec<Value>> {
        let fragments: Vec<String> = {
            let doc = Html::parse_document(&self.source);
            select_all(&doc, &opts.query, opts.limit)
                .iter()
                .map(|el| el.html())
                .collect()
        };

        let mut records = Vec::with_capacity(fragments.len());
        for fragment in &fragments {
            records.push(opts.model.parse(fragment).await?);
        }
        Ok(records)
    }

    /// Runs a full parsing model over the parser's source.
    pub async fn parse_model(&self, model: &dyn ParsingModel) -> Result<Value> {
        model.parse(&self.source).await
    }
}

fn select_first<'a>(doc: &'a Html, query: &str) -> Option<ElementRef<'a>> {
    let selector = get_or_compile(query)?;
    doc.select(&selector).next()
}

fn select_all<'a>(doc: &'a Html, query: &str, limit: Option<usize>) -> Vec<ElementRef<'a>> {
    let Some(selector) = get_or_compile(query) else {
        return Vec::new();
    };
    let nodes = doc.select(&selector);
    match limit {
        Some(limit) => nodes.take(limit).collect(),
        None => nodes.collect(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::extract;
    use crate::model::html::{HtmlParsingModel, ScalarSpec};

    const SAMPLE_HTML: &str = r#"
        <html>
        <head><title>Sample</title></head>
        <body>
            <ul>
                <li><a href="/a">A</a></li>
                <li><a href="/b">B</a></li>
                <li><a href="/c">C</a></li>
            </ul>
        </body>
        </html>
    "#;

    #[tokio::test]
    async fn parse_first_extracts_scalar() {
        let parser = HtmlParser::new(SAMPLE_HTML);

        let value = parser
            .parse_first(&ParseFirstOptions {
                query: Some("title".to_string()),
                extractor: extract::text(),
                default: None,
            })
            .await
            .unwrap();

        assert_eq!(value, json!("Sample"));
    }

    #[tokio::test]
    async fn parse_first_missing_without_default_raises() {
        let parser = HtmlParser::new(SAMPLE_HTML);

        let err = parser
            .parse_first(&ParseFirstOptions {
                query: Some("h1".to_string()),
                extractor: extract::text(),
                default: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_element_not_found());
    }

    #[tokio::test]
    async fn parse_first_missing_with_default_returns_default() {
        let parser = HtmlParser::new(SAMPLE_HTML);

        let value = parser
            .parse_first(&ParseFirstOptions {
                query: Some("h1".to_string()),
                extractor: extract::text(),
                default: Some(json!("fallback")),
            })
            .await
            .unwrap();

        assert_eq!(value, json!("fallback"));
    }

    #[tokio::test]
    async fn parse_many_respects_limit_and_order() {
        let parser = HtmlParser::new(SAMPLE_HTML);

        let values = parser
            .parse_many(&ParseManyOptions {
                query: "a".to_string(),
                extractor: extract::href(),
                limit: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(values, vec![json!("/a"), json!("/b")]);
    }

    #[tokio::test]
    async fn extract_many_parses_each_fragment() {
        let parser = HtmlParser::new(SAMPLE_HTML);
        let link = Arc::new(HtmlParsingModel::new(vec![
            ("label", ScalarSpec::new("a", extract::text()).into()),
            ("url", ScalarSpec::new("a", extract::href()).into()),
        ]));

        let records = parser
            .extract_many(&ExtractManyOptions {
                query: "li".to_string(),
                model: link,
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![
                json!({ "label": "A", "url": "/a" }),
                json!({ "label": "B", "url": "/b" }),
                json!({ "label": "C", "url": "/c" }),
            ]
        );
    }

    #[tokio::test]
    async fn extract_first_without_query_uses_whole_document() {
        let parser = HtmlParser::new(SAMPLE_HTML);
        let model = Arc::new(HtmlParsingModel::new(vec![(
            "title",
            ScalarSpec::new("title", extract::text()).into(),
        )]));

        let record = parser
            .extract_first(&ExtractFirstOptions {
                query: None,
                model,
            })
            .await
            .unwrap();

        assert_eq!(record, json!({ "title": "Sample" }));
    }
}
