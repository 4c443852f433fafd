// ABOUTME: The recursive HTML parsing-model interpreter.
// ABOUTME: Walks a declarative field schema against a parsed document, recursing into nested models.

//! HTML parsing model.
//!
//! A schema maps output keys to [`FieldSpec`]s. Scalar specs pull a value out
//! of a matched node with an extractor; nested specs hand a serialized
//! fragment of the document to another [`ParsingModel`]. Selection order is
//! document order and is preserved end-to-end into output arrays.
//!
//! Parsing runs in two phases: all selection and scalar extraction happens
//! synchronously against the parsed document, which is dropped before any
//! nested model is awaited. Nested `multiple` fields fan out their recursive
//! parses with a bounded, order-preserving buffer.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::error::{PluckError, Result};
use crate::extract::Extractor;
use crate::model::ParsingModel;
use crate::selector::get_or_compile;

/// Default bound on in-flight recursive parses for `multiple` nested fields.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// A scalar field: select a node (or use the document root) and extract one
/// value from it, or all values when `multiple`.
pub struct ScalarSpec {
    pub query: Option<String>,
    pub multiple: bool,
    pub limit: Option<usize>,
    /// Distinguished from "no default": `Some(Value::Null)` is a legal
    /// default, while `None` makes a missing element an error.
    pub default: Option<Value>,
    pub extractor: Extractor,
}

impl ScalarSpec {
    /// A scalar field selected by a CSS query.
    pub fn new(query: impl Into<String>, extractor: Extractor) -> Self {
        Self {
            query: Some(query.into()),
            multiple: false,
            limit: None,
            default: None,
            extractor,
        }
    }

    /// A scalar field extracted from the document root itself.
    pub fn root(extractor: Extractor) -> Self {
        Self {
            query: None,
            multiple: false,
            limit: None,
            default: None,
            extractor,
        }
    }

    /// Extract from every matching node instead of the first.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Keep only the first `n` matches.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Value to use when the query matches nothing or the extractor yields
    /// nothing. `Value::Null` is allowed.
    pub fn or_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A nested field: select a node, serialize it (or run `extractor` to obtain
/// an embedded source text), and parse the result with a sub-model.
pub struct NestedSpec {
    pub query: String,
    pub multiple: bool,
    pub limit: Option<usize>,
    pub model: Arc<dyn ParsingModel>,
    /// Applied to the matched node to obtain the nested source text; when
    /// absent the node's own outer HTML is used. Ignored for `multiple`
    /// fields, which always serialize each node.
    pub extractor: Option<Extractor>,
}

impl NestedSpec {
    pub fn new(query: impl Into<String>, model: Arc<dyn ParsingModel>) -> Self {
        Self {
            query: query.into(),
            multiple: false,
            limit: None,
            model,
            extractor: None,
        }
    }

    /// Parse every matching node instead of the first.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Keep only the first `n` matches.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Extract the nested source text from the node instead of serializing
    /// it, e.g. the inner text of a script tag holding a JSON payload.
    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

/// One entry in an HTML parsing schema.
pub enum FieldSpec {
    Scalar(ScalarSpec),
    Nested(NestedSpec),
}

impl From<ScalarSpec> for FieldSpec {
    fn from(spec: ScalarSpec) -> Self {
        FieldSpec::Scalar(spec)
    }
}

impl From<NestedSpec> for FieldSpec {
    fn from(spec: NestedSpec) -> Self {
        FieldSpec::Nested(spec)
    }
}

/// A recursive schema interpreter over HTML documents.
///
/// The schema is fixed at construction; all per-call state lives on the
/// stack, so one model instance can serve concurrent parses.
pub struct HtmlParsingModel {
    shape: Vec<(String, FieldSpec)>,
    max_concurrency: usize,
}

/// A field value staged during the synchronous selection phase. The parsed
/// document never crosses an await point; only owned strings do.
enum Staged {
    Ready(Value),
    Nested {
        model: Arc<dyn ParsingModel>,
        source: String,
    },
    NestedMany {
        model: Arc<dyn ParsingModel>,
        sources: Vec<String>,
    },
}

impl HtmlParsingModel {
    pub fn new<K: Into<String>>(shape: Vec<(K, FieldSpec)>) -> Self {
        Self {
            shape: shape.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Bounds the number of in-flight recursive parses for `multiple`
    /// nested fields. A value of zero is treated as one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Parses a source document into a record, one entry per schema key.
    pub async fn parse(&self, source: &str) -> Result<Value> {
        let staged = self.stage(source)?;

        let mut record = serde_json::Map::with_capacity(staged.len());
        for (key, staged_value) in staged {
            let value = match staged_value {
                Staged::Ready(value) => value,
                Staged::Nested { model, source } => model.parse(&source).await?,
                Staged::NestedMany { model, sources } => {
                    let parses = sources.into_iter().map(|fragment| {
                        let model = Arc::clone(&model);
                        async move { model.parse(&fragment).await }
                    });
                    let results: Vec<Value> = stream::iter(parses)
                        .buffered(self.max_concurrency)
                        .try_collect()
                        .await?;
                    Value::Array(results)
                }
            };
            record.insert(key, value);
        }

        Ok(Value::Object(record))
    }

    /// Synchronous phase: select nodes and extract scalars, collecting the
    /// serialized sources for nested fields.
    fn stage(&self, source: &str) -> Result<Vec<(String, Staged)>> {
        let doc = Html::parse_document(source);
        let mut staged = Vec::with_capacity(self.shape.len());

        for (key, spec) in &self.shape {
            let value = match spec {
                FieldSpec::Scalar(scalar) => Staged::Ready(stage_scalar(scalar, &doc)?),
                FieldSpec::Nested(nested) => stage_nested(nested, &doc)?,
            };
            staged.push((key.clone(), value));
        }

        Ok(staged)
    }
}

#[async_trait]
impl ParsingModel for HtmlParsingModel {
    async fn parse(&self, source: &str) -> Result<Value> {
        HtmlParsingModel::parse(self, source).await
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

fn stage_scalar(spec: &ScalarSpec, doc: &Html) -> Result<Value> {
    if spec.multiple {
        // Checked before any selection: a multiple field without a query is
        // a schema error, not a runtime miss.
        let query = spec.query.as_deref().ok_or(PluckError::MissingQuery)?;

        let items = select_all(doc, query, spec.limit)
            .iter()
            .map(|el| match (spec.extractor)(el) {
                Some(text) => Value::String(text),
                None => Value::Null,
            })
            .collect();
        return Ok(Value::Array(items));
    }

    let node = match &spec.query {
        Some(query) => select_first(doc, query),
        None => Some(doc.root_element()),
    };

    let Some(node) = node else {
        return spec
            .default
            .clone()
            .ok_or_else(|| PluckError::element_not_found(spec.query.clone()));
    };

    match (spec.extractor)(&node) {
        Some(text) => Ok(Value::String(text)),
        None => Ok(spec.default.clone().unwrap_or(Value::Null)),
    }
}

fn stage_nested(spec: &NestedSpec, doc: &Html) -> Result<Staged> {
    if spec.multiple {
        let sources = select_all(doc, &spec.query, spec.limit)
            .iter()
            .map(|el| el.html())
            .collect();
        return Ok(Staged::NestedMany {
            model: Arc::clone(&spec.model),
            sources,
        });
    }

    // Nested specs have no default-value escape: a missing element is
    // always an error.
    let node = select_first(doc, &spec.query)
        .ok_or_else(|| PluckError::element_not_found(Some(spec.query.clone())))?;

    let source = match &spec.extractor {
        Some(extractor) => extractor(&node)
            .ok_or_else(|| PluckError::element_not_found(Some(spec.query.clone())))?,
        None => node.html(),
    };

    Ok(Staged::Nested {
        model: Arc::clone(&spec.model),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::extract;

    #[tokio::test]
    async fn extracts_title() {
        let model = HtmlParsingModel::new(vec![(
            "title",
            ScalarSpec::new("title", extract::text()).into(),
        )]);

        let data = model
            .parse("<html><head><title>Example</title></head></html>")
            .await
            .unwrap();

        assert_eq!(data, json!({ "title": "Example" }));
    }

    #[tokio::test]
    async fn extracts_multiple_items_in_document_order() {
        let html = "<html><body><h1>Items</h1><ul>\
            <li>Item A</li><li>Item B</li><li>Item C</li><li>Item D</li>\
            </ul></body></html>";

        let model = HtmlParsingModel::new(vec![(
            "items",
            ScalarSpec::new("li", extract::text()).multiple().into(),
        )]);

        let data = model.parse(html).await.unwrap();
        assert_eq!(data, json!({ "items": ["Item A", "Item B", "Item C", "Item D"] }));
    }

    #[tokio::test]
    async fn limit_truncates_to_earliest_matches() {
        let html = "<ul><li>1</li><li>2</li><li>3</li><li>4</li></ul>";

        let model = HtmlParsingModel::new(vec![(
            "items",
            ScalarSpec::new("li", extract::text())
                .multiple()
                .limit(2)
                .into(),
        )]);

        let data = model.parse(html).await.unwrap();
        assert_eq!(data, json!({ "items": ["1", "2"] }));
    }

    #[tokio::test]
    async fn multiple_without_query_is_a_schema_error() {
        let model = HtmlParsingModel::new(vec![(
            "items",
            ScalarSpec::root(extract::text()).multiple().into(),
        )]);

        let err = model.parse("<p>anything</p>").await.unwrap_err();
        assert!(matches!(err, PluckError::MissingQuery));
    }

    #[tokio::test]
    async fn missing_element_without_default_raises() {
        let model = HtmlParsingModel::new(vec![(
            "headline",
            ScalarSpec::new("h1", extract::text()).into(),
        )]);

        let err = model
            .parse("<html><head></head><body></body></html>")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PluckError::ElementNotFound { query: Some(q) } if q == "h1"
        ));
    }

    #[tokio::test]
    async fn missing_element_with_default_returns_default() {
        let model = HtmlParsingModel::new(vec![(
            "missing",
            ScalarSpec::new("h1", extract::text())
                .or_default(Value::Null)
                .into(),
        )]);

        let data = model
            .parse("<html><head></head><body></body></html>")
            .await
            .unwrap();
        assert_eq!(data, json!({ "missing": null }));
    }

    #[tokio::test]
    async fn extractor_miss_falls_back_to_default() {
        let model = HtmlParsingModel::new(vec![(
            "link",
            ScalarSpec::new("a", extract::href())
                .or_default(json!("https://example.com"))
                .into(),
        )]);

        // The <a> exists but carries no href.
        let data = model.parse("<a>bare anchor</a>").await.unwrap();
        assert_eq!(data, json!({ "link": "https://example.com" }));
    }

    #[tokio::test]
    async fn extractor_miss_without_default_is_null() {
        let model = HtmlParsingModel::new(vec![(
            "link",
            ScalarSpec::new("a", extract::href()).into(),
        )]);

        let data = model.parse("<a>bare anchor</a>").await.unwrap();
        assert_eq!(data, json!({ "link": null }));
    }

    #[tokio::test]
    async fn multiple_tolerates_extractor_misses() {
        let html = r#"<a href="/one">1</a><a>2</a><a href="/three">3</a>"#;

        let model = HtmlParsingModel::new(vec![(
            "links",
            ScalarSpec::new("a", extract::href()).multiple().into(),
        )]);

        let data = model.parse(html).await.unwrap();
        assert_eq!(data, json!({ "links": ["/one", null, "/three"] }));
    }

    #[tokio::test]
    async fn root_scalar_uses_document_root() {
        let model = HtmlParsingModel::new(vec![(
            "tag",
            ScalarSpec::root(extract::tag_name()).into(),
        )]);

        let data = model.parse("<html><body></body></html>").await.unwrap();
        assert_eq!(data, json!({ "tag": "html" }));
    }

    #[tokio::test]
    async fn nested_multiple_preserves_source_order() {
        let html = r#"<html><body><ul id="products">
            <li><span class="name">Product 1</span><span class="price">$ 20.00</span></li>
            <li><span class="name">Product 2</span><span class="price">$ 25.00</span></li>
            <li><span class="name">Product 3</span><span class="price">$ 15.90</span></li>
            <li><span class="name">Product 4</span><span class="price">$ 13.80</span></li>
            </ul></body></html>"#;

        let product = Arc::new(HtmlParsingModel::new(vec![
            ("name", ScalarSpec::new("span.name", extract::text()).into()),
            (
                "price",
                ScalarSpec::new("span.price", extract::text()).into(),
            ),
        ]));

        let model = HtmlParsingModel::new(vec![(
            "products",
            NestedSpec::new("li", product).multiple().into(),
        )]);

        let data = model.parse(html).await.unwrap();
        assert_eq!(
            data,
            json!({
                "products": [
                    { "name": "Product 1", "price": "$ 20.00" },
                    { "name": "Product 2", "price": "$ 25.00" },
                    { "name": "Product 3", "price": "$ 15.90" },
                    { "name": "Product 4", "price": "$ 13.80" },
                ]
            })
        );
    }

    #[tokio::test]
    async fn nested_multiple_with_no_matches_is_empty_array() {
        let product = Arc::new(HtmlParsingModel::new(vec![(
            "name",
            ScalarSpec::new("span.name", extract::text()).into(),
        )]));

        let model = HtmlParsingModel::new(vec![(
            "products",
            NestedSpec::new("li", product).multiple().into(),
        )]);

        let data = model.parse("<p>no list here</p>").await.unwrap();
        assert_eq!(data, json!({ "products": [] }));
    }

    #[tokio::test]
    async fn nested_missing_element_raises_even_without_default() {
        let inner = Arc::new(HtmlParsingModel::new(vec![(
            "name",
            ScalarSpec::new("span", extract::text()).into(),
        )]));

        let model = HtmlParsingModel::new(vec![(
            "section",
            NestedSpec::new("div.section", inner).into(),
        )]);

        let err = model.parse("<p>nothing</p>").await.unwrap_err();
        assert!(err.is_element_not_found());
    }

    #[tokio::test]
    async fn nested_extractor_feeds_embedded_payload() {
        // The nested source is the script's inner text, not its outer HTML.
        let html = r#"<html><body>
            <script id="user-data" type="application/json"><section>inline</section></script>
            </body></html>"#;

        let inner = Arc::new(HtmlParsingModel::new(vec![(
            "value",
            ScalarSpec::new("section", extract::text()).into(),
        )]));

        let model = HtmlParsingModel::new(vec![(
            "payload",
            NestedSpec::new("script#user-data", inner)
                .extractor(extract::inner_html())
                .into(),
        )]);

        let data = model.parse(html).await.unwrap();
        assert_eq!(data, json!({ "payload": { "value": "inline" } }));
    }
}
