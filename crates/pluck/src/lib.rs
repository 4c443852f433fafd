// ABOUTME: Library root for the pluck extraction toolkit.
// ABOUTME: Wires the parsing models, transformation pipeline, paginator, and HTTP client together.

//! Declarative data extraction and reshaping.
//!
//! A schema (a parsing model) declares what to pull out of an HTML or JSON
//! document; the engine walks it and produces a JSON record. Extracted
//! records can then be reshaped field by field with a [`TransformingModel`],
//! and fixed page ranges can be walked with a [`StaticPaginator`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pluck::{extract, HtmlParsingModel, NestedSpec, ScalarSpec};
//!
//! # async fn run(html: &str) -> pluck::Result<()> {
//! let product = Arc::new(HtmlParsingModel::new(vec![
//!     ("name", ScalarSpec::new(".name", extract::text()).into()),
//!     ("price", ScalarSpec::new(".price", extract::text()).into()),
//! ]));
//!
//! let page = HtmlParsingModel::new(vec![
//!     ("title", ScalarSpec::new("title", extract::text()).into()),
//!     ("products", NestedSpec::new(".product", product).multiple().into()),
//! ]);
//!
//! let record = page.parse(html).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod http;
pub mod model;
pub mod paginator;
pub mod parser;
pub mod selector;
pub mod transform;

pub use error::{PluckError, Result};
pub use extract::Extractor;
pub use http::{Client, ClientBuilder, Options, RequestOptions, Response};
pub use model::html::{FieldSpec, HtmlParsingModel, NestedSpec, ScalarSpec};
pub use model::json::{JsonFieldSpec, JsonParsingModel};
pub use model::ParsingModel;
pub use paginator::{
    PaginatorOptions, StaticPaginator, TrackedPagination, Tracker, Trackers, TrackerTransformer,
};
pub use parser::{
    ExtractFirstOptions, ExtractManyOptions, HtmlParser, ParseFirstOptions, ParseManyOptions,
};
pub use transform::{ensure_field, FieldTransform, Flow, Middleware, Record, TransformingModel};
