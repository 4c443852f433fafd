// ABOUTME: CLI for running a declarative extraction model over a document.
// ABOUTME: Loads HTML from URL, file, or stdin, applies a JSON model config, prints the record.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;

use pluck::{extract, Client, FieldSpec, HtmlParsingModel, NestedSpec, RequestOptions, ScalarSpec};

/// Extract structured data from an HTML document with a declarative model.
#[derive(Parser, Debug)]
#[command(name = "pluck-cli")]
#[command(about = "Run an extraction model over a document and print JSON", long_about = None)]
struct Args {
    /// Document URL (http/https) or local file path. Use "-" to read from stdin.
    target: String,

    /// Path to a JSON model config: { "field": { "query", "extractor", "multiple", "limit", "default", "model" } }.
    #[arg(long)]
    model: PathBuf,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

/// Output fields are emitted in alphabetical key order.
type ModelConfig = BTreeMap<String, FieldConfig>;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FieldConfig {
    query: Option<String>,
    extractor: Option<String>,
    #[serde(default)]
    multiple: bool,
    limit: Option<usize>,
    default: Option<Value>,
    /// A nested model; requires `query` and ignores `extractor`.
    model: Option<ModelConfig>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config: ModelConfig = serde_json::from_str(
        &fs::read_to_string(&args.model)
            .with_context(|| format!("reading model config {}", args.model.display()))?,
    )
    .context("parsing model config")?;
    let model = build_model(&config)?;

    let source = load_source(&args.target).await?;
    let record = model.parse(&source).await?;

    if args.compact {
        println!("{}", serde_json::to_string(&record)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(())
}

fn build_model(config: &ModelConfig) -> Result<Arc<HtmlParsingModel>> {
    let mut shape: Vec<(String, FieldSpec)> = Vec::with_capacity(config.len());

    for (key, field) in config {
        let spec = match &field.model {
            Some(nested_config) => {
                let query = field
                    .query
                    .clone()
                    .ok_or_else(|| anyhow!("field {key:?}: a nested model requires a query"))?;
                let nested = build_model(nested_config)?;
                let mut spec = NestedSpec::new(query, nested);
                if field.multiple {
                    spec = spec.multiple();
                }
                if let Some(limit) = field.limit {
                    spec = spec.limit(limit);
                }
                spec.into()
            }
            None => {
                let extractor = extract::by_name(field.extractor.as_deref().unwrap_or("text"))
                    .with_context(|| format!("field {key:?}"))?;
                let mut spec = match &field.query {
                    Some(query) => ScalarSpec::new(query.as_str(), extractor),
                    None => ScalarSpec::root(extractor),
                };
                if field.multiple {
                    spec = spec.multiple();
                }
                if let Some(limit) = field.limit {
                    spec = spec.limit(limit);
                }
                if let Some(default) = &field.default {
                    spec = spec.or_default(default.clone());
                }
                spec.into()
            }
        };
        shape.push((key.clone(), spec));
    }

    Ok(Arc::new(HtmlParsingModel::new(shape)))
}

async fn load_source(target: &str) -> Result<String> {
    if target == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        let client = Client::builder().build()?;
        let response = client.fetch(&RequestOptions::url(target)).await?;
        return Ok(response.text().to_string());
    }

    let path = PathBuf::from(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {target}"));
    }
    Ok(fs::read_to_string(path)?)
}
