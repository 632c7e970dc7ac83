//! Render a JSON:API document from a fixture resource store.

use anyhow::{Context, Result};
use clap::Parser;
use jsonapi_render::render::{Data, Document, DocumentParams};
use jsonapi_render::store::ResourceStore;
use jsonapi_render::{ApiError, Config, ErrorObject, Identity, IncludeTree};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "jsonapi-render")]
#[command(about = "Render a JSON:API document from a JSON or YAML resource store")]
struct Args {
    /// Resource store file (.json, .yaml or .yml)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Primary resource as type:id (repeatable)
    #[arg(long = "data", value_name = "TYPE:ID")]
    data: Vec<String>,

    /// Primary data as JSON: null, an identifier object or an array of identifiers
    #[arg(long, value_name = "JSON", conflicts_with_all = ["data", "null"])]
    data_json: Option<String>,

    /// Render primary data as an array even for a single resource
    #[arg(long, conflicts_with = "data_json")]
    collection: bool,

    /// Render `"data": null`
    #[arg(long, conflicts_with = "data")]
    null: bool,

    /// Relationship paths to side-load, e.g. posts.author,comments
    #[arg(long, default_value = "")]
    include: String,

    /// Sparse fieldset as type=field,field (repeatable)
    #[arg(long = "fields", value_name = "TYPE=FIELDS")]
    fields: Vec<String>,

    /// Top-level meta object (JSON)
    #[arg(long)]
    meta: Option<String>,

    /// Top-level links object (JSON)
    #[arg(long)]
    links: Option<String>,

    /// Top-level jsonapi object (JSON)
    #[arg(long)]
    jsonapi: Option<String>,

    /// JSON file holding an array of error objects
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Pretty-print the document
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let config = Config::load_or_default()?;
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.renderer.log_level.as_str()),
    )
    .init();

    let args = Args::parse();
    let store = match &args.store {
        Some(path) => ResourceStore::load(path)
            .with_context(|| format!("Failed to load resource store: {}", path.display()))?,
        None => ResourceStore::new(),
    };
    log::info!("Resource store: {} resources", store.len());

    let mut params = DocumentParams::new()
        .data(primary_data(&args, &store)?)
        .include(IncludeTree::parse(&args.include));
    for spec in &args.fields {
        let (kind, names) = parse_fieldset(spec)?;
        params = params.fields(kind, names);
    }
    if let Some(meta) = &args.meta {
        params = params.meta(parse_json("meta", meta)?);
    }
    if let Some(links) = &args.links {
        params = params.links(parse_object("links", links)?);
    }
    if let Some(jsonapi) = &args.jsonapi {
        params = params.jsonapi(parse_json("jsonapi", jsonapi)?);
    }
    if let Some(path) = &args.errors {
        params = params.errors(load_errors(path)?);
    }
    if let Some(cache) = config.build_cache() {
        params = params.cache(cache);
    }

    let document = Document::new(params);
    let json = document.render().context("Failed to render document")?;
    if args.pretty || config.renderer.pretty {
        println!("{}", serde_json::to_string_pretty(&document.to_value()?)?);
    } else {
        println!("{}", json);
    }
    Ok(())
}

fn primary_data(args: &Args, store: &ResourceStore) -> Result<Data> {
    if let Some(selector) = &args.data_json {
        return Ok(store.select(&parse_json("data-json", selector)?)?);
    }
    if args.null {
        return Ok(Data::Null);
    }
    if args.data.is_empty() {
        return Ok(if args.collection {
            Data::Collection(Vec::new())
        } else {
            Data::Absent
        });
    }

    let roots = args
        .data
        .iter()
        .map(|reference| {
            let identity = Identity::parse(reference)
                .with_context(|| format!("Expected TYPE:ID, got '{}'", reference))?;
            Ok(store.require(&identity)?)
        })
        .collect::<Result<Vec<_>>>()?;

    if roots.len() == 1 && !args.collection {
        Ok(Data::Single(roots.into_iter().next().context("no primary resource")?))
    } else {
        Ok(Data::Collection(roots))
    }
}

fn parse_fieldset(spec: &str) -> Result<(String, Vec<String>)> {
    let (kind, names) = spec
        .split_once('=')
        .with_context(|| format!("Expected TYPE=FIELDS, got '{}'", spec))?;
    let names = names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    Ok((kind.trim().to_string(), names))
}

fn parse_json(name: &str, input: &str) -> Result<Value> {
    serde_json::from_str(input).with_context(|| format!("--{} is not valid JSON", name))
}

fn parse_object(name: &str, input: &str) -> Result<Map<String, Value>> {
    match parse_json(name, input)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--{} must be a JSON object, got {}", name, other),
    }
}

fn load_errors(path: &Path) -> Result<Vec<Arc<dyn ErrorObject>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read errors file: {}", path.display()))?;
    let errors: Vec<ApiError> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse errors file: {}", path.display()))?;
    Ok(errors
        .into_iter()
        .map(|e| Arc::new(e) as Arc<dyn ErrorObject>)
        .collect())
}
