//! Document assembly.
//!
//! A [`Document`] takes the caller's [`DocumentParams`], walks the resource
//! graph for the primary data, renders each unique resource through a
//! [`FragmentCache`] and joins the fragments into the top-level JSON:API
//! document:
//!
//! ```text
//! { data | errors, included?, links?, meta?, jsonapi? }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use jsonapi_render::render::{render, DocumentParams};
//! use jsonapi_render::store::ResourceStore;
//! use jsonapi_render::Identity;
//!
//! # fn example() -> jsonapi_render::Result<()> {
//! let store = ResourceStore::load(std::path::Path::new("graph.json"))?;
//! let user = store.require(&Identity::new("users", "1"))?;
//!
//! let json = render(
//!     DocumentParams::new()
//!         .data(user)
//!         .include("posts.author")
//!         .fields("users", ["name"]),
//! )?;
//! println!("{}", json);
//! # Ok(())
//! # }
//! ```

mod fragments;

use std::cell::OnceCell;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::{FragmentCache, MemoryFragmentCache};
use crate::error::Result;
use crate::graph::traverse;
use crate::include::IncludeTree;
use crate::resource::{ErrorObject, Fields, ResourceRef};

/// Primary data of a document.
#[derive(Clone, Default)]
pub enum Data {
    /// No `data` member; the document carries errors or only meta/links.
    #[default]
    Absent,
    /// `"data": null`
    Null,
    /// `"data": {...}`
    Single(ResourceRef),
    /// `"data": [...]`, possibly empty
    Collection(Vec<ResourceRef>),
}

impl Data {
    pub fn is_present(&self) -> bool {
        !matches!(self, Data::Absent)
    }

    /// Root resources to traverse from.
    pub fn roots(&self) -> &[ResourceRef] {
        match self {
            Data::Absent | Data::Null => &[],
            Data::Single(res) => std::slice::from_ref(res),
            Data::Collection(list) => list,
        }
    }
}

impl From<ResourceRef> for Data {
    fn from(res: ResourceRef) -> Self {
        Data::Single(res)
    }
}

impl From<Option<ResourceRef>> for Data {
    fn from(res: Option<ResourceRef>) -> Self {
        res.map_or(Data::Null, Data::Single)
    }
}

impl From<Vec<ResourceRef>> for Data {
    fn from(list: Vec<ResourceRef>) -> Self {
        Data::Collection(list)
    }
}

/// Inputs of one document.
#[derive(Default)]
pub struct DocumentParams {
    pub data: Data,
    /// Rendered only when `data` is [`Data::Absent`]; present data always
    /// takes precedence over errors.
    pub errors: Vec<Arc<dyn ErrorObject>>,
    pub meta: Option<Value>,
    pub links: Map<String, Value>,
    pub jsonapi: Option<Value>,
    pub fields: Fields,
    pub include: IncludeTree,
    /// Shared fragment cache; a fresh [`MemoryFragmentCache`] is used when unset.
    pub cache: Option<Arc<dyn FragmentCache>>,
}

impl DocumentParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = data.into();
        self
    }

    pub fn null_data(mut self) -> Self {
        self.data = Data::Null;
        self
    }

    pub fn error(mut self, error: impl ErrorObject + 'static) -> Self {
        self.errors.push(Arc::new(error));
        self
    }

    /// Errors are rendered only when no primary data is set.
    pub fn errors(mut self, errors: Vec<Arc<dyn ErrorObject>>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn link(mut self, name: impl Into<String>, link: Value) -> Self {
        self.links.insert(name.into(), link);
        self
    }

    pub fn links(mut self, links: Map<String, Value>) -> Self {
        self.links.extend(links);
        self
    }

    pub fn jsonapi(mut self, jsonapi: Value) -> Self {
        self.jsonapi = Some(jsonapi);
        self
    }

    /// Restrict the fields rendered for resources of `kind`.
    pub fn fields<I, S>(mut self, kind: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .insert(kind.into(), names.into_iter().map(Into::into).collect());
        self
    }

    pub fn include(mut self, include: impl Into<IncludeTree>) -> Self {
        self.include = include.into();
        self
    }

    pub fn cache(mut self, cache: Arc<dyn FragmentCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// A document rendered at most once.
pub struct Document {
    params: DocumentParams,
    json: OnceCell<String>,
}

impl Document {
    pub fn new(params: DocumentParams) -> Self {
        Self {
            params,
            json: OnceCell::new(),
        }
    }

    /// JSON text of the document. The first successful call renders it;
    /// later calls return the stored text.
    pub fn render(&self) -> Result<&str> {
        if let Some(json) = self.json.get() {
            return Ok(json);
        }
        let json = self.assemble()?;
        Ok(self.json.get_or_init(|| json))
    }

    /// The document parsed back into a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::from_str(self.render()?)?)
    }

    fn assemble(&self) -> Result<String> {
        let params = &self.params;
        let mut parts: Vec<String> = Vec::new();

        if params.data.is_present() {
            if !params.errors.is_empty() {
                log::debug!(
                    "Ignoring {} errors: primary data takes precedence",
                    params.errors.len()
                );
            }
            self.push_data(&mut parts)?;
        } else if !params.errors.is_empty() {
            parts.push(self.errors_member()?);
        }

        if !params.links.is_empty() {
            parts.push(format!("\"links\":{}", serde_json::to_string(&params.links)?));
        }
        if let Some(meta) = &params.meta {
            parts.push(format!("\"meta\":{}", serde_json::to_string(meta)?));
        }
        if let Some(jsonapi) = &params.jsonapi {
            parts.push(format!("\"jsonapi\":{}", serde_json::to_string(jsonapi)?));
        }

        Ok(format!("{{{}}}", parts.join(",")))
    }

    fn push_data(&self, parts: &mut Vec<String>) -> Result<()> {
        let params = &self.params;
        let traversal = traverse(params.data.roots(), &params.include)?;
        let fragments = match &params.cache {
            Some(cache) => fragments::render_fragments(&traversal, &params.fields, cache.as_ref())?,
            None => {
                let cache = MemoryFragmentCache::new();
                fragments::render_fragments(&traversal, &params.fields, &cache)?
            }
        };

        let data = match &params.data {
            Data::Collection(_) => format!("[{}]", fragments.primary.join(",")),
            Data::Single(_) => fragments.primary.into_iter().next().unwrap_or_else(|| "null".to_string()),
            Data::Null | Data::Absent => "null".to_string(),
        };
        parts.push(format!("\"data\":{}", data));
        if !fragments.included.is_empty() {
            parts.push(format!("\"included\":[{}]", fragments.included.join(",")));
        }
        Ok(())
    }

    fn errors_member(&self) -> Result<String> {
        let errors = self
            .params
            .errors
            .iter()
            .map(|e| Ok(serde_json::to_string(&e.as_jsonapi()?)?))
            .collect::<Result<Vec<String>>>()?;
        Ok(format!("\"errors\":[{}]", errors.join(",")))
    }
}

/// Render a document to JSON text.
pub fn render(params: DocumentParams) -> Result<String> {
    let doc = Document::new(params);
    let json = doc.render()?.to_string();
    Ok(json)
}

/// Render a document to a JSON value.
pub fn render_value(params: DocumentParams) -> Result<Value> {
    Document::new(params).to_value()
}
