pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod include;
pub mod render;
pub mod resource;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{RenderError, Result};
pub use graph::{traverse, Traversal};
pub use include::IncludeTree;
pub use render::{render, render_value, Data, Document, DocumentParams};
pub use resource::{ApiError, ErrorObject, FieldSet, Fields, Identity, Related, Resource, ResourceRef};
