//! Template storage and discovery
//!
//! Templates are addressed by dot-namespaced names such as
//! `layouts.main` or `components.alert`. The [`TemplateRegistry`] holds the
//! parsed form of every registered template; a [`TemplateLoader`] supplies
//! templates on demand when a name is not registered.

mod loader;
mod registry;

pub use loader::{FileSystemLoader, LoaderError, TemplateLoader};
pub use registry::{is_template_name, Template, TemplateRegistry};
