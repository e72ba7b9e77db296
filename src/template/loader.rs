//! On-demand template loading
//!
//! The engine consults a [`TemplateLoader`] whenever a template or component
//! name is not registered. [`FileSystemLoader`] maps dotted names onto a
//! directory tree: `components.alert` is read from `<root>/components/alert.tpl`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::template::is_template_name;

/// Default file extension for template files
pub const DEFAULT_EXTENSION: &str = "tpl";

/// Source of templates that are not in the registry
pub trait TemplateLoader: Send + Sync {
    /// Load the source of the named template, if it exists
    fn load(&self, name: &str) -> Option<String>;
}

impl<F> TemplateLoader for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn load(&self, name: &str) -> Option<String> {
        self(name)
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("error reading template {name} from {path}: {source}")]
    Read {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template directory not found: {0}")]
    MissingRoot(PathBuf),
}

/// Loads templates from files under a root directory
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
    extension: String,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set the file extension (without the leading dot)
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path that holds the named template
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in name.split('.') {
            path.push(segment);
        }
        path.set_extension(&self.extension);
        path
    }

    /// Template name for a file path under the root
    fn name_for(&self, path: &Path) -> Option<String> {
        if path.extension()? != self.extension.as_str() {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        Some(segments?.join("."))
    }

    /// Find every template under the root, sorted by name
    ///
    /// Hidden files and directories are skipped.
    pub fn discover(&self) -> Result<Vec<String>, LoaderError> {
        if !self.root.is_dir() {
            return Err(LoaderError::MissingRoot(self.root.clone()));
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let mut names: Vec<String> = walker
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.name_for(e.path()))
            .collect();
        names.sort();

        tracing::debug!(root = ?self.root, count = names.len(), "discovered templates");
        Ok(names)
    }

    /// Read every discovered template as `(name, source)` pairs
    pub fn load_all(&self) -> Result<Vec<(String, String)>, LoaderError> {
        self.discover()?
            .into_iter()
            .map(|name| {
                let path = self.path_for(&name);
                std::fs::read_to_string(&path)
                    .map(|source| (name.clone(), source))
                    .map_err(|source| LoaderError::Read { name, path, source })
            })
            .collect()
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Option<String> {
        // `..` and `/` never reach the filesystem
        if !is_template_name(name) {
            return None;
        }
        let path = self.path_for(name);
        match std::fs::read_to_string(&path) {
            Ok(source) => {
                tracing::debug!(template = name, path = ?path, "loaded template");
                Some(source)
            }
            Err(_) => None,
        }
    }
}
