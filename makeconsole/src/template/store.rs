//! Template store with cached and uncached modes
//!
//! In cached mode every `*.svg` file of the template directory is read once
//! at startup. The resulting map is never written again, so request handlers
//! share it without locking. A missing template is replaced by the fallback
//! template, and the caller reports the substitution inside the image.
//!
//! In uncached mode each lookup reads exactly one file. There is no fallback:
//! a missing template is an error, which makes typos visible while editing
//! templates.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{RenderError, StartupError};

/// File name suffix of template files, matched case-insensitively
pub const TEMPLATE_SUFFIX: &str = ".svg";

/// Template source selected for a request
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    name: String,
    source: Arc<str>,
    fallback: bool,
}

impl ResolvedTemplate {
    /// Name of the template that was actually selected
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the fallback was selected because the requested name is missing
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Name to template source mapping
///
/// Cloning is cheap; clones share the cached map.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    fallback: String,
    cache: Option<Arc<HashMap<String, Arc<str>>>>,
}

impl TemplateStore {
    /// Load every template of `dir` into an immutable cache
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed, any template file
    /// cannot be read, or no template named `fallback` exists. A partially
    /// loaded cache is never returned.
    pub fn cached(dir: impl Into<PathBuf>, fallback: impl Into<String>) -> Result<Self, StartupError> {
        let dir = dir.into();
        let templates = load_all(&dir)?;
        tracing::info!(
            dir = %dir.display(),
            count = templates.len(),
            "Templates loaded"
        );
        Self::with_cache(dir, fallback.into(), templates)
    }

    /// Build a cached store from in-memory templates
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::MissingFallback`] if no template is named
    /// `fallback`.
    pub fn from_templates<I, K, V>(fallback: impl Into<String>, templates: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arc<str>>,
    {
        let templates = templates
            .into_iter()
            .map(|(name, source)| (name.into(), source.into()))
            .collect();
        Self::with_cache(PathBuf::new(), fallback.into(), templates)
    }

    fn with_cache(
        dir: PathBuf,
        fallback: String,
        templates: HashMap<String, Arc<str>>,
    ) -> Result<Self, StartupError> {
        if !templates.contains_key(&fallback) {
            return Err(StartupError::MissingFallback(fallback));
        }

        Ok(Self {
            dir,
            fallback,
            cache: Some(Arc::new(templates)),
        })
    }

    /// Read templates from `dir` on every lookup
    #[must_use]
    pub fn uncached(dir: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            fallback: fallback.into(),
            cache: None,
        }
    }

    /// Resolve `name` to a template source
    ///
    /// # Errors
    ///
    /// In cached mode, returns [`RenderError::NoDefaultTemplate`] if neither
    /// `name` nor the fallback exists. In uncached mode, returns
    /// [`RenderError::TemplateNotFound`] if the file does not exist and
    /// [`RenderError::ReadFailed`] if it cannot be read.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTemplate, RenderError> {
        let Some(cache) = &self.cache else {
            return self.read(name);
        };

        if let Some(source) = cache.get(name) {
            return Ok(ResolvedTemplate {
                name: name.to_string(),
                source: Arc::clone(source),
                fallback: false,
            });
        }

        let source = cache
            .get(&self.fallback)
            .ok_or_else(|| RenderError::NoDefaultTemplate(self.fallback.clone()))?;
        tracing::debug!(requested = name, fallback = %self.fallback, "Template not found, using fallback");

        Ok(ResolvedTemplate {
            name: self.fallback.clone(),
            source: Arc::clone(source),
            fallback: true,
        })
    }

    /// Blocking; async callers go through `AppState::render_async`
    fn read(&self, name: &str) -> Result<ResolvedTemplate, RenderError> {
        if !is_plain_name(name) {
            return Err(RenderError::TemplateNotFound(name.to_string()));
        }

        let path = self.dir.join(format!("{name}{TEMPLATE_SUFFIX}"));
        let source = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => RenderError::TemplateNotFound(name.to_string()),
            _ => RenderError::ReadFailed {
                name: name.to_string(),
                source,
            },
        })?;
        tracing::trace!(path = %path.display(), "Template read from disk");

        Ok(ResolvedTemplate {
            name: name.to_string(),
            source: source.into(),
            fallback: false,
        })
    }

    /// Whether templates were loaded once at startup
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Sorted names of the cached templates; empty in uncached mode
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .cache
            .iter()
            .flat_map(|cache| cache.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }
}

/// Strip [`TEMPLATE_SUFFIX`] from a file name, ignoring case
fn template_name(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(TEMPLATE_SUFFIX.len())?;
    let suffix = file_name.get(split..)?;
    suffix
        .eq_ignore_ascii_case(TEMPLATE_SUFFIX)
        .then(|| &file_name[..split])
        .filter(|name| !name.is_empty())
}

/// Whether `name` addresses a file directly inside the template directory
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn load_all(dir: &Path) -> Result<HashMap<String, Arc<str>>, StartupError> {
    let scan_failed = |source| StartupError::ScanFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut templates = HashMap::new();
    for entry in fs::read_dir(dir).map_err(scan_failed)? {
        let entry = entry.map_err(scan_failed)?;
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
            continue;
        };
        let Some(name) = template_name(file_name) else {
            continue;
        };

        let read_failed = |source| StartupError::ReadFailed {
            path: path.clone(),
            source,
        };
        if fs::metadata(&path).map_err(read_failed)?.is_dir() {
            continue;
        }
        let source = fs::read_to_string(&path).map_err(read_failed)?;

        tracing::debug!(name, path = %path.display(), "Template cached");
        templates.insert(name.to_string(), Arc::from(source));
    }

    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn template_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_template_name() {
        assert_eq!(template_name("terminal.svg"), Some("terminal"));
        assert_eq!(template_name("Browser.SVG"), Some("Browser"));
        assert_eq!(template_name("notes.txt"), None);
        assert_eq!(template_name(".svg"), None);
        assert_eq!(template_name("svg"), None);
        assert_eq!(template_name("ö.svg"), Some("ö"));
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("terminal"));
        assert!(!is_plain_name("../terminal"));
        assert!(!is_plain_name("a\\b"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name(""));
    }

    #[test]
    fn test_cached_loads_svg_files_only() {
        let dir = template_dir(&[
            ("terminal.svg", "T"),
            ("browser.SVG", "B"),
            ("readme.md", "R"),
        ]);
        fs::create_dir(dir.path().join("nested.svg")).unwrap();

        let store = TemplateStore::cached(dir.path(), "terminal").unwrap();
        assert!(store.is_cached());
        assert_eq!(store.names(), vec!["browser", "terminal"]);
        assert_eq!(store.resolve("browser").unwrap().source(), "B");
    }

    #[test]
    fn test_cached_requires_fallback() {
        let dir = template_dir(&[("browser.svg", "B")]);
        let err = TemplateStore::cached(dir.path(), "terminal").unwrap_err();
        assert!(matches!(err, StartupError::MissingFallback(ref name) if name == "terminal"));
    }

    #[test]
    fn test_cached_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = TemplateStore::cached(dir.path().join("missing"), "terminal").unwrap_err();
        assert!(matches!(err, StartupError::ScanFailed { .. }));
    }

    #[test]
    fn test_cached_unreadable_template_is_fatal() {
        let dir = template_dir(&[("terminal.svg", "T")]);
        fs::write(dir.path().join("binary.svg"), [0xff, 0xfe, 0x00]).unwrap();
        let err = TemplateStore::cached(dir.path(), "terminal").unwrap_err();
        assert!(matches!(err, StartupError::ReadFailed { .. }));
    }

    #[test]
    fn test_resolve_falls_back() {
        let store =
            TemplateStore::from_templates("terminal", [("terminal", "T"), ("browser", "B")]).unwrap();

        let found = store.resolve("browser").unwrap();
        assert!(!found.is_fallback());
        assert_eq!(found.name(), "browser");

        let fallback = store.resolve("nope").unwrap();
        assert!(fallback.is_fallback());
        assert_eq!(fallback.name(), "terminal");
        assert_eq!(fallback.source(), "T");
    }

    #[test]
    fn test_resolve_without_fallback_entry() {
        let store = TemplateStore {
            dir: PathBuf::new(),
            fallback: "terminal".to_string(),
            cache: Some(Arc::new(HashMap::new())),
        };
        let err = store.resolve("nope").unwrap_err();
        assert!(matches!(err, RenderError::NoDefaultTemplate(ref name) if name == "terminal"));
    }

    #[test]
    fn test_uncached_reads_on_every_lookup() {
        let dir = template_dir(&[("terminal.svg", "first")]);
        let store = TemplateStore::uncached(dir.path(), "terminal");
        assert!(!store.is_cached());
        assert!(store.names().is_empty());
        assert_eq!(store.resolve("terminal").unwrap().source(), "first");

        fs::write(dir.path().join("terminal.svg"), "second").unwrap();
        assert_eq!(store.resolve("terminal").unwrap().source(), "second");
    }

    #[test]
    fn test_uncached_miss_has_no_fallback() {
        let dir = template_dir(&[("terminal.svg", "T")]);
        let store = TemplateStore::uncached(dir.path(), "terminal");
        let err = store.resolve("nope").unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_uncached_rejects_path_traversal() {
        let dir = template_dir(&[("terminal.svg", "T")]);
        let inner = dir.path().join("inner");
        fs::create_dir(&inner).unwrap();

        let store = TemplateStore::uncached(&inner, "terminal");
        let err = store.resolve("../terminal").unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }
}
