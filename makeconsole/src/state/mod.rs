//! Application state management
//!
//! [`AppState`] is built once at startup and handed to every request handler
//! through axum's `State` extractor. It owns the template store and the
//! render engine; neither is mutated after construction.

use std::sync::Arc;

use crate::binding::Binding;
use crate::config::MakeconsoleConfig;
use crate::error::{RenderError, StartupError};
use crate::template::{RenderEngine, TemplateStore};

/// Application state for the makeconsole service
///
/// # Example
///
/// ```rust
/// use makeconsole::{binding::Binding, config::MakeconsoleConfig, state::AppState};
/// use makeconsole::template::TemplateStore;
///
/// let store = TemplateStore::from_templates("terminal", [("terminal", "{{ lines[0] }}")]).unwrap();
/// let state = AppState::with_store(MakeconsoleConfig::default(), store);
///
/// let svg = state.render(Binding::with_lines(["Hi"])).unwrap();
/// assert_eq!(svg, b"Hi");
/// ```
#[derive(Clone)]
pub struct AppState {
    config: Arc<MakeconsoleConfig>,
    store: TemplateStore,
    engine: Arc<RenderEngine>,
}

impl AppState {
    /// Create application state, loading templates as configured
    ///
    /// # Errors
    ///
    /// In cached mode, returns an error if the template directory cannot be
    /// read or has no fallback template.
    pub fn new(config: MakeconsoleConfig) -> Result<Self, StartupError> {
        let settings = &config.templates;
        let store = if settings.cache_enabled {
            TemplateStore::cached(&settings.template_dir, settings.fallback.as_str())?
        } else {
            tracing::info!(
                dir = %settings.template_dir.display(),
                "Template cache disabled, reading templates per request"
            );
            TemplateStore::uncached(&settings.template_dir, settings.fallback.as_str())
        };

        Ok(Self::with_store(config, store))
    }

    /// Create application state around an existing template store
    #[must_use]
    pub fn with_store(config: MakeconsoleConfig, store: TemplateStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
            engine: Arc::new(RenderEngine::new()),
        }
    }

    /// Resolve the binding's template and render it
    ///
    /// When the requested template is missing and the fallback is used, the
    /// binding's lines are replaced by a diagnostic line so the problem is
    /// visible in the returned image.
    ///
    /// # Errors
    ///
    /// Returns an error if no template can be resolved or the template fails
    /// to execute.
    pub fn render(&self, mut binding: Binding) -> Result<Vec<u8>, RenderError> {
        let template = self.store.resolve(&binding.template)?;
        if template.is_fallback() {
            tracing::warn!(
                requested = %binding.template,
                fallback = template.name(),
                "No such template"
            );
            binding.report_missing_template();
        }

        self.engine
            .render(template.name(), template.source(), binding)
    }

    /// Render on a blocking thread when templates are read from disk
    ///
    /// In uncached mode [`Self::render`] reads the template file, so it runs
    /// under [`tokio::task::spawn_blocking`] and a slow disk stalls only this
    /// request. Cached renders never touch the filesystem and run in place.
    ///
    /// # Errors
    ///
    /// See [`Self::render`]. Also returns [`RenderError::Task`] if the
    /// blocking task panics.
    pub async fn render_async(&self, binding: Binding) -> Result<Vec<u8>, RenderError> {
        if self.store.is_cached() {
            return self.render(binding);
        }

        let state = self.clone();
        tokio::task::spawn_blocking(move || state.render(binding)).await?
    }

    /// Get configuration reference
    #[must_use]
    pub fn config(&self) -> &MakeconsoleConfig {
        &self.config
    }

    /// Get the template store
    #[must_use]
    pub const fn store(&self) -> &TemplateStore {
        &self.store
    }
}
