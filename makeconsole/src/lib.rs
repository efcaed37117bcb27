//! makeconsole: render lines of text as terminal and browser window SVGs
//!
//! The service takes a handful of query parameters, selects a named SVG
//! template and renders the lines into it:
//!
//! ```text
//! GET /svg?lines=Hello%20World%0AThis%20is%20a%20new%20Line!&template=terminal
//! ```
//!
//! # Pipeline
//!
//! 1. [`binding`]: query parameters are validated into a [`binding::Binding`]
//! 2. [`template::store`]: the template name is resolved, falling back to
//!    `terminal` in cached mode
//! 3. [`template::engine`]: lines are escaped and the template is executed
//! 4. [`handlers`]: the bytes are written as `image/svg+xml`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use makeconsole::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     makeconsole::observability::init()?;
//!
//!     let config = MakeconsoleConfig::load_for_service("makeconsole")?;
//!     let port = config.service.listen_port()?;
//!     let state = AppState::new(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
//!     axum::serve(listener, router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod state;
pub mod template;

pub mod prelude {
    //! Convenience re-exports for common types

    pub use crate::binding::{Binding, QueryParams, DEFAULT_TEMPLATE};
    pub use crate::config::MakeconsoleConfig;
    pub use crate::error::{RenderError, StartupError};
    pub use crate::handlers::router;
    pub use crate::state::AppState;
    pub use crate::template::{RenderEngine, ResolvedTemplate, TemplateStore};
}
