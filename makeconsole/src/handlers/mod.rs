//! HTTP handlers
//!
//! - `GET /svg` renders the lines given in the query string
//! - `GET /` (and any other path) renders the usage help as an image
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use makeconsole::{config::MakeconsoleConfig, handlers, state::AppState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = AppState::new(MakeconsoleConfig::default())?;
//! let app = handlers::router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::binding::{Binding, QueryParams};
use crate::error::RenderError;
use crate::state::AppState;

/// Content type of rendered images
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Where the source code lives, shown in the help image
const SOURCE_URL: &str = "https://github.com/Eun/makeconsole";

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/svg", get(render_svg))
        .route("/", get(help))
        .fallback(help)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render the lines given in the query string
///
/// # Errors
///
/// Returns an error response if a parameter is invalid or the template
/// cannot be resolved or executed.
pub async fn render_svg(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, RenderError> {
    let params = QueryParams::from_pairs(pairs);
    let binding = Binding::from_params(&params)?;
    tracing::debug!(
        template = %binding.template,
        lines = binding.lines.len(),
        width = binding.width,
        "Rendering svg"
    );

    let svg = state.render_async(binding).await?;
    Ok(svg_response(svg))
}

/// Render the usage help
///
/// # Errors
///
/// Returns an error response if the help template cannot be rendered.
pub async fn help(State(state): State<AppState>) -> Result<Response, RenderError> {
    let binding = Binding::with_lines(help_lines(&state.config().service.url));
    let svg = state.render_async(binding).await?;
    Ok(svg_response(svg))
}

fn svg_response(svg: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg).into_response()
}

/// Usage text for a service reachable at `url`
#[must_use]
pub fn help_lines(url: &str) -> Vec<String> {
    vec![
        "Usage:".to_string(),
        "  Call".to_string(),
        String::new(),
        format!("      {url}/svg"),
        String::new(),
        "With these url parameters:".to_string(),
        "  lines=Hello%20World%0AThis%20is%20a%20new%20Line!".to_string(),
        "  width=120           Set a fixed width".to_string(),
        "  template=terminal   Use a template (templates available: terminal, browser)".to_string(),
        "  padding=4           Set a padding".to_string(),
        "  padding-color=      Set the color of the padding".to_string(),
        "  radius=8            Set a custom radius".to_string(),
        String::new(),
        "Example:".to_string(),
        format!("      {url}/svg?lines=Hello%20World"),
        String::new(),
        format!("Version {}", env!("CARGO_PKG_VERSION")),
        "Source Code:".to_string(),
        format!("      {SOURCE_URL}"),
    ]
}
