//! Template resolution and rendering
//!
//! - [`store`]: name to template source mapping, cached or read per request
//! - [`engine`]: escapes a binding and executes a template against it
//! - [`wrap`]: fixed-width line reflow and measurement, exposed to templates
//!   as the `limit_to` and `columns` filters
//!
//! # Template context
//!
//! Templates see the binding as flat variables. Fields holding their zero
//! value are undefined:
//!
//! | Variable        | Type             |
//! |-----------------|------------------|
//! | `lines`         | list of strings  |
//! | `width`         | integer          |
//! | `radius`        | integer          |
//! | `padding`       | integer          |
//! | `padding_color` | string           |
//! | `template`      | string           |
//!
//! Only `lines` is escaped before rendering, and auto-escaping is off so it
//! is not encoded twice. `template` and `padding_color` come straight from
//! the query string: templates that embed either of them in markup must pass
//! it through the `e` filter (`{{ template | e }}`).
//!
//! Escaped lines hold entities such as `&lt;`, so the built-in `length`
//! filter overcounts them. Use `columns` to measure the visible width of a
//! line.
//!
//! # Example
//!
//! ```rust
//! use makeconsole::binding::Binding;
//! use makeconsole::template::{RenderEngine, TemplateStore};
//!
//! let store = TemplateStore::from_templates(
//!     "terminal",
//!     [("terminal", "{{ lines | limit_to(4) | join(' ') }}")],
//! )
//! .unwrap();
//! let template = store.resolve("terminal").unwrap();
//!
//! let engine = RenderEngine::new();
//! let out = engine
//!     .render(template.name(), template.source(), Binding::with_lines(["abcdef"]))
//!     .unwrap();
//! assert_eq!(out, b"abcd ef");
//! ```

pub mod engine;
pub mod store;
pub mod wrap;

pub use engine::RenderEngine;
pub use store::{ResolvedTemplate, TemplateStore, TEMPLATE_SUFFIX};
