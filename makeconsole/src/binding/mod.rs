//! Render request parameters
//!
//! A [`Binding`] is the validated form of a render request. It is built from
//! [`QueryParams`], the case-insensitive multimap produced by decoding the
//! request's query string.
//!
//! Recognized parameters:
//!
//! | Name            | Effect                                              |
//! |-----------------|-----------------------------------------------------|
//! | `lines`         | Lines separated by `\n`                             |
//! | `line`          | A single line, used verbatim                        |
//! | `width`         | Fixed width in characters                           |
//! | `radius`        | Corner radius                                       |
//! | `padding`       | Padding around the window                           |
//! | `padding-color` | Color of the padding, forwarded verbatim            |
//! | `template`      | Template name, defaults to [`DEFAULT_TEMPLATE`]     |
//!
//! When both `line` and `lines` are present, `lines` wins.

use std::collections::BTreeMap;

use crate::error::RenderError;

/// Template used when the request does not name one
pub const DEFAULT_TEMPLATE: &str = "terminal";

/// Query parameters grouped by lowercase name
///
/// Values of a repeated name are kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Group decoded `(name, value)` pairs by lowercase name
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            values
                .entry(name.as_ref().to_lowercase())
                .or_default()
                .push(value.into());
        }
        Self { values }
    }

    /// First value of `name`, matched case-insensitively
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Validated render request
///
/// Numeric fields use `0` for "unset"; templates apply their own defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Raw, unescaped lines in presentation order
    pub lines: Vec<String>,
    /// Fixed width in characters
    pub width: u32,
    /// Corner radius
    pub radius: u32,
    /// Padding around the window
    pub padding: u32,
    /// Color of the padding
    pub padding_color: Option<String>,
    /// Template name, never empty
    pub template: String,
}

impl Default for Binding {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            width: 0,
            radius: 0,
            padding: 0,
            padding_color: None,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl Binding {
    /// Binding for `lines` with every other field unset
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build a binding from query parameters
    ///
    /// Unknown parameters are ignored. The template name is not validated
    /// here; resolution happens in the template store.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidParameter`] if `width`, `radius` or
    /// `padding` is not a non-negative base-10 integer. Parsing stops at the
    /// first invalid parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use makeconsole::binding::{Binding, QueryParams};
    ///
    /// let params = QueryParams::from_pairs([("Line", "Hi"), ("width", "40")]);
    /// let binding = Binding::from_params(&params).unwrap();
    /// assert_eq!(binding.lines, vec!["Hi"]);
    /// assert_eq!(binding.width, 40);
    /// assert_eq!(binding.template, "terminal");
    /// ```
    pub fn from_params(params: &QueryParams) -> Result<Self, RenderError> {
        let mut binding = Self::default();

        if let Some(line) = params.first("line") {
            binding.lines = vec![line.to_string()];
        }
        if let Some(lines) = params.first("lines") {
            binding.lines = lines.split('\n').map(str::to_string).collect();
        }

        binding.width = parse_dimension(params, "width")?;
        binding.radius = parse_dimension(params, "radius")?;
        binding.padding = parse_dimension(params, "padding")?;

        binding.padding_color = params.first("padding-color").map(str::to_string);

        if let Some(template) = params.first("template").filter(|name| !name.is_empty()) {
            binding.template = template.to_string();
        }

        Ok(binding)
    }

    /// Replace the content with a diagnostic about a missing template
    ///
    /// Used when the fallback template is rendered in place of `template`.
    pub fn report_missing_template(&mut self) {
        self.lines = vec![format!("No such template `{}'", self.template)];
        self.width = 0;
    }

    /// Escape every line for embedding in markup
    pub fn escape_lines(&mut self) {
        for line in &mut self.lines {
            *line = escape(line);
        }
    }
}

fn parse_dimension(params: &QueryParams, name: &'static str) -> Result<u32, RenderError> {
    params.first(name).map_or(Ok(0), |value| {
        value
            .parse()
            .map_err(|source| RenderError::InvalidParameter {
                name,
                value: value.to_string(),
                source,
            })
    })
}

/// Escape `&`, `<`, `>`, `'` and `"` as entities
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&#34;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
