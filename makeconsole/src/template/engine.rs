//! Template execution
//!
//! The engine escapes the binding's lines, turns the binding into a flat
//! template context and executes the template with minijinja. Output is
//! produced in memory, so a failing template never yields partial output.

use minijinja::{AutoEscape, Environment, Error, ErrorKind, Value};
use std::collections::BTreeMap;

use super::wrap;
use crate::binding::Binding;
use crate::error::RenderError;

/// Shared template engine
///
/// Holds no per-request state; a single instance serves concurrent requests.
#[derive(Debug)]
pub struct RenderEngine {
    env: Environment<'static>,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine {
    /// Create an engine with the `push`, `limit_to` and `columns` filters registered
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();

        // Lines are escaped before rendering; escaping again would double encode
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("push", push);
        env.add_filter("limit_to", limit_to);
        env.add_filter("columns", columns);

        Self { env }
    }

    /// Execute template `source` against `binding`
    ///
    /// `name` only identifies the template in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if the template fails to parse or
    /// execute.
    ///
    /// # Example
    ///
    /// ```rust
    /// use makeconsole::{binding::Binding, template::RenderEngine};
    ///
    /// let engine = RenderEngine::new();
    /// let source = "{% for line in lines %}<text>{{ line }}</text>{% endfor %}";
    /// let svg = engine.render("inline", source, Binding::with_lines(["a<b"])).unwrap();
    /// assert_eq!(svg, b"<text>a&lt;b</text>");
    /// ```
    pub fn render(&self, name: &str, source: &str, mut binding: Binding) -> Result<Vec<u8>, RenderError> {
        binding.escape_lines();
        let ctx = context(binding);
        let output = self.env.render_named_str(name, source, ctx)?;
        Ok(output.into_bytes())
    }
}

/// Template context for `binding`
///
/// Fields holding their zero value are left out, so templates can test them
/// with `is defined` and apply their own defaults. Only `lines` is escaped;
/// `template` and `padding_color` are inserted as received.
fn context(binding: Binding) -> Value {
    let mut ctx: BTreeMap<&'static str, Value> = BTreeMap::new();

    if !binding.lines.is_empty() {
        ctx.insert("lines", Value::from(binding.lines));
    }
    if binding.width != 0 {
        ctx.insert("width", Value::from(binding.width));
    }
    if binding.radius != 0 {
        ctx.insert("radius", Value::from(binding.radius));
    }
    if binding.padding != 0 {
        ctx.insert("padding", Value::from(binding.padding));
    }
    if let Some(color) = binding.padding_color.filter(|color| !color.is_empty()) {
        ctx.insert("padding_color", Value::from(color));
    }
    if !binding.template.is_empty() {
        ctx.insert("template", Value::from(binding.template));
    }

    Value::from_serialize(&ctx)
}

/// `{{ seq | push(value) }}`: copy of `seq` with `value` appended
///
/// An undefined or none `seq` is treated as empty.
fn push(seq: Option<Vec<Value>>, value: Value) -> Vec<Value> {
    let mut seq = seq.unwrap_or_default();
    seq.push(value);
    seq
}

/// `{{ lines | limit_to(max) }}`: reflow escaped lines to `max` characters
fn limit_to(lines: Vec<String>, max_size: usize) -> Result<Vec<String>, Error> {
    wrap::limit_to_markup(&lines, max_size)
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, "cannot reflow lines").with_source(err))
}

/// `{{ line | columns }}`: visible length of an escaped line
fn columns(line: &str) -> usize {
    wrap::markup_len(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn render(source: &str, binding: Binding) -> Result<String, RenderError> {
        RenderEngine::new()
            .render("test", source, binding)
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_lines_are_escaped_before_substitution() {
        let out = render(
            "{% for line in lines %}{{ line }}{% endfor %}",
            Binding::with_lines(["<script>alert('x')</script>"]),
        )
        .unwrap();
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
        assert_eq!(out, "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;");
    }

    #[test]
    fn test_zero_fields_are_omitted() {
        let source = "{% if width is defined %}w{% endif %}\
                      {% if radius is defined %}r{% endif %}\
                      {% if padding is defined %}p{% endif %}\
                      {% if padding_color is defined %}c{% endif %}\
                      {% if lines is defined %}l{% endif %}\
                      {{ template }}";
        assert_eq!(render(source, Binding::default()).unwrap(), "terminal");

        let binding = Binding {
            width: 10,
            radius: 2,
            padding: 4,
            padding_color: Some("red".to_string()),
            ..Binding::with_lines(["x"])
        };
        assert_eq!(render(source, binding).unwrap(), "wrpclterminal");
    }

    #[test]
    fn test_empty_padding_color_is_omitted() {
        let binding = Binding {
            padding_color: Some(String::new()),
            ..Binding::default()
        };
        let out = render("{{ padding_color | default('none') }}", binding).unwrap();
        assert_eq!(out, "none");
    }

    #[test]
    fn test_values_are_substituted() {
        let binding = Binding {
            width: 120,
            padding: 4,
            ..Binding::default()
        };
        let out = render("{{ width + padding * 2 }}", binding).unwrap();
        assert_eq!(out, "128");
    }

    #[test]
    fn test_limit_to_filter() {
        let out = render(
            "{{ lines | limit_to(6) | join('|') }}",
            Binding::with_lines(["Hello World", "Hello Universe", "Good Bye"]),
        )
        .unwrap();
        assert_eq!(out, "Hello |World|Hello |Univer|se|Good B|ye");
    }

    #[test]
    fn test_limit_to_filter_keeps_entities() {
        let out = render(
            "{{ lines | limit_to(2) | join('|') }}",
            Binding::with_lines(["a<b"]),
        )
        .unwrap();
        assert_eq!(out, "a&lt;|b");
    }

    #[test]
    fn test_limit_to_zero_fails() {
        let err = render("{{ lines | limit_to(0) }}", Binding::with_lines(["abc"])).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(err.detailed_message().contains("maximum line length must be positive"));
    }

    #[test]
    fn test_columns_filter_counts_entities_once() {
        let out = render(
            "{% for line in lines %}{{ line | columns }}/{{ line | length }} {% endfor %}",
            Binding::with_lines(["<b>", "plain", ""]),
        )
        .unwrap();
        assert_eq!(out, "3/9 5/5 0/0 ");
    }

    #[test]
    fn test_template_name_is_not_escaped() {
        let binding = Binding {
            template: "x\"/><script>".to_string(),
            ..Binding::default()
        };
        let out = render("{{ template }}|{{ template | e }}", binding).unwrap();
        let (raw, escaped) = out.split_once('|').unwrap();
        assert_eq!(raw, "x\"/><script>");
        assert!(escaped.contains("&lt;script&gt;"));
        assert!(!escaped.contains(['<', '"']));
    }

    #[test]
    fn test_push_filter() {
        let out = render(
            "{{ lines | push('$ ') | join('|') }}",
            Binding::with_lines(["a", "b"]),
        )
        .unwrap();
        assert_eq!(out, "a|b|$ ");
    }

    #[test]
    fn test_push_onto_undefined() {
        let out = render("{{ missing | push(1) | length }}", Binding::default()).unwrap();
        assert_eq!(out, "1");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = render("{% if %}", Binding::default()).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn test_concurrent_renders_do_not_interfere() {
        let engine = Arc::new(RenderEngine::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let (name, source) = if i % 2 == 0 {
                        ("even", "even:{{ lines | join(',') }}")
                    } else {
                        ("odd", "odd:{{ lines | join(',') }}")
                    };
                    for _ in 0..50 {
                        let line = format!("line-{i}");
                        let out = engine
                            .render(name, source, Binding::with_lines([line.clone()]))
                            .unwrap();
                        assert_eq!(String::from_utf8(out).unwrap(), format!("{name}:{line}"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
