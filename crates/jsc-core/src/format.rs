//! Value formatting.
//!
//! Turns any [`Value`] into a deterministic, single string. Cycles are cut
//! with `[circular]`, inaccessible properties are skipped, and the final
//! text is HTML-escaped once as a whole so it can be posted into markup.

use serde::{Deserialize, Serialize};

use crate::value::{Value, number_to_string};

/// Marker rendered in place of a reference already on the current path.
pub const CIRCULAR: &str = "[circular]";

/// Placeholder used for callables in [`FunctionStyle::Placeholder`].
pub const FUNCTION_PLACEHOLDER: &str = "[object Function]";

/// How callables are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionStyle {
    /// The function's source text.
    #[default]
    Source,
    /// A fixed `[object Function]` placeholder.
    Placeholder,
}

/// Host objects are dumped property by property at the top level; nested
/// ones collapse to their tag so native graphs stay shallow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Full,
    Simple,
}

/// Formats runtime values as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFormatter {
    function_style: FunctionStyle,
}

impl ValueFormatter {
    pub fn new(function_style: FunctionStyle) -> Self {
        Self { function_style }
    }

    pub fn function_style(&self) -> FunctionStyle {
        self.function_style
    }

    /// Formats `value` and HTML-escapes the result.
    pub fn format(&self, value: &Value) -> String {
        escape_html(&self.stringify(value))
    }

    /// Formats `value` without the HTML-escaping post-pass.
    pub fn stringify(&self, value: &Value) -> String {
        let mut path = Vec::new();
        self.render(value, Depth::Full, &mut path)
    }

    fn render(&self, value: &Value, depth: Depth, path: &mut Vec<*const ()>) -> String {
        if let Some(id) = value.identity() {
            if path.contains(&id) {
                return CIRCULAR.to_string();
            }
        }

        match value {
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => quote(s),
            Value::Function(source) => match self.function_style {
                FunctionStyle::Source => source.clone(),
                FunctionStyle::Placeholder => FUNCTION_PLACEHOLDER.to_string(),
            },
            Value::Array(array) => {
                path.push(identity_of(value));
                let parts: Vec<String> = array
                    .items()
                    .iter()
                    .map(|item| self.render(item, depth, path))
                    .collect();
                path.pop();
                format!("[{}]", parts.join(", "))
            }
            Value::Object(object) => {
                path.push(identity_of(value));
                let mut parts = Vec::new();
                for key in sorted_keys(object.keys()) {
                    // Unreadable properties drop out; the rest of the object still renders.
                    if let Ok(Some(child)) = object.get(&key) {
                        parts.push(format!("{}: {}", quote(&key), self.render(&child, depth, path)));
                    }
                }
                path.pop();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Host(host) => {
                if depth == Depth::Simple {
                    return value.to_string();
                }
                path.push(identity_of(value));
                let mut parts = Vec::new();
                for key in sorted_keys(host.keys()) {
                    if let Ok(Some(child)) = host.get(&key) {
                        parts.push(format!("{}: {}", key, self.render(&child, Depth::Simple, path)));
                    }
                }
                path.pop();
                format!("{}{{\n{}\n}}", value, parts.join(",\n"))
            }
        }
    }
}

fn identity_of(value: &Value) -> *const () {
    value.identity().unwrap_or(std::ptr::null())
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Sorts keys case-insensitively ascending; ties keep insertion order.
fn sorted_keys(mut keys: Vec<String>) -> Vec<String> {
    keys.sort_by_cached_key(|k| k.to_lowercase());
    keys
}

/// Formats `value` with the default formatter (source-text functions).
pub fn format(value: &Value) -> String {
    ValueFormatter::default().format(value)
}

/// Escapes `& < > " ' /` with fixed entities.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{HostRef, ObjectRef};

    fn stringify(value: &Value) -> String {
        ValueFormatter::default().stringify(value)
    }

    #[test]
    fn test_primitives() {
        assert_eq!(stringify(&Value::Null), "null");
        assert_eq!(stringify(&Value::Undefined), "undefined");
        assert_eq!(stringify(&Value::from(true)), "true");
        assert_eq!(stringify(&Value::from(2i64)), "2");
        assert_eq!(stringify(&Value::from(0.5)), "0.5");
    }

    #[test]
    fn test_string_quotes_and_escapes_inner_quotes() {
        assert_eq!(stringify(&Value::from(r#"say "hi""#)), r#""say \"hi\"""#);
    }

    #[test]
    fn test_formatting_own_output_quotes_again() {
        let once = stringify(&Value::from("x"));
        let twice = stringify(&Value::from(once.as_str()));
        assert_eq!(twice, r#""\"x\"""#);
    }

    #[test]
    fn test_object_keys_sorted_case_insensitively() {
        let value = Value::object([("B", Value::from(1i64)), ("a", Value::from(2i64))]);
        assert_eq!(stringify(&value), r#"{"a": 2, "B": 1}"#);
        assert_eq!(
            format(&value),
            "{&quot;a&quot;: 2, &quot;B&quot;: 1}"
        );
    }

    #[test]
    fn test_array_of_mixed_values() {
        let value = Value::array([
            Value::from(1i64),
            Value::from("two"),
            Value::Null,
            Value::array([]),
        ]);
        assert_eq!(stringify(&value), r#"[1, "two", null, []]"#);
    }

    #[test]
    fn test_self_referential_object_terminates() {
        let obj = ObjectRef::new();
        obj.set("name", Value::from("loop"));
        obj.set("self", Value::Object(obj.clone()));

        let out = stringify(&Value::Object(obj));
        assert_eq!(out, r#"{"name": "loop", "self": [circular]}"#);
        assert_eq!(out.matches(CIRCULAR).count(), 1);
    }

    #[test]
    fn test_circular_marker_once_per_cycle_edge() {
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        a.set("b", Value::Object(b.clone()));
        b.set("a", Value::Object(a.clone()));
        b.set("me", Value::Object(b.clone()));

        let out = stringify(&Value::Object(a));
        assert_eq!(out, r#"{"b": {"a": [circular], "me": [circular]}}"#);
    }

    #[test]
    fn test_shared_sibling_is_not_circular() {
        let shared = Value::array([Value::from(1i64)]);
        let value = Value::array([shared.clone(), shared]);
        assert_eq!(stringify(&value), "[[1], [1]]");
    }

    #[test]
    fn test_inaccessible_property_is_omitted() {
        let obj = ObjectRef::new();
        obj.set("ok", Value::from(1i64));
        obj.set_inaccessible("locked", "Permission denied");

        assert_eq!(stringify(&Value::Object(obj)), r#"{"ok": 1}"#);
    }

    #[test]
    fn test_function_styles() {
        let f = Value::function("function () { return 1; }");
        assert_eq!(stringify(&f), "function () { return 1; }");

        let simple = ValueFormatter::new(FunctionStyle::Placeholder);
        assert_eq!(simple.stringify(&f), FUNCTION_PLACEHOLDER);
    }

    #[test]
    fn test_host_object_dump_is_shallow() {
        let parent = HostRef::new("HTMLBodyElement");
        let div = HostRef::new("HTMLDivElement");
        div.set("id", Value::from("main"));
        div.set("parentNode", Value::from(parent));
        div.set_inaccessible("mozProtected", "NS_ERROR_NOT_IMPLEMENTED");

        assert_eq!(
            stringify(&Value::from(div)),
            "[object HTMLDivElement]{\nid: \"main\",\nparentNode: [object HTMLBodyElement]\n}"
        );
    }

    #[test]
    fn test_escape_html_covers_six_characters() {
        assert_eq!(
            escape_html(r#"<a href='/x'>&"</a>"#),
            "&lt;a href=&#39;&#x2F;x&#39;&gt;&amp;&quot;&lt;&#x2F;a&gt;"
        );
    }

    #[test]
    fn test_escape_applies_to_string_contents_not_braces() {
        let value = Value::object([("k", Value::from("<b>"))]);
        assert_eq!(format(&value), "{&quot;k&quot;: &quot;&lt;b&gt;&quot;}");
    }
}
