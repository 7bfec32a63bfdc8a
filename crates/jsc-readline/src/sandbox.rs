//! A small expression sandbox for trying the console from a terminal.
//!
//! Understands JSON literals, numbers, quoted strings, variables,
//! `let name = expr`, `+ - * / %` with parentheses, and the calls
//! `log(expr)`, `info(expr)`, `warn(expr)`, `error(expr)` which go through
//! the console bridge. Statements are separated by `;` or line breaks.

use std::collections::HashMap;

use jsc_core::error::{ConsoleError, Result};
use jsc_core::value::HostRef;
use jsc_core::{ConsoleBridge, Sandbox, Value};

const BRIDGE_CALLS: [&str; 4] = ["log", "info", "warn", "error"];

pub struct DemoSandbox {
    bridge: ConsoleBridge,
    globals: HashMap<String, Value>,
}

impl DemoSandbox {
    pub fn new(bridge: ConsoleBridge) -> Self {
        let window = HostRef::new("Window");
        window.set("innerWidth", Value::from(1280i64));
        window.set("innerHeight", Value::from(720i64));
        window.set("name", Value::from(""));
        window.set("document", HostRef::new("HTMLDocument").into());
        window.set("self", window.clone().into());
        window.set_inaccessible("frameElement", "SecurityError: Permission denied");

        let mut globals = HashMap::new();
        globals.insert("window".to_string(), Value::from(window));
        globals.insert("NaN".to_string(), Value::Number(f64::NAN));
        globals.insert("Infinity".to_string(), Value::Number(f64::INFINITY));

        Self { bridge, globals }
    }

    fn statement(&mut self, stmt: &str) -> Result<Value> {
        if let Some(rest) = stmt.strip_prefix("let ") {
            let (name, expr) = rest
                .split_once('=')
                .ok_or_else(|| syntax_error("missing = in let declaration"))?;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(syntax_error(&format!("invalid variable name `{}`", name)));
            }
            let value = self.expression(expr)?;
            self.globals.insert(name.to_string(), value);
            return Ok(Value::Undefined);
        }

        for call in BRIDGE_CALLS {
            let Some(args) = stmt
                .strip_prefix(call)
                .map(str::trim_start)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'))
            else {
                continue;
            };
            let value = self.expression(args)?;
            match call {
                "log" => self.bridge.log(value),
                "info" => self.bridge.info(value),
                "warn" => self.bridge.warn(value),
                _ => self.bridge.error(value),
            }
            return Ok(Value::Undefined);
        }

        self.expression(stmt)
    }

    fn expression(&self, source: &str) -> Result<Value> {
        let mut parser = Parser {
            source,
            pos: 0,
            globals: &self.globals,
        };
        let value = parser.additive()?;
        parser.skip_whitespace();
        if parser.pos < source.len() {
            return Err(syntax_error(&format!(
                "Unexpected token `{}`",
                &source[parser.pos..]
            )));
        }
        Ok(value)
    }
}

impl Sandbox for DemoSandbox {
    fn evaluate(&mut self, code: &str) -> Result<Value> {
        let mut last = Value::Undefined;
        for stmt in statements(code) {
            last = self.statement(stmt)?;
        }
        Ok(last)
    }

    fn inject(&mut self, source: &str) -> Result<()> {
        self.evaluate(source).map(|_| ())
    }
}

fn statements(code: &str) -> impl Iterator<Item = &str> {
    code.split([';', '\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn syntax_error(message: &str) -> ConsoleError {
    ConsoleError::evaluation(format!("SyntaxError: {}", message))
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    globals: &'a HashMap<String, Value>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        let source = self.source;
        &source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn additive(&mut self) -> Result<Value> {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat('+') {
                let right = self.multiplicative()?;
                left = add(&left, &right);
            } else if self.eat('-') {
                let right = self.multiplicative()?;
                left = Value::Number(to_number(&left) - to_number(&right));
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Value> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat('*') {
                '*'
            } else if self.eat('/') {
                '/'
            } else if self.eat('%') {
                '%'
            } else {
                return Ok(left);
            };
            let (a, b) = (to_number(&left), to_number(&self.unary()?));
            left = Value::Number(match op {
                '*' => a * b,
                '/' => a / b,
                _ => a % b,
            });
        }
    }

    fn unary(&mut self) -> Result<Value> {
        if self.eat('-') {
            return Ok(Value::Number(-to_number(&self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value> {
        self.skip_whitespace();
        if self.eat('(') {
            let value = self.additive()?;
            if !self.eat(')') {
                return Err(syntax_error("missing ) in parenthetical"));
            }
            return Ok(value);
        }

        let rest = self.rest();
        let Some(first) = rest.chars().next() else {
            return Err(syntax_error("Unexpected end of input"));
        };

        if first.is_ascii_digit() || first == '.' {
            return self.number();
        }
        if matches!(first, '[' | '{' | '"') {
            return self.json_literal();
        }
        if first == '\'' {
            return self.single_quoted();
        }

        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(syntax_error(&format!("Unexpected token `{}`", first)));
        }
        let name = &rest[..len];
        self.pos += len;

        match name {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "undefined" => Ok(Value::Undefined),
            _ => self.globals.get(name).cloned().ok_or_else(|| {
                ConsoleError::evaluation(format!("ReferenceError: {} is not defined", name))
            }),
        }
    }

    fn number(&mut self) -> Result<Value> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut len = 0;
        while len < bytes.len() && (bytes[len].is_ascii_digit() || bytes[len] == b'.') {
            len += 1;
        }
        if len < bytes.len() && matches!(bytes[len], b'e' | b'E') {
            let mut exp = len + 1;
            if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
                exp += 1;
            }
            if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                len = exp;
                while len < bytes.len() && bytes[len].is_ascii_digit() {
                    len += 1;
                }
            }
        }

        let literal = &rest[..len];
        let n = literal
            .parse::<f64>()
            .map_err(|_| syntax_error(&format!("Invalid number `{}`", literal)))?;
        self.pos += len;
        Ok(Value::Number(n))
    }

    /// Arrays, objects and double-quoted strings, parsed as JSON.
    fn json_literal(&mut self) -> Result<Value> {
        let mut stream =
            serde_json::Deserializer::from_str(self.rest()).into_iter::<serde_json::Value>();
        match stream.next() {
            Some(Ok(json)) => {
                self.pos += stream.byte_offset();
                Ok(Value::from(json))
            }
            Some(Err(e)) => Err(syntax_error(&e.to_string())),
            None => Err(syntax_error("Unexpected end of input")),
        }
    }

    fn single_quoted(&mut self) -> Result<Value> {
        let body = &self.rest()[1..];
        let end = body
            .find('\'')
            .ok_or_else(|| syntax_error("unterminated string literal"))?;
        let text = body[..end].to_string();
        self.pos += end + 2;
        Ok(Value::String(text))
    }
}

/// `+`: string concatenation when either side is a string, numeric otherwise.
fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Value::String(format!("{}{}", left, right))
        }
        _ => Value::Number(to_number(left) + to_number(right)),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsc_core::format;
    use jsc_core::sandbox::BridgeCall;

    fn sandbox() -> (DemoSandbox, tokio::sync::mpsc::UnboundedReceiver<BridgeCall>) {
        let (bridge, calls) = ConsoleBridge::channel();
        (DemoSandbox::new(bridge), calls)
    }

    fn eval(code: &str) -> String {
        let (mut sandbox, _calls) = sandbox();
        format::format(&sandbox.evaluate(code).unwrap())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1+1"), "2");
        assert_eq!(eval("2 * (3 + 4)"), "14");
        assert_eq!(eval("-3 - -1"), "-2");
        assert_eq!(eval("7 % 4"), "3");
        assert_eq!(eval("1 / 0"), "Infinity");
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(eval("1.5e3"), "1500");
        assert_eq!(eval(".5 + .25"), "0.75");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("'a' + 1"), "&quot;a1&quot;");
        assert_eq!(eval("\"x\" + \"y\""), "&quot;xy&quot;");
    }

    #[test]
    fn test_json_literals() {
        assert_eq!(eval("[1, 2]"), "[1, 2]");
        assert_eq!(eval("{\"B\": 1, \"a\": 2}"), "{&quot;a&quot;: 2, &quot;B&quot;: 1}");
    }

    #[test]
    fn test_variables_persist_between_evaluations() {
        let (mut sandbox, _calls) = sandbox();
        sandbox.evaluate("let x = 40").unwrap();
        let value = sandbox.evaluate("x + 2").unwrap();
        assert_eq!(format::format(&value), "42");
    }

    #[test]
    fn test_multiple_statements_return_last() {
        assert_eq!(eval("let a = 1; let b = 2\na + b"), "3");
    }

    #[test]
    fn test_unknown_variable() {
        let (mut sandbox, _calls) = sandbox();
        let err = sandbox.evaluate("nope").unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: nope is not defined");
    }

    #[test]
    fn test_trailing_garbage_is_syntax_error() {
        let (mut sandbox, _calls) = sandbox();
        let err = sandbox.evaluate("1 2").unwrap_err();
        assert!(err.to_string().starts_with("SyntaxError"));
    }

    #[test]
    fn test_bridge_calls() {
        let (mut sandbox, mut calls) = sandbox();
        sandbox.evaluate("log(1 + 1); warn('careful')").unwrap();

        match calls.try_recv().unwrap() {
            BridgeCall::Log(Value::Number(n)) => assert_eq!(n, 2.0),
            other => panic!("unexpected call {:?}", other),
        }
        assert!(matches!(calls.try_recv().unwrap(), BridgeCall::Warn(Value::String(s)) if s == "careful"));
    }

    #[test]
    fn test_window_is_host_object() {
        let dump = eval("window");
        assert!(dump.starts_with("[object Window]{\n"));
        assert!(dump.contains("self: [circular]"));
        assert!(!dump.contains("frameElement"));
    }

    #[test]
    fn test_window_nested_host_collapses_to_tag() {
        let dump = eval("window");
        assert!(dump.contains("document: [object HTMLDocument],\n"));
    }

    #[test]
    fn test_inject_defines_globals() {
        let (mut sandbox, _calls) = sandbox();
        sandbox.inject("let jQuery = {\"fn\": {}}\nlet $ = jQuery").unwrap();
        assert_eq!(format::format(&sandbox.evaluate("$").unwrap()), "{&quot;fn&quot;: {}}");
    }
}
