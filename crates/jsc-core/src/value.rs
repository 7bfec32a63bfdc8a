//! Runtime values handed back by a sandbox.
//!
//! `Value` is a closed set of variants. Arrays, objects and host objects are
//! shared handles (`Rc<RefCell<..>>`) with reference identity, so a sandbox can
//! hand back cyclic graphs and the formatter can detect them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A value produced by evaluated code.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    /// A callable, carried as its source text.
    Function(String),
    Array(ArrayRef),
    Object(ObjectRef),
    /// A native object that is neither an array nor a plain object.
    Host(HostRef),
}

/// A single own property of an object.
#[derive(Debug, Clone)]
pub enum Property {
    Value(Value),
    /// Reading the property fails (host-protected). Carries the reason.
    Inaccessible(String),
}

impl Value {
    /// Creates a function value from its source text.
    pub fn function(source: impl Into<String>) -> Self {
        Self::Function(source.into())
    }

    /// Creates a new array holding `items`.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(ArrayRef::new(items.into_iter().collect()))
    }

    /// Creates a new plain object from `(key, value)` pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = ObjectRef::default();
        for (key, value) in entries {
            object.set(key, value);
        }
        Self::Object(object)
    }

    /// Returns true for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Identity of a shared value, or `None` for primitives.
    pub(crate) fn identity(&self) -> Option<*const ()> {
        match self {
            Self::Array(a) => Some(a.identity()),
            Self::Object(o) => Some(o.identity()),
            Self::Host(h) => Some(h.identity()),
            _ => None,
        }
    }
}

/// Renders the plain string conversion of a value (`String(value)` semantics):
/// strings are unquoted and containers are shallow.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&number_to_string(*n)),
            Self::String(s) => f.write_str(s),
            Self::Function(source) => f.write_str(source),
            Self::Array(_) => f.write_str("[object Array]"),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Host(h) => write!(f, "[object {}]", h.tag()),
        }
    }
}

/// Renders a number the way a JavaScript engine stringifies it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        }
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// Shared containers
// ============================================================================

/// Shared handle to an array.
#[derive(Debug, Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements.
    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

/// Own properties in insertion order, keys unique.
#[derive(Debug, Clone, Default)]
pub struct Properties(Vec<(String, Property)>);

impl Properties {
    fn insert(&mut self, key: String, property: Property) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = property,
            None => self.0.push((key, property)),
        }
    }

    fn get(&self, key: &str) -> Option<&Property> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }
}

/// Shared handle to a plain keyed object.
#[derive(Debug, Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Properties>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) an own property.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(key.into(), Property::Value(value));
    }

    /// Declares a property whose read always fails.
    pub fn set_inaccessible(&self, key: impl Into<String>, reason: impl Into<String>) {
        self.0
            .borrow_mut()
            .insert(key.into(), Property::Inaccessible(reason.into()));
    }

    /// Reads a property. `Ok(None)` when absent, `Err` when inaccessible.
    pub fn get(&self, key: &str) -> Result<Option<Value>, String> {
        match self.0.borrow().get(key) {
            Some(Property::Value(v)) => Ok(Some(v.clone())),
            Some(Property::Inaccessible(reason)) => Err(reason.clone()),
            None => Ok(None),
        }
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().0.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

#[derive(Debug, Default)]
struct HostObject {
    tag: String,
    properties: Properties,
}

/// Shared handle to a native host object, e.g. a DOM node.
#[derive(Debug, Clone)]
pub struct HostRef(Rc<RefCell<HostObject>>);

impl HostRef {
    /// Creates a host object with the given type tag (`"HTMLDivElement"`).
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(HostObject {
            tag: tag.into(),
            properties: Properties::default(),
        })))
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0
            .borrow_mut()
            .properties
            .insert(key.into(), Property::Value(value));
    }

    pub fn set_inaccessible(&self, key: impl Into<String>, reason: impl Into<String>) {
        self.0
            .borrow_mut()
            .properties
            .insert(key.into(), Property::Inaccessible(reason.into()));
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, String> {
        match self.0.borrow().properties.get(key) {
            Some(Property::Value(v)) => Ok(Some(v.clone())),
            Some(Property::Inaccessible(reason)) => Err(reason.clone()),
            None => Ok(None),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .properties
            .0
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl From<HostRef> for Value {
    fn from(host: HostRef) -> Self {
        Self::Host(host)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Self::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}
