use std::{collections::HashMap, fmt, sync::Arc};

use crate::Result;

/// A parsed argument value, as handed to commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(it) => Some(*it),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(it) => Some(*it),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(it) => Some(*it),
            Value::Int(it) => Some(*it as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(it) => Some(it.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(it) => Some(it.as_slice()),
            _ => None,
        }
    }

    /// Equality where integers and floats compare by numeric value, for choice checks.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.matches(b))
            }
            _ => self == other,
        }
    }

    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(it) => it,
            Value::None => Vec::new(),
            it => vec![it],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(it) => write!(f, "{it}"),
            Value::Float(it) => write!(f, "{it:?}"),
            Value::Str(it) => write!(f, "{it:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, it) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{it}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(it: bool) -> Value {
        Value::Bool(it)
    }
}

impl From<i32> for Value {
    fn from(it: i32) -> Value {
        Value::Int(it.into())
    }
}

impl From<i64> for Value {
    fn from(it: i64) -> Value {
        Value::Int(it)
    }
}

impl From<f64> for Value {
    fn from(it: f64) -> Value {
        Value::Float(it)
    }
}

impl From<&str> for Value {
    fn from(it: &str) -> Value {
        Value::Str(it.to_string())
    }
}

impl From<String> for Value {
    fn from(it: String) -> Value {
        Value::Str(it)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(it: Vec<T>) -> Value {
        Value::List(it.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(it: Option<T>) -> Value {
        it.map_or(Value::None, Into::into)
    }
}

type ConvertFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;

/// A named function turning raw command line text into a [`Value`].
///
/// Two converters are equal only if they share both the name and the function, so two
/// distinct types that happen to have the same name never count as the same type.
#[derive(Clone)]
pub struct Converter {
    name: Arc<str>,
    f: Arc<ConvertFn>,
}

impl Converter {
    pub fn new<F>(name: &str, f: F) -> Converter
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Converter { name: name.into(), f: Arc::new(f) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn convert(&self, text: &str) -> Result<Value, String> {
        (self.f)(text)
    }
}

impl PartialEq for Converter {
    fn eq(&self, other: &Converter) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter({})", self.name)
    }
}

impl fmt::Display for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

type ActionFn = dyn Fn(&Value, Value) -> Result<Value, String> + Send + Sync;

/// A user supplied action: receives the current value of the destination and the
/// values consumed from the command line, returns the new value.
#[derive(Clone)]
pub struct CustomAction {
    name: Arc<str>,
    f: Arc<ActionFn>,
}

impl CustomAction {
    pub fn new<F>(name: &str, f: F) -> CustomAction
    where
        F: Fn(&Value, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        CustomAction { name: name.into(), f: Arc::new(f) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, current: &Value, values: Value) -> Result<Value, String> {
        (self.f)(current, values)
    }
}

impl PartialEq for CustomAction {
    fn eq(&self, other: &CustomAction) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomAction({})", self.name)
    }
}

/// Names visible to type expressions and `:choices:` directives.
///
/// Stands in for the declaring code's namespace: annotations can only refer to converters,
/// choice sets and actions registered here.
#[derive(Debug, Clone)]
pub struct Scope {
    converters: HashMap<String, Converter>,
    choices: HashMap<String, Vec<Value>>,
    actions: HashMap<String, CustomAction>,
}

impl Default for Scope {
    fn default() -> Scope {
        let mut res =
            Scope { converters: HashMap::new(), choices: HashMap::new(), actions: HashMap::new() };
        res.add_converter(Converter::new("str", |s| Ok(Value::Str(s.to_string()))));
        res.add_converter(Converter::new("int", |s| {
            s.trim().parse::<i64>().map(Value::Int).map_err(|err| err.to_string())
        }));
        res.add_converter(Converter::new("float", |s| {
            s.trim().parse::<f64>().map(Value::Float).map_err(|err| err.to_string())
        }));
        res.add_converter(Converter::new("bool", |s| match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("invalid bool: `{s}`")),
        }));
        res
    }
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    pub fn add_converter(&mut self, converter: Converter) -> &mut Scope {
        self.converters.insert(converter.name().to_string(), converter);
        self
    }

    pub fn add_choices<T: Into<Value>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Scope {
        self.choices.insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn add_action(&mut self, action: CustomAction) -> &mut Scope {
        self.actions.insert(action.name().to_string(), action);
        self
    }

    pub fn converter(&self, name: &str) -> Option<&Converter> {
        self.converters.get(unqualify(name))
    }

    pub fn choices(&self, name: &str) -> Option<&[Value]> {
        self.choices.get(unqualify(name)).map(Vec::as_slice)
    }

    pub fn action(&self, name: &str) -> Option<&CustomAction> {
        self.actions.get(unqualify(name))
    }
}

/// `builtins.int` and `int` name the same thing.
fn unqualify(name: &str) -> &str {
    name.strip_prefix("builtins.").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_converters() {
        let scope = Scope::default();
        let int = scope.converter("int").unwrap();
        assert_eq!(int.convert("42"), Ok(Value::Int(42)));
        assert!(int.convert("lol").is_err());
        assert_eq!(scope.converter("builtins.float").unwrap().convert("1.5"), Ok(1.5.into()));
        assert_eq!(scope.converter("bool").unwrap().convert("No"), Ok(false.into()));
    }

    #[test]
    fn converter_identity() {
        let a = Converter::new("hyphenated", |s| Ok(s.into()));
        let b = Converter::new("hyphenated", |s| Ok(s.into()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn numeric_matches() {
        assert!(Value::Int(2).matches(&Value::Float(2.0)));
        assert!(Value::Float(2.0).matches(&Value::Int(2)));
        assert!(!Value::Float(2.5).matches(&Value::Int(2)));
        assert!(!Value::from("2").matches(&Value::Int(2)));
        assert!(Value::from(vec![1, 2]).matches(&Value::from(vec![1.0, 2.0])));
    }

    #[test]
    fn display() {
        let v = Value::from(vec![Value::from(1), "a".into(), 1.5.into(), true.into()]);
        assert_eq!(v.to_string(), r#"[1, "a", 1.5, True]"#);
    }
}
