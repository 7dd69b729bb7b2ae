//! Dynamic runtime values.
//!
//! Component data, prop values and expression results all share one loosely
//! typed value representation. Coercion rules follow ordinary
//! dynamic-language behavior: `+` concatenates when either side is a
//! string, comparisons coerce through numbers, and absent values are null.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A callable value. Methods looked up on a component instance are wrapped
/// into one of these, already bound to their instance.
pub type Callable = Rc<dyn Fn(&[Value]) -> Value>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Function(Callable),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// String form used by text interpolation. Null renders as the empty
    /// string, never as "null".
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(|v| v.display_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object]".to_string(),
            Value::Function(_) => "[function]".to_string(),
        }
    }

    /// Numeric coercion for arithmetic and relational operators.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Member access; absent members are null, never an error.
    pub fn get_member(&self, name: &str) -> Value {
        match self {
            Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
            Value::List(items) if name == "length" => Value::Number(items.len() as f64),
            Value::Str(s) if name == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Null,
        }
    }

    /// Index access; out-of-range and non-indexable yield null.
    pub fn get_index(&self, index: &Value) -> Value {
        match self {
            Value::List(items) => {
                let i = index.as_number();
                if i.is_finite() && i >= 0.0 && (i as usize) < items.len() {
                    items[i as usize].clone()
                } else {
                    Value::Null
                }
            }
            Value::Object(map) => map.get(&index.display_string()).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Loose equality: null == null, numbers and numeric strings compare by
    /// value, functions compare by identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(_), _) | (_, Value::Number(_)) => {
                let (a, b) = (self.as_number(), other.as_number());
                a == b && !a.is_nan()
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.loose_eq(w)).unwrap_or(false))
            }
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Functions have no JSON form and serialize to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Integral numbers print without a trailing ".0".
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.loose_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(map) => f.debug_map().entries(map).finish(),
            Value::Function(_) => write!(f, "[function]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Number(-1.0).truthy());
        assert!(Value::List(vec![]).truthy());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Null.display_string(), "");
        assert_eq!(Value::Number(3.0).display_string(), "3");
        assert_eq!(Value::Number(3.5).display_string(), "3.5");
        assert_eq!(Value::from("hi").display_string(), "hi");
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::Number(2.0).loose_eq(&Value::from("2")));
        assert!(!Value::from("abc").loose_eq(&Value::Number(0.0)));
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_json_round_trip() {
        let v = Value::from_json(&json!({"a": [1, "two", null], "b": true}));
        assert_eq!(v.get_member("b"), Value::Bool(true));
        assert_eq!(
            v.get_member("a").get_index(&Value::Number(1.0)),
            Value::from("two")
        );
        assert_eq!(v.to_json(), json!({"a": [1.0, "two", null], "b": true}));
    }

    #[test]
    fn test_member_defaults_to_null() {
        assert_eq!(Value::from("x").get_member("nope"), Value::Null);
        assert_eq!(Value::Null.get_member("anything"), Value::Null);
    }
}
