use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded token payload.
///
/// Claims are kept as an open mapping: the backend is free to add keys and
/// the resolver tolerates several naming conventions for the same attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Claim value; an explicit `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// First present value among `keys`, in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Expiry as whole seconds since the Unix epoch, if enforced.
    ///
    /// A missing, `null`, zero, `false` or empty `exp` disables the check.
    /// Numeric strings are read as numbers. Values that are not numeric at
    /// all also disable the check. Fractional seconds round up.
    pub fn expires_at(&self) -> Option<i64> {
        let secs = match self.get("exp")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
            Value::Bool(true) => 1.0,
            _ => return None,
        };

        if secs == 0.0 || !secs.is_finite() {
            return None;
        }
        Some(secs.ceil() as i64)
    }

    /// `now >= exp`; tokens without an enforced expiry never expire.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.expires_at().is_some_and(|exp| now_secs >= exp)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl TryFrom<Value> for Claims {
    type Error = Value;

    /// Only JSON objects are claims; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
