//! Typed job settings and their schema definitions.
//!
//! Settings arrive from the host already evaluated: derived settings carry
//! their final value, and the compiler never evaluates `eval` expressions
//! itself. The schema types only describe what a job type expects.

use std::collections::BTreeMap;
use std::fmt;

use farmjob_common::error::{FarmjobError, FarmjobResult};
use serde::{Deserialize, Deserializer, Serialize};

/// A single setting value.
///
/// Serialized untagged so job files read naturally (`"fps": 24`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
}

impl SettingValue {
    /// The declared type this value satisfies.
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Int(_) => SettingKind::Int32,
            SettingValue::Float(_) => SettingKind::Float,
            SettingValue::String(_) => SettingKind::String,
        }
    }

    /// Falsy values: empty string, `false`, zero, and NaN.
    pub fn is_falsy(&self) -> bool {
        match self {
            SettingValue::Bool(b) => !b,
            SettingValue::Int(i) => *i == 0,
            SettingValue::Float(f) => *f == 0.0 || f.is_nan(),
            SettingValue::String(s) => s.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

/// The settings mapping of a job. Keys are unique; order is irrelevant.
///
/// A `null` value in a job file is the same as leaving the key out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, SettingValue>);

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<SettingValue>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect())
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }

    /// Optional string setting. A non-string value is a configuration error.
    pub fn get_str(&self, key: &str) -> FarmjobResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(SettingValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(type_mismatch(key, SettingKind::String, other)),
        }
    }

    /// Required, non-empty string setting.
    pub fn require_str(&self, key: &str) -> FarmjobResult<&str> {
        match self.get_str(key)? {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(FarmjobError::config(format!("no {key} setting!"))),
        }
    }

    /// Boolean setting; absent means `false`.
    pub fn get_bool(&self, key: &str) -> FarmjobResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(SettingValue::Bool(b)) => Ok(*b),
            Some(other) => Err(type_mismatch(key, SettingKind::Bool, other)),
        }
    }

    /// Numeric setting read as a float. Integers are widened.
    pub fn get_f64(&self, key: &str) -> FarmjobResult<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(SettingValue::Float(f)) => Ok(Some(*f)),
            Some(SettingValue::Int(i)) => Ok(Some(f64::from(*i))),
            Some(other) => Err(type_mismatch(key, SettingKind::Float, other)),
        }
    }

    /// Integer setting. Floats without a fractional part are accepted,
    /// since some hosts only have one number type.
    pub fn get_i64(&self, key: &str) -> FarmjobResult<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(SettingValue::Int(i)) => Ok(Some(i64::from(*i))),
            Some(SettingValue::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
                Ok(Some(*f as i64))
            }
            Some(other) => Err(type_mismatch(key, SettingKind::Int32, other)),
        }
    }
}

impl FromIterator<(String, SettingValue)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, SettingValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn type_mismatch(key: &str, expected: SettingKind, found: &SettingValue) -> FarmjobError {
    FarmjobError::config(format!(
        "setting {key} should be {expected}, got {} ({found})",
        found.kind()
    ))
}

/// Declared type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Int32,
    Float,
    Bool,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingKind::String => "string",
            SettingKind::Int32 => "int32",
            SettingKind::Float => "float",
            SettingKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Where a setting is shown. The compiler only preserves this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Shown everywhere.
    #[default]
    Visible,
    /// Shown only when submitting the job.
    Submission,
    /// Shown only in the web interface.
    Web,
    Hidden,
}

/// Schema entry for one setting of a job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDef {
    pub key: String,

    #[serde(rename = "type")]
    pub kind: SettingKind,

    /// Finer UI hint such as `file_path` or `dir_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SettingValue>,

    /// Derivation expression, evaluated by the host before compilation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<String>,

    #[serde(default)]
    pub visible: Visibility,

    #[serde(default = "editable_default")]
    pub editable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn editable_default() -> bool {
    true
}

impl SettingDef {
    pub fn new(key: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            key: key.into(),
            kind,
            subtype: None,
            required: false,
            default: None,
            eval: None,
            visible: Visibility::Visible,
            editable: true,
            label: None,
            description: None,
        }
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, SettingKind::String)
    }

    pub fn int32(key: impl Into<String>) -> Self {
        Self::new(key, SettingKind::Int32)
    }

    pub fn float(key: impl Into<String>) -> Self {
        Self::new(key, SettingKind::Float)
    }

    pub fn bool(key: impl Into<String>) -> Self {
        Self::new(key, SettingKind::Bool)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<SettingValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn derived(mut self, expr: impl Into<String>) -> Self {
        self.eval = Some(expr.into());
        self
    }

    pub fn subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn visible(mut self, visible: Visibility) -> Self {
        self.visible = visible;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Derived settings are filled in by the host.
    pub fn is_derived(&self) -> bool {
        self.eval.is_some()
    }
}
