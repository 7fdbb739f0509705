//! Operator-supplied parameters.
//!
//! Descriptors may carry `prompt` placeholders for values only the operator
//! knows (an owner address, a fee). Before execution, [`resolve_prompts`] asks a
//! [`ParameterSource`] for each distinct key once, validates the answer against
//! the prompt's [`ValueKind`] and substitutes it into every descriptor.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::BuildDescriptor;

/// Expected shape of a prompted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
  Address,
  Uint,
  Bool,
  #[default]
  String,
}

impl ValueKind {
  /// Parse raw operator input into a JSON value of this kind.
  ///
  /// Addresses are returned checksummed and integers as decimal strings, so
  /// values beyond `u64` survive the JSON round trip.
  pub fn parse(&self, raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    match self {
      ValueKind::Address => Address::from_str(raw)
        .map(|a| Value::String(a.to_checksum(None)))
        .map_err(|e| format!("'{raw}' is not an address: {e}")),
      ValueKind::Uint => U256::from_str(raw)
        .map(|n| Value::String(n.to_string()))
        .map_err(|e| format!("'{raw}' is not an unsigned integer: {e}")),
      ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("'{raw}' is not a boolean")),
      },
      ValueKind::String => Ok(Value::String(raw.to_string())),
    }
  }

  /// Validate an already-typed JSON value.
  pub fn check(&self, value: &Value) -> Result<Value, String> {
    match (self, value) {
      (_, Value::String(s)) => self.parse(s),
      (ValueKind::Uint, Value::Number(n)) if n.is_u64() => Ok(Value::String(n.to_string())),
      (ValueKind::Bool, Value::Bool(_)) => Ok(value.clone()),
      (ValueKind::String, other) => Ok(Value::String(other.to_string())),
      (kind, other) => Err(format!("{other} is not a valid {kind:?} value")),
    }
  }
}

/// A prompt placeholder inside descriptor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
  /// Key shared by every placeholder asking for the same value.
  pub key: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,

  #[serde(default)]
  pub kind: ValueKind,

  /// Used when no source supplies a value.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
}

impl PromptSpec {
  pub fn new(key: impl Into<String>, kind: ValueKind) -> Self {
    Self {
      key: key.into(),
      message: None,
      kind,
      default: None,
    }
  }

  pub fn with_default(mut self, default: impl Into<Value>) -> Self {
    self.default = Some(default.into());
    self
  }

  /// Text shown to the operator.
  pub fn message(&self) -> &str {
    self.message.as_deref().unwrap_or(&self.key)
  }
}

/// Something that can answer prompts.
pub trait ParameterSource {
  /// Returns `Ok(None)` when this source has no value for the key.
  fn ask(&self, spec: &PromptSpec) -> Result<Option<Value>, PromptError>;
}

/// Fixed answers, from `--param key=value` flags or tests.
#[derive(Debug, Clone, Default)]
pub struct CannedParameters {
  values: HashMap<String, Value>,
}

impl CannedParameters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.values.insert(key.into(), value.into());
    self
  }

  /// Parse `key=value` pairs. Values stay raw strings until checked against a kind.
  pub fn from_pairs<S: AsRef<str>>(pairs: impl IntoIterator<Item = S>) -> Result<Self, PromptError> {
    let mut values = HashMap::new();
    for pair in pairs {
      let pair = pair.as_ref();
      let Some((key, value)) = pair.split_once('=') else {
        return Err(PromptError::InvalidPair(pair.to_string()));
      };
      let key = key.trim();
      if key.is_empty() {
        return Err(PromptError::InvalidPair(pair.to_string()));
      }
      values.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Self { values })
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl ParameterSource for CannedParameters {
  fn ask(&self, spec: &PromptSpec) -> Result<Option<Value>, PromptError> {
    Ok(self.values.get(&spec.key).cloned())
  }
}

/// Tries each source in order; the first answer wins.
#[derive(Default)]
pub struct Layered {
  sources: Vec<Box<dyn ParameterSource>>,
}

impl Layered {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(mut self, source: impl ParameterSource + 'static) -> Self {
    self.sources.push(Box::new(source));
    self
  }
}

impl ParameterSource for Layered {
  fn ask(&self, spec: &PromptSpec) -> Result<Option<Value>, PromptError> {
    for source in &self.sources {
      if let Some(value) = source.ask(spec)? {
        return Ok(Some(value));
      }
    }
    Ok(None)
  }
}

/// Answer every prompt in the descriptors and substitute the values.
///
/// Each distinct key is asked once; later placeholders with the same key reuse
/// the first answer. Returns the answers by key.
pub fn resolve_prompts<'a>(
  descriptors: impl IntoIterator<Item = &'a mut BuildDescriptor>,
  source: &dyn ParameterSource,
) -> Result<HashMap<String, Value>, PromptError> {
  let mut descriptors: Vec<&mut BuildDescriptor> = descriptors.into_iter().collect();
  let specs: Vec<PromptSpec> = descriptors
    .iter()
    .flat_map(|d| d.prompts().into_iter().cloned())
    .collect();

  let mut answers: HashMap<String, Value> = HashMap::new();
  for spec in specs {
    if answers.contains_key(&spec.key) {
      continue;
    }

    let raw = match source.ask(&spec)? {
      Some(value) => value,
      None => spec
        .default
        .clone()
        .ok_or_else(|| PromptError::Missing(spec.key.clone()))?,
    };
    let value = spec.kind.check(&raw).map_err(|reason| PromptError::Invalid {
      key: spec.key.clone(),
      reason,
    })?;

    debug!(key = %spec.key, "prompt answered");
    answers.insert(spec.key, value);
  }

  for descriptor in &mut descriptors {
    descriptor.apply_answers(&answers);
  }

  Ok(answers)
}

/// Errors resolving operator parameters.
#[derive(Debug, Error)]
pub enum PromptError {
  #[error("no value supplied for '{0}' (pass --param {0}=<value>)")]
  Missing(String),

  #[error("invalid value for '{key}': {reason}")]
  Invalid { key: String, reason: String },

  #[error("invalid parameter '{0}', expected key=value")]
  InvalidPair(String),

  #[error("cannot prompt for '{0}' in non-interactive mode")]
  NonInteractive(String),

  #[error("failed to read input: {0}")]
  Io(#[from] std::io::Error),
}
