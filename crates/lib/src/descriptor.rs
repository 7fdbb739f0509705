//! Build descriptors: the intended deployments of one invocation.
//!
//! A [`BuildDescriptor`] names a contract artifact, a deployment name and the
//! constructor arguments. Arguments may reference other deployments by name; the
//! planner turns those references into ordering edges and the executor
//! substitutes the deployed addresses.
//!
//! # Argument Forms
//!
//! In config files arguments are plain JSON/TOML values, with three reserved
//! single-key objects:
//!
//! - `{ ref = "Vault" }` - the address of the `Vault` deployment
//! - `{ struct = { vault = { ref = "Vault" }, fee = 5 } }` - a struct-shaped
//!   argument whose fields are themselves arguments
//! - `{ prompt = { key = "owner", kind = "address" } }` - an operator-supplied value
//!
//! Anything else is a literal and passes through unchanged. The reserved forms
//! are only recognized as a whole argument or as a struct field; nested inside a
//! literal array or table they are rejected.

use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::prompt::PromptSpec;

const REF_KEY: &str = "ref";
const STRUCT_KEY: &str = "struct";
const PROMPT_KEY: &str = "prompt";

/// Record metadata keys the executor writes for every deployment.
pub const GENERATED_META_KEYS: [&str; 3] = ["contract", "args", "txHash"];

/// A constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
  /// A value passed through unchanged.
  Literal(Value),
  /// The address of another deployment.
  Ref(String),
  /// A struct-shaped argument; fields keep declaration order.
  Struct(Vec<(String, Arg)>),
  /// A value supplied by the operator before planning.
  Prompt(PromptSpec),
}

impl Arg {
  pub fn literal(value: impl Into<Value>) -> Self {
    Arg::Literal(value.into())
  }

  pub fn reference(name: impl Into<String>) -> Self {
    Arg::Ref(name.into())
  }

  pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, Arg)>) -> Self {
    Arg::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  /// Parse an argument from its config representation.
  pub fn from_value(value: Value) -> Result<Self, DescriptorError> {
    let Value::Object(map) = value else {
      reject_nested_forms(&value)?;
      return Ok(Arg::Literal(value));
    };

    let Some((key, inner)) = map.iter().next().filter(|_| map.len() == 1) else {
      map.values().try_for_each(reject_nested_forms)?;
      return Ok(Arg::Literal(Value::Object(map)));
    };

    match key.as_str() {
      REF_KEY => match inner {
        Value::String(name) if !name.is_empty() => Ok(Arg::Ref(name.clone())),
        other => Err(DescriptorError::InvalidArg(format!("ref must be a deployment name, got {other}"))),
      },
      STRUCT_KEY => match inner {
        Value::Object(fields) => {
          let fields = fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), Arg::from_value(v.clone())?)))
            .collect::<Result<Vec<_>, DescriptorError>>()?;
          Ok(Arg::Struct(fields))
        }
        other => Err(DescriptorError::InvalidArg(format!("struct must be a table of fields, got {other}"))),
      },
      PROMPT_KEY => serde_json::from_value(inner.clone())
        .map(Arg::Prompt)
        .map_err(|e| DescriptorError::InvalidArg(format!("invalid prompt: {e}"))),
      _ => {
        reject_nested_forms(inner)?;
        Ok(Arg::Literal(Value::Object(map)))
      }
    }
  }

  /// Convert back to the config representation.
  pub fn to_value(&self) -> Value {
    match self {
      Arg::Literal(value) => value.clone(),
      Arg::Ref(name) => single(REF_KEY, Value::String(name.clone())),
      Arg::Struct(fields) => {
        let fields: Map<String, Value> = fields.iter().map(|(k, v)| (k.clone(), v.to_value())).collect();
        single(STRUCT_KEY, Value::Object(fields))
      }
      Arg::Prompt(spec) => single(PROMPT_KEY, serde_json::to_value(spec).unwrap_or(Value::Null)),
    }
  }
}

fn reject_nested_forms(value: &Value) -> Result<(), DescriptorError> {
  match value {
    Value::Array(items) => items.iter().try_for_each(reject_nested_forms),
    Value::Object(map) => {
      let reserved = map.keys().find(|k| [REF_KEY, STRUCT_KEY, PROMPT_KEY].contains(&k.as_str()));
      match reserved {
        Some(key) if map.len() == 1 => Err(DescriptorError::InvalidArg(format!(
          "'{key}' is only allowed as a whole argument or a struct field, not inside a literal"
        ))),
        _ => map.values().try_for_each(reject_nested_forms),
      }
    }
    _ => Ok(()),
  }
}

fn single(key: &str, value: Value) -> Value {
  let mut map = Map::new();
  map.insert(key.to_string(), value);
  Value::Object(map)
}

impl Serialize for Arg {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_value().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Arg {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Arg::from_value(value).map_err(serde::de::Error::custom)
  }
}

/// A reference from one descriptor's arguments to another deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
  /// The referenced deployment.
  pub deployment_name: String,
  /// Constructor argument position the address is substituted into.
  pub arg_position: usize,
  /// Struct field (dotted for nested structs) when the argument is struct-shaped.
  pub key_name: Option<String>,
}

impl DependencyRef {
  /// Key under which the substituted address is recorded in record metadata.
  pub fn meta_key(&self) -> &str {
    self.key_name.as_deref().unwrap_or(&self.deployment_name)
  }
}

/// One intended deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDescriptor {
  /// Deployment name, the identity in the ledger.
  #[serde(rename = "name")]
  pub deployment_name: String,

  /// Compiled artifact name.
  pub contract: String,

  #[serde(default)]
  pub args: Vec<Arg>,

  /// Ordering-only dependencies (no argument substitution).
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,

  /// Extra metadata copied into the ledger record.
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub meta: Map<String, Value>,
}

impl BuildDescriptor {
  pub fn new(deployment_name: impl Into<String>, contract: impl Into<String>) -> Self {
    Self {
      deployment_name: deployment_name.into(),
      contract: contract.into(),
      args: Vec::new(),
      depends_on: Vec::new(),
      meta: Map::new(),
    }
  }

  pub fn arg(mut self, arg: Arg) -> Self {
    self.args.push(arg);
    self
  }

  pub fn after(mut self, name: impl Into<String>) -> Self {
    self.depends_on.push(name.into());
    self
  }

  /// All argument references, in argument order.
  pub fn dependency_refs(&self) -> Vec<DependencyRef> {
    let mut refs = Vec::new();
    for (position, arg) in self.args.iter().enumerate() {
      collect_refs(arg, position, None, &mut refs);
    }
    refs
  }

  /// Names this descriptor depends on: argument references first, then
  /// ordering-only dependencies. Deduplicated, first occurrence wins.
  pub fn dependencies(&self) -> Vec<String> {
    let mut seen = HashSet::new();
    self
      .dependency_refs()
      .into_iter()
      .map(|r| r.deployment_name)
      .chain(self.depends_on.iter().cloned())
      .filter(|name| seen.insert(name.clone()))
      .collect()
  }

  /// First record metadata key with more than one source, if any.
  ///
  /// Reference keys may not shadow generated keys, and two references may only
  /// share a key when they name the same deployment. Descriptor `meta` may not
  /// shadow either.
  pub fn conflicting_meta_key(&self) -> Option<String> {
    let mut owners: HashMap<String, String> = HashMap::new();
    for reference in self.dependency_refs() {
      let key = reference.meta_key().to_string();
      if GENERATED_META_KEYS.contains(&key.as_str()) {
        return Some(key);
      }
      match owners.get(&key) {
        Some(owner) if *owner != reference.deployment_name => return Some(key),
        Some(_) => {}
        None => {
          owners.insert(key, reference.deployment_name);
        }
      }
    }

    self
      .meta
      .keys()
      .find(|key| GENERATED_META_KEYS.contains(&key.as_str()) || owners.contains_key(*key))
      .cloned()
  }

  /// Prompt placeholders still present in the arguments.
  pub fn prompts(&self) -> Vec<&PromptSpec> {
    let mut prompts = Vec::new();
    for arg in &self.args {
      collect_prompts(arg, &mut prompts);
    }
    prompts
  }

  /// Replace prompt placeholders with answered values. Unanswered prompts stay.
  pub fn apply_answers(&mut self, answers: &HashMap<String, Value>) {
    for arg in &mut self.args {
      replace_prompts(arg, answers);
    }
  }

  /// Substitute deployed addresses into the arguments.
  pub fn resolve_args(&self, addresses: &HashMap<String, Address>) -> Result<Vec<Value>, DescriptorError> {
    self.args.iter().map(|arg| self.resolve_arg(arg, addresses)).collect()
  }

  fn resolve_arg(&self, arg: &Arg, addresses: &HashMap<String, Address>) -> Result<Value, DescriptorError> {
    match arg {
      Arg::Literal(value) => Ok(value.clone()),
      Arg::Ref(name) => addresses
        .get(name)
        .map(|address| Value::String(address.to_checksum(None)))
        .ok_or_else(|| DescriptorError::UnresolvedReference {
          deployment: self.deployment_name.clone(),
          reference: name.clone(),
        }),
      Arg::Struct(fields) => {
        let mut map = Map::new();
        for (key, field) in fields {
          map.insert(key.clone(), self.resolve_arg(field, addresses)?);
        }
        Ok(Value::Object(map))
      }
      Arg::Prompt(spec) => Err(DescriptorError::UnresolvedPrompt {
        deployment: self.deployment_name.clone(),
        key: spec.key.clone(),
      }),
    }
  }
}

fn collect_refs(arg: &Arg, position: usize, path: Option<String>, refs: &mut Vec<DependencyRef>) {
  match arg {
    Arg::Ref(name) => refs.push(DependencyRef {
      deployment_name: name.clone(),
      arg_position: position,
      key_name: path,
    }),
    Arg::Struct(fields) => {
      for (key, field) in fields {
        let nested = match &path {
          Some(prefix) => format!("{}.{}", prefix, key),
          None => key.clone(),
        };
        collect_refs(field, position, Some(nested), refs);
      }
    }
    Arg::Literal(_) | Arg::Prompt(_) => {}
  }
}

fn collect_prompts<'a>(arg: &'a Arg, prompts: &mut Vec<&'a PromptSpec>) {
  match arg {
    Arg::Prompt(spec) => prompts.push(spec),
    Arg::Struct(fields) => fields.iter().for_each(|(_, f)| collect_prompts(f, prompts)),
    Arg::Literal(_) | Arg::Ref(_) => {}
  }
}

fn replace_prompts(arg: &mut Arg, answers: &HashMap<String, Value>) {
  match arg {
    Arg::Prompt(spec) => {
      if let Some(value) = answers.get(&spec.key) {
        *arg = Arg::Literal(value.clone());
      }
    }
    Arg::Struct(fields) => fields.iter_mut().for_each(|(_, f)| replace_prompts(f, answers)),
    Arg::Literal(_) | Arg::Ref(_) => {}
  }
}

/// Errors in descriptor arguments.
#[derive(Debug, Error)]
pub enum DescriptorError {
  #[error("invalid argument: {0}")]
  InvalidArg(String),

  #[error("{deployment}: reference to '{reference}' has no deployed address")]
  UnresolvedReference { deployment: String, reference: String },

  #[error("{deployment}: prompt '{key}' was never answered")]
  UnresolvedPrompt { deployment: String, key: String },
}
