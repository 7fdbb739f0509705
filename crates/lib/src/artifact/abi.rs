//! ABI encoding of JSON arguments.
//!
//! Arguments arrive as JSON (from config files, the ledger and the command
//! line). Each value is coerced to the Solidity type of the parameter it is
//! passed to: strings go through alloy's type-directed parser, JSON objects
//! become tuples matched by component name, and JSON arrays become arrays or
//! positional tuples.

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::primitives::Bytes;
use serde_json::Value;

use super::types::{AbiError, Artifact};

/// Creation code for a deployment: bytecode followed by encoded constructor args.
pub fn encode_constructor(artifact: &Artifact, args: &[Value]) -> Result<Bytes, AbiError> {
  let mut code = artifact.bytecode.to_vec();
  code.extend_from_slice(&constructor_args(artifact, args)?);
  Ok(Bytes::from(code))
}

/// Encoded constructor arguments alone.
pub fn constructor_args(artifact: &Artifact, args: &[Value]) -> Result<Bytes, AbiError> {
  match artifact.abi.constructor() {
    Some(constructor) => {
      let values = coerce_params(&constructor.inputs, args)?;
      let encoded = constructor
        .abi_encode_input(&values)
        .map_err(|e| AbiError::Encode(e.to_string()))?;
      Ok(Bytes::from(encoded))
    }
    None if args.is_empty() => Ok(Bytes::new()),
    None => Err(AbiError::ArgCount {
      expected: 0,
      got: args.len(),
    }),
  }
}

/// Calldata for `method(args)`.
///
/// `method` is either a bare name, resolved among overloads by argument count,
/// or a full signature such as `mint(address,uint256)`.
pub fn encode_function(abi: &JsonAbi, method: &str, args: &[Value]) -> Result<Bytes, AbiError> {
  let function = find_function(abi, method, args.len())?;
  let values = coerce_params(&function.inputs, args)?;
  let encoded = function
    .abi_encode_input(&values)
    .map_err(|e| AbiError::Encode(e.to_string()))?;
  Ok(Bytes::from(encoded))
}

fn find_function<'a>(abi: &'a JsonAbi, method: &str, arity: usize) -> Result<&'a Function, AbiError> {
  if method.contains('(') {
    return abi
      .functions()
      .find(|f| f.signature() == method)
      .ok_or_else(|| AbiError::UnknownFunction(method.to_string()));
  }

  let overloads = abi
    .function(method)
    .ok_or_else(|| AbiError::UnknownFunction(method.to_string()))?;
  let matching: Vec<&Function> = overloads.iter().filter(|f| f.inputs.len() == arity).collect();

  match matching.as_slice() {
    [function] => Ok(function),
    [] => match overloads.as_slice() {
      [only] => Err(AbiError::ArgCount {
        expected: only.inputs.len(),
        got: arity,
      }),
      _ => Err(AbiError::UnknownFunction(format!("{method} with {arity} arguments"))),
    },
    many => Err(AbiError::Ambiguous {
      name: method.to_string(),
      candidates: many.iter().map(|f| f.signature()).collect::<Vec<_>>().join(", "),
    }),
  }
}

fn coerce_params(params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>, AbiError> {
  if params.len() != args.len() {
    return Err(AbiError::ArgCount {
      expected: params.len(),
      got: args.len(),
    });
  }

  params
    .iter()
    .zip(args)
    .enumerate()
    .map(|(i, (param, value))| {
      let label = if param.name.is_empty() { format!("#{i}") } else { param.name.clone() };
      let ty = param.resolve().map_err(|e| AbiError::Coerce {
        param: label.clone(),
        reason: e.to_string(),
      })?;
      coerce(&label, &ty, &param.components, value)
    })
    .collect()
}

fn coerce(label: &str, ty: &DynSolType, components: &[Param], value: &Value) -> Result<DynSolValue, AbiError> {
  let err = |reason: String| AbiError::Coerce {
    param: label.to_string(),
    reason,
  };

  match (ty, value) {
    (DynSolType::Tuple(types), Value::Object(fields)) => {
      if types.len() != components.len() {
        return Err(err("tuple components are missing from the abi".into()));
      }
      types
        .iter()
        .zip(components)
        .map(|(ty, component)| {
          let field = fields
            .get(&component.name)
            .ok_or_else(|| err(format!("missing field '{}'", component.name)))?;
          coerce(&format!("{label}.{}", component.name), ty, &component.components, field)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(DynSolValue::Tuple)
    }
    (DynSolType::Tuple(types), Value::Array(items)) => {
      if types.len() != items.len() {
        return Err(err(format!("expected {} tuple fields, got {}", types.len(), items.len())));
      }
      types
        .iter()
        .zip(items)
        .enumerate()
        .map(|(i, (ty, item))| {
          let nested = components.get(i).map_or(&[][..], |c| c.components.as_slice());
          coerce(&format!("{label}[{i}]"), ty, nested, item)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(DynSolValue::Tuple)
    }
    (DynSolType::Array(inner), Value::Array(items)) => items
      .iter()
      .enumerate()
      .map(|(i, item)| coerce(&format!("{label}[{i}]"), inner, components, item))
      .collect::<Result<Vec<_>, _>>()
      .map(DynSolValue::Array),
    (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
      if *len != items.len() {
        return Err(err(format!("expected {len} elements, got {}", items.len())));
      }
      items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce(&format!("{label}[{i}]"), inner, components, item))
        .collect::<Result<Vec<_>, _>>()
        .map(DynSolValue::FixedArray)
    }
    (_, Value::String(s)) => ty.coerce_str(s).map_err(|e| err(e.to_string())),
    (_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(|e| err(e.to_string())),
    (_, Value::Bool(b)) => ty.coerce_str(&b.to_string()).map_err(|e| err(e.to_string())),
    (_, other) => Err(err(format!("cannot convert {other} to {}", ty.sol_type_name()))),
  }
}
