//! Etherscan-compatible `verifysourcecode` submissions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::artifact::Artifact;

use super::Verifier;
use super::types::{VerifyError, VerifyOutcome, VerifyRequest};

/// Verifier for explorers speaking the Etherscan v2 API.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
  client: reqwest::Client,
  api_url: String,
  api_key: String,
  sources_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
  status: String,
  #[serde(default)]
  message: String,
  #[serde(default)]
  result: Value,
}

impl EtherscanVerifier {
  pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, sources_root: impl Into<PathBuf>) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_url: api_url.into(),
      api_key: api_key.into(),
      sources_root: sources_root.into(),
    }
  }

  fn form(&self, request: &VerifyRequest) -> Result<Vec<(&'static str, String)>, VerifyError> {
    let artifact = &request.artifact;
    let no_metadata = || VerifyError::NoMetadata(artifact.contract.clone());

    let input = build_standard_input(artifact, &self.sources_root)?;
    let contract_name = artifact.fully_qualified_name().ok_or_else(no_metadata)?;
    let version = artifact.compiler_version().ok_or_else(no_metadata)?;

    Ok(vec![
      ("apikey", self.api_key.clone()),
      ("chainid", request.chain_id.to_string()),
      ("module", "contract".to_string()),
      ("action", "verifysourcecode".to_string()),
      ("contractaddress", request.address.to_checksum(None)),
      ("sourceCode", input.to_string()),
      ("codeformat", "solidity-standard-json-input".to_string()),
      ("contractname", contract_name),
      ("compilerversion", format!("v{}", version.trim_start_matches('v'))),
      // Misspelled in the explorer API.
      ("constructorArguements", alloy::hex::encode(&request.constructor_args)),
    ])
  }
}

impl Verifier for EtherscanVerifier {
  async fn verify(&self, request: &VerifyRequest) -> Result<VerifyOutcome, VerifyError> {
    let form = self.form(request)?;
    debug!(deployment = %request.name, url = %self.api_url, "submitting verification");

    let response: ApiResponse = self
      .client
      .post(&self.api_url)
      .form(&form)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    let outcome = interpret(response)?;
    info!(deployment = %request.name, address = %request.address, ?outcome, "verification submitted");
    Ok(outcome)
  }
}

fn interpret(response: ApiResponse) -> Result<VerifyOutcome, VerifyError> {
  let result = match &response.result {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  };

  if response.status == "1" {
    return Ok(VerifyOutcome::Submitted { guid: result });
  }
  if result.to_ascii_lowercase().contains("already verified") {
    return Ok(VerifyOutcome::AlreadyVerified);
  }
  Err(VerifyError::Rejected(format!("{}: {}", response.message, result)))
}

/// Rebuild the compiler's standard-JSON input from artifact metadata.
///
/// Source contents are read from `sources_root` joined with each metadata
/// source path.
pub fn build_standard_input(artifact: &Artifact, sources_root: &Path) -> Result<Value, VerifyError> {
  let metadata = artifact
    .metadata
    .as_ref()
    .ok_or_else(|| VerifyError::NoMetadata(artifact.contract.clone()))?;

  let mut sources = Map::new();
  if let Some(entries) = metadata.get("sources").and_then(Value::as_object) {
    for path in entries.keys() {
      let file = sources_root.join(path);
      let content = fs::read_to_string(&file).map_err(|source| VerifyError::Source { path: file, source })?;
      sources.insert(path.clone(), json!({ "content": content }));
    }
  }

  let mut settings = metadata
    .get("settings")
    .and_then(Value::as_object)
    .cloned()
    .unwrap_or_default();
  settings.remove("compilationTarget");

  // Metadata keys libraries as "path:Name"; the input nests them by file.
  if let Some(Value::Object(flat)) = settings.remove("libraries") {
    let mut nested: Map<String, Value> = Map::new();
    for (key, address) in flat {
      let (file, name) = key.rsplit_once(':').unwrap_or(("", key.as_str()));
      let entry = nested
        .entry(file.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
      if let Value::Object(libs) = entry {
        libs.insert(name.to_string(), address);
      }
    }
    settings.insert("libraries".into(), Value::Object(nested));
  }

  settings.insert(
    "outputSelection".into(),
    json!({ "*": { "*": ["abi", "evm.bytecode", "evm.deployedBytecode", "metadata"] } }),
  );

  Ok(json!({
    "language": metadata.get("language").cloned().unwrap_or_else(|| json!("Solidity")),
    "sources": sources,
    "settings": settings,
  }))
}
