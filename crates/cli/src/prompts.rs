use std::io::{self, IsTerminal, Write};

use anyhow::{Result, bail};
use serde_json::Value;

use deployer_lib::prompt::{ParameterSource, PromptError, PromptSpec};

pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !interactive() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --yes to proceed.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn interactive() -> bool {
  io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Asks the operator on the terminal.
///
/// Without a terminal only prompts with a default can be answered.
pub struct TerminalPrompt;

impl ParameterSource for TerminalPrompt {
  fn ask(&self, spec: &PromptSpec) -> Result<Option<Value>, PromptError> {
    if !interactive() {
      return match spec.default {
        Some(_) => Ok(None),
        None => Err(PromptError::NonInteractive(spec.key.clone())),
      };
    }

    loop {
      match &spec.default {
        Some(default) => write!(io::stderr(), "{} [{}]: ", spec.message(), default)?,
        None => write!(io::stderr(), "{}: ", spec.message())?,
      }
      io::stderr().flush()?;

      let mut input = String::new();
      if io::stdin().read_line(&mut input)? == 0 {
        return Err(PromptError::Missing(spec.key.clone()));
      }
      let input = input.trim();

      if input.is_empty() {
        if spec.default.is_some() {
          return Ok(None);
        }
        continue;
      }

      match spec.kind.parse(input) {
        Ok(value) => return Ok(Some(value)),
        Err(reason) => writeln!(io::stderr(), "  {reason}")?,
      }
    }
  }
}
