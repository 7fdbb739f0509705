mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deployer_lib::consts::DEFAULT_CONFIG_FILE;
use deployer_lib::ledger::ChainId;

use cmd::{DeployOptions, Project, SignerArgs, parse_parallelism};
use output::print_error;

/// deployer - Declarative, dependency-ordered contract deployments
#[derive(Parser)]
#[command(name = "deployer")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project config file
  #[arg(long, global = true, env = "DEPLOYER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
  config: PathBuf,

  /// Network from the config (optional when only one is configured)
  #[arg(long, global = true, env = "DEPLOYER_NETWORK")]
  network: Option<String>,

  /// Ledger tag (defaults to the config's default_tag)
  #[arg(long, global = true, env = "DEPLOYER_TAG")]
  tag: Option<String>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Deploy a group, then submit the new deployments for verification
  Deploy {
    /// Deployment group from the config
    group: String,

    /// Redeploy names that are already in the ledger
    #[arg(long)]
    overwrite: bool,

    /// Answer a prompt (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Skip source verification
    #[arg(long)]
    no_verify: bool,

    /// Deployments of one batch in flight at once
    #[arg(long, default_value = "1", value_parser = parse_parallelism)]
    parallelism: usize,

    /// Skip the overwrite confirmation
    #[arg(short, long)]
    yes: bool,

    #[command(flatten)]
    signer: SignerArgs,
  },

  /// Show the batches a deploy would run (no network access)
  Plan {
    /// Deployment group from the config
    group: String,

    /// Plan as if redeploying names already in the ledger
    #[arg(long)]
    overwrite: bool,

    /// Answer a prompt (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
  },

  /// Call a method on a deployed contract
  Exec {
    /// Deployment name
    name: String,

    /// Method name, or full signature for overloads
    method: String,

    /// Method argument (repeatable, JSON or plain string)
    #[arg(long = "params", value_name = "VALUE", allow_hyphen_values = true)]
    params: Vec<String>,

    /// Call the contract directly instead of through the executor
    #[arg(long)]
    direct: bool,

    #[command(flatten)]
    signer: SignerArgs,
  },

  /// List recorded deployments
  ListDeployments {
    /// Only this chain id
    #[arg(long)]
    chain: Option<ChainId>,

    /// Print as JSON
    #[arg(long)]
    json: bool,
  },

  /// Submit a recorded deployment for source verification
  Verify {
    /// Deployment name
    name: String,
  },

  /// Set every network's instance of a deployment as peer of the others
  LinkPeers {
    /// Deployment name
    name: String,

    /// Networks to link (comma separated)
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    networks: Vec<String>,

    /// Send each setPeer directly instead of through the executor
    #[arg(long)]
    direct: bool,

    #[command(flatten)]
    signer: SignerArgs,
  },
}

fn init_tracing(verbose: bool) {
  let default = if verbose {
    "warn,deployer=debug,deployer_lib=debug"
  } else {
    "warn"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let project = Project::load(&cli.config, cli.network, cli.tag)?;

  match cli.command {
    Commands::Deploy {
      group,
      overwrite,
      params,
      no_verify,
      parallelism,
      yes,
      signer,
    } => cmd::cmd_deploy(
      &project,
      &group,
      DeployOptions {
        overwrite,
        params,
        no_verify,
        parallelism,
        yes,
        signer,
      },
    ),
    Commands::Plan {
      group,
      overwrite,
      params,
      json,
    } => cmd::cmd_plan(&project, &group, overwrite, &params, json),
    Commands::Exec {
      name,
      method,
      params,
      direct,
      signer,
    } => cmd::cmd_exec(&project, &name, &method, &params, direct, &signer),
    Commands::ListDeployments { chain, json } => cmd::cmd_list(&project, chain, json),
    Commands::Verify { name } => cmd::cmd_verify(&project, &name),
    Commands::LinkPeers {
      name,
      networks,
      direct,
      signer,
    } => cmd::cmd_link_peers(&project, &name, &networks, direct, &signer),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
