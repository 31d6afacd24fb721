//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// Deploy the Kubernetes manifests of a set of git repositories
#[derive(Parser, Debug)]
#[command(name = "k8s-deployer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    deploy: commands::deploy::DeployArgs,

    /// Remove all recorded state for --namespace from --redis and exit
    #[arg(long, requires_all = ["namespace", "redis"])]
    clear_state: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        if self.clear_state {
            if let (Some(namespace), Some(redis)) = (&self.deploy.namespace, &self.deploy.redis) {
                return commands::clear_state::execute(commands::clear_state::ClearStateArgs {
                    namespace: namespace.clone(),
                    redis: redis.clone(),
                });
            }
        }

        commands::deploy::execute(self.deploy)
    }
}

/// `RUST_LOG` takes precedence over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running inside tests.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}
