//! # k8s-deployer CLI
//!
//! This is the binary entry point for the `k8s-deployer` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging.
//! - Running a deployment pass (or clearing recorded state) and turning any
//!   failure into a diagnostic and a non-zero exit code.
//!
//! The deployment logic lives in the `lib.rs` library crate, so the binary is
//! a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
