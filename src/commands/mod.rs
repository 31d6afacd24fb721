//! # CLI Command Implementations
//!
//! Each mode of the `k8s-deployer` binary lives in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct holding the command's options.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command, calling into the `k8s_deployer` library for the real work.

pub mod clear_state;
pub mod deploy;
