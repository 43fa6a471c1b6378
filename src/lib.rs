//! Declarative Linode resource modules
//!
//! Each module reconciles a declared state against the Linode API and reports
//! what it changed. See [`modules::run_module`] for the entrypoint.

pub mod config;
pub mod error;
pub mod linode;
pub mod modules;
pub mod reconcile;
pub mod resource;
