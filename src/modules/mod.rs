//! Module entrypoints
//!
//! Each module takes a parameter document, reconciles one kind of Linode
//! resource and reports a [`ModuleResult`]. Stateful modules are written by
//! hand; `*_info` and `*_list` modules are driven by the resource registry.

pub mod common;
pub mod database;
pub mod domain;
pub mod firewall;
pub mod firewall_device;
pub mod info;
pub mod instance;
pub mod list;
pub mod ssh_key;
pub mod stackscript;
pub mod state;

pub use common::{CommonParams, ModuleContext};
pub use database::DatabaseEngine;
pub use state::{DatabaseState, PresenceState};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::reconcile::ModuleResult;
use crate::resource::{
    get_all_module_names, get_info_module, get_list_module, InfoModuleDef, ListModuleDef,
};
use serde_json::{Map, Value};

/// Modules that create, update or delete resources
const STATEFUL_MODULES: &[&str] = &[
    "database_mysql_v2",
    "database_postgresql_v2",
    "domain",
    "firewall",
    "firewall_device",
    "instance",
    "ssh_key",
    "stackscript",
];

#[derive(Debug, Clone, Copy)]
pub enum ModuleKind {
    Database(DatabaseEngine),
    Domain,
    Firewall,
    FirewallDevice,
    Instance,
    SshKey,
    StackScript,
    Info(&'static InfoModuleDef),
    List(&'static ListModuleDef),
}

impl ModuleKind {
    pub fn lookup(name: &str) -> Option<Self> {
        let kind = match name {
            "database_mysql_v2" => ModuleKind::Database(DatabaseEngine::Mysql),
            "database_postgresql_v2" => ModuleKind::Database(DatabaseEngine::Postgresql),
            "domain" => ModuleKind::Domain,
            "firewall" => ModuleKind::Firewall,
            "firewall_device" => ModuleKind::FirewallDevice,
            "instance" => ModuleKind::Instance,
            "ssh_key" => ModuleKind::SshKey,
            "stackscript" => ModuleKind::StackScript,
            other => {
                return get_info_module(other)
                    .map(ModuleKind::Info)
                    .or_else(|| get_list_module(other).map(ModuleKind::List))
            }
        };
        Some(kind)
    }

    /// Payload fields reported (as `null` when unset) in every result
    pub fn result_fields(&self) -> Vec<&'static str> {
        match *self {
            ModuleKind::Database(_) => database::RESULT_FIELDS.to_vec(),
            ModuleKind::Domain => domain::RESULT_FIELDS.to_vec(),
            ModuleKind::Firewall => firewall::RESULT_FIELDS.to_vec(),
            ModuleKind::FirewallDevice => firewall_device::RESULT_FIELDS.to_vec(),
            ModuleKind::Instance => instance::RESULT_FIELDS.to_vec(),
            ModuleKind::SshKey => ssh_key::RESULT_FIELDS.to_vec(),
            ModuleKind::StackScript => stackscript::RESULT_FIELDS.to_vec(),
            ModuleKind::Info(def) => info::result_fields(def),
            ModuleKind::List(def) => list::result_fields(def),
        }
    }

    async fn run(
        self,
        ctx: &ModuleContext,
        params: Map<String, Value>,
        result: &mut ModuleResult,
    ) -> Result<()> {
        match self {
            ModuleKind::Database(engine) => database::run(ctx, engine, params, result).await,
            ModuleKind::Domain => domain::run(ctx, params, result).await,
            ModuleKind::Firewall => firewall::run(ctx, params, result).await,
            ModuleKind::FirewallDevice => firewall_device::run(ctx, params, result).await,
            ModuleKind::Instance => instance::run(ctx, params, result).await,
            ModuleKind::SshKey => ssh_key::run(ctx, params, result).await,
            ModuleKind::StackScript => stackscript::run(ctx, params, result).await,
            ModuleKind::Info(def) => info::run(ctx, def, params, result).await,
            ModuleKind::List(def) => list::run(ctx, def, params, result).await,
        }
    }
}

/// Every module name accepted by [`run_module`], sorted
pub fn module_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = STATEFUL_MODULES
        .iter()
        .copied()
        .chain(get_all_module_names())
        .collect();
    names.sort_unstable();
    names
}

/// Result of one invocation, including the actions performed before a failure
#[derive(Debug)]
pub struct ModuleOutcome {
    pub result: ModuleResult,
    pub error: Option<Error>,
}

impl ModuleOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Document printed for the caller: the result, or a failure report
    pub fn to_document(&self) -> Value {
        match &self.error {
            Some(err) => self.result.to_failure(&err.to_string()),
            None => self.result.to_value(),
        }
    }
}

/// Run a module by name against the connection settings in `args` and `config`
pub async fn run_module(name: &str, args: Value, config: &Config) -> ModuleOutcome {
    let mut result = ModuleResult::default();
    let error = execute(name, args, config, &mut result).await.err();

    if let Some(err) = &error {
        tracing::error!("Module {} failed: {}", name, err);
    }

    ModuleOutcome { result, error }
}

async fn execute(
    name: &str,
    args: Value,
    config: &Config,
    result: &mut ModuleResult,
) -> Result<()> {
    let kind = ModuleKind::lookup(name)
        .ok_or_else(|| Error::Validation(format!("unknown module: {}", name)))?;
    *result = ModuleResult::with_fields(&kind.result_fields());

    let (common, params) = common::split_common(common::normalize_args(args)?)?;
    let ctx = ModuleContext::from_config(config, common)?;

    tracing::info!("Running module {}", name);
    kind.run(&ctx, params, result).await
}
