//! Managed MySQL and PostgreSQL databases
//!
//! `database_mysql_v2` and `database_postgresql_v2` share this implementation;
//! only the collection path differs.

use super::common::{parse_params, tolerate_unavailable, ModuleContext};
use super::state::DatabaseState;
use crate::error::{Error, Result};
use crate::reconcile::{
    allow_timeout, id_of, poll_until, resolve, status_in, wait_for_status, DesiredConfig,
    Identity, ModuleResult, Reconciler, TimeoutContext,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const RESULT_FIELDS: &[&str] = &["database", "credentials", "ssl_cert"];

const CREATE_FIELDS: &[&str] = &[
    "allow_list",
    "cluster_size",
    "engine",
    "engine_config",
    "fork",
    "label",
    "region",
    "type",
];

const MUTABLE_FIELDS: &[&str] = &[
    "label",
    "allow_list",
    "cluster_size",
    "engine_config",
    "updates",
    "type",
    "version",
];

/// Upper bound for observing the optional `updating`/`resizing` transition
const SOFT_TRANSITION_WINDOW: Duration = Duration::from_secs(4);

/// Step used while waiting for a resize to be reflected in `cluster_size`
const CLUSTER_SIZE_STEP: Duration = Duration::from_secs(1);

fn default_wait_timeout() -> u64 {
    2700
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    Mysql,
    Postgresql,
}

impl DatabaseEngine {
    pub fn collection(self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "/databases/mysql/instances",
            DatabaseEngine::Postgresql => "/databases/postgresql/instances",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForkParams {
    pub source: u64,
    pub restore_time: Option<String>,
}

/// Maintenance window
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatesParams {
    pub day_of_week: u8,
    pub duration: u8,
    pub frequency: Option<String>,
    pub hour_of_day: u8,
    pub week_of_month: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseParams {
    pub state: DatabaseState,
    pub label: String,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    /// `<engine>/<major version>`, e.g. `mysql/8`
    pub engine: Option<String>,
    pub cluster_size: Option<u64>,
    pub allow_list: Option<Vec<String>>,
    pub engine_config: Option<Value>,
    pub fork: Option<ForkParams>,
    pub updates: Option<UpdatesParams>,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,
}

impl DatabaseParams {
    fn validate(&self) -> Result<()> {
        if let Some(engine) = &self.engine {
            engine_major(engine)?;
        }

        if let Some(config) = &self.engine_config {
            if !config.is_object() {
                return Err(Error::Validation("engine_config must be a mapping".to_string()));
            }
        }

        Ok(())
    }
}

/// Major version of an `<engine>/<version>` string
pub fn engine_major(engine: &str) -> Result<u64> {
    engine
        .split_once('/')
        .and_then(|(_, version)| version.split('.').next())
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| Error::Validation(format!("Invalid engine: {}", engine)))
}

fn version_major(version: &str) -> Option<u64> {
    version.split('.').next().and_then(|major| major.parse().ok())
}

pub async fn run(
    ctx: &ModuleContext,
    engine: DatabaseEngine,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: DatabaseParams = parse_params(params)?;
    params.validate()?;

    let module = DatabaseModule {
        ctx,
        engine,
        timeout: TimeoutContext::from_secs(params.wait_timeout),
        params: &params,
    };

    match Transition::for_state(params.state) {
        None => module.handle_present(result).await,
        Some(transition) => module.handle_existing(transition, result).await,
    }
}

/// Change applied to a database that must already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Delete,
    Suspend,
    Resume,
}

impl Transition {
    fn for_state(state: DatabaseState) -> Option<Self> {
        match state {
            DatabaseState::Present => None,
            DatabaseState::Absent => Some(Transition::Delete),
            DatabaseState::Suspend => Some(Transition::Suspend),
            DatabaseState::Resume => Some(Transition::Resume),
        }
    }
}

struct DatabaseModule<'a> {
    ctx: &'a ModuleContext,
    engine: DatabaseEngine,
    params: &'a DatabaseParams,
    timeout: TimeoutContext,
}

impl DatabaseModule<'_> {
    fn path_of(&self, database: &Value) -> Result<String> {
        Ok(format!("{}/{}", self.engine.collection(), id_of(database)?))
    }

    async fn find(&self) -> Result<Option<Value>> {
        resolve(
            &self.ctx.client,
            self.engine.collection(),
            &Identity::label(&self.params.label),
            None,
        )
        .await
    }

    async fn wait_for(&self, path: &str, targets: &[&str]) -> Result<Value> {
        wait_for_status(
            &self.ctx.client,
            path,
            targets,
            self.ctx.poll_interval,
            self.timeout.deadline(),
        )
        .await
    }

    async fn handle_present(&self, result: &mut ModuleResult) -> Result<()> {
        let database = match self.find().await? {
            Some(database) => database,
            None => self.create(result).await?,
        };

        let path = self.path_of(&database)?;
        self.update(&path, result).await?;
        self.populate(&path, result).await
    }

    async fn handle_existing(
        &self,
        transition: Transition,
        result: &mut ModuleResult,
    ) -> Result<()> {
        let Some(database) = self.find().await? else {
            tracing::debug!("No database labelled {}", self.params.label);
            return Ok(());
        };
        let path = self.path_of(&database)?;
        let client = &self.ctx.client;

        match transition {
            Transition::Suspend => {
                if !status_in(&database, &["suspended", "suspending"]) {
                    client.post(&format!("{}/suspend", path), None).await?;
                    result.register_action(format!("Suspended database {}", self.params.label));
                    self.wait_for(&path, &["suspended"]).await?;
                }
                self.populate(&path, result).await
            }
            Transition::Resume => {
                if status_in(&database, &["suspended", "suspending"]) {
                    client.post(&format!("{}/resume", path), None).await?;
                    result.register_action(format!("Resumed database {}", self.params.label));
                    self.wait_for(&path, &["active"]).await?;
                }
                self.populate(&path, result).await
            }
            Transition::Delete => {
                self.populate(&path, result).await?;
                client.delete(&path).await?;
                result.register_action(format!("Deleted database {}", self.params.label));
                Ok(())
            }
        }
    }

    async fn create(&self, result: &mut ModuleResult) -> Result<Value> {
        let client = &self.ctx.client;
        let desired = DesiredConfig::from_params(self.params)?;
        let body = desired.select(CREATE_FIELDS).to_body();

        let database = client.post(self.engine.collection(), Some(&body)).await?;
        result.register_action(format!("Created database {}", self.params.label));

        let path = self.path_of(&database)?;
        self.wait_for(&path, &["active"]).await?;

        // The create endpoint does not accept a maintenance window
        if let Some(updates) = desired.get("updates") {
            client.put(&path, &json!({ "updates": updates })).await?;
            self.wait_for(&path, &["active"]).await?;
        }

        Ok(database)
    }

    async fn update(&self, path: &str, result: &mut ModuleResult) -> Result<()> {
        let client = &self.ctx.client;
        let current = client.get(path).await?;
        let mut desired = DesiredConfig::from_params(self.params)?.select(MUTABLE_FIELDS);

        // The update endpoint takes a major `version`; the API reports the full version
        if let Some(engine) = &self.params.engine {
            let wanted = engine_major(engine)?;
            let reported = current
                .get("version")
                .and_then(|v| v.as_str())
                .and_then(version_major);
            if reported.is_some_and(|major| major != wanted) {
                desired.insert("version", json!(wanted));
            }
        }

        let changed = Reconciler::new(client, path, MUTABLE_FIELDS)
            .apply(&current, &desired, &mut result.actions)
            .await?;
        if changed.is_empty() {
            return Ok(());
        }

        allow_timeout(
            wait_for_status(
                client,
                path,
                &["updating", "resizing"],
                self.ctx.poll_interval,
                self.timeout.capped(SOFT_TRANSITION_WINDOW),
            )
            .await,
        )?;
        self.wait_for(path, &["active"]).await?;

        if let Some(size) = self.params.cluster_size {
            if changed.iter().any(|field| field == "cluster_size") {
                poll_until(
                    move || client.get(path),
                    |database| database.get("cluster_size").and_then(|v| v.as_u64()) == Some(size),
                    CLUSTER_SIZE_STEP,
                    self.timeout.deadline(),
                    &format!("{} cluster_size {}", path, size),
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn populate(&self, path: &str, result: &mut ModuleResult) -> Result<()> {
        let client = &self.ctx.client;

        result.set("database", client.get(path).await?);
        result.set(
            "credentials",
            tolerate_unavailable(client.get(&format!("{}/credentials", path)).await)?,
        );
        result.set(
            "ssl_cert",
            tolerate_unavailable(client.get(&format!("{}/ssl", path)).await)?,
        );

        Ok(())
    }
}
