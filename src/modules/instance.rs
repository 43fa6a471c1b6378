//! Compute instances

use super::common::{parse_params, ModuleContext};
use super::state::PresenceState;
use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use crate::reconcile::{
    id_of, resolve, wait_for_status, DesiredConfig, Identity, ModuleResult, Reconciler,
    TimeoutContext,
};
use crate::resource::fetch_collection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RESULT_FIELDS: &[&str] = &["instance", "configs", "disks", "networking"];

const COLLECTION: &str = "/linode/instances";

const MUTABLE_FIELDS: &[&str] = &["tags", "group"];

/// Parameters that steer the module rather than describe the instance
const CONTROL_FIELDS: &[&str] = &["state", "wait", "wait_timeout"];

fn default_true() -> bool {
    true
}

fn default_wait_timeout() -> u64 {
    1500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceParams {
    pub state: PresenceState,
    pub label: String,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
    pub image: Option<String>,
    pub root_pass: Option<String>,
    pub authorized_keys: Option<Vec<String>>,
    pub private_ip: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub group: Option<String>,
    #[serde(default = "default_true")]
    pub booted: bool,
    #[serde(default = "default_true")]
    pub wait: bool,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,
}

/// Statuses an instance can rest in
const STABLE_STATUSES: &[&str] = &["running", "offline"];

impl InstanceParams {
    /// Status a new instance settles in; without an image there are no disks to boot
    fn created_status(&self) -> &'static [&'static str] {
        if self.booted && self.image.is_some() {
            &["running"]
        } else {
            &["offline"]
        }
    }
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: InstanceParams = parse_params(params)?;
    let client = &ctx.client;
    let timeout = TimeoutContext::from_secs(params.wait_timeout);
    let existing = resolve(client, COLLECTION, &Identity::label(&params.label), None).await?;

    match params.state {
        PresenceState::Present => {
            let (mut instance, targets) = match existing {
                Some(instance) => (instance, STABLE_STATUSES),
                None => (
                    create(client, &params, result).await?,
                    params.created_status(),
                ),
            };
            let path = format!("{}/{}", COLLECTION, id_of(&instance)?);

            if params.wait {
                instance = wait_for_status(
                    client,
                    &path,
                    targets,
                    ctx.poll_interval,
                    timeout.deadline(),
                )
                .await?;
            }

            let desired = DesiredConfig::from_params(&params)?.select(MUTABLE_FIELDS);
            Reconciler::new(client, path.as_str(), MUTABLE_FIELDS)
                .apply(&instance, &desired, &mut result.actions)
                .await?;

            populate(client, &path, result).await
        }
        PresenceState::Absent => {
            let Some(instance) = existing else {
                return Ok(());
            };
            let path = format!("{}/{}", COLLECTION, id_of(&instance)?);

            result.set("instance", instance);
            client.delete(&path).await?;
            result.register_action(format!("Deleted instance {}", params.label));
            Ok(())
        }
    }
}

async fn create(
    client: &LinodeClient,
    params: &InstanceParams,
    result: &mut ModuleResult,
) -> Result<Value> {
    if params.region.is_none() || params.instance_type.is_none() {
        return Err(Error::Validation(
            "region and type are required to create an instance".to_string(),
        ));
    }

    let body = DesiredConfig::from_params(params)?.without(CONTROL_FIELDS);
    let instance = client.post(COLLECTION, Some(&body.to_body())).await?;
    result.register_action(format!("Created instance {}", params.label));
    Ok(instance)
}

async fn populate(client: &LinodeClient, path: &str, result: &mut ModuleResult) -> Result<()> {
    result.set("instance", client.get(path).await?);

    let configs = fetch_collection(client, &format!("{}/configs", path), None, None).await?;
    result.set("configs", Value::Array(configs));

    let disks = fetch_collection(client, &format!("{}/disks", path), None, None).await?;
    result.set("disks", Value::Array(disks));

    result.set("networking", client.get(&format!("{}/ips", path)).await?);
    Ok(())
}
