//! Attachment of a Linode or NodeBalancer to a firewall

use super::common::{parse_params, ModuleContext};
use super::state::PresenceState;
use crate::error::Result;
use crate::linode::LinodeClient;
use crate::reconcile::{find_in, id_of, ModuleResult};
use crate::resource::fetch_collection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const RESULT_FIELDS: &[&str] = &["device"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEntityType {
    Linode,
    Nodebalancer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallDeviceParams {
    pub state: PresenceState,
    pub firewall_id: u64,
    pub entity_id: u64,
    pub entity_type: DeviceEntityType,
}

fn is_entity(device: &Value, entity_id: u64, entity_type: DeviceEntityType) -> bool {
    let entity = &device["entity"];
    entity["id"].as_u64() == Some(entity_id) && entity["type"] == json!(entity_type)
}

/// Devices cannot be filtered server-side; scan the firewall's device list
async fn find_device(
    client: &LinodeClient,
    params: &FirewallDeviceParams,
    devices_path: &str,
) -> Result<Option<Value>> {
    let devices = fetch_collection(client, devices_path, None, None).await?;
    Ok(find_in(devices, |device| {
        is_entity(device, params.entity_id, params.entity_type)
    }))
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: FirewallDeviceParams = parse_params(params)?;
    let client = &ctx.client;
    let devices_path = format!("/networking/firewalls/{}/devices", params.firewall_id);

    let existing = find_device(client, &params, &devices_path).await?;

    match params.state {
        PresenceState::Present => {
            let device = match existing {
                Some(device) => device,
                None => {
                    let body = json!({ "id": params.entity_id, "type": params.entity_type });
                    let device = client.post(&devices_path, Some(&body)).await?;
                    result.register_action(format!(
                        "Created firewall device {}",
                        params.entity_id
                    ));
                    device
                }
            };

            let path = format!("{}/{}", devices_path, id_of(&device)?);
            result.set("device", client.get(&path).await?);
            Ok(())
        }
        PresenceState::Absent => {
            let Some(device) = existing else {
                return Ok(());
            };
            let path = format!("{}/{}", devices_path, id_of(&device)?);

            result.set("device", device);
            client.delete(&path).await?;
            result.register_action(format!("Deleted firewall device {}", params.entity_id));
            Ok(())
        }
    }
}
