//! Cloud firewalls and their rule sets

use super::common::{parse_params, ModuleContext};
use super::firewall_device::DeviceEntityType;
use super::state::PresenceState;
use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use crate::reconcile::{
    id_of, resolve, wait_for_status, DesiredConfig, Identity, ModuleResult, Reconciler,
    TimeoutContext,
};
use crate::resource::fetch_collection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const RESULT_FIELDS: &[&str] = &["firewall", "devices"];

const COLLECTION: &str = "/networking/firewalls";

const MUTABLE_FIELDS: &[&str] = &["tags", "status"];

/// The rules endpoint replaces the whole rule set on every update
const RULE_FIELDS: &[&str] = &["inbound", "outbound", "inbound_policy", "outbound_policy"];

fn default_wait_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RulePolicy {
    Accept,
    Drop,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallRules {
    pub inbound: Option<Vec<Value>>,
    pub outbound: Option<Vec<Value>>,
    pub inbound_policy: Option<RulePolicy>,
    pub outbound_policy: Option<RulePolicy>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub entity_type: DeviceEntityType,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallParams {
    pub state: PresenceState,
    pub label: String,
    pub rules: Option<FirewallRules>,
    /// Only applied when the firewall is created
    pub devices: Option<Vec<DeviceRef>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<FirewallStatus>,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: u64,
}

/// Create-time device list grouped the way the API expects
fn device_groups(devices: &[DeviceRef]) -> Value {
    let ids_of = |wanted: DeviceEntityType| -> Vec<u64> {
        devices
            .iter()
            .filter(|d| d.entity_type == wanted)
            .map(|d| d.id)
            .collect()
    };
    json!({
        "linodes": ids_of(DeviceEntityType::Linode),
        "nodebalancers": ids_of(DeviceEntityType::Nodebalancer),
    })
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: FirewallParams = parse_params(params)?;
    let client = &ctx.client;
    let timeout = TimeoutContext::from_secs(params.wait_timeout);
    let existing = resolve(client, COLLECTION, &Identity::label(&params.label), None).await?;

    match params.state {
        PresenceState::Present => {
            let firewall = match existing {
                Some(firewall) => firewall,
                None => {
                    let firewall = create(client, &params, result).await?;
                    let path = format!("{}/{}", COLLECTION, id_of(&firewall)?);
                    wait_for_status(
                        client,
                        &path,
                        &["enabled", "disabled"],
                        ctx.poll_interval,
                        timeout.deadline(),
                    )
                    .await?
                }
            };
            let path = format!("{}/{}", COLLECTION, id_of(&firewall)?);

            let desired = DesiredConfig::from_params(&params)?.select(MUTABLE_FIELDS);
            Reconciler::new(client, path.as_str(), MUTABLE_FIELDS)
                .apply(&firewall, &desired, &mut result.actions)
                .await?;

            if let Some(rules) = &params.rules {
                let rules_path = format!("{}/rules", path);
                let current = client.get(&rules_path).await?;
                Reconciler::new(client, rules_path.as_str(), RULE_FIELDS)
                    .full_document()
                    .apply(&current, &DesiredConfig::from_params(rules)?, &mut result.actions)
                    .await?;
            }

            populate(client, &path, result).await
        }
        PresenceState::Absent => {
            let Some(firewall) = existing else {
                return Ok(());
            };
            let path = format!("{}/{}", COLLECTION, id_of(&firewall)?);

            populate(client, &path, result).await?;
            client.delete(&path).await?;
            result.register_action(format!("Deleted firewall {}", params.label));
            Ok(())
        }
    }
}

async fn create(
    client: &LinodeClient,
    params: &FirewallParams,
    result: &mut ModuleResult,
) -> Result<Value> {
    let rules = params.rules.as_ref().ok_or_else(|| {
        Error::Validation("rules are required to create a firewall".to_string())
    })?;

    let mut body = DesiredConfig::from_params(params)?.select(&["label", "tags", "status"]);
    body.insert("rules", DesiredConfig::from_params(rules)?.to_body());
    if let Some(devices) = &params.devices {
        body.insert("devices", device_groups(devices));
    }

    let firewall = client.post(COLLECTION, Some(&body.to_body())).await?;
    result.register_action(format!("Created firewall {}", params.label));
    Ok(firewall)
}

async fn populate(client: &LinodeClient, path: &str, result: &mut ModuleResult) -> Result<()> {
    result.set("firewall", client.get(path).await?);
    let devices = fetch_collection(client, &format!("{}/devices", path), None, None).await?;
    result.set("devices", Value::Array(devices));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_groups() {
        let devices = vec![
            DeviceRef { id: 1, entity_type: DeviceEntityType::Linode },
            DeviceRef { id: 2, entity_type: DeviceEntityType::Nodebalancer },
            DeviceRef { id: 3, entity_type: DeviceEntityType::Linode },
        ];
        assert_eq!(
            device_groups(&devices),
            json!({"linodes": [1, 3], "nodebalancers": [2]})
        );
    }

    #[test]
    fn test_rules_serialize_without_unset_fields() {
        let rules: FirewallRules = serde_json::from_value(json!({
            "inbound_policy": "DROP",
            "inbound": [{"action": "ACCEPT", "protocol": "TCP", "ports": "22"}]
        }))
        .unwrap();
        let desired = DesiredConfig::from_params(&rules).unwrap();
        assert_eq!(desired.get("inbound_policy"), Some(&json!("DROP")));
        assert!(!desired.contains_key("outbound"));
    }

    #[test]
    fn test_policy_choices() {
        assert!(serde_json::from_value::<RulePolicy>(json!("REJECT")).is_err());
    }
}
