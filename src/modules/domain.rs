//! DNS domains

use super::common::{parse_params, ModuleContext};
use super::state::PresenceState;
use crate::error::Result;
use crate::linode::LinodeClient;
use crate::reconcile::{id_of, resolve, DesiredConfig, Identity, ModuleResult, Reconciler};
use crate::resource::fetch_collection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const RESULT_FIELDS: &[&str] = &["domain", "records", "zone_file"];

const COLLECTION: &str = "/domains";

const MUTABLE_FIELDS: &[&str] = &[
    "axfr_ips",
    "description",
    "expire_sec",
    "master_ips",
    "refresh_sec",
    "retry_sec",
    "soa_email",
    "status",
    "tags",
    "ttl_sec",
    "type",
    "group",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    Master,
    Slave,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomainParams {
    pub state: PresenceState,
    pub domain: String,
    #[serde(rename = "type")]
    pub domain_type: Option<DomainType>,
    pub soa_email: Option<String>,
    pub description: Option<String>,
    pub axfr_ips: Option<Vec<String>>,
    pub master_ips: Option<Vec<String>>,
    pub expire_sec: Option<u64>,
    pub refresh_sec: Option<u64>,
    pub retry_sec: Option<u64>,
    pub ttl_sec: Option<u64>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub group: Option<String>,
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: DomainParams = parse_params(params)?;
    let client = &ctx.client;

    let identity = Identity::field("domain", json!(params.domain));
    let existing = resolve(client, COLLECTION, &identity, None).await?;

    match params.state {
        PresenceState::Present => {
            let domain = match existing {
                Some(domain) => domain,
                None => create(client, &params, result).await?,
            };
            let path = format!("{}/{}", COLLECTION, id_of(&domain)?);

            let desired = DesiredConfig::from_params(&params)?.select(MUTABLE_FIELDS);
            Reconciler::new(client, path.as_str(), MUTABLE_FIELDS)
                .apply(&normalize(domain), &desired, &mut result.actions)
                .await?;

            result.set("domain", normalize(client.get(&path).await?));
            result.set("records", records(client, &path).await?);
            result.set("zone_file", client.get(&format!("{}/zone-file", path)).await?);
            Ok(())
        }
        PresenceState::Absent => {
            let Some(domain) = existing else {
                return Ok(());
            };
            let path = format!("{}/{}", COLLECTION, id_of(&domain)?);

            result.set("records", records(client, &path).await?);
            result.set("domain", normalize(domain));
            client.delete(&path).await?;
            result.register_action(format!("Deleted domain {}", params.domain));
            Ok(())
        }
    }
}

async fn create(
    client: &LinodeClient,
    params: &DomainParams,
    result: &mut ModuleResult,
) -> Result<Value> {
    let mut body = DesiredConfig::from_params(params)?.without(&["state"]);
    if !body.contains_key("type") {
        body.insert("type", json!(DomainType::Master));
    }

    let domain = client.post(COLLECTION, Some(&body.to_body())).await?;
    result.register_action(format!("Created domain {}", params.domain));
    Ok(domain)
}

async fn records(client: &LinodeClient, path: &str) -> Result<Value> {
    let records = fetch_collection(client, &format!("{}/records", path), None, None).await?;
    Ok(Value::Array(records))
}

/// The API reports an unset group as an empty string
fn normalize(mut domain: Value) -> Value {
    if domain.get("group").and_then(|g| g.as_str()) == Some("") {
        domain["group"] = Value::Null;
    }
    domain
}
