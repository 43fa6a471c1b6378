//! SSH keys attached to the caller's profile

use super::common::{parse_params, require, ModuleContext};
use super::state::PresenceState;
use crate::error::Result;
use crate::reconcile::{id_of, resolve, DesiredConfig, Identity, ModuleResult, Reconciler};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const RESULT_FIELDS: &[&str] = &["ssh_key"];

const COLLECTION: &str = "/profile/sshkeys";

const MUTABLE_FIELDS: &[&str] = &["label"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SshKeyParams {
    pub state: PresenceState,
    pub label: String,
    /// Public key material, required when `state` is present
    pub ssh_key: Option<String>,
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: SshKeyParams = parse_params(params)?;
    let client = &ctx.client;

    match params.state {
        PresenceState::Present => {
            let public_key = require(&params.ssh_key, "ssh_key", "present")?;

            let identity = Identity::label(&params.label);
            let key = match resolve(client, COLLECTION, &identity, None).await? {
                Some(key) => key,
                None => {
                    let body = json!({ "label": params.label, "ssh_key": public_key });
                    let key = client.post(COLLECTION, Some(&body)).await?;
                    result.register_action(format!("Created SSH key {}", params.label));
                    key
                }
            };
            let path = format!("{}/{}", COLLECTION, id_of(&key)?);

            let desired = DesiredConfig::from_params(&params)?.select(MUTABLE_FIELDS);
            Reconciler::new(client, path.as_str(), MUTABLE_FIELDS)
                .apply(&key, &desired, &mut result.actions)
                .await?;

            result.set("ssh_key", client.get(&path).await?);
            Ok(())
        }
        PresenceState::Absent => {
            let identity = Identity::label(&params.label);
            let Some(key) = resolve(client, COLLECTION, &identity, None).await? else {
                return Ok(());
            };
            let path = format!("{}/{}", COLLECTION, id_of(&key)?);

            result.set("ssh_key", key);
            client.delete(&path).await?;
            result.register_action(format!("Deleted SSH key {}", params.label));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_does_not_need_key_material() {
        let params: SshKeyParams =
            parse_params(json!({"state": "absent", "label": "ci"}).as_object().cloned().unwrap())
                .unwrap();
        assert!(params.ssh_key.is_none());
        assert_eq!(params.state, PresenceState::Absent);
    }
}
