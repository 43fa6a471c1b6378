//! StackScripts owned by the caller

use super::common::{parse_params, require, ModuleContext};
use super::state::PresenceState;
use crate::error::Result;
use crate::reconcile::{id_of, resolve, DesiredConfig, Identity, ModuleResult, Reconciler};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const RESULT_FIELDS: &[&str] = &["stackscript"];

const COLLECTION: &str = "/linode/stackscripts";

const MUTABLE_FIELDS: &[&str] = &["description", "images", "is_public", "rev_note", "script"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StackScriptParams {
    pub state: PresenceState,
    pub label: String,
    pub script: Option<String>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub rev_note: Option<String>,
}

/// Public scripts share the label namespace, so lookups only consider the caller's own
fn own_scripts() -> Map<String, Value> {
    let mut filter = Map::new();
    filter.insert("mine".to_string(), json!(true));
    filter
}

pub async fn run(
    ctx: &ModuleContext,
    params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let params: StackScriptParams = parse_params(params)?;
    let client = &ctx.client;
    let identity = Identity::label(&params.label);
    let mine = own_scripts();

    match params.state {
        PresenceState::Present => {
            require(&params.images, "images", "present")?;
            require(&params.script, "script", "present")?;

            let desired = DesiredConfig::from_params(&params)?;
            let script = match resolve(client, COLLECTION, &identity, Some(&mine)).await? {
                Some(script) => script,
                None => {
                    let body = desired.without(&["state"]).to_body();
                    let script = client.post(COLLECTION, Some(&body)).await?;
                    result.register_action(format!("Created stackscript {}", params.label));
                    script
                }
            };
            let path = format!("{}/{}", COLLECTION, id_of(&script)?);

            Reconciler::new(client, path.as_str(), MUTABLE_FIELDS)
                .apply(&script, &desired.select(MUTABLE_FIELDS), &mut result.actions)
                .await?;

            result.set("stackscript", client.get(&path).await?);
            Ok(())
        }
        PresenceState::Absent => {
            let Some(script) = resolve(client, COLLECTION, &identity, Some(&mine)).await? else {
                return Ok(());
            };
            let path = format!("{}/{}", COLLECTION, id_of(&script)?);

            result.set("stackscript", script);
            client.delete(&path).await?;
            result.register_action(format!("Deleted stackscript {}", params.label));
            Ok(())
        }
    }
}
