//! Data-driven single-resource lookups (`*_info`)

use super::common::{take_template_values, tolerate_unavailable, ModuleContext};
use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use crate::reconcile::{find_in, resolve, Identity, ModuleResult};
use crate::resource::{fetch_collection, fill_template, AttributeDef, InfoModuleDef, Lookup};
use serde_json::{Map, Value};

pub fn result_fields(def: &InfoModuleDef) -> Vec<&str> {
    std::iter::once(def.result_field.as_str())
        .chain(def.secondary_results.iter().map(|s| s.field_name.as_str()))
        .collect()
}

/// Pick the single identity attribute the caller supplied
fn select_attribute(
    def: &InfoModuleDef,
    params: Map<String, Value>,
) -> Result<Option<(&AttributeDef, Value)>> {
    let mut supplied = Vec::new();

    for (key, value) in params {
        if value.is_null() {
            continue;
        }

        let Some(attribute) = def.attributes.iter().find(|a| a.name == key) else {
            return Err(Error::Validation(format!("unsupported parameter: {}", key)));
        };

        if !attribute.param_type.accepts(&value) {
            return Err(Error::Validation(format!(
                "parameter {} must be of type {:?}, got {}",
                key, attribute.param_type, value
            )));
        }

        supplied.push((attribute, value));
    }

    if def.attributes.is_empty() {
        return Ok(None);
    }

    let names = || {
        def.attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match supplied.len() {
        1 => Ok(supplied.pop()),
        0 => Err(Error::Validation(format!(
            "one of the following is required: {}",
            names()
        ))),
        _ => Err(Error::Validation(format!(
            "parameters are mutually exclusive: {}",
            names()
        ))),
    }
}

async fn lookup(
    client: &LinodeClient,
    collection: &str,
    attribute: &AttributeDef,
    value: Value,
) -> Result<Option<Value>> {
    match attribute.lookup {
        Lookup::Id => resolve(client, collection, &Identity::Id(value), None).await,
        Lookup::Filter => {
            resolve(client, collection, &Identity::field(&attribute.name, value), None).await
        }
        Lookup::Scan => {
            let items = fetch_collection(client, collection, None, None).await?;
            Ok(find_in(items, |item| item.get(&attribute.name) == Some(&value)))
        }
    }
}

pub async fn run(
    ctx: &ModuleContext,
    def: &InfoModuleDef,
    mut params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let client = &ctx.client;
    let template = take_template_values(&def.params, &mut params)?;
    let collection = fill_template(&def.collection, &template);

    let resource = match select_attribute(def, params)? {
        None => client.get(&collection).await?,
        Some((attribute, value)) => {
            let described = format!("{} with {} {}", def.display_name, attribute.name, value);
            lookup(client, &collection, attribute, value)
                .await?
                .ok_or(Error::NotFound(described))?
        }
    };

    // Endpoint placeholders may reference the caller's params or the resource's own fields
    let mut fields = template;
    if let Value::Object(map) = &resource {
        for (key, value) in map {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let primary = match &def.primary_endpoint {
        Some(endpoint) => client.get(&fill_template(endpoint, &fields)).await?,
        None => resource,
    };
    result.set(&def.result_field, primary);

    for secondary in &def.secondary_results {
        let endpoint = fill_template(&secondary.endpoint, &fields);
        let fetched = if secondary.paginated {
            fetch_collection(client, &endpoint, None, None)
                .await
                .map(Value::Array)
        } else {
            client.get(&endpoint).await
        };

        let value = if secondary.tolerate_unavailable {
            tolerate_unavailable(fetched)?
        } else {
            fetched?
        };
        result.set(&secondary.field_name, value);
    }

    Ok(())
}
