//! Identity resolution
//!
//! Locates zero or one existing remote resource by explicit ID or by a
//! label-like field. Read-only.

use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use crate::resource::fetch_collection;
use serde_json::{Map, Value};

/// How a resource is identified within one run
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// Explicit provider ID
    Id(Value),
    /// Unique value of a label-like field (`label`, `domain`, ...)
    Field { field: String, value: Value },
}

impl Identity {
    pub fn label(value: &str) -> Self {
        Self::Field {
            field: "label".to_string(),
            value: Value::String(value.to_string()),
        }
    }

    pub fn field(field: &str, value: Value) -> Self {
        Self::Field {
            field: field.to_string(),
            value,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Identity::Id(id) => format!("id {}", path_segment(id)),
            Identity::Field { field, value } => format!("{} {}", field, path_segment(value)),
        }
    }
}

/// Render a JSON scalar as a URL path segment
pub fn path_segment(value: &Value) -> String {
    match value {
        Value::String(s) => urlencoding::encode(s).into_owned(),
        other => other.to_string(),
    }
}

/// Extract the `id` of a resource as a path segment
pub fn id_of(resource: &Value) -> Result<String> {
    match resource.get("id") {
        Some(id) if id.is_string() || id.is_number() => Ok(path_segment(id)),
        _ => Err(Error::InvalidResponse("resource is missing an id".to_string())),
    }
}

/// Resolve an identity within `collection`.
///
/// An ID that does not exist is an error; a field value with no match is `None`.
pub async fn resolve(
    client: &LinodeClient,
    collection: &str,
    identity: &Identity,
    extra_filter: Option<&Map<String, Value>>,
) -> Result<Option<Value>> {
    match identity {
        Identity::Id(id) => find_by_id(client, collection, id).await.map(Some),
        Identity::Field { field, value } => {
            find_by_field(client, collection, field, value, extra_filter).await
        }
    }
}

pub async fn find_by_id(client: &LinodeClient, collection: &str, id: &Value) -> Result<Value> {
    let path = format!("{}/{}", collection.trim_end_matches('/'), path_segment(id));
    client.load(&path).await
}

/// Query the collection filtered by `field == value`. When several resources
/// match, the first one wins.
pub async fn find_by_field(
    client: &LinodeClient,
    collection: &str,
    field: &str,
    value: &Value,
    extra_filter: Option<&Map<String, Value>>,
) -> Result<Option<Value>> {
    let mut filter = extra_filter.cloned().unwrap_or_default();
    filter.insert(field.to_string(), value.clone());
    let filter = Value::Object(filter);

    let items = fetch_collection(client, collection, Some(&filter), None).await?;
    Ok(first_match(items, |item| item.get(field) == Some(value), collection, field))
}

/// Linear scan for collections that cannot be filtered server-side
pub fn find_in<F>(items: Vec<Value>, predicate: F) -> Option<Value>
where
    F: Fn(&Value) -> bool,
{
    items.into_iter().find(|item| predicate(item))
}

fn first_match<F>(items: Vec<Value>, predicate: F, collection: &str, field: &str) -> Option<Value>
where
    F: Fn(&Value) -> bool,
{
    let mut matches: Vec<Value> = items.into_iter().filter(|item| predicate(item)).collect();

    if matches.len() > 1 {
        tracing::warn!(
            "{} resources in {} share the same {}; using the first match",
            matches.len(),
            collection,
            field
        );
    }

    if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    }
}
