//! Resource Fetcher
//!
//! Fetches paginated Linode collections and builds `X-Filter` expressions.

use crate::error::Result;
use crate::linode::LinodeClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Largest page size accepted by the API
pub const PAGE_SIZE: u32 = 500;

/// A single list filter: `name` must equal one of `values`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceFilter {
    pub name: String,
    pub values: Vec<Value>,
}

impl ResourceFilter {
    pub fn new(name: &str, values: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }
}

/// Build an `X-Filter` expression: values of one filter are OR-ed, filters
/// are AND-ed, and ordering keys are attached when `order_by` is set.
pub fn build_filter(
    filters: &[ResourceFilter],
    order_by: Option<&str>,
    order: &str,
) -> Option<Value> {
    let mut result = Map::new();

    if let Some(order_by) = order_by {
        result.insert("+order_by".to_string(), json!(order_by));
        result.insert("+order".to_string(), json!(order));
    }

    if !filters.is_empty() {
        let clauses: Vec<Value> = filters
            .iter()
            .map(|f| {
                let any: Vec<Value> = f
                    .values
                    .iter()
                    .map(|v| json!({ f.name.clone(): v }))
                    .collect();
                json!({ "+or": any })
            })
            .collect();
        result.insert("+and".to_string(), Value::Array(clauses));
    }

    if result.is_empty() {
        None
    } else {
        Some(Value::Object(result))
    }
}

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub page: u64,
    pub pages: u64,
}

/// Fetch one page of a collection
pub async fn fetch_page(
    client: &LinodeClient,
    path: &str,
    filter: Option<&Value>,
    page: u64,
) -> Result<PaginatedResult> {
    let separator = if path.contains('?') { '&' } else { '?' };
    let paged = format!("{}{}page={}&page_size={}", path, separator, page, PAGE_SIZE);

    let response = match filter {
        Some(filter) => client.get_filtered(&paged, filter).await?,
        None => client.get(&paged).await?,
    };

    let items = response
        .get("data")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let pages = response.get("pages").and_then(|v| v.as_u64()).unwrap_or(1);
    let page = response.get("page").and_then(|v| v.as_u64()).unwrap_or(page);

    Ok(PaginatedResult { items, page, pages })
}

/// Fetch a collection (auto-paginate), stopping early once `limit` items are collected
pub async fn fetch_collection(
    client: &LinodeClient,
    path: &str,
    filter: Option<&Value>,
    limit: Option<usize>,
) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page = 1;

    loop {
        let result = fetch_page(client, path, filter, page).await?;
        all_items.extend(result.items);

        if let Some(limit) = limit {
            if all_items.len() >= limit {
                all_items.truncate(limit);
                break;
            }
        }

        if result.page >= result.pages {
            break;
        }
        page = result.page + 1;
    }

    Ok(all_items)
}

/// Fill `{name}` placeholders in an endpoint template
pub fn fill_template(template: &str, values: &Map<String, Value>) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(
            &format!("{{{}}}", key),
            &urlencoding::encode(&rendered),
        );
    }
    out
}
