//! Data-driven collection listings (`*_list`)

use super::common::{parse_params, take_template_values, ModuleContext};
use crate::error::Result;
use crate::reconcile::ModuleResult;
use crate::resource::{build_filter, fetch_collection, fill_template, ListModuleDef, ResourceFilter};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    #[serde(default)]
    pub order: Option<SortOrder>,
    pub order_by: Option<String>,
    pub filters: Option<Vec<ResourceFilter>>,
    /// Maximum number of results
    pub count: Option<usize>,
}

pub fn result_fields(def: &ListModuleDef) -> Vec<&str> {
    vec![def.result_field.as_str()]
}

pub async fn run(
    ctx: &ModuleContext,
    def: &ListModuleDef,
    mut params: Map<String, Value>,
    result: &mut ModuleResult,
) -> Result<()> {
    let template = take_template_values(&def.params, &mut params)?;
    let params: ListParams = parse_params(params)?;

    let endpoint = fill_template(&def.endpoint, &template);
    let filter = build_filter(
        params.filters.as_deref().unwrap_or_default(),
        params.order_by.as_deref(),
        params.order.unwrap_or_default().as_str(),
    );

    tracing::debug!("Listing {} from {}", def.display_name, endpoint);
    let items = fetch_collection(&ctx.client, &endpoint, filter.as_ref(), params.count).await?;
    result.set(&def.result_field, Value::Array(items));
    Ok(())
}
