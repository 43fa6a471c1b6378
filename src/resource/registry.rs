//! Resource Registry - Load read-only module definitions from JSON
//!
//! Info and list modules are pure pass-through reads, so they are described
//! by embedded JSON files rather than code. This module loads them once and
//! provides lookup functions for the module runner.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/info.json"),
    include_str!("../resources/list.json"),
];

/// Type of a templated parameter or identity attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Integer,
    String,
}

impl ParamType {
    /// Check that a supplied JSON value has this type
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::String => value.is_string(),
        }
    }
}

/// Placeholder parameter of an endpoint template, e.g. `vpc_id`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// How an identity attribute locates the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// `GET {collection}/{value}`
    Id,
    /// Collection query with `X-Filter: {name: value}`
    Filter,
    /// Unfiltered collection scan comparing `name` client-side
    Scan,
}

/// Identity attribute of an info module
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub lookup: Lookup,
}

/// Extra result fetched after the primary resource is resolved
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryResultDef {
    pub field_name: String,
    /// Endpoint template filled from the primary resource's fields
    pub endpoint: String,
    #[serde(default)]
    pub paginated: bool,
    /// Substitute a placeholder when the API answers 400/503 (resource still provisioning)
    #[serde(default)]
    pub tolerate_unavailable: bool,
}

/// Info module definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct InfoModuleDef {
    pub display_name: String,
    pub result_field: String,
    pub collection: String,
    #[serde(default)]
    pub params: Vec<TemplateParamDef>,
    pub attributes: Vec<AttributeDef>,
    /// Replaces the primary result with this endpoint once the resource is found
    #[serde(default)]
    pub primary_endpoint: Option<String>,
    #[serde(default)]
    pub secondary_results: Vec<SecondaryResultDef>,
}

/// List module definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ListModuleDef {
    pub display_name: String,
    pub result_field: String,
    pub endpoint: String,
    #[serde(default)]
    pub params: Vec<TemplateParamDef>,
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResourceConfig {
    #[serde(default)]
    pub info_modules: HashMap<String, InfoModuleDef>,
    #[serde(default)]
    pub list_modules: HashMap<String, ListModuleDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig::default();

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.info_modules.extend(partial.info_modules);
            final_config.list_modules.extend(partial.list_modules);
        }

        final_config
    })
}

/// Get an info module definition by module name
pub fn get_info_module(name: &str) -> Option<&'static InfoModuleDef> {
    get_registry().info_modules.get(name)
}

/// Get a list module definition by module name
pub fn get_list_module(name: &str) -> Option<&'static ListModuleDef> {
    get_registry().list_modules.get(name)
}

/// All data-driven module names, sorted
pub fn get_all_module_names() -> Vec<&'static str> {
    let registry = get_registry();
    let mut names: Vec<&'static str> = registry
        .info_modules
        .keys()
        .chain(registry.list_modules.keys())
        .map(|s| s.as_str())
        .collect();
    names.sort_unstable();
    names
}
