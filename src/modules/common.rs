//! Parameter handling and run context shared by all modules

use crate::config::{Config, ConnectionOverrides};
use crate::error::{Error, Result};
use crate::linode::LinodeClient;
use crate::resource::TemplateParamDef;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Connection parameters accepted by every module
pub const COMMON_PARAMS: &[&str] = &["api_token", "api_url", "api_version", "ua_prefix", "ca_path"];

/// Key under which Ansible wraps module arguments
const ANSIBLE_ARGS_KEY: &str = "ANSIBLE_MODULE_ARGS";

/// Returned in place of sub-resources the API refuses while provisioning
pub const UNAVAILABLE_PLACEHOLDER: &str =
    "Resource is not yet available; it may still be provisioning";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommonParams {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub ua_prefix: Option<String>,
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
}

impl From<CommonParams> for ConnectionOverrides {
    fn from(params: CommonParams) -> Self {
        ConnectionOverrides {
            api_token: params.api_token,
            api_url: params.api_url,
            api_version: params.api_version,
            ua_prefix: params.ua_prefix,
            ca_path: params.ca_path,
        }
    }
}

/// Unwrap an `ANSIBLE_MODULE_ARGS` envelope and drop `_ansible_*` keys
pub fn normalize_args(args: Value) -> Result<Map<String, Value>> {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(Error::Validation(format!(
                "module arguments must be a mapping, got {}",
                other
            )))
        }
    };

    if map.len() == 1 {
        if let Some(Value::Object(inner)) = map.remove(ANSIBLE_ARGS_KEY) {
            map = inner;
        }
    }

    map.retain(|key, _| !key.starts_with("_ansible_"));
    Ok(map)
}

/// Separate the connection parameters from the module's own parameters
pub fn split_common(mut args: Map<String, Value>) -> Result<(CommonParams, Map<String, Value>)> {
    let mut common = Map::new();
    for key in COMMON_PARAMS {
        if let Some(value) = args.remove(*key) {
            common.insert(key.to_string(), value);
        }
    }

    let common = parse_params(common)?;
    Ok((common, args))
}

/// Deserialize module parameters, reporting schema violations as validation errors
pub fn parse_params<T: DeserializeOwned>(params: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(params)).map_err(|e| Error::Validation(e.to_string()))
}

/// Remove and type-check the placeholder values of an endpoint template
pub fn take_template_values(
    defs: &[TemplateParamDef],
    params: &mut Map<String, Value>,
) -> Result<Map<String, Value>> {
    let mut values = Map::new();

    for def in defs {
        let value = params
            .remove(&def.name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::Validation(format!("missing required parameter: {}", def.name))
            })?;

        if !def.param_type.accepts(&value) {
            return Err(Error::Validation(format!(
                "parameter {} must be of type {:?}, got {}",
                def.name, def.param_type, value
            )));
        }

        values.insert(def.name.clone(), value);
    }

    Ok(values)
}

/// Fail unless a parameter required by the current state is set
pub fn require<'a, T>(value: &'a Option<T>, name: &str, state: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        Error::Validation(format!(
            "state is {} but the following is missing: {}",
            state, name
        ))
    })
}

/// Map a 400/503 answer to the "not yet available" placeholder
pub fn tolerate_unavailable(result: Result<Value>) -> Result<Value> {
    match result {
        Err(e) if e.has_status(400) || e.has_status(503) => {
            tracing::warn!("Sub-resource unavailable: {}", e);
            Ok(Value::String(UNAVAILABLE_PLACEHOLDER.to_string()))
        }
        other => other,
    }
}

/// Everything a module needs for one run
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub client: LinodeClient,
    pub poll_interval: Duration,
}

impl ModuleContext {
    pub fn new(client: LinodeClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Resolve connection settings and build the API client
    pub fn from_config(config: &Config, common: CommonParams) -> Result<Self> {
        let settings = config.resolve(&common.into())?;
        let client = LinodeClient::new(&settings)?;
        Ok(Self::new(client, config.poll_interval()))
    }
}
