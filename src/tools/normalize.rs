//! Tool validation and normalization before submission.
//!
//! Function tools may declare `defaults`: arguments the caller fixes and the model never
//! sees. The schema sent for model consumption has those keys removed from `properties`
//! and `required`; the full schema, defaults and headers stay on the normalized tool so the
//! call-time body can be rebuilt with [`NormalizedFunctionTool::invocation_body`].

use crate::structured::schema::compile_check;
use crate::types::tool::{FunctionTool, HttpMethod, McpTool, PlatformTool, Tool};
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Platform tool ids this client version knows about. Others are passed through untouched
/// so the server can accept tools added after this release.
pub const KNOWN_PLATFORM_TOOLS: &[&str] = &[
    "parallel_search",
    "parallel_extract",
    "web_search",
    "fetch_url",
];

static FUNCTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid function name regex"));

const SOURCE: &str = "tool_normalizer";

/// Wire form of a validated tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NormalizedTool {
    Platform(PlatformTool),
    Function(NormalizedFunctionTool),
    Mcp(McpTool),
}

impl NormalizedTool {
    pub fn as_function(&self) -> Option<&NormalizedFunctionTool> {
        match self {
            NormalizedTool::Function(f) => Some(f),
            _ => None,
        }
    }
}

/// A function tool with defaulted parameters hidden from the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFunctionTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(rename = "parameters")]
    model_parameters: Value,
    #[serde(skip)]
    full_parameters: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    defaults: Map<String, Value>,
}

impl NormalizedFunctionTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema presented to the model: defaulted keys removed.
    pub fn model_parameters(&self) -> &Value {
        &self.model_parameters
    }

    /// Schema as declared by the caller.
    pub fn full_parameters(&self) -> &Value {
        &self.full_parameters
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Body sent to the tool endpoint for a model-proposed call.
    ///
    /// Defaults always override model values for the same key. The merged body must satisfy
    /// the full parameter schema.
    pub fn invocation_body(&self, model_args: &Value) -> Result<Value> {
        let mut body = match model_args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(Error::validation_with_context(
                    "tool arguments must be a JSON object",
                    ErrorContext::new()
                        .with_field_path(format!("{}.arguments", self.name))
                        .with_details(format!("got {}", json_kind(other)))
                        .with_source(SOURCE),
                ))
            }
        };
        for (key, value) in &self.defaults {
            body.insert(key.clone(), value.clone());
        }
        let body = Value::Object(body);

        let compiled = jsonschema::JSONSchema::compile(&self.full_parameters).map_err(|e| {
            Error::validation_with_context(
                "invalid JSON Schema",
                ErrorContext::new()
                    .with_field_path(format!("{}.parameters", self.name))
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })?;
        if let Err(errors) = compiled.validate(&body) {
            let details: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(Error::validation_with_context(
                "tool arguments do not match the parameter schema",
                ErrorContext::new()
                    .with_field_path(format!("{}.arguments", self.name))
                    .with_details(details.join("; "))
                    .with_source(SOURCE),
            ));
        }
        Ok(body)
    }
}

/// Validate and normalize a tool list, preserving order.
pub fn normalize_tools(tools: &[Tool]) -> Result<Vec<NormalizedTool>> {
    let mut function_names = HashSet::new();
    tools
        .iter()
        .enumerate()
        .map(|(idx, tool)| {
            let path = format!("input.tools[{}]", idx);
            let normalized = normalize_tool(tool, &path)?;
            if let NormalizedTool::Function(f) = &normalized {
                if !function_names.insert(f.name.clone()) {
                    return Err(Error::validation_with_context(
                        format!("duplicate function tool name '{}'", f.name),
                        ErrorContext::new()
                            .with_field_path(format!("{}.name", path))
                            .with_source(SOURCE),
                    ));
                }
            }
            Ok(normalized)
        })
        .collect()
}

/// Validate and normalize a single tool. `path` locates it in error messages.
pub fn normalize_tool(tool: &Tool, path: &str) -> Result<NormalizedTool> {
    match tool {
        Tool::Platform(p) => normalize_platform(p, path).map(NormalizedTool::Platform),
        Tool::Function(f) => normalize_function(f, path).map(NormalizedTool::Function),
        Tool::Mcp(m) => normalize_mcp(m, path).map(NormalizedTool::Mcp),
    }
}

fn normalize_platform(tool: &PlatformTool, path: &str) -> Result<PlatformTool> {
    if tool.id.trim().is_empty() {
        return Err(Error::validation_with_context(
            "platform tool id must be non-empty",
            ErrorContext::new()
                .with_field_path(format!("{}.id", path))
                .with_source(SOURCE),
        ));
    }
    if !KNOWN_PLATFORM_TOOLS.contains(&tool.id.as_str()) {
        debug!(tool_id = %tool.id, "passing unrecognized platform tool through to the server");
    }
    Ok(tool.clone())
}

fn normalize_mcp(tool: &McpTool, path: &str) -> Result<McpTool> {
    check_http_url(&tool.url, &format!("{}.url", path))?;
    if tool.allow.is_empty() {
        return Err(Error::validation_with_context(
            "MCP tool must allow at least one capability",
            ErrorContext::new()
                .with_field_path(format!("{}.allow", path))
                .with_details("expected a non-empty subset of: read, write")
                .with_source(SOURCE),
        ));
    }
    Ok(tool.clone())
}

fn normalize_function(tool: &FunctionTool, path: &str) -> Result<NormalizedFunctionTool> {
    if !FUNCTION_NAME.is_match(&tool.name) {
        return Err(Error::validation_with_context(
            format!("invalid function tool name '{}'", tool.name),
            ErrorContext::new()
                .with_field_path(format!("{}.name", path))
                .with_details("expected 1-64 characters from [A-Za-z0-9_-]")
                .with_source(SOURCE),
        ));
    }
    if let Some(url) = &tool.url {
        check_http_url(url, &format!("{}.url", path))?;
    }

    let params_path = format!("{}.parameters", path);
    let params = tool.parameters.as_object().ok_or_else(|| {
        Error::validation_with_context(
            "function parameters must be a JSON object",
            ErrorContext::new()
                .with_field_path(params_path.clone())
                .with_source(SOURCE),
        )
    })?;
    let properties = params
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::validation_with_context(
                "function parameters.properties must be a mapping",
                ErrorContext::new()
                    .with_field_path(format!("{}.properties", params_path))
                    .with_source(SOURCE),
            )
        })?;
    compile_check(&tool.parameters, &params_path)?;

    let required: Vec<&str> = params
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for key in tool.defaults.keys() {
        let field = format!("{}.defaults.{}", path, key);
        if !properties.contains_key(key) {
            return Err(Error::validation_with_context(
                format!("default '{}' is not declared in parameters.properties", key),
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source(SOURCE),
            ));
        }
        if required.contains(&key.as_str()) {
            return Err(Error::validation_with_context(
                format!("default '{}' is also listed in parameters.required", key),
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details("a defaulted parameter cannot be required from the model")
                    .with_source(SOURCE),
            ));
        }
    }

    Ok(NormalizedFunctionTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        url: tool.url.clone(),
        method: tool.method,
        timeout: tool.timeout,
        model_parameters: strip_defaulted(&tool.parameters, &tool.defaults),
        full_parameters: tool.parameters.clone(),
        headers: tool.headers.clone(),
        defaults: tool.defaults.clone(),
    })
}

fn strip_defaulted(parameters: &Value, defaults: &Map<String, Value>) -> Value {
    let mut schema = parameters.clone();
    if defaults.is_empty() {
        return schema;
    }
    if let Some(Value::Object(props)) = schema.get_mut("properties") {
        props.retain(|k, _| !defaults.contains_key(k));
    }
    if let Some(Value::Array(required)) = schema.get_mut("required") {
        required.retain(|k| k.as_str().map_or(true, |k| !defaults.contains_key(k)));
    }
    schema
}

fn check_http_url(raw: &str, field: &str) -> Result<()> {
    let ok = url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(Error::validation_with_context(
            format!("'{}' is not an absolute http(s) URL", raw),
            ErrorContext::new()
                .with_field_path(field)
                .with_source(SOURCE),
        ))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
