//! Tool descriptors a run can hand to the engine.

use crate::{Error, ErrorContext};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A capability the engine may invoke during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Tool {
    /// Hosted by the platform, referenced by id.
    Platform(PlatformTool),
    /// Caller-hosted HTTP endpoint described by a JSON Schema.
    Function(FunctionTool),
    /// Model Context Protocol server.
    Mcp(McpTool),
}

impl Tool {
    pub fn platform(id: impl Into<String>) -> Self {
        Tool::Platform(PlatformTool::new(id))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tool::Platform(_) => "platform",
            Tool::Function(_) => "function",
            Tool::Mcp(_) => "mcp",
        }
    }
}

impl From<PlatformTool> for Tool {
    fn from(t: PlatformTool) -> Self {
        Tool::Platform(t)
    }
}

impl From<FunctionTool> for Tool {
    fn from(t: FunctionTool) -> Self {
        Tool::Function(t)
    }
}

impl From<McpTool> for Tool {
    fn from(t: McpTool) -> Self {
        Tool::Mcp(t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTool {
    pub id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl PlatformTool {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: Map::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// HTTP method the server uses when calling a function tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// A caller-hosted function.
///
/// `defaults` holds argument values hidden from the model and merged into every call,
/// overriding whatever the model proposes for those keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Call timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
}

impl FunctionTool {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: None,
            method: None,
            timeout: None,
            parameters,
            headers: BTreeMap::new(),
            defaults: Map::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn default_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }
}

/// Capability an MCP server may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpCapability {
    Read,
    Write,
}

impl McpCapability {
    pub const ALL: [McpCapability; 2] = [McpCapability::Read, McpCapability::Write];

    pub fn as_str(&self) -> &'static str {
        match self {
            McpCapability::Read => "read",
            McpCapability::Write => "write",
        }
    }
}

impl fmt::Display for McpCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McpCapability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "read" => Ok(McpCapability::Read),
            "write" => Ok(McpCapability::Write),
            other => Err(Error::validation_with_context(
                format!("unknown MCP capability '{}'", other),
                ErrorContext::new()
                    .with_field_path("allow")
                    .with_details("expected one of: read, write")
                    .with_source("tool_normalizer"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub url: String,
    pub allow: BTreeSet<McpCapability>,
}

impl McpTool {
    pub fn new(url: impl Into<String>, allow: impl IntoIterator<Item = McpCapability>) -> Self {
        Self {
            url: url.into(),
            allow: allow.into_iter().collect(),
        }
    }

    /// Build from capability strings, rejecting anything outside the known vocabulary.
    pub fn parse<I, S>(url: impl Into<String>, allow: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow = allow
            .into_iter()
            .map(|s| s.as_ref().parse::<McpCapability>())
            .collect::<crate::Result<BTreeSet<_>>>()?;
        Ok(Self {
            url: url.into(),
            allow,
        })
    }
}
