/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Marker header carried in both directions: `1` when the body is an RSA envelope.
pub const ENCRYPTED_HEADER: &str = "x-encrypted";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Body the dashboard posts to the gateway for every backend call.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProxyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, ParamValue>>,
}

impl ProxyRequest {
    /// Flattens `params` into `key=value` pairs. Arrays repeat the key, nulls are dropped.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(params) = &self.params else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (k, v) in params {
            match v {
                ParamValue::Null => {}
                ParamValue::One(s) => out.push((k.clone(), s.to_string())),
                ParamValue::Many(items) => {
                    for s in items {
                        out.push((k.clone(), s.to_string()));
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Many(Vec<ParamScalar>),
    One(ParamScalar),
    Null,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamScalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl fmt::Display for ParamScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamScalar::Text(s) => f.write_str(s),
            ParamScalar::Number(n) => write!(f, "{n}"),
            ParamScalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl RelayMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMethod::Get => "GET",
            RelayMethod::Post => "POST",
            RelayMethod::Put => "PUT",
            RelayMethod::Patch => "PATCH",
            RelayMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported method: {}", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for RelayMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(RelayMethod::Get),
            "POST" => Ok(RelayMethod::Post),
            "PUT" => Ok(RelayMethod::Put),
            "PATCH" => Ok(RelayMethod::Patch),
            "DELETE" => Ok(RelayMethod::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Uniform error body returned by the gateway itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
}

impl FailureEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Upstream response body when `x-encrypted: 1`: `data` holds base64 ciphertext.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EncryptedBody {
    pub data: String,
}
