//! Normalized, serialization-ready view of an `.api` document.
//!
//! Field names on the wire are fixed (snake_case). Collections are always
//! emitted except the few marked omit-if-empty, and string maps are
//! `BTreeMap`s so keys come out sorted and the output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type StringMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSpec {
    pub syntax: String,
    pub info: Metadata,
    pub imports: Vec<ImportRef>,
    pub types: Vec<TypeDef>,
    pub services: Vec<ServiceDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub author: String,
    pub date: String,
    pub version: String,
    pub email: String,
    pub properties: StringMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRef {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_package: Option<String>,
    /// Reserved for nested resolution; always empty today.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: StringMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    pub is_inline: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDef {
    pub name: String,
    pub server: ServerAnnotation,
    pub routes: Vec<RouteDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerAnnotation {
    pub group: String,
    pub prefix: String,
    pub auth: String,
    pub middleware: Vec<String>,
    pub timeout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDef {
    pub handler: String,
    pub method: String,
    pub path: String,
    pub request_type: String,
    pub response_type: String,
    pub doc: StringMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub at_server_annotation: StringMap,
}

/// Text layout for encoded JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonStyle {
    /// Two-space indented.
    #[default]
    Pretty,
    Compact,
}

impl NormalizedSpec {
    pub fn to_json(&self, style: JsonStyle) -> Result<String> {
        encode(self, style)
    }

    pub fn from_json(src: &str) -> Result<Self> {
        crate::path_de::from_str_with_path(src)
    }
}

/// Encode any serializable value in the requested layout.
pub fn encode<T: Serialize + ?Sized>(value: &T, style: JsonStyle) -> Result<String> {
    match style {
        JsonStyle::Pretty => serde_json::to_string_pretty(value),
        JsonStyle::Compact => serde_json::to_string(value),
    }
    .map_err(Error::Encode)
}
