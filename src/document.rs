//! Parsed `.api` document.
//!
//! This is the structural surface the normalizer reads: syntax tag, `info`
//! block, imports, type declarations and the service with its route groups.
//! It mirrors the source closely (comments keep their markers, tags keep their
//! backticks) and carries no JSON mapping of its own.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Key/value pairs of an `info`, `@server` or `@doc` block, in source order.
pub type Properties = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub syntax: String,           // e.g. "v1", empty if the file has no syntax line
    pub info: InfoBlock,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub service: ServiceBlock,
}

/// The `info (...)` block.
///
/// Older documents only carried the single-valued fields; newer ones carry the
/// full property map. Both are exposed so consumers can reconcile them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoBlock {
    pub properties: Properties,
    pub title: String,
    pub desc: String,
    pub author: String,
    pub version: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportDecl {
    pub value: String,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A top-level `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    /// `type Name { ... }` / `type Name struct { ... }`
    Struct(DefineStruct),
    /// `type Name = T` / `type Name T`
    Alias(DefineAlias),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Struct(s) => &s.name,
            TypeDecl::Alias(a) => &a.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefineStruct {
    pub name: String,
    pub raw_name: String,         // identifier as written in the source
    pub members: Vec<Member>,
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineAlias {
    pub name: String,
    pub target: TypeExpr,
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,             // empty for embedded members
    pub ty: TypeExpr,
    pub tag: String,              // raw, backticks included; empty if absent
    pub comment: String,          // trailing comment, markers included
    pub docs: Vec<String>,
    pub is_inline: bool,
}

impl Member {
    /// A member is optional when its `json` tag carries the `optional` option.
    pub fn is_optional(&self) -> bool {
        parse_tags(&self.tag)
            .iter()
            .find(|tag| tag.key == "json")
            .is_some_and(|tag| tag.options.iter().any(|opt| opt == "optional"))
    }
}

/// One `key:"name,opt1,opt2"` entry of a struct tag. The name itself is not kept.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub key: String,
    pub options: Vec<String>,
}

static TAG_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_\-]*):"((?:[^"\\]|\\.)*)""#).expect("valid tag regex")
});

/// Split a raw struct tag (with or without backticks) into its entries.
pub(crate) fn parse_tags(raw: &str) -> Vec<Tag> {
    let raw = raw.trim().trim_matches('`');
    TAG_ENTRY
        .captures_iter(raw)
        .map(|caps| {
            let options = caps[2].split(',').skip(1).map(str::trim);
            Tag {
                key: caps[1].to_string(),
                options: options.filter(|s| !s.is_empty()).map(str::to_string).collect(),
            }
        })
        .collect()
}

/// A type expression as it appears in a member, alias or route signature.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `string`, `int64`, `User`, `pkg.User`, `any`
    Named(String),
    /// `[]T`
    Array(Box<TypeExpr>),
    /// `[N]T`
    FixedArray { len: String, elem: Box<TypeExpr> },
    /// `map[K]V`
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `interface{}`
    Interface,
}

impl TypeExpr {
    /// Render the expression back to its canonical source spelling.
    pub fn name(&self) -> String {
        match self {
            TypeExpr::Named(n) => n.clone(),
            TypeExpr::Array(elem) => format!("[]{}", elem.name()),
            TypeExpr::FixedArray { len, elem } => format!("[{len}]{}", elem.name()),
            TypeExpr::Map { key, value } => format!("map[{}]{}", key.name(), value.name()),
            TypeExpr::Pointer(elem) => format!("*{}", elem.name()),
            TypeExpr::Interface => "interface{}".to_string(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERVICE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceBlock {
    pub name: String,
    pub groups: Vec<Group>,
}

/// One `[@server(...)] service name { ... }` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub annotation: Annotation,
    pub routes: Vec<Route>,
}

/// `@server(...)`. `properties` is `None` when no annotation was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub properties: Option<Properties>,
}

impl Annotation {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key).map(String::as_str)
    }
}

/// `@doc "text"` or `@doc(key: value ...)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtDoc {
    pub properties: Option<Properties>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub handler: String,
    pub method: String,           // lower-case
    pub path: String,
    pub request_type: Option<TypeExpr>,
    pub response_type: Option<TypeExpr>,
    pub at_doc: AtDoc,
    pub docs: Vec<String>,
    pub at_server_annotation: Annotation,
}

impl Route {
    pub fn request_type_name(&self) -> Option<String> {
        self.request_type.as_ref().map(TypeExpr::name)
    }

    pub fn response_type_name(&self) -> Option<String> {
        self.response_type.as_ref().map(TypeExpr::name)
    }
}
