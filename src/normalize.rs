//! Document → NormalizedSpec projection.
//!
//! Pure and total: every `Document` the front-end can build has a normalized
//! form. The rules that matter for compatibility:
//! - `info`: the property map wins when non-empty, else the legacy fields.
//! - `@server` on a group replaces the service's server block wholesale; the
//!   last annotated group wins.
//! - `auth` falls back to `jwt`.
//! - `@doc` free text lands in `doc["summary"]`, after the key/value copy.

use tracing::{debug, trace};

use crate::document::{DefineStruct, Document, InfoBlock, Member, Properties, Route, ServiceBlock, TypeDecl};
use crate::spec::{
    FieldDef, ImportRef, Metadata, NormalizedSpec, RouteDef, ServerAnnotation, ServiceDef, StringMap, TypeDef,
};

pub fn convert(document: &Document) -> NormalizedSpec {
    let imports = document
        .imports
        .iter()
        .map(|import| ImportRef {
            value: import.value.clone(),
            as_package: None,
            types: Vec::new(),
        })
        .collect();

    let types: Vec<TypeDef> = document
        .types
        .iter()
        .filter_map(|decl| match decl {
            TypeDecl::Struct(define) => Some(convert_struct(define)),
            other => {
                trace!(name = other.name(), "skipping non-struct type");
                None
            }
        })
        .collect();

    let service = convert_service(&document.service);
    debug!(
        types = types.len(),
        routes = service.routes.len(),
        service = %service.name,
        "normalized document"
    );

    NormalizedSpec {
        syntax: document.syntax.clone(),
        info: convert_info(&document.info),
        imports,
        types,
        services: vec![service],
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INFO
// ————————————————————————————————————————————————————————————————————————————

fn convert_info(info: &InfoBlock) -> Metadata {
    if info.properties.is_empty() {
        // documents written before `info` carried a property map
        return Metadata {
            title: info.title.clone(),
            description: info.desc.clone(),
            author: info.author.clone(),
            date: String::new(),
            version: info.version.clone(),
            email: info.email.clone(),
            properties: StringMap::new(),
        };
    }

    let lookup = |key: &str| info.properties.get(key).cloned().unwrap_or_default();
    Metadata {
        title: lookup("title"),
        description: lookup("desc"),
        author: lookup("author"),
        date: lookup("date"),
        version: lookup("version"),
        email: lookup("email"),
        properties: to_string_map(&info.properties),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

fn convert_struct(define: &DefineStruct) -> TypeDef {
    TypeDef {
        name: define.name.clone(),
        raw_name: define.raw_name.clone(),
        fields: define.members.iter().map(convert_member).collect(),
        docs: define.docs.clone(),
        enums: StringMap::new(),
    }
}

fn convert_member(member: &Member) -> FieldDef {
    FieldDef {
        name: member.name.clone(),
        ty: member.ty.name(),
        tag: member.tag.clone(),
        comment: member.comment.clone(),
        docs: member.docs.clone(),
        is_inline: member.is_inline,
        optional: member.is_optional(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERVICE
// ————————————————————————————————————————————————————————————————————————————

fn convert_service(service: &ServiceBlock) -> ServiceDef {
    let mut out = ServiceDef {
        name: service.name.clone(),
        server: ServerAnnotation::default(),
        routes: Vec::new(),
    };

    for group in &service.groups {
        // NOTE: overwrite, not merge. An annotated group discards whatever an
        // earlier group set, keys included.
        if let Some(properties) = &group.annotation.properties {
            out.server = convert_server(properties);
        }
        out.routes.extend(group.routes.iter().map(convert_route));
    }

    out
}

fn convert_server(properties: &Properties) -> ServerAnnotation {
    let value = |key: &str| properties.get(key).cloned().unwrap_or_default();
    let auth = ["auth", "jwt"]
        .iter()
        .filter_map(|key| properties.get(*key))
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default();

    ServerAnnotation {
        group: value("group"),
        prefix: value("prefix"),
        auth,
        middleware: split_middleware(properties.get("middleware").map(String::as_str)),
        timeout: value("timeout"),
    }
}

// NOTE: `middleware: A, B` yields `["A", "B"]`. Older go-zero JSON dumps put the
// raw value in a one-element list (`["A, B"]`), so consumers comparing the two
// will see different arrays.
fn split_middleware(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn convert_route(route: &Route) -> RouteDef {
    let mut doc = route
        .at_doc
        .properties
        .as_ref()
        .map(to_string_map)
        .unwrap_or_default();
    if !route.at_doc.text.is_empty() {
        doc.insert("summary".to_string(), route.at_doc.text.clone());
    }

    RouteDef {
        handler: route.handler.clone(),
        method: route.method.clone(),
        path: route.path.clone(),
        request_type: route.request_type_name().unwrap_or_default(),
        response_type: route.response_type_name().unwrap_or_default(),
        doc,
        docs: route.docs.clone(),
        at_server_annotation: route
            .at_server_annotation
            .properties
            .as_ref()
            .map(to_string_map)
            .unwrap_or_default(),
    }
}

fn to_string_map(properties: &Properties) -> StringMap {
    properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
