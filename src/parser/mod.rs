//! `.api` front-end: source text → [`Document`].
//!
//! Recursive descent over a [`Scanner`]. Only syntax is checked here; type
//! references, duplicate routes and the like are left alone.
//!
//! # Pipeline
//!
//! `file → parse_file → parse_source → Document`

mod scanner;

use std::path::Path;

use tracing::debug;

use crate::document::{
    Annotation, AtDoc, DefineAlias, DefineStruct, Document, Group, ImportDecl, InfoBlock, Member, Properties, Route,
    TypeDecl, TypeExpr,
};
use crate::error::{Error, Result};
use scanner::{is_ident_start, Comment, Position, Scanner};

// ————————————————————————————————————————————————————————————————————————————
// PUBLIC API
// ————————————————————————————————————————————————————————————————————————————

/// Read and parse an `.api` file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_source(&source, &path.display().to_string())
}

/// Parse `.api` source text. `file_name` is only used in diagnostics.
pub fn parse_source(source: &str, file_name: &str) -> Result<Document> {
    let document = Parser::new(source, file_name).parse_document()?;
    debug!(
        file = file_name,
        imports = document.imports.len(),
        types = document.types.len(),
        groups = document.service.groups.len(),
        "parsed api document"
    );
    Ok(document)
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'a> {
    scanner: Scanner<'a>,
    document: Document,
    /// `@server(...)` seen at top level, waiting for its `service` block.
    pending_server: Option<(Position, Properties)>,
    seen_syntax: bool,
    seen_info: bool,
}

/// Annotations and comments collected ahead of a route line.
#[derive(Default)]
struct PendingRoute {
    docs: Vec<String>,
    at_doc: Option<AtDoc>,
    server: Option<Properties>,
    handler: Option<String>,
    annotated_at: Option<Position>,
}

impl PendingRoute {
    fn has_annotations(&self) -> bool {
        self.at_doc.is_some() || self.server.is_some() || self.handler.is_some()
    }
}

fn comment_lines(comments: Vec<Comment>) -> Vec<String> {
    comments.into_iter().map(|c| c.text).collect()
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, file_name: &'a str) -> Self {
        Parser {
            scanner: Scanner::new(source, file_name),
            document: Document::default(),
            pending_server: None,
            seen_syntax: false,
            seen_info: false,
        }
    }

    fn parse_document(mut self) -> Result<Document> {
        loop {
            let comments = self.scanner.skip_trivia()?;
            if self.scanner.is_eof() {
                break;
            }
            let at = self.scanner.position();

            if self.scanner.eat('@') {
                let name = self.scanner.ident()?;
                if name != "server" {
                    return Err(self.scanner.error_at(at, format!("unexpected annotation @{name} outside a service")));
                }
                if self.pending_server.is_some() {
                    return Err(self.scanner.error_at(at, "duplicate @server before a service block"));
                }
                let properties = self.properties()?;
                self.pending_server = Some((at, properties));
                continue;
            }

            let keyword = self.scanner.ident()?;
            if keyword != "service" {
                if let Some((server_at, _)) = &self.pending_server {
                    return Err(self.scanner.error_at(*server_at, "@server must be followed by a service block"));
                }
            }
            match keyword {
                "syntax" => self.syntax(at)?,
                "info" => self.info(at)?,
                "import" => self.imports()?,
                "type" => self.types(comment_lines(comments))?,
                "service" => self.service()?,
                other => {
                    return Err(self.scanner.error_at(
                        at,
                        format!("unexpected {other:?}, expected syntax, info, import, type, @server or service"),
                    ));
                }
            }
        }

        if let Some((at, _)) = self.pending_server {
            return Err(self.scanner.error_at(at, "@server must be followed by a service block"));
        }
        Ok(self.document)
    }

    // ————————————————————————————————————————————————————————————————————————————
    // HEADER
    // ————————————————————————————————————————————————————————————————————————————

    fn syntax(&mut self, at: Position) -> Result<()> {
        if self.seen_syntax {
            return Err(self.scanner.error_at(at, "duplicate syntax declaration"));
        }
        self.seen_syntax = true;
        self.scanner.skip_inline_space();
        self.scanner.expect('=')?;
        self.scanner.skip_inline_space();
        self.document.syntax = self.scanner.string()?;
        Ok(())
    }

    fn info(&mut self, at: Position) -> Result<()> {
        if self.seen_info {
            return Err(self.scanner.error_at(at, "duplicate info block"));
        }
        self.seen_info = true;
        let properties = self.properties()?;
        let lookup = |key: &str| properties.get(key).cloned().unwrap_or_default();
        self.document.info = InfoBlock {
            title: lookup("title"),
            desc: lookup("desc"),
            author: lookup("author"),
            version: lookup("version"),
            email: lookup("email"),
            properties,
        };
        Ok(())
    }

    fn imports(&mut self) -> Result<()> {
        self.scanner.skip_inline_space();
        if !self.scanner.eat('(') {
            let value = self.scanner.string()?;
            self.document.imports.push(ImportDecl { value });
            return Ok(());
        }
        loop {
            self.scanner.skip_trivia()?;
            if self.scanner.eat(')') {
                return Ok(());
            }
            if self.scanner.is_eof() {
                return Err(self.scanner.error("unclosed import group"));
            }
            let value = self.scanner.string()?;
            self.document.imports.push(ImportDecl { value });
        }
    }

    /// `( key: value ... )`. Entries are usually one per line but may share one.
    fn properties(&mut self) -> Result<Properties> {
        self.scanner.skip_inline_space();
        self.scanner.expect('(')?;
        self.property_entries()
    }

    /// Entries of a property block whose `(` was already consumed.
    fn property_entries(&mut self) -> Result<Properties> {
        let mut properties = Properties::new();
        loop {
            self.scanner.skip_trivia()?;
            if self.scanner.eat(')') {
                return Ok(properties);
            }
            if self.scanner.is_eof() {
                return Err(self.scanner.error("unclosed property block"));
            }
            let key = self.scanner.dashed_ident()?.to_string();
            self.scanner.skip_inline_space();
            self.scanner.expect(':')?;
            self.scanner.skip_inline_space();
            let value = if self.scanner.peek() == Some('"') {
                let value = self.scanner.string()?;
                self.scanner.trailing_comment()?;
                self.scanner.skip_inline_space();
                let next_is_key = self.scanner.peek().is_some_and(is_ident_start);
                if !next_is_key && !matches!(self.scanner.peek(), None | Some('\n') | Some(')')) {
                    return Err(self
                        .scanner
                        .error(format!("unexpected {} after value of {key:?}", self.scanner.describe_next())));
                }
                value
            } else {
                self.scanner.bare_value()
            };
            properties.insert(key, value);
        }
    }

    // ————————————————————————————————————————————————————————————————————————————
    // TYPES
    // ————————————————————————————————————————————————————————————————————————————

    fn types(&mut self, docs: Vec<String>) -> Result<()> {
        self.scanner.skip_inline_space();
        if !self.scanner.eat('(') {
            let decl = self.type_spec(docs)?;
            self.document.types.push(decl);
            return Ok(());
        }
        loop {
            let docs = comment_lines(self.scanner.skip_trivia()?);
            if self.scanner.eat(')') {
                return Ok(());
            }
            if self.scanner.is_eof() {
                return Err(self.scanner.error("unclosed type group"));
            }
            let decl = self.type_spec(docs)?;
            self.document.types.push(decl);
        }
    }

    fn type_spec(&mut self, docs: Vec<String>) -> Result<TypeDecl> {
        let name = self.scanner.ident()?.to_string();
        self.scanner.skip_inline_space();

        if self.scanner.eat('=') {
            self.scanner.skip_inline_space();
            let target = self.type_expr()?;
            return Ok(TypeDecl::Alias(DefineAlias { name, target, docs }));
        }
        if self.scanner.at_keyword("struct") {
            self.scanner.eat_str("struct");
            self.scanner.skip_inline_space();
        }
        if self.scanner.eat('{') {
            let members = self.members()?;
            return Ok(TypeDecl::Struct(DefineStruct {
                raw_name: name.clone(),
                name,
                members,
                docs,
            }));
        }
        let target = self.type_expr()?;
        Ok(TypeDecl::Alias(DefineAlias { name, target, docs }))
    }

    /// Members of a struct body whose `{` was already consumed.
    fn members(&mut self) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        loop {
            let docs = comment_lines(self.scanner.skip_trivia()?);
            if self.scanner.eat('}') {
                return Ok(members);
            }
            if self.scanner.is_eof() {
                return Err(self.scanner.error("unclosed struct body"));
            }
            members.push(self.member(docs)?);
        }
    }

    fn member(&mut self, docs: Vec<String>) -> Result<Member> {
        let (name, ty, is_inline) = if self.scanner.peek() == Some('*') {
            (String::new(), self.type_expr()?, true)
        } else {
            let first = self.qualified_ident()?;
            self.scanner.skip_inline_space();
            if first.contains('.') || self.at_member_end() {
                (String::new(), TypeExpr::Named(first), true)
            } else {
                (first, self.type_expr()?, false)
            }
        };

        self.scanner.skip_inline_space();
        let tag = if self.scanner.peek() == Some('`') {
            self.scanner.raw_tag()?.to_string()
        } else {
            String::new()
        };
        let comment = self.scanner.trailing_comment()?.map(|c| c.text).unwrap_or_default();
        self.scanner.skip_inline_space();
        if !matches!(self.scanner.peek(), None | Some('\n') | Some('}')) {
            return Err(self
                .scanner
                .error(format!("unexpected {} after struct member", self.scanner.describe_next())));
        }

        Ok(Member { name, ty, tag, comment, docs, is_inline })
    }

    fn at_member_end(&self) -> bool {
        matches!(self.scanner.peek(), None | Some('\n') | Some('}') | Some('`'))
            || self.scanner.starts_with("//")
            || self.scanner.starts_with("/*")
    }

    /// `name` or `pkg.Name`.
    fn qualified_ident(&mut self) -> Result<String> {
        let mut name = self.scanner.ident()?.to_string();
        if self.scanner.peek() == Some('.') && self.scanner.peek_second().is_some_and(is_ident_start) {
            self.scanner.bump();
            name.push('.');
            name.push_str(self.scanner.ident()?);
        }
        Ok(name)
    }

    fn type_expr(&mut self) -> Result<TypeExpr> {
        match self.scanner.peek() {
            Some('*') => {
                self.scanner.bump();
                Ok(TypeExpr::Pointer(Box::new(self.type_expr()?)))
            }
            Some('[') => {
                self.scanner.bump();
                if self.scanner.eat(']') {
                    return Ok(TypeExpr::Array(Box::new(self.type_expr()?)));
                }
                let len = self.scanner.digits().to_string();
                if len.is_empty() {
                    return Err(self
                        .scanner
                        .error(format!("expected array length, found {}", self.scanner.describe_next())));
                }
                self.scanner.expect(']')?;
                Ok(TypeExpr::FixedArray { len, elem: Box::new(self.type_expr()?) })
            }
            Some(c) if is_ident_start(c) => {
                let name = self.qualified_ident()?;
                match name.as_str() {
                    "map" if self.scanner.peek() == Some('[') => {
                        self.scanner.bump();
                        let key = self.type_expr()?;
                        self.scanner.expect(']')?;
                        let value = self.type_expr()?;
                        Ok(TypeExpr::Map { key: Box::new(key), value: Box::new(value) })
                    }
                    "struct" if self.next_non_space_is('{') => Err(self.nested_struct_error()),
                    "interface" => {
                        self.scanner.skip_inline_space();
                        self.scanner.expect('{')?;
                        self.scanner.skip_inline_space();
                        self.scanner.expect('}')?;
                        Ok(TypeExpr::Interface)
                    }
                    _ => Ok(TypeExpr::Named(name)),
                }
            }
            Some('{') => Err(self.nested_struct_error()),
            _ => Err(self
                .scanner
                .error(format!("expected type, found {}", self.scanner.describe_next()))),
        }
    }

    fn next_non_space_is(&mut self, c: char) -> bool {
        self.scanner.skip_inline_space();
        self.scanner.peek() == Some(c)
    }

    fn nested_struct_error(&self) -> Error {
        self.scanner
            .error("nested struct not supported, declare it as a named type and reference it")
    }

    // ————————————————————————————————————————————————————————————————————————————
    // SERVICE
    // ————————————————————————————————————————————————————————————————————————————

    fn service(&mut self) -> Result<()> {
        let annotation = Annotation {
            properties: self.pending_server.take().map(|(_, properties)| properties),
        };
        self.scanner.skip_inline_space();
        let at = self.scanner.position();
        let name = self.scanner.dashed_ident()?.to_string();
        let current = &self.document.service.name;
        if !current.is_empty() && *current != name {
            return Err(self
                .scanner
                .error_at(at, format!("multiple service names defined: {current:?} and {name:?}")));
        }
        self.document.service.name = name;

        self.scanner.skip_trivia()?;
        self.scanner.expect('{')?;
        let routes = self.routes()?;
        self.document.service.groups.push(Group { annotation, routes });
        Ok(())
    }

    /// Routes of a service body whose `{` was already consumed.
    fn routes(&mut self) -> Result<Vec<Route>> {
        let mut routes = Vec::new();
        let mut pending = PendingRoute::default();
        loop {
            let comments = self.scanner.skip_trivia()?;
            pending.docs.extend(comment_lines(comments));
            let at = self.scanner.position();

            if self.scanner.eat('}') {
                if let Some(annotated_at) = pending.annotated_at.filter(|_| pending.has_annotations()) {
                    return Err(self.scanner.error_at(annotated_at, "annotation is not followed by a route"));
                }
                return Ok(routes);
            }
            if self.scanner.is_eof() {
                return Err(self.scanner.error("unclosed service block"));
            }

            if self.scanner.eat('@') {
                let name = self.scanner.ident()?;
                match name {
                    "doc" => {
                        if pending.at_doc.is_some() {
                            return Err(self.scanner.error_at(at, "duplicate @doc for one route"));
                        }
                        pending.at_doc = Some(self.at_doc()?);
                    }
                    "server" => {
                        if pending.server.is_some() {
                            return Err(self.scanner.error_at(at, "duplicate @server for one route"));
                        }
                        pending.server = Some(self.properties()?);
                    }
                    "handler" => {
                        if pending.handler.is_some() {
                            return Err(self.scanner.error_at(at, "duplicate @handler for one route"));
                        }
                        self.scanner.skip_inline_space();
                        pending.handler = Some(self.scanner.ident()?.to_string());
                    }
                    other => {
                        return Err(self.scanner.error_at(at, format!("unknown route annotation @{other}")));
                    }
                }
                pending.annotated_at.get_or_insert(at);
                continue;
            }

            let route = self.route(std::mem::take(&mut pending), at)?;
            routes.push(route);
        }
    }

    fn at_doc(&mut self) -> Result<AtDoc> {
        self.scanner.skip_inline_space();
        match self.scanner.peek() {
            Some('"') => Ok(AtDoc { properties: None, text: self.scanner.string()? }),
            Some('(') => {
                self.scanner.bump();
                self.scanner.skip_trivia()?;
                if self.scanner.peek() == Some('"') {
                    let text = self.scanner.string()?;
                    self.scanner.skip_trivia()?;
                    self.scanner.expect(')')?;
                    return Ok(AtDoc { properties: None, text });
                }
                Ok(AtDoc { properties: Some(self.property_entries()?), text: String::new() })
            }
            _ => Err(self.scanner.error(format!(
                "expected @doc text or (key: value) block, found {}",
                self.scanner.describe_next()
            ))),
        }
    }

    /// `method /path [(Request)] [returns (Response)]`
    fn route(&mut self, pending: PendingRoute, at: Position) -> Result<Route> {
        let method = self.scanner.ident()?.to_ascii_lowercase();
        self.scanner.skip_inline_space();
        let path = self.scanner.path().to_string();
        if !path.starts_with('/') {
            return Err(self.scanner.error_at(at, format!("route path must start with '/', found {path:?}")));
        }

        self.scanner.skip_inline_space();
        let request_type = if self.scanner.eat('(') { Some(self.body_type()?) } else { None };
        self.scanner.skip_inline_space();
        let response_type = if self.scanner.at_keyword("returns") {
            self.scanner.eat_str("returns");
            self.scanner.skip_inline_space();
            self.scanner.expect('(')?;
            Some(self.body_type()?)
        } else {
            None
        };

        self.scanner.trailing_comment()?;
        self.scanner.skip_inline_space();
        if !matches!(self.scanner.peek(), None | Some('\n') | Some('}')) {
            return Err(self
                .scanner
                .error(format!("unexpected {} after route", self.scanner.describe_next())));
        }

        let at_server_annotation = Annotation { properties: pending.server };
        let handler = match pending.handler {
            Some(handler) => handler,
            None => at_server_annotation
                .get("handler")
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .ok_or_else(|| self.scanner.error_at(at, format!("route {method} {path} has no @handler")))?,
        };

        Ok(Route {
            handler,
            method,
            path,
            request_type,
            response_type,
            at_doc: pending.at_doc.unwrap_or_default(),
            docs: pending.docs,
            at_server_annotation,
        })
    }

    /// A parenthesized request/response type whose `(` was already consumed.
    fn body_type(&mut self) -> Result<TypeExpr> {
        self.scanner.skip_inline_space();
        let ty = self.type_expr()?;
        self.scanner.skip_inline_space();
        self.scanner.expect(')')?;
        Ok(ty)
    }
}
