//! Python source parsing
//!
//! Splits a Python module into top-level items with tree-sitter. Function
//! definitions (plain, `async` or decorated) become [`Declaration`]s, every
//! other top-level node is kept verbatim. The whitespace between nodes is
//! captured so that serialization reproduces the original text exactly.

use tree_sitter::{Node, Parser};

use crate::declaration::{Declaration, Item, Verbatim};

/// Parse error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    #[error("parse failed")]
    ParseFailed,

    #[error("syntax error at {line}:{column}: {message}")]
    SyntaxError {
        line: usize,
        column: usize,
        message: String,
    },
}

/// One top-level item together with the whitespace that preceded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) leading: String,
    pub(crate) item: Item,
}

/// Parsed module: entries in source order plus trailing text
pub(crate) struct ParsedModule {
    pub(crate) entries: Vec<Entry>,
    pub(crate) trailer: String,
}

/// Parse a whole module into entries
pub(crate) fn parse_module(source: &str) -> Result<ParsedModule, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::ParserInit(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
    let root = tree.root_node();

    if root.has_error() {
        return Err(syntax_error(root, source));
    }
    if let Some(node) = python2_statement(root) {
        let position = node.start_position();
        return Err(ParseError::SyntaxError {
            line: position.row + 1,
            column: position.column + 1,
            message: format!("`{}` is Python 2 syntax", node.kind().replace('_', " ")),
        });
    }

    let mut entries = Vec::new();
    let mut cursor = root.walk();
    let mut offset = 0;

    for node in root.named_children(&mut cursor) {
        let leading = source[offset..node.start_byte()].to_string();
        let item = match declaration_from_node(node, source) {
            Some(declaration) => Item::Declaration(declaration),
            None => Item::Verbatim(Verbatim::new(node.kind(), &source[node.byte_range()])),
        };
        entries.push(Entry { leading, item });
        offset = node.end_byte();
    }

    Ok(ParsedModule {
        entries,
        trailer: source[offset..].to_string(),
    })
}

/// Build a declaration from a top-level node, if it is a function
fn declaration_from_node(node: Node<'_>, source: &str) -> Option<Declaration> {
    let definition = match node.kind() {
        "function_definition" => node,
        "decorated_definition" => node.child_by_field_name("definition")?,
        _ => return None,
    };
    if definition.kind() != "function_definition" {
        return None;
    }

    let name = definition.child_by_field_name("name")?;
    let parameters = definition.child_by_field_name("parameters")?;
    let body = definition.child_by_field_name("body")?;

    Some(Declaration::new(
        &source[name.byte_range()],
        docstring(body, source),
        &source[parameters.byte_range()],
        &source[body.byte_range()],
        &source[node.byte_range()],
        Some(node.byte_range()),
    ))
}

/// Statement kinds the grammar accepts but Python 3 rejects
const PYTHON2_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

fn python2_statement(node: Node<'_>) -> Option<Node<'_>> {
    if PYTHON2_STATEMENTS.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(python2_statement)
}

/// Docstring of a function body: first statement, if it is a plain string
fn docstring(body: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    let text = &source[literal.byte_range()];
    let prefix = &text[..text.len() - text.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len()];
    if prefix.contains(['f', 'F']) {
        return None;
    }
    Some(clean_docstring(string_value(&source[literal.byte_range()])))
}

/// Strip prefix and quotes from a string literal
fn string_value(literal: &str) -> &str {
    let unprefixed = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''"] {
        if unprefixed.len() >= 6 && unprefixed.starts_with(quote) && unprefixed.ends_with(quote) {
            return &unprefixed[3..unprefixed.len() - 3];
        }
    }
    if unprefixed.len() >= 2 {
        &unprefixed[1..unprefixed.len() - 1]
    } else {
        unprefixed
    }
}

/// Trim the first line, dedent the rest, drop surrounding blank lines
fn clean_docstring(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();
    let indent = common_indent(rest.iter().copied());

    let mut cleaned: Vec<String> = std::iter::once(first)
        .chain(rest.iter().map(|line| strip_indent(line, indent).trim_end().to_string()))
        .collect();

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    let start = cleaned.iter().take_while(|l| l.is_empty()).count();
    cleaned[start..].join("\n")
}

/// Remove the indentation shared by every non-blank line
#[must_use]
pub fn dedent(text: &str) -> String {
    let indent = common_indent(text.lines());
    text.lines()
        .map(|line| strip_indent(line, indent))
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_indent<'a>(lines: impl Iterator<Item = &'a str>) -> usize {
    lines
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0)
}

fn strip_indent(line: &str, indent: usize) -> &str {
    if line.trim().is_empty() {
        ""
    } else {
        &line[indent.min(line.len())..]
    }
}

/// Locate the first error or missing node and describe it
fn syntax_error(root: Node<'_>, source: &str) -> ParseError {
    let node = first_error(root).unwrap_or(root);
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text: String = source[node.byte_range()].chars().take(40).collect();
        format!("unexpected `{}`", text.trim())
    };
    ParseError::SyntaxError {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}
