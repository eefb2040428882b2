//! Declarations and top-level items

use std::ops::Range;

/// A named top-level function of the source unit
///
/// Signature and body are kept verbatim; `text` is the canonical source of
/// the whole definition (decorators included) and is what `show` returns and
/// what serialization writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    name: String,
    documentation: Option<String>,
    signature: String,
    body: String,
    text: String,
    span: Option<Range<usize>>,
}

impl Declaration {
    pub(crate) fn new(
        name: &str,
        documentation: Option<String>,
        signature: &str,
        body: &str,
        text: &str,
        span: Option<Range<usize>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            documentation,
            signature: signature.to_string(),
            body: body.to_string(),
            text: text.to_string(),
            span,
        }
    }

    /// Declared name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Docstring, if the body starts with one
    #[inline]
    #[must_use]
    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Parameter list, verbatim
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Body block, verbatim
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Canonical source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte range in the unit this declaration was parsed from
    #[inline]
    #[must_use]
    pub fn span(&self) -> Option<&Range<usize>> {
        self.span.as_ref()
    }

    /// Drop the span; used when a declaration moves into another unit
    #[inline]
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.span = None;
        self
    }
}

/// Non-declaration top-level content (imports, constants, classes, comments)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbatim {
    kind: String,
    text: String,
}

impl Verbatim {
    pub(crate) fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
        }
    }

    /// Grammar node kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this item is only a comment
    #[inline]
    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.kind == "comment"
    }
}

/// One top-level item of a source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Declaration(Declaration),
    Verbatim(Verbatim),
}

impl Item {
    /// Source text of the item
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Item::Declaration(d) => d.text(),
            Item::Verbatim(v) => v.text(),
        }
    }

    /// Declaration, if this item is one
    #[inline]
    #[must_use]
    pub fn as_declaration(&self) -> Option<&Declaration> {
        match self {
            Item::Declaration(d) => Some(d),
            Item::Verbatim(_) => None,
        }
    }
}
