//! Labelled syntax tree consumed by the engine.
//!
//! Every node carries a tag made of one or more labels joined by `|`
//! (`"ident|variable"`), the literal text of leaves, and the node's source
//! location. The engine only ever asks whether a tag *contains* a label, so
//! any producer honouring the labels below can feed it.

use std::fmt;

/// Tag label of a fact statement.
pub const FACT: &str = "fact";
/// Tag label of a query statement.
pub const QUERY: &str = "query";
/// Tag label of a predicate call.
pub const PREDICATE: &str = "predicate";
/// Tag label of an identifier leaf.
pub const IDENT: &str = "ident";
/// Tag label of a constant identifier.
pub const CONSTANT: &str = "constant";
/// Tag label of a variable identifier.
pub const VARIABLE: &str = "variable";

/// Position in the program text. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// Byte offset from the start of the text.
    pub offset: usize,
    /// Line number.
    pub line: usize,
    /// Column number, in characters.
    pub column: usize,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Locate a byte offset inside `source`.
    ///
    /// Offsets past the end, or inside a multi-byte character, are clamped to
    /// the nearest preceding character boundary.
    #[must_use]
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
        Self {
            offset,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Labels of this node, joined by `|`.
    pub tag: String,
    /// Literal text; empty for inner nodes.
    pub contents: String,
    /// Where the node starts.
    pub location: Location,
    /// Children in document order.
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// A leaf node with literal text.
    pub fn leaf(tag: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            contents: contents.into(),
            location: Location::default(),
            children: Vec::new(),
        }
    }

    /// An inner node.
    pub fn branch(tag: impl Into<String>, children: Vec<SyntaxNode>) -> Self {
        Self {
            tag: tag.into(),
            contents: String::new(),
            location: Location::default(),
            children,
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Whether any label of the tag contains `label`.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.tag.contains(label)
    }

    /// Concatenated text of every leaf below this node.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.contents);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.tag, indent = depth * 2)?;
        if !self.contents.is_empty() {
            write!(f, " '{}'", self.contents)?;
        }
        writeln!(f, " {}", self.location)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Prints one node per line, children indented under their parent.
impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
