//! Declaration-site extraction
//!
//! Walks a [`SourceTree`] and collects every enum, table and column
//! declaration made through the configured constructor calls.

use crate::syntax::{Call, Node, SourceTree, Span};
use std::path::{Path, PathBuf};

/// Which construct a declaration site names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
    /// Enum type name or one of its values
    Enum,
    /// Table name
    Table,
    /// Column of a table's column map
    Column,
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enum => write!(f, "enum"),
            Self::Table => write!(f, "table"),
            Self::Column => write!(f, "column"),
        }
    }
}

/// One identifier-bearing construct found in a schema source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSite {
    pub kind: SiteKind,
    pub source_file: PathBuf,

    /// The declared string literal. Columns whose value expression holds no
    /// string literal have none.
    pub literal_name: Option<String>,

    /// Object key of a column entry
    pub property_key: Option<String>,

    pub span: Span,
}

/// Constructor names recognised as declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructors {
    pub enum_constructor: String,
    pub table_constructor: String,
}

impl Default for Constructors {
    fn default() -> Self {
        Self {
            enum_constructor: "pgEnum".to_string(),
            table_constructor: "pgTable".to_string(),
        }
    }
}

impl From<&schemagate_core::SchemaConfig> for Constructors {
    fn from(config: &schemagate_core::SchemaConfig) -> Self {
        Self {
            enum_constructor: config.enum_constructor.clone(),
            table_constructor: config.table_constructor.clone(),
        }
    }
}

/// Extracts declaration sites from parsed schema sources
pub struct SchemaDeclarationWalker<'a> {
    constructors: &'a Constructors,
    source_file: &'a Path,
    sites: Vec<DeclarationSite>,
}

impl<'a> SchemaDeclarationWalker<'a> {
    /// Collect every declaration site in `tree`
    pub fn collect(
        tree: &SourceTree,
        source_file: &'a Path,
        constructors: &'a Constructors,
    ) -> Vec<DeclarationSite> {
        let mut walker = Self {
            constructors,
            source_file,
            sites: Vec::new(),
        };
        for node in &tree.nodes {
            walker.visit(node);
        }
        walker.sites
    }

    fn visit(&mut self, node: &Node) {
        match node {
            Node::Call(call) => {
                if call.callee == self.constructors.enum_constructor {
                    self.enum_declaration(call);
                } else if call.callee == self.constructors.table_constructor {
                    self.table_declaration(call);
                }
                if let Some(receiver) = &call.receiver {
                    self.visit(receiver);
                }
                call.args.iter().for_each(|arg| self.visit(arg));
            }
            Node::List { items, .. } => items.iter().for_each(|item| self.visit(item)),
            Node::Object { entries, rest, .. } => {
                entries.iter().for_each(|entry| self.visit(&entry.value));
                rest.iter().for_each(|node| self.visit(node));
            }
            Node::Other { children } => children.iter().for_each(|child| self.visit(child)),
            Node::Str(_) | Node::Ident { .. } => {}
        }
    }

    fn push_literals(&mut self, kind: SiteKind, arg: &Node) {
        match arg {
            Node::Str(lit) => self.sites.push(DeclarationSite {
                kind,
                source_file: self.source_file.to_path_buf(),
                literal_name: Some(lit.value.clone()),
                property_key: None,
                span: lit.span,
            }),
            Node::List { items, .. } => {
                for item in items {
                    if let Node::Str(_) = item {
                        self.push_literals(kind, item);
                    }
                }
            }
            _ => {}
        }
    }

    fn enum_declaration(&mut self, call: &Call) {
        for arg in &call.args {
            self.push_literals(SiteKind::Enum, arg);
        }
    }

    fn table_declaration(&mut self, call: &Call) {
        for arg in &call.args {
            match arg {
                Node::Object { entries, .. } => {
                    for entry in entries {
                        let literal = entry.value.first_string_literal();
                        self.sites.push(DeclarationSite {
                            kind: SiteKind::Column,
                            source_file: self.source_file.to_path_buf(),
                            literal_name: literal.map(|lit| lit.value.clone()),
                            property_key: Some(entry.key.clone()),
                            span: entry.key_span,
                        });
                    }
                }
                other => self.push_literals(SiteKind::Table, other),
            }
        }
    }
}
