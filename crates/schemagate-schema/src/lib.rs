//! Schema identifier validation
//!
//! This crate handles:
//! - The reserved-word registry and the single-identifier rule
//! - Parsing schema-definition sources into a small syntax tree
//! - Extracting enum, table and column declaration sites
//! - Validating every declared name across schema files
//! - Checking the schema module directory layout

pub mod reserved;
pub mod rule;
pub mod syntax;
pub mod walker;
pub mod validator;
pub mod layout;

pub use reserved::ReservedWordRegistry;
pub use rule::{check_identifier, IdentifierViolation};
pub use syntax::{Node, SourceTree, Span, SyntaxError};
pub use walker::{Constructors, DeclarationSite, SchemaDeclarationWalker, SiteKind};
pub use validator::{
    check_site, discover_schema_files, FailureReason, IdentifierValidator, ValidateError,
    ValidationFailure, ValidationSummary,
};
pub use layout::{check_layout, LayoutError, SchemaModule};
