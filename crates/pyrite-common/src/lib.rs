//! Common types and utilities for the pyrite type checker.
//!
//! This crate provides:
//! - `Span` - byte-range source locations
//! - `LineIndex` - offset to line/column conversion
//! - Diagnostic types and the per-file diagnostic sink
//! - `LanguageVersion` - target language version for feature gating

pub mod diagnostics;
pub mod position;
pub mod span;
pub mod version;

pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticRule, DiagnosticRules, DiagnosticSink, Severity,
};
pub use position::{LineIndex, Position, Range};
pub use span::Span;
pub use version::LanguageVersion;
