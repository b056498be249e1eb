//! Syntax tree for the pyrite type checker.
//!
//! The parser produces (and tests construct) an [`AstArena`]: a flat vector
//! of [`Node`]s addressed by [`NodeIndex`]. The arena is immutable after
//! construction; analysis passes attach results via side-tables keyed by
//! `NodeIndex`.

pub mod builder;
pub mod node;
pub mod ops;

pub use builder::AstBuilder;
pub use node::{AstArena, Node, NodeIndex, NodeKind};
pub use ops::{
    BinaryOperator, BoolOperator, CompareOperator, ComprehensionKind, ConstantValue,
    ParameterCategory, StringError, StringErrorKind, UnaryOperator,
};
