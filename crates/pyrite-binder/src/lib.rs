//! Name binder and control-flow-graph builder for the pyrite type checker.
//!
//! This crate provides:
//! - `Binder` - one-file name resolution, symbol table and CFG construction
//! - `Symbol` / `Scope` / `Declaration` arenas - the semantic model the
//!   binder produces
//! - `FlowArena` - the sparse single-assignment-style flow graph later
//!   narrowing passes traverse
//! - The narrowing classifier deciding which expressions later type
//!   analysis may refine
//!
//! Binding a file:
//!
//! ```
//! use pyrite_ast::AstBuilder;
//! use pyrite_binder::{Binder, FileInfo};
//!
//! let mut b = AstBuilder::new();
//! let one = b.int(1);
//! let assign = b.assign_name("x", one);
//! let module = b.module(vec![assign]);
//! let arena = b.finish();
//!
//! let binder = Binder::new(FileInfo::new("example.py", "example"));
//! let result = binder.bind_module(&arena, module);
//! assert!(result.module_symbol("x").is_some());
//! ```

pub mod declaration;
pub mod flow;
pub mod narrowing;
pub mod scope;
mod state;
mod state_binding;
mod state_flow_helpers;
mod state_import_binding;
mod state_node_binding;
pub mod symbol;

pub use declaration::{
    AliasDeclaration, ClassDeclaration, DeclId, Declaration, DeclarationArena, FunctionDeclaration,
    IntrinsicDeclaration, IntrinsicType, ModuleLoaderActions, ParameterDeclaration,
    SpecialBuiltInClassDeclaration, VariableDeclaration,
};
pub use flow::{
    AssignmentTarget, ConditionKind, FlowArena, FlowNode, FlowNodeId, FlowNodeKind,
};
pub use narrowing::{is_narrowing_expression, reference_key, static_bool_value};
pub use scope::{Scope, ScopeArena, ScopeId, ScopeKind, ScopeLookup};
pub use state::{
    BindResult, Binder, BuiltinsScope, ExecutionEnvironment, ExportedSymbol, FileInfo,
    ImplicitImport, ImportInfo, ImportLookup, ImportType, ModuleSymbolTable, NameBindingType,
    NoImports,
};
pub use symbol::{Symbol, SymbolArena, SymbolId, SymbolTable, symbol_flags};
