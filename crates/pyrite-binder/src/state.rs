//! Binder state and entry point.
//!
//! One [`Binder`] instance processes one source file, single-threaded.
//! The scope stack, current-flow pointer, non-local binding maps,
//! reference maps, except-target stack and finally-target stack are all
//! per-binder mutable state; deferred tasks run on the same thread in the
//! order enqueued and snapshot/restore the ambient fields they need.

use crate::declaration::{
    DeclId, Declaration, DeclarationArena, IntrinsicDeclaration, IntrinsicType,
};
use crate::flow::{FlowArena, FlowNodeId, FlowNodeKind};
use crate::scope::{ScopeArena, ScopeId, ScopeKind};
use crate::symbol::{Symbol, SymbolArena, SymbolId, symbol_flags};
use pyrite_common::{Diagnostic, DiagnosticRules, DiagnosticSink, LanguageVersion, LineIndex};
use pyrite_ast::{AstArena, NodeIndex, NodeKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

/// Language-level settings the analyzed file executes under.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionEnvironment {
    pub language_version: LanguageVersion,
}

/// Snapshot of the builtins module's symbol table, installed as the parent
/// scope of the module being bound. Absent only when binding the builtins
/// module itself.
#[derive(Clone, Debug, Default)]
pub struct BuiltinsScope {
    /// `(name, symbol_flags)` pairs.
    pub symbols: Vec<(String, u32)>,
}

impl BuiltinsScope {
    #[must_use]
    pub fn from_names<'n>(names: impl IntoIterator<Item = &'n str>) -> Self {
        Self {
            symbols: names
                .into_iter()
                .map(|n| (n.to_string(), symbol_flags::NONE))
                .collect(),
        }
    }
}

/// Category assigned to an import by the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportType {
    BuiltIn,
    ThirdParty,
    Local,
}

/// A sibling module made visible by importing a package.
#[derive(Clone, Debug)]
pub struct ImplicitImport {
    pub name: String,
    pub path: String,
}

/// Resolution record the import resolver attaches to each module-name
/// node. The binder reads it; it never resolves paths itself.
#[derive(Clone, Debug)]
pub struct ImportInfo {
    pub is_import_found: bool,
    pub is_stub_file: bool,
    pub import_type: ImportType,
    pub is_py_typed_present: bool,
    /// A non-stub resolution exists alongside the stub.
    pub is_non_stub_import_resolved: bool,
    /// Resolved file path at each dotted depth, in order.
    pub resolved_paths: Vec<String>,
    pub implicit_imports: Vec<ImplicitImport>,
}

impl ImportInfo {
    /// Unresolved-import placeholder.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            is_import_found: false,
            is_stub_file: false,
            import_type: ImportType::Local,
            is_py_typed_present: false,
            is_non_stub_import_resolved: false,
            resolved_paths: Vec::new(),
            implicit_imports: Vec::new(),
        }
    }

    /// Resolved file path of the full dotted name, if any.
    #[must_use]
    pub fn resolved_path(&self) -> &str {
        self.resolved_paths.last().map_or("", String::as_str)
    }
}

/// A symbol exported by another module, as seen through [`ImportLookup`].
#[derive(Clone, Debug)]
pub struct ExportedSymbol {
    pub name: String,
    pub ignored_for_protocol_match: bool,
}

/// Symbol table plus metadata for an already-analyzed module.
#[derive(Clone, Debug, Default)]
pub struct ModuleSymbolTable {
    /// Explicit export list (`__all__`), when the module advertises one.
    pub dunder_all: Option<Vec<String>>,
    pub symbols: Vec<ExportedSymbol>,
}

/// Capability for reading another module's symbol table. Wildcard imports
/// need it; everything else in the binder works without it.
pub trait ImportLookup {
    fn lookup(&self, path: &str) -> Option<ModuleSymbolTable>;
}

/// An [`ImportLookup`] that knows no modules.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImports;

impl ImportLookup for NoImports {
    fn lookup(&self, _path: &str) -> Option<ModuleSymbolTable> {
        None
    }
}

/// Shared empty lookup for files bound without import information.
pub static NO_IMPORTS: NoImports = NoImports;

/// Everything the binder needs to know about the file being bound.
pub struct FileInfo<'a> {
    pub file_path: String,
    /// Dotted module name of this file.
    pub module_name: String,
    pub line_index: LineIndex,
    pub execution_environment: ExecutionEnvironment,
    pub is_stub_file: bool,
    /// This file is the typing stub itself; special built-in class forms
    /// are recognized here.
    pub is_typing_stub_file: bool,
    /// Parent builtins scope; `None` at the builtins file itself.
    pub builtins: Option<BuiltinsScope>,
    pub diagnostic_rules: DiagnosticRules,
    pub import_lookup: &'a dyn ImportLookup,
    /// Per-module-name-node resolution records, produced by a pre-pass.
    pub import_info: FxHashMap<NodeIndex, ImportInfo>,
}

impl<'a> FileInfo<'a> {
    #[must_use]
    pub fn new(file_path: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            module_name: module_name.into(),
            line_index: LineIndex::default(),
            execution_environment: ExecutionEnvironment::default(),
            is_stub_file: false,
            is_typing_stub_file: false,
            builtins: None,
            diagnostic_rules: DiagnosticRules::default(),
            import_lookup: &NO_IMPORTS,
            import_info: FxHashMap::default(),
        }
    }

    /// Whether this file is a package's `__init__` module.
    #[must_use]
    pub fn is_package_init(&self) -> bool {
        self.file_path.ends_with("__init__.py") || self.file_path.ends_with("__init__.pyi")
    }
}

/// How a `global`/`nonlocal` statement rebinds a name for a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameBindingType {
    Global,
    Nonlocal,
}

#[derive(Debug)]
pub(crate) enum DeferredTaskKind {
    FunctionBody {
        node: NodeIndex,
        decl: DeclId,
        is_async: bool,
        enclosing_class: Option<ScopeId>,
        is_classmethod: bool,
    },
    LambdaBody {
        node: NodeIndex,
    },
}

/// A postponed function/lambda body walk. Captures the scope to reopen;
/// the per-scope binding and reference maps are keyed by scope id, so
/// restoring the scope restores them too.
#[derive(Debug)]
pub(crate) struct DeferredBindingTask {
    pub(crate) scope: ScopeId,
    pub(crate) kind: DeferredTaskKind,
}

/// Output of binding one file.
#[derive(Debug)]
pub struct BindResult {
    pub scopes: ScopeArena,
    pub module_scope: ScopeId,
    pub symbols: SymbolArena,
    pub declarations: DeclarationArena,
    pub flow: FlowArena,
    /// Flow node active at each expression/statement.
    pub node_flow: FxHashMap<NodeIndex, FlowNodeId>,
    /// Flow node after suite-like and function/module nodes.
    pub after_flow: FxHashMap<NodeIndex, FlowNodeId>,
    /// Scope introduced by each scope-introducing node.
    pub node_scopes: FxHashMap<NodeIndex, ScopeId>,
    /// Declaration attached to class/function/parameter nodes.
    pub node_declarations: FxHashMap<NodeIndex, DeclId>,
    /// Narrowable reference keys per execution scope.
    pub code_flow_expressions: FxHashMap<ScopeId, FxHashSet<String>>,
    /// Leading string expression of the module body.
    pub docstring: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BindResult {
    /// Symbol bound in the module scope under `name`.
    #[must_use]
    pub fn module_symbol(&self, name: &str) -> Option<&Symbol> {
        let id = self.scopes.look_up(self.module_scope, name)?;
        self.symbols.get(id)
    }

    #[must_use]
    pub fn module_symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.scopes.look_up(self.module_scope, name)
    }

    /// Declarations of a symbol, in source order.
    #[must_use]
    pub fn declarations_of(&self, symbol: SymbolId) -> Vec<&Declaration> {
        self.symbols
            .get(symbol)
            .map(|s| {
                s.declarations
                    .iter()
                    .filter_map(|&d| self.declarations.get(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reference keys recorded for the scope containing `scope_node`.
    #[must_use]
    pub fn reference_keys(&self, scope: ScopeId) -> Option<&FxHashSet<String>> {
        self.code_flow_expressions.get(&scope)
    }
}

/// Intrinsic names installed in every module scope, with their fixed
/// semantic types.
pub(crate) const MODULE_INTRINSICS: &[(&str, IntrinsicType)] = &[
    ("__doc__", IntrinsicType::Str),
    ("__name__", IntrinsicType::Str),
    ("__loader__", IntrinsicType::Any),
    ("__package__", IntrinsicType::Str),
    ("__spec__", IntrinsicType::Any),
    ("__path__", IntrinsicType::IterableStr),
    ("__file__", IntrinsicType::Str),
    ("__cached__", IntrinsicType::Str),
    ("__dict__", IntrinsicType::DictStrAny),
];

/// Binds one file: builds scopes, symbols, declarations and the control
/// flow graph in a single AST walk, deferring function bodies.
pub struct Binder<'a> {
    pub(crate) file_info: FileInfo<'a>,

    pub(crate) flow: FlowArena,
    pub(crate) symbols: SymbolArena,
    pub(crate) scopes: ScopeArena,
    pub(crate) declarations: DeclarationArena,
    pub(crate) diagnostics: DiagnosticSink,

    pub(crate) current_scope: ScopeId,
    pub(crate) current_flow: FlowNodeId,

    pub(crate) node_flow: FxHashMap<NodeIndex, FlowNodeId>,
    pub(crate) after_flow: FxHashMap<NodeIndex, FlowNodeId>,
    pub(crate) node_scopes: FxHashMap<NodeIndex, ScopeId>,
    pub(crate) node_declarations: FxHashMap<NodeIndex, DeclId>,

    /// Narrowable reference keys per execution scope.
    pub(crate) code_flow_expressions: FxHashMap<ScopeId, FxHashSet<String>>,
    pub(crate) current_codeflow_scope: ScopeId,

    /// `global`/`nonlocal` rebindings recorded per scope.
    pub(crate) nonlocal_bindings: FxHashMap<ScopeId, FxHashMap<String, NameBindingType>>,

    pub(crate) break_targets: Vec<FlowNodeId>,
    pub(crate) continue_targets: Vec<FlowNodeId>,
    pub(crate) return_targets: Vec<FlowNodeId>,
    pub(crate) finally_targets: Vec<FlowNodeId>,
    /// One entry per enclosing try block: the labels of its except clauses.
    pub(crate) current_except_targets: Vec<Vec<FlowNodeId>>,
    pub(crate) nested_except_depth: u32,

    pub(crate) current_true_target: Option<FlowNodeId>,
    pub(crate) current_false_target: Option<FlowNodeId>,

    /// Declaration of the function whose body is being walked, if any.
    pub(crate) current_function: Option<DeclId>,
    pub(crate) current_function_is_async: bool,
    pub(crate) lambda_depth: u32,
    /// Class scope enclosing the method body being walked.
    pub(crate) enclosing_class_scope: Option<ScopeId>,
    pub(crate) current_first_param: Option<String>,
    pub(crate) current_is_classmethod: bool,

    pub(crate) deferred: VecDeque<DeferredBindingTask>,
    pub(crate) docstring: Option<String>,
}

impl<'a> Binder<'a> {
    #[must_use]
    pub fn new(file_info: FileInfo<'a>) -> Self {
        let diagnostics = DiagnosticSink::new(file_info.diagnostic_rules.clone());
        Self {
            file_info,
            flow: FlowArena::new(),
            symbols: SymbolArena::new(),
            scopes: ScopeArena::new(),
            declarations: DeclarationArena::new(),
            diagnostics,
            current_scope: ScopeId(0),
            current_flow: FlowNodeId::UNREACHABLE,
            node_flow: FxHashMap::default(),
            after_flow: FxHashMap::default(),
            node_scopes: FxHashMap::default(),
            node_declarations: FxHashMap::default(),
            code_flow_expressions: FxHashMap::default(),
            current_codeflow_scope: ScopeId(0),
            nonlocal_bindings: FxHashMap::default(),
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            return_targets: Vec::new(),
            finally_targets: Vec::new(),
            current_except_targets: Vec::new(),
            nested_except_depth: 0,
            current_true_target: None,
            current_false_target: None,
            current_function: None,
            current_function_is_async: false,
            lambda_depth: 0,
            enclosing_class_scope: None,
            current_first_param: None,
            current_is_classmethod: false,
            deferred: VecDeque::new(),
            docstring: None,
        }
    }

    /// Bind a module node, consuming the binder.
    pub fn bind_module(mut self, arena: &AstArena, module: NodeIndex) -> BindResult {
        let body = match arena.kind(module) {
            Some(NodeKind::Module(data)) => data.body.clone(),
            _ => {
                debug_assert!(false, "bind_module requires a Module node");
                Vec::new()
            }
        };

        let module_scope = match self.file_info.builtins.take() {
            Some(builtins) => {
                let builtin_scope = self
                    .scopes
                    .alloc(ScopeKind::Builtin, None, NodeIndex::NONE);
                for (name, flags) in &builtins.symbols {
                    self.scopes
                        .add_symbol(&mut self.symbols, builtin_scope, name, *flags);
                }
                self.scopes
                    .alloc(ScopeKind::Module, Some(builtin_scope), module)
            }
            None => self.scopes.alloc(ScopeKind::Builtin, None, module),
        };
        self.current_scope = module_scope;
        self.current_codeflow_scope = module_scope;
        self.node_scopes.insert(module, module_scope);
        self.code_flow_expressions.entry(module_scope).or_default();

        self.add_module_intrinsics(module, module_scope);
        self.docstring = arena.leading_string(&body);

        debug!(module = %self.file_info.module_name, "binding module");
        let start = self.flow.alloc(FlowNodeKind::Start);
        self.current_flow = start;
        self.bind_statement_list(arena, &body);
        self.after_flow.insert(module, self.current_flow);

        self.drain_deferred(arena);

        BindResult {
            scopes: self.scopes,
            module_scope,
            symbols: self.symbols,
            declarations: self.declarations,
            flow: self.flow,
            node_flow: self.node_flow,
            after_flow: self.after_flow,
            node_scopes: self.node_scopes,
            node_declarations: self.node_declarations,
            code_flow_expressions: self.code_flow_expressions,
            docstring: self.docstring,
            diagnostics: self.diagnostics.take(),
        }
    }

    fn add_module_intrinsics(&mut self, module: NodeIndex, scope: ScopeId) {
        for &(name, intrinsic) in MODULE_INTRINSICS {
            let symbol =
                self.scopes
                    .add_symbol(&mut self.symbols, scope, name, symbol_flags::NONE);
            let decl = self
                .declarations
                .alloc(Declaration::Intrinsic(IntrinsicDeclaration {
                    node: module,
                    intrinsic,
                }));
            if let Some(sym) = self.symbols.get_mut(symbol) {
                sym.add_declaration(decl);
            }
        }
    }

    /// Drain the deferred-binding queue, outermost-first. Tasks enqueued
    /// while a task runs (nested functions) land at the back.
    fn drain_deferred(&mut self, arena: &AstArena) {
        while let Some(task) = self.deferred.pop_front() {
            self.run_deferred_task(arena, task);
        }
    }

    fn run_deferred_task(&mut self, arena: &AstArena, task: DeferredBindingTask) {
        // Restore the ambient state captured at enqueue time. The binding
        // and reference maps are keyed by scope id, so reopening the scope
        // reopens them.
        self.current_scope = task.scope;
        self.current_codeflow_scope = self.scopes.execution_scope(task.scope);
        self.nested_except_depth = 0;
        self.current_true_target = None;
        self.current_false_target = None;
        debug_assert!(self.break_targets.is_empty());
        debug_assert!(self.current_except_targets.is_empty());

        match task.kind {
            DeferredTaskKind::FunctionBody {
                node,
                decl,
                is_async,
                enclosing_class,
                is_classmethod,
            } => self.bind_function_body(arena, node, decl, is_async, enclosing_class, is_classmethod),
            DeferredTaskKind::LambdaBody { node } => self.bind_lambda_body(arena, node),
        }

        self.current_function = None;
        self.current_function_is_async = false;
        self.enclosing_class_scope = None;
        self.current_first_param = None;
        self.current_is_classmethod = false;
    }

    // ===== Small shared helpers =====

    /// A name is private by convention when it has a leading underscore
    /// and is not a dunder.
    pub(crate) fn is_private_name(name: &str) -> bool {
        name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
    }

    /// Record a narrowable reference key in the current execution scope.
    pub(crate) fn record_reference_key(&mut self, key: String) {
        self.code_flow_expressions
            .entry(self.current_codeflow_scope)
            .or_default()
            .insert(key);
    }

    pub(crate) fn nonlocal_binding_for(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Option<NameBindingType> {
        self.nonlocal_bindings
            .get(&scope)?
            .get(name)
            .copied()
    }

    /// Bind a name into `scope`, honoring any `global`/`nonlocal`
    /// rebindings recorded for that scope. Creates the symbol on first
    /// binding; later bindings return the existing symbol.
    pub(crate) fn bind_name_to_scope(&mut self, scope: ScopeId, name: &str) -> SymbolId {
        match self.nonlocal_binding_for(scope, name) {
            Some(NameBindingType::Global) => {
                let global = self.scopes.global_scope(scope);
                self.bind_name_to_scope_raw(global, name)
            }
            Some(NameBindingType::Nonlocal) => {
                if let Some(found) = self.look_up_outer_function_binding(scope, name) {
                    found
                } else {
                    // Already diagnosed by the nonlocal statement; keep a
                    // local binding so the walk can continue.
                    self.bind_name_to_scope_raw(scope, name)
                }
            }
            None => self.bind_name_to_scope_raw(scope, name),
        }
    }

    fn bind_name_to_scope_raw(&mut self, scope: ScopeId, name: &str) -> SymbolId {
        if let Some(existing) = self.scopes.look_up(scope, name) {
            return existing;
        }
        let mut flags = symbol_flags::INITIALLY_UNBOUND;
        if Self::is_private_name(name) {
            flags |= symbol_flags::PRIVATE_MEMBER;
            if self.file_info.is_stub_file {
                flags |= symbol_flags::EXTERNALLY_HIDDEN;
            }
        }
        self.scopes
            .add_symbol(&mut self.symbols, scope, name, flags)
    }

    /// Resolve a `nonlocal` name against enclosing function scopes only:
    /// class scopes are skipped and the search stops before the global
    /// scope.
    pub(crate) fn look_up_outer_function_binding(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Option<SymbolId> {
        let mut current = self.scopes.get(scope)?.parent;
        while let Some(id) = current {
            let s = self.scopes.get(id)?;
            match s.kind {
                ScopeKind::Module | ScopeKind::Builtin => return None,
                ScopeKind::Class => {}
                ScopeKind::Function | ScopeKind::ListComprehension => {
                    if let Some(symbol) = s.table.get(name) {
                        return Some(symbol);
                    }
                }
            }
            current = s.parent;
        }
        None
    }
}
