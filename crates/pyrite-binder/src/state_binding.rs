//! Declaration binding.
//!
//! Creates symbols and declarations for the constructs that introduce
//! names: functions, lambdas, classes, parameters, assignment targets,
//! annotations, walrus targets, `global`/`nonlocal` statements and except
//! clause names. Function and lambda bodies are enqueued for deferred
//! binding rather than walked in place.

use crate::declaration::{
    ClassDeclaration, DeclId, Declaration, FunctionDeclaration, ParameterDeclaration,
    SpecialBuiltInClassDeclaration, VariableDeclaration,
};
use crate::flow::FlowNodeKind;
use crate::scope::{ScopeId, ScopeKind};
use crate::state::{Binder, DeferredBindingTask, DeferredTaskKind, NameBindingType};
use crate::symbol::{SymbolId, symbol_flags};
use pyrite_ast::node::{
    AnnAssignData, AssignData, AugAssignData, ClassDefData, ExceptClauseData, FunctionDefData,
    GlobalData, LambdaData, NamedExprData, NonlocalData,
};
use pyrite_ast::{AstArena, NodeIndex, NodeKind};
use pyrite_common::DiagnosticRule;
use tracing::debug;

/// Names that the typing stub declares through special-form assignments.
/// An assignment to one of these inside the typing stub produces a
/// `SpecialBuiltInClass` declaration instead of a variable.
pub(crate) const SPECIAL_BUILTIN_CLASS_NAMES: &[&str] = &[
    "Tuple",
    "Generic",
    "Protocol",
    "Callable",
    "Type",
    "ClassVar",
    "Final",
    "Literal",
    "TypedDict",
    "Union",
    "Optional",
    "Annotated",
    "TypeAlias",
    "Concatenate",
    "TypeGuard",
    "Unpack",
    "Self",
    "Never",
    "NoReturn",
    "LiteralString",
    "ParamSpec",
    "TypeVarTuple",
    "Required",
    "NotRequired",
];

/// Shape information extracted from a type annotation expression.
#[derive(Debug, Default)]
pub(crate) struct AnnotationInfo {
    pub(crate) is_final: bool,
    pub(crate) is_class_var: bool,
    pub(crate) is_type_alias: bool,
    /// Inner type node of `Final[...]` / `ClassVar[...]`.
    pub(crate) inner: Option<NodeIndex>,
}

impl Binder<'_> {
    /// Nearest ancestor-or-self scope that is not a class scope. Function
    /// and class scopes hang off this, never off an enclosing class.
    pub(crate) fn non_class_parent_scope(&self) -> ScopeId {
        let mut current = self.current_scope;
        while let Some(scope) = self.scopes.get(current) {
            if scope.kind != ScopeKind::Class {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
        current
    }

    fn append_declaration(&mut self, symbol: SymbolId, decl: DeclId) {
        if let Some(sym) = self.symbols.get_mut(symbol) {
            sym.add_declaration(decl);
        }
    }

    // ===== Functions and lambdas =====

    pub(crate) fn bind_function_def(
        &mut self,
        arena: &AstArena,
        idx: NodeIndex,
        data: &FunctionDefData,
    ) {
        let Some(name) = arena.name_text(data.name) else {
            return;
        };
        let is_method = self
            .scopes
            .get(self.current_scope)
            .is_some_and(|s| s.kind == ScopeKind::Class);
        let symbol = self.bind_name_to_scope(self.current_scope, name);
        let decl = self
            .declarations
            .alloc(Declaration::Function(FunctionDeclaration {
                node: idx,
                range: arena.span(idx),
                is_method,
                is_generator: false,
                returns: Vec::new(),
                raises: Vec::new(),
                yields: Vec::new(),
            }));
        self.node_declarations.insert(idx, decl);
        self.append_declaration(symbol, decl);
        debug!(function = name, is_method, "bound function declaration");

        // Decorators, defaults, annotations and the return annotation are
        // evaluated in the enclosing scope, not the function scope.
        for &decorator in &data.decorators {
            self.bind_expression(arena, decorator);
        }
        for &param_idx in &data.parameters {
            if let Some(NodeKind::Parameter(param)) = arena.kind(param_idx) {
                if param.default.is_some() {
                    self.bind_expression(arena, param.default);
                }
                if param.annotation.is_some() {
                    self.bind_expression(arena, param.annotation);
                }
            }
        }
        if data.return_annotation.is_some() {
            self.bind_expression(arena, data.return_annotation);
        }

        let parent = self.non_class_parent_scope();
        let scope = self.scopes.alloc(ScopeKind::Function, Some(parent), idx);
        self.node_scopes.insert(idx, scope);
        self.code_flow_expressions.entry(scope).or_default();

        let is_staticmethod = Self::has_decorator(arena, &data.decorators, "staticmethod");
        let is_classmethod = Self::has_decorator(arena, &data.decorators, "classmethod");
        let enclosing_class = (is_method && !is_staticmethod).then_some(self.current_scope);
        self.deferred.push_back(DeferredBindingTask {
            scope,
            kind: DeferredTaskKind::FunctionBody {
                node: idx,
                decl,
                is_async: data.is_async,
                enclosing_class,
                is_classmethod,
            },
        });

        self.create_flow_assignment(arena, data.name, false);
    }

    fn has_decorator(arena: &AstArena, decorators: &[NodeIndex], name: &str) -> bool {
        decorators
            .iter()
            .any(|&d| arena.name_text(d) == Some(name))
    }

    /// Deferred part of function binding: parameters, body, return label.
    pub(crate) fn bind_function_body(
        &mut self,
        arena: &AstArena,
        idx: NodeIndex,
        decl: DeclId,
        is_async: bool,
        enclosing_class: Option<ScopeId>,
        is_classmethod: bool,
    ) {
        let Some(NodeKind::FunctionDef(data)) = arena.kind(idx) else {
            return;
        };
        self.current_function = Some(decl);
        self.current_function_is_async = is_async;
        self.enclosing_class_scope = enclosing_class;
        self.current_is_classmethod = is_classmethod;
        self.current_first_param = data
            .parameters
            .first()
            .and_then(|&p| match arena.kind(p) {
                Some(NodeKind::Parameter(param)) => {
                    arena.name_text(param.name).map(str::to_string)
                }
                _ => None,
            });

        let start = self.flow.alloc(FlowNodeKind::Start);
        self.current_flow = start;
        for &param_idx in &data.parameters {
            self.bind_parameter(arena, param_idx);
        }

        let return_label = self.create_branch_label();
        self.return_targets.push(return_label);
        self.bind_statement_list(arena, &data.body);
        self.add_antecedent(return_label, self.current_flow);
        self.return_targets.pop();
        let final_flow = self.finish_label(return_label);
        self.after_flow.insert(idx, final_flow);
        self.current_flow = final_flow;
    }

    pub(crate) fn bind_lambda(&mut self, arena: &AstArena, idx: NodeIndex, data: &LambdaData) {
        // Defaults evaluate in the enclosing scope.
        for &param_idx in &data.parameters {
            if let Some(NodeKind::Parameter(param)) = arena.kind(param_idx) {
                if param.default.is_some() {
                    self.bind_expression(arena, param.default);
                }
            }
        }
        let parent = self.non_class_parent_scope();
        let scope = self.scopes.alloc(ScopeKind::Function, Some(parent), idx);
        self.node_scopes.insert(idx, scope);
        self.code_flow_expressions.entry(scope).or_default();
        self.deferred.push_back(DeferredBindingTask {
            scope,
            kind: DeferredTaskKind::LambdaBody { node: idx },
        });
    }

    pub(crate) fn bind_lambda_body(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::Lambda(data)) = arena.kind(idx) else {
            return;
        };
        self.lambda_depth += 1;
        let start = self.flow.alloc(FlowNodeKind::Start);
        self.current_flow = start;
        for &param_idx in &data.parameters {
            self.bind_parameter(arena, param_idx);
        }
        self.bind_expression(arena, data.body);
        self.after_flow.insert(idx, self.current_flow);
        self.lambda_depth -= 1;
    }

    #[tracing::instrument(level = "debug", skip(self, arena), fields(param_idx = idx.0))]
    pub(crate) fn bind_parameter(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::Parameter(param)) = arena.kind(idx) else {
            return;
        };
        let Some(name) = arena.name_text(param.name) else {
            return;
        };
        let symbol = self.bind_name_to_scope(self.current_scope, name);
        let decl = self
            .declarations
            .alloc(Declaration::Parameter(ParameterDeclaration {
                node: idx,
                range: arena.span(idx),
            }));
        self.node_declarations.insert(idx, decl);
        self.append_declaration(symbol, decl);
        self.create_flow_assignment(arena, param.name, false);
    }

    // ===== Classes =====

    pub(crate) fn bind_class_def(&mut self, arena: &AstArena, idx: NodeIndex, data: &ClassDefData) {
        // Decorators and base arguments evaluate in the enclosing scope.
        for &decorator in &data.decorators {
            self.bind_expression(arena, decorator);
        }
        for &argument in &data.arguments {
            self.bind_expression(arena, argument);
        }

        let Some(name) = arena.name_text(data.name) else {
            return;
        };
        let symbol = self.bind_name_to_scope(self.current_scope, name);
        let decl = self.declarations.alloc(Declaration::Class(ClassDeclaration {
            node: idx,
            range: arena.span(idx),
        }));
        self.node_declarations.insert(idx, decl);
        self.append_declaration(symbol, decl);

        // Class bodies execute eagerly, in a scope that skips enclosing
        // classes.
        let parent = self.non_class_parent_scope();
        let class_scope = self.scopes.alloc(ScopeKind::Class, Some(parent), idx);
        self.node_scopes.insert(idx, class_scope);
        let saved_scope = self.current_scope;
        self.current_scope = class_scope;
        self.bind_statement_list(arena, &data.body);
        self.current_scope = saved_scope;

        self.create_flow_assignment(arena, data.name, false);
    }

    // ===== Assignments =====

    /// Inside the typing stub, assignments to the special built-in class
    /// names declare those forms instead of variables.
    pub(crate) fn handle_typing_stub_assignment(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
    ) -> bool {
        if !self.file_info.is_typing_stub_file {
            return false;
        }
        let Some(name) = arena.name_text(target) else {
            return false;
        };
        if !SPECIAL_BUILTIN_CLASS_NAMES.contains(&name) {
            return false;
        }
        let symbol = self.bind_name_to_scope(self.current_scope, name);
        let decl = self
            .declarations
            .alloc(Declaration::SpecialBuiltInClass(
                SpecialBuiltInClassDeclaration {
                    node: target,
                    range: arena.span(target),
                },
            ));
        self.node_declarations.insert(target, decl);
        self.append_declaration(symbol, decl);
        true
    }

    pub(crate) fn bind_assign(&mut self, arena: &AstArena, data: &AssignData) {
        if data.targets.len() == 1 && self.handle_typing_stub_assignment(arena, data.targets[0]) {
            return;
        }
        for &target in &data.targets {
            self.bind_possible_tuple_target(arena, target);
        }
        if data.type_comment.is_some() {
            self.bind_expression(arena, data.type_comment);
        }
        self.bind_expression(arena, data.value);
        for &target in &data.targets {
            self.add_inferred_type_declaration(arena, target, data.value);
        }
        for &target in &data.targets {
            self.create_assignment_target_flow_nodes(arena, target, true, false);
        }
    }

    pub(crate) fn bind_aug_assign(&mut self, arena: &AstArena, data: &AugAssignData) {
        self.bind_possible_tuple_target(arena, data.target);
        self.bind_expression(arena, data.target);
        self.bind_expression(arena, data.value);
        self.add_inferred_type_declaration(arena, data.target, data.value);
        self.create_assignment_target_flow_nodes(arena, data.target, false, false);
    }

    /// Pre-bind every bare-name target, recursing through tuple, list and
    /// starred patterns. Member and subscript targets bind nothing here.
    pub(crate) fn bind_possible_tuple_target(&mut self, arena: &AstArena, target: NodeIndex) {
        match arena.kind(target) {
            Some(NodeKind::Name(name)) => {
                let name = name.id.clone();
                self.bind_name_to_scope(self.current_scope, &name);
            }
            Some(NodeKind::Tuple(tuple)) => {
                for &element in &tuple.elements {
                    self.bind_possible_tuple_target(arena, element);
                }
            }
            Some(NodeKind::List(list)) => {
                for &element in &list.elements {
                    self.bind_possible_tuple_target(arena, element);
                }
            }
            Some(NodeKind::Starred(starred)) => {
                self.bind_possible_tuple_target(arena, starred.value);
            }
            _ => {}
        }
    }

    /// Record inferred-type variable declarations for an assignment target.
    pub(crate) fn add_inferred_type_declaration(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
        source: NodeIndex,
    ) {
        match arena.kind(target) {
            Some(NodeKind::Name(name)) => {
                let name = name.id.clone();
                let symbol = self.bind_name_to_scope(self.current_scope, &name);
                // A module-level assignment whose right side is not a call
                // may define an implicit type alias.
                let at_module_scope = self
                    .scopes
                    .get(self.current_scope)
                    .is_some_and(|s| matches!(s.kind, ScopeKind::Module | ScopeKind::Builtin));
                let rhs_is_call = matches!(arena.kind(source), Some(NodeKind::Call(_)));
                let mut variable = VariableDeclaration::new(target, arena.span(target));
                variable.inferred_type_source = source;
                if at_module_scope && !rhs_is_call {
                    variable.type_alias_name = Some(name);
                }
                let decl = self.declarations.alloc(Declaration::Variable(variable));
                self.node_declarations.insert(target, decl);
                self.append_declaration(symbol, decl);
            }
            Some(NodeKind::Tuple(tuple)) => {
                for &element in &tuple.elements {
                    self.add_inferred_type_declaration(arena, element, source);
                }
            }
            Some(NodeKind::List(list)) => {
                for &element in &list.elements {
                    self.add_inferred_type_declaration(arena, element, source);
                }
            }
            Some(NodeKind::Starred(starred)) => {
                let inner = starred.value;
                self.add_inferred_type_declaration(arena, inner, source);
            }
            Some(NodeKind::Attribute(_)) => {
                self.add_member_variable_declaration(arena, target, source, NodeIndex::NONE);
            }
            _ => {}
        }
    }

    /// `self.x` / `cls.x` assignments inside a method declare members on
    /// the enclosing class.
    pub(crate) fn add_member_variable_declaration(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
        source: NodeIndex,
        annotation: NodeIndex,
    ) {
        let Some(class_scope) = self.enclosing_class_scope else {
            return;
        };
        let Some(NodeKind::Attribute(attr)) = arena.kind(target) else {
            return;
        };
        let Some(base) = arena.name_text(attr.value) else {
            return;
        };
        let Some(first_param) = self.current_first_param.as_deref() else {
            return;
        };
        if base != first_param {
            return;
        }
        let member_flag = if self.current_is_classmethod {
            symbol_flags::CLASS_MEMBER
        } else {
            symbol_flags::INSTANCE_MEMBER
        };
        let attr_name = attr.attr.clone();
        let symbol = match self.scopes.look_up(class_scope, &attr_name) {
            Some(existing) => existing,
            None => self.scopes.add_symbol(
                &mut self.symbols,
                class_scope,
                &attr_name,
                symbol_flags::INITIALLY_UNBOUND | symbol_flags::CLASS_MEMBER,
            ),
        };
        if let Some(sym) = self.symbols.get_mut(symbol) {
            sym.flags |= member_flag;
        }
        let mut variable = VariableDeclaration::new(target, arena.span(target));
        variable.is_defined_by_member_access = true;
        variable.inferred_type_source = source;
        variable.type_annotation = annotation;
        let decl = self.declarations.alloc(Declaration::Variable(variable));
        self.node_declarations.insert(target, decl);
        self.append_declaration(symbol, decl);
    }

    /// Emit assignment flow nodes for a target pattern. With
    /// `walk_targets`, member and subscript sub-expressions are walked
    /// here; pass false when the caller already walked the target as a
    /// read (augmented assignment).
    pub(crate) fn create_assignment_target_flow_nodes(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
        walk_targets: bool,
        unbind: bool,
    ) {
        match arena.kind(target) {
            Some(NodeKind::Name(_)) => {
                self.create_flow_assignment(arena, target, unbind);
            }
            Some(NodeKind::Tuple(tuple)) => {
                for &element in &tuple.elements {
                    self.create_assignment_target_flow_nodes(arena, element, walk_targets, unbind);
                }
            }
            Some(NodeKind::List(list)) => {
                for &element in &list.elements {
                    self.create_assignment_target_flow_nodes(arena, element, walk_targets, unbind);
                }
            }
            Some(NodeKind::Starred(starred)) => {
                let inner = starred.value;
                self.create_assignment_target_flow_nodes(arena, inner, walk_targets, unbind);
            }
            Some(NodeKind::Attribute(attr)) => {
                if walk_targets {
                    self.bind_expression(arena, attr.value);
                }
                self.create_flow_assignment(arena, target, unbind);
            }
            Some(NodeKind::Subscript(subscript)) => {
                if walk_targets {
                    let (value, index) = (subscript.value, subscript.index);
                    self.bind_expression(arena, value);
                    self.bind_expression(arena, index);
                }
            }
            _ => {
                if walk_targets {
                    self.bind_expression(arena, target);
                }
            }
        }
    }

    // ===== Annotations =====

    pub(crate) fn analyze_annotation(
        &self,
        arena: &AstArena,
        annotation: NodeIndex,
    ) -> AnnotationInfo {
        let mut info = AnnotationInfo::default();
        let type_alias_recognized = self.file_info.is_stub_file
            || self.file_info.execution_environment.language_version
                >= pyrite_common::LanguageVersion::V3_10;
        match arena.kind(annotation) {
            Some(NodeKind::Name(name)) => match name.id.as_str() {
                "Final" => info.is_final = true,
                "ClassVar" => info.is_class_var = true,
                "TypeAlias" if type_alias_recognized => info.is_type_alias = true,
                _ => {}
            },
            Some(NodeKind::Subscript(subscript)) => {
                if let Some(base) = arena.name_text(subscript.value) {
                    match base {
                        "Final" => {
                            info.is_final = true;
                            info.inner = Some(subscript.index);
                        }
                        "ClassVar" => {
                            info.is_class_var = true;
                            info.inner = Some(subscript.index);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        info
    }

    pub(crate) fn bind_ann_assign(
        &mut self,
        arena: &AstArena,
        _idx: NodeIndex,
        data: &AnnAssignData,
    ) {
        if self.handle_typing_stub_assignment(arena, data.target) {
            return;
        }
        let (target, annotation, value) = (data.target, data.annotation, data.value);
        self.bind_expression(arena, annotation);
        let info = self.analyze_annotation(arena, annotation);

        if info.is_type_alias {
            let at_module_scope = self
                .scopes
                .get(self.current_scope)
                .is_some_and(|s| matches!(s.kind, ScopeKind::Module | ScopeKind::Builtin));
            if !at_module_scope {
                self.diagnostics.report(
                    DiagnosticRule::TypeAliasNotModuleLevel,
                    "a TypeAlias annotation is only allowed at module level",
                    arena.span(annotation),
                );
            }
        }

        match arena.kind(target) {
            Some(NodeKind::Name(name)) => {
                let name = name.id.clone();
                let symbol = self.bind_name_to_scope(self.current_scope, &name);
                let at_class_scope = self
                    .scopes
                    .get(self.current_scope)
                    .is_some_and(|s| s.kind == ScopeKind::Class);

                let mut variable = VariableDeclaration::new(target, arena.span(target));
                variable.type_annotation = info.inner.unwrap_or(annotation);
                variable.is_final = info.is_final;
                if info.is_type_alias {
                    variable.type_alias_name = Some(name.clone());
                    variable.type_alias_annotation = annotation;
                }
                if value.is_some() {
                    variable.inferred_type_source = value;
                }
                let decl = self.declarations.alloc(Declaration::Variable(variable));
                self.node_declarations.insert(target, decl);
                self.append_declaration(symbol, decl);

                if let Some(sym) = self.symbols.get_mut(symbol) {
                    if info.is_class_var {
                        sym.flags |= symbol_flags::CLASS_VAR;
                    }
                    // A bare Final at class body top level still marks an
                    // instance member.
                    if at_class_scope && info.is_final && value.is_none() {
                        sym.flags |= symbol_flags::INSTANCE_MEMBER;
                    }
                }

                if value.is_some() {
                    self.bind_expression(arena, value);
                    self.create_flow_assignment(arena, target, false);
                } else if let Some(key) = crate::narrowing::reference_key(arena, target) {
                    // Annotations without a value still pre-register their
                    // key so later flow analysis considers them.
                    self.record_reference_key(key);
                }
            }
            Some(NodeKind::Attribute(_)) => {
                self.add_member_variable_declaration(arena, target, value, annotation);
                self.create_assignment_target_flow_nodes(arena, target, true, false);
                if value.is_some() {
                    self.bind_expression(arena, value);
                } else if let Some(key) = crate::narrowing::reference_key(arena, target) {
                    self.record_reference_key(key);
                }
            }
            _ => {
                self.diagnostics.report(
                    DiagnosticRule::AnnotationTargetForm,
                    "type annotation is not allowed on this target form",
                    arena.span(target),
                );
                self.bind_expression(arena, target);
                if value.is_some() {
                    self.bind_expression(arena, value);
                }
            }
        }
    }

    // ===== Walrus =====

    pub(crate) fn bind_named_expr(
        &mut self,
        arena: &AstArena,
        _idx: NodeIndex,
        data: &NamedExprData,
    ) {
        let (target, value) = (data.target, data.value);
        self.bind_expression(arena, value);
        let Some(name) = arena.name_text(target).map(str::to_string) else {
            return;
        };

        // The bound name hoists out to the innermost non-comprehension
        // scope; a comprehension on the way out that already binds the
        // name is an error.
        let mut container = self.current_scope;
        while let Some(scope) = self.scopes.get(container) {
            if scope.kind != ScopeKind::ListComprehension {
                break;
            }
            if scope.table.has(&name) {
                self.diagnostics.report(
                    DiagnosticRule::WalrusComprehensionTarget,
                    format!("assignment expression target '{name}' collides with a comprehension variable"),
                    arena.span(target),
                );
            }
            match scope.parent {
                Some(parent) => container = parent,
                None => break,
            }
        }

        let symbol = self.bind_name_to_scope(container, &name);
        let mut variable = VariableDeclaration::new(target, arena.span(target));
        variable.inferred_type_source = value;
        let decl = self.declarations.alloc(Declaration::Variable(variable));
        self.node_declarations.insert(target, decl);
        self.append_declaration(symbol, decl);
        self.create_flow_assignment(arena, target, false);
    }

    // ===== global / nonlocal =====

    pub(crate) fn bind_global_stmt(&mut self, arena: &AstArena, data: &GlobalData) {
        let scope = self.current_scope;
        let global_scope = self.scopes.global_scope(scope);
        for &name_node in &data.names {
            let Some(name) = arena.name_text(name_node).map(str::to_string) else {
                continue;
            };
            if self.nonlocal_binding_for(scope, &name) == Some(NameBindingType::Nonlocal) {
                self.diagnostics.report(
                    DiagnosticRule::GlobalRedefinition,
                    format!("'{name}' was already declared nonlocal"),
                    arena.span(name_node),
                );
                continue;
            }
            if scope != global_scope {
                if self.scopes.look_up(scope, &name).is_some() {
                    self.diagnostics.report(
                        DiagnosticRule::GlobalReassignment,
                        format!("'{name}' is assigned before global declaration"),
                        arena.span(name_node),
                    );
                }
                self.nonlocal_bindings
                    .entry(scope)
                    .or_default()
                    .insert(name.clone(), NameBindingType::Global);
            }
            self.bind_name_to_scope(global_scope, &name);
        }
    }

    pub(crate) fn bind_nonlocal_stmt(&mut self, arena: &AstArena, data: &NonlocalData) {
        let scope = self.current_scope;
        let at_module_scope = self
            .scopes
            .get(scope)
            .is_some_and(|s| matches!(s.kind, ScopeKind::Module | ScopeKind::Builtin));
        for &name_node in &data.names {
            let Some(name) = arena.name_text(name_node).map(str::to_string) else {
                continue;
            };
            if at_module_scope {
                self.diagnostics.report(
                    DiagnosticRule::NonlocalAtModuleLevel,
                    format!("nonlocal declaration of '{name}' not allowed at module level"),
                    arena.span(name_node),
                );
                continue;
            }
            if self.nonlocal_binding_for(scope, &name) == Some(NameBindingType::Global) {
                self.diagnostics.report(
                    DiagnosticRule::NonlocalRedefinition,
                    format!("'{name}' was already declared global"),
                    arena.span(name_node),
                );
                continue;
            }
            if self.scopes.look_up(scope, &name).is_some() {
                self.diagnostics.report(
                    DiagnosticRule::NonlocalReassignment,
                    format!("'{name}' is assigned before nonlocal declaration"),
                    arena.span(name_node),
                );
                continue;
            }
            if self.look_up_outer_function_binding(scope, &name).is_none() {
                self.diagnostics.report(
                    DiagnosticRule::NonlocalNoBinding,
                    format!("no binding for nonlocal '{name}' found"),
                    arena.span(name_node),
                );
            }
            self.nonlocal_bindings
                .entry(scope)
                .or_default()
                .insert(name, NameBindingType::Nonlocal);
        }
    }

    // ===== Except clause names =====

    pub(crate) fn bind_except_clause_body(
        &mut self,
        arena: &AstArena,
        data: &ExceptClauseData,
    ) {
        if data.test.is_some() {
            self.bind_expression(arena, data.test);
        }
        if data.name.is_some() {
            if let Some(name) = arena.name_text(data.name).map(str::to_string) {
                let symbol = self.bind_name_to_scope(self.current_scope, &name);
                let mut variable = VariableDeclaration::new(data.name, arena.span(data.name));
                variable.inferred_type_source = data.test;
                let decl = self.declarations.alloc(Declaration::Variable(variable));
                self.node_declarations.insert(data.name, decl);
                self.append_declaration(symbol, decl);
            }
            self.create_flow_assignment(arena, data.name, false);
        }

        self.nested_except_depth += 1;
        self.bind_statement_list(arena, &data.body);
        self.nested_except_depth -= 1;

        // The exception name is cleared when the clause exits. The unbind
        // node keeps the in-clause flow attached to the name node.
        if data.name.is_some() {
            self.create_flow_assignment(arena, data.name, true);
        }
    }
}
