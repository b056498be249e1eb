//! AST walking and flow graph construction.
//!
//! The per-node-kind dispatch that drives everything else: suites record
//! their entry flow, conditionals prune statically dead arms, loops wire
//! back-edges, try statements thread except targets and the finally gate,
//! and terminators (`return`, `raise`, `break`, `continue`) cut the
//! current flow to unreachable while the walk continues past them.

use crate::flow::{FlowNodeId, FlowNodeKind};
use crate::scope::ScopeKind;
use crate::state::Binder;
use pyrite_ast::node::{ForData, IfData, TryData, WhileData};
use pyrite_ast::{AstArena, NodeIndex, NodeKind, StringErrorKind, UnaryOperator};
use pyrite_common::DiagnosticRule;

impl Binder<'_> {
    /// Bind a suite. Every statement records the flow node active at its
    /// entry, so statements dominated by a terminator carry the
    /// unreachable flow while still being walked (a `yield` in dead code
    /// must still mark its function as a generator).
    pub(crate) fn bind_statement_list(&mut self, arena: &AstArena, statements: &[NodeIndex]) {
        for &stmt in statements {
            self.node_flow.insert(stmt, self.current_flow);
            self.bind_statement(arena, stmt);
            if matches!(
                arena.kind(stmt),
                Some(
                    NodeKind::If(_)
                        | NodeKind::While(_)
                        | NodeKind::For(_)
                        | NodeKind::Try(_)
                        | NodeKind::With(_)
                        | NodeKind::ClassDef(_)
                )
            ) {
                self.after_flow.insert(stmt, self.current_flow);
            }
        }
    }

    fn bind_statement(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(node) = arena.get(idx) else {
            return;
        };
        match &node.kind {
            NodeKind::Assign(data) => self.bind_assign(arena, data),
            NodeKind::AnnAssign(data) => self.bind_ann_assign(arena, idx, data),
            NodeKind::AugAssign(data) => self.bind_aug_assign(arena, data),
            NodeKind::FunctionDef(data) => self.bind_function_def(arena, idx, data),
            NodeKind::ClassDef(data) => self.bind_class_def(arena, idx, data),
            NodeKind::If(data) => self.bind_if_stmt(arena, data),
            NodeKind::While(data) => self.bind_while_stmt(arena, data),
            NodeKind::For(data) => self.bind_for_stmt(arena, data),
            NodeKind::Try(data) => self.bind_try_stmt(arena, data),
            NodeKind::With(data) => {
                for &item in &data.items {
                    self.bind_with_item(arena, item);
                }
                self.bind_statement_list(arena, &data.body);
            }
            NodeKind::Raise(data) => {
                let (exc, cause) = (data.exc, data.cause);
                if let Some(decl) = self.current_function {
                    if let Some(func) = self.declarations.as_function_mut(decl) {
                        func.raises.push(idx);
                    }
                }
                if exc.is_none() && self.nested_except_depth == 0 {
                    self.diagnostics.report(
                        DiagnosticRule::RaiseOutsideExcept,
                        "a re-raise requires an active except clause",
                        arena.span(idx),
                    );
                }
                if exc.is_some() {
                    self.bind_expression(arena, exc);
                }
                if cause.is_some() {
                    self.bind_expression(arena, cause);
                }
                let finally_targets = self.finally_targets.clone();
                for target in finally_targets {
                    self.add_antecedent(target, self.current_flow);
                }
                self.current_flow = FlowNodeId::UNREACHABLE;
            }
            NodeKind::Return(data) => {
                let value = data.value;
                if let Some(decl) = self.current_function {
                    if let Some(func) = self.declarations.as_function_mut(decl) {
                        func.returns.push(idx);
                    }
                }
                if value.is_some() {
                    self.bind_expression(arena, value);
                }
                if let Some(&target) = self.return_targets.last() {
                    self.add_antecedent(target, self.current_flow);
                }
                let finally_targets = self.finally_targets.clone();
                for target in finally_targets {
                    self.add_antecedent(target, self.current_flow);
                }
                self.current_flow = FlowNodeId::UNREACHABLE;
            }
            NodeKind::Break => {
                if let Some(&target) = self.break_targets.last() {
                    self.add_antecedent(target, self.current_flow);
                }
                self.current_flow = FlowNodeId::UNREACHABLE;
            }
            NodeKind::Continue => {
                if let Some(&target) = self.continue_targets.last() {
                    self.add_antecedent(target, self.current_flow);
                }
                self.current_flow = FlowNodeId::UNREACHABLE;
            }
            NodeKind::Global(data) => self.bind_global_stmt(arena, data),
            NodeKind::Nonlocal(data) => self.bind_nonlocal_stmt(arena, data),
            NodeKind::ExprStmt(data) => self.bind_expression(arena, data.value),
            NodeKind::Del(data) => {
                for &target in &data.targets {
                    self.bind_expression(arena, target);
                    if matches!(
                        arena.kind(target),
                        Some(NodeKind::Name(_) | NodeKind::Attribute(_))
                    ) {
                        self.create_flow_assignment(arena, target, true);
                    }
                }
            }
            NodeKind::Assert(data) => {
                let (test, message) = (data.test, data.message);
                let assert_true = self.create_branch_label();
                let assert_false = self.create_branch_label();
                self.bind_conditional(arena, test, assert_true, assert_false);
                // The failing path evaluates the message, then raises.
                self.current_flow = self.finish_label(assert_false);
                if message.is_some() {
                    self.bind_expression(arena, message);
                }
                self.current_flow = self.finish_label(assert_true);
            }
            NodeKind::Import(data) => {
                for &alias in &data.aliases {
                    self.bind_import_as(arena, alias);
                }
            }
            NodeKind::ImportFrom(_) => self.bind_import_from(arena, idx),
            NodeKind::Pass => {}
            _ => self.bind_expression(arena, idx),
        }
    }

    fn bind_with_item(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::WithItem(item)) = arena.kind(idx) else {
            return;
        };
        let (context, target) = (item.context, item.target);
        self.bind_expression(arena, context);
        if target.is_some() {
            self.bind_possible_tuple_target(arena, target);
            self.add_inferred_type_declaration(arena, target, context);
            self.create_assignment_target_flow_nodes(arena, target, true, false);
        }
    }

    fn bind_if_stmt(&mut self, arena: &AstArena, data: &IfData) {
        let then_label = self.create_branch_label();
        let else_label = self.create_branch_label();
        let post_if = self.create_branch_label();
        self.bind_conditional(arena, data.test, then_label, else_label);

        self.current_flow = self.finish_label(then_label);
        self.bind_statement_list(arena, &data.body);
        self.add_antecedent(post_if, self.current_flow);

        self.current_flow = self.finish_label(else_label);
        self.bind_statement_list(arena, &data.orelse);
        self.add_antecedent(post_if, self.current_flow);

        self.current_flow = self.finish_label(post_if);
    }

    fn bind_while_stmt(&mut self, arena: &AstArena, data: &WhileData) {
        let pre_loop = self.create_loop_label();
        self.add_antecedent(pre_loop, self.current_flow);
        self.current_flow = pre_loop;

        let then_label = self.create_branch_label();
        let else_label = self.create_branch_label();
        let post_while = self.create_branch_label();
        // A statically true test makes the else branch unreachable and
        // vice versa; bind_conditional prunes through the condition nodes.
        self.bind_conditional(arena, data.test, then_label, else_label);

        self.current_flow = self.finish_label(then_label);
        self.break_targets.push(post_while);
        self.continue_targets.push(pre_loop);
        self.bind_statement_list(arena, &data.body);
        self.break_targets.pop();
        self.continue_targets.pop();
        self.add_antecedent(pre_loop, self.current_flow);

        self.current_flow = self.finish_label(else_label);
        self.bind_statement_list(arena, &data.orelse);
        self.add_antecedent(post_while, self.current_flow);

        self.current_flow = self.finish_label(post_while);
    }

    fn bind_for_stmt(&mut self, arena: &AstArena, data: &ForData) {
        let (target, iterable) = (data.target, data.iterable);
        self.bind_possible_tuple_target(arena, target);
        self.add_inferred_type_declaration(arena, target, iterable);
        self.bind_expression(arena, iterable);

        let pre_for = self.create_loop_label();
        let pre_else = self.create_branch_label();
        let post_for = self.create_branch_label();

        self.add_antecedent(pre_for, self.current_flow);
        self.current_flow = pre_for;
        self.add_antecedent(pre_else, self.current_flow);
        self.create_assignment_target_flow_nodes(arena, target, true, false);

        self.break_targets.push(post_for);
        self.continue_targets.push(pre_for);
        self.bind_statement_list(arena, &data.body);
        self.break_targets.pop();
        self.continue_targets.pop();
        self.add_antecedent(pre_for, self.current_flow);

        self.current_flow = self.finish_label(pre_else);
        self.bind_statement_list(arena, &data.orelse);
        self.add_antecedent(post_for, self.current_flow);

        self.current_flow = self.finish_label(post_for);
    }

    fn bind_try_stmt(&mut self, arena: &AstArena, data: &TryData) {
        let has_finally = !data.finally.is_empty();
        let pre_try_flow = self.current_flow;

        // An exception can be raised before the first statement runs, so
        // every except label starts from the pre-try flow.
        let except_labels: Vec<FlowNodeId> = data
            .handlers
            .iter()
            .map(|_| self.create_branch_label())
            .collect();
        for &label in &except_labels {
            self.add_antecedent(label, pre_try_flow);
        }

        let pre_finally = self.create_branch_label();
        let pre_finally_return_or_raise = self.create_branch_label();
        let gate = if has_finally {
            // Intercepted returns and raises reach the finally suite
            // through the gate.
            let gate = self.flow.alloc(FlowNodeKind::PreFinallyGate {
                antecedent: pre_finally_return_or_raise,
                is_gate_closed: false,
            });
            self.add_antecedent(pre_finally, gate);
            self.finally_targets.push(pre_finally_return_or_raise);
            Some(gate)
        } else {
            None
        };

        self.current_except_targets.push(except_labels.clone());
        self.bind_statement_list(arena, &data.body);
        self.current_except_targets.pop();

        // The else suite runs only when the try body completed; its
        // exceptions are not caught by this statement's handlers.
        self.bind_statement_list(arena, &data.orelse);
        let mut is_after_reachable = !self.current_flow.is_unreachable();
        self.add_antecedent(pre_finally, self.current_flow);

        for (&clause, &label) in data.handlers.iter().zip(&except_labels) {
            self.current_flow = self.finish_label(label);
            self.node_flow.insert(clause, self.current_flow);
            if let Some(NodeKind::ExceptClause(clause_data)) = arena.kind(clause) {
                self.bind_except_clause_body(arena, clause_data);
            }
            is_after_reachable |= !self.current_flow.is_unreachable();
            self.add_antecedent(pre_finally, self.current_flow);
        }

        if has_finally {
            self.finally_targets.pop();
        }

        self.current_flow = self.finish_label(pre_finally);
        if let Some(gate) = gate {
            self.bind_statement_list(arena, &data.finally);
            let post_finally = self.flow.alloc(FlowNodeKind::PostFinally {
                antecedent: self.current_flow,
                gate,
            });
            self.current_flow = if is_after_reachable {
                post_finally
            } else {
                FlowNodeId::UNREACHABLE
            };
        } else if !is_after_reachable {
            self.current_flow = FlowNodeId::UNREACHABLE;
        }
    }

    // ===== Expressions =====

    pub(crate) fn bind_expression(&mut self, arena: &AstArena, idx: NodeIndex) {
        if idx.is_none() {
            return;
        }
        let Some(node) = arena.get(idx) else {
            return;
        };
        match &node.kind {
            NodeKind::Name(_) => {
                self.node_flow.insert(idx, self.current_flow);
            }
            NodeKind::Attribute(data) => {
                self.bind_expression(arena, data.value);
                self.node_flow.insert(idx, self.current_flow);
            }
            NodeKind::Subscript(data) => {
                self.bind_expression(arena, data.value);
                self.bind_expression(arena, data.index);
                self.node_flow.insert(idx, self.current_flow);
            }
            NodeKind::Slice(data) => {
                self.bind_expression(arena, data.lower);
                self.bind_expression(arena, data.upper);
                self.bind_expression(arena, data.step);
            }
            NodeKind::Call(data) => {
                self.bind_expression(arena, data.func);
                for &argument in &data.arguments {
                    self.bind_expression(arena, argument);
                }
                self.node_flow.insert(idx, self.current_flow);
                self.create_flow_call(idx);
            }
            NodeKind::Keyword(data) => self.bind_expression(arena, data.value),
            NodeKind::BoolOp(data) => self.bind_bool_op(arena, data.op, data.left, data.right),
            NodeKind::UnaryOp(data) => {
                let operand = data.operand;
                if data.op == UnaryOperator::Not {
                    if let (Some(true_target), Some(false_target)) =
                        (self.current_true_target, self.current_false_target)
                    {
                        // `not` swaps the branch targets.
                        self.bind_conditional(arena, operand, false_target, true_target);
                        return;
                    }
                    self.bind_expression(arena, operand);
                } else {
                    self.with_cleared_targets(|binder| binder.bind_expression(arena, operand));
                }
            }
            NodeKind::BinOp(data) => {
                let (left, right) = (data.left, data.right);
                self.with_cleared_targets(|binder| {
                    binder.bind_expression(arena, left);
                    binder.bind_expression(arena, right);
                });
            }
            NodeKind::Compare(data) => {
                self.bind_expression(arena, data.left);
                for &comparator in &data.comparators {
                    self.bind_expression(arena, comparator);
                }
            }
            NodeKind::NamedExpr(data) => self.bind_named_expr(arena, idx, data),
            NodeKind::Lambda(data) => self.bind_lambda(arena, idx, data),
            NodeKind::Await(data) => {
                if !self.current_function_is_async && self.lambda_depth == 0 {
                    self.diagnostics.report(
                        DiagnosticRule::AwaitOutsideAsync,
                        "await is only allowed inside an async function",
                        arena.span(idx),
                    );
                }
                self.bind_expression(arena, data.value);
            }
            NodeKind::Yield(data) => {
                self.mark_generator(arena, idx, false);
                if data.value.is_some() {
                    self.bind_expression(arena, data.value);
                }
            }
            NodeKind::YieldFrom(data) => {
                self.mark_generator(arena, idx, true);
                self.bind_expression(arena, data.value);
            }
            NodeKind::Ternary(data) => {
                let (test, body, orelse) = (data.test, data.body, data.orelse);
                let true_label = self.create_branch_label();
                let false_label = self.create_branch_label();
                let post_label = self.create_branch_label();
                self.bind_conditional(arena, test, true_label, false_label);
                self.current_flow = self.finish_label(true_label);
                self.bind_expression(arena, body);
                self.add_antecedent(post_label, self.current_flow);
                self.current_flow = self.finish_label(false_label);
                self.bind_expression(arena, orelse);
                self.add_antecedent(post_label, self.current_flow);
                self.current_flow = self.finish_label(post_label);
            }
            NodeKind::Comprehension(_) => self.bind_comprehension(arena, idx),
            NodeKind::Tuple(data) => {
                for &element in &data.elements {
                    self.bind_expression(arena, element);
                }
            }
            NodeKind::List(data) => {
                for &element in &data.elements {
                    self.bind_expression(arena, element);
                }
            }
            NodeKind::Starred(data) => self.bind_expression(arena, data.value),
            NodeKind::StringList(data) => {
                for &part in &data.parts {
                    self.report_string_part_errors(arena, part);
                }
            }
            NodeKind::Constant(_) | NodeKind::StringPart(_) => {}
            _ => {}
        }
    }

    fn with_cleared_targets(&mut self, callback: impl FnOnce(&mut Self)) {
        let saved_true = self.current_true_target.take();
        let saved_false = self.current_false_target.take();
        callback(self);
        self.current_true_target = saved_true;
        self.current_false_target = saved_false;
    }

    fn bind_bool_op(
        &mut self,
        arena: &AstArena,
        op: pyrite_ast::BoolOperator,
        left: NodeIndex,
        right: NodeIndex,
    ) {
        // With no conditional target active, synthesize a join so the
        // short-circuit flow is still modeled.
        let (true_target, false_target, post_label) =
            match (self.current_true_target, self.current_false_target) {
                (Some(t), Some(f)) => (t, f, None),
                _ => {
                    let post = self.create_branch_label();
                    (post, post, Some(post))
                }
            };
        let pre_right_label = self.create_branch_label();
        match op {
            pyrite_ast::BoolOperator::And => {
                // Short-circuits to the false target when the left side is
                // false.
                self.bind_conditional(arena, left, pre_right_label, false_target);
            }
            pyrite_ast::BoolOperator::Or => {
                self.bind_conditional(arena, left, true_target, pre_right_label);
            }
        }
        self.current_flow = self.finish_label(pre_right_label);
        self.bind_conditional(arena, right, true_target, false_target);
        if let Some(post) = post_label {
            self.current_flow = self.finish_label(post);
        }
    }

    /// Yields mark their function as a generator even when unreachable;
    /// the suite walk reaches them regardless of the current flow.
    fn mark_generator(&mut self, arena: &AstArena, idx: NodeIndex, is_yield_from: bool) {
        match self.current_function {
            Some(decl) => {
                if is_yield_from && self.current_function_is_async {
                    self.diagnostics.report(
                        DiagnosticRule::YieldFromInAsync,
                        "yield from is not allowed in an async function",
                        arena.span(idx),
                    );
                }
                if let Some(func) = self.declarations.as_function_mut(decl) {
                    func.yields.push(idx);
                    func.is_generator = true;
                }
            }
            None => {
                self.diagnostics.report(
                    DiagnosticRule::YieldOutsideFunction,
                    "yield is only allowed inside a function",
                    arena.span(idx),
                );
            }
        }
    }

    fn report_string_part_errors(&mut self, arena: &AstArena, part: NodeIndex) {
        let Some(NodeKind::StringPart(data)) = arena.kind(part) else {
            return;
        };
        let base = arena.span(part).start;
        for error in &data.errors {
            let span = error.range.offset_by(base);
            match error.kind {
                StringErrorKind::UnsupportedEscape => self.diagnostics.report(
                    DiagnosticRule::StringEscape,
                    "unsupported escape sequence in string literal",
                    span,
                ),
                StringErrorKind::FormatExpression => self.diagnostics.report(
                    DiagnosticRule::StringFormat,
                    "invalid expression in format string",
                    span,
                ),
                StringErrorKind::UnterminatedFormat => self.diagnostics.report(
                    DiagnosticRule::StringFormat,
                    "unterminated expression in format string",
                    span,
                ),
            }
        }
    }

    // ===== Comprehensions =====

    fn bind_comprehension(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::Comprehension(data)) = arena.kind(idx) else {
            return;
        };
        let (element, element_value) = (data.element, data.element_value);
        let clauses = data.clauses.clone();

        let saved_scope = self.current_scope;
        let comp_scope = self
            .scopes
            .alloc(ScopeKind::ListComprehension, Some(saved_scope), idx);
        self.node_scopes.insert(idx, comp_scope);
        self.current_scope = comp_scope;

        // Pass one: pre-bind every for-clause target.
        let mut new_symbols = Vec::new();
        for &clause in &clauses {
            if let Some(NodeKind::ComprehensionFor(for_data)) = arena.kind(clause) {
                self.pre_bind_comprehension_target(arena, for_data.target, &mut new_symbols);
            }
        }

        // Pass two: targets that shadow a name visible in the parent scope
        // get an alias flow so narrowing can thread through the shadowing.
        for (symbol, name) in &new_symbols {
            if let Some(outer) = self.scopes.look_up_recursive(saved_scope, name) {
                self.create_flow_assignment_alias(*symbol, outer.symbol);
            }
        }

        // A failing filter at any position skips to the next iteration.
        let false_label = self.create_branch_label();
        for &clause in &clauses {
            match arena.kind(clause) {
                Some(NodeKind::ComprehensionFor(for_data)) => {
                    let (target, iterable) = (for_data.target, for_data.iterable);
                    self.bind_expression(arena, iterable);
                    self.add_inferred_type_declaration(arena, target, iterable);
                    self.create_assignment_target_flow_nodes(arena, target, true, false);
                }
                Some(NodeKind::ComprehensionIf(if_data)) => {
                    let test = if_data.test;
                    let true_label = self.create_branch_label();
                    self.bind_conditional(arena, test, true_label, false_label);
                    self.current_flow = self.finish_label(true_label);
                }
                _ => {}
            }
        }

        self.bind_expression(arena, element);
        if element_value.is_some() {
            self.bind_expression(arena, element_value);
        }

        self.current_scope = saved_scope;
    }

    fn pre_bind_comprehension_target(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
        new_symbols: &mut Vec<(crate::symbol::SymbolId, String)>,
    ) {
        match arena.kind(target) {
            Some(NodeKind::Name(name)) => {
                let name = name.id.clone();
                if self.scopes.look_up(self.current_scope, &name).is_none() {
                    let symbol = self.scopes.add_symbol(
                        &mut self.symbols,
                        self.current_scope,
                        &name,
                        crate::symbol::symbol_flags::INITIALLY_UNBOUND,
                    );
                    new_symbols.push((symbol, name));
                }
            }
            Some(NodeKind::Tuple(tuple)) => {
                for &element in &tuple.elements {
                    self.pre_bind_comprehension_target(arena, element, new_symbols);
                }
            }
            Some(NodeKind::List(list)) => {
                for &element in &list.elements {
                    self.pre_bind_comprehension_target(arena, element, new_symbols);
                }
            }
            Some(NodeKind::Starred(starred)) => {
                self.pre_bind_comprehension_target(arena, starred.value, new_symbols);
            }
            _ => {}
        }
    }
}
