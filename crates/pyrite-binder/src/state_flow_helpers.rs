//! Flow graph construction helpers.
//!
//! Factory methods for flow graph nodes (branch labels, loop labels,
//! conditions, assignments, calls, wildcard imports) plus the
//! except-target threading that models exceptions escaping from any
//! side-effecting statement inside a try block.

use crate::flow::{AntecedentList, AssignmentTarget, ConditionKind, FlowNodeId, FlowNodeKind};
use crate::narrowing::{is_narrowing_expression, reference_key, static_bool_value};
use crate::state::Binder;
use pyrite_ast::{AstArena, NodeIndex, NodeKind};

impl Binder<'_> {
    /// Create a branch label flow node for merging control flow paths.
    pub(crate) fn create_branch_label(&mut self) -> FlowNodeId {
        self.flow.alloc(FlowNodeKind::BranchLabel {
            antecedents: AntecedentList::new(),
        })
    }

    /// Create a loop label flow node for back-edges.
    pub(crate) fn create_loop_label(&mut self) -> FlowNodeId {
        self.flow.alloc(FlowNodeKind::LoopLabel {
            antecedents: AntecedentList::new(),
        })
    }

    /// Add an antecedent to a label. Unreachable antecedents are skipped
    /// and duplicates collapse.
    pub(crate) fn add_antecedent(&mut self, label: FlowNodeId, antecedent: FlowNodeId) {
        self.flow.add_antecedent(label, antecedent);
    }

    /// Collapse a finished label: no antecedents means nothing flowed here
    /// (unreachable); exactly one antecedent needs no join node at all.
    pub(crate) fn finish_label(&mut self, label: FlowNodeId) -> FlowNodeId {
        let antecedents = self.flow.antecedents(label);
        match antecedents.len() {
            0 => FlowNodeId::UNREACHABLE,
            1 => antecedents[0],
            _ => label,
        }
    }

    /// Thread a freshly created flow node into every except label of the
    /// innermost try block, modeling the pessimistic assumption that an
    /// exception may escape from any side-effecting statement.
    pub(crate) fn thread_except_targets(&mut self, node: FlowNodeId) {
        if let Some(targets) = self.current_except_targets.last() {
            for &label in targets {
                self.flow.add_antecedent(label, node);
            }
        }
    }

    /// Create a condition flow node over `expression`, when it narrows.
    ///
    /// Returns the antecedent unchanged for non-narrowing expressions, and
    /// the unreachable node when the expression statically evaluates to
    /// the opposite of `kind`.
    pub(crate) fn create_flow_condition(
        &mut self,
        kind: ConditionKind,
        antecedent: FlowNodeId,
        arena: &AstArena,
        expression: NodeIndex,
    ) -> FlowNodeId {
        if antecedent.is_unreachable() {
            return antecedent;
        }
        if let Some(value) = static_bool_value(arena, expression) {
            let wanted = kind == ConditionKind::TrueCondition;
            if value != wanted {
                return FlowNodeId::UNREACHABLE;
            }
        }
        let mut keys = Vec::new();
        if !is_narrowing_expression(arena, expression, &mut keys) {
            return antecedent;
        }
        for key in keys {
            self.record_reference_key(key);
        }
        let id = self.flow.alloc(FlowNodeKind::Condition {
            kind,
            antecedent,
            expression,
        });
        self.thread_except_targets(id);
        id
    }

    /// Create an assignment flow node for `target` and make it current.
    ///
    /// Bare-name targets resolve to their symbol; member-access targets
    /// stay indeterminate for later flow analysis. With `unbind`, an
    /// already-attached flow node on the target is retained so an
    /// except-clause name becomes unbound at clause end without erasing
    /// its in-clause flow.
    pub(crate) fn create_flow_assignment(
        &mut self,
        arena: &AstArena,
        target: NodeIndex,
        unbind: bool,
    ) -> FlowNodeId {
        let target_symbol = match arena.kind(target) {
            Some(NodeKind::Name(name)) => self
                .scopes
                .look_up_recursive(self.current_scope, &name.id)
                .map_or(AssignmentTarget::Indeterminate, |found| {
                    AssignmentTarget::Symbol(found.symbol)
                }),
            _ => AssignmentTarget::Indeterminate,
        };
        if let Some(key) = reference_key(arena, target) {
            self.record_reference_key(key);
        }
        let id = self.flow.alloc(FlowNodeKind::Assignment {
            node: target,
            antecedent: self.current_flow,
            target: target_symbol,
            unbind,
        });
        self.thread_except_targets(id);
        if !(unbind && self.node_flow.contains_key(&target)) {
            self.node_flow.insert(target, id);
        }
        self.current_flow = id;
        id
    }

    /// Create an assignment-alias flow node threading narrowing through a
    /// comprehension target that shadows an outer name.
    pub(crate) fn create_flow_assignment_alias(
        &mut self,
        target: crate::symbol::SymbolId,
        alias: crate::symbol::SymbolId,
    ) -> FlowNodeId {
        let id = self.flow.alloc(FlowNodeKind::AssignmentAlias {
            antecedent: self.current_flow,
            target,
            alias,
        });
        self.thread_except_targets(id);
        self.current_flow = id;
        id
    }

    /// Create a call flow node and make it current.
    pub(crate) fn create_flow_call(&mut self, node: NodeIndex) -> FlowNodeId {
        let id = self.flow.alloc(FlowNodeKind::Call {
            antecedent: self.current_flow,
            node,
        });
        self.thread_except_targets(id);
        self.current_flow = id;
        id
    }

    /// Create a wildcard-import flow node covering `names`.
    pub(crate) fn create_flow_wildcard_import(
        &mut self,
        node: NodeIndex,
        names: Vec<String>,
    ) -> FlowNodeId {
        for name in &names {
            self.record_reference_key(name.clone());
        }
        let id = self.flow.alloc(FlowNodeKind::WildcardImport {
            antecedent: self.current_flow,
            node,
            names,
        });
        self.thread_except_targets(id);
        self.current_flow = id;
        id
    }

    /// Bind `expression` as a branch condition feeding `true_target` /
    /// `false_target`. Logical connectives (`and`/`or`/`not`) route
    /// through their operands; every other shape gets a condition pair.
    pub(crate) fn bind_conditional(
        &mut self,
        arena: &AstArena,
        expression: NodeIndex,
        true_target: FlowNodeId,
        false_target: FlowNodeId,
    ) {
        let saved_true = self.current_true_target.replace(true_target);
        let saved_false = self.current_false_target.replace(false_target);

        self.bind_expression(arena, expression);

        self.current_true_target = saved_true;
        self.current_false_target = saved_false;

        if !Self::is_logical_connective(arena, expression) {
            let true_flow = self.create_flow_condition(
                ConditionKind::TrueCondition,
                self.current_flow,
                arena,
                expression,
            );
            self.add_antecedent(true_target, true_flow);
            let false_flow = self.create_flow_condition(
                ConditionKind::FalseCondition,
                self.current_flow,
                arena,
                expression,
            );
            self.add_antecedent(false_target, false_flow);
        }
    }

    /// `and`/`or`/`not` act as flow connectives rather than plain
    /// expressions when a conditional target is active.
    pub(crate) fn is_logical_connective(arena: &AstArena, expression: NodeIndex) -> bool {
        match arena.kind(expression) {
            Some(NodeKind::BoolOp(_)) => true,
            Some(NodeKind::UnaryOp(unary)) => unary.op == pyrite_ast::UnaryOperator::Not,
            _ => false,
        }
    }
}
