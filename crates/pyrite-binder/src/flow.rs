//! Control-flow graph nodes.
//!
//! Flow nodes form a dense, cyclic graph (labels point back at their
//! antecedents, loop labels receive back-edges). They live in a per-file
//! [`FlowArena`] and reference each other by [`FlowNodeId`]; the
//! `PostFinally` to `PreFinallyGate` back-edge is an id, not a pointer.

use crate::symbol::SymbolId;
use pyrite_ast::NodeIndex;
use smallvec::SmallVec;

/// Identifier of a flow node within one binder's [`FlowArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowNodeId(pub u32);

impl FlowNodeId {
    /// The unreachable singleton occupies slot 0 of every arena.
    pub const UNREACHABLE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn is_unreachable(self) -> bool {
        self.0 == 0
    }
}

/// Whether a condition node narrows along the true or false branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionKind {
    TrueCondition,
    FalseCondition,
}

impl ConditionKind {
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::TrueCondition => Self::FalseCondition,
            Self::FalseCondition => Self::TrueCondition,
        }
    }
}

/// Target of an assignment flow node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentTarget {
    /// A bare-name target, resolved to its symbol at binding time.
    Symbol(SymbolId),
    /// A member-access target; the concrete symbol is decided by later
    /// flow analysis.
    Indeterminate,
}

pub type AntecedentList = SmallVec<[FlowNodeId; 4]>;

/// The closed sum of flow node kinds.
#[derive(Clone, Debug)]
pub enum FlowNodeKind {
    /// Entry of a module or function body.
    Start,
    /// Nothing flows here. Singleton per arena, at slot 0.
    Unreachable,
    /// Join point for branches.
    BranchLabel { antecedents: AntecedentList },
    /// Join point that may receive back-edges.
    LoopLabel { antecedents: AntecedentList },
    Assignment {
        node: NodeIndex,
        antecedent: FlowNodeId,
        target: AssignmentTarget,
        /// The name becomes unbound at this point (except-clause name
        /// clearing, `del`).
        unbind: bool,
    },
    /// Threads narrowing through a comprehension target that shadows an
    /// outer name.
    AssignmentAlias {
        antecedent: FlowNodeId,
        target: SymbolId,
        alias: SymbolId,
    },
    /// A call whose callee may never return.
    Call {
        antecedent: FlowNodeId,
        node: NodeIndex,
    },
    /// A branch condition over a narrowable expression.
    Condition {
        kind: ConditionKind,
        antecedent: FlowNodeId,
        expression: NodeIndex,
    },
    /// Guards entry into a `finally` suite from an intercepted
    /// return/raise. `is_gate_closed` is toggled by the narrowing
    /// traversal, never by the binder.
    PreFinallyGate {
        antecedent: FlowNodeId,
        is_gate_closed: bool,
    },
    /// Exit of a `finally` suite; `gate` is the paired `PreFinallyGate`.
    PostFinally {
        antecedent: FlowNodeId,
        gate: FlowNodeId,
    },
    WildcardImport {
        antecedent: FlowNodeId,
        node: NodeIndex,
        names: Vec<String>,
    },
}

#[derive(Clone, Debug)]
pub struct FlowNode {
    pub kind: FlowNodeKind,
}

/// Per-file arena of flow nodes.
#[derive(Debug)]
pub struct FlowArena {
    nodes: Vec<FlowNode>,
}

impl Default for FlowArena {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowArena {
    /// Create an arena with the unreachable singleton installed at slot 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![FlowNode {
                kind: FlowNodeKind::Unreachable,
            }],
        }
    }

    pub fn alloc(&mut self, kind: FlowNodeKind) -> FlowNodeId {
        let id = FlowNodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(FlowNode { kind });
        id
    }

    #[must_use]
    pub fn get(&self, id: FlowNodeId) -> Option<&FlowNode> {
        self.nodes.get(id.0 as usize)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: FlowNodeId) -> Option<&mut FlowNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Antecedents of a label node; empty for any other kind.
    #[must_use]
    pub fn antecedents(&self, id: FlowNodeId) -> &[FlowNodeId] {
        match self.get(id).map(|n| &n.kind) {
            Some(
                FlowNodeKind::BranchLabel { antecedents } | FlowNodeKind::LoopLabel { antecedents },
            ) => antecedents,
            _ => &[],
        }
    }

    /// Add an antecedent to a label, skipping unreachable antecedents and
    /// deduplicating by id.
    pub fn add_antecedent(&mut self, label: FlowNodeId, antecedent: FlowNodeId) {
        if antecedent.is_unreachable() {
            return;
        }
        if let Some(node) = self.get_mut(label) {
            match &mut node.kind {
                FlowNodeKind::BranchLabel { antecedents }
                | FlowNodeKind::LoopLabel { antecedents } => {
                    if !antecedents.contains(&antecedent) {
                        antecedents.push(antecedent);
                    }
                }
                _ => debug_assert!(false, "antecedent added to a non-label flow node"),
            }
        }
    }

    /// Toggle a `PreFinallyGate`. Called by the narrowing traversal while
    /// it walks through a `PostFinally` node.
    pub fn set_gate_closed(&mut self, gate: FlowNodeId, closed: bool) {
        if let Some(node) = self.get_mut(gate) {
            if let FlowNodeKind::PreFinallyGate { is_gate_closed, .. } = &mut node.kind {
                *is_gate_closed = closed;
            }
        }
    }
}
