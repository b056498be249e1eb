//! The node arena.
//!
//! Nodes live in a flat `Vec` and reference each other by [`NodeIndex`].
//! The tree is immutable once built; every later pass (binding, inference)
//! attaches its results through side-tables keyed by `NodeIndex` rather
//! than by mutating nodes.

use crate::ops::{
    BinaryOperator, BoolOperator, CompareOperator, ComprehensionKind, ConstantValue,
    ParameterCategory, StringError, UnaryOperator,
};
use pyrite_common::Span;

/// Index of a node within its [`AstArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Sentinel for an absent child (e.g. a `return` with no value).
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

/// A single syntax-tree node: a source span plus a kind-tagged payload.
#[derive(Clone, Debug)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

// ===== Statement payloads =====

#[derive(Clone, Debug)]
pub struct ModuleData {
    pub body: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ClassDefData {
    /// `Name` node carrying the class name.
    pub name: NodeIndex,
    pub decorators: Vec<NodeIndex>,
    /// Base-class and keyword arguments, in source order.
    pub arguments: Vec<NodeIndex>,
    pub body: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct FunctionDefData {
    /// `Name` node carrying the function name.
    pub name: NodeIndex,
    pub decorators: Vec<NodeIndex>,
    /// `Parameter` nodes in declaration order.
    pub parameters: Vec<NodeIndex>,
    pub return_annotation: NodeIndex,
    pub body: Vec<NodeIndex>,
    pub is_async: bool,
}

#[derive(Clone, Debug)]
pub struct ParameterData {
    pub name: NodeIndex,
    pub annotation: NodeIndex,
    pub default: NodeIndex,
    pub category: ParameterCategory,
}

#[derive(Clone, Debug)]
pub struct LambdaData {
    pub parameters: Vec<NodeIndex>,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AssignData {
    pub targets: Vec<NodeIndex>,
    pub value: NodeIndex,
    /// Expression parsed from a trailing `# type:` comment, if any.
    pub type_comment: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AnnAssignData {
    pub target: NodeIndex,
    pub annotation: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AugAssignData {
    pub target: NodeIndex,
    pub op: BinaryOperator,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ForData {
    pub target: NodeIndex,
    pub iterable: NodeIndex,
    pub body: Vec<NodeIndex>,
    pub orelse: Vec<NodeIndex>,
    pub is_async: bool,
}

#[derive(Clone, Debug)]
pub struct WhileData {
    pub test: NodeIndex,
    pub body: Vec<NodeIndex>,
    pub orelse: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct IfData {
    pub test: NodeIndex,
    pub body: Vec<NodeIndex>,
    pub orelse: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct WithData {
    pub items: Vec<NodeIndex>,
    pub body: Vec<NodeIndex>,
    pub is_async: bool,
}

#[derive(Clone, Debug)]
pub struct WithItemData {
    pub context: NodeIndex,
    pub target: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct TryData {
    pub body: Vec<NodeIndex>,
    /// `ExceptClause` nodes in source order.
    pub handlers: Vec<NodeIndex>,
    pub orelse: Vec<NodeIndex>,
    pub finally: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ExceptClauseData {
    /// Caught exception type expression, `NONE` for a bare `except:`.
    pub test: NodeIndex,
    /// `Name` node bound via `as`, `NONE` when absent.
    pub name: NodeIndex,
    pub body: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct RaiseData {
    pub exc: NodeIndex,
    pub cause: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ReturnData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct GlobalData {
    pub names: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct NonlocalData {
    pub names: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ExprStmtData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct DelData {
    pub targets: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct AssertData {
    pub test: NodeIndex,
    pub message: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ImportData {
    /// `ImportAs` nodes, one per comma-separated clause.
    pub aliases: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ImportAsData {
    /// `ModuleName` node.
    pub module: NodeIndex,
    /// `Name` node for the `as` alias, `NONE` when absent.
    pub alias: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ModuleNameData {
    pub leading_dots: u32,
    /// `Name` nodes for each dotted part.
    pub parts: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ImportFromData {
    pub module: NodeIndex,
    /// `ImportFromAs` nodes; empty for a wildcard import.
    pub imports: Vec<NodeIndex>,
    pub is_wildcard: bool,
}

#[derive(Clone, Debug)]
pub struct ImportFromAsData {
    pub name: NodeIndex,
    pub alias: NodeIndex,
}

// ===== Expression payloads =====

#[derive(Clone, Debug)]
pub struct NameData {
    pub id: String,
}

#[derive(Clone, Debug)]
pub struct AttributeData {
    pub value: NodeIndex,
    pub attr: String,
}

#[derive(Clone, Debug)]
pub struct SubscriptData {
    pub value: NodeIndex,
    pub index: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct SliceData {
    pub lower: NodeIndex,
    pub upper: NodeIndex,
    pub step: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CallData {
    pub func: NodeIndex,
    /// Positional arguments and `Keyword` nodes, in source order.
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct KeywordData {
    pub name: Option<String>,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ConstantData {
    pub value: ConstantValue,
}

#[derive(Clone, Debug)]
pub struct StringListData {
    /// `StringPart` nodes for each adjacent literal.
    pub parts: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct StringPartData {
    pub value: String,
    pub errors: Vec<StringError>,
}

#[derive(Clone, Debug)]
pub struct TupleData {
    pub elements: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ListData {
    pub elements: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct StarredData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct BoolOpData {
    pub op: BoolOperator,
    pub left: NodeIndex,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct UnaryOpData {
    pub op: UnaryOperator,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct BinOpData {
    pub left: NodeIndex,
    pub op: BinaryOperator,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CompareData {
    pub left: NodeIndex,
    pub ops: Vec<CompareOperator>,
    pub comparators: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct NamedExprData {
    /// `Name` node being bound.
    pub target: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AwaitData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct YieldData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct YieldFromData {
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct TernaryData {
    pub test: NodeIndex,
    pub body: NodeIndex,
    pub orelse: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ComprehensionData {
    pub kind: ComprehensionKind,
    pub element: NodeIndex,
    /// Value expression for dict comprehensions, otherwise `NONE`.
    pub element_value: NodeIndex,
    /// Interleaved `ComprehensionFor` / `ComprehensionIf` clauses.
    pub clauses: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ComprehensionForData {
    pub target: NodeIndex,
    pub iterable: NodeIndex,
    pub is_async: bool,
}

#[derive(Clone, Debug)]
pub struct ComprehensionIfData {
    pub test: NodeIndex,
}

/// The closed sum of node kinds. The binder dispatches with one exhaustive
/// match over this enum.
#[derive(Clone, Debug)]
pub enum NodeKind {
    // Statements
    Module(ModuleData),
    ClassDef(ClassDefData),
    FunctionDef(FunctionDefData),
    Parameter(ParameterData),
    Assign(AssignData),
    AnnAssign(AnnAssignData),
    AugAssign(AugAssignData),
    For(ForData),
    While(WhileData),
    If(IfData),
    With(WithData),
    WithItem(WithItemData),
    Try(TryData),
    ExceptClause(ExceptClauseData),
    Raise(RaiseData),
    Return(ReturnData),
    Break,
    Continue,
    Pass,
    Global(GlobalData),
    Nonlocal(NonlocalData),
    ExprStmt(ExprStmtData),
    Del(DelData),
    Assert(AssertData),
    Import(ImportData),
    ImportAs(ImportAsData),
    ModuleName(ModuleNameData),
    ImportFrom(ImportFromData),
    ImportFromAs(ImportFromAsData),

    // Expressions
    Name(NameData),
    Attribute(AttributeData),
    Subscript(SubscriptData),
    Slice(SliceData),
    Call(CallData),
    Keyword(KeywordData),
    Constant(ConstantData),
    StringList(StringListData),
    StringPart(StringPartData),
    Tuple(TupleData),
    List(ListData),
    Starred(StarredData),
    BoolOp(BoolOpData),
    UnaryOp(UnaryOpData),
    BinOp(BinOpData),
    Compare(CompareData),
    NamedExpr(NamedExprData),
    Lambda(LambdaData),
    Await(AwaitData),
    Yield(YieldData),
    YieldFrom(YieldFromData),
    Ternary(TernaryData),
    Comprehension(ComprehensionData),
    ComprehensionFor(ComprehensionForData),
    ComprehensionIf(ComprehensionIfData),
}

/// Flat storage for one file's syntax tree.
#[derive(Debug, Default)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its index.
    pub fn add(&mut self, span: Span, kind: NodeKind) -> NodeIndex {
        let idx = NodeIndex(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node { span, kind });
        idx
    }

    #[must_use]
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get(idx.0 as usize)
    }

    #[must_use]
    pub fn kind(&self, idx: NodeIndex) -> Option<&NodeKind> {
        self.get(idx).map(|n| &n.kind)
    }

    #[must_use]
    pub fn span(&self, idx: NodeIndex) -> Span {
        self.get(idx).map_or_else(Span::dummy, |n| n.span)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Text of a `Name` node, or `None` for any other kind.
    #[must_use]
    pub fn name_text(&self, idx: NodeIndex) -> Option<&str> {
        match self.kind(idx)? {
            NodeKind::Name(name) => Some(&name.id),
            _ => None,
        }
    }

    /// The leading string expression of a statement suite, if the first
    /// statement is a bare string. Used for docstring extraction.
    #[must_use]
    pub fn leading_string(&self, body: &[NodeIndex]) -> Option<String> {
        let first = *body.first()?;
        let NodeKind::ExprStmt(expr_stmt) = self.kind(first)? else {
            return None;
        };
        match self.kind(expr_stmt.value)? {
            NodeKind::Constant(constant) => match &constant.value {
                ConstantValue::Str(text) => Some(text.clone()),
                _ => None,
            },
            NodeKind::StringList(list) => {
                let mut text = String::new();
                for &part in &list.parts {
                    if let Some(NodeKind::StringPart(part)) = self.kind(part) {
                        text.push_str(&part.value);
                    }
                }
                Some(text)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_roundtrip() {
        let mut arena = AstArena::new();
        let name = arena.add(
            Span::new(0, 1),
            NodeKind::Name(NameData { id: "x".to_string() }),
        );
        assert_eq!(name.0, 0);
        assert_eq!(arena.name_text(name), Some("x"));
        assert_eq!(arena.span(name), Span::new(0, 1));
        assert!(arena.get(NodeIndex::NONE).is_none());
    }

    #[test]
    fn none_index_is_distinguished() {
        assert!(NodeIndex::NONE.is_none());
        assert!(NodeIndex(0).is_some());
    }
}
