//! Programmatic tree construction.
//!
//! The parser is a separate component; tests (and tools that synthesize
//! code) build trees through this builder instead. Spans are synthesized
//! from a running counter, so node creation order stands in for source
//! order.

use crate::node::*;
use crate::ops::*;
use pyrite_common::Span;

/// Builds an [`AstArena`] bottom-up with terse constructors.
#[derive(Debug, Default)]
pub struct AstBuilder {
    arena: AstArena,
    pos: u32,
}

impl AstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the builder, yielding the finished arena.
    #[must_use]
    pub fn finish(self) -> AstArena {
        self.arena
    }

    #[must_use]
    pub fn arena(&self) -> &AstArena {
        &self.arena
    }

    fn add(&mut self, kind: NodeKind) -> NodeIndex {
        let span = Span::from_len(self.pos, 1);
        self.pos += 1;
        self.arena.add(span, kind)
    }

    // ===== Expressions =====

    pub fn name(&mut self, id: &str) -> NodeIndex {
        self.add(NodeKind::Name(NameData { id: id.to_string() }))
    }

    pub fn attr(&mut self, value: NodeIndex, attr: &str) -> NodeIndex {
        self.add(NodeKind::Attribute(AttributeData {
            value,
            attr: attr.to_string(),
        }))
    }

    pub fn subscript(&mut self, value: NodeIndex, index: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Subscript(SubscriptData { value, index }))
    }

    pub fn int(&mut self, value: i64) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::Int(value),
        }))
    }

    pub fn str_lit(&mut self, value: &str) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::Str(value.to_string()),
        }))
    }

    pub fn none(&mut self) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::None,
        }))
    }

    pub fn true_lit(&mut self) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::True,
        }))
    }

    pub fn false_lit(&mut self) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::False,
        }))
    }

    pub fn ellipsis(&mut self) -> NodeIndex {
        self.add(NodeKind::Constant(ConstantData {
            value: ConstantValue::Ellipsis,
        }))
    }

    pub fn string_part(&mut self, value: &str, errors: Vec<StringError>) -> NodeIndex {
        self.add(NodeKind::StringPart(StringPartData {
            value: value.to_string(),
            errors,
        }))
    }

    pub fn string_list(&mut self, parts: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::StringList(StringListData { parts }))
    }

    pub fn tuple(&mut self, elements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Tuple(TupleData { elements }))
    }

    pub fn list(&mut self, elements: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::List(ListData { elements }))
    }

    pub fn starred(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Starred(StarredData { value }))
    }

    pub fn call(&mut self, func: NodeIndex, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Call(CallData { func, arguments }))
    }

    pub fn call_name(&mut self, func: &str, arguments: Vec<NodeIndex>) -> NodeIndex {
        let func = self.name(func);
        self.call(func, arguments)
    }

    pub fn keyword(&mut self, name: Option<&str>, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Keyword(KeywordData {
            name: name.map(str::to_string),
            value,
        }))
    }

    pub fn bool_and(&mut self, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add(NodeKind::BoolOp(BoolOpData {
            op: BoolOperator::And,
            left,
            right,
        }))
    }

    pub fn bool_or(&mut self, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add(NodeKind::BoolOp(BoolOpData {
            op: BoolOperator::Or,
            left,
            right,
        }))
    }

    pub fn not_op(&mut self, operand: NodeIndex) -> NodeIndex {
        self.add(NodeKind::UnaryOp(UnaryOpData {
            op: UnaryOperator::Not,
            operand,
        }))
    }

    pub fn bin_op(&mut self, left: NodeIndex, op: BinaryOperator, right: NodeIndex) -> NodeIndex {
        self.add(NodeKind::BinOp(BinOpData { left, op, right }))
    }

    pub fn compare(&mut self, left: NodeIndex, op: CompareOperator, right: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Compare(CompareData {
            left,
            ops: vec![op],
            comparators: vec![right],
        }))
    }

    pub fn named_expr(&mut self, target: &str, value: NodeIndex) -> NodeIndex {
        let target = self.name(target);
        self.add(NodeKind::NamedExpr(NamedExprData { target, value }))
    }

    pub fn await_expr(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Await(AwaitData { value }))
    }

    pub fn yield_expr(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Yield(YieldData { value }))
    }

    pub fn yield_from(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::YieldFrom(YieldFromData { value }))
    }

    pub fn ternary(&mut self, test: NodeIndex, body: NodeIndex, orelse: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Ternary(TernaryData { test, body, orelse }))
    }

    pub fn lambda(&mut self, parameters: Vec<NodeIndex>, body: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Lambda(LambdaData { parameters, body }))
    }

    pub fn comp_for(&mut self, target: NodeIndex, iterable: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ComprehensionFor(ComprehensionForData {
            target,
            iterable,
            is_async: false,
        }))
    }

    pub fn comp_if(&mut self, test: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ComprehensionIf(ComprehensionIfData { test }))
    }

    pub fn comprehension(
        &mut self,
        kind: ComprehensionKind,
        element: NodeIndex,
        clauses: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::Comprehension(ComprehensionData {
            kind,
            element,
            element_value: NodeIndex::NONE,
            clauses,
        }))
    }

    pub fn list_comp(&mut self, element: NodeIndex, clauses: Vec<NodeIndex>) -> NodeIndex {
        self.comprehension(ComprehensionKind::List, element, clauses)
    }

    // ===== Statements =====

    pub fn module(&mut self, body: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Module(ModuleData { body }))
    }

    pub fn expr_stmt(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ExprStmt(ExprStmtData { value }))
    }

    pub fn assign(&mut self, target: NodeIndex, value: NodeIndex) -> NodeIndex {
        self.assign_many(vec![target], value)
    }

    pub fn assign_many(&mut self, targets: Vec<NodeIndex>, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Assign(AssignData {
            targets,
            value,
            type_comment: NodeIndex::NONE,
        }))
    }

    pub fn assign_name(&mut self, target: &str, value: NodeIndex) -> NodeIndex {
        let target = self.name(target);
        self.assign(target, value)
    }

    pub fn ann_assign(
        &mut self,
        target: NodeIndex,
        annotation: NodeIndex,
        value: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeKind::AnnAssign(AnnAssignData {
            target,
            annotation,
            value,
        }))
    }

    pub fn aug_assign(
        &mut self,
        target: NodeIndex,
        op: BinaryOperator,
        value: NodeIndex,
    ) -> NodeIndex {
        self.add(NodeKind::AugAssign(AugAssignData { target, op, value }))
    }

    pub fn if_stmt(
        &mut self,
        test: NodeIndex,
        body: Vec<NodeIndex>,
        orelse: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::If(IfData { test, body, orelse }))
    }

    pub fn while_stmt(
        &mut self,
        test: NodeIndex,
        body: Vec<NodeIndex>,
        orelse: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::While(WhileData { test, body, orelse }))
    }

    pub fn for_stmt(
        &mut self,
        target: NodeIndex,
        iterable: NodeIndex,
        body: Vec<NodeIndex>,
        orelse: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::For(ForData {
            target,
            iterable,
            body,
            orelse,
            is_async: false,
        }))
    }

    pub fn with_item(&mut self, context: NodeIndex, target: NodeIndex) -> NodeIndex {
        self.add(NodeKind::WithItem(WithItemData { context, target }))
    }

    pub fn with_stmt(&mut self, items: Vec<NodeIndex>, body: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::With(WithData {
            items,
            body,
            is_async: false,
        }))
    }

    pub fn param(&mut self, name: &str) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::Parameter(ParameterData {
            name,
            annotation: NodeIndex::NONE,
            default: NodeIndex::NONE,
            category: ParameterCategory::Simple,
        }))
    }

    pub fn param_full(
        &mut self,
        name: &str,
        annotation: NodeIndex,
        default: NodeIndex,
        category: ParameterCategory,
    ) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::Parameter(ParameterData {
            name,
            annotation,
            default,
            category,
        }))
    }

    pub fn func_def(&mut self, name: &str, parameters: Vec<NodeIndex>, body: Vec<NodeIndex>) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::FunctionDef(FunctionDefData {
            name,
            decorators: Vec::new(),
            parameters,
            return_annotation: NodeIndex::NONE,
            body,
            is_async: false,
        }))
    }

    pub fn async_func_def(
        &mut self,
        name: &str,
        parameters: Vec<NodeIndex>,
        body: Vec<NodeIndex>,
    ) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::FunctionDef(FunctionDefData {
            name,
            decorators: Vec::new(),
            parameters,
            return_annotation: NodeIndex::NONE,
            body,
            is_async: true,
        }))
    }

    pub fn func_def_decorated(
        &mut self,
        name: &str,
        decorators: Vec<NodeIndex>,
        parameters: Vec<NodeIndex>,
        body: Vec<NodeIndex>,
    ) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::FunctionDef(FunctionDefData {
            name,
            decorators,
            parameters,
            return_annotation: NodeIndex::NONE,
            body,
            is_async: false,
        }))
    }

    pub fn class_def(
        &mut self,
        name: &str,
        arguments: Vec<NodeIndex>,
        body: Vec<NodeIndex>,
    ) -> NodeIndex {
        let name = self.name(name);
        self.add(NodeKind::ClassDef(ClassDefData {
            name,
            decorators: Vec::new(),
            arguments,
            body,
        }))
    }

    pub fn return_stmt(&mut self, value: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Return(ReturnData { value }))
    }

    pub fn return_none(&mut self) -> NodeIndex {
        self.add(NodeKind::Return(ReturnData {
            value: NodeIndex::NONE,
        }))
    }

    pub fn raise_stmt(&mut self, exc: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Raise(RaiseData {
            exc,
            cause: NodeIndex::NONE,
        }))
    }

    pub fn bare_raise(&mut self) -> NodeIndex {
        self.add(NodeKind::Raise(RaiseData {
            exc: NodeIndex::NONE,
            cause: NodeIndex::NONE,
        }))
    }

    pub fn try_stmt(
        &mut self,
        body: Vec<NodeIndex>,
        handlers: Vec<NodeIndex>,
        orelse: Vec<NodeIndex>,
        finally: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add(NodeKind::Try(TryData {
            body,
            handlers,
            orelse,
            finally,
        }))
    }

    pub fn except_clause(
        &mut self,
        test: NodeIndex,
        name: Option<&str>,
        body: Vec<NodeIndex>,
    ) -> NodeIndex {
        let name = match name {
            Some(name) => self.name(name),
            None => NodeIndex::NONE,
        };
        self.add(NodeKind::ExceptClause(ExceptClauseData { test, name, body }))
    }

    pub fn global_stmt(&mut self, names: &[&str]) -> NodeIndex {
        let names = names.iter().map(|n| self.name(n)).collect();
        self.add(NodeKind::Global(GlobalData { names }))
    }

    pub fn nonlocal_stmt(&mut self, names: &[&str]) -> NodeIndex {
        let names = names.iter().map(|n| self.name(n)).collect();
        self.add(NodeKind::Nonlocal(NonlocalData { names }))
    }

    pub fn del_stmt(&mut self, targets: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Del(DelData { targets }))
    }

    pub fn assert_stmt(&mut self, test: NodeIndex, message: NodeIndex) -> NodeIndex {
        self.add(NodeKind::Assert(AssertData { test, message }))
    }

    pub fn pass_stmt(&mut self) -> NodeIndex {
        self.add(NodeKind::Pass)
    }

    pub fn break_stmt(&mut self) -> NodeIndex {
        self.add(NodeKind::Break)
    }

    pub fn continue_stmt(&mut self) -> NodeIndex {
        self.add(NodeKind::Continue)
    }

    // ===== Imports =====

    pub fn module_name(&mut self, leading_dots: u32, parts: &[&str]) -> NodeIndex {
        let parts = parts.iter().map(|p| self.name(p)).collect();
        self.add(NodeKind::ModuleName(ModuleNameData {
            leading_dots,
            parts,
        }))
    }

    pub fn import_as(&mut self, module: NodeIndex, alias: Option<&str>) -> NodeIndex {
        let alias = match alias {
            Some(alias) => self.name(alias),
            None => NodeIndex::NONE,
        };
        self.add(NodeKind::ImportAs(ImportAsData { module, alias }))
    }

    pub fn import_stmt(&mut self, aliases: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::Import(ImportData { aliases }))
    }

    pub fn import_from_as(&mut self, name: &str, alias: Option<&str>) -> NodeIndex {
        let name = self.name(name);
        let alias = match alias {
            Some(alias) => self.name(alias),
            None => NodeIndex::NONE,
        };
        self.add(NodeKind::ImportFromAs(ImportFromAsData { name, alias }))
    }

    pub fn import_from(&mut self, module: NodeIndex, imports: Vec<NodeIndex>) -> NodeIndex {
        self.add(NodeKind::ImportFrom(ImportFromData {
            module,
            imports,
            is_wildcard: false,
        }))
    }

    pub fn wildcard_import_from(&mut self, module: NodeIndex) -> NodeIndex {
        self.add(NodeKind::ImportFrom(ImportFromData {
            module,
            imports: Vec::new(),
            is_wildcard: true,
        }))
    }
}
