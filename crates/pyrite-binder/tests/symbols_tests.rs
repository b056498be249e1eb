//! Symbol, declaration and flag tests.

use pyrite_ast::{AstArena, AstBuilder, NodeIndex};
use pyrite_binder::{
    BindResult, Binder, BuiltinsScope, Declaration, FileInfo, symbol_flags,
};

fn file_info() -> FileInfo<'static> {
    let mut info = FileInfo::new("test.py", "test");
    info.builtins = Some(BuiltinsScope::from_names(["int", "object", "classmethod"]));
    info
}

fn bind(builder: AstBuilder, module: NodeIndex) -> (AstArena, BindResult) {
    let arena = builder.finish();
    let result = Binder::new(file_info()).bind_module(&arena, module);
    (arena, result)
}

fn bind_with(builder: AstBuilder, module: NodeIndex, info: FileInfo<'_>) -> BindResult {
    let arena = builder.finish();
    Binder::new(info).bind_module(&arena, module)
}

#[test]
fn repeated_assignment_appends_declarations_in_source_order() {
    // x = 1
    // x = 2
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let a1 = b.assign_name("x", one);
    let two = b.int(2);
    let a2 = b.assign_name("x", two);
    let module = b.module(vec![a1, a2]);
    let (_, result) = bind(b, module);

    let symbol = result.module_symbol_id("x").unwrap();
    let decls = result.declarations_of(symbol);
    assert_eq!(decls.len(), 2);
    let first = decls[0].range();
    let second = decls[1].range();
    assert!(first.start < second.start, "declaration ranges follow source order");
}

#[test]
fn function_then_variable_declaration_order() {
    // def f(): pass
    // f = 1
    let mut b = AstBuilder::new();
    let pass = b.pass_stmt();
    let func = b.func_def("f", vec![], vec![pass]);
    let one = b.int(1);
    let assign = b.assign_name("f", one);
    let module = b.module(vec![func, assign]);
    let (_, result) = bind(b, module);

    let symbol = result.module_symbol_id("f").unwrap();
    let decls = result.declarations_of(symbol);
    assert_eq!(decls.len(), 2);
    assert!(matches!(decls[0], Declaration::Function(_)));
    assert!(matches!(decls[1], Declaration::Variable(_)));
}

#[test]
fn class_body_symbols_are_class_members() {
    // class C:
    //     attr = 1
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let attr_assign = b.assign_name("attr", one);
    let class = b.class_def("C", vec![], vec![attr_assign]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    let attr = result.scopes.get(class_scope).unwrap().table.get("attr").unwrap();
    assert!(
        result
            .symbols
            .get(attr)
            .unwrap()
            .has_flag(symbol_flags::CLASS_MEMBER)
    );
    // The class name itself carries a class declaration.
    let class_symbol = result.module_symbol("C").unwrap();
    assert!(matches!(
        result.declarations.get(class_symbol.declarations[0]),
        Some(Declaration::Class(_))
    ));
}

#[test]
fn self_assignment_declares_instance_member() {
    // class C:
    //     def __init__(self):
    //         self.x = 1
    let mut b = AstBuilder::new();
    let self_param = b.param("self");
    let self_use = b.name("self");
    let target = b.attr(self_use, "x");
    let one = b.int(1);
    let assign = b.assign(target, one);
    let init = b.func_def("__init__", vec![self_param], vec![assign]);
    let class = b.class_def("C", vec![], vec![init]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    let x = result
        .scopes
        .get(class_scope)
        .unwrap()
        .table
        .get("x")
        .expect("self.x declares x on the class");
    let symbol = result.symbols.get(x).unwrap();
    assert!(symbol.has_flag(symbol_flags::INSTANCE_MEMBER));
    let decls = result.declarations_of(x);
    assert!(matches!(
        decls[0],
        Declaration::Variable(v) if v.is_defined_by_member_access
    ));
}

#[test]
fn classmethod_cls_assignment_declares_class_member() {
    // class C:
    //     @classmethod
    //     def make(cls):
    //         cls.count = 0
    let mut b = AstBuilder::new();
    let decorator = b.name("classmethod");
    let cls_param = b.param("cls");
    let cls_use = b.name("cls");
    let target = b.attr(cls_use, "count");
    let zero = b.int(0);
    let assign = b.assign(target, zero);
    let make = b.func_def_decorated("make", vec![decorator], vec![cls_param], vec![assign]);
    let class = b.class_def("C", vec![], vec![make]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    let count = result.scopes.get(class_scope).unwrap().table.get("count").unwrap();
    let symbol = result.symbols.get(count).unwrap();
    assert!(symbol.has_flag(symbol_flags::CLASS_MEMBER));
    assert!(!symbol.has_flag(symbol_flags::INSTANCE_MEMBER));
}

#[test]
fn stub_private_names_are_externally_hidden() {
    // _internal = 1   (in a stub file)
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let assign = b.assign_name("_internal", one);
    let module = b.module(vec![assign]);
    let mut info = FileInfo::new("test.pyi", "test");
    info.is_stub_file = true;
    let result = bind_with(b, module, info);

    let symbol = result.module_symbol("_internal").unwrap();
    assert!(symbol.has_flag(symbol_flags::EXTERNALLY_HIDDEN));
    assert!(symbol.has_flag(symbol_flags::PRIVATE_MEMBER));
}

#[test]
fn dunder_names_are_not_private() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let assign = b.assign_name("__version__", one);
    let module = b.module(vec![assign]);
    let mut info = FileInfo::new("test.pyi", "test");
    info.is_stub_file = true;
    let result = bind_with(b, module, info);

    let symbol = result.module_symbol("__version__").unwrap();
    assert!(!symbol.has_flag(symbol_flags::EXTERNALLY_HIDDEN));
}

#[test]
fn typing_stub_special_form_assignment() {
    // Tuple = object()   (inside the typing stub)
    let mut b = AstBuilder::new();
    let value = b.call_name("object", vec![]);
    let assign = b.assign_name("Tuple", value);
    let module = b.module(vec![assign]);
    let mut info = FileInfo::new("typing.pyi", "typing");
    info.is_stub_file = true;
    info.is_typing_stub_file = true;
    let result = bind_with(b, module, info);

    let symbol = result.module_symbol("Tuple").unwrap();
    let decls = result.declarations_of(result.module_symbol_id("Tuple").unwrap());
    assert_eq!(decls.len(), 1);
    assert!(matches!(decls[0], Declaration::SpecialBuiltInClass(_)));
    assert_eq!(symbol.declarations.len(), 1);
}

#[test]
fn ordinary_module_does_not_get_special_forms() {
    let mut b = AstBuilder::new();
    let value = b.call_name("object", vec![]);
    let assign = b.assign_name("Tuple", value);
    let module = b.module(vec![assign]);
    let (_, result) = bind(b, module);

    let decls = result.declarations_of(result.module_symbol_id("Tuple").unwrap());
    assert!(matches!(decls[0], Declaration::Variable(_)));
}

#[test]
fn final_annotation_captures_inner_type() {
    // class C:
    //     x: Final[int]
    let mut b = AstBuilder::new();
    let target = b.name("x");
    let final_name = b.name("Final");
    let int_name = b.name("int");
    let annotation = b.subscript(final_name, int_name);
    let ann = b.ann_assign(target, annotation, NodeIndex::NONE);
    let class = b.class_def("C", vec![], vec![ann]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    let x = result.scopes.get(class_scope).unwrap().table.get("x").unwrap();
    let symbol = result.symbols.get(x).unwrap();
    // A bare Final at class body top level still marks an instance member.
    assert!(symbol.has_flag(symbol_flags::INSTANCE_MEMBER));
    let decls = result.declarations_of(x);
    assert!(matches!(
        decls[0],
        Declaration::Variable(v) if v.is_final && v.type_annotation == int_name
    ));
}

#[test]
fn class_var_annotation_sets_flag() {
    // class C:
    //     n: ClassVar[int] = 0
    let mut b = AstBuilder::new();
    let target = b.name("n");
    let class_var = b.name("ClassVar");
    let int_name = b.name("int");
    let annotation = b.subscript(class_var, int_name);
    let zero = b.int(0);
    let ann = b.ann_assign(target, annotation, zero);
    let class = b.class_def("C", vec![], vec![ann]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    let n = result.scopes.get(class_scope).unwrap().table.get("n").unwrap();
    assert!(result.symbols.get(n).unwrap().has_flag(symbol_flags::CLASS_VAR));
}

#[test]
fn type_alias_annotation_outside_module_scope_is_reported() {
    // def f():
    //     x: TypeAlias = int
    let mut b = AstBuilder::new();
    let target = b.name("x");
    let annotation = b.name("TypeAlias");
    let int_name = b.name("int");
    let ann = b.ann_assign(target, annotation, int_name);
    let func = b.func_def("f", vec![], vec![ann]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "type-alias-not-module-level")
    );
}

#[test]
fn module_level_type_alias_annotation_is_recorded() {
    // Alias: TypeAlias = int
    let mut b = AstBuilder::new();
    let target = b.name("Alias");
    let annotation = b.name("TypeAlias");
    let int_name = b.name("int");
    let ann = b.ann_assign(target, annotation, int_name);
    let module = b.module(vec![ann]);
    let (_, result) = bind(b, module);

    assert!(result.diagnostics.is_empty());
    let decls = result.declarations_of(result.module_symbol_id("Alias").unwrap());
    assert!(matches!(
        decls[0],
        Declaration::Variable(v)
            if v.type_alias_name.as_deref() == Some("Alias") && v.type_alias_annotation.is_some()
    ));
}

#[test]
fn possible_type_alias_marking_at_module_scope() {
    // NotAlias = f()
    // MaybeAlias = int
    let mut b = AstBuilder::new();
    let call = b.call_name("f", vec![]);
    let not_alias = b.assign_name("NotAlias", call);
    let int_name = b.name("int");
    let maybe_alias = b.assign_name("MaybeAlias", int_name);
    let module = b.module(vec![not_alias, maybe_alias]);
    let (_, result) = bind(b, module);

    let not_alias_decls = result.declarations_of(result.module_symbol_id("NotAlias").unwrap());
    assert!(matches!(
        not_alias_decls[0],
        Declaration::Variable(v) if v.type_alias_name.is_none()
    ));
    let maybe_decls = result.declarations_of(result.module_symbol_id("MaybeAlias").unwrap());
    assert!(matches!(
        maybe_decls[0],
        Declaration::Variable(v) if v.type_alias_name.as_deref() == Some("MaybeAlias")
    ));
}

#[test]
fn parameters_get_declarations_and_bindings() {
    // def f(a, b=1): pass
    let mut b = AstBuilder::new();
    let a_param = b.param("a");
    let one = b.int(1);
    let b_param = b.param_full("b", NodeIndex::NONE, one, pyrite_ast::ParameterCategory::Simple);
    let pass = b.pass_stmt();
    let func = b.func_def("f", vec![a_param, b_param], vec![pass]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    let func_scope = *result.node_scopes.get(&func).unwrap();
    for (name, param) in [("a", a_param), ("b", b_param)] {
        let symbol = result.scopes.get(func_scope).unwrap().table.get(name).unwrap();
        let decls = result.declarations_of(symbol);
        assert_eq!(decls.len(), 1);
        assert!(matches!(decls[0], Declaration::Parameter(_)));
        assert!(result.node_declarations.contains_key(&param));
    }
}

#[test]
fn bare_annotation_registers_reference_key() {
    // x: int
    let mut b = AstBuilder::new();
    let target = b.name("x");
    let int_name = b.name("int");
    let ann = b.ann_assign(target, int_name, NodeIndex::NONE);
    let module = b.module(vec![ann]);
    let (_, result) = bind(b, module);

    assert!(result.reference_keys(result.module_scope).unwrap().contains("x"));
    // No assignment flow was produced for the bare annotation.
    let symbol = result.module_symbol("x").unwrap();
    assert_eq!(symbol.declarations.len(), 1);
}

#[test]
fn aug_assign_records_inferred_declaration() {
    // x = 1
    // x += 2
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let assign = b.assign_name("x", one);
    let x = b.name("x");
    let two = b.int(2);
    let aug = b.aug_assign(x, pyrite_ast::BinaryOperator::Add, two);
    let module = b.module(vec![assign, aug]);
    let (_, result) = bind(b, module);

    let decls = result.declarations_of(result.module_symbol_id("x").unwrap());
    assert_eq!(decls.len(), 2);
    assert!(result.reference_keys(result.module_scope).unwrap().contains("x"));
}

#[test]
fn with_targets_are_bound_and_declared() {
    // with open() as fh:
    //     pass
    let mut b = AstBuilder::new();
    let ctx = b.call_name("open", vec![]);
    let fh = b.name("fh");
    let item = b.with_item(ctx, fh);
    let pass = b.pass_stmt();
    let with_stmt = b.with_stmt(vec![item], vec![pass]);
    let module = b.module(vec![with_stmt]);
    let (_, result) = bind(b, module);

    let decls = result.declarations_of(result.module_symbol_id("fh").unwrap());
    assert_eq!(decls.len(), 1);
    assert!(matches!(
        decls[0],
        Declaration::Variable(v) if v.inferred_type_source == ctx
    ));
}

#[test]
fn tuple_targets_bind_every_name() {
    // a, (b, c) = value
    let mut b = AstBuilder::new();
    let a = b.name("a");
    let b_name = b.name("b");
    let c = b.name("c");
    let inner = b.tuple(vec![b_name, c]);
    let target = b.tuple(vec![a, inner]);
    let value = b.name("value");
    let assign = b.assign(target, value);
    let module = b.module(vec![assign]);
    let (_, result) = bind(b, module);

    for name in ["a", "b", "c"] {
        let symbol = result.module_symbol(name).unwrap_or_else(|| panic!("missing {name}"));
        assert_eq!(symbol.declarations.len(), 1);
    }
}

#[test]
fn string_literal_errors_are_surfaced() {
    use pyrite_ast::{StringError, StringErrorKind};
    use pyrite_common::Span;

    let mut b = AstBuilder::new();
    let part = b.string_part(
        "bad \\q escape",
        vec![StringError {
            kind: StringErrorKind::UnsupportedEscape,
            range: Span::new(4, 6),
        }],
    );
    let list = b.string_list(vec![part]);
    let stmt = b.expr_stmt(list);
    let module = b.module(vec![stmt]);
    let (arena, result) = bind(b, module);

    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.rule == "string-escape")
        .expect("escape error surfaced");
    // Reported at the sub-string offset, relative to the part's span.
    assert_eq!(diag.span.start, arena.span(part).start + 4);
}
