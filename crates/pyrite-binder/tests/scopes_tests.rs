//! Scope construction and name-resolution tests.

use pyrite_ast::{AstArena, AstBuilder, NodeIndex};
use pyrite_binder::{BindResult, Binder, BuiltinsScope, FileInfo, ScopeKind};

fn file_info() -> FileInfo<'static> {
    let mut info = FileInfo::new("test.py", "test");
    info.builtins = Some(BuiltinsScope::from_names(["print", "int", "len"]));
    info
}

fn bind(builder: AstBuilder, module: NodeIndex) -> (AstArena, BindResult) {
    let arena = builder.finish();
    let result = Binder::new(file_info()).bind_module(&arena, module);
    (arena, result)
}

#[test]
fn module_scope_hangs_off_builtins() {
    let mut b = AstBuilder::new();
    let module = b.module(vec![]);
    let (_, result) = bind(b, module);

    let scope = result.scopes.get(result.module_scope).unwrap();
    assert_eq!(scope.kind, ScopeKind::Module);
    let parent = result.scopes.get(scope.parent.unwrap()).unwrap();
    assert_eq!(parent.kind, ScopeKind::Builtin);
    assert!(parent.table.has("print"));

    // A file bound without a builtins scope is the builtins module itself.
    let mut b = AstBuilder::new();
    let module = b.module(vec![]);
    let arena = b.finish();
    let result = Binder::new(FileInfo::new("builtins.pyi", "builtins")).bind_module(&arena, module);
    let scope = result.scopes.get(result.module_scope).unwrap();
    assert_eq!(scope.kind, ScopeKind::Builtin);
    assert!(scope.parent.is_none());
}

#[test]
fn module_intrinsics_are_installed() {
    let mut b = AstBuilder::new();
    let module = b.module(vec![]);
    let (_, result) = bind(b, module);

    for name in ["__doc__", "__name__", "__file__", "__dict__", "__path__"] {
        let symbol = result.module_symbol(name).unwrap_or_else(|| panic!("missing {name}"));
        assert_eq!(symbol.declarations.len(), 1);
        assert!(matches!(
            result.declarations.get(symbol.declarations[0]),
            Some(pyrite_binder::Declaration::Intrinsic(_))
        ));
    }
}

#[test]
fn function_scope_parent_is_module() {
    let mut b = AstBuilder::new();
    let pass = b.pass_stmt();
    let func = b.func_def("f", vec![], vec![pass]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    let scope_id = *result.node_scopes.get(&func).unwrap();
    let scope = result.scopes.get(scope_id).unwrap();
    assert_eq!(scope.kind, ScopeKind::Function);
    assert_eq!(scope.parent, Some(result.module_scope));
}

#[test]
fn method_scope_skips_class_scope() {
    // class C:
    //     def m(self):
    //         pass
    let mut b = AstBuilder::new();
    let self_param = b.param("self");
    let pass = b.pass_stmt();
    let method = b.func_def("m", vec![self_param], vec![pass]);
    let class = b.class_def("C", vec![], vec![method]);
    let module = b.module(vec![class]);
    let (_, result) = bind(b, module);

    let class_scope = *result.node_scopes.get(&class).unwrap();
    assert_eq!(result.scopes.get(class_scope).unwrap().kind, ScopeKind::Class);
    assert_eq!(
        result.scopes.get(class_scope).unwrap().parent,
        Some(result.module_scope)
    );

    // The method's scope parent is the module scope, not the class scope.
    let method_scope = *result.node_scopes.get(&method).unwrap();
    assert_eq!(
        result.scopes.get(method_scope).unwrap().parent,
        Some(result.module_scope)
    );

    // The class body still binds the method name.
    assert!(result.scopes.get(class_scope).unwrap().table.has("m"));
}

#[test]
fn nested_class_scope_skips_enclosing_class() {
    // class Outer:
    //     class Inner:
    //         pass
    let mut b = AstBuilder::new();
    let pass = b.pass_stmt();
    let inner = b.class_def("Inner", vec![], vec![pass]);
    let outer = b.class_def("Outer", vec![], vec![inner]);
    let module = b.module(vec![outer]);
    let (_, result) = bind(b, module);

    let inner_scope = *result.node_scopes.get(&inner).unwrap();
    assert_eq!(
        result.scopes.get(inner_scope).unwrap().parent,
        Some(result.module_scope)
    );
}

#[test]
fn comprehension_binds_target_without_leaking() {
    // [x for x in xs if x]
    let mut b = AstBuilder::new();
    let x_elem = b.name("x");
    let x_target = b.name("x");
    let xs = b.name("xs");
    let for_clause = b.comp_for(x_target, xs);
    let x_test = b.name("x");
    let if_clause = b.comp_if(x_test);
    let comp = b.list_comp(x_elem, vec![for_clause, if_clause]);
    let stmt = b.expr_stmt(comp);
    let module = b.module(vec![stmt]);
    let (_, result) = bind(b, module);

    let comp_scope = *result.node_scopes.get(&comp).unwrap();
    assert_eq!(
        result.scopes.get(comp_scope).unwrap().kind,
        ScopeKind::ListComprehension
    );
    assert!(result.scopes.get(comp_scope).unwrap().table.has("x"));
    assert!(result.module_symbol("x").is_none(), "x must not leak out");
}

#[test]
fn walrus_target_hoists_out_of_comprehension() {
    // [(y := x) for x in xs]
    let mut b = AstBuilder::new();
    let x_val = b.name("x");
    let walrus = b.named_expr("y", x_val);
    let x_target = b.name("x");
    let xs = b.name("xs");
    let for_clause = b.comp_for(x_target, xs);
    let comp = b.list_comp(walrus, vec![for_clause]);
    let stmt = b.expr_stmt(comp);
    let module = b.module(vec![stmt]);
    let (_, result) = bind(b, module);

    let comp_scope = *result.node_scopes.get(&comp).unwrap();
    assert!(result.module_symbol("y").is_some(), "y binds in the module");
    assert!(!result.scopes.get(comp_scope).unwrap().table.has("y"));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn walrus_colliding_with_comprehension_variable_is_reported() {
    // [x for x in xs if (x := f())]
    let mut b = AstBuilder::new();
    let x_elem = b.name("x");
    let x_target = b.name("x");
    let xs = b.name("xs");
    let for_clause = b.comp_for(x_target, xs);
    let f_call = b.call_name("f", vec![]);
    let walrus = b.named_expr("x", f_call);
    let if_clause = b.comp_if(walrus);
    let comp = b.list_comp(x_elem, vec![for_clause, if_clause]);
    let stmt = b.expr_stmt(comp);
    let module = b.module(vec![stmt]);
    let (_, result) = bind(b, module);

    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "walrus-comprehension-target")
    );
}

#[test]
fn comprehension_shadowing_emits_alias_flow() {
    // x = 1
    // [x for x in xs]
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let outer_assign = b.assign_name("x", one);
    let x_elem = b.name("x");
    let x_target = b.name("x");
    let xs = b.name("xs");
    let for_clause = b.comp_for(x_target, xs);
    let comp = b.list_comp(x_elem, vec![for_clause]);
    let stmt = b.expr_stmt(comp);
    let module = b.module(vec![outer_assign, stmt]);
    let (_, result) = bind(b, module);

    let found = (0..result.flow.len() as u32).any(|i| {
        matches!(
            result.flow.get(pyrite_binder::FlowNodeId(i)).unwrap().kind,
            pyrite_binder::FlowNodeKind::AssignmentAlias { .. }
        )
    });
    assert!(found, "shadowing comprehension target gets an alias flow");
}

#[test]
fn global_binds_into_module_scope() {
    // def f():
    //     global g
    //     g = 1
    let mut b = AstBuilder::new();
    let global_stmt = b.global_stmt(&["g"]);
    let one = b.int(1);
    let g_assign = b.assign_name("g", one);
    let func = b.func_def("f", vec![], vec![global_stmt, g_assign]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    assert!(result.module_symbol("g").is_some());
    let func_scope = *result.node_scopes.get(&func).unwrap();
    assert!(!result.scopes.get(func_scope).unwrap().table.has("g"));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn assignment_before_global_declaration_is_reported() {
    // def f():
    //     g = 0
    //     global g
    let mut b = AstBuilder::new();
    let zero = b.int(0);
    let g_assign = b.assign_name("g", zero);
    let global_stmt = b.global_stmt(&["g"]);
    let func = b.func_def("f", vec![], vec![g_assign, global_stmt]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "global-reassignment")
    );
}

#[test]
fn nonlocal_at_module_level_is_reported() {
    let mut b = AstBuilder::new();
    let nonlocal = b.nonlocal_stmt(&["x"]);
    let module = b.module(vec![nonlocal]);
    let (_, result) = bind(b, module);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "nonlocal-at-module-level")
    );
}

#[test]
fn nonlocal_resolves_to_enclosing_function_binding() {
    // def outer():
    //     v = 1
    //     def inner():
    //         nonlocal v
    //         v = 2
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let outer_assign = b.assign_name("v", one);
    let nonlocal = b.nonlocal_stmt(&["v"]);
    let two = b.int(2);
    let inner_assign = b.assign_name("v", two);
    let inner = b.func_def("inner", vec![], vec![nonlocal, inner_assign]);
    let outer = b.func_def("outer", vec![], vec![outer_assign, inner]);
    let module = b.module(vec![outer]);
    let (_, result) = bind(b, module);

    assert!(result.diagnostics.is_empty());
    let outer_scope = *result.node_scopes.get(&outer).unwrap();
    let inner_scope = *result.node_scopes.get(&inner).unwrap();
    let outer_v = result.scopes.get(outer_scope).unwrap().table.get("v").unwrap();
    assert!(
        !result.scopes.get(inner_scope).unwrap().table.has("v"),
        "nonlocal must not create a local binding"
    );
    // The inner assignment's declaration landed on the outer symbol.
    assert!(result.symbols.get(outer_v).unwrap().declarations.len() >= 2);
}

#[test]
fn nonlocal_without_outer_binding_is_reported() {
    // def f():
    //     nonlocal missing
    let mut b = AstBuilder::new();
    let nonlocal = b.nonlocal_stmt(&["missing"]);
    let func = b.func_def("f", vec![], vec![nonlocal]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "nonlocal-no-binding")
    );
}

#[test]
fn function_locals_stay_out_of_module_scope() {
    // def f():
    //     z = 1
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let z_assign = b.assign_name("z", one);
    let func = b.func_def("f", vec![], vec![z_assign]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);

    assert!(result.module_symbol("z").is_none());
    let func_scope = *result.node_scopes.get(&func).unwrap();
    assert!(result.scopes.get(func_scope).unwrap().table.has("z"));
}

#[test]
fn lambda_gets_its_own_function_scope() {
    // f = lambda a: a
    let mut b = AstBuilder::new();
    let a_param = b.param("a");
    let a_use = b.name("a");
    let lambda = b.lambda(vec![a_param], a_use);
    let assign = b.assign_name("f", lambda);
    let module = b.module(vec![assign]);
    let (_, result) = bind(b, module);

    let lambda_scope = *result.node_scopes.get(&lambda).unwrap();
    let scope = result.scopes.get(lambda_scope).unwrap();
    assert_eq!(scope.kind, ScopeKind::Function);
    assert!(scope.table.has("a"));
    assert!(result.module_symbol("a").is_none());
}

#[test]
fn await_outside_async_is_reported() {
    // def f():
    //     await x
    let mut b = AstBuilder::new();
    let x = b.name("x");
    let awaited = b.await_expr(x);
    let stmt = b.expr_stmt(awaited);
    let func = b.func_def("f", vec![], vec![stmt]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "await-outside-async")
    );
}

#[test]
fn await_inside_async_is_allowed() {
    let mut b = AstBuilder::new();
    let x = b.name("x");
    let awaited = b.await_expr(x);
    let stmt = b.expr_stmt(awaited);
    let func = b.async_func_def("f", vec![], vec![stmt]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn yield_from_in_async_is_reported() {
    let mut b = AstBuilder::new();
    let xs = b.name("xs");
    let yf = b.yield_from(xs);
    let stmt = b.expr_stmt(yf);
    let func = b.async_func_def("f", vec![], vec![stmt]);
    let module = b.module(vec![func]);
    let (_, result) = bind(b, module);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "yield-from-in-async")
    );
}

#[test]
fn yield_outside_function_is_reported() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let y = b.yield_expr(one);
    let stmt = b.expr_stmt(y);
    let module = b.module(vec![stmt]);
    let (_, result) = bind(b, module);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.rule == "yield-outside-function")
    );
}

#[test]
fn module_docstring_is_extracted() {
    let mut b = AstBuilder::new();
    let doc = b.str_lit("module docs");
    let doc_stmt = b.expr_stmt(doc);
    let one = b.int(1);
    let assign = b.assign_name("x", one);
    let module = b.module(vec![doc_stmt, assign]);
    let (_, result) = bind(b, module);
    assert_eq!(result.docstring.as_deref(), Some("module docs"));
}
