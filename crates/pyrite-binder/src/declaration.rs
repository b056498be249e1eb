//! Declarations.
//!
//! Each symbol carries an ordered list of declaration ids. Declarations
//! live in their own arena because a few of them grow after creation: a
//! function declaration accrues its return/raise/yield statements and its
//! generator flag while the body is walked, long after the declaration was
//! appended to the symbol.

use pyrite_ast::NodeIndex;
use pyrite_common::Span;
use rustc_hash::FxHashMap;

/// Identifier of a declaration within one binder's [`DeclarationArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Loader actions that reconstruct a dotted module chain at type-evaluation
/// time. The tree mirrors a dotted module name; at each depth `path` is
/// either empty (non-terminal) or the resolved file path at that depth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleLoaderActions {
    pub path: String,
    pub implicit_imports: FxHashMap<String, ModuleLoaderActions>,
}

impl ModuleLoaderActions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            implicit_imports: FxHashMap::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub node: NodeIndex,
    pub range: Span,
    pub is_constant: bool,
    /// Expression the variable's type is inferred from, when no annotation
    /// is present.
    pub inferred_type_source: NodeIndex,
    pub type_annotation: NodeIndex,
    pub is_final: bool,
    pub is_defined_by_member_access: bool,
    /// Set when a module-level assignment may define a type alias.
    pub type_alias_name: Option<String>,
    /// Set when the annotation is an explicit `TypeAlias`.
    pub type_alias_annotation: NodeIndex,
}

impl VariableDeclaration {
    #[must_use]
    pub fn new(node: NodeIndex, range: Span) -> Self {
        Self {
            node,
            range,
            is_constant: false,
            inferred_type_source: NodeIndex::NONE,
            type_annotation: NodeIndex::NONE,
            is_final: false,
            is_defined_by_member_access: false,
            type_alias_name: None,
            type_alias_annotation: NodeIndex::NONE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParameterDeclaration {
    pub node: NodeIndex,
    pub range: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionDeclaration {
    pub node: NodeIndex,
    pub range: Span,
    pub is_method: bool,
    pub is_generator: bool,
    /// `return` statements appended while the body is walked.
    pub returns: Vec<NodeIndex>,
    /// `raise` statements appended while the body is walked.
    pub raises: Vec<NodeIndex>,
    /// `yield` / `yield from` expressions appended while the body is walked.
    pub yields: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub struct ClassDeclaration {
    pub node: NodeIndex,
    pub range: Span,
}

#[derive(Clone, Debug)]
pub struct AliasDeclaration {
    pub node: NodeIndex,
    pub range: Span,
    /// Resolved file path, empty when the import did not resolve.
    pub path: String,
    /// Name within the aliased module; `None` when the whole module is
    /// aliased.
    pub symbol_name: Option<String>,
    /// An `as` alias was supplied.
    pub uses_local_name: bool,
    /// First dotted part for a multi-part `import a.b.c`; used to merge
    /// loader-action trees across statements.
    pub first_name_part: Option<String>,
    /// Fallback to an implicit sibling submodule when the named symbol is
    /// absent from the module.
    pub submodule_fallback: Option<Box<AliasDeclaration>>,
    pub implicit_imports: FxHashMap<String, ModuleLoaderActions>,
}

impl AliasDeclaration {
    #[must_use]
    pub fn new(node: NodeIndex, range: Span, path: impl Into<String>) -> Self {
        Self {
            node,
            range,
            path: path.into(),
            symbol_name: None,
            uses_local_name: false,
            first_name_part: None,
            submodule_fallback: None,
            implicit_imports: FxHashMap::default(),
        }
    }
}

/// Builtin semantic type assigned to a module intrinsic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntrinsicType {
    Str,
    Any,
    DictStrAny,
    IterableStr,
}

#[derive(Clone, Debug)]
pub struct IntrinsicDeclaration {
    pub node: NodeIndex,
    pub intrinsic: IntrinsicType,
}

#[derive(Clone, Debug)]
pub struct SpecialBuiltInClassDeclaration {
    pub node: NodeIndex,
    pub range: Span,
}

/// The closed sum of declaration kinds.
#[derive(Clone, Debug)]
pub enum Declaration {
    Variable(VariableDeclaration),
    Parameter(ParameterDeclaration),
    Function(FunctionDeclaration),
    Class(ClassDeclaration),
    Alias(AliasDeclaration),
    Intrinsic(IntrinsicDeclaration),
    SpecialBuiltInClass(SpecialBuiltInClassDeclaration),
}

impl Declaration {
    /// Source range the declaration points at.
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Self::Variable(d) => d.range,
            Self::Parameter(d) => d.range,
            Self::Function(d) => d.range,
            Self::Class(d) => d.range,
            Self::Alias(d) => d.range,
            Self::Intrinsic(_) => Span::dummy(),
            Self::SpecialBuiltInClass(d) => d.range,
        }
    }
}

/// Arena for declaration storage.
#[derive(Debug, Default)]
pub struct DeclarationArena {
    decls: Vec<Declaration>,
}

impl DeclarationArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(u32::try_from(self.decls.len()).unwrap_or(u32::MAX));
        self.decls.push(decl);
        id
    }

    #[must_use]
    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.0 as usize)
    }

    /// The function payload of a declaration, if it is one.
    #[must_use]
    pub fn as_function_mut(&mut self, id: DeclId) -> Option<&mut FunctionDeclaration> {
        match self.get_mut(id)? {
            Declaration::Function(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_alias_mut(&mut self, id: DeclId) -> Option<&mut AliasDeclaration> {
        match self.get_mut(id)? {
            Declaration::Alias(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_declaration_grows_after_creation() {
        let mut arena = DeclarationArena::new();
        let id = arena.alloc(Declaration::Function(FunctionDeclaration {
            node: NodeIndex(3),
            range: Span::new(0, 10),
            is_method: false,
            is_generator: false,
            returns: Vec::new(),
            raises: Vec::new(),
            yields: Vec::new(),
        }));
        let func = arena.as_function_mut(id).unwrap();
        func.yields.push(NodeIndex(9));
        func.is_generator = true;
        match arena.get(id).unwrap() {
            Declaration::Function(f) => {
                assert!(f.is_generator);
                assert_eq!(f.yields, vec![NodeIndex(9)]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn loader_actions_nest_by_dotted_depth() {
        let mut outer = ModuleLoaderActions::new("");
        outer
            .implicit_imports
            .insert("b".to_string(), ModuleLoaderActions::new("/pkg/a/b.py"));
        assert!(outer.path.is_empty());
        assert_eq!(outer.implicit_imports["b"].path, "/pkg/a/b.py");
    }
}
