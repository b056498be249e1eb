//! Lexical scopes.
//!
//! Scopes form a tree addressed by [`ScopeId`] inside a [`ScopeArena`];
//! parent links are ids so that a scope can outlive the walker frame that
//! created it (deferred function-body binding reopens scopes long after
//! the enclosing suite finished).

use crate::symbol::{SymbolArena, SymbolId, SymbolTable, symbol_flags};
use pyrite_ast::NodeIndex;

/// What kind of construct introduced a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Builtin,
    Module,
    Class,
    Function,
    /// All comprehension forms share this kind.
    ListComprehension,
}

impl ScopeKind {
    /// Execution scopes are where name bindings correspond to runtime name
    /// resolution. Class and comprehension scopes are lexical only.
    #[must_use]
    pub const fn is_execution_scope(self) -> bool {
        matches!(self, Self::Builtin | Self::Module | Self::Function)
    }
}

/// Identifier of a scope within one binder's [`ScopeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The AST node that introduced this scope (`NONE` for builtins).
    pub node: NodeIndex,
    pub table: SymbolTable,
}

impl Scope {
    #[must_use]
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>, node: NodeIndex) -> Self {
        Self {
            kind,
            parent,
            node,
            table: SymbolTable::new(),
        }
    }
}

/// Arena of all scopes created while binding one file.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

/// A successful recursive lookup: the symbol and the scope that holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeLookup {
    pub symbol: SymbolId,
    pub scope: ScopeId,
}

impl ScopeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: ScopeKind, parent: Option<ScopeId>, node: NodeIndex) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap_or(u32::MAX));
        self.scopes.push(Scope::new(kind, parent, node));
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Look a name up in exactly one scope.
    #[must_use]
    pub fn look_up(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.get(scope)?.table.get(name)
    }

    /// Look a name up along the parent chain.
    ///
    /// Class scopes other than the starting scope are skipped: a class body
    /// is not on the lexical closure chain of functions nested inside it.
    #[must_use]
    pub fn look_up_recursive(&self, start: ScopeId, name: &str) -> Option<ScopeLookup> {
        let mut current = Some(start);
        let mut is_start = true;
        while let Some(id) = current {
            let scope = self.get(id)?;
            if is_start || scope.kind != ScopeKind::Class {
                if let Some(symbol) = scope.table.get(name) {
                    return Some(ScopeLookup { symbol, scope: id });
                }
            }
            is_start = false;
            current = scope.parent;
        }
        None
    }

    /// The nearest ancestor-or-self of kind Module or Builtin.
    #[must_use]
    pub fn global_scope(&self, start: ScopeId) -> ScopeId {
        let mut current = start;
        loop {
            let Some(scope) = self.get(current) else {
                return current;
            };
            if matches!(scope.kind, ScopeKind::Module | ScopeKind::Builtin) {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// The nearest ancestor-or-self that is an execution scope.
    #[must_use]
    pub fn execution_scope(&self, start: ScopeId) -> ScopeId {
        let mut current = start;
        loop {
            let Some(scope) = self.get(current) else {
                return current;
            };
            if scope.kind.is_execution_scope() {
                return current;
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Create a symbol and install it in `scope`.
    pub fn add_symbol(
        &mut self,
        symbols: &mut SymbolArena,
        scope: ScopeId,
        name: &str,
        flags: u32,
    ) -> SymbolId {
        let mut flags = flags;
        if self.get(scope).is_some_and(|s| s.kind == ScopeKind::Class) {
            flags |= symbol_flags::CLASS_MEMBER;
        }
        let id = symbols.alloc(name, flags);
        if let Some(scope) = self.get_mut(scope) {
            scope.table.set(name.to_string(), id);
        }
        id
    }
}
