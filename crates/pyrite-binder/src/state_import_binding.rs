//! Import binding.
//!
//! `import a.b.c` binds the first dotted part and accumulates a
//! loader-actions tree on its alias declaration; `from m import x` binds
//! each name with an optional implicit-submodule fallback; wildcard
//! imports pull the source module's public names through the
//! `ImportLookup` capability and record one flow node covering them all.

use crate::declaration::{AliasDeclaration, Declaration, ModuleLoaderActions};
use crate::scope::ScopeKind;
use crate::state::{Binder, ImportInfo, ImportType};
use crate::symbol::symbol_flags;
use pyrite_ast::node::ModuleNameData;
use pyrite_ast::{AstArena, NodeIndex, NodeKind};
use pyrite_common::DiagnosticRule;
use tracing::debug;

impl Binder<'_> {
    /// Resolution record for a module-name node. Modules the pre-pass did
    /// not decorate are treated as unresolved.
    fn import_info_for(&self, module: NodeIndex) -> ImportInfo {
        self.file_info
            .import_info
            .get(&module)
            .cloned()
            .unwrap_or_else(ImportInfo::not_found)
    }

    fn report_import_resolution(&mut self, arena: &AstArena, module: NodeIndex, info: &ImportInfo) {
        let span = arena.span(module);
        if !info.is_import_found {
            self.diagnostics.report(
                DiagnosticRule::ImportResolution,
                "import could not be resolved",
                span,
            );
            return;
        }
        if info.import_type == ImportType::ThirdParty && !info.is_stub_file && !info.is_py_typed_present
        {
            self.diagnostics.report(
                DiagnosticRule::MissingTypeStub,
                "no type stub found for this import",
                span,
            );
        }
        if info.is_stub_file && !info.is_non_stub_import_resolved {
            self.diagnostics.report(
                DiagnosticRule::MissingModuleSource,
                "a stub was found but the module source is missing",
                span,
            );
        }
    }

    /// Bind one `import a.b.c [as x]` clause.
    #[tracing::instrument(level = "debug", skip(self, arena), fields(clause_idx = idx.0))]
    pub(crate) fn bind_import_as(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::ImportAs(data)) = arena.kind(idx) else {
            return;
        };
        let (module, alias) = (data.module, data.alias);
        let Some(NodeKind::ModuleName(module_data)) = arena.kind(module) else {
            return;
        };
        let info = self.import_info_for(module);
        self.report_import_resolution(arena, module, &info);

        let Some(&first_part) = module_data.parts.first() else {
            return;
        };
        let (bound_node, uses_local_name) = if alias.is_some() {
            (alias, true)
        } else {
            (first_part, false)
        };
        let Some(bound_name) = arena.name_text(bound_node).map(str::to_string) else {
            return;
        };

        let symbol = self.bind_name_to_scope(self.current_scope, &bound_name);
        // In stubs, `import x` alone is not a re-export; only `import x as
        // x` makes the name visible to importers.
        if !uses_local_name && self.file_info.is_stub_file {
            if let Some(sym) = self.symbols.get_mut(symbol) {
                sym.flags |= symbol_flags::EXTERNALLY_HIDDEN;
            }
        }

        if uses_local_name {
            // The alias refers to the fully resolved dotted module.
            let mut decl = AliasDeclaration::new(idx, arena.span(idx), info.resolved_path());
            decl.uses_local_name = true;
            let decl = self.declarations.alloc(Declaration::Alias(decl));
            self.node_declarations.insert(idx, decl);
            if let Some(sym) = self.symbols.get_mut(symbol) {
                sym.add_declaration(decl);
            }
        } else {
            self.bind_multi_part_alias(arena, idx, symbol, module_data, &info);
        }

        self.create_flow_assignment(arena, bound_node, false);
    }

    /// Build (or extend) the loader-actions tree hanging off the first
    /// dotted part. Repeated `import a.b` / `import a.c` statements merge
    /// into a single declaration tree.
    fn bind_multi_part_alias(
        &mut self,
        arena: &AstArena,
        idx: NodeIndex,
        symbol: crate::symbol::SymbolId,
        module_data: &ModuleNameData,
        info: &ImportInfo,
    ) {
        let first_name = module_data
            .parts
            .first()
            .and_then(|&p| arena.name_text(p))
            .unwrap_or_default()
            .to_string();

        let existing = self
            .symbols
            .get(symbol)
            .into_iter()
            .flat_map(|s| s.declarations.iter().copied())
            .find(|&d| {
                matches!(
                    self.declarations.get(d),
                    Some(Declaration::Alias(alias))
                        if alias.first_name_part.as_deref() == Some(first_name.as_str())
                )
            });

        let decl_id = match existing {
            Some(decl_id) => decl_id,
            None => {
                let mut decl = AliasDeclaration::new(
                    idx,
                    arena.span(idx),
                    info.resolved_paths.first().cloned().unwrap_or_default(),
                );
                decl.first_name_part = Some(first_name.clone());
                let decl_id = self.declarations.alloc(Declaration::Alias(decl));
                self.node_declarations.insert(idx, decl_id);
                if let Some(sym) = self.symbols.get_mut(symbol) {
                    sym.add_declaration(decl_id);
                }
                decl_id
            }
        };
        debug!(module = %first_name, extend = existing.is_some(), "import alias tree");

        let part_names: Vec<String> = module_data
            .parts
            .iter()
            .skip(1)
            .filter_map(|&p| arena.name_text(p).map(str::to_string))
            .collect();
        let Some(alias) = self.declarations.as_alias_mut(decl_id) else {
            return;
        };
        let mut current = &mut alias.implicit_imports;
        for (depth, part) in part_names.iter().enumerate() {
            let resolved = info
                .resolved_paths
                .get(depth + 1)
                .cloned()
                .unwrap_or_default();
            let entry = current
                .entry(part.clone())
                .or_insert_with(|| ModuleLoaderActions::new(resolved.clone()));
            if entry.path.is_empty() {
                entry.path = resolved;
            }
            current = &mut entry.implicit_imports;
        }
        // Implicit siblings surface at the depth the import resolved to.
        for implicit in &info.implicit_imports {
            current
                .entry(implicit.name.clone())
                .or_insert_with(|| ModuleLoaderActions::new(implicit.path.clone()));
        }
    }

    /// Bind a `from m import ...` statement, named or wildcard.
    pub(crate) fn bind_import_from(&mut self, arena: &AstArena, idx: NodeIndex) {
        let Some(NodeKind::ImportFrom(data)) = arena.kind(idx) else {
            return;
        };
        let (module, imports, is_wildcard) = (data.module, data.imports.clone(), data.is_wildcard);
        let Some(NodeKind::ModuleName(module_data)) = arena.kind(module) else {
            return;
        };
        let info = self.import_info_for(module);
        self.report_import_resolution(arena, module, &info);

        if is_wildcard {
            self.bind_wildcard_import(arena, idx, &info);
            return;
        }

        // Inside a package init, `from .sub import y` also makes `sub`
        // itself visible as a package attribute, unless one of the
        // explicit imports shadows that name.
        if self.file_info.is_package_init() && module_data.leading_dots == 1 {
            if let Some(&sub_part) = module_data.parts.first() {
                let sub_name = arena.name_text(sub_part).unwrap_or_default().to_string();
                let shadowed = imports.iter().any(|&imp| {
                    matches!(
                        arena.kind(imp),
                        Some(NodeKind::ImportFromAs(entry))
                            if self.bound_name_of(arena, entry.name, entry.alias).as_deref()
                                == Some(sub_name.as_str())
                    )
                });
                if !sub_name.is_empty() && !shadowed {
                    let symbol = self.bind_name_to_scope(self.current_scope, &sub_name);
                    let decl =
                        AliasDeclaration::new(sub_part, arena.span(sub_part), info.resolved_path());
                    let decl = self.declarations.alloc(Declaration::Alias(decl));
                    if let Some(sym) = self.symbols.get_mut(symbol) {
                        sym.add_declaration(decl);
                    }
                    self.create_flow_assignment(arena, sub_part, false);
                }
            }
        }

        for &imp_idx in &imports {
            let Some(NodeKind::ImportFromAs(entry)) = arena.kind(imp_idx) else {
                continue;
            };
            let (name_node, alias_node) = (entry.name, entry.alias);
            let Some(import_name) = arena.name_text(name_node).map(str::to_string) else {
                continue;
            };
            let uses_local_name = alias_node.is_some();
            let bound_node = if uses_local_name { alias_node } else { name_node };
            let Some(bound_name) = arena.name_text(bound_node).map(str::to_string) else {
                continue;
            };

            let symbol = self.bind_name_to_scope(self.current_scope, &bound_name);
            if !uses_local_name && self.file_info.is_stub_file {
                if let Some(sym) = self.symbols.get_mut(symbol) {
                    sym.flags |= symbol_flags::EXTERNALLY_HIDDEN;
                }
            }

            let mut decl = AliasDeclaration::new(imp_idx, arena.span(imp_idx), info.resolved_path());
            decl.symbol_name = Some(import_name.clone());
            decl.uses_local_name = uses_local_name;
            if let Some(implicit) = info
                .implicit_imports
                .iter()
                .find(|i| i.name == import_name)
            {
                // The named symbol may actually be a sibling submodule.
                decl.submodule_fallback = Some(Box::new(AliasDeclaration::new(
                    imp_idx,
                    arena.span(imp_idx),
                    implicit.path.clone(),
                )));
            }
            let decl = self.declarations.alloc(Declaration::Alias(decl));
            self.node_declarations.insert(imp_idx, decl);
            if let Some(sym) = self.symbols.get_mut(symbol) {
                sym.add_declaration(decl);
            }
            self.create_flow_assignment(arena, bound_node, false);
        }
    }

    fn bound_name_of(
        &self,
        arena: &AstArena,
        name: NodeIndex,
        alias: NodeIndex,
    ) -> Option<String> {
        let node = if alias.is_some() { alias } else { name };
        arena.name_text(node).map(str::to_string)
    }

    fn bind_wildcard_import(&mut self, arena: &AstArena, idx: NodeIndex, info: &ImportInfo) {
        let at_module_scope = self
            .scopes
            .get(self.current_scope)
            .is_some_and(|s| matches!(s.kind, ScopeKind::Module | ScopeKind::Builtin));
        if !at_module_scope {
            self.diagnostics.report(
                DiagnosticRule::WildcardInNonModule,
                "wildcard imports are only allowed at module level",
                arena.span(idx),
            );
        }

        let mut names = Vec::new();
        if info.is_import_found {
            if let Some(table) = self.file_info.import_lookup.lookup(info.resolved_path()) {
                match table.dunder_all {
                    // An explicit export list wins, verbatim.
                    Some(all) => names = all,
                    None => {
                        names = table
                            .symbols
                            .iter()
                            .filter(|s| {
                                !s.name.starts_with('_') && !s.ignored_for_protocol_match
                            })
                            .map(|s| s.name.clone())
                            .collect();
                    }
                }
            }
        }

        for name in &names {
            let symbol = self.bind_name_to_scope(self.current_scope, name);
            let mut decl = AliasDeclaration::new(idx, arena.span(idx), info.resolved_path());
            decl.symbol_name = Some(name.clone());
            let decl = self.declarations.alloc(Declaration::Alias(decl));
            if let Some(sym) = self.symbols.get_mut(symbol) {
                sym.add_declaration(decl);
            }
        }
        debug!(count = names.len(), "wildcard import");
        self.create_flow_wildcard_import(idx, names);
    }
}
