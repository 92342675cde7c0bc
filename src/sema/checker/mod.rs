// src/sema/checker/mod.rs
//
// The checker: holds the arenas and side tables, runs the collect / order /
// body / finalize passes, and hands the result tables to code generation.

mod declarations;
mod errors;
mod expr;
mod output;
mod stmt;

pub use output::{CheckOutput, TypeError, TypeWarning};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::frontend::ast::{Expr, Program};
use crate::frontend::{Ident, Interner, NodeId, Symbol};
use crate::sema::decl_info::{DeclId, DeclTable, ProcedureInfo};
use crate::sema::entity::{EntityArena, EntityId, EntityKind};
use crate::sema::operand::{AddressingMode, ExprInfo, Operand, TypeAndValue, UntypedTable};
use crate::sema::scope::{ScopeArena, ScopeId};
use crate::sema::type_arena::{BaseSizes, TypeArena, TypeId};
use crate::sema::universe::{universe, UniverseDef};
use crate::sema::value::ExactValue;

/// Ambient state for the declaration currently being checked.
#[derive(Debug, Clone, Copy)]
struct Context {
    scope: ScopeId,
    decl: Option<DeclId>,
}

pub struct Checker<'ast> {
    pub(crate) arena: TypeArena,
    pub(crate) entities: EntityArena,
    pub(crate) scopes: ScopeArena,
    pub(crate) decls: DeclTable<'ast>,

    // Side tables, keyed by node identity.
    types: FxHashMap<NodeId, TypeAndValue>,
    definitions: FxHashMap<NodeId, EntityId>,
    uses: FxHashMap<NodeId, EntityId>,
    scope_table: FxHashMap<NodeId, ScopeId>,
    untyped: UntypedTable,
    entity_decls: FxHashMap<EntityId, DeclId>,
    /// File-scope entities in collection order.
    file_entities: Vec<EntityId>,

    universe_scope: ScopeId,
    global_scope: ScopeId,

    /// Deferred procedure bodies, drained after the order pass.
    procedures: Vec<ProcedureInfo<'ast>>,
    /// Enclosing procedure types, innermost last.
    proc_stack: Vec<TypeId>,
    in_defer: bool,
    loop_depth: usize,

    context: Context,
    blank: Symbol,

    errors: Vec<TypeError>,
    warnings: Vec<TypeWarning>,
}

impl<'ast> Checker<'ast> {
    /// Create a checker bound to a fresh file scope. The universe scope is
    /// materialized from the process-global seed list; its names are interned
    /// through `interner` so source identifiers resolve to the same symbols.
    pub fn new(sizes: BaseSizes, interner: &mut Interner) -> Self {
        let mut arena = TypeArena::new(sizes);
        let mut entities = EntityArena::new();
        let mut scopes = ScopeArena::new();
        let blank = interner.intern("_");

        let universe_scope = scopes.open(None);
        for entry in &universe().entries {
            let name = interner.intern(entry.name);
            let (kind, ty) = match &entry.def {
                UniverseDef::TypeName(basic) => (EntityKind::TypeName, arena.basic(*basic)),
                UniverseDef::Constant(basic, seed) => (
                    EntityKind::Constant {
                        value: seed.value(),
                    },
                    arena.basic(*basic),
                ),
                UniverseDef::Builtin(id) => (EntityKind::Builtin(*id), TypeId::INVALID),
            };
            let entity = entities.alloc(kind, name, Default::default(), ty);
            let clash = scopes.insert(universe_scope, name, entity, &mut entities, blank);
            debug_assert!(clash.is_none(), "double declaration in universe");
        }

        let global_scope = scopes.open(Some(universe_scope));

        Self {
            arena,
            entities,
            scopes,
            decls: DeclTable::new(),
            types: FxHashMap::default(),
            definitions: FxHashMap::default(),
            uses: FxHashMap::default(),
            scope_table: FxHashMap::default(),
            untyped: UntypedTable::new(),
            entity_decls: FxHashMap::default(),
            file_entities: Vec::new(),
            universe_scope,
            global_scope,
            procedures: Vec::new(),
            proc_stack: Vec::new(),
            in_defer: false,
            loop_depth: 0,
            context: Context {
                scope: global_scope,
                decl: None,
            },
            blank,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Run the full check: collect file-scope declarations, check them in
    /// dependency order, check deferred procedure bodies, then fold the
    /// remaining untyped expressions into the type table.
    pub fn check_program(&mut self, program: &'ast Program, interner: &Interner) {
        debug!(files = program.files.len(), "collecting declarations");
        for file in &program.files {
            self.collect_file(file, interner);
        }

        debug!(entities = self.file_entities.len(), "checking declarations");
        let mut ordered = self.file_entities.clone();
        ordered.sort_by_key(|&e| self.entities.get(e).order);
        for entity in ordered {
            self.check_entity_decl(entity, interner);
        }

        debug!(bodies = self.procedures.len(), "checking procedure bodies");
        let procedures = std::mem::take(&mut self.procedures);
        for info in procedures {
            self.check_procedure_body(&info, interner);
        }

        debug!(pending = self.untyped.len(), "finalizing untyped expressions");
        self.finalize_untyped();
    }

    /// Emit unused-variable warnings and surrender the tables. The scope walk
    /// is pre-order over children in opening order, which matches the
    /// original's deterministic scope destruction.
    pub fn finish(mut self, interner: &Interner) -> CheckOutput<'ast> {
        self.sweep_unused(self.global_scope, interner);
        CheckOutput {
            types: self.types,
            definitions: self.definitions,
            uses: self.uses,
            scopes: self.scope_table,
            entity_decls: self.entity_decls,
            decl_table: self.decls,
            entity_arena: self.entities,
            scope_arena: self.scopes,
            type_arena: self.arena,
            universe_scope: self.universe_scope,
            global_scope: self.global_scope,
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global_scope
    }

    fn sweep_unused(&mut self, scope: ScopeId, interner: &Interner) {
        let entity_ids: Vec<EntityId> = self.scopes.get(scope).entities().to_vec();
        for id in entity_ids {
            let entity = self.entities.get(id);
            if let EntityKind::Variable { used: false, .. } = entity.kind {
                let name = interner.resolve(entity.name).to_string();
                let span = entity.span;
                self.warn_unused_variable(name, span);
            }
        }
        let children = self.scopes.get(scope).children.clone();
        for child in children {
            self.sweep_unused(child, interner);
        }
    }

    // ---- table maintenance ----------------------------------------------

    /// Persist a checked operand for an expression node. Untyped operands go
    /// to the untyped table; everything else lands in the type table.
    fn record_operand(&mut self, op: &Operand<'ast>, expr: &'ast Expr) {
        match op.mode {
            AddressingMode::Invalid => {
                self.types.insert(
                    expr.id,
                    TypeAndValue {
                        mode: AddressingMode::Invalid,
                        ty: TypeId::INVALID,
                        value: ExactValue::Invalid,
                    },
                );
            }
            _ if self.arena.is_untyped(op.ty) => {
                self.add_untyped(expr.id, false, op.mode, op.ty, op.value.clone());
            }
            _ => self.add_type_and_value(expr.id, op.mode, op.ty, op.value.clone()),
        }
    }

    fn add_untyped(
        &mut self,
        id: NodeId,
        is_lhs: bool,
        mode: AddressingMode,
        ty: TypeId,
        value: ExactValue,
    ) {
        self.untyped.insert(
            id,
            ExprInfo {
                is_lhs,
                mode,
                ty,
                value,
            },
        );
    }

    fn add_type_and_value(
        &mut self,
        id: NodeId,
        mode: AddressingMode,
        ty: TypeId,
        value: ExactValue,
    ) {
        if mode == AddressingMode::Invalid {
            return;
        }
        debug_assert!(
            mode != AddressingMode::Constant
                || value.is_invalid()
                || self.arena.is_invalid(ty)
                || self.arena.is_constant_type(ty),
            "constant with non-constant type"
        );
        self.types.insert(id, TypeAndValue { mode, ty, value });
    }

    /// Record the defining entity of a declaration-site identifier.
    fn add_entity_definition(&mut self, ident: &Ident, entity: EntityId) {
        self.definitions.insert(ident.id, entity);
    }

    /// Record the referenced entity of a use-site identifier.
    fn add_entity_use(&mut self, node: NodeId, entity: EntityId) {
        self.uses.insert(node, entity);
    }

    /// Install an entity in a scope, reporting redeclaration against the
    /// existing entity's name.
    fn add_entity(
        &mut self,
        scope: ScopeId,
        ident: Option<&Ident>,
        entity: EntityId,
        interner: &Interner,
    ) {
        let name = self.entities.get(entity).name;
        if self
            .scopes
            .insert(scope, name, entity, &mut self.entities, self.blank)
            .is_some()
        {
            let span = self.entities.get(entity).span;
            self.error_redeclared(interner.resolve(name).to_string(), span);
            return;
        }
        if let Some(ident) = ident {
            self.add_entity_definition(ident, entity);
        }
    }

    /// Register a file-scope entity with its declaration record and stamp its
    /// order. The stamp equals the declaration table's cardinality after
    /// insertion, so stamps are dense and follow textual scan order.
    fn add_file_entity(&mut self, ident: &Ident, entity: EntityId, decl: DeclId, interner: &Interner) {
        self.add_entity(self.global_scope, Some(ident), entity, interner);
        self.entity_decls.insert(entity, decl);
        self.file_entities.push(entity);
        self.entities.get_mut(entity).order = self.entity_decls.len() as u32;
    }

    /// Record a dependency edge from the declaration currently being checked
    /// to `entity`, if that entity has a declaration record of its own.
    fn add_decl_dependency(&mut self, entity: EntityId) {
        if let Some(decl) = self.context.decl {
            if self.entity_decls.contains_key(&entity) {
                self.decls.get_mut(decl).deps.insert(entity);
            }
        }
    }

    // ---- scope and context helpers --------------------------------------

    /// Open a scope for a statement node and make it current.
    fn open_scope(&mut self, node: NodeId) -> ScopeId {
        let scope = self.scopes.open(Some(self.context.scope));
        self.scope_table.insert(node, scope);
        self.context.scope = scope;
        scope
    }

    fn close_scope(&mut self) {
        let parent = self
            .scopes
            .get(self.context.scope)
            .parent
            .expect("closing a root scope");
        self.context.scope = parent;
    }

    fn current_scope(&self) -> ScopeId {
        self.context.scope
    }

    /// Swap in a declaration context, returning the previous one for restore.
    fn enter_decl_context(&mut self, scope: ScopeId, decl: Option<DeclId>) -> (ScopeId, Option<DeclId>) {
        let prev = (self.context.scope, self.context.decl);
        self.context.scope = scope;
        self.context.decl = decl;
        prev
    }

    fn restore_context(&mut self, prev: (ScopeId, Option<DeclId>)) {
        self.context.scope = prev.0;
        self.context.decl = prev.1;
    }

    fn push_procedure(&mut self, ty: TypeId) {
        self.proc_stack.push(ty);
    }

    fn pop_procedure(&mut self) {
        self.proc_stack.pop();
    }

    // ---- untyped finalization -------------------------------------------

    /// Fold the untyped table into the type table. Entries still pending are
    /// committed at their default type; an entry that cannot be defaulted to
    /// a concrete type would be a checker bug, not a user error.
    fn finalize_untyped(&mut self) {
        for (id, info) in self.untyped.drain() {
            if info.mode == AddressingMode::Invalid || self.arena.is_invalid(info.ty) {
                continue;
            }
            let ty = self.arena.default_type(info.ty);
            assert!(
                !self.arena.is_untyped(ty),
                "untyped expression survived finalization"
            );
            let value = match self.arena.as_basic(ty) {
                Some(basic) => info.value.convert_for(basic),
                None => info.value,
            };
            self.add_type_and_value(id, info.mode, ty, value);
        }
    }
}
