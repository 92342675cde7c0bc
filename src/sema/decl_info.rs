// src/sema/decl_info.rs

use rustc_hash::FxHashSet;

use crate::frontend::ast::{Block, Expr, ProcDecl, TypeExpr};
use crate::frontend::Span;
use crate::sema::entity::EntityId;
use crate::sema::scope::ScopeId;
use crate::sema::type_arena::TypeId;

/// Handle to a [`DeclInfo`] in the checker's declaration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Check state for the dependency-ordered declaration walk.
/// White: not yet checked. Grey: currently on the check stack; a reference
/// back to a grey declaration is a cycle. Black: done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Grey,
    Black,
}

/// The checker's work-item for one file-scope declaration.
#[derive(Debug)]
pub struct DeclInfo<'ast> {
    /// Scope the declaration lives in.
    pub scope: ScopeId,
    /// The entity (or entities, for a multi-name variable declaration
    /// initialized from one expression) this record defines.
    pub entities: Vec<EntityId>,
    pub type_expr: Option<&'ast TypeExpr>,
    pub init_expr: Option<&'ast Expr>,
    pub proc_decl: Option<&'ast ProcDecl>,
    /// Entities this declaration's check was observed to reference.
    pub deps: FxHashSet<EntityId>,
    pub mark: Color,
}

impl<'ast> DeclInfo<'ast> {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            entities: Vec::new(),
            type_expr: None,
            init_expr: None,
            proc_decl: None,
            deps: FxHashSet::default(),
            mark: Color::White,
        }
    }

    pub fn has_init(&self) -> bool {
        if self.init_expr.is_some() {
            return true;
        }
        matches!(self.proc_decl, Some(decl) if decl.body.is_some())
    }
}

/// Flat storage for declaration records.
#[derive(Debug, Default)]
pub struct DeclTable<'ast> {
    decls: Vec<DeclInfo<'ast>>,
}

impl<'ast> DeclTable<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, info: DeclInfo<'ast>) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(info);
        id
    }

    pub fn get(&self, id: DeclId) -> &DeclInfo<'ast> {
        &self.decls[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut DeclInfo<'ast> {
        &mut self.decls[id.0 as usize]
    }
}

/// A deferred procedure-body check, queued during the order pass and drained
/// after every file-scope declaration has been checked.
#[derive(Debug)]
pub struct ProcedureInfo<'ast> {
    pub name_span: Span,
    pub decl: DeclId,
    /// The procedure's checked type.
    pub ty: TypeId,
    pub body: &'ast Block,
}
