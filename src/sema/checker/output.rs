// src/sema/checker/output.rs
//
// Diagnostic wrappers and the code-gen handoff produced by a finished check.

use rustc_hash::FxHashMap;

use crate::errors::{SemanticError, SemanticWarning};
use crate::frontend::{NodeId, Span};
use crate::sema::decl_info::{DeclId, DeclTable};
use crate::sema::entity::{EntityArena, EntityId};
use crate::sema::operand::TypeAndValue;
use crate::sema::scope::{ScopeArena, ScopeId};
use crate::sema::type_arena::{TypeArena, TypeId};

/// A semantic error paired with its source span.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

impl TypeError {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }
}

/// A semantic warning paired with its source span.
#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

impl TypeWarning {
    pub fn new(warning: SemanticWarning, span: Span) -> Self {
        Self { warning, span }
    }
}

/// Everything code generation needs from a completed check: the side tables
/// keyed by node id, the entity/scope/type arenas they index into, and the
/// collected diagnostics.
#[derive(Debug)]
pub struct CheckOutput<'ast> {
    /// Expression node -> (mode, type, value)
    pub types: FxHashMap<NodeId, TypeAndValue>,
    /// Identifier node at a declaration site -> the entity it defines
    pub definitions: FxHashMap<NodeId, EntityId>,
    /// Identifier node at a use site -> the entity it references
    pub uses: FxHashMap<NodeId, EntityId>,
    /// Statement node -> the scope it opened
    pub scopes: FxHashMap<NodeId, ScopeId>,
    /// File-scope entity -> its declaration record
    pub entity_decls: FxHashMap<EntityId, DeclId>,

    pub decl_table: DeclTable<'ast>,
    pub entity_arena: EntityArena,
    pub scope_arena: ScopeArena,
    pub type_arena: TypeArena,

    pub universe_scope: ScopeId,
    pub global_scope: ScopeId,

    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeWarning>,
}

impl<'ast> CheckOutput<'ast> {
    /// The recorded type of an expression, if any.
    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).map(|tv| tv.ty)
    }

    /// The entity behind an identifier node, whether it is a definition or a
    /// use site.
    pub fn entity_of_ident(&self, node: NodeId) -> Option<EntityId> {
        self.definitions
            .get(&node)
            .or_else(|| self.uses.get(&node))
            .copied()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
