// src/sema/mod.rs
//! Semantic analysis for Marten: name resolution, type and constant-value
//! inference, and the dependency-ordered declaration check.

pub mod checker;
pub mod decl_info;
pub mod entity;
pub mod operand;
pub mod scope;
pub mod type_arena;
pub mod types;
pub mod universe;
pub mod value;

pub use checker::{CheckOutput, Checker, TypeError, TypeWarning};
pub use decl_info::{Color, DeclId, DeclInfo, DeclTable, ProcedureInfo};
pub use entity::{Entity, EntityArena, EntityId, EntityKind};
pub use operand::{AddressingMode, ExprInfo, Operand, TypeAndValue, UntypedTable};
pub use scope::{Scope, ScopeArena, ScopeId};
pub use type_arena::{BaseSizes, RecordField, TypeArena, TypeId, TypeIdVec, TypeKind};
pub use types::BasicType;
pub use universe::{
    universe, BuiltinId, BuiltinKind, BuiltinProc, ConstSeed, Universe, UniverseDef,
    UniverseEntry, BUILTINS,
};
pub use value::ExactValue;
