// src/sema/operand.rs

use rustc_hash::FxHashMap;

use crate::frontend::ast::Expr;
use crate::frontend::NodeId;
use crate::sema::entity::EntityId;
use crate::sema::type_arena::TypeId;
use crate::sema::universe::BuiltinId;
use crate::sema::value::ExactValue;

/// What a checked expression denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// Checking failed; downstream checks stay silent.
    Invalid,
    /// A statement-shaped expression, e.g. a call to a void procedure.
    NoValue,
    /// An r-value.
    Value,
    /// An addressable l-value.
    Variable,
    /// A compile-time constant; the operand carries its value.
    Constant,
    /// A type used as an expression (conversion callee).
    Type,
    /// A builtin procedure; the operand carries its id.
    Builtin,
}

/// The transient result of checking one expression.
#[derive(Debug, Clone)]
pub struct Operand<'ast> {
    pub mode: AddressingMode,
    pub ty: TypeId,
    /// Populated iff `mode == Constant`.
    pub value: ExactValue,
    /// The expression this operand came from, when it has one.
    pub expr: Option<&'ast Expr>,
    /// Populated iff `mode == Builtin`.
    pub builtin: Option<BuiltinId>,
    /// The entity an identifier (or a projection of one) refers to; used to
    /// set address-taken flags.
    pub entity: Option<EntityId>,
}

impl<'ast> Operand<'ast> {
    pub fn invalid() -> Self {
        Self {
            mode: AddressingMode::Invalid,
            ty: TypeId::INVALID,
            value: ExactValue::Invalid,
            expr: None,
            builtin: None,
            entity: None,
        }
    }

    pub fn new(mode: AddressingMode, ty: TypeId, expr: &'ast Expr) -> Self {
        Self {
            mode,
            ty,
            value: ExactValue::Invalid,
            expr: Some(expr),
            builtin: None,
            entity: None,
        }
    }

    pub fn constant(ty: TypeId, value: ExactValue, expr: &'ast Expr) -> Self {
        Self {
            mode: AddressingMode::Constant,
            ty,
            value,
            expr: Some(expr),
            builtin: None,
            entity: None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == AddressingMode::Invalid
    }

    pub fn is_constant(&self) -> bool {
        self.mode == AddressingMode::Constant
    }

    /// Demote to invalid after a reported error so enclosing expressions
    /// propagate silence instead of cascading diagnostics.
    pub fn invalidate(&mut self) {
        self.mode = AddressingMode::Invalid;
        self.ty = TypeId::INVALID;
        self.value = ExactValue::Invalid;
    }
}

/// The persisted projection of an operand into the expression table.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub mode: AddressingMode,
    pub ty: TypeId,
    pub value: ExactValue,
}

/// A pending record for an expression whose type is still untyped. Lives in
/// the untyped table until the owning context commits a concrete type.
#[derive(Debug, Clone)]
pub struct ExprInfo {
    pub is_lhs: bool,
    pub mode: AddressingMode,
    pub ty: TypeId,
    pub value: ExactValue,
}

/// The untyped side table. Iteration follows insertion order so the finalize
/// pass is deterministic; a Vec of entries plus an id index gives that
/// without an ordered map.
#[derive(Debug, Default)]
pub struct UntypedTable {
    entries: Vec<(NodeId, ExprInfo)>,
    index: FxHashMap<NodeId, usize>,
}

impl UntypedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, info: ExprInfo) {
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = info,
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push((id, info));
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&ExprInfo> {
        self.index.get(&id).map(|&pos| &self.entries[pos].1)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<ExprInfo> {
        self.index
            .remove(&id)
            .map(|pos| self.entries[pos].1.clone())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Drain live entries in insertion order. An entry is live only when the
    /// index still points at its slot, so removed and re-inserted ids never
    /// surface stale records.
    pub fn drain(&mut self) -> Vec<(NodeId, ExprInfo)> {
        let index = std::mem::take(&mut self.index);
        std::mem::take(&mut self.entries)
            .into_iter()
            .enumerate()
            .filter(|(pos, (id, _))| index.get(id) == Some(pos))
            .map(|(_, entry)| entry)
            .collect()
    }
}
