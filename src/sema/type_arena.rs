// src/sema/type_arena.rs
//
// Interned type storage using TypeId handles for O(1) equality.
//
// - TypeId: u32 handle to an interned type (Copy, trivial Eq/Hash)
// - TypeArena: per-checker storage with automatic deduplication of
//   structural shapes; named types are nominal and never deduplicated
// - Basic types occupy the first arena slots in a fixed order

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::frontend::{Interner, Symbol};
use crate::sema::types::{BasicType, BASIC_TYPES};

/// Handle to an interned type.
///
/// Structural shapes (pointers, arrays, slices, records, procedures) are
/// deduplicated, so structural equality is `TypeId` equality. Named types get
/// one slot per declaration; their equality is nominal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// The invalid sentinel type, always arena slot 0.
    pub const INVALID: TypeId = TypeId(0);

    pub fn index(self) -> u32 {
        self.0
    }
}

/// SmallVec for type children - inline up to 4 covers most parameter lists
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

/// A named record field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordField {
    pub name: Symbol,
    pub ty: TypeId,
}

/// Stored representation of a type. Children are TypeIds, never recursive
/// references, so records and procedures stay cheap to hash and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic(BasicType),
    Pointer(TypeId),
    Array { elem: TypeId, len: u64 },
    Slice(TypeId),
    Record { fields: SmallVec<[RecordField; 4]> },
    Procedure {
        params: TypeIdVec,
        result: Option<TypeId>,
        variadic: bool,
    },
    /// User-introduced name over an underlying type. `underlying` is
    /// `TypeId::INVALID` while the declaration is still being checked,
    /// which is what makes pointer-broken type cycles legal.
    Named { name: Symbol, underlying: TypeId },
}

/// Word size and maximum alignment used by `size_of`/`align_of`/`offset_of`.
/// Driver-configurable; the defaults model a 64-bit target.
#[derive(Debug, Clone, Copy)]
pub struct BaseSizes {
    pub word_size: u64,
    pub max_align: u64,
}

impl Default for BaseSizes {
    fn default() -> Self {
        Self {
            word_size: 8,
            max_align: 8,
        }
    }
}

/// Per-checker type storage.
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<TypeKind>,
    dedup: HashMap<TypeKind, TypeId>,
    sizes: BaseSizes,
}

impl TypeArena {
    pub fn new(sizes: BaseSizes) -> Self {
        let mut arena = Self {
            types: Vec::with_capacity(64),
            dedup: HashMap::new(),
            sizes,
        };
        // Basic types take the first slots in table order; Invalid lands at 0.
        for &basic in BASIC_TYPES {
            let id = arena.push(TypeKind::Basic(basic));
            arena.dedup.insert(TypeKind::Basic(basic), id);
        }
        arena
    }

    pub fn sizes(&self) -> BaseSizes {
        self.sizes
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    /// The pre-interned handle for a basic type.
    pub fn basic(&self, basic: BasicType) -> TypeId {
        TypeId(basic.index() as u32)
    }

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn array_of(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(TypeKind::Array { elem, len })
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Slice(elem))
    }

    pub fn record(&mut self, fields: SmallVec<[RecordField; 4]>) -> TypeId {
        self.intern(TypeKind::Record { fields })
    }

    pub fn procedure(
        &mut self,
        params: TypeIdVec,
        result: Option<TypeId>,
        variadic: bool,
    ) -> TypeId {
        self.intern(TypeKind::Procedure {
            params,
            result,
            variadic,
        })
    }

    /// Allocate the forward-declarable handle for a named type. The
    /// underlying type is patched in with [`TypeArena::resolve_named`] once
    /// the declaration's type expression has been checked.
    pub fn alloc_named(&mut self, name: Symbol) -> TypeId {
        self.push(TypeKind::Named {
            name,
            underlying: TypeId::INVALID,
        })
    }

    pub fn resolve_named(&mut self, id: TypeId, underlying: TypeId) {
        match &mut self.types[id.0 as usize] {
            TypeKind::Named {
                underlying: slot, ..
            } => *slot = underlying,
            other => unreachable!("resolve_named on {other:?}"),
        }
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.dedup.get(&kind) {
            return id;
        }
        let id = self.push(kind.clone());
        self.dedup.insert(kind, id);
        id
    }

    // ---- classification ------------------------------------------------

    /// Unwrap named types down to their structural shape.
    pub fn base_type(&self, id: TypeId) -> TypeId {
        let mut current = id;
        loop {
            match self.kind(current) {
                TypeKind::Named { underlying, .. } => {
                    if *underlying == TypeId::INVALID {
                        return current;
                    }
                    current = *underlying;
                }
                _ => return current,
            }
        }
    }

    /// The basic type of `id` after unwrapping names, if it is one.
    pub fn as_basic(&self, id: TypeId) -> Option<BasicType> {
        match self.kind(self.base_type(id)) {
            TypeKind::Basic(basic) => Some(*basic),
            _ => None,
        }
    }

    pub fn is_invalid(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Basic(BasicType::Invalid))
    }

    pub fn is_untyped(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Basic(basic) if basic.is_untyped())
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        self.as_basic(id).is_some_and(|b| b.is_integer())
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.as_basic(id).is_some_and(|b| b.is_numeric())
    }

    pub fn is_boolean(&self, id: TypeId) -> bool {
        self.as_basic(id).is_some_and(|b| b.is_boolean())
    }

    pub fn is_constant_type(&self, id: TypeId) -> bool {
        match self.kind(self.base_type(id)) {
            TypeKind::Basic(basic) => basic.is_constant_type(),
            // the null constant may carry a concrete pointer type
            TypeKind::Pointer(_) => true,
            _ => false,
        }
    }

    pub fn is_pointer_shaped(&self, id: TypeId) -> bool {
        match self.kind(self.base_type(id)) {
            TypeKind::Pointer(_) => true,
            TypeKind::Basic(basic) => basic.is_pointer(),
            _ => false,
        }
    }

    /// The committed type for an untyped operand whose context provides no
    /// concrete type.
    pub fn default_type(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Basic(basic) if basic.is_untyped() => self.basic(basic.default_type()),
            _ => id,
        }
    }

    // ---- assignability & convertibility --------------------------------

    /// One-way assignability of a *typed* value into a typed location.
    /// Untyped operands never reach here; they go through the commit path.
    pub fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if self.is_invalid(from) || self.is_invalid(to) {
            // Invalid operands stay silent downstream.
            return true;
        }
        // A named type accepts its underlying shape and vice versa, but two
        // distinct named types are never interchangeable.
        let (from_named, to_named) = (
            matches!(self.kind(from), TypeKind::Named { .. }),
            matches!(self.kind(to), TypeKind::Named { .. }),
        );
        if from_named != to_named && self.base_type(from) == self.base_type(to) {
            return true;
        }
        // Any pointer assigns to rawptr.
        if self.as_basic(to) == Some(BasicType::RawPtr)
            && matches!(self.kind(self.base_type(from)), TypeKind::Pointer(_))
        {
            return true;
        }
        false
    }

    /// Explicit conversion `T(x)` admissibility between typed types.
    pub fn convertible(&self, from: TypeId, to: TypeId) -> bool {
        if self.assignable(from, to) {
            return true;
        }
        let (from_base, to_base) = (self.base_type(from), self.base_type(to));
        if self.is_numeric(from_base) && self.is_numeric(to_base) {
            return true;
        }
        let from_ptr = self.is_pointer_shaped(from_base);
        let to_ptr = self.is_pointer_shaped(to_base);
        if from_ptr && to_ptr {
            return true;
        }
        false
    }

    // ---- sizing ---------------------------------------------------------

    pub fn size_of(&self, id: TypeId) -> u64 {
        let word = self.sizes.word_size;
        match self.kind(id) {
            TypeKind::Basic(basic) => match basic {
                BasicType::Bool | BasicType::I8 | BasicType::U8 => 1,
                BasicType::I16 | BasicType::U16 => 2,
                BasicType::I32 | BasicType::U32 | BasicType::F32 | BasicType::Rune => 4,
                BasicType::I64 | BasicType::U64 | BasicType::F64 => 8,
                BasicType::Int | BasicType::Uint | BasicType::RawPtr => word,
                // data pointer + length
                BasicType::String => 2 * word,
                _ => 0,
            },
            TypeKind::Pointer(_) | TypeKind::Procedure { .. } => word,
            TypeKind::Slice(_) => 2 * word,
            TypeKind::Array { elem, len } => {
                let stride = align_up(self.size_of(*elem), self.align_of(*elem));
                stride * len
            }
            TypeKind::Record { fields } => {
                let mut offset = 0u64;
                for field in fields {
                    offset = align_up(offset, self.align_of(field.ty));
                    offset += self.size_of(field.ty);
                }
                align_up(offset, self.align_of(id))
            }
            TypeKind::Named { underlying, .. } => {
                if *underlying == TypeId::INVALID {
                    0
                } else {
                    self.size_of(*underlying)
                }
            }
        }
    }

    pub fn align_of(&self, id: TypeId) -> u64 {
        let max = self.sizes.max_align;
        match self.kind(id) {
            TypeKind::Basic(basic) => {
                let natural = match basic {
                    // strings and slices align to their data pointer
                    BasicType::String => self.sizes.word_size,
                    _ => self.size_of(id),
                };
                natural.clamp(1, max)
            }
            TypeKind::Pointer(_) | TypeKind::Procedure { .. } | TypeKind::Slice(_) => {
                self.sizes.word_size.min(max)
            }
            TypeKind::Array { elem, .. } => self.align_of(*elem),
            TypeKind::Record { fields } => fields
                .iter()
                .map(|f| self.align_of(f.ty))
                .max()
                .unwrap_or(1),
            TypeKind::Named { underlying, .. } => {
                if *underlying == TypeId::INVALID {
                    1
                } else {
                    self.align_of(*underlying)
                }
            }
        }
    }

    /// Byte offset of a record field, or None if the field does not exist.
    pub fn offset_of(&self, id: TypeId, field: Symbol) -> Option<u64> {
        match self.kind(self.base_type(id)) {
            TypeKind::Record { fields } => {
                let mut offset = 0u64;
                for f in fields {
                    offset = align_up(offset, self.align_of(f.ty));
                    if f.name == field {
                        return Some(offset);
                    }
                    offset += self.size_of(f.ty);
                }
                None
            }
            _ => None,
        }
    }

    /// Look up a record field and its type.
    pub fn field_type(&self, id: TypeId, field: Symbol) -> Option<TypeId> {
        match self.kind(self.base_type(id)) {
            TypeKind::Record { fields } => {
                fields.iter().find(|f| f.name == field).map(|f| f.ty)
            }
            _ => None,
        }
    }

    // ---- display --------------------------------------------------------

    /// Human-readable type name for error messages.
    pub fn display(&self, id: TypeId, interner: &Interner) -> String {
        match self.kind(id) {
            TypeKind::Basic(basic) => basic.name().to_string(),
            TypeKind::Pointer(elem) => format!("^{}", self.display(*elem, interner)),
            TypeKind::Array { elem, len } => {
                format!("[{}]{}", len, self.display(*elem, interner))
            }
            TypeKind::Slice(elem) => format!("[]{}", self.display(*elem, interner)),
            TypeKind::Record { fields } => {
                let list = fields
                    .iter()
                    .map(|f| {
                        format!(
                            "{}: {}",
                            interner.resolve(f.name),
                            self.display(f.ty, interner)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("struct {{{}}}", list)
            }
            TypeKind::Procedure {
                params,
                result,
                variadic,
            } => {
                let mut list = params
                    .iter()
                    .map(|p| self.display(*p, interner))
                    .collect::<Vec<_>>();
                if *variadic {
                    if let Some(last) = list.last_mut() {
                        *last = format!("..{}", last);
                    }
                }
                match result {
                    Some(result) => format!(
                        "proc({}) -> {}",
                        list.join(", "),
                        self.display(*result, interner)
                    ),
                    None => format!("proc({})", list.join(", ")),
                }
            }
            TypeKind::Named { name, .. } => interner.resolve(*name).to_string(),
        }
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    if align <= 1 {
        return offset;
    }
    offset.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn arena() -> TypeArena {
        TypeArena::new(BaseSizes::default())
    }

    #[test]
    fn basics_are_preinterned() {
        let arena = arena();
        assert_eq!(arena.basic(BasicType::Invalid), TypeId::INVALID);
        assert_eq!(
            arena.kind(arena.basic(BasicType::Int)),
            &TypeKind::Basic(BasicType::Int)
        );
    }

    #[test]
    fn structural_types_deduplicate() {
        let mut arena = arena();
        let int = arena.basic(BasicType::Int);
        let p1 = arena.pointer_to(int);
        let p2 = arena.pointer_to(int);
        assert_eq!(p1, p2);

        let a1 = arena.array_of(int, 4);
        let a2 = arena.array_of(int, 4);
        let a3 = arena.array_of(int, 5);
        assert_eq!(a1, a2);
        assert_ne!(a1, a3);
    }

    #[test]
    fn named_types_are_nominal() {
        let mut arena = arena();
        let int = arena.basic(BasicType::Int);
        let n1 = arena.alloc_named(Symbol(0));
        let n2 = arena.alloc_named(Symbol(0));
        arena.resolve_named(n1, int);
        arena.resolve_named(n2, int);
        assert_ne!(n1, n2);
        assert_eq!(arena.base_type(n1), int);
        assert!(arena.assignable(n1, int));
        assert!(arena.assignable(int, n1));
        assert!(!arena.assignable(n1, n2));
    }

    #[test]
    fn record_layout() {
        let mut arena = arena();
        let u8_ty = arena.basic(BasicType::U8);
        let i64_ty = arena.basic(BasicType::I64);
        let rec = arena.record(smallvec![
            RecordField {
                name: Symbol(0),
                ty: u8_ty
            },
            RecordField {
                name: Symbol(1),
                ty: i64_ty
            },
        ]);
        // u8 at 0, i64 aligned to 8, total padded to 16
        assert_eq!(arena.offset_of(rec, Symbol(0)), Some(0));
        assert_eq!(arena.offset_of(rec, Symbol(1)), Some(8));
        assert_eq!(arena.size_of(rec), 16);
        assert_eq!(arena.align_of(rec), 8);
        assert_eq!(arena.offset_of(rec, Symbol(2)), None);
    }

    #[test]
    fn array_and_slice_sizes() {
        let mut arena = arena();
        let i32_ty = arena.basic(BasicType::I32);
        let arr = arena.array_of(i32_ty, 3);
        assert_eq!(arena.size_of(arr), 12);
        assert_eq!(arena.align_of(arr), 4);

        let slice = arena.slice_of(i32_ty);
        assert_eq!(arena.size_of(slice), 16);
    }

    #[test]
    fn word_sized_types_follow_base_sizes() {
        let arena = TypeArena::new(BaseSizes {
            word_size: 4,
            max_align: 4,
        });
        assert_eq!(arena.size_of(arena.basic(BasicType::Int)), 4);
        assert_eq!(arena.size_of(arena.basic(BasicType::RawPtr)), 4);
        assert_eq!(arena.size_of(arena.basic(BasicType::String)), 8);
        assert_eq!(arena.align_of(arena.basic(BasicType::I64)), 4);
    }

    #[test]
    fn conversions() {
        let mut arena = arena();
        let int = arena.basic(BasicType::Int);
        let f32_ty = arena.basic(BasicType::F32);
        let rawptr = arena.basic(BasicType::RawPtr);
        let ptr = arena.pointer_to(int);
        assert!(arena.convertible(int, f32_ty));
        assert!(arena.convertible(ptr, rawptr));
        assert!(arena.convertible(rawptr, ptr));
        assert!(!arena.convertible(f32_ty, ptr));
    }
}
