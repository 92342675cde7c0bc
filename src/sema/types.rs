// src/sema/types.rs

/// The predeclared basic types, including the untyped compile-time variants.
///
/// Untyped variants are the homes of literals and constant operations on them
/// until a typed context commits them to a concrete type. Their printed names
/// contain a space, which keeps them out of the universe scope and therefore
/// unreachable from source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Invalid,

    Bool,
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    F32,
    F64,
    Rune,
    String,
    RawPtr,

    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedRune,
    UntypedString,
    UntypedPointer,
}

/// All basic types in a fixed order; the type arena pre-interns these so the
/// nth entry gets arena slot n.
pub const BASIC_TYPES: &[BasicType] = &[
    BasicType::Invalid,
    BasicType::Bool,
    BasicType::I8,
    BasicType::I16,
    BasicType::I32,
    BasicType::I64,
    BasicType::Int,
    BasicType::U8,
    BasicType::U16,
    BasicType::U32,
    BasicType::U64,
    BasicType::Uint,
    BasicType::F32,
    BasicType::F64,
    BasicType::Rune,
    BasicType::String,
    BasicType::RawPtr,
    BasicType::UntypedBool,
    BasicType::UntypedInt,
    BasicType::UntypedFloat,
    BasicType::UntypedRune,
    BasicType::UntypedString,
    BasicType::UntypedPointer,
];

impl BasicType {
    /// Index into [`BASIC_TYPES`]; matches the arena slot of the type.
    pub fn index(self) -> usize {
        BASIC_TYPES
            .iter()
            .position(|&b| b == self)
            .expect("basic type in table")
    }

    /// The printed name for error messages and the universe scope.
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Invalid => "invalid type",
            BasicType::Bool => "bool",
            BasicType::I8 => "i8",
            BasicType::I16 => "i16",
            BasicType::I32 => "i32",
            BasicType::I64 => "i64",
            BasicType::Int => "int",
            BasicType::U8 => "u8",
            BasicType::U16 => "u16",
            BasicType::U32 => "u32",
            BasicType::U64 => "u64",
            BasicType::Uint => "uint",
            BasicType::F32 => "f32",
            BasicType::F64 => "f64",
            BasicType::Rune => "rune",
            BasicType::String => "string",
            BasicType::RawPtr => "rawptr",
            BasicType::UntypedBool => "untyped bool",
            BasicType::UntypedInt => "untyped int",
            BasicType::UntypedFloat => "untyped float",
            BasicType::UntypedRune => "untyped rune",
            BasicType::UntypedString => "untyped string",
            BasicType::UntypedPointer => "untyped pointer",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicType::UntypedBool
                | BasicType::UntypedInt
                | BasicType::UntypedFloat
                | BasicType::UntypedRune
                | BasicType::UntypedString
                | BasicType::UntypedPointer
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicType::I8
                | BasicType::I16
                | BasicType::I32
                | BasicType::I64
                | BasicType::Int
                | BasicType::U8
                | BasicType::U16
                | BasicType::U32
                | BasicType::U64
                | BasicType::Uint
                | BasicType::Rune
                | BasicType::UntypedInt
                | BasicType::UntypedRune
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicType::U8 | BasicType::U16 | BasicType::U32 | BasicType::U64 | BasicType::Uint
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BasicType::F32 | BasicType::F64 | BasicType::UntypedFloat
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicType::Bool | BasicType::UntypedBool)
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicType::String | BasicType::UntypedString)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, BasicType::RawPtr | BasicType::UntypedPointer)
    }

    /// Types that may carry a compile-time constant value.
    pub fn is_constant_type(self) -> bool {
        self.is_boolean() || self.is_numeric() || self.is_string() || self.is_pointer()
    }

    /// Types with a defined ordering (`< > <= >=`).
    pub fn is_ordered(self) -> bool {
        self.is_numeric() || self.is_string()
    }

    /// Bit width of fixed-width integer and float types. `int`/`uint` are
    /// word-sized and resolved against [`super::BaseSizes`] by the arena.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            BasicType::I8 | BasicType::U8 => Some(8),
            BasicType::I16 | BasicType::U16 => Some(16),
            BasicType::I32 | BasicType::U32 | BasicType::F32 | BasicType::Rune => Some(32),
            BasicType::I64 | BasicType::U64 | BasicType::F64 => Some(64),
            _ => None,
        }
    }

    /// The concrete type an untyped variant commits to when its context
    /// provides none (e.g. `x := 3` infers `int`).
    pub fn default_type(self) -> BasicType {
        match self {
            BasicType::UntypedBool => BasicType::Bool,
            BasicType::UntypedInt => BasicType::Int,
            BasicType::UntypedFloat => BasicType::F64,
            BasicType::UntypedRune => BasicType::Rune,
            BasicType::UntypedString => BasicType::String,
            BasicType::UntypedPointer => BasicType::RawPtr,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_names_contain_a_space() {
        for &basic in BASIC_TYPES {
            if basic.is_untyped() {
                assert!(basic.name().contains(' '), "{:?}", basic);
            }
        }
    }

    #[test]
    fn reachable_names_have_no_space() {
        for &basic in BASIC_TYPES {
            if !basic.is_untyped() && basic != BasicType::Invalid {
                assert!(!basic.name().contains(' '), "{:?}", basic);
            }
        }
    }

    #[test]
    fn default_types_are_concrete() {
        for &basic in BASIC_TYPES {
            if basic.is_untyped() {
                assert!(!basic.default_type().is_untyped(), "{:?}", basic);
            }
        }
    }

    #[test]
    fn classification() {
        assert!(BasicType::Rune.is_integer());
        assert!(BasicType::UntypedInt.is_integer());
        assert!(!BasicType::F64.is_integer());
        assert!(BasicType::Uint.is_unsigned());
        assert!(BasicType::UntypedFloat.is_float());
        assert!(BasicType::String.is_ordered());
        assert!(!BasicType::Bool.is_ordered());
        assert!(BasicType::UntypedPointer.is_constant_type());
    }

    #[test]
    fn basic_index_round_trips() {
        for (i, &basic) in BASIC_TYPES.iter().enumerate() {
            assert_eq!(basic.index(), i);
        }
    }
}
