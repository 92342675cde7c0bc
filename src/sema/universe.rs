// src/sema/universe.rs
//
// The process-global predeclared scope: basic types and their aliases, the
// constants true/false/null, and the builtin procedures. Built once through
// a OnceLock and shared read-only; each checker materializes these entries
// into its own scope and entity arenas at construction.

use std::sync::OnceLock;

use crate::sema::types::{BasicType, BASIC_TYPES};
use crate::sema::value::ExactValue;

/// Seed value of a predeclared constant. A plain-data mirror of the
/// [`ExactValue`] cases the universe needs, so the seed list can live in a
/// process-wide static.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstSeed {
    Bool(bool),
    Null,
}

impl ConstSeed {
    pub fn value(self) -> ExactValue {
        match self {
            ConstSeed::Bool(v) => ExactValue::Bool(v),
            ConstSeed::Null => ExactValue::null(),
        }
    }
}

/// Identifies a builtin procedure. The expression checker dispatches on this,
/// never on the spelled name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinId {
    SizeOf,
    SizeOfVal,
    AlignOf,
    AlignOfVal,
    OffsetOf,
    OffsetOfVal,
    StaticAssert,
    Len,
    Cap,
    Copy,
    CopyBytes,
    Print,
    Println,
}

/// Whether a builtin call is an expression or a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Expression,
    Statement,
}

/// Static description of one builtin procedure.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProc {
    pub id: BuiltinId,
    pub name: &'static str,
    /// Exact argument count, or the minimum when `variadic`.
    pub arg_count: usize,
    pub variadic: bool,
    pub kind: BuiltinKind,
}

pub const BUILTINS: &[BuiltinProc] = &[
    BuiltinProc { id: BuiltinId::SizeOf, name: "size_of", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::SizeOfVal, name: "size_of_val", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::AlignOf, name: "align_of", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::AlignOfVal, name: "align_of_val", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::OffsetOf, name: "offset_of", arg_count: 2, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::OffsetOfVal, name: "offset_of_val", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::StaticAssert, name: "static_assert", arg_count: 1, variadic: false, kind: BuiltinKind::Statement },
    BuiltinProc { id: BuiltinId::Len, name: "len", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::Cap, name: "cap", arg_count: 1, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::Copy, name: "copy", arg_count: 2, variadic: false, kind: BuiltinKind::Expression },
    BuiltinProc { id: BuiltinId::CopyBytes, name: "copy_bytes", arg_count: 3, variadic: false, kind: BuiltinKind::Statement },
    BuiltinProc { id: BuiltinId::Print, name: "print", arg_count: 1, variadic: true, kind: BuiltinKind::Statement },
    BuiltinProc { id: BuiltinId::Println, name: "println", arg_count: 1, variadic: true, kind: BuiltinKind::Statement },
];

impl BuiltinId {
    /// The table entry for this builtin.
    pub fn info(self) -> &'static BuiltinProc {
        BUILTINS
            .iter()
            .find(|b| b.id == self)
            .expect("builtin in table")
    }
}

/// One predeclared entry.
#[derive(Debug, Clone)]
pub enum UniverseDef {
    TypeName(BasicType),
    Constant(BasicType, ConstSeed),
    Builtin(BuiltinId),
}

#[derive(Debug, Clone)]
pub struct UniverseEntry {
    pub name: &'static str,
    pub def: UniverseDef,
}

/// The immutable seed list for the universe scope.
#[derive(Debug)]
pub struct Universe {
    pub entries: Vec<UniverseEntry>,
}

fn build_universe() -> Universe {
    let mut entries = Vec::new();

    // Types. Entries whose printed name contains a space (the untyped
    // sentinels) are skipped, keeping them unreachable from source.
    for &basic in BASIC_TYPES {
        let name = basic.name();
        if name.contains(' ') {
            continue;
        }
        entries.push(UniverseEntry {
            name,
            def: UniverseDef::TypeName(basic),
        });
    }
    // Aliases
    entries.push(UniverseEntry {
        name: "byte",
        def: UniverseDef::TypeName(BasicType::U8),
    });

    // Constants
    entries.push(UniverseEntry {
        name: "true",
        def: UniverseDef::Constant(BasicType::UntypedBool, ConstSeed::Bool(true)),
    });
    entries.push(UniverseEntry {
        name: "false",
        def: UniverseDef::Constant(BasicType::UntypedBool, ConstSeed::Bool(false)),
    });
    entries.push(UniverseEntry {
        name: "null",
        def: UniverseDef::Constant(BasicType::UntypedPointer, ConstSeed::Null),
    });

    // Builtin procedures
    for builtin in BUILTINS {
        entries.push(UniverseEntry {
            name: builtin.name,
            def: UniverseDef::Builtin(builtin.id),
        });
    }

    Universe { entries }
}

static UNIVERSE: OnceLock<Universe> = OnceLock::new();

/// The process-wide universe. Idempotent: every call after the first returns
/// the same instance.
pub fn universe() -> &'static Universe {
    UNIVERSE.get_or_init(build_universe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_is_idempotent() {
        let first = universe();
        let second = universe();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.entries.len(), second.entries.len());
    }

    #[test]
    fn untyped_sentinels_are_not_seeded() {
        for entry in &universe().entries {
            assert!(!entry.name.contains(' '), "{}", entry.name);
        }
    }

    #[test]
    fn builtin_table_has_no_duplicate_names() {
        let mut names: Vec<_> = BUILTINS.iter().map(|b| b.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTINS.len());
    }

    #[test]
    fn variadic_builtins_are_statements() {
        for builtin in BUILTINS {
            if builtin.variadic {
                assert_eq!(builtin.kind, BuiltinKind::Statement, "{}", builtin.name);
            }
        }
    }

    #[test]
    fn universe_seeds_the_expected_constants() {
        let names: Vec<_> = universe()
            .entries
            .iter()
            .filter(|e| matches!(e.def, UniverseDef::Constant(..)))
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["true", "false", "null"]);
    }
}
