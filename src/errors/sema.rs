// src/errors/sema.rs
//! Semantic analysis errors (E2xxx) and warnings (W3xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E2001))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("undeclared name '{name}'")]
    #[diagnostic(code(E2002))]
    UndeclaredName {
        name: String,
        #[label("not found in any enclosing scope")]
        span: SourceSpan,
    },

    #[error("redeclared entity in this scope: '{name}'")]
    #[diagnostic(code(E2003))]
    Redeclared {
        name: String,
        #[label("already declared")]
        span: SourceSpan,
    },

    #[error("only declarations are allowed at file scope")]
    #[diagnostic(code(E2004))]
    OnlyDeclarationsAllowed {
        #[label("not a declaration")]
        span: SourceSpan,
    },

    #[error("missing type or initial expression")]
    #[diagnostic(code(E2005))]
    MissingTypeOrInit {
        #[label("declaration needs a type or a value")]
        span: SourceSpan,
    },

    #[error("extra initial expression")]
    #[diagnostic(code(E2006))]
    ExtraInitExpr {
        #[label("more values than names")]
        span: SourceSpan,
    },

    #[error("initialization cycle for '{name}'")]
    #[diagnostic(code(E2007))]
    InitializationCycle {
        name: String,
        #[label("this declaration depends on itself")]
        span: SourceSpan,
    },

    #[error("break outside of loop")]
    #[diagnostic(code(E2008))]
    InvalidBreak {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("continue outside of loop")]
    #[diagnostic(code(E2009))]
    InvalidContinue {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("cannot take the address of this expression")]
    #[diagnostic(code(E2010), help("only variables are addressable"))]
    NotAddressable {
        #[label("not addressable")]
        span: SourceSpan,
    },

    #[error("cannot assign to '{found}'")]
    #[diagnostic(code(E2011))]
    CannotAssign {
        found: String,
        #[label("not an addressable location")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E2012))]
    WrongArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("{name} expects {expected}, got {found}")]
    #[diagnostic(code(E2013))]
    BuiltinArity {
        name: String,
        /// Preformatted expectation, e.g. "1 argument" or "at least 2 arguments"
        expected: String,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("constant {value} does not fit in {ty}")]
    #[diagnostic(code(E2014))]
    ConstantOverflow {
        value: String,
        ty: String,
        #[label("out of range")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    #[diagnostic(code(E2015))]
    DivisionByZero {
        #[label("divisor is constant zero")]
        span: SourceSpan,
    },

    #[error("negative shift count")]
    #[diagnostic(code(E2016))]
    NegativeShiftCount {
        #[label("shift count must be non-negative")]
        span: SourceSpan,
    },

    #[error("cannot call non-procedure value of type '{ty}'")]
    #[diagnostic(code(E2017))]
    NotCallable {
        ty: String,
        #[label("not a procedure")]
        span: SourceSpan,
    },

    #[error("initializer of constant '{name}' is not a compile-time constant")]
    #[diagnostic(code(E2018))]
    NotConstant {
        name: String,
        #[label("not constant")]
        span: SourceSpan,
    },

    #[error("invalid recursive type '{name}'")]
    #[diagnostic(
        code(E2019),
        help("break the cycle with a pointer, slice, or procedure type")
    )]
    InvalidRecursiveType {
        name: String,
        #[label("type refers to itself without indirection")]
        span: SourceSpan,
    },

    #[error("cannot convert {from} to {to}")]
    #[diagnostic(code(E2020))]
    CannotConvert {
        from: String,
        to: String,
        #[label("invalid conversion")]
        span: SourceSpan,
    },

    #[error("cannot return inside a defer statement")]
    #[diagnostic(code(E2021))]
    ReturnInDefer {
        #[label("defer runs after the return value is decided")]
        span: SourceSpan,
    },

    #[error("expected {expected} return values, got {found}")]
    #[diagnostic(code(E2022))]
    ReturnCountMismatch {
        expected: usize,
        found: usize,
        #[label("wrong number of return values")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a type")]
    #[diagnostic(code(E2023))]
    NotAType {
        name: String,
        #[label("expected a type")]
        span: SourceSpan,
    },

    #[error("static assertion failed")]
    #[diagnostic(code(E2024))]
    StaticAssertFailed {
        #[label("condition is constant false")]
        span: SourceSpan,
    },

    #[error("operator '{op}' is not defined on {ty}")]
    #[diagnostic(code(E2025))]
    InvalidOperation {
        op: String,
        ty: String,
        #[label("invalid operand type")]
        span: SourceSpan,
    },

    #[error("no field '{field}' in {ty}")]
    #[diagnostic(code(E2026))]
    UnknownField {
        field: String,
        ty: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("condition must be boolean, found {found}")]
    #[diagnostic(code(E2027))]
    ConditionNotBool {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("expected {expected} initial values, got {found}")]
    #[diagnostic(code(E2028))]
    ValueCountMismatch {
        expected: usize,
        found: usize,
        #[label("wrong number of values")]
        span: SourceSpan,
    },

    #[error("duplicate field '{name}' in record")]
    #[diagnostic(code(E2029))]
    DuplicateField {
        name: String,
        #[label("field name reused")]
        span: SourceSpan,
    },

    #[error("cannot index {ty}")]
    #[diagnostic(code(E2030))]
    NotIndexable {
        ty: String,
        #[label("not an array, slice, or string")]
        span: SourceSpan,
    },

    #[error("index {index} out of range for {ty}")]
    #[diagnostic(code(E2031))]
    IndexOutOfRange {
        index: String,
        ty: String,
        #[label("constant index exceeds length")]
        span: SourceSpan,
    },

    #[error("cannot dereference {ty}")]
    #[diagnostic(code(E2032))]
    CannotDereference {
        ty: String,
        #[label("not a pointer")]
        span: SourceSpan,
    },

    #[error("array length must be a constant integer")]
    #[diagnostic(code(E2033))]
    InvalidArrayLength {
        #[label("not a constant integer")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("Unused variable `{name}`")]
    #[diagnostic(code(W3001), help("prefix with `_` to silence"))]
    UnusedVariable {
        name: String,
        #[label("never used")]
        span: SourceSpan,
    },

    #[error("unused expression result of type '{ty}'")]
    #[diagnostic(code(W3002), help("use `_ = expr` to discard explicitly"))]
    UnusedExpressionResult {
        ty: String,
        #[label("expression result is not used")]
        span: SourceSpan,
    },
}
