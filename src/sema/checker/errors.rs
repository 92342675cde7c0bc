// src/sema/checker/errors.rs
//! Error and warning reporting helpers for the checker.

use super::{Checker, TypeError, TypeWarning};
use crate::errors::{SemanticError, SemanticWarning};
use crate::frontend::{Interner, Span};
use crate::sema::type_arena::TypeId;

impl<'ast> Checker<'ast> {
    pub(super) fn add_error(&mut self, error: SemanticError, span: Span) {
        self.errors.push(TypeError::new(error, span));
    }

    pub(super) fn add_warning(&mut self, warning: SemanticWarning, span: Span) {
        self.warnings.push(TypeWarning::new(warning, span));
    }

    /// Display a type for error messages.
    pub(super) fn type_display(&self, ty: TypeId, interner: &Interner) -> String {
        self.arena.display(ty, interner)
    }

    pub(super) fn error_type_mismatch(
        &mut self,
        expected: String,
        found: String,
        span: Span,
    ) {
        self.add_error(
            SemanticError::TypeMismatch {
                expected,
                found,
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn error_type_mismatch_id(
        &mut self,
        expected: TypeId,
        found: TypeId,
        span: Span,
        interner: &Interner,
    ) {
        let expected = self.type_display(expected, interner);
        let found = self.type_display(found, interner);
        self.error_type_mismatch(expected, found, span);
    }

    pub(super) fn error_redeclared(&mut self, name: String, span: Span) {
        self.add_error(SemanticError::Redeclared { name, span: span.into() }, span);
    }

    pub(super) fn error_undeclared(&mut self, name: String, span: Span) {
        self.add_error(
            SemanticError::UndeclaredName {
                name,
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn error_init_cycle(&mut self, name: String, span: Span) {
        self.add_error(
            SemanticError::InitializationCycle {
                name,
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn error_invalid_op(
        &mut self,
        op: &str,
        ty: TypeId,
        span: Span,
        interner: &Interner,
    ) {
        let ty = self.type_display(ty, interner);
        self.add_error(
            SemanticError::InvalidOperation {
                op: op.to_string(),
                ty,
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn error_constant_overflow(
        &mut self,
        value: String,
        ty: TypeId,
        span: Span,
        interner: &Interner,
    ) {
        let ty = self.type_display(ty, interner);
        self.add_error(
            SemanticError::ConstantOverflow {
                value,
                ty,
                span: span.into(),
            },
            span,
        );
    }

    /// Builtin arity error: "size_of expects 1 argument, got 2".
    pub(super) fn error_builtin_arity(
        &mut self,
        name: &str,
        expected: usize,
        variadic: bool,
        found: usize,
        span: Span,
    ) {
        let noun = if expected == 1 { "argument" } else { "arguments" };
        let expected = if variadic {
            format!("at least {} {}", expected, noun)
        } else {
            format!("{} {}", expected, noun)
        };
        self.add_error(
            SemanticError::BuiltinArity {
                name: name.to_string(),
                expected,
                found,
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn warn_unused_variable(&mut self, name: String, span: Span) {
        self.add_warning(
            SemanticWarning::UnusedVariable {
                name,
                span: span.into(),
            },
            span,
        );
    }
}
