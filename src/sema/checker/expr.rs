// src/sema/checker/expr.rs
//! Operand propagation through expressions: identifiers, literals,
//! operators with constant folding, calls, conversions, and the untyped
//! commit machinery.

use super::Checker;
use crate::errors::SemanticError;
use crate::frontend::ast::{
    BinaryExpr, BinaryOp, CallExpr, Expr, ExprKind, FieldExpr, IndexExpr, UnaryExpr, UnaryOp,
};
use crate::frontend::{Interner, Span, Symbol};
use crate::sema::decl_info::Color;
use crate::sema::entity::EntityKind;
use crate::sema::operand::{AddressingMode, Operand};
use crate::sema::type_arena::{TypeId, TypeKind};
use crate::sema::types::BasicType;
use crate::sema::universe::BuiltinId;
use crate::sema::value::ExactValue;

impl<'ast> Checker<'ast> {
    /// Check one expression and persist its operand in the side tables.
    pub(super) fn check_expr(&mut self, expr: &'ast Expr, interner: &Interner) -> Operand<'ast> {
        let op = self.check_expr_kind(expr, interner);
        self.record_operand(&op, expr);
        op
    }

    fn check_expr_kind(&mut self, expr: &'ast Expr, interner: &Interner) -> Operand<'ast> {
        match &expr.kind {
            ExprKind::IntLiteral(v) => Operand::constant(
                self.arena.basic(BasicType::UntypedInt),
                ExactValue::Int(*v),
                expr,
            ),
            ExprKind::FloatLiteral(v) => Operand::constant(
                self.arena.basic(BasicType::UntypedFloat),
                ExactValue::Float(*v),
                expr,
            ),
            ExprKind::StringLiteral(s) => Operand::constant(
                self.arena.basic(BasicType::UntypedString),
                ExactValue::string(s),
                expr,
            ),
            ExprKind::RuneLiteral(c) => Operand::constant(
                self.arena.basic(BasicType::UntypedRune),
                ExactValue::Int(*c as i128),
                expr,
            ),
            ExprKind::Identifier(sym) => self.check_ident(expr, *sym, interner),
            ExprKind::Paren(inner) => {
                let mut op = self.check_expr(inner, interner);
                op.expr = Some(expr);
                op
            }
            ExprKind::Unary(unary) => self.check_unary(expr, unary, interner),
            ExprKind::Binary(binary) => self.check_binary(expr, binary, interner),
            ExprKind::Call(call) => self.check_call(expr, call, interner),
            ExprKind::Index(index) => self.check_index(expr, index, interner),
            ExprKind::Field(field) => self.check_field(expr, field, interner),
        }
    }

    // ---- identifiers -----------------------------------------------------

    fn check_ident(
        &mut self,
        expr: &'ast Expr,
        sym: Symbol,
        interner: &Interner,
    ) -> Operand<'ast> {
        let Some((_, entity)) = self.scopes.lookup(self.current_scope(), sym) else {
            self.error_undeclared(interner.resolve(sym).to_string(), expr.span);
            return Operand::invalid();
        };
        self.add_entity_use(expr.id, entity);
        self.add_decl_dependency(entity);
        self.entities.mark_used(entity);

        // Force-check the entity's own declaration first; re-entering a grey
        // declaration from expression position is an initialization cycle,
        // except for type names, whose nominal handle already exists.
        if let Some(&decl_id) = self.entity_decls.get(&entity) {
            match self.decls.get(decl_id).mark {
                Color::White => self.check_entity_decl(entity, interner),
                Color::Grey => {
                    if !matches!(self.entities.get(entity).kind, EntityKind::TypeName) {
                        self.error_init_cycle(interner.resolve(sym).to_string(), expr.span);
                        return Operand::invalid();
                    }
                }
                Color::Black => {}
            }
        }

        let info = self.entities.get(entity);
        match &info.kind {
            EntityKind::Constant { value } => {
                if value.is_invalid() || self.arena.is_invalid(info.ty) {
                    return Operand::invalid();
                }
                Operand::constant(info.ty, value.clone(), expr)
            }
            EntityKind::Variable { .. } => {
                if self.arena.is_invalid(info.ty) {
                    return Operand::invalid();
                }
                let mut op = Operand::new(AddressingMode::Variable, info.ty, expr);
                op.entity = Some(entity);
                op
            }
            EntityKind::TypeName => Operand::new(AddressingMode::Type, info.ty, expr),
            EntityKind::Procedure => Operand::new(AddressingMode::Value, info.ty, expr),
            EntityKind::Builtin(id) => {
                let mut op = Operand::new(AddressingMode::Builtin, TypeId::INVALID, expr);
                op.builtin = Some(*id);
                op
            }
        }
    }

    // ---- unary operators -------------------------------------------------

    /// Reject type, builtin, and no-value operands in value positions.
    fn expect_value(&mut self, op: &Operand<'ast>, interner: &Interner) -> bool {
        match op.mode {
            AddressingMode::Type | AddressingMode::Builtin | AddressingMode::NoValue => {
                let found = match op.mode {
                    AddressingMode::Type => self.type_display(op.ty, interner),
                    AddressingMode::Builtin => "builtin procedure".to_string(),
                    _ => "no value".to_string(),
                };
                let span = op.expr.map(|e| e.span).unwrap_or_default();
                self.error_type_mismatch("a value".to_string(), found, span);
                false
            }
            _ => true,
        }
    }

    fn check_unary(
        &mut self,
        expr: &'ast Expr,
        unary: &'ast UnaryExpr,
        interner: &Interner,
    ) -> Operand<'ast> {
        let mut op = self.check_expr(&unary.operand, interner);
        if op.is_invalid() {
            return Operand::invalid();
        }
        if !self.expect_value(&op, interner) {
            return Operand::invalid();
        }

        match unary.op {
            UnaryOp::AddressOf => {
                if op.mode != AddressingMode::Variable {
                    self.add_error(
                        SemanticError::NotAddressable {
                            span: unary.operand.span.into(),
                        },
                        unary.operand.span,
                    );
                    return Operand::invalid();
                }
                if let Some(entity) = op.entity {
                    self.entities.mark_address_taken(entity);
                }
                let ptr = self.arena.pointer_to(op.ty);
                Operand::new(AddressingMode::Value, ptr, expr)
            }
            UnaryOp::Deref => match self.arena.kind(self.arena.base_type(op.ty)).clone() {
                TypeKind::Pointer(elem) => Operand::new(AddressingMode::Variable, elem, expr),
                _ => {
                    let ty = self.type_display(op.ty, interner);
                    self.add_error(
                        SemanticError::CannotDereference {
                            ty,
                            span: expr.span.into(),
                        },
                        expr.span,
                    );
                    Operand::invalid()
                }
            },
            UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot => {
                let ok = match unary.op {
                    UnaryOp::Neg => self.arena.is_numeric(op.ty),
                    UnaryOp::Not => self.arena.is_boolean(op.ty),
                    _ => self.arena.is_integer(op.ty),
                };
                if !ok {
                    self.error_invalid_op(unary.op.as_str(), op.ty, expr.span, interner);
                    return Operand::invalid();
                }
                if op.is_constant() {
                    let value = op.value.unary_op(unary.op);
                    if value.is_invalid() {
                        self.error_constant_overflow(
                            op.value.to_string(),
                            op.ty,
                            expr.span,
                            interner,
                        );
                        return Operand::invalid();
                    }
                    return Operand::constant(op.ty, value, expr);
                }
                op.mode = AddressingMode::Value;
                op.expr = Some(expr);
                op.entity = None;
                op
            }
        }
    }

    // ---- binary operators ------------------------------------------------

    fn check_binary(
        &mut self,
        expr: &'ast Expr,
        binary: &'ast BinaryExpr,
        interner: &Interner,
    ) -> Operand<'ast> {
        let mut lhs = self.check_expr(&binary.left, interner);
        let mut rhs = self.check_expr(&binary.right, interner);
        if lhs.is_invalid() || rhs.is_invalid() {
            return Operand::invalid();
        }
        if !self.expect_value(&lhs, interner) || !self.expect_value(&rhs, interner) {
            return Operand::invalid();
        }

        if binary.op.is_comparison() {
            return self.check_comparison(expr, binary, lhs, rhs, interner);
        }
        if binary.op.is_shift() {
            return self.check_shift(expr, binary, lhs, rhs, interner);
        }

        // One-way untyped promotion: if exactly one side is untyped it is
        // committed to the other's type, subject to the range check.
        let lhs_untyped = self.arena.is_untyped(lhs.ty);
        let rhs_untyped = self.arena.is_untyped(rhs.ty);
        if lhs_untyped && !rhs_untyped {
            self.convert_to_typed(&mut lhs, rhs.ty, interner);
            if lhs.is_invalid() {
                return Operand::invalid();
            }
        } else if rhs_untyped && !lhs_untyped {
            self.convert_to_typed(&mut rhs, lhs.ty, interner);
            if rhs.is_invalid() {
                return Operand::invalid();
            }
        } else if lhs_untyped && rhs_untyped {
            let promoted = self.promote_untyped(lhs.ty, rhs.ty);
            self.convert_to_typed(&mut lhs, promoted, interner);
            self.convert_to_typed(&mut rhs, promoted, interner);
        } else if !self.arena.assignable(lhs.ty, rhs.ty) && !self.arena.assignable(rhs.ty, lhs.ty) {
            let expected = self.type_display(lhs.ty, interner);
            let found = self.type_display(rhs.ty, interner);
            self.error_type_mismatch(expected, found, expr.span);
            return Operand::invalid();
        }

        let ok = match binary.op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.arena.is_numeric(lhs.ty)
            }
            BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                self.arena.is_integer(lhs.ty)
            }
            BinaryOp::And | BinaryOp::Or => self.arena.is_boolean(lhs.ty),
            _ => unreachable!("comparisons and shifts handled above"),
        };
        if !ok {
            self.error_invalid_op(binary.op.as_str(), lhs.ty, expr.span, interner);
            return Operand::invalid();
        }

        if matches!(binary.op, BinaryOp::Div | BinaryOp::Mod)
            && rhs.is_constant()
            && rhs.value.is_zero()
        {
            self.add_error(
                SemanticError::DivisionByZero {
                    span: binary.right.span.into(),
                },
                binary.right.span,
            );
            return Operand::invalid();
        }

        if lhs.is_constant() && rhs.is_constant() {
            let value = lhs.value.binary_op(binary.op, &rhs.value);
            if value.is_invalid() {
                self.error_constant_overflow(lhs.value.to_string(), lhs.ty, expr.span, interner);
                return Operand::invalid();
            }
            return Operand::constant(lhs.ty, value, expr);
        }
        Operand::new(AddressingMode::Value, lhs.ty, expr)
    }

    fn check_comparison(
        &mut self,
        expr: &'ast Expr,
        binary: &'ast BinaryExpr,
        mut lhs: Operand<'ast>,
        mut rhs: Operand<'ast>,
        interner: &Interner,
    ) -> Operand<'ast> {
        let lhs_untyped = self.arena.is_untyped(lhs.ty);
        let rhs_untyped = self.arena.is_untyped(rhs.ty);

        if lhs_untyped && rhs_untyped {
            // Two untyped constants compare in the value domain and yield an
            // untyped bool; their own entries stay pending until finalize.
            let Some(ordering) = lhs.value.compare(&rhs.value) else {
                let expected = self.type_display(lhs.ty, interner);
                let found = self.type_display(rhs.ty, interner);
                self.error_type_mismatch(expected, found, expr.span);
                return Operand::invalid();
            };
            let result = comparison_holds(binary.op, ordering);
            return Operand::constant(
                self.arena.basic(BasicType::UntypedBool),
                ExactValue::Bool(result),
                expr,
            );
        }

        if lhs_untyped {
            self.convert_to_typed(&mut lhs, rhs.ty, interner);
        } else if rhs_untyped {
            self.convert_to_typed(&mut rhs, lhs.ty, interner);
        }
        if lhs.is_invalid() || rhs.is_invalid() {
            return Operand::invalid();
        }

        if !self.arena.assignable(lhs.ty, rhs.ty) && !self.arena.assignable(rhs.ty, lhs.ty) {
            let expected = self.type_display(lhs.ty, interner);
            let found = self.type_display(rhs.ty, interner);
            self.error_type_mismatch(expected, found, expr.span);
            return Operand::invalid();
        }

        // Ordering comparisons need an ordered operand type; equality works
        // on any matching types.
        let ordered_op = !matches!(binary.op, BinaryOp::Eq | BinaryOp::Ne);
        if ordered_op {
            let ordered = self
                .arena
                .as_basic(lhs.ty)
                .is_some_and(|basic| basic.is_ordered());
            if !ordered {
                self.error_invalid_op(binary.op.as_str(), lhs.ty, expr.span, interner);
                return Operand::invalid();
            }
        }

        let bool_ty = self.arena.basic(BasicType::Bool);
        if lhs.is_constant() && rhs.is_constant() {
            if let Some(ordering) = lhs.value.compare(&rhs.value) {
                let result = comparison_holds(binary.op, ordering);
                return Operand::constant(bool_ty, ExactValue::Bool(result), expr);
            }
        }
        Operand::new(AddressingMode::Value, bool_ty, expr)
    }

    fn check_shift(
        &mut self,
        expr: &'ast Expr,
        binary: &'ast BinaryExpr,
        mut lhs: Operand<'ast>,
        rhs: Operand<'ast>,
        interner: &Interner,
    ) -> Operand<'ast> {
        if !self.arena.is_integer(lhs.ty) {
            self.error_invalid_op(binary.op.as_str(), lhs.ty, expr.span, interner);
            return Operand::invalid();
        }
        if !self.arena.is_integer(rhs.ty) {
            self.error_invalid_op(binary.op.as_str(), rhs.ty, binary.right.span, interner);
            return Operand::invalid();
        }
        if rhs.is_constant() {
            if let Some(count) = rhs.value.as_int() {
                if count < 0 {
                    self.add_error(
                        SemanticError::NegativeShiftCount {
                            span: binary.right.span.into(),
                        },
                        binary.right.span,
                    );
                    return Operand::invalid();
                }
            }
        }

        // A shifted untyped constant keeps its untyped category only while
        // the count is also constant; otherwise it takes its default type.
        if self.arena.is_untyped(lhs.ty) && !rhs.is_constant() {
            let default = self.arena.default_type(lhs.ty);
            self.convert_to_typed(&mut lhs, default, interner);
            if lhs.is_invalid() {
                return Operand::invalid();
            }
        }

        if lhs.is_constant() && rhs.is_constant() {
            let value = lhs.value.binary_op(binary.op, &rhs.value);
            if value.is_invalid() {
                self.error_constant_overflow(lhs.value.to_string(), lhs.ty, expr.span, interner);
                return Operand::invalid();
            }
            return Operand::constant(lhs.ty, value, expr);
        }
        Operand::new(AddressingMode::Value, lhs.ty, expr)
    }

    /// The common untyped category of two untyped operands:
    /// float > rune > int, bools and the rest only with themselves.
    fn promote_untyped(&self, a: TypeId, b: TypeId) -> TypeId {
        let (Some(ba), Some(bb)) = (self.arena.as_basic(a), self.arena.as_basic(b)) else {
            return a;
        };
        if ba == BasicType::UntypedFloat || bb == BasicType::UntypedFloat {
            return self.arena.basic(BasicType::UntypedFloat);
        }
        if ba == BasicType::UntypedRune || bb == BasicType::UntypedRune {
            return self.arena.basic(BasicType::UntypedRune);
        }
        a
    }

    // ---- calls -----------------------------------------------------------

    fn check_call(
        &mut self,
        expr: &'ast Expr,
        call: &'ast CallExpr,
        interner: &Interner,
    ) -> Operand<'ast> {
        let callee = self.check_expr(&call.callee, interner);
        match callee.mode {
            AddressingMode::Invalid => Operand::invalid(),
            AddressingMode::Builtin => {
                let id = callee.builtin.expect("builtin operand carries its id");
                self.check_builtin_call(expr, call, id, interner)
            }
            AddressingMode::Type => self.check_conversion(expr, call, callee.ty, interner),
            _ => self.check_procedure_call(expr, call, callee, interner),
        }
    }

    fn check_procedure_call(
        &mut self,
        expr: &'ast Expr,
        call: &'ast CallExpr,
        callee: Operand<'ast>,
        interner: &Interner,
    ) -> Operand<'ast> {
        let TypeKind::Procedure {
            params,
            result,
            variadic,
        } = self.arena.kind(self.arena.base_type(callee.ty)).clone()
        else {
            let ty = self.type_display(callee.ty, interner);
            self.add_error(
                SemanticError::NotCallable {
                    ty,
                    span: call.callee.span.into(),
                },
                call.callee.span,
            );
            return Operand::invalid();
        };

        let fixed = if variadic {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };
        let count_ok = if variadic {
            call.args.len() >= fixed
        } else {
            call.args.len() == params.len()
        };
        if !count_ok {
            self.add_error(
                SemanticError::WrongArgumentCount {
                    expected: params.len(),
                    found: call.args.len(),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return Operand::invalid();
        }

        for (index, arg) in call.args.iter().enumerate() {
            let target = if index < fixed {
                params[index]
            } else {
                // trailing arguments feed the variadic element type
                *params.last().expect("variadic procedure has a parameter")
            };
            let mut op = self.check_expr(arg, interner);
            if op.is_invalid() {
                continue;
            }
            self.convert_to_typed(&mut op, target, interner);
        }

        match result {
            Some(result) => Operand::new(AddressingMode::Value, result, expr),
            None => Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr),
        }
    }

    fn check_conversion(
        &mut self,
        expr: &'ast Expr,
        call: &'ast CallExpr,
        target: TypeId,
        interner: &Interner,
    ) -> Operand<'ast> {
        if call.args.len() != 1 {
            self.add_error(
                SemanticError::WrongArgumentCount {
                    expected: 1,
                    found: call.args.len(),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return Operand::invalid();
        }
        let mut op = self.check_expr(&call.args[0], interner);
        if op.is_invalid() || self.arena.is_invalid(target) {
            return Operand::invalid();
        }

        if self.arena.is_untyped(op.ty) {
            // An untyped constant converts by committing, with its range
            // check; the conversion call just names the context type.
            self.convert_to_typed(&mut op, target, interner);
            if op.is_invalid() {
                return Operand::invalid();
            }
            return Operand::constant(target, op.value.clone(), expr);
        }

        if !self.arena.convertible(op.ty, target) {
            let from = self.type_display(op.ty, interner);
            let to = self.type_display(target, interner);
            self.add_error(
                SemanticError::CannotConvert {
                    from,
                    to,
                    span: expr.span.into(),
                },
                expr.span,
            );
            return Operand::invalid();
        }

        if op.is_constant() {
            if let Some(basic) = self.arena.as_basic(target) {
                if !op.value.fits_in(basic) {
                    self.error_constant_overflow(op.value.to_string(), target, expr.span, interner);
                    return Operand::invalid();
                }
                return Operand::constant(target, op.value.convert_for(basic), expr);
            }
        }
        Operand::new(AddressingMode::Value, target, expr)
    }

    // ---- builtins ----------------------------------------------------------

    fn check_builtin_call(
        &mut self,
        expr: &'ast Expr,
        call: &'ast CallExpr,
        id: BuiltinId,
        interner: &Interner,
    ) -> Operand<'ast> {
        let info = id.info();
        let count_ok = if info.variadic {
            call.args.len() >= info.arg_count
        } else {
            call.args.len() == info.arg_count
        };
        if !count_ok {
            self.error_builtin_arity(
                info.name,
                info.arg_count,
                info.variadic,
                call.args.len(),
                expr.span,
            );
            return Operand::invalid();
        }

        let untyped_int = self.arena.basic(BasicType::UntypedInt);
        let int_ty = self.arena.basic(BasicType::Int);

        match id {
            BuiltinId::SizeOf | BuiltinId::AlignOf => {
                let op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                if op.mode != AddressingMode::Type {
                    let found = self.type_display(op.ty, interner);
                    self.error_type_mismatch("a type".to_string(), found, call.args[0].span);
                    return Operand::invalid();
                }
                let n = match id {
                    BuiltinId::SizeOf => self.arena.size_of(op.ty),
                    _ => self.arena.align_of(op.ty),
                };
                Operand::constant(untyped_int, ExactValue::Int(n as i128), expr)
            }
            BuiltinId::SizeOfVal | BuiltinId::AlignOfVal => {
                let op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                let ty = self.arena.default_type(op.ty);
                let n = match id {
                    BuiltinId::SizeOfVal => self.arena.size_of(ty),
                    _ => self.arena.align_of(ty),
                };
                Operand::constant(untyped_int, ExactValue::Int(n as i128), expr)
            }
            BuiltinId::OffsetOf => {
                let op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                if op.mode != AddressingMode::Type {
                    let found = self.type_display(op.ty, interner);
                    self.error_type_mismatch("a type".to_string(), found, call.args[0].span);
                    return Operand::invalid();
                }
                // The second argument is a field name, not an expression to
                // resolve; it is read off the AST directly.
                let ExprKind::Identifier(field) = call.args[1].kind else {
                    self.error_type_mismatch(
                        "a field name".to_string(),
                        "expression".to_string(),
                        call.args[1].span,
                    );
                    return Operand::invalid();
                };
                self.builtin_offset_of(expr, op.ty, field, call.args[1].span, interner)
            }
            BuiltinId::OffsetOfVal => {
                let ExprKind::Field(field_expr) = &call.args[0].kind else {
                    self.error_type_mismatch(
                        "a field selection".to_string(),
                        "expression".to_string(),
                        call.args[0].span,
                    );
                    return Operand::invalid();
                };
                let op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                let object_ty = self
                    .types
                    .get(&field_expr.object.id)
                    .map(|tv| tv.ty)
                    .unwrap_or(TypeId::INVALID);
                self.builtin_offset_of(
                    expr,
                    object_ty,
                    field_expr.field,
                    field_expr.field_span,
                    interner,
                )
            }
            BuiltinId::StaticAssert => {
                let mut op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                if !op.is_constant() || !self.arena.is_boolean(op.ty) {
                    let found = self.type_display(op.ty, interner);
                    self.error_type_mismatch(
                        "constant boolean condition".to_string(),
                        found,
                        call.args[0].span,
                    );
                    return Operand::invalid();
                }
                let bool_ty = self.arena.basic(BasicType::Bool);
                self.convert_to_typed(&mut op, bool_ty, interner);
                if op.value.as_bool() == Some(false) {
                    self.add_error(
                        SemanticError::StaticAssertFailed {
                            span: call.args[0].span.into(),
                        },
                        call.args[0].span,
                    );
                }
                Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr)
            }
            BuiltinId::Len | BuiltinId::Cap => {
                let op = self.check_expr(&call.args[0], interner);
                if op.is_invalid() {
                    return Operand::invalid();
                }
                match self.arena.kind(self.arena.base_type(op.ty)).clone() {
                    TypeKind::Array { len, .. } => {
                        Operand::constant(untyped_int, ExactValue::Int(len as i128), expr)
                    }
                    TypeKind::Slice(_) => Operand::new(AddressingMode::Value, int_ty, expr),
                    TypeKind::Basic(basic)
                        if basic.is_string() && id == BuiltinId::Len =>
                    {
                        if let ExactValue::String(s) = &op.value {
                            Operand::constant(untyped_int, ExactValue::Int(s.len() as i128), expr)
                        } else {
                            Operand::new(AddressingMode::Value, int_ty, expr)
                        }
                    }
                    _ => {
                        let expected = if id == BuiltinId::Len {
                            "array, slice, or string"
                        } else {
                            "array or slice"
                        };
                        let found = self.type_display(op.ty, interner);
                        self.error_type_mismatch(
                            expected.to_string(),
                            found,
                            call.args[0].span,
                        );
                        Operand::invalid()
                    }
                }
            }
            BuiltinId::Copy => {
                let dst = self.check_expr(&call.args[0], interner);
                let src = self.check_expr(&call.args[1], interner);
                if dst.is_invalid() || src.is_invalid() {
                    return Operand::invalid();
                }
                let TypeKind::Slice(dst_elem) =
                    self.arena.kind(self.arena.base_type(dst.ty)).clone()
                else {
                    let found = self.type_display(dst.ty, interner);
                    self.error_type_mismatch("a slice".to_string(), found, call.args[0].span);
                    return Operand::invalid();
                };
                let src_ok = match self.arena.kind(self.arena.base_type(src.ty)).clone() {
                    TypeKind::Slice(src_elem) => src_elem == dst_elem,
                    TypeKind::Basic(basic) if basic.is_string() => {
                        dst_elem == self.arena.basic(BasicType::U8)
                    }
                    _ => false,
                };
                if !src_ok {
                    let expected = self.type_display(dst.ty, interner);
                    let found = self.type_display(src.ty, interner);
                    self.error_type_mismatch(expected, found, call.args[1].span);
                    return Operand::invalid();
                }
                Operand::new(AddressingMode::Value, int_ty, expr)
            }
            BuiltinId::CopyBytes => {
                let dst = self.check_expr(&call.args[0], interner);
                let src = self.check_expr(&call.args[1], interner);
                let mut n = self.check_expr(&call.args[2], interner);
                for (op, arg) in [(&dst, &call.args[0]), (&src, &call.args[1])] {
                    if !op.is_invalid() && !self.arena.is_pointer_shaped(op.ty) {
                        let found = self.type_display(op.ty, interner);
                        self.error_type_mismatch("a pointer".to_string(), found, arg.span);
                    }
                }
                if !n.is_invalid() {
                    self.convert_to_typed(&mut n, int_ty, interner);
                }
                Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr)
            }
            BuiltinId::Print | BuiltinId::Println => {
                for arg in &call.args {
                    let mut op = self.check_expr(arg, interner);
                    if !op.is_invalid() {
                        self.convert_to_default(&mut op, interner);
                    }
                }
                Operand::new(AddressingMode::NoValue, TypeId::INVALID, expr)
            }
        }
    }

    fn builtin_offset_of(
        &mut self,
        expr: &'ast Expr,
        record_ty: TypeId,
        field: Symbol,
        field_span: Span,
        interner: &Interner,
    ) -> Operand<'ast> {
        if self.arena.is_invalid(record_ty) {
            return Operand::invalid();
        }
        match self.arena.offset_of(record_ty, field) {
            Some(offset) => Operand::constant(
                self.arena.basic(BasicType::UntypedInt),
                ExactValue::Int(offset as i128),
                expr,
            ),
            None => {
                let ty = self.type_display(record_ty, interner);
                self.add_error(
                    SemanticError::UnknownField {
                        field: interner.resolve(field).to_string(),
                        ty,
                        span: field_span.into(),
                    },
                    field_span,
                );
                Operand::invalid()
            }
        }
    }

    // ---- index and field selection ----------------------------------------

    fn check_index(
        &mut self,
        expr: &'ast Expr,
        index: &'ast IndexExpr,
        interner: &Interner,
    ) -> Operand<'ast> {
        let obj = self.check_expr(&index.object, interner);
        let mut idx = self.check_expr(&index.index, interner);
        if obj.is_invalid() || idx.is_invalid() {
            return Operand::invalid();
        }

        let (elem, known_len) = match self.arena.kind(self.arena.base_type(obj.ty)).clone() {
            TypeKind::Array { elem, len } => (elem, Some(len)),
            TypeKind::Slice(elem) => (elem, None),
            TypeKind::Basic(basic) if basic.is_string() => {
                let len = match &obj.value {
                    ExactValue::String(s) if obj.is_constant() => Some(s.len() as u64),
                    _ => None,
                };
                (self.arena.basic(BasicType::U8), len)
            }
            _ => {
                let ty = self.type_display(obj.ty, interner);
                self.add_error(
                    SemanticError::NotIndexable {
                        ty,
                        span: index.object.span.into(),
                    },
                    index.object.span,
                );
                return Operand::invalid();
            }
        };

        let int_ty = self.arena.basic(BasicType::Int);
        self.convert_to_typed(&mut idx, int_ty, interner);
        if idx.is_invalid() {
            return Operand::invalid();
        }
        if idx.is_constant() {
            if let Some(value) = idx.value.as_int() {
                let out_of_range = value < 0
                    || known_len.is_some_and(|len| value as u64 >= len);
                if out_of_range {
                    let ty = self.type_display(obj.ty, interner);
                    self.add_error(
                        SemanticError::IndexOutOfRange {
                            index: value.to_string(),
                            ty,
                            span: index.index.span.into(),
                        },
                        index.index.span,
                    );
                    return Operand::invalid();
                }
            }
        }

        let mode = if obj.mode == AddressingMode::Variable {
            AddressingMode::Variable
        } else {
            AddressingMode::Value
        };
        let mut op = Operand::new(mode, elem, expr);
        op.entity = obj.entity;
        op
    }

    fn check_field(
        &mut self,
        expr: &'ast Expr,
        field: &'ast FieldExpr,
        interner: &Interner,
    ) -> Operand<'ast> {
        let obj = self.check_expr(&field.object, interner);
        if obj.is_invalid() {
            return Operand::invalid();
        }
        let Some(field_ty) = self.arena.field_type(obj.ty, field.field) else {
            let ty = self.type_display(obj.ty, interner);
            self.add_error(
                SemanticError::UnknownField {
                    field: interner.resolve(field.field).to_string(),
                    ty,
                    span: field.field_span.into(),
                },
                field.field_span,
            );
            return Operand::invalid();
        };
        let mode = if obj.mode == AddressingMode::Variable {
            AddressingMode::Variable
        } else {
            AddressingMode::Value
        };
        let mut op = Operand::new(mode, field_ty, expr);
        op.entity = obj.entity;
        op
    }

    // ---- untyped commit ----------------------------------------------------

    /// Commit an operand into a typed context of type `target`. Typed
    /// operands are checked for assignability; untyped operands are range
    /// checked, acquire the target type, and their pending subexpression
    /// entries migrate into the type table.
    pub(super) fn convert_to_typed(
        &mut self,
        op: &mut Operand<'ast>,
        target: TypeId,
        interner: &Interner,
    ) {
        if op.is_invalid() {
            return;
        }
        if self.arena.is_invalid(target) {
            op.invalidate();
            return;
        }
        if !self.arena.is_untyped(op.ty) {
            if !self.arena.assignable(op.ty, target) {
                let span = op.expr.map(|e| e.span).unwrap_or_default();
                self.error_type_mismatch_id(target, op.ty, span, interner);
                op.invalidate();
            }
            return;
        }

        let source = self
            .arena
            .as_basic(op.ty)
            .expect("untyped operands are basic");

        // Promoting toward another untyped category keeps the entry pending.
        if self.arena.is_untyped(target) {
            let target_basic = self.arena.as_basic(target).expect("untyped target is basic");
            let same_category = (source.is_numeric() && target_basic.is_numeric())
                || (source.is_boolean() && target_basic.is_boolean())
                || (source.is_string() && target_basic.is_string())
                || (source.is_pointer() && target_basic.is_pointer());
            if !same_category {
                let span = op.expr.map(|e| e.span).unwrap_or_default();
                self.error_type_mismatch_id(target, op.ty, span, interner);
                op.invalidate();
                return;
            }
            op.value = op.value.convert_for(target_basic);
            op.ty = target;
            if let Some(expr) = op.expr {
                self.update_expr_type(expr, target, false);
            }
            return;
        }

        let compatible = match source {
            BasicType::UntypedBool => self.arena.is_boolean(target),
            BasicType::UntypedInt | BasicType::UntypedRune => self.arena.is_numeric(target),
            BasicType::UntypedFloat => {
                let target_basic = self.arena.as_basic(target);
                target_basic.is_some_and(|b| b.is_float())
                    || (self.arena.is_integer(target)
                        && matches!(op.value, ExactValue::Float(f) if f.fract() == 0.0))
            }
            BasicType::UntypedString => self
                .arena
                .as_basic(target)
                .is_some_and(|b| b.is_string()),
            BasicType::UntypedPointer => self.arena.is_pointer_shaped(target),
            _ => false,
        };
        if !compatible {
            let span = op.expr.map(|e| e.span).unwrap_or_default();
            self.error_type_mismatch_id(target, op.ty, span, interner);
            op.invalidate();
            return;
        }

        if op.is_constant() {
            if let Some(basic) = self.arena.as_basic(target) {
                if !op.value.fits_in(basic) {
                    let span = op.expr.map(|e| e.span).unwrap_or_default();
                    self.error_constant_overflow(op.value.to_string(), target, span, interner);
                    op.invalidate();
                    return;
                }
                op.value = op.value.convert_for(basic);
            }
        }

        op.ty = target;
        if let Some(expr) = op.expr {
            self.update_expr_type(expr, target, true);
        }
    }

    /// Commit an untyped operand at its default type.
    pub(super) fn convert_to_default(&mut self, op: &mut Operand<'ast>, interner: &Interner) {
        if !op.is_invalid() && self.arena.is_untyped(op.ty) {
            let default = self.arena.default_type(op.ty);
            self.convert_to_typed(op, default, interner);
        }
    }

    /// Re-commit a pending untyped expression (and the untyped operands it
    /// was built from) to the type its context determined. While the type is
    /// still an untyped category the entry only records the promotion; a
    /// concrete type migrates the entry into the type table.
    fn update_expr_type(&mut self, expr: &'ast Expr, ty: TypeId, commit: bool) {
        let Some(info) = self.untyped.get(expr.id).cloned() else {
            return;
        };

        // Operand expressions of the same category follow the parent:
        // arithmetic and logical operands share the parent's type, shift
        // counts and comparison operands were typed independently.
        match &expr.kind {
            ExprKind::Paren(inner) => self.update_expr_type(inner, ty, commit),
            ExprKind::Unary(unary)
                if !matches!(unary.op, UnaryOp::AddressOf | UnaryOp::Deref) =>
            {
                self.update_expr_type(&unary.operand, ty, commit);
            }
            ExprKind::Binary(binary)
                if !binary.op.is_comparison() && !binary.op.is_shift() =>
            {
                self.update_expr_type(&binary.left, ty, commit);
                self.update_expr_type(&binary.right, ty, commit);
            }
            ExprKind::Binary(binary) if binary.op.is_shift() => {
                self.update_expr_type(&binary.left, ty, commit);
            }
            _ => {}
        }

        if !commit && self.arena.is_untyped(ty) {
            self.add_untyped(expr.id, info.is_lhs, info.mode, ty, info.value);
            return;
        }
        self.untyped.remove(expr.id);
        let value = match self.arena.as_basic(ty) {
            Some(basic) => info.value.convert_for(basic),
            None => info.value,
        };
        self.add_type_and_value(expr.id, info.mode, ty, value);
    }
}

/// Does `op` hold for the given ordering?
fn comparison_holds(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Eq => ordering == Equal,
        BinaryOp::Ne => ordering != Equal,
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Le => ordering != Greater,
        BinaryOp::Ge => ordering != Less,
        _ => unreachable!("not a comparison"),
    }
}
