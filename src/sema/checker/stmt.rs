// src/sema/checker/stmt.rs
//! Statement and procedure-body checking.

use super::Checker;
use crate::errors::{SemanticError, SemanticWarning};
use crate::frontend::ast::{
    AssignStmt, Block, DeclKind, ElseBranch, Expr, ExprKind, IfStmt, Stmt, VariableDecl,
};
use crate::frontend::Interner;
use crate::sema::decl_info::ProcedureInfo;
use crate::sema::entity::EntityKind;
use crate::sema::operand::AddressingMode;
use crate::sema::type_arena::{TypeId, TypeKind};
use crate::sema::types::BasicType;
use crate::sema::value::ExactValue;

impl<'ast> Checker<'ast> {
    /// Check a deferred procedure body: open the body scope under the
    /// declaration's scope, introduce the parameters as pre-used variables,
    /// and walk the statements with the procedure type on the stack.
    pub(super) fn check_procedure_body(&mut self, info: &ProcedureInfo<'ast>, interner: &Interner) {
        let decl = self.decls.get(info.decl);
        let scope = decl.scope;
        let Some(pd) = decl.proc_decl else {
            return;
        };

        let prev = self.enter_decl_context(scope, Some(info.decl));
        self.open_scope(info.body.id);

        let (param_types, variadic) =
            match self.arena.kind(self.arena.base_type(info.ty)).clone() {
                TypeKind::Procedure {
                    params, variadic, ..
                } => (params, variadic),
                _ => (Default::default(), false),
            };
        for (index, param) in pd.params.iter().enumerate() {
            let mut ty = param_types.get(index).copied().unwrap_or(TypeId::INVALID);
            // Inside the body a variadic parameter is a slice of its
            // element type.
            if variadic && index + 1 == pd.params.len() {
                ty = self.arena.slice_of(ty);
            }
            // Parameters are born used so they never trip the
            // unused-variable sweep.
            let entity = self.entities.alloc(
                EntityKind::Variable {
                    used: true,
                    address_taken: false,
                },
                param.name.name,
                param.name.span,
                ty,
            );
            let scope = self.current_scope();
            self.add_entity(scope, Some(&param.name), entity, interner);
        }

        self.push_procedure(info.ty);
        self.check_block_stmts(info.body, interner);
        self.pop_procedure();

        self.close_scope();
        self.restore_context(prev);
    }

    /// Check the statements of a block whose scope is already open.
    fn check_block_stmts(&mut self, block: &'ast Block, interner: &Interner) {
        for stmt in &block.stmts {
            self.check_stmt(stmt, interner);
        }
    }

    /// Open a scope for a block and check it.
    fn check_block(&mut self, block: &'ast Block, interner: &Interner) {
        self.open_scope(block.id);
        self.check_block_stmts(block, interner);
        self.close_scope();
    }

    pub(super) fn check_stmt(&mut self, stmt: &'ast Stmt, interner: &Interner) {
        match stmt {
            Stmt::Decl(decl) => self.check_local_decl(decl, interner),
            Stmt::Assign(assign) => self.check_assign(assign, interner),
            Stmt::Expr(expr_stmt) => {
                let mut op = self.check_expr(&expr_stmt.expr, interner);
                match op.mode {
                    AddressingMode::NoValue | AddressingMode::Invalid => {}
                    _ => {
                        self.convert_to_default(&mut op, interner);
                        let ty = self.type_display(op.ty, interner);
                        self.add_warning(
                            SemanticWarning::UnusedExpressionResult {
                                ty,
                                span: expr_stmt.span.into(),
                            },
                            expr_stmt.span,
                        );
                    }
                }
            }
            Stmt::Block(block) => self.check_block(block, interner),
            Stmt::If(if_stmt) => self.check_if(if_stmt, interner),
            Stmt::For(for_stmt) => {
                self.open_scope(for_stmt.id);
                if let Some(init) = &for_stmt.init {
                    self.check_stmt(init, interner);
                }
                if let Some(cond) = &for_stmt.cond {
                    self.check_condition(cond, interner);
                }
                if let Some(post) = &for_stmt.post {
                    self.check_stmt(post, interner);
                }
                self.loop_depth += 1;
                self.check_block(&for_stmt.body, interner);
                self.loop_depth -= 1;
                self.close_scope();
            }
            Stmt::Return(ret) => {
                if self.in_defer {
                    self.add_error(
                        SemanticError::ReturnInDefer {
                            span: ret.span.into(),
                        },
                        ret.span,
                    );
                    return;
                }
                let result = self
                    .proc_stack
                    .last()
                    .and_then(|&ty| match self.arena.kind(self.arena.base_type(ty)) {
                        TypeKind::Procedure { result, .. } => *result,
                        _ => None,
                    });
                let expected = usize::from(result.is_some());
                if ret.values.len() != expected {
                    self.add_error(
                        SemanticError::ReturnCountMismatch {
                            expected,
                            found: ret.values.len(),
                            span: ret.span.into(),
                        },
                        ret.span,
                    );
                    // The values are still checked so their expressions land
                    // in the tables.
                    for value in &ret.values {
                        let mut op = self.check_expr(value, interner);
                        self.convert_to_default(&mut op, interner);
                    }
                    return;
                }
                if let (Some(result), Some(value)) = (result, ret.values.first()) {
                    let mut op = self.check_expr(value, interner);
                    self.convert_to_typed(&mut op, result, interner);
                }
            }
            Stmt::Defer(defer) => {
                let prev = self.in_defer;
                self.in_defer = true;
                self.check_stmt(&defer.stmt, interner);
                self.in_defer = prev;
            }
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.add_error(
                        SemanticError::InvalidBreak {
                            span: (*span).into(),
                        },
                        *span,
                    );
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    self.add_error(
                        SemanticError::InvalidContinue {
                            span: (*span).into(),
                        },
                        *span,
                    );
                }
            }
        }
    }

    fn check_if(&mut self, if_stmt: &'ast IfStmt, interner: &Interner) {
        self.open_scope(if_stmt.id);
        self.check_condition(&if_stmt.cond, interner);
        self.check_block(&if_stmt.then_block, interner);
        match &if_stmt.else_branch {
            Some(ElseBranch::Else(block)) => self.check_block(block, interner),
            Some(ElseBranch::ElseIf(nested)) => self.check_if(nested, interner),
            None => {}
        }
        self.close_scope();
    }

    fn check_condition(&mut self, cond: &'ast Expr, interner: &Interner) {
        let mut op = self.check_expr(cond, interner);
        if op.is_invalid() {
            return;
        }
        if !self.arena.is_boolean(op.ty) {
            let found = self.type_display(op.ty, interner);
            self.add_error(
                SemanticError::ConditionNotBool {
                    found,
                    span: cond.span.into(),
                },
                cond.span,
            );
            return;
        }
        if self.arena.is_untyped(op.ty) {
            let bool_ty = self.arena.basic(BasicType::Bool);
            self.convert_to_typed(&mut op, bool_ty, interner);
        }
    }

    fn check_assign(&mut self, assign: &'ast AssignStmt, interner: &Interner) {
        if assign.lhs.len() != assign.rhs.len() {
            self.add_error(
                SemanticError::ValueCountMismatch {
                    expected: assign.lhs.len(),
                    found: assign.rhs.len(),
                    span: assign.span.into(),
                },
                assign.span,
            );
        }
        for (lhs, rhs) in assign.lhs.iter().zip(assign.rhs.iter()) {
            // `_ = expr` discards the value.
            if let ExprKind::Identifier(sym) = lhs.kind {
                if sym == self.blank {
                    let mut op = self.check_expr(rhs, interner);
                    self.convert_to_default(&mut op, interner);
                    continue;
                }
            }
            let target = self.check_expr(lhs, interner);
            let mut op = self.check_expr(rhs, interner);
            if target.is_invalid() {
                self.convert_to_default(&mut op, interner);
                continue;
            }
            if target.mode != AddressingMode::Variable {
                let found = self.type_display(target.ty, interner);
                self.add_error(
                    SemanticError::CannotAssign {
                        found,
                        span: lhs.span.into(),
                    },
                    lhs.span,
                );
                self.convert_to_default(&mut op, interner);
                continue;
            }
            self.convert_to_typed(&mut op, target.ty, interner);
        }
    }

    /// A declaration statement inside a procedure body. Locals are checked
    /// immediately; only file-scope declarations go through the
    /// dependency-ordered machinery.
    fn check_local_decl(&mut self, decl: &'ast VariableDecl, interner: &Interner) {
        let declared = decl
            .ty
            .as_ref()
            .map(|te| self.resolve_type_expr(te, false, interner));

        if decl.values.is_empty() && declared.is_none() {
            self.add_error(
                SemanticError::MissingTypeOrInit {
                    span: decl.span.into(),
                },
                decl.span,
            );
        } else if decl.names.len() < decl.values.len() {
            self.add_error(
                SemanticError::ExtraInitExpr {
                    span: decl.span.into(),
                },
                decl.span,
            );
        }

        // One initializer shared by several mutable names would need a
        // multi-value result, which a single expression cannot supply.
        // Immutable declarations pair positionally instead, leaving extra
        // names unbound.
        let shared_init =
            decl.kind == DeclKind::Mutable && decl.values.len() == 1 && decl.names.len() > 1;
        if shared_init {
            let init = &decl.values[0];
            let op = self.check_expr(init, interner);
            if !op.is_invalid() {
                self.add_error(
                    SemanticError::ValueCountMismatch {
                        expected: decl.names.len(),
                        found: 1,
                        span: init.span.into(),
                    },
                    init.span,
                );
            }
        }

        for (index, name) in decl.names.iter().enumerate() {
            let mut const_value = ExactValue::Invalid;
            let ty = if shared_init {
                declared.unwrap_or(TypeId::INVALID)
            } else {
                match decl.values.get(index) {
                    Some(init) => {
                        let mut op = self.check_expr(init, interner);
                        if op.is_invalid() {
                            declared.unwrap_or(TypeId::INVALID)
                        } else if decl.kind == DeclKind::Immutable
                            && op.mode != AddressingMode::Constant
                        {
                            self.add_error(
                                SemanticError::NotConstant {
                                    name: interner.resolve(name.name).to_string(),
                                    span: init.span.into(),
                                },
                                init.span,
                            );
                            declared.unwrap_or(TypeId::INVALID)
                        } else {
                            let target =
                                declared.unwrap_or_else(|| self.arena.default_type(op.ty));
                            self.convert_to_typed(&mut op, target, interner);
                            if op.is_invalid() {
                                TypeId::INVALID
                            } else {
                                const_value = op.value.clone();
                                op.ty
                            }
                        }
                    }
                    None => declared.unwrap_or(TypeId::INVALID),
                }
            };

            let kind = match decl.kind {
                DeclKind::Immutable => EntityKind::Constant { value: const_value },
                DeclKind::Mutable => EntityKind::Variable {
                    used: false,
                    address_taken: false,
                },
            };
            let entity = self.entities.alloc(kind, name.name, name.span, ty);
            let scope = self.current_scope();
            self.add_entity(scope, Some(name), entity, interner);
        }
    }
}
