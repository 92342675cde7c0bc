// src/sema/checker/declarations.rs
//! Collection and dependency-ordered checking of file-scope declarations.

use smallvec::SmallVec;

use super::Checker;
use crate::errors::SemanticError;
use crate::frontend::ast::{
    Decl, DeclKind, Param, ProcDecl, SourceFile, TypeDecl, TypeExpr, VariableDecl,
};
use crate::frontend::{Ident, Interner, Symbol};
use crate::sema::decl_info::{Color, DeclId, DeclInfo, ProcedureInfo};
use crate::sema::entity::{EntityId, EntityKind};
use crate::sema::operand::AddressingMode;
use crate::sema::type_arena::{RecordField, TypeId, TypeIdVec};
use crate::sema::types::BasicType;
use crate::sema::value::ExactValue;

impl<'ast> Checker<'ast> {
    // ---- collect pass ---------------------------------------------------

    pub(super) fn collect_file(&mut self, file: &'ast SourceFile, interner: &Interner) {
        for decl in &file.decls {
            match decl {
                Decl::Variable(vd) => self.collect_variable_decl(vd, interner),
                Decl::Type(td) => self.collect_type_decl(td, interner),
                Decl::Procedure(pd) => self.collect_proc_decl(pd, interner),
                Decl::Import(_) => {
                    // Imports are collected by the module loader, not here.
                }
                Decl::Statement(stmt) => {
                    let span = stmt.span();
                    self.add_error(
                        SemanticError::OnlyDeclarationsAllowed { span: span.into() },
                        span,
                    );
                }
                Decl::Bad(_) => {}
            }
        }
    }

    fn collect_variable_decl(&mut self, vd: &'ast VariableDecl, interner: &Interner) {
        match vd.kind {
            DeclKind::Immutable => {
                // Pair names with values positionally. Extra names are left
                // unbound: a trailing multi-value initializer may later
                // supply them, so only the other direction is flagged.
                for (name, value) in vd.names.iter().zip(vd.values.iter()) {
                    let entity = self.entities.alloc(
                        EntityKind::Constant {
                            value: ExactValue::Invalid,
                        },
                        name.name,
                        name.span,
                        TypeId::INVALID,
                    );
                    let mut info = DeclInfo::new(self.global_scope());
                    info.entities.push(entity);
                    info.type_expr = vd.ty.as_ref();
                    info.init_expr = Some(value);
                    let decl = self.decls.alloc(info);
                    self.add_file_entity(name, entity, decl, interner);
                }

                if vd.values.is_empty() && vd.ty.is_none() {
                    self.add_error(
                        SemanticError::MissingTypeOrInit {
                            span: vd.span.into(),
                        },
                        vd.span,
                    );
                } else if vd.names.len() < vd.values.len() {
                    self.add_error(
                        SemanticError::ExtraInitExpr {
                            span: vd.span.into(),
                        },
                        vd.span,
                    );
                }
            }
            DeclKind::Mutable => {
                // A single initializer shared by several names is one
                // declaration record (the initializer may be a multi-value
                // call); otherwise each name gets its own record.
                let shared = if vd.values.len() == 1 && vd.names.len() > 1 {
                    let mut info = DeclInfo::new(self.global_scope());
                    info.type_expr = vd.ty.as_ref();
                    info.init_expr = vd.values.first();
                    Some(self.decls.alloc(info))
                } else {
                    None
                };

                for (index, name) in vd.names.iter().enumerate() {
                    let entity = self.entities.alloc(
                        EntityKind::Variable {
                            used: false,
                            address_taken: false,
                        },
                        name.name,
                        name.span,
                        TypeId::INVALID,
                    );
                    let decl = match shared {
                        Some(decl) => {
                            self.decls.get_mut(decl).entities.push(entity);
                            decl
                        }
                        None => {
                            let mut info = DeclInfo::new(self.global_scope());
                            info.entities.push(entity);
                            info.type_expr = vd.ty.as_ref();
                            info.init_expr = vd.values.get(index);
                            self.decls.alloc(info)
                        }
                    };
                    self.add_file_entity(name, entity, decl, interner);
                }

                if vd.names.len() < vd.values.len() {
                    self.add_error(
                        SemanticError::ExtraInitExpr {
                            span: vd.span.into(),
                        },
                        vd.span,
                    );
                }
            }
        }
    }

    fn collect_type_decl(&mut self, td: &'ast TypeDecl, interner: &Interner) {
        let entity = self.entities.alloc(
            EntityKind::TypeName,
            td.name.name,
            td.name.span,
            TypeId::INVALID,
        );
        let mut info = DeclInfo::new(self.global_scope());
        info.entities.push(entity);
        info.type_expr = Some(&td.ty);
        let decl = self.decls.alloc(info);
        self.add_file_entity(&td.name, entity, decl, interner);
    }

    fn collect_proc_decl(&mut self, pd: &'ast ProcDecl, interner: &Interner) {
        let entity = self.entities.alloc(
            EntityKind::Procedure,
            pd.name.name,
            pd.name.span,
            TypeId::INVALID,
        );
        let mut info = DeclInfo::new(self.global_scope());
        info.entities.push(entity);
        info.proc_decl = Some(pd);
        let decl = self.decls.alloc(info);
        self.add_file_entity(&pd.name, entity, decl, interner);
    }

    // ---- ordered checking -----------------------------------------------

    /// Check the declaration behind `entity`, recursing into dependencies
    /// first. Entities without a declaration record (locals, universe
    /// entries) are already typed and need nothing here.
    pub(super) fn check_entity_decl(&mut self, entity: EntityId, interner: &Interner) {
        let Some(&decl_id) = self.entity_decls.get(&entity) else {
            return;
        };
        match self.decls.get(decl_id).mark {
            Color::Black => return,
            // Grey means we re-entered through a dependency; the reference
            // site reports the cycle.
            Color::Grey => return,
            Color::White => {}
        }
        self.decls.get_mut(decl_id).mark = Color::Grey;

        let scope = self.decls.get(decl_id).scope;
        let prev = self.enter_decl_context(scope, Some(decl_id));
        match self.entities.get(entity).kind {
            EntityKind::Constant { .. } => self.check_constant_entity(entity, decl_id, interner),
            EntityKind::Variable { .. } => self.check_variable_entity(entity, decl_id, interner),
            EntityKind::TypeName => self.check_type_name_entity(entity, decl_id, interner),
            EntityKind::Procedure => self.check_procedure_entity(entity, decl_id, interner),
            EntityKind::Builtin(_) => {}
        }
        self.restore_context(prev);

        self.decls.get_mut(decl_id).mark = Color::Black;
    }

    fn check_constant_entity(
        &mut self,
        entity: EntityId,
        decl_id: DeclId,
        interner: &Interner,
    ) {
        let decl = self.decls.get(decl_id);
        let type_expr = decl.type_expr;
        let Some(init) = decl.init_expr else {
            // Collection pairs every constant with an initializer; a record
            // without one has already been diagnosed.
            return;
        };

        let declared = type_expr.map(|te| self.resolve_type_expr(te, false, interner));
        let mut op = self.check_expr(init, interner);

        if op.is_invalid() {
            self.entities.get_mut(entity).ty = declared.unwrap_or(TypeId::INVALID);
            return;
        }
        if op.mode != AddressingMode::Constant {
            let name = interner.resolve(self.entities.get(entity).name).to_string();
            self.add_error(
                SemanticError::NotConstant {
                    name,
                    span: init.span.into(),
                },
                init.span,
            );
            self.entities.get_mut(entity).ty = declared.unwrap_or(TypeId::INVALID);
            return;
        }

        let target = declared.unwrap_or_else(|| self.arena.default_type(op.ty));
        self.convert_to_typed(&mut op, target, interner);

        let slot = self.entities.get_mut(entity);
        if op.is_invalid() {
            slot.ty = TypeId::INVALID;
        } else {
            slot.ty = op.ty;
            slot.kind = EntityKind::Constant {
                value: op.value.clone(),
            };
        }
    }

    fn check_variable_entity(
        &mut self,
        entity: EntityId,
        decl_id: DeclId,
        interner: &Interner,
    ) {
        let decl = self.decls.get(decl_id);
        let type_expr = decl.type_expr;
        let init = decl.init_expr;
        let siblings = decl.entities.clone();

        let declared = type_expr.map(|te| self.resolve_type_expr(te, false, interner));

        let Some(init) = init else {
            let span = self.entities.get(entity).span;
            match declared {
                Some(ty) => self.entities.get_mut(entity).ty = ty,
                None => {
                    self.add_error(
                        SemanticError::MissingTypeOrInit { span: span.into() },
                        span,
                    );
                    self.entities.get_mut(entity).ty = TypeId::INVALID;
                }
            }
            return;
        };

        let mut op = self.check_expr(init, interner);

        // A shared record means several names drew from one initializer;
        // a single-result initializer cannot populate more than one.
        if siblings.len() > 1 {
            if !op.is_invalid() {
                self.add_error(
                    SemanticError::ValueCountMismatch {
                        expected: siblings.len(),
                        found: 1,
                        span: init.span.into(),
                    },
                    init.span,
                );
            }
            for sibling in siblings {
                self.entities.get_mut(sibling).ty = declared.unwrap_or(TypeId::INVALID);
            }
            return;
        }

        if op.is_invalid() {
            self.entities.get_mut(entity).ty = declared.unwrap_or(TypeId::INVALID);
            return;
        }

        let target = declared.unwrap_or_else(|| self.arena.default_type(op.ty));
        self.convert_to_typed(&mut op, target, interner);
        self.entities.get_mut(entity).ty = if op.is_invalid() { TypeId::INVALID } else { op.ty };
    }

    fn check_type_name_entity(
        &mut self,
        entity: EntityId,
        decl_id: DeclId,
        interner: &Interner,
    ) {
        let Some(type_expr) = self.decls.get(decl_id).type_expr else {
            return;
        };
        // Allocate the nominal handle before resolving the underlying type,
        // so references back to this name through a pointer are legal.
        let name = self.entities.get(entity).name;
        let named = self.arena.alloc_named(name);
        self.entities.get_mut(entity).ty = named;

        let underlying = self.resolve_type_expr(type_expr, false, interner);
        self.arena.resolve_named(named, underlying);
    }

    fn check_procedure_entity(
        &mut self,
        entity: EntityId,
        decl_id: DeclId,
        interner: &Interner,
    ) {
        let Some(pd) = self.decls.get(decl_id).proc_decl else {
            return;
        };
        let ty = self.build_proc_type(&pd.params, pd.result.as_ref(), pd.variadic, interner);
        self.entities.get_mut(entity).ty = ty;

        // The body is not checked here; it is queued for the body pass so
        // bodies can freely reference declarations in any order.
        if let Some(body) = &pd.body {
            self.procedures.push(ProcedureInfo {
                name_span: pd.name.span,
                decl: decl_id,
                ty,
                body,
            });
        }
    }

    // ---- type expression resolution -------------------------------------

    /// Resolve a type expression to a type handle. `indirect` is true when
    /// the resolution sits behind a pointer-shaped indirection relative to
    /// the type declaration being checked; only then may it reach back into
    /// a declaration that is still being checked.
    pub(super) fn resolve_type_expr(
        &mut self,
        te: &'ast TypeExpr,
        indirect: bool,
        interner: &Interner,
    ) -> TypeId {
        match te {
            TypeExpr::Name(ident) => self.resolve_type_name(ident, indirect, interner),
            TypeExpr::Pointer(inner, _) => {
                let elem = self.resolve_type_expr(inner, true, interner);
                self.arena.pointer_to(elem)
            }
            TypeExpr::Slice(inner, _) => {
                let elem = self.resolve_type_expr(inner, true, interner);
                self.arena.slice_of(elem)
            }
            TypeExpr::Array { len, elem, span } => {
                let elem_ty = self.resolve_type_expr(elem, indirect, interner);
                let mut op = self.check_expr(len, interner);
                let int = self.arena.basic(BasicType::Int);
                self.convert_to_typed(&mut op, int, interner);
                match op.value.as_int() {
                    Some(n) if op.is_constant() && n >= 0 => {
                        self.arena.array_of(elem_ty, n as u64)
                    }
                    _ => {
                        if !op.is_invalid() {
                            self.add_error(
                                SemanticError::InvalidArrayLength {
                                    span: len.span.into(),
                                },
                                *span,
                            );
                        }
                        TypeId::INVALID
                    }
                }
            }
            TypeExpr::Record { fields, .. } => {
                let mut seen: Vec<Symbol> = Vec::with_capacity(fields.len());
                let mut resolved: SmallVec<[RecordField; 4]> = SmallVec::new();
                for field in fields {
                    if seen.contains(&field.name.name) {
                        self.add_error(
                            SemanticError::DuplicateField {
                                name: interner.resolve(field.name.name).to_string(),
                                span: field.name.span.into(),
                            },
                            field.name.span,
                        );
                        continue;
                    }
                    seen.push(field.name.name);
                    let ty = self.resolve_type_expr(&field.ty, indirect, interner);
                    resolved.push(RecordField {
                        name: field.name.name,
                        ty,
                    });
                }
                self.arena.record(resolved)
            }
            TypeExpr::Procedure {
                params,
                result,
                variadic,
                ..
            } => self.build_proc_type(params, result.as_deref(), *variadic, interner),
        }
    }

    fn resolve_type_name(
        &mut self,
        ident: &Ident,
        indirect: bool,
        interner: &Interner,
    ) -> TypeId {
        let Some((_, entity)) = self.scopes.lookup(self.current_scope(), ident.name) else {
            self.error_undeclared(interner.resolve(ident.name).to_string(), ident.span);
            return TypeId::INVALID;
        };
        self.add_entity_use(ident.id, entity);
        self.add_decl_dependency(entity);

        if !matches!(self.entities.get(entity).kind, EntityKind::TypeName) {
            self.add_error(
                SemanticError::NotAType {
                    name: interner.resolve(ident.name).to_string(),
                    span: ident.span.into(),
                },
                ident.span,
            );
            return TypeId::INVALID;
        }

        if let Some(&decl_id) = self.entity_decls.get(&entity) {
            match self.decls.get(decl_id).mark {
                Color::White => self.check_entity_decl(entity, interner),
                Color::Grey if !indirect => {
                    self.add_error(
                        SemanticError::InvalidRecursiveType {
                            name: interner.resolve(ident.name).to_string(),
                            span: ident.span.into(),
                        },
                        ident.span,
                    );
                    return TypeId::INVALID;
                }
                // Grey behind a pointer: the nominal handle already exists.
                Color::Grey | Color::Black => {}
            }
        }

        self.entities.get(entity).ty
    }

    /// Build a procedure type from parameter and result type expressions.
    /// The last parameter of a variadic procedure is recorded at its element
    /// type; call checking and the body's slice view both derive from it.
    pub(super) fn build_proc_type(
        &mut self,
        params: &'ast [Param],
        result: Option<&'ast TypeExpr>,
        variadic: bool,
        interner: &Interner,
    ) -> TypeId {
        let mut param_types: TypeIdVec = TypeIdVec::new();
        for param in params {
            param_types.push(self.resolve_type_expr(&param.ty, true, interner));
        }
        let result_ty = result.map(|te| self.resolve_type_expr(te, true, interner));
        self.arena.procedure(param_types, result_ty, variadic)
    }
}
