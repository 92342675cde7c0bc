// tests/checker_spec.rs
//
// End-to-end checker scenarios. The parser is out of scope for this crate,
// so programs are assembled through the frontend AST directly.

use marten::errors::SemanticError;
use marten::frontend::ast::*;
use marten::frontend::{Interner, Span};
use marten::sema::{
    AddressingMode, BaseSizes, BasicType, CheckOutput, Checker, EntityKind, TypeId,
};

/// Small AST assembly helper. Every node gets a fresh id and a span derived
/// from that id, so diagnostics can be traced back to individual nodes.
struct Builder {
    ids: NodeIds,
    interner: Interner,
}

impl Builder {
    fn new() -> Self {
        Self {
            ids: NodeIds::new(),
            interner: Interner::new(),
        }
    }

    fn next_id(&mut self) -> (NodeId, Span) {
        let id = self.ids.next();
        let offset = id.0 as usize;
        (id, Span::new(offset, offset + 1, 1, id.0 + 1))
    }

    fn ident(&mut self, name: &str) -> Ident {
        let (id, span) = self.next_id();
        Ident {
            id,
            name: self.interner.intern(name),
            span,
        }
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        let (id, span) = self.next_id();
        Expr { id, kind, span }
    }

    fn int(&mut self, value: i128) -> Expr {
        self.expr(ExprKind::IntLiteral(value))
    }

    fn float(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::FloatLiteral(value))
    }

    fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::StringLiteral(value.to_string()))
    }

    fn var(&mut self, name: &str) -> Expr {
        let sym = self.interner.intern(name);
        self.expr(ExprKind::Identifier(sym))
    }

    fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary(Box::new(UnaryExpr { op, operand })))
    }

    fn binary(&mut self, left: Expr, op: BinaryOp, right: Expr) -> Expr {
        self.expr(ExprKind::Binary(Box::new(BinaryExpr { left, op, right })))
    }

    fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(Box::new(CallExpr { callee, args })))
    }

    fn field(&mut self, object: Expr, name: &str) -> Expr {
        let sym = self.interner.intern(name);
        let (id, span) = self.next_id();
        Expr {
            id,
            kind: ExprKind::Field(Box::new(FieldExpr {
                object,
                field: sym,
                field_span: span,
            })),
            span,
        }
    }

    fn tname(&mut self, name: &str) -> TypeExpr {
        TypeExpr::Name(self.ident(name))
    }

    fn tpointer(&mut self, inner: TypeExpr) -> TypeExpr {
        TypeExpr::Pointer(Box::new(inner), Span::default())
    }

    fn tarray(&mut self, len: i128, elem: TypeExpr) -> TypeExpr {
        let len = self.int(len);
        TypeExpr::Array {
            len: Box::new(len),
            elem: Box::new(elem),
            span: Span::default(),
        }
    }

    fn trecord(&mut self, fields: Vec<(&str, TypeExpr)>) -> TypeExpr {
        let fields = fields
            .into_iter()
            .map(|(name, ty)| FieldDef {
                name: self.ident(name),
                ty,
            })
            .collect();
        TypeExpr::Record {
            fields,
            span: Span::default(),
        }
    }

    /// `names :: values` or `names : ty : values`
    fn consts(&mut self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Decl {
        self.value_decl(DeclKind::Immutable, names, ty, values)
    }

    /// `names := values` or `names : ty = values`
    fn vars(&mut self, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Decl {
        self.value_decl(DeclKind::Mutable, names, ty, values)
    }

    fn value_decl(
        &mut self,
        kind: DeclKind,
        names: &[&str],
        ty: Option<TypeExpr>,
        values: Vec<Expr>,
    ) -> Decl {
        let names = names.iter().map(|n| self.ident(n)).collect();
        Decl::Variable(VariableDecl {
            kind,
            names,
            ty,
            values,
            span: Span::default(),
        })
    }

    fn local(&mut self, kind: DeclKind, names: &[&str], ty: Option<TypeExpr>, values: Vec<Expr>) -> Stmt {
        let names = names.iter().map(|n| self.ident(n)).collect();
        Stmt::Decl(VariableDecl {
            kind,
            names,
            ty,
            values,
            span: Span::default(),
        })
    }

    fn type_decl(&mut self, name: &str, ty: TypeExpr) -> Decl {
        Decl::Type(TypeDecl {
            name: self.ident(name),
            ty,
            span: Span::default(),
        })
    }

    fn proc_decl(
        &mut self,
        name: &str,
        params: Vec<(&str, TypeExpr)>,
        result: Option<TypeExpr>,
        body: Option<Block>,
    ) -> Decl {
        let params = params
            .into_iter()
            .map(|(name, ty)| Param {
                name: self.ident(name),
                ty,
            })
            .collect();
        Decl::Procedure(ProcDecl {
            name: self.ident(name),
            params,
            result,
            variadic: false,
            body,
            span: Span::default(),
        })
    }

    fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        let (id, span) = self.next_id();
        Block { id, stmts, span }
    }

    fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        let span = expr.span;
        Stmt::Expr(ExprStmt { expr, span })
    }

    fn assign(&mut self, lhs: Vec<Expr>, rhs: Vec<Expr>) -> Stmt {
        Stmt::Assign(AssignStmt {
            lhs,
            rhs,
            span: Span::default(),
        })
    }

    fn ret(&mut self, values: Vec<Expr>) -> Stmt {
        Stmt::Return(ReturnStmt {
            values,
            span: Span::default(),
        })
    }

    fn program(files: Vec<Decl>) -> Program {
        Program {
            files: vec![SourceFile {
                name: "test.mar".to_string(),
                decls: files,
            }],
        }
    }
}

fn check<'p>(builder: &mut Builder, program: &'p Program) -> CheckOutput<'p> {
    let mut checker = Checker::new(BaseSizes::default(), &mut builder.interner);
    checker.check_program(program, &builder.interner);
    checker.finish(&builder.interner)
}

/// Look up a file-scope entity's type by name.
fn entity_ty(out: &CheckOutput, builder: &mut Builder, name: &str) -> TypeId {
    let sym = builder.interner.intern(name);
    let id = out
        .scope_arena
        .lookup_current(out.global_scope, sym)
        .unwrap_or_else(|| panic!("no entity named {name}"));
    out.entity_arena.get(id).ty
}

fn assert_basic(out: &CheckOutput, ty: TypeId, expected: BasicType) {
    assert_eq!(out.type_arena.as_basic(ty), Some(expected));
}

// ---- end-to-end scenarios --------------------------------------------------

#[test]
fn s1_forward_reference_types_both_as_int() {
    let mut b = Builder::new();
    let y_ref = b.var("y");
    let three = b.int(3);
    let program = Builder::program(vec![
        b.consts(&["x"], None, vec![y_ref]),
        b.consts(&["y"], None, vec![three]),
    ]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let x = entity_ty(&out, &mut b, "x");
    let y = entity_ty(&out, &mut b, "y");
    assert_basic(&out, x, BasicType::Int);
    assert_basic(&out, y, BasicType::Int);
}

#[test]
fn s2_initialization_cycle_reports_once() {
    let mut b = Builder::new();
    let b_ref = b.var("b");
    let a_ref = b.var("a");
    let program = Builder::program(vec![
        b.vars(&["a"], None, vec![b_ref]),
        b.vars(&["b"], None, vec![a_ref]),
    ]);
    let out = check(&mut b, &program);

    let cycles = out
        .errors
        .iter()
        .filter(|e| matches!(e.error, SemanticError::InitializationCycle { .. }))
        .count();
    assert_eq!(cycles, 1, "{:?}", out.errors);
    assert_eq!(out.errors.len(), 1);

    let a = entity_ty(&out, &mut b, "a");
    let b_ty = entity_ty(&out, &mut b, "b");
    assert!(out.type_arena.is_invalid(a));
    assert!(out.type_arena.is_invalid(b_ty));
}

#[test]
fn s3_redeclaration_errors_at_second_token() {
    let mut b = Builder::new();
    let one = b.int(1);
    let two = b.int(2);
    let first = b.consts(&["foo"], None, vec![one]);
    let second = b.consts(&["foo"], None, vec![two]);
    let second_span = match &second {
        Decl::Variable(vd) => vd.names[0].span,
        _ => unreachable!(),
    };
    let program = Builder::program(vec![first, second]);
    let out = check(&mut b, &program);

    assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
    assert!(matches!(
        &out.errors[0].error,
        SemanticError::Redeclared { name, .. } if name == "foo"
    ));
    assert_eq!(out.errors[0].span, second_span);
}

#[test]
fn s4_unused_local_variable_warns() {
    let mut b = Builder::new();
    let one = b.int(1);
    let decl = b.local(DeclKind::Mutable, &["x"], None, vec![one]);
    let ret = b.ret(vec![]);
    let body = b.block(vec![decl, ret]);
    let program = Builder::program(vec![b.proc_decl("main", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].warning.to_string(), "Unused variable `x`");
}

#[test]
fn s5_constant_overflow_diagnoses_and_invalidates() {
    let mut b = Builder::new();
    let u8_ty = b.tname("u8");
    let too_big = b.int(300);
    let program = Builder::program(vec![b.vars(&["x"], Some(u8_ty), vec![too_big])]);
    let out = check(&mut b, &program);

    assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
    assert_eq!(
        out.errors[0].error.to_string(),
        "constant 300 does not fit in u8"
    );
    let x = entity_ty(&out, &mut b, "x");
    assert!(out.type_arena.is_invalid(x));
}

#[test]
fn s6_builtin_arity_mismatch() {
    let mut b = Builder::new();
    let callee = b.var("size_of");
    let a = b.var("a");
    let b_arg = b.var("b");
    let call = b.call(callee, vec![a, b_arg]);
    let call_id = call.id;
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let program = Builder::program(vec![b.proc_decl("main", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
    assert_eq!(
        out.errors[0].error.to_string(),
        "size_of expects 1 argument, got 2"
    );
    // the call operand is demoted to invalid
    let tv = out.types.get(&call_id).expect("call recorded");
    assert_eq!(tv.mode, AddressingMode::Invalid);
}

// ---- declarations and ordering ---------------------------------------------

#[test]
fn constants_fold_through_operators() {
    let mut b = Builder::new();
    let two = b.int(2);
    let three = b.int(3);
    let sum = b.binary(two, BinaryOp::Add, three);
    let four = b.int(4);
    let product = b.binary(sum, BinaryOp::Mul, four);
    let program = Builder::program(vec![b.consts(&["n"], None, vec![product])]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let sym = b.interner.intern("n");
    let id = out.scope_arena.lookup_current(out.global_scope, sym).unwrap();
    match &out.entity_arena.get(id).kind {
        EntityKind::Constant { value } => assert_eq!(value.as_int(), Some(20)),
        other => panic!("expected constant, got {other:?}"),
    }
}

#[test]
fn division_by_constant_zero_is_an_error() {
    let mut b = Builder::new();
    let one = b.int(1);
    let zero = b.int(0);
    let div = b.binary(one, BinaryOp::Div, zero);
    let program = Builder::program(vec![b.consts(&["bad"], None, vec![div])]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::DivisionByZero { .. })));
}

#[test]
fn negative_shift_count_is_an_error() {
    let mut b = Builder::new();
    let one = b.int(1);
    let minus_two = b.int(-2);
    let shift = b.binary(one, BinaryOp::Shl, minus_two);
    let program = Builder::program(vec![b.consts(&["bad"], None, vec![shift])]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::NegativeShiftCount { .. })));
}

#[test]
fn extra_initializer_is_flagged_one_direction_only() {
    // More values than names is an error; more names than values is not,
    // anticipating multi-value initializers.
    let mut b = Builder::new();
    let one = b.int(1);
    let two = b.int(2);
    let program = Builder::program(vec![b.consts(&["only"], None, vec![one, two])]);
    let out = check(&mut b, &program);
    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::ExtraInitExpr { .. })));

    let mut b = Builder::new();
    let one = b.int(1);
    let program = Builder::program(vec![b.consts(&["p", "q"], None, vec![one])]);
    let out = check(&mut b, &program);
    assert!(out.errors.is_empty(), "{:?}", out.errors);
}

#[test]
fn missing_type_and_initializer_is_an_error() {
    let mut b = Builder::new();
    let program = Builder::program(vec![b.consts(&["x"], None, vec![])]);
    let out = check(&mut b, &program);
    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::MissingTypeOrInit { .. })));
}

#[test]
fn type_cycle_through_pointer_is_legal() {
    let mut b = Builder::new();
    let node_name = b.tname("Node");
    let next_ty = b.tpointer(node_name);
    let int_ty = b.tname("int");
    let record = b.trecord(vec![("next", next_ty), ("value", int_ty)]);
    let program = Builder::program(vec![b.type_decl("Node", record)]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let node = entity_ty(&out, &mut b, "Node");
    // pointer + int, both word sized
    assert_eq!(out.type_arena.size_of(node), 16);
}

#[test]
fn direct_type_cycle_is_an_error() {
    let mut b = Builder::new();
    let b_name = b.tname("B");
    let a_record = b.trecord(vec![("b", b_name)]);
    let a_name = b.tname("A");
    let b_record = b.trecord(vec![("a", a_name)]);
    let program = Builder::program(vec![
        b.type_decl("A", a_record),
        b.type_decl("B", b_record),
    ]);
    let out = check(&mut b, &program);

    let recursive = out
        .errors
        .iter()
        .filter(|e| matches!(e.error, SemanticError::InvalidRecursiveType { .. }))
        .count();
    assert_eq!(recursive, 1, "{:?}", out.errors);
}

#[test]
fn size_and_offset_builtins_fold_to_constants() {
    let mut b = Builder::new();
    let u8_ty = b.tname("u8");
    let i64_ty = b.tname("i64");
    let record = b.trecord(vec![("tag", u8_ty), ("payload", i64_ty)]);
    let point = b.type_decl("Header", record);

    let size_callee = b.var("size_of");
    let header_ref = b.var("Header");
    let size_call = b.call(size_callee, vec![header_ref]);

    let offset_callee = b.var("offset_of");
    let header_ref2 = b.var("Header");
    let payload_field = b.var("payload");
    let offset_call = b.call(offset_callee, vec![header_ref2, payload_field]);

    let program = Builder::program(vec![
        point,
        b.consts(&["header_size"], None, vec![size_call]),
        b.consts(&["payload_offset"], None, vec![offset_call]),
    ]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let size_sym = b.interner.intern("header_size");
    let id = out
        .scope_arena
        .lookup_current(out.global_scope, size_sym)
        .unwrap();
    match &out.entity_arena.get(id).kind {
        EntityKind::Constant { value } => assert_eq!(value.as_int(), Some(16)),
        other => panic!("{other:?}"),
    }
    let offset_sym = b.interner.intern("payload_offset");
    let id = out
        .scope_arena
        .lookup_current(out.global_scope, offset_sym)
        .unwrap();
    match &out.entity_arena.get(id).kind {
        EntityKind::Constant { value } => assert_eq!(value.as_int(), Some(8)),
        other => panic!("{other:?}"),
    }
}

#[test]
fn conversion_calls_check_range() {
    let mut b = Builder::new();
    let callee = b.var("u8");
    let value = b.int(200);
    let ok_call = b.call(callee, vec![value]);

    let callee = b.var("u8");
    let value = b.int(300);
    let bad_call = b.call(callee, vec![value]);

    let program = Builder::program(vec![
        b.consts(&["ok"], None, vec![ok_call]),
        b.consts(&["bad"], None, vec![bad_call]),
    ]);
    let out = check(&mut b, &program);

    assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
    assert_eq!(
        out.errors[0].error.to_string(),
        "constant 300 does not fit in u8"
    );
    let ok = entity_ty(&out, &mut b, "ok");
    assert_basic(&out, ok, BasicType::U8);
}

// ---- procedure bodies ------------------------------------------------------

#[test]
fn procedure_call_checks_arguments_and_result() {
    let mut b = Builder::new();
    let int_a = b.tname("int");
    let int_b = b.tname("int");
    let int_r = b.tname("int");
    let a_ref = b.var("a");
    let b_ref = b.var("b");
    let sum = b.binary(a_ref, BinaryOp::Add, b_ref);
    let ret = b.ret(vec![sum]);
    let body = b.block(vec![ret]);
    let add = b.proc_decl("add", vec![("a", int_a), ("b", int_b)], Some(int_r), Some(body));

    let callee = b.var("add");
    let one = b.int(1);
    let two = b.int(2);
    let call = b.call(callee, vec![one, two]);
    let program = Builder::program(vec![add, b.vars(&["total"], None, vec![call])]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let total = entity_ty(&out, &mut b, "total");
    assert_basic(&out, total, BasicType::Int);
}

#[test]
fn call_argument_type_mismatch_is_an_error() {
    let mut b = Builder::new();
    let int_a = b.tname("int");
    let body = b.block(vec![]);
    let takes_int = b.proc_decl("takes_int", vec![("a", int_a)], None, Some(body));

    let callee = b.var("takes_int");
    let arg = b.string("nope");
    let call = b.call(callee, vec![arg]);
    let stmt = b.expr_stmt(call);
    let main_body = b.block(vec![stmt]);
    let program = Builder::program(vec![
        takes_int,
        b.proc_decl("main", vec![], None, Some(main_body)),
    ]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::TypeMismatch { .. })));
}

#[test]
fn return_count_must_match_declared_result() {
    let mut b = Builder::new();
    let int_r = b.tname("int");
    let ret = b.ret(vec![]);
    let body = b.block(vec![ret]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], Some(int_r), Some(body))]);
    let out = check(&mut b, &program);

    assert!(matches!(
        out.errors[0].error,
        SemanticError::ReturnCountMismatch {
            expected: 1,
            found: 0,
            ..
        }
    ));
}

#[test]
fn return_inside_defer_is_rejected() {
    let mut b = Builder::new();
    let ret = b.ret(vec![]);
    let deferred = Stmt::Defer(Box::new(DeferStmt {
        stmt: ret,
        span: Span::default(),
    }));
    let body = b.block(vec![deferred]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::ReturnInDefer { .. })));
}

#[test]
fn break_outside_loop_is_rejected() {
    let mut b = Builder::new();
    let body = b.block(vec![Stmt::Break(Span::default())]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(matches!(
        out.errors[0].error,
        SemanticError::InvalidBreak { .. }
    ));
}

#[test]
fn shadowing_in_nested_scope_is_permitted() {
    let mut b = Builder::new();
    let one = b.int(1);
    let outer = b.local(DeclKind::Mutable, &["x"], None, vec![one]);
    let two = b.int(2);
    let inner = b.local(DeclKind::Mutable, &["x"], None, vec![two]);
    let blank_lhs = b.var("_");
    let x_ref = b.var("x");
    let use_inner = b.assign(vec![blank_lhs], vec![x_ref]);
    let nested = b.block(vec![inner, use_inner]);
    let blank_lhs2 = b.var("_");
    let x_ref2 = b.var("x");
    let use_outer = b.assign(vec![blank_lhs2], vec![x_ref2]);
    let body = b.block(vec![outer, Stmt::Block(nested), use_outer]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
}

#[test]
fn assignment_requires_an_addressable_target() {
    let mut b = Builder::new();
    let one = b.int(1);
    let konst = b.local(DeclKind::Immutable, &["k"], None, vec![one]);
    let k_ref = b.var("k");
    let two = b.int(2);
    let bad = b.assign(vec![k_ref], vec![two]);
    let body = b.block(vec![konst, bad]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::CannotAssign { .. })));
}

#[test]
fn address_of_requires_a_variable() {
    let mut b = Builder::new();
    let one = b.int(1);
    let addr = b.unary(UnaryOp::AddressOf, one);
    let stmt = b.expr_stmt(addr);
    let body = b.block(vec![stmt]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::NotAddressable { .. })));
}

#[test]
fn address_of_variable_yields_pointer_and_marks_entity() {
    let mut b = Builder::new();
    let one = b.int(1);
    let decl = b.local(DeclKind::Mutable, &["x"], None, vec![one]);
    let x_ref = b.var("x");
    let addr = b.unary(UnaryOp::AddressOf, x_ref);
    let ptr_decl = b.local(DeclKind::Mutable, &["p"], None, vec![addr]);
    let blank = b.var("_");
    let p_ref = b.var("p");
    let use_p = b.assign(vec![blank], vec![p_ref]);
    let body = b.block(vec![decl, ptr_decl, use_p]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let sym = b.interner.intern("x");
    let x_id = out
        .uses
        .values()
        .copied()
        .find(|&e| out.entity_arena.get(e).name == sym)
        .expect("x was used");
    assert!(matches!(
        out.entity_arena.get(x_id).kind,
        EntityKind::Variable {
            address_taken: true,
            ..
        }
    ));
}

#[test]
fn static_assert_failure_is_reported() {
    let mut b = Builder::new();
    let one = b.int(1);
    let two = b.int(2);
    let cmp = b.binary(one, BinaryOp::Eq, two);
    let callee = b.var("static_assert");
    let call = b.call(callee, vec![cmp]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::StaticAssertFailed { .. })));
}

#[test]
fn println_is_variadic_with_a_minimum() {
    let mut b = Builder::new();
    let callee = b.var("println");
    let one = b.int(1);
    let hello = b.string("hello");
    let truth = b.var("true");
    let ok_call = b.call(callee, vec![one, hello, truth]);
    let ok_stmt = b.expr_stmt(ok_call);

    let callee = b.var("println");
    let empty_call = b.call(callee, vec![]);
    let empty_stmt = b.expr_stmt(empty_call);

    let body = b.block(vec![ok_stmt, empty_stmt]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
    assert_eq!(
        out.errors[0].error.to_string(),
        "println expects at least 1 argument, got 0"
    );
}

#[test]
fn null_commits_to_pointer_contexts() {
    let mut b = Builder::new();
    let int_ty = b.tname("int");
    let ptr_ty = b.tpointer(int_ty);
    let null_ref = b.var("null");
    let program = Builder::program(vec![b.vars(&["p"], Some(ptr_ty), vec![null_ref])]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let p = entity_ty(&out, &mut b, "p");
    assert!(out.type_arena.is_pointer_shaped(p));
}

#[test]
fn len_of_fixed_array_is_constant() {
    let mut b = Builder::new();
    let int_ty = b.tname("int");
    let arr_ty = b.tarray(3, int_ty);
    let arr = b.vars(&["arr"], Some(arr_ty), vec![]);
    let callee = b.var("len");
    let arr_ref = b.var("arr");
    let len_call = b.call(callee, vec![arr_ref]);
    let program = Builder::program(vec![arr, b.consts(&["n"], None, vec![len_call])]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let sym = b.interner.intern("n");
    let id = out.scope_arena.lookup_current(out.global_scope, sym).unwrap();
    match &out.entity_arena.get(id).kind {
        EntityKind::Constant { value } => assert_eq!(value.as_int(), Some(3)),
        other => panic!("{other:?}"),
    }
}

#[test]
fn field_selection_types_and_offsets() {
    let mut b = Builder::new();
    let u8_ty = b.tname("u8");
    let i64_ty = b.tname("i64");
    let record = b.trecord(vec![("tag", u8_ty), ("payload", i64_ty)]);
    let header = b.type_decl("Header", record);

    let header_ty = b.tname("Header");
    let h = b.vars(&["h"], Some(header_ty), vec![]);

    let h_ref = b.var("h");
    let payload = b.field(h_ref, "payload");
    let store = b.local(DeclKind::Mutable, &["v"], None, vec![payload]);
    let blank = b.var("_");
    let v_ref = b.var("v");
    let use_v = b.assign(vec![blank], vec![v_ref]);
    let body = b.block(vec![store, use_v]);
    let program = Builder::program(vec![header, h, b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
}

// ---- table properties ------------------------------------------------------

#[test]
fn no_untyped_entries_survive_finalization() {
    let mut b = Builder::new();
    let one = b.int(1);
    let two = b.int(2);
    let cmp = b.binary(one, BinaryOp::Lt, two);
    let pi = b.float(3.5);
    let hello = b.string("hi");
    let program = Builder::program(vec![
        b.consts(&["flag"], None, vec![cmp]),
        b.consts(&["pi"], None, vec![pi]),
        b.consts(&["greeting"], None, vec![hello]),
    ]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    for (node, tv) in &out.types {
        assert!(
            !out.type_arena.is_untyped(tv.ty),
            "node {node:?} kept untyped {:?}",
            tv.ty
        );
    }
}

#[test]
fn repeated_checks_produce_identical_tables() {
    fn build(b: &mut Builder) -> Program {
        let y_ref = b.var("y");
        let three = b.int(3);
        let four = b.int(4);
        let sum = b.binary(three, BinaryOp::Add, four);
        Builder::program(vec![
            b.consts(&["x"], None, vec![y_ref]),
            b.consts(&["y"], None, vec![sum]),
        ])
    }

    let mut b1 = Builder::new();
    let p1 = build(&mut b1);
    let out1 = check(&mut b1, &p1);

    let mut b2 = Builder::new();
    let p2 = build(&mut b2);
    let out2 = check(&mut b2, &p2);

    assert_eq!(out1.types, out2.types);
    assert_eq!(out1.definitions, out2.definitions);
    assert_eq!(out1.uses, out2.uses);
}

#[test]
fn use_def_closure_holds_for_parameters() {
    let mut b = Builder::new();
    let int_ty = b.tname("int");
    let n_ref = b.var("n");
    let n_id = n_ref.id;
    let ret = b.ret(vec![n_ref]);
    let int_r = b.tname("int");
    let body = b.block(vec![ret]);
    let program = Builder::program(vec![b.proc_decl(
        "identity",
        vec![("n", int_ty)],
        Some(int_r),
        Some(body),
    )]);
    let out = check(&mut b, &program);

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let entity = out.uses[&n_id];
    let entity_scope = out.entity_arena.get(entity).scope.expect("param in scope");
    // the parameter's scope is the body scope, a descendant of the file scope
    assert!(out.scope_arena.is_ancestor(out.global_scope, entity_scope));
}

#[test]
fn used_flags_match_the_uses_table() {
    let mut b = Builder::new();
    let one = b.int(1);
    let used_decl = b.local(DeclKind::Mutable, &["used"], None, vec![one]);
    let two = b.int(2);
    let unused_decl = b.local(DeclKind::Mutable, &["unused"], None, vec![two]);
    let blank = b.var("_");
    let used_ref = b.var("used");
    let touch = b.assign(vec![blank], vec![used_ref]);
    let body = b.block(vec![used_decl, unused_decl, touch]);
    let program = Builder::program(vec![b.proc_decl("f", vec![], None, Some(body))]);
    let out = check(&mut b, &program);

    let used_sym = b.interner.intern("used");
    let unused_sym = b.interner.intern("unused");
    let mut seen_used = false;
    for (_, &entity) in &out.uses {
        if out.entity_arena.get(entity).name == used_sym {
            seen_used = true;
        }
        assert_ne!(out.entity_arena.get(entity).name, unused_sym);
    }
    assert!(seen_used);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(
        out.warnings[0].warning.to_string(),
        "Unused variable `unused`"
    );
}

#[test]
fn file_scope_statement_is_rejected() {
    let mut b = Builder::new();
    let one = b.int(1);
    let stmt = b.expr_stmt(one);
    let program = Builder::program(vec![Decl::Statement(Box::new(stmt))]);
    let out = check(&mut b, &program);

    assert!(matches!(
        out.errors[0].error,
        SemanticError::OnlyDeclarationsAllowed { .. }
    ));
}

#[test]
fn multi_name_single_value_needs_a_multi_value_initializer() {
    let mut b = Builder::new();
    let one = b.int(1);
    let program = Builder::program(vec![b.vars(&["a", "b"], None, vec![one])]);
    let out = check(&mut b, &program);

    assert!(matches!(
        out.errors[0].error,
        SemanticError::ValueCountMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));
}

#[test]
fn named_types_are_nominal_in_assignment() {
    let mut b = Builder::new();
    let int_a = b.tname("int");
    let int_b = b.tname("int");
    let celsius = b.type_decl("Celsius", int_a);
    let fahrenheit = b.type_decl("Fahrenheit", int_b);

    let c_ty = b.tname("Celsius");
    let ten = b.int(10);
    let c = b.vars(&["c"], Some(c_ty), vec![ten]);

    let f_ty = b.tname("Fahrenheit");
    let c_ref = b.var("c");
    let f = b.vars(&["f"], Some(f_ty), vec![c_ref]);

    let program = Builder::program(vec![celsius, fahrenheit, c, f]);
    let out = check(&mut b, &program);

    assert!(out
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::TypeMismatch { .. })));
}
