//! Parser tests - verify AST shape and diagnostics
//!
//! These tests never execute code; evaluation is covered in interpreter/tests.

use super::*;

fn expr(source: &str) -> ExprKind {
    parse_expression(source).expect("Should parse").kind
}

fn single(source: &str) -> Stmt {
    let program = parse_program(source).expect("Should parse");
    assert_eq!(program.body.len(), 1, "expected one statement in {:?}", source);
    program.body.into_iter().next().unwrap()
}

/* ===================== Expressions ===================== */

#[test]
fn test_parse_number_literals() {
    assert_eq!(expr("42"), ExprKind::Num(42.0));
    assert_eq!(expr("0xff"), ExprKind::Num(255.0));
    assert_eq!(expr("1.5e2"), ExprKind::Num(150.0));
    assert_eq!(expr(".5"), ExprKind::Num(0.5));
}

#[test]
fn test_parse_string_escapes() {
    assert_eq!(expr(r#""a\nb""#), ExprKind::Str("a\nb".to_string()));
    assert_eq!(expr(r#"'it\'s'"#), ExprKind::Str("it's".to_string()));
}

#[test]
fn test_multiplication_binds_tighter() {
    match expr("1 + 2 * 3") {
        ExprKind::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } => {
            assert_eq!(left.kind, ExprKind::Num(1.0));
            assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("Expected Add at the root, got {:?}", other),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    match expr("2 ** 3 ** 2") {
        ExprKind::Binary {
            op: BinaryOp::Exp,
            left,
            right,
        } => {
            assert_eq!(left.kind, ExprKind::Num(2.0));
            assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
        }
        other => panic!("Expected Exp at the root, got {:?}", other),
    }
}

#[test]
fn test_logical_operators_are_not_binary() {
    assert!(matches!(
        expr("a && b"),
        ExprKind::Logical { op: LogicalOp::And, .. }
    ));
    assert!(matches!(
        expr("a ?? b"),
        ExprKind::Logical { op: LogicalOp::Nullish, .. }
    ));
}

#[test]
fn test_parse_template_literal() {
    match expr("`a${x}b${y}`") {
        ExprKind::Template { quasis, exprs } => {
            assert_eq!(quasis, vec!["a", "b", ""]);
            assert_eq!(exprs.len(), 2);
            assert_eq!(exprs[0].kind, ExprKind::Ident("x".to_string()));
        }
        other => panic!("Expected Template, got {:?}", other),
    }
}

#[test]
fn test_parse_arrow_with_expression_body() {
    match expr("(a, b = 2, ...rest) => a + b") {
        ExprKind::Function(def) => {
            assert!(def.is_arrow);
            assert_eq!(def.params.len(), 2);
            assert!(def.params[1].default.is_some());
            assert_eq!(def.rest, Some(Pattern::Ident("rest".to_string())));
            assert!(matches!(def.body, FunctionBody::Expr(_)));
        }
        other => panic!("Expected arrow function, got {:?}", other),
    }
}

#[test]
fn test_parse_optional_chain_and_call() {
    match expr("user?.profile.name") {
        ExprKind::Member { object, optional, .. } => {
            assert!(!optional);
            assert!(matches!(object.kind, ExprKind::Member { optional: true, .. }));
        }
        other => panic!("Expected member, got {:?}", other),
    }
    assert!(matches!(expr("f(1, ...xs)"), ExprKind::Call { ref args, .. } if args.len() == 2));
}

#[test]
fn test_parse_compound_and_logical_assignment() {
    assert!(matches!(
        expr("x += 1"),
        ExprKind::Assign { op: AssignOp::Compound(BinaryOp::Add), .. }
    ));
    assert!(matches!(
        expr("x ??= 1"),
        ExprKind::Assign { op: AssignOp::Logical(LogicalOp::Nullish), .. }
    ));
}

#[test]
fn test_parse_object_literal_forms() {
    match expr("({ a, b: 1, [k]: 2, m() { return 1 }, ...rest })") {
        ExprKind::Object(props) => {
            assert_eq!(props.len(), 5);
            assert!(matches!(&props[0], ObjectProp::KeyValue(PropKey::Static(k), _) if k == "a"));
            assert!(matches!(&props[2], ObjectProp::KeyValue(PropKey::Computed(_), _)));
            assert!(matches!(&props[4], ObjectProp::Spread(_)));
        }
        other => panic!("Expected object literal, got {:?}", other),
    }
}

/* ===================== Statements ===================== */

#[test]
fn test_parse_destructuring_declaration() {
    let stmt = single("const { a, b: [c, d = 4], ...others } = obj");
    match stmt.kind {
        StmtKind::VarDecl { kind, declarations } => {
            assert_eq!(kind, DeclKind::Const);
            let names = declarations[0].target.bound_names();
            assert_eq!(names, vec!["a", "c", "d", "others"]);
        }
        other => panic!("Expected declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_for_variants() {
    assert!(matches!(
        single("for (let i = 0; i < 3; i++) {}").kind,
        StmtKind::For { init: Some(ForInit::Decl { kind: DeclKind::Let, .. }), .. }
    ));
    assert!(matches!(
        single("for (const x of xs) {}").kind,
        StmtKind::ForEach { mode: ForEachMode::Of, decl: Some(DeclKind::Const), .. }
    ));
    assert!(matches!(
        single("for (k in obj) {}").kind,
        StmtKind::ForEach { mode: ForEachMode::In, decl: None, .. }
    ));
    assert!(matches!(
        single("for (;;) break").kind,
        StmtKind::For { init: None, test: None, update: None, .. }
    ));
}

#[test]
fn test_parse_try_catch_finally() {
    match single("try { f() } catch { g() } finally { h() }").kind {
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            assert_eq!(block.len(), 1);
            assert!(handler.as_ref().is_some_and(|h| h.param.is_none()));
            assert!(finalizer.is_some());
        }
        other => panic!("Expected try, got {:?}", other),
    }
}

#[test]
fn test_parse_switch_and_label() {
    match single("switch (x) { case 1: a(); break; default: b() }").kind {
        StmtKind::Switch { cases, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(cases[1].test.is_none());
        }
        other => panic!("Expected switch, got {:?}", other),
    }
    assert!(matches!(
        single("outer: for (;;) { break outer }").kind,
        StmtKind::Labeled { ref label, .. } if label == "outer"
    ));
}

#[test]
fn test_semicolons_are_optional() {
    let program = parse_program("let a = 1\nlet b = 2\nconsole.log(a + b)").unwrap();
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_statements_carry_location_and_excerpt() {
    let program = parse_program("let x = 1;\n\n  console.log(x)\n").unwrap();
    assert_eq!(program.body[0].loc, Loc { line: 1, column: 1 });
    assert_eq!(program.body[1].loc, Loc { line: 3, column: 3 });
    assert_eq!(program.body[0].source, "let x = 1;");
    assert_eq!(program.body[1].source, "console.log(x)");
}

#[test]
fn test_comments_are_skipped() {
    let program = parse_program("// header\nlet a = 1 /* inline */\n").unwrap();
    assert_eq!(program.body.len(), 1);
}

/* ===================== Errors ===================== */

#[test]
fn test_error_reports_line_and_column() {
    let err = parse_program("let a = 1\nlet b = )").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.column > 1);
    assert!(err.message.starts_with("Unexpected token"), "{}", err.message);

    let text = err.to_string();
    assert!(text.starts_with("SyntaxError: "));
    assert!(text.contains("(line 2, column"));
}

#[test]
fn test_error_at_end_of_input() {
    let err = parse_program("function f() {").unwrap_err();
    assert_eq!(err.message, "Unexpected end of input");
}

#[test]
fn test_invalid_update_target() {
    let err = parse_program("1++").unwrap_err();
    assert!(err.message.contains("Invalid left-hand side"));
}

#[test]
fn test_reserved_word_is_not_an_identifier() {
    assert!(parse_program("let if = 1").is_err());
}
