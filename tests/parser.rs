use rox::ast::{ExprKind, LiteralValue, Stmt};
use rox::ast_printer::AstPrinter;
use rox::error::{Diagnostics, LoxError};
use rox::parser::Parser;
use rox::scanner::Scanner;

fn parse_program(source: &str) -> (Vec<Stmt>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let statements = Parser::new(tokens).parse(&mut diagnostics);

    (statements, diagnostics)
}

fn print_expr(source: &str) -> String {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = Parser::new(tokens)
        .parse_expression(&mut diagnostics)
        .expect("expression should parse");

    AstPrinter::print(&expr)
}

fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.errors().iter().map(|e| e.to_string()).collect()
}

#[test]
fn arithmetic_precedence_and_associativity() {
    assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    assert_eq!(print_expr("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(print_expr("-1 * (2 + 3)"), "(* (- 1.0) (group (+ 2.0 3.0)))");
    assert_eq!(print_expr("1 < 2 == true"), "(== (< 1.0 2.0) true)");
}

#[test]
fn logical_levels_bind_below_equality() {
    assert_eq!(
        print_expr("a or b and c == d"),
        "(or a (and b (== c d)))"
    );
}

#[test]
fn comma_and_ternary_sit_at_the_bottom() {
    assert_eq!(print_expr("a = 1, b = 2"), "(, (= a 1.0) (= b 2.0))");
    assert_eq!(print_expr("c ? 1 : 2"), "(?: c 1.0 2.0)");
    assert_eq!(print_expr("c ? 1, 2 : 3"), "(?: c (, 1.0 2.0) 3.0)");
    assert_eq!(print_expr("a ? b : c ? d : e"), "(?: (?: a b c) d e)");
}

#[test]
fn call_arguments_are_not_sequences() {
    assert_eq!(print_expr("f(1, 2)(3)"), "(call (call f 1.0 2.0) 3.0)");
    assert_eq!(print_expr("f((1, 2))"), "(call f (group (, 1.0 2.0)))");
}

#[test]
fn rpn_printer_reverses_operands() {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new("(1 + 2) * -3").scan_tokens(&mut diagnostics);
    let expr = Parser::new(tokens).parse_expression(&mut diagnostics).unwrap();

    assert_eq!(AstPrinter::print_rpn(&expr), "1.0 2.0 + group 3.0 - *");
}

#[test]
fn for_loop_desugars_into_while() {
    let (statements, diagnostics) =
        parse_program("for (var i = 0; i < 3; i = i + 1) { print i; }");
    assert!(!diagnostics.had_error());

    let Stmt::Block(outer) = &statements[0] else {
        panic!("for loop should desugar into a block");
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { condition, body } = &outer[1] else {
        panic!("second statement should be the loop");
    };
    assert_eq!(AstPrinter::print(condition), "(< i 3.0)");

    let Stmt::Block(inner) = body.as_ref() else {
        panic!("loop body should be a block");
    };
    assert!(matches!(inner[0], Stmt::Block(_)));
    assert!(matches!(inner[1], Stmt::Expression(_)));
}

#[test]
fn for_loop_without_condition_loops_on_true() {
    let (statements, diagnostics) = parse_program("for (;;) { break; }");
    assert!(!diagnostics.had_error());

    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("no initializer means no wrapping block");
    };
    assert!(matches!(
        condition.kind,
        ExprKind::Literal(LiteralValue::Bool(true))
    ));
}

#[test]
fn function_declaration_versus_literal() {
    let (statements, diagnostics) =
        parse_program("fun add(a, b) { return a + b; }\nvar f = fun (x) { return x; };");
    assert!(!diagnostics.had_error());

    match &statements[0] {
        Stmt::Function { name, function } => {
            assert_eq!(name.lexeme, "add");
            assert_eq!(function.arity(), 2);
        }
        other => panic!("expected function declaration, got {:?}", other),
    }

    match &statements[1] {
        Stmt::Var {
            initializer: Some(expr),
            ..
        } => match &expr.kind {
            ExprKind::Function(decl) => {
                assert!(decl.name.is_none());
                assert_eq!(decl.arity(), 1);
            }
            other => panic!("expected function literal, got {:?}", other),
        },
        other => panic!("expected var declaration, got {:?}", other),
    }
}

#[test]
fn expression_ids_are_distinct() {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new("a + a").scan_tokens(&mut diagnostics);
    let expr = Parser::new(tokens).parse_expression(&mut diagnostics).unwrap();

    let ExprKind::Binary { left, right, .. } = &expr.kind else {
        panic!("expected binary");
    };
    assert_ne!(left.id, right.id);
    assert_ne!(expr.id, left.id);
}

#[test]
fn reports_every_independent_syntax_error() {
    let (statements, diagnostics) =
        parse_program("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;\n1 +;");

    assert_eq!(
        messages(&diagnostics),
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect ')' after expression.",
            "[line 5] Error at ';': Expect expression.",
        ]
    );

    assert_eq!(statements.len(), 5);
    assert!(matches!(statements[0], Stmt::Empty));
    assert!(matches!(statements[1], Stmt::Print(_)));
    assert!(matches!(statements[2], Stmt::Empty));
    assert!(matches!(statements[3], Stmt::Var { .. }));
    assert!(matches!(statements[4], Stmt::Empty));
}

#[test]
fn invalid_assignment_target_is_not_fatal() {
    let (statements, diagnostics) = parse_program("1 + 2 = 3;\nprint 4;");

    assert_eq!(
        messages(&diagnostics),
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
    assert!(matches!(statements[0], Stmt::Expression(_)));
    assert!(matches!(statements[1], Stmt::Print(_)));
}

#[test]
fn arity_cap_is_reported_but_parsing_continues() {
    let (statements, diagnostics) =
        parse_program("fun f(a, b, c, d, e, f, g, h, i) { print a; }\nf(1, 2, 3, 4, 5, 6, 7, 8, 9);");

    assert_eq!(
        messages(&diagnostics),
        vec![
            "[line 1] Error at 'i': Cannot have more than 8 parameters.",
            "[line 2] Error at '9': Cannot have more than 8 arguments.",
        ]
    );
    assert!(matches!(statements[0], Stmt::Function { .. }));
    assert!(matches!(statements[1], Stmt::Expression(_)));
}

#[test]
fn break_outside_loop_is_rejected() {
    let (_, diagnostics) = parse_program("break;\nwhile (true) { break; }");
    assert_eq!(
        messages(&diagnostics),
        vec!["[line 1] Error at 'break': Must be inside a loop to use 'break'."]
    );

    let (_, diagnostics) =
        parse_program("while (true) { var f = fun () { break; }; break; }");
    assert_eq!(diagnostics.errors().len(), 1);
}

#[test]
fn if_and_while_bodies_need_braces() {
    let (statements, diagnostics) = parse_program("if (true) print 1;\nprint 2;");

    assert_eq!(
        messages(&diagnostics),
        vec!["[line 1] Error at 'print': Expect '{' before if body."]
    );
    assert!(matches!(statements.last(), Some(Stmt::Print(_))));

    let (_, diagnostics) = parse_program("while (x) x = x - 1;");
    assert!(diagnostics.had_error());
}

#[test]
fn missing_left_operand_yields_error_sentinel() {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new("* 3 + 4").scan_tokens(&mut diagnostics);
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression(&mut diagnostics);

    assert!(expr.is_none());
    assert_eq!(
        messages(&diagnostics),
        vec!["[line 1] Error at '*': Missing left-hand operand."]
    );
}

#[test]
fn error_at_end_of_input() {
    let (_, diagnostics) = parse_program("print 1");

    assert!(matches!(diagnostics.errors()[0], LoxError::Parse { .. }));
    assert_eq!(
        messages(&diagnostics),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn reserved_words_are_not_expressions() {
    let (_, diagnostics) = parse_program("print this;\nvar c = class;\nsuper;");

    assert_eq!(
        messages(&diagnostics),
        vec![
            "[line 1] Error at 'this': Expect expression.",
            "[line 2] Error at 'class': Expect expression.",
            "[line 3] Error at 'super': Expect expression.",
        ]
    );
}
