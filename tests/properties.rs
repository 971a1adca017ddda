use pretty_assertions::assert_eq;
use schemelet::ast::Expr;
use schemelet::evaluator::create_global_env;
use schemelet::parser::{is_complete, parse, parse_expr};
use schemelet::{Error, evaluate_buffer, evaluate_in, evaluate_in_global};

fn int_list(items: &[i64]) -> Expr {
    Expr::List(items.iter().copied().map(Expr::Integer).collect())
}

/// Evaluate each input in one fresh session and compare printed results
fn run_session(steps: &[(&str, &str)]) {
    let mut env = create_global_env();
    for (i, (input, expected)) in steps.iter().enumerate() {
        assert_eq!(
            evaluate_in(input, &mut env),
            *expected,
            "step #{} evaluating {input:?}",
            i + 1
        );
    }
}

#[test]
fn parser_round_trip() {
    let sources = [
        "42",
        "-7",
        "\"hello world\"",
        "\"\"",
        "#t",
        "#f",
        "foo-bar?",
        "set!",
        "()",
        "(1 (2 (3 ())) \"x\" #f sym)",
        "(quote (a b))",
    ];
    for source in sources {
        let expr = parse_expr(source).expect("literal should parse");
        let printed = expr.to_string();
        let reparsed = parse_expr(&printed).expect("printed form should parse");
        assert_eq!(reparsed, expr, "round trip of {source:?}");
        assert_eq!(printed, source);
    }

    // Quote shorthand prints in long form
    assert_eq!(parse_expr("'(1 2)").map(|e| e.to_string()), Ok("(quote (1 2))".to_owned()));
}

#[test]
fn whitespace_insensitivity() {
    let expected = int_list(&[1, 2, 3]);
    assert_eq!(parse_expr("(1 2 3)"), Ok(expected.clone()));
    assert_eq!(parse_expr("( 1  2\t3 )"), Ok(expected.clone()));
    assert_eq!(parse_expr("(1\n2\n3)"), Ok(expected));
}

#[test]
fn parse_leaves_the_rest_of_the_buffer() {
    let (first, rest) = parse("(+ 1 2) (* 3 4)").expect("first datum");
    assert_eq!(first.to_string(), "(+ 1 2)");
    assert_eq!(rest, "(* 3 4)");
}

#[test]
fn completeness_probe() {
    assert!(is_complete("(+ 1 2)"));
    assert!(!is_complete("(+ 1"));
    assert!(!is_complete("\"(unterminated"));
    assert!(!is_complete("   "));
}

#[test]
fn lexical_scoping() {
    run_session(&[
        ("(define hack (lambda (x) (+ x secret)))", "hack"),
        ("(define safe (lambda (secret) (hack 23)))", "safe"),
        ("(safe 42)", "exception: Unbound variable: secret"),
    ]);
}

#[test]
fn closure_capture() {
    run_session(&[(
        "((lambda (y) (+ ((lambda (x) y) y) ((lambda (x) y) y))) 4)",
        "8",
    )]);
}

#[test]
fn arithmetic_and_comparisons() {
    run_session(&[
        ("(+ 20 22)", "42"),
        ("(* 5 6)", "30"),
        ("(- 20 10)", "10"),
        ("(+ (* 10 2) (+ 2 20))", "42"),
        ("(< 1 2)", "#t"),
        ("(> 1 2)", "#f"),
    ]);
}

#[test]
fn list_operations() {
    run_session(&[
        ("(car (quote (4 5 6)))", "4"),
        ("(cdr (quote (1 2 3)))", "(2 3)"),
        ("(null? ())", "#t"),
        ("(null? (quote (1)))", "#f"),
        ("(cons 1 '(2 3))", "(1 2 3)"),
        ("(list? '(1))", "#t"),
        ("(symbol? 'a)", "#t"),
    ]);

    let mut env = create_global_env();
    let value = schemelet::eval_str("(cdr (quote (1 2 3)))", &mut env);
    assert_eq!(value, Ok(int_list(&[2, 3])));
}

#[test]
fn recursion() {
    run_session(&[
        (
            "(define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))",
            "fact",
        ),
        ("(fact 5)", "120"),
    ]);
}

#[test]
fn error_surfacing_keeps_session_usable() {
    run_session(&[
        ("(define kept 1)", "kept"),
        ("foo", "exception: Unbound variable: foo"),
        ("(\"+\" 1 2)", "exception: The object \"+\" is not applicable."),
        (
            "(car 1)",
            "exception: Type error: The object 1, passed as the first argument to car, is not the correct type.",
        ),
        (
            "(cdr \"foo\")",
            "exception: Type error: The object \"foo\", passed as the first argument to cdr, is not the correct type.",
        ),
        ("(if 1 2 3)", "exception: Type error: if condition must be a boolean, got 1"),
        ("(cond (#f 1))", "exception: No matching clause in cond"),
        ("(+ kept 1)", "2"),
    ]);
}

#[test]
fn default_environment_persists_on_the_same_thread() {
    assert_eq!(evaluate_in_global("(define square (lambda (x) (* x x)))"), "square");
    assert_eq!(evaluate_in_global("(square 6)"), "36");
    assert_eq!(evaluate_in_global("(square (+ 3 3))"), "36");
    assert_eq!(evaluate_in_global("foo"), "exception: Unbound variable: foo");
    assert_eq!(evaluate_in_global("(square 2)"), "4");
}

#[test]
fn buffers_return_the_last_result() {
    let mut env = create_global_env();
    let program = "
        (define double (lambda (x) (+ x x)))
        (define twice (lambda (fn) (lambda (x) (fn (fn x)))))
        ((twice double) 10)
    ";
    assert_eq!(evaluate_buffer(program, &mut env), "40");
    assert_eq!(evaluate_buffer("", &mut env), "");
    assert_eq!(
        evaluate_buffer("(double 1) (", &mut env),
        "parse error: Unexpected end of input: missing ')'"
    );
}

#[test]
fn ordinary_recursion_is_not_cut_short() {
    run_session(&[
        ("(define count (lambda (n) (if (= n 0) 0 (+ 1 (count (- n 1))))))", "count"),
        ("(count 85)", "85"),
        ("(count 1000)", "1000"),
        (
            "(define walk (lambda (l) (if (null? l) 0 (+ 1 (walk (cdr l))))))",
            "walk",
        ),
        (
            "(walk '(0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9))",
            "100",
        ),
    ]);
}

#[test]
fn runaway_recursion_is_an_ordinary_error() {
    let mut env = create_global_env();
    evaluate_in("(define forever (lambda (n) (+ 1 (forever n))))", &mut env);
    let result = schemelet::eval_str("(forever 0)", &mut env);
    assert!(
        matches!(&result, Err(Error::EvalError(msg)) if msg.contains("depth limit")),
        "got {result:?}"
    );
    assert_eq!(evaluate_in("(+ 1 1)", &mut env), "2");
}
