// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use tree_sitter_semantic::eval::value::ArithOp;
use tree_sitter_semantic::eval::value::CompareOp;
use tree_sitter_semantic::eval::value::Value;
use tree_sitter_semantic::eval::value::Widened;
use tree_sitter_semantic::eval::AbstractValue;
use tree_sitter_semantic::eval::Allocator;
use tree_sitter_semantic::eval::ErrorPolicy;
use tree_sitter_semantic::eval::EvalError;
use tree_sitter_semantic::eval::Evaluator;
use tree_sitter_semantic::eval::World;
use tree_sitter_semantic::syntax;
use tree_sitter_semantic::syntax::BinaryOp;
use tree_sitter_semantic::syntax::Syntax;
use tree_sitter_semantic::syntax::Term;
use tree_sitter_semantic::ByteRange;
use tree_sitter_semantic::Span;

fn term(start: usize, end: usize, syntax: Syntax) -> Term {
    Term::new(ByteRange::new(start, end), Span::default(), syntax)
}

fn integer(at: usize, text: &str) -> Term {
    term(
        at,
        at + text.len(),
        syntax::Integer {
            text: text.to_string(),
        }
        .into(),
    )
}

fn text(at: usize, value: &str) -> Term {
    term(
        at,
        at + value.len(),
        syntax::Text {
            text: value.to_string(),
        }
        .into(),
    )
}

fn variable(at: usize, name: &str) -> Term {
    term(
        at,
        at + name.len(),
        syntax::Identifier { name: name.into() }.into(),
    )
}

fn assign(start: usize, end: usize, name: &str, value: Term) -> Term {
    term(
        start,
        end,
        syntax::Assign {
            name: name.into(),
            value: Box::new(value),
        }
        .into(),
    )
}

fn statements(start: usize, end: usize, statements: Vec<Term>) -> Term {
    term(start, end, syntax::Statements { statements }.into())
}

fn binary(start: usize, end: usize, op: BinaryOp, lhs: Term, rhs: Term) -> Term {
    term(
        start,
        end,
        syntax::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
        .into(),
    )
}

fn function(start: usize, end: usize, name: Option<&str>, params: &[&str], body: Term) -> Term {
    term(
        start,
        end,
        syntax::Function {
            name: name.map(|name| name.into()),
            params: params.iter().map(|&param| param.into()).collect(),
            body: Box::new(body),
        }
        .into(),
    )
}

fn call(start: usize, end: usize, function: Term, arguments: Vec<Term>) -> Term {
    term(
        start,
        end,
        syntax::Call {
            function: Box::new(function),
            arguments,
        }
        .into(),
    )
}

fn boolean(at: usize, value: bool) -> Term {
    term(at, at + 1, syntax::Boolean { value }.into())
}

#[test]
fn evaluates_arithmetic() {
    let program = binary(
        0,
        5,
        BinaryOp::Arith(ArithOp::Add),
        integer(0, "1"),
        integer(4, "2"),
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(3));
}

#[test]
fn assignment_binds_and_reads_back() {
    let program = statements(
        0,
        9,
        vec![assign(0, 6, "x", integer(4, "1")), variable(7, "x")],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(1));
    assert_eq!(results[0].1.heap.len(), 1);
}

#[test]
fn reassignment_joins_values_in_the_heap() {
    let program = statements(
        0,
        16,
        vec![
            assign(0, 6, "x", integer(4, "1")),
            assign(7, 13, "x", integer(11, "2")),
            variable(14, "x"),
        ],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    let values = results
        .iter()
        .map(|(value, _)| value.clone())
        .collect::<Vec<_>>();
    assert_eq!(values, vec![Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn calling_a_lambda_allocates_one_address() {
    let lambda = function(
        0,
        18,
        None,
        &["x"],
        term(
            11,
            17,
            syntax::Return {
                value: Box::new(variable(16, "x")),
            }
            .into(),
        ),
    );
    let program = call(0, 22, lambda, vec![integer(20, "5")]);
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    let (value, world) = &results[0];
    assert_eq!(*value, Value::Integer(5));
    assert_eq!(world.heap.len(), 1);
    assert!(world.environment.addresses().is_empty());
}

#[test]
fn closures_capture_their_free_variables() {
    let body = binary(
        30,
        35,
        BinaryOp::Arith(ArithOp::Add),
        variable(30, "x"),
        variable(34, "y"),
    );
    let program = statements(
        0,
        50,
        vec![
            assign(0, 6, "y", integer(4, "7")),
            assign(7, 40, "f", function(11, 40, None, &["x"], body)),
            call(41, 47, variable(41, "f"), vec![integer(43, "1")]),
        ],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(8));
}

#[test]
fn named_functions_bind_themselves() {
    let program = statements(
        0,
        30,
        vec![
            function(0, 22, Some("f"), &["x"], variable(16, "x")),
            call(23, 29, variable(23, "f"), vec![integer(25, "2")]),
        ],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(2));
}

#[test]
fn abstract_conditions_explore_both_branches() {
    let condition = binary(
        0,
        5,
        BinaryOp::Compare(CompareOp::Lt),
        integer(0, "1"),
        integer(4, "2"),
    );
    let program = term(
        0,
        20,
        syntax::If {
            condition: Box::new(condition),
            consequence: Box::new(text(8, "a")),
            alternative: Box::new(text(14, "b")),
        }
        .into(),
    );
    // Widened literals are "any integer", so the comparison is an abstract boolean.
    let mut evaluator = Evaluator::<Widened>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    let values = results
        .iter()
        .map(|(value, _)| value.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        values,
        vec![
            Widened(Value::String("a".to_string())),
            Widened(Value::String("b".to_string())),
        ]
    );
}

#[test]
fn loops_over_abstract_conditions_terminate() {
    let condition = binary(
        10,
        16,
        BinaryOp::Compare(CompareOp::Lt),
        variable(10, "i"),
        integer(14, "10"),
    );
    let body = assign(
        19,
        28,
        "i",
        binary(
            23,
            28,
            BinaryOp::Arith(ArithOp::Add),
            variable(23, "i"),
            integer(27, "1"),
        ),
    );
    let program = statements(
        0,
        30,
        vec![
            assign(0, 6, "i", integer(4, "0")),
            term(
                7,
                30,
                syntax::While {
                    condition: Box::new(condition),
                    body: Box::new(body),
                }
                .into(),
            ),
        ],
    );
    let mut evaluator = Evaluator::<Widened>::new().with_allocator(Allocator::Monovariant);
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Loop did not terminate");
    assert!(!results.is_empty());
    assert!(results.iter().all(|(value, _)| *value == Widened(Value::Unit)));
}

#[test]
fn do_while_runs_the_body_before_the_condition() {
    let program = statements(
        0,
        25,
        vec![
            term(
                0,
                22,
                syntax::DoWhile {
                    body: Box::new(assign(5, 11, "x", integer(9, "1"))),
                    condition: Box::new(boolean(20, false)),
                }
                .into(),
            ),
            variable(23, "x"),
        ],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(1));
}

#[test]
fn for_loop_initializer_bindings_do_not_escape() {
    let program = statements(
        0,
        30,
        vec![
            term(
                0,
                26,
                syntax::ForLoop {
                    initial: Box::new(assign(5, 11, "i", integer(9, "0"))),
                    condition: Box::new(boolean(13, false)),
                    update: Box::new(term(16, 16, Syntax::Empty)),
                    body: Box::new(term(20, 20, Syntax::Empty)),
                }
                .into(),
            ),
            variable(27, "i"),
        ],
    );
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert!(matches!(error, EvalError::UnboundVariable(_)));
}

#[test]
fn values_index_and_negate() {
    let array = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
    assert_eq!(array.index(&Value::Integer(1)).unwrap(), Value::Integer(2));
    assert!(matches!(
        array.index(&Value::Integer(5)),
        Err(EvalError::IndexOutOfBounds(_))
    ));
    assert!(matches!(
        array.index(&Value::Null),
        Err(EvalError::ExpectedNumber(_))
    ));

    let tuple = Value::tuple(vec![Value::Boolean(true)]);
    assert_eq!(tuple.index(&Value::Integer(0)).unwrap(), Value::Boolean(true));

    let hash = Value::hash(vec![(Value::string("k".to_string()), Value::Integer(3))]);
    assert_eq!(
        hash.index(&Value::string("k".to_string())).unwrap(),
        Value::Integer(3)
    );

    assert_eq!(Value::Integer(3).negate().unwrap(), Value::Integer(-3));
    assert!(matches!(Value::Null.negate(), Err(EvalError::ExpectedNumber(_))));
}

#[test]
fn negation_evaluates_through_terms() {
    let program = term(
        0,
        2,
        syntax::Negate {
            value: Box::new(integer(1, "3")),
        }
        .into(),
    );
    let mut evaluator = Evaluator::<Value>::new();
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(-3));
}

#[test]
fn indexing_a_non_indexable_value_is_an_error() {
    let program = term(
        0,
        4,
        syntax::Index {
            value: Box::new(integer(0, "1")),
            index: Box::new(integer(2, "0")),
        }
        .into(),
    );
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert!(matches!(error, EvalError::ExpectedIndexable(_)));
}

#[test]
fn rational_values_reduce_to_lowest_terms() {
    assert_eq!(Value::rational(2, 4), Value::Rational(1, 2));
    assert_eq!(Value::rational(1, -2), Value::Rational(-1, 2));
    assert_eq!(Value::rational(0, 5), Value::Rational(0, 1));
    assert_eq!(
        Value::rational(1, 2).negate().unwrap(),
        Value::Rational(-1, 2)
    );
    assert_eq!(
        Value::rational(1, 2)
            .numeric2(ArithOp::Add, &Value::Integer(1))
            .unwrap(),
        Value::float(1.5)
    );
    assert_eq!(
        Value::rational(1, 2)
            .compare(CompareOp::Lt, &Value::Integer(1))
            .unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(Widened::rational(1, 2), Widened(Value::AnyInteger));
}

#[test]
fn abort_policy_propagates_errors() {
    let program = variable(0, "missing");
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert!(matches!(error, EvalError::UnboundVariable(_)));
}

#[test]
fn resume_policy_substitutes_recovery_values() {
    let program = variable(0, "missing");
    let mut evaluator = Evaluator::<Value>::new().with_policy(ErrorPolicy::Resume);
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Null);
}

#[test]
fn division_by_zero_aborts_or_resumes() {
    let program = binary(
        0,
        5,
        BinaryOp::Arith(ArithOp::Div),
        integer(0, "1"),
        integer(4, "0"),
    );
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert_eq!(error, EvalError::DivisionByZero);

    let mut evaluator = Evaluator::<Value>::new().with_policy(ErrorPolicy::Resume);
    let results = evaluator
        .evaluate(&program, World::new())
        .expect("Cannot evaluate program");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(0));
}

#[test]
fn calling_with_the_wrong_arity_is_an_error() {
    let lambda = function(0, 14, None, &["x"], variable(12, "x"));
    let program = call(0, 16, lambda, Vec::new());
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert_eq!(
        error,
        EvalError::WrongArity {
            expected: 1,
            actual: 0,
        }
    );
}

#[test]
fn calling_a_non_closure_is_an_error() {
    let program = call(0, 4, integer(0, "1"), Vec::new());
    let mut evaluator = Evaluator::<Value>::new();
    let error = evaluator
        .evaluate(&program, World::new())
        .expect_err("Evaluation should fail");
    assert!(matches!(error, EvalError::ExpectedClosure(_)));
}
