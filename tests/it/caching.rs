// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeSet;

use tree_sitter_semantic::eval::value::ArithOp;
use tree_sitter_semantic::eval::value::CompareOp;
use tree_sitter_semantic::eval::value::Value;
use tree_sitter_semantic::eval::value::Widened;
use tree_sitter_semantic::eval::Allocator;
use tree_sitter_semantic::eval::Cache;
use tree_sitter_semantic::eval::Cached;
use tree_sitter_semantic::eval::Configuration;
use tree_sitter_semantic::eval::Evaluator;
use tree_sitter_semantic::eval::Heap;
use tree_sitter_semantic::eval::World;
use tree_sitter_semantic::syntax;
use tree_sitter_semantic::syntax::BinaryOp;
use tree_sitter_semantic::syntax::Syntax;
use tree_sitter_semantic::syntax::Term;
use tree_sitter_semantic::ByteRange;
use tree_sitter_semantic::Span;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

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

/// `fun f(n) { if (n < 1) { 0 } else { f(n - 1) } } f(3)`
fn countdown() -> Term {
    let condition = binary(
        15,
        20,
        BinaryOp::Compare(CompareOp::Lt),
        variable(15, "n"),
        integer(19, "1"),
    );
    let recurse = call(
        33,
        41,
        variable(33, "f"),
        vec![binary(
            35,
            40,
            BinaryOp::Arith(ArithOp::Sub),
            variable(35, "n"),
            integer(39, "1"),
        )],
    );
    let body = term(
        11,
        43,
        syntax::If {
            condition: Box::new(condition),
            consequence: Box::new(integer(24, "0")),
            alternative: Box::new(recurse),
        }
        .into(),
    );
    let definition = term(
        0,
        45,
        syntax::Function {
            name: Some("f".into()),
            params: vec!["n".into()],
            body: Box::new(body),
        }
        .into(),
    );
    statements(
        0,
        50,
        vec![definition, call(46, 50, variable(46, "f"), vec![integer(48, "3")])],
    )
}

#[test]
fn modules_replay_their_results_from_the_cache() {
    init_log();
    let program = statements(
        0,
        9,
        vec![assign(0, 6, "x", integer(4, "1")), variable(7, "x")],
    );
    let world = World::new();
    let mut evaluator = Evaluator::<Value>::new();
    let (results, cache) = evaluator
        .evaluate_module(&program, world.clone())
        .expect("Cannot evaluate module");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Value::Integer(1));

    let configuration = Configuration::new(&program, &world);
    let cached = cache
        .lookup(&configuration)
        .expect("Missing module configuration");
    assert_eq!(cached.len(), 1);
}

#[test]
fn a_converged_cache_is_a_fixed_point() {
    init_log();
    let program = statements(
        0,
        9,
        vec![assign(0, 6, "x", integer(4, "1")), variable(7, "x")],
    );
    let world = World::new();
    let mut evaluator = Evaluator::<Value>::new();
    let (_, cache) = evaluator
        .evaluate_module(&program, world.clone())
        .expect("Cannot evaluate module");

    let (again, iterations) = evaluator
        .converge(&program, &world, cache.clone())
        .expect("Cannot converge");
    assert_eq!(again, cache);
    assert_eq!(iterations, 1);
}

#[test]
fn recorded_results_are_the_union_of_seed_and_observed() {
    init_log();
    let program = integer(0, "1");
    let world = World::<Value>::new();
    let configuration = Configuration::new(&program, &world);
    let seeded = Cached {
        value: Value::Integer(7),
        heap: Heap::new(),
    };
    let mut seed = BTreeSet::new();
    seed.insert(seeded.clone());

    let mut evaluator = Evaluator::<Value>::new();
    evaluator.begin_iteration(Cache::new());
    evaluator
        .caching_configuration(configuration.clone(), seed, &program, world)
        .expect("Cannot evaluate program");
    let out = evaluator.finish_iteration();

    let recorded = out
        .lookup(&configuration)
        .expect("Missing configuration entry");
    assert_eq!(recorded.len(), 2);
    assert!(recorded.contains(&seeded));
    assert!(recorded.contains(&Cached {
        value: Value::Integer(1),
        heap: Heap::new(),
    }));
}

#[test]
fn an_empty_result_set_is_distinct_from_absence() {
    let program = integer(0, "1");
    let configuration = Configuration::new(&program, &World::<Value>::new());
    let mut cache = Cache::<Value>::new();
    assert_eq!(cache.lookup(&configuration), None);
    cache.seed(configuration.clone(), BTreeSet::new());
    assert_eq!(cache.lookup(&configuration), Some(&BTreeSet::new()));
}

#[test]
fn recursion_converges_to_a_single_widened_result() {
    init_log();
    let program = countdown();
    let world = World::new();
    let mut evaluator = Evaluator::<Widened>::new().with_allocator(Allocator::Monovariant);
    let (results, cache) = evaluator
        .evaluate_module(&program, world)
        .expect("Module did not converge");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, Widened(Value::AnyInteger));
    assert!(cache.len() > 1);
}

#[test]
fn recursion_converges_within_a_bounded_number_of_iterations() {
    init_log();
    let program = countdown();
    let world = World::<Widened>::new();
    let mut evaluator = Evaluator::<Widened>::new().with_allocator(Allocator::Monovariant);
    let (cache, iterations) = evaluator
        .converge(&program, &world, Cache::new())
        .expect("Module did not converge");
    // Two refining iterations, plus the one that observes no further change.
    assert!(iterations <= 3);
    assert!(cache.len() > 1);
}

#[test]
fn repeated_module_evaluation_is_deterministic() {
    init_log();
    let program = countdown();
    let mut evaluator = Evaluator::<Widened>::new().with_allocator(Allocator::Monovariant);
    let (first, _) = evaluator
        .evaluate_module(&program, World::new())
        .expect("Module did not converge");
    let (second, _) = evaluator
        .evaluate_module(&program, World::new())
        .expect("Module did not converge");
    assert_eq!(first, second);
}
