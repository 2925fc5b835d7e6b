// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the abstract evaluator core
//!
//! Abstract evaluation is a non-standard interpretation of a term tree: instead of computing the
//! one value a program produces, it explores every execution path the program might take, over an
//! approximate value representation.  Nondeterminism is explicit — evaluating a term in one
//! [`World`][] produces a _list_ of `(value, world)` pairs, one per explored path — and there is
//! no parallelism anywhere: paths are explored sequentially, in a deterministic order.
//!
//! The evaluator itself is generic over the value representation (see
//! [`AbstractValue`][value::AbstractValue]) and dispatches per syntax variant through the
//! [`Evaluatable`][] trait.  Termination in the presence of recursion is the business of the
//! [`caching`][] module.

use std::collections::BTreeSet;

use log::trace;

use crate::syntax::Term;
use crate::Identifier;

pub mod caching;
pub mod control;
pub mod error;
pub mod store;
pub mod value;

pub use caching::Cache;
pub use caching::Cached;
pub use caching::Configuration;
pub use error::ErrorPolicy;
pub use error::EvalError;
pub use store::Address;
pub use store::Allocator;
pub use store::Environment;
pub use store::Heap;
pub use value::AbstractValue;
pub use value::Closure;

/// One possible state of an evaluation: an environment, a heap, and the fresh-address counter.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct World<V: AbstractValue> {
    pub environment: Environment,
    pub heap: Heap<V>,
    pub fresh: usize,
}

impl<V: AbstractValue> World<V> {
    pub fn new() -> World<V> {
        World {
            environment: Environment::new(),
            heap: Heap::new(),
            fresh: 0,
        }
    }
}

impl<V: AbstractValue> Default for World<V> {
    fn default() -> World<V> {
        World::new()
    }
}

/// The nondeterministic result of evaluating one term: one `(value, world)` pair per explored
/// path.
pub type Worlds<V> = Vec<(V, World<V>)>;

pub type EvalResult<V> = Result<Worlds<V>, EvalError>;

/// Removes duplicate `(value, world)` pairs, keeping results in a canonical order.
pub fn dedup<V: AbstractValue>(worlds: Worlds<V>) -> Worlds<V> {
    worlds
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The evaluation rule for one syntax variant.
///
/// Implementations receive the whole term (for its location and cache identity) alongside the
/// variant payload, and recurse through [`Evaluator::evaluate`][] so that the caching layer sees
/// every subterm.
pub trait Evaluatable {
    fn evaluate<V: AbstractValue>(
        &self,
        term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V>;
}

/// An abstract interpreter for assigned terms.
pub struct Evaluator<V: AbstractValue> {
    policy: ErrorPolicy,
    allocator: Allocator,
    pub(crate) caching: Option<caching::CachingState<V>>,
}

impl<V: AbstractValue> Evaluator<V> {
    pub fn new() -> Evaluator<V> {
        Evaluator {
            policy: ErrorPolicy::Abort,
            allocator: Allocator::Precise,
            caching: None,
        }
    }

    /// Sets what happens when a term raises a resumable error.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Evaluator<V> {
        self.policy = policy;
        self
    }

    /// Sets the address allocation policy.  Convergence over recursive programs requires
    /// [`Allocator::Monovariant`][].
    pub fn with_allocator(mut self, allocator: Allocator) -> Evaluator<V> {
        self.allocator = allocator;
        self
    }

    /// Allocates an address for a binding of `name`.
    pub fn allocate(&self, world: &mut World<V>, name: &Identifier) -> Address {
        match self.allocator {
            Allocator::Precise => {
                let address = Address::Indexed(world.fresh);
                world.fresh += 1;
                address
            }
            Allocator::Monovariant => Address::Named(name.clone()),
        }
    }

    /// Evaluates one term.  This is the hook every recursion goes through: when a convergence
    /// loop is running it consults the caches first (see [`caching`][]), otherwise it dispatches
    /// to the term's evaluation rule directly.
    pub fn evaluate(&mut self, term: &Term, world: World<V>) -> EvalResult<V> {
        if self.caching.is_some() {
            self.evaluate_cached(term, world)
        } else {
            self.evaluate_direct(term, world)
        }
    }

    pub(crate) fn evaluate_direct(&mut self, term: &Term, world: World<V>) -> EvalResult<V> {
        trace!("eval {} {}", term.syntax.variant_name(), term.span);
        let recovery_world = match self.policy {
            ErrorPolicy::Resume => Some(world.clone()),
            ErrorPolicy::Abort => None,
        };
        match term.syntax.evaluate(term, self, world) {
            Ok(worlds) => Ok(dedup(worlds)),
            Err(error) => match (recovery_world, error.recovery::<V>()) {
                (Some(world), Some(value)) => {
                    trace!("resume {} with {:?}", error, value);
                    Ok(vec![(value, world)])
                }
                _ => Err(error),
            },
        }
    }

    /// Looks a variable up: environment for its address, then heap for its possible values,
    /// yielding one world per value.
    pub fn variable(&mut self, name: &Identifier, world: World<V>) -> EvalResult<V> {
        let address = world
            .environment
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundVariable(name.clone()))?;
        let values = world.heap.get(&address)?.clone();
        Ok(values
            .into_iter()
            .map(|value| (value, world.clone()))
            .collect())
    }

    /// Applies a closure to already-evaluated arguments: one fresh address per parameter, bound
    /// in a new scope layered over the closure's captured environment.  The caller's environment
    /// is restored in every resulting world.
    pub fn call(&mut self, function: &V, arguments: Vec<V>, world: World<V>) -> EvalResult<V> {
        let closure = function.as_closure()?.clone();
        if closure.params.len() != arguments.len() {
            return Err(EvalError::WrongArity {
                expected: closure.params.len(),
                actual: arguments.len(),
            });
        }
        let caller = world.environment.clone();
        let mut world = world;
        let mut environment = closure.environment.clone();
        environment.push_scope();
        for (param, argument) in closure.params.iter().zip(arguments) {
            let address = self.allocate(&mut world, param);
            world.heap.put(address.clone(), argument);
            environment.bind(param.clone(), address);
        }
        world.environment = environment;
        let results = self.evaluate(&closure.body, world)?;
        Ok(results
            .into_iter()
            .map(|(value, mut world)| {
                world.environment = caller.clone();
                (value, world)
            })
            .collect())
    }

    /// Evaluates `terms` in order, eagerly, threading worlds through the whole sequence; the
    /// result is the cartesian exploration of every path.
    pub fn evaluate_all(
        &mut self,
        terms: &[Term],
        world: World<V>,
    ) -> Result<Vec<(Vec<V>, World<V>)>, EvalError> {
        let mut states = vec![(Vec::new(), world)];
        for term in terms {
            let mut next = Vec::new();
            for (values, world) in states {
                for (value, world) in self.evaluate(term, world)? {
                    let mut values = values.clone();
                    values.push(value);
                    next.push((values, world));
                }
            }
            states = next;
        }
        Ok(states)
    }
}

impl<V: AbstractValue> Default for Evaluator<V> {
    fn default() -> Evaluator<V> {
        Evaluator::new()
    }
}
