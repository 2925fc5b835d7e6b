// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the caching evaluator: memoized evaluation iterated to a fixed point
//!
//! A recursive program explored nondeterministically need not terminate.  The caching layer
//! forces termination by memoizing results per [`Configuration`][] and evaluating each module
//! repeatedly until the cache stops changing (a Kleene fixed point): each iteration starts from
//! an empty _out-cache_ and may consult the previous iteration's completed cache — the _oracle_ —
//! for seed results.  Within one iteration, re-entering a configuration that is still being
//! evaluated observes its seed instead of recursing, which is what cuts recursion off.
//!
//! Termination of the whole loop rests on the finiteness of the configuration space and the
//! value lattice, which the value representation must supply; see the discussion on
//! [`Widened`][crate::eval::value::Widened].

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use log::debug;
use log::trace;

use crate::eval::store::Address;
use crate::eval::store::Environment;
use crate::eval::store::Heap;
use crate::eval::value::AbstractValue;
use crate::eval::EvalError;
use crate::eval::EvalResult;
use crate::eval::Evaluator;
use crate::eval::World;
use crate::eval::Worlds;
use crate::location::ByteRange;
use crate::syntax::Term;

/// The key under which evaluation results are memoized: which term, in which environment, with
/// which addresses live.  Terms are identified by their byte range, which is unique per node
/// within one assigned tree.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Configuration {
    pub term: ByteRange,
    pub environment: Environment,
    pub roots: BTreeSet<Address>,
}

impl Configuration {
    pub fn new<V: AbstractValue>(term: &Term, world: &World<V>) -> Configuration {
        Configuration {
            term: term.byte_range,
            environment: world.environment.clone(),
            roots: world.environment.addresses(),
        }
    }
}

/// One memoized result: a value together with the heap in which it was produced.  Replaying a
/// cache hit restores the heap as a possible world of its own.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Cached<V: AbstractValue> {
    pub value: V,
    pub heap: Heap<V>,
}

/// A mapping from configurations to the set of results observed for them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cache<V: AbstractValue> {
    entries: BTreeMap<Configuration, BTreeSet<Cached<V>>>,
}

impl<V: AbstractValue> Cache<V> {
    pub fn new() -> Cache<V> {
        Cache {
            entries: BTreeMap::new(),
        }
    }

    /// The results recorded for `configuration`, if it has been visited at all.  `Some` of an
    /// empty set means "visited, and proven to produce nothing" — which is distinct from `None`,
    /// "not yet computed".
    pub fn lookup(&self, configuration: &Configuration) -> Option<&BTreeSet<Cached<V>>> {
        self.entries.get(configuration)
    }

    /// Replaces the entry for `configuration` with `results`.
    pub fn seed(&mut self, configuration: Configuration, results: BTreeSet<Cached<V>>) {
        self.entries.insert(configuration, results);
    }

    /// Unions one observed result into the entry for `configuration`.
    pub fn record(&mut self, configuration: Configuration, result: Cached<V>) {
        self.entries.entry(configuration).or_default().insert(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: AbstractValue> Default for Cache<V> {
    fn default() -> Cache<V> {
        Cache::new()
    }
}

/// The pair of caches alive while a convergence loop runs.
pub(crate) struct CachingState<V: AbstractValue> {
    /// The previous iteration's completed cache, consulted read-only.
    pub in_cache: Cache<V>,
    /// The cache being accumulated by the current iteration.
    pub out_cache: Cache<V>,
}

impl<V: AbstractValue> Evaluator<V> {
    /// Enters caching mode for one iteration of a convergence loop: `oracle` becomes the
    /// read-only in-cache, and the out-cache starts empty.
    pub fn begin_iteration(&mut self, oracle: Cache<V>) {
        self.caching = Some(CachingState {
            in_cache: oracle,
            out_cache: Cache::new(),
        });
    }

    /// Leaves caching mode, returning the iteration's accumulated out-cache.
    pub fn finish_iteration(&mut self) -> Cache<V> {
        match self.caching.take() {
            Some(state) => state.out_cache,
            None => Cache::new(),
        }
    }

    /// Read-only lookup in the oracle.  Never fails: an absent configuration is an empty set of
    /// seed results.
    pub fn consult_oracle(&self, configuration: &Configuration) -> BTreeSet<Cached<V>> {
        self.caching
            .as_ref()
            .and_then(|state| state.in_cache.lookup(configuration).cloned())
            .unwrap_or_default()
    }

    /// The current iteration's results for `configuration`, if it has been visited.
    pub fn lookup_cache(&self, configuration: &Configuration) -> Option<BTreeSet<Cached<V>>> {
        self.caching
            .as_ref()
            .and_then(|state| state.out_cache.lookup(configuration).cloned())
    }

    /// The per-term hook used while converging: replay the out-cache if this configuration has
    /// been visited, otherwise evaluate it seeded with the oracle's results.
    pub(crate) fn evaluate_cached(&mut self, term: &Term, world: World<V>) -> EvalResult<V> {
        let configuration = Configuration::new(term, &world);
        if let Some(hits) = self.lookup_cache(&configuration) {
            trace!("cache hit for {} ({} results)", term.span, hits.len());
            return Ok(replay(hits, &world));
        }
        let seed = self.consult_oracle(&configuration);
        self.caching_configuration(configuration, seed, term, world)
    }

    /// Seeds the out-cache entry for `configuration` _before_ evaluating, so that a recursive
    /// re-entry observes the seed instead of recursing unboundedly; afterwards, unions every
    /// observed `(value, heap)` pair into the entry.
    pub fn caching_configuration(
        &mut self,
        configuration: Configuration,
        seed: BTreeSet<Cached<V>>,
        term: &Term,
        world: World<V>,
    ) -> EvalResult<V> {
        if let Some(state) = &mut self.caching {
            state.out_cache.seed(configuration.clone(), seed);
        }
        let results = self.evaluate_direct(term, world)?;
        if let Some(state) = &mut self.caching {
            for (value, world) in &results {
                state.out_cache.record(
                    configuration.clone(),
                    Cached {
                        value: value.clone(),
                        heap: world.heap.clone(),
                    },
                );
            }
        }
        Ok(results)
    }

    /// Evaluates a module to a fixed point, returning its nondeterministic results and the
    /// converged cache.
    pub fn evaluate_module(
        &mut self,
        term: &Term,
        world: World<V>,
    ) -> Result<(Worlds<V>, Cache<V>), EvalError> {
        let (converged, _) = self.converge(term, &world, Cache::new())?;
        let configuration = Configuration::new(term, &world);
        let results = converged
            .lookup(&configuration)
            .ok_or(EvalError::MissingModuleResult)?;
        Ok((replay(results.clone(), &world), converged))
    }

    /// Iterates evaluation of `term`, feeding each iteration's out-cache in as the next
    /// iteration's oracle, until two successive iterations produce identical caches.  Every
    /// iteration restarts from the `snapshot` world, and all nondeterminism and results are
    /// corralled within the iteration: only the cache crosses iterations.  Returns the converged
    /// cache together with the number of iterations it took (including the one that observed no
    /// change).
    pub fn converge(
        &mut self,
        term: &Term,
        snapshot: &World<V>,
        cache: Cache<V>,
    ) -> Result<(Cache<V>, usize), EvalError> {
        let mut cache = cache;
        let mut iterations = 0usize;
        loop {
            iterations += 1;
            debug!("convergence iteration {} ({} entries)", iterations, cache.len());
            self.begin_iteration(cache.clone());
            let outcome = self.evaluate(term, snapshot.clone());
            let out = self.finish_iteration();
            outcome?;
            if out == cache {
                debug!("converged after {} iterations", iterations);
                return Ok((out, iterations));
            }
            cache = out;
        }
    }
}

/// Replays a set of cached results against the current environment: each cached heap becomes a
/// possible world of its own.
fn replay<V: AbstractValue>(results: BTreeSet<Cached<V>>, world: &World<V>) -> Worlds<V> {
    results
        .into_iter()
        .map(|cached| {
            (
                cached.value,
                World {
                    environment: world.environment.clone(),
                    heap: cached.heap,
                    fresh: world.fresh,
                },
            )
        })
        .collect()
}
