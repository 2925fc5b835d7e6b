// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the evaluator's control-flow combinators
//!
//! There are two primitives here: [`if_then_else`][Evaluator::if_then_else], which fans an
//! abstract condition out over its branches, and [`loop_`][Evaluator::loop_], an explicit
//! worklist from which every looping construct is derived.  Each language's loop syntax reuses
//! these two instead of re-deriving its own branching: worlds that have already been stepped are
//! never stepped again, so a condition that abstracts to "either boolean" cannot drive a loop
//! forever.

use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::eval::dedup;
use crate::eval::value::AbstractValue;
use crate::eval::EvalError;
use crate::eval::EvalResult;
use crate::eval::Evaluator;
use crate::eval::World;
use crate::syntax::Term;

/// What one loop iteration does with one world.
pub enum LoopControl<V> {
    /// Step again from the given world.
    Continue,
    /// Leave the loop, yielding a value.
    Break(V),
}

impl<V: AbstractValue> Evaluator<V> {
    /// Branches on an abstract condition: `then` runs in every world in which the condition can
    /// be true, `otherwise` in every world in which it can be false.  An abstract boolean runs
    /// both.
    pub fn if_then_else<T, F, G>(
        &mut self,
        condition: &Term,
        world: World<V>,
        mut then: F,
        mut otherwise: G,
    ) -> Result<Vec<T>, EvalError>
    where
        F: FnMut(&mut Self, World<V>) -> Result<Vec<T>, EvalError>,
        G: FnMut(&mut Self, World<V>) -> Result<Vec<T>, EvalError>,
    {
        let mut results = Vec::new();
        for (value, world) in self.evaluate(condition, world)? {
            for truth in value.truthy()? {
                let branch = if truth {
                    then(self, world.clone())?
                } else {
                    otherwise(self, world.clone())?
                };
                results.extend(branch);
            }
        }
        Ok(results)
    }

    /// The loop primitive: repeatedly applies `step` to a worklist of worlds, collecting the
    /// worlds that break out.  A world that has been stepped before is skipped, which bounds the
    /// exploration by the number of distinct worlds the loop body can produce.
    pub fn loop_<F>(&mut self, world: World<V>, mut step: F) -> EvalResult<V>
    where
        F: FnMut(&mut Self, World<V>) -> Result<Vec<(LoopControl<V>, World<V>)>, EvalError>,
    {
        let mut queue = VecDeque::new();
        queue.push_back(world);
        let mut seen = BTreeSet::new();
        let mut exits = Vec::new();
        while let Some(world) = queue.pop_front() {
            if !seen.insert(world.clone()) {
                continue;
            }
            for (control, world) in step(self, world)? {
                match control {
                    LoopControl::Continue => queue.push_back(world),
                    LoopControl::Break(value) => exits.push((value, world)),
                }
            }
        }
        Ok(dedup(exits))
    }

    /// `while condition { body }`.  Yields unit for every world in which the loop exits.
    pub fn while_(&mut self, condition: &Term, body: &Term, world: World<V>) -> EvalResult<V> {
        self.loop_(world, |evaluator, world| {
            evaluator.if_then_else(
                condition,
                world,
                |evaluator, world| {
                    Ok(evaluator
                        .evaluate(body, world)?
                        .into_iter()
                        .map(|(_, world)| (LoopControl::Continue, world))
                        .collect())
                },
                |_, world| Ok(vec![(LoopControl::Break(V::unit()), world)]),
            )
        })
    }

    /// `do { body } while condition`: the body runs before the condition is first checked.
    pub fn do_while(&mut self, body: &Term, condition: &Term, world: World<V>) -> EvalResult<V> {
        self.loop_(world, |evaluator, world| {
            let mut steps = Vec::new();
            for (_, world) in evaluator.evaluate(body, world)? {
                steps.extend(evaluator.if_then_else(
                    condition,
                    world,
                    |_, world| Ok(vec![(LoopControl::Continue, world)]),
                    |_, world| Ok(vec![(LoopControl::Break(V::unit()), world)]),
                )?);
            }
            Ok(steps)
        })
    }

    /// `for (initial; condition; update) { body }`.  The initializer's bindings live in a scope
    /// that is popped again in every exiting world.
    pub fn for_loop(
        &mut self,
        initial: &Term,
        condition: &Term,
        update: &Term,
        body: &Term,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut world = world;
        world.environment.push_scope();
        let mut results = Vec::new();
        for (_, world) in self.evaluate(initial, world)? {
            let exits = self.loop_(world, |evaluator, world| {
                evaluator.if_then_else(
                    condition,
                    world,
                    |evaluator, world| {
                        let mut steps = Vec::new();
                        for (_, world) in evaluator.evaluate(body, world)? {
                            for (_, world) in evaluator.evaluate(update, world)? {
                                steps.push((LoopControl::Continue, world));
                            }
                        }
                        Ok(steps)
                    },
                    |_, world| Ok(vec![(LoopControl::Break(V::unit()), world)]),
                )
            })?;
            results.extend(exits);
        }
        Ok(dedup(
            results
                .into_iter()
                .map(|(value, mut world)| {
                    world.environment.pop_scope();
                    (value, world)
                })
                .collect(),
        ))
    }
}
