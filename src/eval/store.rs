// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the environment and heap threaded through abstract evaluation
//!
//! The heap maps addresses to _sets_ of possible values: writing to an address joins the new
//! value into the set rather than replacing it, which is the powerset over-approximation that
//! makes nondeterministic evaluation sound.  Everything here is ordered (`BTreeMap`-based) so
//! that environments and heaps can appear inside cache keys and cached result sets.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use log::trace;

use crate::eval::error::EvalError;
use crate::Identifier;

/// The address of one heap cell.
///
/// `Indexed` addresses are allocated from a fresh counter, giving every binding its own cell.
/// `Named` addresses are allocated one-per-name, collapsing every binding of a name into a single
/// cell; with finitely many names this keeps the address space finite, which the convergence loop
/// relies on.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Address {
    Indexed(usize),
    Named(Identifier),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Indexed(index) => write!(f, "@{}", index),
            Address::Named(name) => write!(f, "@{}", name),
        }
    }
}

/// The address allocation policy for an evaluator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Allocator {
    /// Every allocation returns a fresh `Indexed` address.
    Precise,
    /// Every allocation for the same name returns the same `Named` address.
    Monovariant,
}

/// A layered mapping from names to addresses.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Environment {
    scopes: Vec<BTreeMap<Identifier, Address>>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            scopes: vec![BTreeMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Binds a name in the innermost scope.
    pub fn bind(&mut self, name: Identifier, address: Address) {
        trace!("bind {} = {}", name, address);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, address);
        }
    }

    /// Looks a name up, innermost scope first.
    pub fn lookup(&self, name: &Identifier) -> Option<&Address> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// A flattened snapshot of this environment restricted to `names`.  Used to capture a
    /// closure's lexical environment.
    pub fn capture(&self, names: &BTreeSet<Identifier>) -> Environment {
        let mut scope = BTreeMap::new();
        for name in names {
            if let Some(address) = self.lookup(name) {
                scope.insert(name.clone(), address.clone());
            }
        }
        Environment {
            scopes: vec![scope],
        }
    }

    /// Every address bound anywhere in this environment.  These are the roots of a
    /// configuration's live set.
    pub fn addresses(&self) -> BTreeSet<Address> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.values().cloned())
            .collect()
    }
}

/// A heap mapping addresses to sets of possible values.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Heap<V: Ord> {
    cells: BTreeMap<Address, BTreeSet<V>>,
}

impl<V: Ord + Clone + fmt::Debug> Heap<V> {
    pub fn new() -> Heap<V> {
        Heap {
            cells: BTreeMap::new(),
        }
    }

    /// Joins `value` into the cell at `address`, creating the cell if necessary.
    pub fn put(&mut self, address: Address, value: V) {
        trace!("heap {} <- {:?}", address, value);
        self.cells.entry(address).or_default().insert(value);
    }

    /// The set of possible values at `address`.  An address that has never been written is an
    /// unallocated-address error; an allocated but empty cell is an uninitialized-address error.
    pub fn get(&self, address: &Address) -> Result<&BTreeSet<V>, EvalError> {
        let cell = self
            .cells
            .get(address)
            .ok_or_else(|| EvalError::UnallocatedAddress(address.clone()))?;
        if cell.is_empty() {
            return Err(EvalError::UninitializedAddress(address.clone()));
        }
        Ok(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
