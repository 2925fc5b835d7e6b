// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the errors that can occur during abstract evaluation

use thiserror::Error;

use crate::eval::store::Address;
use crate::eval::value::AbstractValue;
use crate::Identifier;

/// An error raised while evaluating a term.
///
/// Most of these are _resumable_: each has a declared default-recovery value, and an evaluator
/// configured with [`ErrorPolicy::Resume`][] substitutes that value and continues instead of
/// aborting the module.  [`MissingModuleResult`][EvalError::MissingModuleResult] is the
/// exception: it indicates a broken embedding, not a property of the program under analysis.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EvalError {
    #[error("use of unallocated address {0}")]
    UnallocatedAddress(Address),
    #[error("use of uninitialized address {0}")]
    UninitializedAddress(Address),
    #[error("unbound variable {0}")]
    UnboundVariable(Identifier),
    #[error("malformed numeric literal '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expected a boolean, but got {0}")]
    ExpectedBoolean(String),
    #[error("expected a callable value, but got {0}")]
    ExpectedClosure(String),
    #[error("expected a numeric value, but got {0}")]
    ExpectedNumber(String),
    #[error("expected an indexable value, but got {0}")]
    ExpectedIndexable(String),
    #[error("index {0} out of bounds")]
    IndexOutOfBounds(String),
    #[error("wrong number of arguments: expected {expected}, but got {actual}")]
    WrongArity { expected: usize, actual: usize },
    #[error("no cached result for the module configuration after convergence")]
    MissingModuleResult,
}

/// What an evaluator does when a term raises an [`EvalError`][].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    /// Abort evaluation of the whole module.
    Abort,
    /// Substitute the error's default-recovery value and continue, when the error has one.
    Resume,
}

impl EvalError {
    /// The default-recovery value for this error, if it is resumable.
    pub fn recovery<V: AbstractValue>(&self) -> Option<V> {
        match self {
            EvalError::UnallocatedAddress(_)
            | EvalError::UninitializedAddress(_)
            | EvalError::UnboundVariable(_) => Some(V::null()),
            EvalError::InvalidNumber(_) | EvalError::DivisionByZero => Some(V::integer(0)),
            EvalError::ExpectedBoolean(_) => Some(V::boolean(false)),
            EvalError::ExpectedClosure(_)
            | EvalError::ExpectedNumber(_)
            | EvalError::ExpectedIndexable(_)
            | EvalError::IndexOutOfBounds(_)
            | EvalError::WrongArity { .. }
            | EvalError::MissingModuleResult => None,
        }
    }
}
