// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! This library turns concrete syntax trees that have been parsed with [tree-sitter][] into typed
//! terms, and abstractly interprets those terms to compute approximate program semantics.
//!
//! [tree-sitter]: https://docs.rs/tree-sitter/
//!
//! # Overview
//!
//! You can use [tree-sitter][] to parse the content of source code into a _concrete syntax tree_,
//! but a concrete tree is an awkward thing to analyze: it is full of punctuation, its shape
//! follows the grammar rather than the language's semantics, and every node looks the same.  This
//! library lets you _assign_ that tree to a typed term representation, using a combinator program
//! that runs over the parsed tree instead of over raw text (the [`assignment`][] module).
//! Assigned terms can then be fed to an abstract interpreter (the [`eval`][] module) which
//! explores every execution path a program might take, using a per-module cache and a fixed-point
//! loop to guarantee that the exploration terminates.
//!
//! Neither engine is tied to a particular source language: assignment works against any
//! [`tree::SyntaxTree`][] implementation, and evaluation against any [`eval::AbstractValue`][]
//! implementation.

pub mod assignment;
pub mod eval;
pub mod location;
pub mod syntax;
pub mod tree;

pub use assignment::Error as AssignmentError;
pub use eval::error::EvalError;
pub use eval::Evaluator;
pub use location::ByteRange;
pub use location::Position;
pub use location::Span;
pub use tree::Symbol;
pub use tree::SymbolKind;

use std::hash::Hash;
use std::sync::Arc;

/// An identifier that appears in an assigned term or in an evaluation environment.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Identifier(Arc<String>);

impl Identifier {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Identifier {
        Identifier(Arc::new(String::from(value)))
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Identifier {
        Identifier(Arc::new(value))
    }
}

impl Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<'a> PartialEq<&'a str> for Identifier {
    fn eq(&self, other: &&'a str) -> bool {
        self.as_str() == *other
    }
}
