// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the errors produced when assignment of a syntax tree fails

#[cfg(feature = "term-colors")]
use colored::Colorize;
use smallvec::SmallVec;
use std::path::Path;
use thiserror::Error;

use crate::location::Span;
use crate::tree::Grammar;
use crate::tree::Symbol;

/// Why an assignment failed at a particular point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// No alternative at a choice point matched the current node.
    UnexpectedSymbol,
    /// A `children` descent (or the top level) completed with a regular-kind sibling left over.
    TrailingNode,
    /// An error thrown explicitly by an assignment program.
    Thrown,
}

/// An error produced while assigning a syntax tree.
///
/// `expected` is the union of every symbol the failing choice point could have accepted, and
/// `actual` is the symbol that was found, if any node remained at all.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{span}: error: expected one of {expected:?}, but got {actual:?}")]
pub struct Error {
    pub kind: ErrorKind,
    pub span: Span,
    pub expected: SmallVec<[Symbol; 8]>,
    pub actual: Option<Symbol>,
    /// Rule labels that were in scope when the error occurred, innermost first.
    pub labels: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Error {
        Error {
            kind,
            span,
            expected: SmallVec::new(),
            actual: None,
            labels: Vec::new(),
        }
    }

    pub fn unexpected(
        span: Span,
        expected: impl IntoIterator<Item = Symbol>,
        actual: Option<Symbol>,
    ) -> Error {
        let mut expected = expected.into_iter().collect::<SmallVec<_>>();
        expected.sort();
        expected.dedup();
        Error {
            kind: ErrorKind::UnexpectedSymbol,
            span,
            expected,
            actual,
            labels: Vec::new(),
        }
    }

    pub fn trailing_node(span: Span, actual: Symbol) -> Error {
        Error {
            kind: ErrorKind::TrailingNode,
            span,
            expected: SmallVec::new(),
            actual: Some(actual),
            labels: Vec::new(),
        }
    }

    /// Renders this error with symbol names, a source excerpt and a caret.
    pub fn display_pretty<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        grammar: &'a dyn Grammar,
    ) -> impl std::fmt::Display + 'a {
        DisplayErrorPretty {
            error: self,
            path,
            source,
            grammar,
        }
    }

    fn message(&self, grammar: &dyn Grammar) -> String {
        let actual = match self.actual {
            Some(symbol) => grammar.symbol_name(symbol).to_string(),
            None => "end of input".to_string(),
        };
        match self.kind {
            ErrorKind::TrailingNode => format!("unexpected trailing {} node", actual),
            ErrorKind::UnexpectedSymbol | ErrorKind::Thrown => {
                let mut expected = String::new();
                for (index, symbol) in self.expected.iter().enumerate() {
                    if index > 0 {
                        if index + 1 == self.expected.len() {
                            expected.push_str(if self.expected.len() > 2 { ", or " } else { " or " });
                        } else {
                            expected.push_str(", ");
                        }
                    }
                    expected.push_str(grammar.symbol_name(*symbol));
                }
                if expected.is_empty() {
                    format!("unexpected {}", actual)
                } else {
                    format!("expected {}, but got {}", expected, actual)
                }
            }
        }
    }
}

struct DisplayErrorPretty<'a> {
    error: &'a Error,
    path: &'a Path,
    source: &'a str,
    grammar: &'a dyn Grammar,
}

impl std::fmt::Display for DisplayErrorPretty<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}:{}: error: {}",
            self.path.to_str().unwrap_or("<unknown file>"),
            self.error.span,
            self.error.message(self.grammar),
        )?;
        for label in &self.error.labels {
            writeln!(f, "  while assigning {}", label)?;
        }
        write!(
            f,
            "{}",
            Excerpt::from_source(self.source, &self.error.span, 2)
        )
    }
}

/// An excerpt of the source under assignment, with a gutter and a caret.
struct Excerpt<'a> {
    source: Option<&'a str>,
    span: &'a Span,
    indent: usize,
}

impl<'a> Excerpt<'a> {
    fn from_source(source: &'a str, span: &'a Span, indent: usize) -> Excerpt<'a> {
        Excerpt {
            source: source.lines().nth(span.start.row),
            span,
            indent,
        }
    }

    fn gutter_width(&self) -> usize {
        ((self.span.start.row + 1) as f64).log10() as usize + 1
    }
}

impl<'a> std::fmt::Display for Excerpt<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fn blue(str: &str) -> impl std::fmt::Display {
            #[cfg(feature = "term-colors")]
            {
                str.blue().to_string()
            }
            #[cfg(not(feature = "term-colors"))]
            {
                str.to_string()
            }
        }
        fn red_bold(str: &str) -> impl std::fmt::Display {
            #[cfg(feature = "term-colors")]
            {
                str.red().bold().to_string()
            }
            #[cfg(not(feature = "term-colors"))]
            {
                str.to_string()
            }
        }

        // first line: line number & source
        writeln!(
            f,
            "{}{}{}{}",
            " ".repeat(self.indent),
            blue(&format!("{}", self.span.start.row + 1)),
            blue(" | "),
            self.source.unwrap_or("<no source found>"),
        )?;
        // second line: caret
        writeln!(
            f,
            "{}{}{}{}{}",
            " ".repeat(self.indent),
            " ".repeat(self.gutter_width()),
            blue(" | "),
            " ".repeat(self.span.start.column),
            red_bold("^"),
        )?;
        Ok(())
    }
}
