// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the assignment engine: a combinator parser that runs over a parsed syntax tree
//!
//! An [`Assignment`][] is a program built from a small set of primitive operations — match the
//! current node's symbol, read its location or source text, descend into its children, repeat,
//! choose among alternatives — which is interpreted by [`run`][] against any [`SyntaxTree`][]
//! implementation.  The output is a typed term (whatever the program's builders produce), or a
//! structured [`Error`][] describing which symbols would have been acceptable at the point of
//! failure.
//!
//! Choices among symbol-keyed alternatives use _committed choice_: the alternatives are compiled
//! into a dispatch table keyed by grammar symbol, and once the current node's symbol selects a
//! table entry, a failure deeper inside that entry does not backtrack to try the other entries.
//! This keeps error messages precise and assignment time linear in the size of the tree.
//!
//! [`SyntaxTree`]: ../tree/trait.SyntaxTree.html

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;
use smallvec::SmallVec;

use crate::location::ByteRange;
use crate::location::Position;
use crate::location::Span;
use crate::tree::Grammar;
use crate::tree::NodeInfo;
use crate::tree::Symbol;
use crate::tree::SymbolKind;
use crate::tree::SyntaxTree;

pub mod error;

pub use error::Error;
pub use error::ErrorKind;

/// An intermediate value produced while running an assignment program.
#[derive(Clone, Debug)]
pub enum Out<T> {
    /// Produced by [`Assignment::location`][]: the current node's extent.
    Location(ByteRange, Span),
    /// Produced by [`Assignment::source`][]: the current node's source text.
    Text(String),
    /// A single assigned term.
    Term(T),
    /// A sequence of assigned terms, as produced by [`Assignment::many`][].
    Terms(Vec<T>),
    /// Produced by operations that exist only for their effect on the cursor.
    Unit,
}

type Builder<T> = Rc<dyn Fn(Vec<Out<T>>) -> Out<T>>;
type Handler<T> = Rc<dyn Fn(&Error) -> Assignment<T>>;
type Thunk<T> = Rc<dyn Fn() -> Assignment<T>>;

/// An assignment program.  Programs are cheap to clone and can be shared between choice points.
pub struct Assignment<T>(Rc<Op<T>>);

impl<T> Clone for Assignment<T> {
    fn clone(&self) -> Assignment<T> {
        Assignment(self.0.clone())
    }
}

enum Op<T> {
    Location,
    Source,
    Symbol(Symbol),
    Children(Assignment<T>),
    Many(Assignment<T>),
    Choice(ChoiceTable<T>),
    Seq(Vec<Assignment<T>>, Builder<T>),
    Label(Assignment<T>, String),
    Catch(Assignment<T>, Handler<T>),
    Throw(Error),
    Lazy(Thunk<T>, RefCell<Option<Assignment<T>>>),
}

/// The compiled dispatch table for a choice point.  Built once, when the choice is constructed.
struct ChoiceTable<T> {
    /// Symbol-keyed alternatives.  Duplicate keys (including keys merged in from nested choices)
    /// alternate in order under a single entry.
    entries: BTreeMap<Symbol, SmallVec<[Assignment<T>; 1]>>,
    /// Alternatives with no leading symbol discriminator, tried in order on a table miss.
    fallback: Vec<Assignment<T>>,
    /// The full first set of this choice, for error reporting and token skipping.
    expected: SmallVec<[Symbol; 8]>,
}

impl<T> Assignment<T> {
    fn new(op: Op<T>) -> Assignment<T> {
        Assignment(Rc::new(op))
    }

    /// Yields the current node's byte range and span without advancing.  Never fails: with no
    /// node remaining it yields a zero-width location at the current cursor offset.
    pub fn location() -> Assignment<T> {
        Assignment::new(Op::Location)
    }

    /// Yields the current node's source text and advances past it.
    pub fn source() -> Assignment<T> {
        Assignment::new(Op::Source)
    }

    /// Succeeds, without advancing, iff the current node's symbol is `symbol`.
    pub fn symbol(symbol: Symbol) -> Assignment<T> {
        Assignment::new(Op::Symbol(symbol))
    }

    /// Runs `inner` against the current node's children, requiring it to consume every
    /// regular-kind child, then advances past the node.
    pub fn children(inner: Assignment<T>) -> Assignment<T> {
        Assignment::new(Op::Children(inner))
    }

    /// Repeats `inner` zero or more times, collecting the terms it produces.  Stops when `inner`
    /// fails or stops making progress; never itself fails.
    pub fn many(inner: Assignment<T>) -> Assignment<T> {
        Assignment::new(Op::Many(inner))
    }

    /// Ordered, committed choice among `alternatives`, dispatched by grammar symbol.
    pub fn choice(alternatives: Vec<Assignment<T>>) -> Assignment<T> {
        let mut entries: BTreeMap<Symbol, SmallVec<[Assignment<T>; 1]>> = BTreeMap::new();
        let mut fallback = Vec::new();
        for alternative in alternatives {
            add_alternative(&mut entries, &mut fallback, alternative);
        }
        let mut expected = entries.keys().copied().collect::<SmallVec<[Symbol; 8]>>();
        for alternative in &fallback {
            expected.extend(first_set(alternative));
        }
        expected.sort();
        expected.dedup();
        Assignment::new(Op::Choice(ChoiceTable {
            entries,
            fallback,
            expected,
        }))
    }

    /// Runs `items` in order, passing their outputs to `build`.
    pub fn seq(
        items: Vec<Assignment<T>>,
        build: impl Fn(Vec<Out<T>>) -> Out<T> + 'static,
    ) -> Assignment<T> {
        Assignment::new(Op::Seq(items, Rc::new(build)))
    }

    /// Fails with `error`, its span filled in from the cursor at the point of failure.
    pub fn throw(error: Error) -> Assignment<T> {
        Assignment::new(Op::Throw(error))
    }

    /// Defers construction of a program, so that rules can refer to each other recursively.  The
    /// program is built on first use and reused afterwards.
    pub fn lazy(build: impl Fn() -> Assignment<T> + 'static) -> Assignment<T> {
        Assignment::new(Op::Lazy(Rc::new(build), RefCell::new(None)))
    }

    /// Names this program in error messages.  Transparent to success.
    pub fn label(self, name: &str) -> Assignment<T> {
        Assignment::new(Op::Label(self, name.to_string()))
    }

    /// Attempts this program; on failure, runs the handler's program from the _original_ cursor
    /// state (not from the point of failure).
    pub fn catch(self, handler: impl Fn(&Error) -> Assignment<T> + 'static) -> Assignment<T> {
        Assignment::new(Op::Catch(self, Rc::new(handler)))
    }

    /// A leaf rule: match `symbol`, and build a term from the node's extent and source text.
    pub fn token(
        symbol: Symbol,
        build: impl Fn(ByteRange, Span, &str) -> T + 'static,
    ) -> Assignment<T> {
        Assignment::seq(
            vec![
                Assignment::symbol(symbol),
                Assignment::location(),
                Assignment::source(),
            ],
            move |outs| {
                let mut range = ByteRange::default();
                let mut span = Span::default();
                let mut text = String::new();
                for out in outs {
                    match out {
                        Out::Location(r, s) => {
                            range = r;
                            span = s;
                        }
                        Out::Text(t) => text = t,
                        _ => {}
                    }
                }
                Out::Term(build(range, span, &text))
            },
        )
    }

    /// An interior rule: match `symbol`, run `inner` over the node's children, and build a term
    /// from the node's extent and `inner`'s output.
    pub fn rule(
        symbol: Symbol,
        inner: Assignment<T>,
        build: impl Fn(ByteRange, Span, Out<T>) -> T + 'static,
    ) -> Assignment<T> {
        Assignment::seq(
            vec![
                Assignment::symbol(symbol),
                Assignment::location(),
                Assignment::children(inner),
            ],
            move |outs| {
                let mut range = ByteRange::default();
                let mut span = Span::default();
                let mut result = Out::Unit;
                for out in outs {
                    match out {
                        Out::Location(r, s) => {
                            range = r;
                            span = s;
                        }
                        Out::Unit => {}
                        other => result = other,
                    }
                }
                Out::Term(build(range, span, result))
            },
        )
    }
}

/// Adds one alternative to a choice table under construction.  Nested choices are flattened into
/// the parent table; alternatives keyed by the same symbol alternate in order under that key.
fn add_alternative<T>(
    entries: &mut BTreeMap<Symbol, SmallVec<[Assignment<T>; 1]>>,
    fallback: &mut Vec<Assignment<T>>,
    alternative: Assignment<T>,
) {
    match &*alternative.0 {
        Op::Choice(table) => {
            for (symbol, alternatives) in &table.entries {
                entries
                    .entry(*symbol)
                    .or_default()
                    .extend(alternatives.iter().cloned());
            }
            fallback.extend(table.fallback.iter().cloned());
        }
        _ => {
            let symbols = first_symbols(&alternative);
            if symbols.is_empty() {
                fallback.push(alternative);
            } else {
                for symbol in symbols {
                    entries
                        .entry(symbol)
                        .or_default()
                        .push(alternative.clone());
                }
            }
        }
    }
}

/// The symbols that would commit to `program` at a choice point, if any.
fn first_symbols<T>(program: &Assignment<T>) -> SmallVec<[Symbol; 4]> {
    match &*program.0 {
        Op::Symbol(symbol) => SmallVec::from_slice(&[*symbol]),
        Op::Label(inner, _) => first_symbols(inner),
        Op::Seq(items, _) => {
            for item in items {
                let symbols = first_symbols(item);
                if !symbols.is_empty() {
                    return symbols;
                }
                if !matches!(&*item.0, Op::Location) {
                    break;
                }
            }
            SmallVec::new()
        }
        _ => SmallVec::new(),
    }
}

/// The union of every symbol `program` could accept first.  Computed statically, before
/// execution, so that errors can report the whole set of acceptable symbols.
fn first_set<T>(program: &Assignment<T>) -> SmallVec<[Symbol; 8]> {
    let mut symbols = SmallVec::new();
    collect_first_set(program, &mut symbols);
    symbols.sort();
    symbols.dedup();
    symbols
}

fn collect_first_set<T>(program: &Assignment<T>, into: &mut SmallVec<[Symbol; 8]>) {
    match &*program.0 {
        Op::Symbol(symbol) => into.push(*symbol),
        Op::Label(inner, _) | Op::Many(inner) | Op::Children(inner) | Op::Catch(inner, _) => {
            collect_first_set(inner, into)
        }
        Op::Choice(table) => into.extend(table.expected.iter().copied()),
        Op::Seq(items, _) => {
            for item in items {
                let before = into.len();
                collect_first_set(item, into);
                if into.len() > before || !matches!(&*item.0, Op::Location) {
                    break;
                }
            }
        }
        Op::Location | Op::Source | Op::Throw(_) | Op::Lazy(..) => {}
    }
}

/// The explicit cursor state threaded through the interpreter.  Equality of states is what lets
/// [`Assignment::many`][] detect that an iteration made no progress.
#[derive(Clone, Debug, Eq, PartialEq)]
struct State<N: Clone + PartialEq> {
    offset: usize,
    position: Position,
    siblings: VecDeque<N>,
}

impl<N: Clone + PartialEq> State<N> {
    fn advance(&mut self, info: &NodeInfo) {
        self.siblings.pop_front();
        self.offset = info.byte_range.end;
        self.position = info.span.end;
    }
}

/// Runs an assignment program against a syntax tree, producing the program's term or the error
/// at the point of failure.  The program must consume every regular-kind node at the top level.
pub fn run<T, Tr, G>(
    program: &Assignment<T>,
    tree: &Tr,
    grammar: &G,
    source: &str,
) -> Result<T, Error>
where
    Tr: SyntaxTree,
    G: Grammar,
{
    let interp = Interp {
        tree,
        grammar,
        source,
    };
    let state = State {
        offset: 0,
        position: Position::default(),
        siblings: VecDeque::from(vec![tree.root()]),
    };
    let (out, state) = interp.run(program, state)?;
    interp.ensure_exhausted(&state)?;
    match out {
        Out::Term(term) => Ok(term),
        _ => {
            let mut error = Error::new(ErrorKind::Thrown, Span::zero_width(state.position));
            error.labels.push("a program that produces a term".to_string());
            Err(error)
        }
    }
}

struct Interp<'a, Tr: SyntaxTree, G: Grammar> {
    tree: &'a Tr,
    grammar: &'a G,
    source: &'a str,
}

impl<'a, Tr: SyntaxTree, G: Grammar> Interp<'a, Tr, G> {
    fn current_info(&self, state: &State<Tr::Node>) -> Option<NodeInfo> {
        state
            .siblings
            .front()
            .map(|node| self.tree.node_info(node))
    }

    fn current_span(&self, state: &State<Tr::Node>) -> Span {
        self.current_info(state)
            .map(|info| info.span)
            .unwrap_or_else(|| Span::zero_width(state.position))
    }

    /// Drops leading anonymous-kind siblings that the caller is not prepared to accept.  Nodes
    /// whose symbol appears in `expected` survive, so that anonymous tokens can still be matched
    /// when a rule asks for them first.
    fn skip_anonymous(&self, state: &mut State<Tr::Node>, expected: &[Symbol]) {
        while let Some(info) = self.current_info(state) {
            if self.grammar.symbol_kind(info.symbol) != SymbolKind::Anonymous
                || expected.contains(&info.symbol)
            {
                break;
            }
            trace!(
                "skip anonymous {} at {}",
                self.grammar.symbol_name(info.symbol),
                info.span,
            );
            state.advance(&info);
        }
    }

    /// Errors if any regular-kind sibling remains unconsumed.
    fn ensure_exhausted(&self, state: &State<Tr::Node>) -> Result<(), Error> {
        for node in &state.siblings {
            let info = self.tree.node_info(node);
            if self.grammar.symbol_kind(info.symbol) == SymbolKind::Regular {
                return Err(Error::trailing_node(info.span, info.symbol));
            }
        }
        Ok(())
    }

    fn run<T>(
        &self,
        program: &Assignment<T>,
        mut state: State<Tr::Node>,
    ) -> Result<(Out<T>, State<Tr::Node>), Error> {
        match &*program.0 {
            Op::Location => match self.current_info(&state) {
                Some(info) => Ok((Out::Location(info.byte_range, info.span), state)),
                None => Ok((
                    Out::Location(
                        ByteRange::zero_width(state.offset),
                        Span::zero_width(state.position),
                    ),
                    state,
                )),
            },
            Op::Source => match self.current_info(&state) {
                Some(info) => {
                    let text = info
                        .byte_range
                        .slice(self.source)
                        .unwrap_or("")
                        .to_string();
                    trace!("source {:?} at {}", text, info.span);
                    state.advance(&info);
                    Ok((Out::Text(text), state))
                }
                None => Err(Error::unexpected(
                    Span::zero_width(state.position),
                    None,
                    None,
                )),
            },
            Op::Symbol(symbol) => {
                if self.grammar.symbol_kind(*symbol) == SymbolKind::Regular {
                    self.skip_anonymous(&mut state, &[*symbol]);
                }
                match self.current_info(&state) {
                    Some(info) if info.symbol == *symbol => {
                        trace!(
                            "match {} at {}",
                            self.grammar.symbol_name(*symbol),
                            info.span,
                        );
                        Ok((Out::Unit, state))
                    }
                    Some(info) => Err(Error::unexpected(
                        info.span,
                        Some(*symbol),
                        Some(info.symbol),
                    )),
                    None => Err(Error::unexpected(
                        Span::zero_width(state.position),
                        Some(*symbol),
                        None,
                    )),
                }
            }
            Op::Children(inner) => {
                let (node, info) = match state.siblings.front() {
                    Some(node) => (node.clone(), self.tree.node_info(node)),
                    None => {
                        return Err(Error::unexpected(
                            Span::zero_width(state.position),
                            None,
                            None,
                        ))
                    }
                };
                let child_state = State {
                    offset: info.byte_range.start,
                    position: info.span.start,
                    siblings: VecDeque::from(self.tree.children(&node)),
                };
                let (out, child_state) = self.run(inner, child_state)?;
                self.ensure_exhausted(&child_state)?;
                state.advance(&info);
                Ok((out, state))
            }
            Op::Many(inner) => {
                let mut results = Vec::new();
                loop {
                    match self.run(inner, state.clone()) {
                        Err(error) => {
                            trace!("many stops: {}", error);
                            break;
                        }
                        Ok((out, next)) => {
                            match out {
                                Out::Term(term) => results.push(term),
                                Out::Terms(terms) => results.extend(terms),
                                _ => {}
                            }
                            let progressed = next != state;
                            state = next;
                            if !progressed {
                                trace!("many stops: no progress");
                                break;
                            }
                        }
                    }
                }
                Ok((Out::Terms(results), state))
            }
            Op::Choice(table) => {
                self.skip_anonymous(&mut state, &table.expected);
                let info = self.current_info(&state);
                if let Some(alternatives) = info
                    .as_ref()
                    .and_then(|info| table.entries.get(&info.symbol))
                {
                    // Committed: a failure here does not fall through to the other entries.
                    let mut last = None;
                    for alternative in alternatives {
                        match self.run(alternative, state.clone()) {
                            Ok(success) => return Ok(success),
                            Err(error) => last = Some(error),
                        }
                    }
                    Err(last.unwrap_or_else(|| {
                        Error::unexpected(
                            self.current_span(&state),
                            table.expected.iter().copied(),
                            info.map(|info| info.symbol),
                        )
                    }))
                } else {
                    for alternative in &table.fallback {
                        if let Ok(success) = self.run(alternative, state.clone()) {
                            return Ok(success);
                        }
                    }
                    Err(Error::unexpected(
                        self.current_span(&state),
                        table.expected.iter().copied(),
                        info.map(|info| info.symbol),
                    ))
                }
            }
            Op::Seq(items, build) => {
                let mut outs = Vec::with_capacity(items.len());
                for item in items {
                    let (out, next) = self.run(item, state)?;
                    outs.push(out);
                    state = next;
                }
                Ok((build(outs), state))
            }
            Op::Label(inner, name) => self.run(inner, state).map_err(|mut error| {
                error.labels.push(name.clone());
                error
            }),
            Op::Catch(inner, handler) => match self.run(inner, state.clone()) {
                Ok(success) => Ok(success),
                Err(error) => self.run(&handler(&error), state),
            },
            Op::Throw(error) => {
                let mut error = error.clone();
                error.span = self.current_span(&state);
                error.actual = self.current_info(&state).map(|info| info.symbol);
                Err(error)
            }
            Op::Lazy(build, cell) => {
                let built = cell.borrow().clone();
                let inner = match built {
                    Some(inner) => inner,
                    None => {
                        let inner = build();
                        *cell.borrow_mut() = Some(inner.clone());
                        inner
                    }
                };
                self.run(&inner, state)
            }
        }
    }
}
