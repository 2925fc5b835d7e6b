// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines typed terms and the catalog of syntax variants the evaluator understands
//!
//! A [`Term`][] is what assignment produces: a source location plus a [`Syntax`][] payload
//! holding child terms.  Term trees are immutable and tree-shaped — no subterm is shared — and
//! are consumed read-only by evaluation.
//!
//! Each variant is its own struct with its own [`Evaluatable`][] implementation; `Syntax` just
//! dispatches.  The catalog here is deliberately small — statements, literals, variables,
//! control flow, functions — since per-language productions are the business of whoever writes
//! the assignment rules, not of this crate.

use std::collections::BTreeSet;

use crate::eval::value::ArithOp;
use crate::eval::value::BitOp;
use crate::eval::value::CompareOp;
use crate::eval::AbstractValue;
use crate::eval::Closure;
use crate::eval::EvalError;
use crate::eval::EvalResult;
use crate::eval::Evaluatable;
use crate::eval::Evaluator;
use crate::eval::World;
use crate::location::ByteRange;
use crate::location::Span;

/// A typed term: a source location and a syntax payload.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Term {
    pub byte_range: ByteRange,
    pub span: Span,
    pub syntax: Syntax,
}

impl Term {
    pub fn new(byte_range: ByteRange, span: Span, syntax: Syntax) -> Term {
        Term {
            byte_range,
            span,
            syntax,
        }
    }

    /// Collects the free variables of this term into `into`.
    pub fn free_variables(&self, into: &mut BTreeSet<crate::Identifier>) {
        self.syntax.free_variables(into)
    }
}

/// A syntax variant.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Syntax {
    // Literals
    Empty,
    Null,
    Boolean(Boolean),
    Integer(Integer),
    Float(Float),
    Text(Text),
    // Variables
    Identifier(Identifier),
    Assign(Assign),
    // Statements
    Statements(Statements),
    If(If),
    While(While),
    DoWhile(DoWhile),
    ForLoop(ForLoop),
    Return(Return),
    // Functions
    Function(Function),
    Call(Call),
    // Operators
    Binary(Binary),
    Negate(Negate),
    Index(Index),
    // Recovery
    Error(Error),
}

impl Syntax {
    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Syntax::Empty => "Empty",
            Syntax::Null => "Null",
            Syntax::Boolean(_) => "Boolean",
            Syntax::Integer(_) => "Integer",
            Syntax::Float(_) => "Float",
            Syntax::Text(_) => "Text",
            Syntax::Identifier(_) => "Identifier",
            Syntax::Assign(_) => "Assign",
            Syntax::Statements(_) => "Statements",
            Syntax::If(_) => "If",
            Syntax::While(_) => "While",
            Syntax::DoWhile(_) => "DoWhile",
            Syntax::ForLoop(_) => "ForLoop",
            Syntax::Return(_) => "Return",
            Syntax::Function(_) => "Function",
            Syntax::Call(_) => "Call",
            Syntax::Binary(_) => "Binary",
            Syntax::Negate(_) => "Negate",
            Syntax::Index(_) => "Index",
            Syntax::Error(_) => "Error",
        }
    }

    fn free_variables(&self, into: &mut BTreeSet<crate::Identifier>) {
        match self {
            Syntax::Empty | Syntax::Null => {}
            Syntax::Boolean(_) | Syntax::Integer(_) | Syntax::Float(_) | Syntax::Text(_) => {}
            Syntax::Identifier(identifier) => {
                into.insert(identifier.name.clone());
            }
            Syntax::Assign(assign) => {
                // The written name is free too: closures that write to an outer variable must
                // capture its address.
                into.insert(assign.name.clone());
                assign.value.free_variables(into);
            }
            Syntax::Statements(statements) => {
                for statement in &statements.statements {
                    statement.free_variables(into);
                }
            }
            Syntax::If(if_) => {
                if_.condition.free_variables(into);
                if_.consequence.free_variables(into);
                if_.alternative.free_variables(into);
            }
            Syntax::While(while_) => {
                while_.condition.free_variables(into);
                while_.body.free_variables(into);
            }
            Syntax::DoWhile(do_while) => {
                do_while.body.free_variables(into);
                do_while.condition.free_variables(into);
            }
            Syntax::ForLoop(for_loop) => {
                for_loop.initial.free_variables(into);
                for_loop.condition.free_variables(into);
                for_loop.update.free_variables(into);
                for_loop.body.free_variables(into);
            }
            Syntax::Return(return_) => return_.value.free_variables(into),
            Syntax::Function(function) => {
                let mut body = BTreeSet::new();
                function.body.free_variables(&mut body);
                for param in &function.params {
                    body.remove(param);
                }
                into.extend(body);
            }
            Syntax::Call(call) => {
                call.function.free_variables(into);
                for argument in &call.arguments {
                    argument.free_variables(into);
                }
            }
            Syntax::Binary(binary) => {
                binary.lhs.free_variables(into);
                binary.rhs.free_variables(into);
            }
            Syntax::Negate(negate) => negate.value.free_variables(into),
            Syntax::Index(index) => {
                index.value.free_variables(into);
                index.index.free_variables(into);
            }
            Syntax::Error(_) => {}
        }
    }
}

impl Evaluatable for Syntax {
    fn evaluate<V: AbstractValue>(
        &self,
        term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        match self {
            Syntax::Empty => Ok(vec![(V::unit(), world)]),
            Syntax::Null => Ok(vec![(V::null(), world)]),
            Syntax::Boolean(boolean) => boolean.evaluate(term, evaluator, world),
            Syntax::Integer(integer) => integer.evaluate(term, evaluator, world),
            Syntax::Float(float) => float.evaluate(term, evaluator, world),
            Syntax::Text(text) => text.evaluate(term, evaluator, world),
            Syntax::Identifier(identifier) => identifier.evaluate(term, evaluator, world),
            Syntax::Assign(assign) => assign.evaluate(term, evaluator, world),
            Syntax::Statements(statements) => statements.evaluate(term, evaluator, world),
            Syntax::If(if_) => if_.evaluate(term, evaluator, world),
            Syntax::While(while_) => while_.evaluate(term, evaluator, world),
            Syntax::DoWhile(do_while) => do_while.evaluate(term, evaluator, world),
            Syntax::ForLoop(for_loop) => for_loop.evaluate(term, evaluator, world),
            Syntax::Return(return_) => return_.evaluate(term, evaluator, world),
            Syntax::Function(function) => function.evaluate(term, evaluator, world),
            Syntax::Call(call) => call.evaluate(term, evaluator, world),
            Syntax::Binary(binary) => binary.evaluate(term, evaluator, world),
            Syntax::Negate(negate) => negate.evaluate(term, evaluator, world),
            Syntax::Index(index) => index.evaluate(term, evaluator, world),
            Syntax::Error(error) => error.evaluate(term, evaluator, world),
        }
    }
}

/// A boolean literal.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Boolean {
    pub value: bool,
}

impl Evaluatable for Boolean {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        _evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        Ok(vec![(V::boolean(self.value), world)])
    }
}

/// An integer literal, kept as raw source text until evaluation; malformed text is a resumable
/// format error.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Integer {
    pub text: String,
}

impl Evaluatable for Integer {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        _evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let value = self
            .text
            .parse::<i64>()
            .map_err(|_| EvalError::InvalidNumber(self.text.clone()))?;
        Ok(vec![(V::integer(value), world)])
    }
}

/// A floating-point literal, kept as raw source text until evaluation.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Float {
    pub text: String,
}

impl Evaluatable for Float {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        _evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let value = self
            .text
            .parse::<f64>()
            .map_err(|_| EvalError::InvalidNumber(self.text.clone()))?;
        Ok(vec![(V::float(value), world)])
    }
}

/// A string literal.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Text {
    pub text: String,
}

impl Evaluatable for Text {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        _evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        Ok(vec![(V::string(self.text.clone()), world)])
    }
}

/// A variable reference.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Identifier {
    pub name: crate::Identifier,
}

impl Evaluatable for Identifier {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.variable(&self.name, world)
    }
}

/// `name = value`.  Binds the name in the innermost scope if it is not already bound; the new
/// value joins any existing values at the address.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Assign {
    pub name: crate::Identifier,
    pub value: Box<Term>,
}

impl Evaluatable for Assign {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut results = Vec::new();
        for (value, mut world) in evaluator.evaluate(&self.value, world)? {
            let address = match world.environment.lookup(&self.name) {
                Some(address) => address.clone(),
                None => {
                    let address = evaluator.allocate(&mut world, &self.name);
                    world.environment.bind(self.name.clone(), address.clone());
                    address
                }
            };
            world.heap.put(address, value.clone());
            results.push((value, world));
        }
        Ok(results)
    }
}

/// A sequence of statements; yields the last statement's value, or unit when empty.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Statements {
    pub statements: Vec<Term>,
}

impl Evaluatable for Statements {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut states = vec![(V::unit(), world)];
        for statement in &self.statements {
            let mut next = Vec::new();
            for (_, world) in states {
                next.extend(evaluator.evaluate(statement, world)?);
            }
            states = next;
        }
        Ok(states)
    }
}

/// `if condition { consequence } else { alternative }`.  An abstract condition explores both
/// branches.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct If {
    pub condition: Box<Term>,
    pub consequence: Box<Term>,
    pub alternative: Box<Term>,
}

impl Evaluatable for If {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.if_then_else(
            &self.condition,
            world,
            |evaluator, world| evaluator.evaluate(&self.consequence, world),
            |evaluator, world| evaluator.evaluate(&self.alternative, world),
        )
    }
}

/// `while condition { body }`.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct While {
    pub condition: Box<Term>,
    pub body: Box<Term>,
}

impl Evaluatable for While {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.while_(&self.condition, &self.body, world)
    }
}

/// `do { body } while condition`.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct DoWhile {
    pub body: Box<Term>,
    pub condition: Box<Term>,
}

impl Evaluatable for DoWhile {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.do_while(&self.body, &self.condition, world)
    }
}

/// `for (initial; condition; update) { body }`.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ForLoop {
    pub initial: Box<Term>,
    pub condition: Box<Term>,
    pub update: Box<Term>,
    pub body: Box<Term>,
}

impl Evaluatable for ForLoop {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.for_loop(
            &self.initial,
            &self.condition,
            &self.update,
            &self.body,
            world,
        )
    }
}

/// `return value`.  Function bodies yield their last value, so `return` is a pass-through for
/// its operand.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Return {
    pub value: Box<Term>,
}

impl Evaluatable for Return {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        evaluator.evaluate(&self.value, world)
    }
}

/// A function abstraction.  The closure snapshots the current environment filtered to the body's
/// free variables; a named function is also bound in the current scope, and its own name is part
/// of the capture, so that it can recurse.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Function {
    pub name: Option<crate::Identifier>,
    pub params: Vec<crate::Identifier>,
    pub body: Box<Term>,
}

impl Evaluatable for Function {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut world = world;
        let mut free = BTreeSet::new();
        self.body.free_variables(&mut free);
        for param in &self.params {
            free.remove(param);
        }
        let address = match &self.name {
            Some(name) => {
                free.insert(name.clone());
                let address = evaluator.allocate(&mut world, name);
                world.environment.bind(name.clone(), address.clone());
                Some(address)
            }
            None => None,
        };
        let environment = world.environment.capture(&free);
        let closure = V::closure(Closure {
            params: self.params.clone(),
            environment,
            body: (*self.body).clone(),
        });
        if let Some(address) = address {
            world.heap.put(address, closure.clone());
        }
        Ok(vec![(closure, world)])
    }
}

/// A function call.  Arguments are evaluated eagerly, left to right; languages with non-strict
/// argument passing must assign their call sites to something other than this variant.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Call {
    pub function: Box<Term>,
    pub arguments: Vec<Term>,
}

impl Evaluatable for Call {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut results = Vec::new();
        for (function, world) in evaluator.evaluate(&self.function, world)? {
            for (arguments, world) in evaluator.evaluate_all(&self.arguments, world)? {
                results.extend(evaluator.call(&function, arguments, world)?);
            }
        }
        Ok(results)
    }
}

/// The operator of a [`Binary`][] term.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum BinaryOp {
    Arith(ArithOp),
    Compare(CompareOp),
    Bit(BitOp),
}

/// A binary operator application, lifted over abstract values.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Binary {
    pub op: BinaryOp,
    pub lhs: Box<Term>,
    pub rhs: Box<Term>,
}

impl Evaluatable for Binary {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut results = Vec::new();
        for (lhs, world) in evaluator.evaluate(&self.lhs, world)? {
            for (rhs, world) in evaluator.evaluate(&self.rhs, world.clone())? {
                let value = match self.op {
                    BinaryOp::Arith(op) => lhs.numeric2(op, &rhs)?,
                    BinaryOp::Compare(op) => lhs.compare(op, &rhs)?,
                    BinaryOp::Bit(op) => lhs.bitwise2(op, &rhs)?,
                };
                results.push((value, world));
            }
        }
        Ok(results)
    }
}

/// Arithmetic negation.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Negate {
    pub value: Box<Term>,
}

impl Evaluatable for Negate {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut results = Vec::new();
        for (value, world) in evaluator.evaluate(&self.value, world)? {
            results.push((value.negate()?, world));
        }
        Ok(results)
    }
}

/// Member access: `value[index]`.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Index {
    pub value: Box<Term>,
    pub index: Box<Term>,
}

impl Evaluatable for Index {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        let mut results = Vec::new();
        for (value, world) in evaluator.evaluate(&self.value, world)? {
            for (index, world) in evaluator.evaluate(&self.index, world.clone())? {
                results.push((value.index(&index)?, world));
            }
        }
        Ok(results)
    }
}

/// A term recording an assignment failure, so that the rest of a file can still be assigned and
/// evaluated around it.  Evaluates to null.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Error {
    pub message: String,
}

impl Evaluatable for Error {
    fn evaluate<V: AbstractValue>(
        &self,
        _term: &Term,
        _evaluator: &mut Evaluator<V>,
        world: World<V>,
    ) -> EvalResult<V> {
        Ok(vec![(V::null(), world)])
    }
}

impl From<Boolean> for Syntax {
    fn from(value: Boolean) -> Syntax {
        Syntax::Boolean(value)
    }
}

impl From<Integer> for Syntax {
    fn from(value: Integer) -> Syntax {
        Syntax::Integer(value)
    }
}

impl From<Float> for Syntax {
    fn from(value: Float) -> Syntax {
        Syntax::Float(value)
    }
}

impl From<Text> for Syntax {
    fn from(value: Text) -> Syntax {
        Syntax::Text(value)
    }
}

impl From<Identifier> for Syntax {
    fn from(value: Identifier) -> Syntax {
        Syntax::Identifier(value)
    }
}

impl From<Assign> for Syntax {
    fn from(value: Assign) -> Syntax {
        Syntax::Assign(value)
    }
}

impl From<Statements> for Syntax {
    fn from(value: Statements) -> Syntax {
        Syntax::Statements(value)
    }
}

impl From<If> for Syntax {
    fn from(value: If) -> Syntax {
        Syntax::If(value)
    }
}

impl From<While> for Syntax {
    fn from(value: While) -> Syntax {
        Syntax::While(value)
    }
}

impl From<DoWhile> for Syntax {
    fn from(value: DoWhile) -> Syntax {
        Syntax::DoWhile(value)
    }
}

impl From<ForLoop> for Syntax {
    fn from(value: ForLoop) -> Syntax {
        Syntax::ForLoop(value)
    }
}

impl From<Return> for Syntax {
    fn from(value: Return) -> Syntax {
        Syntax::Return(value)
    }
}

impl From<Function> for Syntax {
    fn from(value: Function) -> Syntax {
        Syntax::Function(value)
    }
}

impl From<Call> for Syntax {
    fn from(value: Call) -> Syntax {
        Syntax::Call(value)
    }
}

impl From<Binary> for Syntax {
    fn from(value: Binary) -> Syntax {
        Syntax::Binary(value)
    }
}

impl From<Negate> for Syntax {
    fn from(value: Negate) -> Syntax {
        Syntax::Negate(value)
    }
}

impl From<Index> for Syntax {
    fn from(value: Index) -> Syntax {
        Syntax::Index(value)
    }
}

impl From<Error> for Syntax {
    fn from(value: Error) -> Syntax {
        Syntax::Error(value)
    }
}
