// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the abstract value contract, and two representations that satisfy it
//!
//! The evaluator core never commits to a particular runtime value representation.  Instead it is
//! generic over [`AbstractValue`][], which declares the construction and elimination forms any
//! representation must support.  This module provides [`Value`][], which keeps integers precise,
//! and [`Widened`][], which collapses every integer into a single "any integer" element.  Only
//! `Widened` (together with [`Allocator::Monovariant`][]) gives the finite lattice that the
//! convergence loop's termination argument relies on; `Value` is safe only for programs whose
//! integer state space is itself finite.
//!
//! [`Allocator::Monovariant`]: ../store/enum.Allocator.html

use std::fmt;

use smallvec::SmallVec;

use crate::eval::error::EvalError;
use crate::eval::store::Environment;
use crate::syntax::Term;
use crate::Identifier;

/// A lexical closure: parameter names, the captured environment (already filtered to the
/// function's free variables), and the body term.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Closure {
    pub params: Vec<Identifier>,
    pub environment: Environment,
    pub body: Term,
}

/// A binary arithmetic operator, lifted over abstract values.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// A binary comparison operator, lifted over abstract values.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// A binary bitwise operator, lifted over abstract values.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// The capability contract between the evaluator core and a runtime value representation.
///
/// The `Ord` bound is what lets values participate in the powerset heap and in cached result
/// sets.
pub trait AbstractValue: Clone + Ord + fmt::Debug {
    fn unit() -> Self;
    fn null() -> Self;
    fn boolean(value: bool) -> Self;
    fn integer(value: i64) -> Self;
    fn float(value: f64) -> Self;
    fn rational(numerator: i64, denominator: i64) -> Self;
    fn string(value: String) -> Self;
    fn tuple(items: Vec<Self>) -> Self;
    fn array(items: Vec<Self>) -> Self;
    fn hash(pairs: Vec<(Self, Self)>) -> Self;
    fn closure(closure: Closure) -> Self;
    fn namespace(name: Identifier, environment: Environment) -> Self;
    fn klass(name: Identifier, supers: Vec<Self>, environment: Environment) -> Self;

    /// The truth values this value can take.  An abstract boolean yields both.
    fn truthy(&self) -> Result<SmallVec<[bool; 2]>, EvalError>;
    fn as_closure(&self) -> Result<&Closure, EvalError>;
    /// The environment this value carries, if it is a namespace, class, or closure.
    fn scoped_environment(&self) -> Option<&Environment>;
    fn index(&self, index: &Self) -> Result<Self, EvalError>;
    fn negate(&self) -> Result<Self, EvalError>;
    fn numeric2(&self, op: ArithOp, other: &Self) -> Result<Self, EvalError>;
    fn compare(&self, op: CompareOp, other: &Self) -> Result<Self, EvalError>;
    fn bitwise2(&self, op: BitOp, other: &Self) -> Result<Self, EvalError>;
}

/// Floating-point payloads are stored as their bit patterns, so that values are totally ordered.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct FloatBits(u64);

impl FloatBits {
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for FloatBits {
    fn from(value: f64) -> FloatBits {
        FloatBits(value.to_bits())
    }
}

/// The default value representation.  Integers and booleans are precise, with `AnyInteger` and
/// `AnyBoolean` as the top elements that abstract operations can produce.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Unit,
    Null,
    Boolean(bool),
    /// Any boolean at all; conditionals branch both ways on it.
    AnyBoolean,
    Integer(i64),
    /// Any integer at all.
    AnyInteger,
    Float(FloatBits),
    /// A rational, kept as a reduced numerator/denominator pair with a positive denominator.
    Rational(i64, i64),
    String(String),
    Tuple(Vec<Value>),
    Array(Vec<Value>),
    Hash(Vec<(Value, Value)>),
    Closure(Closure),
    Namespace {
        name: Identifier,
        environment: Environment,
    },
    Class {
        name: Identifier,
        supers: Vec<Value>,
        environment: Environment,
    },
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Null => "null",
            Value::Boolean(_) | Value::AnyBoolean => "a boolean",
            Value::Integer(_) | Value::AnyInteger => "an integer",
            Value::Float(_) => "a float",
            Value::Rational(..) => "a rational",
            Value::String(_) => "a string",
            Value::Tuple(_) => "a tuple",
            Value::Array(_) => "an array",
            Value::Hash(_) => "a hash",
            Value::Closure(_) => "a closure",
            Value::Namespace { .. } => "a namespace",
            Value::Class { .. } => "a class",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(bits) => Some(bits.value()),
            Value::Rational(numerator, denominator) => {
                Some(*numerator as f64 / *denominator as f64)
            }
            _ => None,
        }
    }
}

impl AbstractValue for Value {
    fn unit() -> Value {
        Value::Unit
    }

    fn null() -> Value {
        Value::Null
    }

    fn boolean(value: bool) -> Value {
        Value::Boolean(value)
    }

    fn integer(value: i64) -> Value {
        Value::Integer(value)
    }

    fn float(value: f64) -> Value {
        Value::Float(value.into())
    }

    fn rational(numerator: i64, denominator: i64) -> Value {
        if denominator == 0 {
            return Value::Rational(numerator, 0);
        }
        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i64;
        let sign = denominator.signum();
        Value::Rational(sign * (numerator / divisor), sign * (denominator / divisor))
    }

    fn string(value: String) -> Value {
        Value::String(value)
    }

    fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(items)
    }

    fn array(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    fn hash(pairs: Vec<(Value, Value)>) -> Value {
        Value::Hash(pairs)
    }

    fn closure(closure: Closure) -> Value {
        Value::Closure(closure)
    }

    fn namespace(name: Identifier, environment: Environment) -> Value {
        Value::Namespace { name, environment }
    }

    fn klass(name: Identifier, supers: Vec<Value>, environment: Environment) -> Value {
        Value::Class {
            name,
            supers,
            environment,
        }
    }

    fn truthy(&self) -> Result<SmallVec<[bool; 2]>, EvalError> {
        match self {
            Value::Boolean(value) => Ok(SmallVec::from_slice(&[*value])),
            Value::AnyBoolean => Ok(SmallVec::from_slice(&[true, false])),
            other => Err(EvalError::ExpectedBoolean(other.type_name().to_string())),
        }
    }

    fn as_closure(&self) -> Result<&Closure, EvalError> {
        match self {
            Value::Closure(closure) => Ok(closure),
            other => Err(EvalError::ExpectedClosure(other.type_name().to_string())),
        }
    }

    fn scoped_environment(&self) -> Option<&Environment> {
        match self {
            Value::Closure(closure) => Some(&closure.environment),
            Value::Namespace { environment, .. } => Some(environment),
            Value::Class { environment, .. } => Some(environment),
            _ => None,
        }
    }

    fn index(&self, index: &Value) -> Result<Value, EvalError> {
        match self {
            Value::Array(items) | Value::Tuple(items) => match index {
                Value::Integer(i) => items
                    .get(*i as usize)
                    .cloned()
                    .ok_or_else(|| EvalError::IndexOutOfBounds(format!("{}", i))),
                other => Err(EvalError::ExpectedNumber(other.type_name().to_string())),
            },
            Value::Hash(pairs) => pairs
                .iter()
                .find(|(key, _)| key == index)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| EvalError::IndexOutOfBounds(format!("{:?}", index))),
            other => Err(EvalError::ExpectedIndexable(other.type_name().to_string())),
        }
    }

    fn negate(&self) -> Result<Value, EvalError> {
        match self {
            Value::Integer(value) => Ok(Value::Integer(value.wrapping_neg())),
            Value::AnyInteger => Ok(Value::AnyInteger),
            Value::Float(bits) => Ok(Value::Float((-bits.value()).into())),
            Value::Rational(numerator, denominator) => {
                Ok(Value::Rational(numerator.wrapping_neg(), *denominator))
            }
            other => Err(EvalError::ExpectedNumber(other.type_name().to_string())),
        }
    }

    fn numeric2(&self, op: ArithOp, other: &Value) -> Result<Value, EvalError> {
        use Value::*;
        match (self, other) {
            (Integer(a), Integer(b)) => {
                let result = match op {
                    ArithOp::Add => a.wrapping_add(*b),
                    ArithOp::Sub => a.wrapping_sub(*b),
                    ArithOp::Mul => a.wrapping_mul(*b),
                    ArithOp::Div => a
                        .checked_div(*b)
                        .ok_or(EvalError::DivisionByZero)?,
                    ArithOp::Mod => a
                        .checked_rem(*b)
                        .ok_or(EvalError::DivisionByZero)?,
                };
                Ok(Integer(result))
            }
            (AnyInteger, Integer(_)) | (Integer(_), AnyInteger) | (AnyInteger, AnyInteger) => {
                Ok(AnyInteger)
            }
            _ => {
                let a = self
                    .as_f64()
                    .ok_or_else(|| EvalError::ExpectedNumber(self.type_name().to_string()))?;
                let b = other
                    .as_f64()
                    .ok_or_else(|| EvalError::ExpectedNumber(other.type_name().to_string()))?;
                let result = match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                    ArithOp::Mod => a % b,
                };
                Ok(Value::float(result))
            }
        }
    }

    fn compare(&self, op: CompareOp, other: &Value) -> Result<Value, EvalError> {
        use Value::*;
        if matches!(self, AnyInteger | AnyBoolean) || matches!(other, AnyInteger | AnyBoolean) {
            return Ok(AnyBoolean);
        }
        match op {
            CompareOp::Eq => Ok(Boolean(self == other)),
            CompareOp::Ne => Ok(Boolean(self != other)),
            _ => {
                let ordering = match (self, other) {
                    (String(a), String(b)) => a.cmp(b),
                    _ => {
                        let a = self.as_f64().ok_or_else(|| {
                            EvalError::ExpectedNumber(self.type_name().to_string())
                        })?;
                        let b = other.as_f64().ok_or_else(|| {
                            EvalError::ExpectedNumber(other.type_name().to_string())
                        })?;
                        a.partial_cmp(&b)
                            .unwrap_or(std::cmp::Ordering::Greater)
                    }
                };
                let result = match op {
                    CompareOp::Lt => ordering.is_lt(),
                    CompareOp::Le => ordering.is_le(),
                    CompareOp::Gt => ordering.is_gt(),
                    CompareOp::Ge => ordering.is_ge(),
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                };
                Ok(Boolean(result))
            }
        }
    }

    fn bitwise2(&self, op: BitOp, other: &Value) -> Result<Value, EvalError> {
        use Value::*;
        match (self, other) {
            (Integer(a), Integer(b)) => {
                let result = match op {
                    BitOp::And => a & b,
                    BitOp::Or => a | b,
                    BitOp::Xor => a ^ b,
                    BitOp::Shl => a.wrapping_shl(*b as u32),
                    BitOp::Shr => a.wrapping_shr(*b as u32),
                };
                Ok(Integer(result))
            }
            (AnyInteger, Integer(_)) | (Integer(_), AnyInteger) | (AnyInteger, AnyInteger) => {
                Ok(AnyInteger)
            }
            _ => Err(EvalError::ExpectedNumber(
                if self.as_f64().is_some() {
                    other.type_name().to_string()
                } else {
                    self.type_name().to_string()
                },
            )),
        }
    }
}

/// A value representation whose integers are all merged into [`Value::AnyInteger`][].
///
/// With finitely many names and string literals in a program, the set of `Widened` values the
/// program can produce is finite, so the caching evaluator's convergence loop is guaranteed to
/// terminate.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Widened(pub Value);

fn widen(value: Value) -> Value {
    match value {
        Value::Integer(_) => Value::AnyInteger,
        Value::Float(_) => Value::AnyInteger,
        Value::Rational(..) => Value::AnyInteger,
        other => other,
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl AbstractValue for Widened {
    fn unit() -> Widened {
        Widened(Value::Unit)
    }

    fn null() -> Widened {
        Widened(Value::Null)
    }

    fn boolean(value: bool) -> Widened {
        Widened(Value::Boolean(value))
    }

    fn integer(_: i64) -> Widened {
        Widened(Value::AnyInteger)
    }

    fn float(_: f64) -> Widened {
        Widened(Value::AnyInteger)
    }

    fn rational(_: i64, _: i64) -> Widened {
        Widened(Value::AnyInteger)
    }

    fn string(value: String) -> Widened {
        Widened(Value::String(value))
    }

    fn tuple(items: Vec<Widened>) -> Widened {
        Widened(Value::Tuple(items.into_iter().map(|item| item.0).collect()))
    }

    fn array(items: Vec<Widened>) -> Widened {
        Widened(Value::Array(items.into_iter().map(|item| item.0).collect()))
    }

    fn hash(pairs: Vec<(Widened, Widened)>) -> Widened {
        Widened(Value::Hash(
            pairs.into_iter().map(|(k, v)| (k.0, v.0)).collect(),
        ))
    }

    fn closure(closure: Closure) -> Widened {
        Widened(Value::Closure(closure))
    }

    fn namespace(name: Identifier, environment: Environment) -> Widened {
        Widened(Value::Namespace { name, environment })
    }

    fn klass(name: Identifier, supers: Vec<Widened>, environment: Environment) -> Widened {
        Widened(Value::Class {
            name,
            supers: supers.into_iter().map(|s| s.0).collect(),
            environment,
        })
    }

    fn truthy(&self) -> Result<SmallVec<[bool; 2]>, EvalError> {
        self.0.truthy()
    }

    fn as_closure(&self) -> Result<&Closure, EvalError> {
        self.0.as_closure()
    }

    fn scoped_environment(&self) -> Option<&Environment> {
        self.0.scoped_environment()
    }

    fn index(&self, index: &Widened) -> Result<Widened, EvalError> {
        self.0.index(&index.0).map(widen).map(Widened)
    }

    fn negate(&self) -> Result<Widened, EvalError> {
        self.0.negate().map(widen).map(Widened)
    }

    fn numeric2(&self, op: ArithOp, other: &Widened) -> Result<Widened, EvalError> {
        self.0.numeric2(op, &other.0).map(widen).map(Widened)
    }

    fn compare(&self, op: CompareOp, other: &Widened) -> Result<Widened, EvalError> {
        self.0.compare(op, &other.0).map(Widened)
    }

    fn bitwise2(&self, op: BitOp, other: &Widened) -> Result<Widened, EvalError> {
        self.0.bitwise2(op, &other.0).map(widen).map(Widened)
    }
}
