// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, tree-sitter authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the cursor abstraction over concrete syntax trees
//!
//! The assignment engine does not walk [tree-sitter][] trees directly.  Instead it works against
//! the [`SyntaxTree`][] and [`Grammar`][] traits, which project exactly the information the engine
//! needs: a node's grammar symbol, its byte range and span, and its ordered children.  This module
//! provides two implementations: [`Parsed`][], which wraps a real [`tree_sitter::Tree`][], and
//! [`OwnedTree`][], an in-memory tree that is useful in tests and for embedders that produce parse
//! results some other way.
//!
//! [tree-sitter]: https://docs.rs/tree-sitter/

use std::rc::Rc;

use crate::location::ByteRange;
use crate::location::Position;
use crate::location::Span;

/// A grammar symbol identifier.  Symbols are the dense small integers that the external parser
/// uses to label productions and tokens.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Symbol(pub u16);

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The classification of a grammar symbol.
///
/// Assignment dispatch tables index only `Regular` and `Anonymous` symbols; `Auxiliary` symbols
/// never appear in trees.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolKind {
    /// A named production.
    Regular,
    /// A token or piece of punctuation.
    Anonymous,
    /// A symbol that never appears in trees.
    Auxiliary,
}

/// Everything the assignment engine needs to know about one syntax node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeInfo {
    pub symbol: Symbol,
    pub byte_range: ByteRange,
    pub span: Span,
}

/// Symbol metadata for a grammar.
pub trait Grammar {
    fn symbol_kind(&self, symbol: Symbol) -> SymbolKind;
    fn symbol_name(&self, symbol: Symbol) -> &str;
}

/// A concrete syntax tree, as the assignment engine sees it.
///
/// Implementations must be pure projections: node identity is stable for the duration of one
/// assignment run, and `children` preserves source order, front to back.
pub trait SyntaxTree {
    type Node: Clone + PartialEq;

    fn root(&self) -> Self::Node;
    fn node_info(&self, node: &Self::Node) -> NodeInfo;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
}

//-----------------------------------------------------------------------------
// tree-sitter trees

/// A parsed [`tree_sitter::Tree`][], paired with its language so the engine can classify symbols.
pub struct Parsed<'tree> {
    tree: &'tree tree_sitter::Tree,
}

impl<'tree> Parsed<'tree> {
    pub fn new(tree: &'tree tree_sitter::Tree) -> Parsed<'tree> {
        Parsed { tree }
    }
}

impl<'tree> SyntaxTree for Parsed<'tree> {
    type Node = tree_sitter::Node<'tree>;

    fn root(&self) -> Self::Node {
        self.tree.root_node()
    }

    fn node_info(&self, node: &Self::Node) -> NodeInfo {
        let range = node.byte_range();
        let start = node.start_position();
        let end = node.end_position();
        NodeInfo {
            symbol: Symbol(node.kind_id()),
            byte_range: ByteRange::new(range.start, range.end),
            span: Span::new(
                Position::new(start.row, start.column),
                Position::new(end.row, end.column),
            ),
        }
    }

    fn children(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut cursor = node.walk();
        node.children(&mut cursor).collect()
    }
}

impl Grammar for tree_sitter::Language {
    fn symbol_kind(&self, symbol: Symbol) -> SymbolKind {
        if !self.node_kind_is_visible(symbol.0) {
            SymbolKind::Auxiliary
        } else if self.node_kind_is_named(symbol.0) {
            SymbolKind::Regular
        } else {
            SymbolKind::Anonymous
        }
    }

    fn symbol_name(&self, symbol: Symbol) -> &str {
        self.node_kind_for_id(symbol.0).unwrap_or("<unknown>")
    }
}

//-----------------------------------------------------------------------------
// Owned trees

/// A symbol table for an [`OwnedTree`][]'s grammar.
#[derive(Debug, Default)]
pub struct SymbolTable {
    kinds: Vec<SymbolKind>,
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Registers a symbol, returning its identifier.
    pub fn symbol(&mut self, name: &str, kind: SymbolKind) -> Symbol {
        let symbol = Symbol(self.names.len() as u16);
        self.names.push(name.to_string());
        self.kinds.push(kind);
        symbol
    }
}

impl Grammar for SymbolTable {
    fn symbol_kind(&self, symbol: Symbol) -> SymbolKind {
        self.kinds
            .get(symbol.0 as usize)
            .copied()
            .unwrap_or(SymbolKind::Auxiliary)
    }

    fn symbol_name(&self, symbol: Symbol) -> &str {
        self.names
            .get(symbol.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }
}

/// One node of an [`OwnedTree`][].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnedNode {
    pub info: NodeInfo,
    pub children: Vec<Rc<OwnedNode>>,
}

impl OwnedNode {
    /// A node covering `byte_range` of `source`, with its span computed from the text.
    pub fn new(
        symbol: Symbol,
        byte_range: ByteRange,
        source: &str,
        children: Vec<Rc<OwnedNode>>,
    ) -> Rc<OwnedNode> {
        let span = Span::covering(source, &byte_range);
        Rc::new(OwnedNode {
            info: NodeInfo {
                symbol,
                byte_range,
                span,
            },
            children,
        })
    }
}

/// An in-memory concrete syntax tree, independent of any external parser.
#[derive(Clone, Debug)]
pub struct OwnedTree {
    root: Rc<OwnedNode>,
}

impl OwnedTree {
    pub fn new(root: Rc<OwnedNode>) -> OwnedTree {
        OwnedTree { root }
    }
}

impl SyntaxTree for OwnedTree {
    type Node = Rc<OwnedNode>;

    fn root(&self) -> Self::Node {
        self.root.clone()
    }

    fn node_info(&self, node: &Self::Node) -> NodeInfo {
        node.info
    }

    fn children(&self, node: &Self::Node) -> Vec<Self::Node> {
        node.children.clone()
    }
}
