// BSD 2-Clause License
//
// Copyright (c) 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Binary relations over event identifiers. The edge set is ordered
//! so that every iteration over a relation is deterministic, which
//! the enumerator relies on for reproducible output.

use std::collections::BTreeSet;
use std::iter::FromIterator;

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;

use crate::event::EventId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rel {
    edges: BTreeSet<(EventId, EventId)>,
}

impl Rel {
    pub fn new() -> Self {
        Rel { edges: BTreeSet::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn insert(&mut self, from: EventId, to: EventId) {
        self.edges.insert((from, to));
    }

    pub fn contains(&self, from: EventId, to: EventId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventId, EventId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn union(&self, other: &Rel) -> Rel {
        Rel { edges: self.edges.union(&other.edges).copied().collect() }
    }

    pub fn extend(&mut self, other: &Rel) {
        for edge in &other.edges {
            self.edges.insert(*edge);
        }
    }

    pub fn restrict<F: Fn(EventId, EventId) -> bool>(&self, keep: F) -> Rel {
        Rel { edges: self.edges.iter().copied().filter(|(a, b)| keep(*a, *b)).collect() }
    }

    /// Rename every event identifier in the relation.
    pub fn rename<F: Fn(EventId) -> EventId>(&self, f: F) -> Rel {
        Rel { edges: self.edges.iter().map(|(a, b)| (f(*a), f(*b))).collect() }
    }

    pub fn is_acyclic(&self) -> bool {
        let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();
        for (a, b) in self.iter() {
            graph.add_edge(a.to_u32(), b.to_u32(), ());
        }
        !is_cyclic_directed(&graph)
    }

    /// The transitive closure. Event structures are litmus-test sized
    /// so a per-node depth-first walk is plenty.
    pub fn transitive_closure(&self) -> Rel {
        let mut succs: BTreeSet<EventId> = BTreeSet::new();
        for (a, b) in self.iter() {
            succs.insert(a);
            succs.insert(b);
        }

        let mut closed = Rel::new();
        for root in succs {
            let mut stack: Vec<EventId> = self.iter().filter(|(a, _)| *a == root).map(|(_, b)| b).collect();
            let mut seen: BTreeSet<EventId> = BTreeSet::new();
            while let Some(node) = stack.pop() {
                if seen.insert(node) {
                    closed.insert(root, node);
                    for (_, next) in self.iter().filter(|(a, _)| *a == node) {
                        stack.push(next)
                    }
                }
            }
        }
        closed
    }
}

impl FromIterator<(EventId, EventId)> for Rel {
    fn from_iter<I: IntoIterator<Item = (EventId, EventId)>>(iter: I) -> Self {
        Rel { edges: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: u32) -> EventId {
        EventId::from_u32(id)
    }

    #[test]
    fn test_acyclic() {
        let mut rel = Rel::new();
        rel.insert(ev(0), ev(1));
        rel.insert(ev(1), ev(2));
        assert!(rel.is_acyclic());
        rel.insert(ev(2), ev(0));
        assert!(!rel.is_acyclic());
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut rel = Rel::new();
        rel.insert(ev(3), ev(3));
        assert!(!rel.is_acyclic())
    }

    #[test]
    fn test_transitive_closure() {
        let mut rel = Rel::new();
        rel.insert(ev(0), ev(1));
        rel.insert(ev(1), ev(2));
        let closed = rel.transitive_closure();
        assert!(closed.contains(ev(0), ev(2)));
        assert!(closed.contains(ev(0), ev(1)));
        assert!(!closed.contains(ev(2), ev(0)));
        assert_eq!(closed.len(), 3)
    }
}
