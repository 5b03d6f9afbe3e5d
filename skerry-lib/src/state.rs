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

//! Store states and outcome predicates. A [State] maps locations to
//! constants and serves both as a test's initial store and as the
//! derived final store of a concrete execution. Locations absent from
//! a state read as zero, the usual litmus convention.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::FromIterator;

use crate::event::Location;
use crate::value::Cst;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State<C: Cst> {
    env: BTreeMap<Location<C>, C>,
}

impl<C: Cst> State<C> {
    pub fn new() -> Self {
        State { env: BTreeMap::new() }
    }

    pub fn bind(&mut self, loc: Location<C>, value: C) {
        self.env.insert(loc.normalize(), value);
    }

    pub fn read(&self, loc: &Location<C>) -> C {
        match self.env.get(&loc.normalize()) {
            Some(value) => *value,
            None => C::zero(),
        }
    }

    pub fn contains(&self, loc: &Location<C>) -> bool {
        self.env.contains_key(&loc.normalize())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Location<C>, C)> {
        self.env.iter().map(|(loc, value)| (loc, *value))
    }
}

impl<C: Cst> FromIterator<(Location<C>, C)> for State<C> {
    fn from_iter<I: IntoIterator<Item = (Location<C>, C)>>(iter: I) -> Self {
        let mut state = State::new();
        for (loc, value) in iter {
            state.bind(loc, value)
        }
        state
    }
}

impl<C: Cst> fmt::Display for State<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (loc, value)) in self.env.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?
            }
            write!(f, "{}={}", loc, value)?
        }
        write!(f, "}}")
    }
}

/// The predicate language of test outcome clauses and filters.
#[derive(Clone, Debug)]
pub enum Prop<C> {
    True,
    Eq(Location<C>, C),
    Not(Box<Prop<C>>),
    And(Vec<Prop<C>>),
    Or(Vec<Prop<C>>),
}

impl<C: Cst> Prop<C> {
    pub fn eval(&self, state: &State<C>) -> bool {
        match self {
            Prop::True => true,
            Prop::Eq(loc, value) => state.read(loc) == *value,
            Prop::Not(p) => !p.eval(state),
            Prop::And(ps) => ps.iter().all(|p| p.eval(state)),
            Prop::Or(ps) => ps.iter().any(|p| p.eval(state)),
        }
    }

    fn collect_locations(&self, locs: &mut BTreeSet<Location<C>>) {
        match self {
            Prop::True => (),
            Prop::Eq(loc, _) => {
                locs.insert(loc.normalize());
            }
            Prop::Not(p) => p.collect_locations(locs),
            Prop::And(ps) | Prop::Or(ps) => {
                for p in ps {
                    p.collect_locations(locs)
                }
            }
        }
    }

    pub fn locations(&self) -> BTreeSet<Location<C>> {
        let mut locs = BTreeSet::new();
        self.collect_locations(&mut locs);
        locs
    }
}

/// A test's observation clause.
#[derive(Clone, Debug)]
pub enum Cond<C> {
    Exists(Prop<C>),
    NotExists(Prop<C>),
    Forall(Prop<C>),
}

impl<C: Cst> Cond<C> {
    pub fn prop(&self) -> &Prop<C> {
        match self {
            Cond::Exists(p) | Cond::NotExists(p) | Cond::Forall(p) => p,
        }
    }

    pub fn locations(&self) -> BTreeSet<Location<C>> {
        self.prop().locations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::Symtab;
    use crate::value::C64;

    #[test]
    fn test_unbound_locations_read_zero() {
        let mut symtab = Symtab::new();
        let x = Location::<C64>::global(symtab.intern("x"));
        let state = State::new();
        assert_eq!(state.read(&x), C64::num(0))
    }

    #[test]
    fn test_prop_eval() {
        let mut symtab = Symtab::new();
        let x = Location::<C64>::global(symtab.intern("x"));
        let r0 = Location::<C64>::Register(0, symtab.intern("r0"));
        let mut state = State::new();
        state.bind(x.clone(), C64::num(1));

        let p = Prop::And(vec![Prop::Eq(x.clone(), C64::num(1)), Prop::Eq(r0.clone(), C64::num(0))]);
        assert!(p.eval(&state));

        let q = Prop::Not(Box::new(Prop::Eq(x.clone(), C64::num(1))));
        assert!(!q.eval(&state));

        assert_eq!(p.locations().len(), 2)
    }
}
