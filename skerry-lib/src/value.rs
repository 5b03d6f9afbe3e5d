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

//! Symbolic values. A value in an abstract event structure is either
//! a concrete constant or a named variable that the constraint solver
//! will (hopefully) determine later. The enumerator is generic over
//! the constant type via the [Cst] trait, with [C64] as the provided
//! implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::symtab::Name;

/// A symbolic variable identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sym {
    id: u32,
}

impl Sym {
    pub fn from_u32(id: u32) -> Self {
        Sym { id }
    }

    pub fn to_u32(self) -> u32 {
        self.id
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.id)
    }
}

/// A generator for fresh symbolic variables. One generator is
/// threaded through the whole symbolic execution of a test, so
/// variables are unique across threads and candidate branches.
#[derive(Clone, Debug, Default)]
pub struct SymGen {
    next: u32,
}

impl SymGen {
    pub fn new() -> Self {
        SymGen { next: 0 }
    }

    pub fn fresh(&mut self) -> Sym {
        let v = Sym::from_u32(self.next);
        self.next += 1;
        v
    }
}

/// The operations the enumerator requires of its concrete constants.
pub trait Cst: Copy + Clone + fmt::Debug + fmt::Display + PartialEq + Eq + Hash + PartialOrd + Ord + Send + Sync {
    fn num(i: i64) -> Self;

    fn as_num(self) -> Option<i64>;

    /// A symbolic address constant, i.e. the location named `x` in a
    /// litmus test before address allocation.
    fn addr(name: Name) -> Self;

    fn as_addr(self) -> Option<Name>;

    fn zero() -> Self {
        Self::num(0)
    }

    fn one() -> Self {
        Self::num(1)
    }

    /// Truthiness for branch guards: any constant other than the
    /// number zero is taken to be true.
    fn is_zero(self) -> bool {
        self.as_num() == Some(0)
    }
}

/// A constant that is either a signed 64-bit integer or a named
/// address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum C64 {
    Num(i64),
    Addr(Name),
}

impl Cst for C64 {
    fn num(i: i64) -> Self {
        C64::Num(i)
    }

    fn as_num(self) -> Option<i64> {
        match self {
            C64::Num(i) => Some(i),
            C64::Addr(_) => None,
        }
    }

    fn addr(name: Name) -> Self {
        C64::Addr(name)
    }

    fn as_addr(self) -> Option<Name> {
        match self {
            C64::Num(_) => None,
            C64::Addr(name) => Some(name),
        }
    }
}

impl fmt::Display for C64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            C64::Num(i) => write!(f, "{}", i),
            C64::Addr(name) => write!(f, "&{}", name),
        }
    }
}

/// Either a concrete constant or a symbolic variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Val<C> {
    Var(Sym),
    Cst(C),
}

impl<C: Cst> Val<C> {
    pub fn is_determined(&self) -> bool {
        matches!(self, Val::Cst(_))
    }

    pub fn as_cst(&self) -> Option<C> {
        match self {
            Val::Var(_) => None,
            Val::Cst(c) => Some(*c),
        }
    }

    pub fn as_var(&self) -> Option<Sym> {
        match self {
            Val::Var(v) => Some(*v),
            Val::Cst(_) => None,
        }
    }

    pub fn subst(&self, sigma: &Substitution<C>) -> Val<C> {
        match self {
            Val::Var(v) => sigma.apply(*v),
            Val::Cst(c) => Val::Cst(*c),
        }
    }
}

impl<C: Cst> fmt::Display for Val<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Val::Var(v) => write!(f, "{}", v),
            Val::Cst(c) => write!(f, "{}", c),
        }
    }
}

/// A mapping from solved variables to values, produced by the
/// constraint solver. The empty substitution is the identity.
#[derive(Clone, Debug, Default)]
pub struct Substitution<C> {
    map: BTreeMap<Sym, Val<C>>,
}

impl<C: Cst> Substitution<C> {
    pub fn new() -> Self {
        Substitution { map: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bind a variable. The variable must not already be bound; the
    /// solver binds each variable at most once.
    pub fn bind(&mut self, v: Sym, val: Val<C>) {
        let prev = self.map.insert(v, val);
        assert!(prev.is_none(), "variable {} bound twice during solving", v)
    }

    pub fn get(&self, v: Sym) -> Option<&Val<C>> {
        self.map.get(&v)
    }

    /// Resolve a variable through the substitution, following
    /// variable-to-variable bindings. Bindings never form chains of
    /// any depth greater than the number of entries, so this
    /// terminates.
    pub fn apply(&self, v: Sym) -> Val<C> {
        let mut current = v;
        for _ in 0..=self.map.len() {
            match self.map.get(&current) {
                Some(Val::Var(next)) => current = *next,
                Some(Val::Cst(c)) => return Val::Cst(*c),
                None => return Val::Var(current),
            }
        }
        panic!("cyclic substitution at variable {}", v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sym, &Val<C>)> {
        self.map.iter().map(|(v, val)| (*v, val))
    }
}
