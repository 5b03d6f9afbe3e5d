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

//! The reads-from map of a candidate execution: every load (register
//! or memory) is mapped to the store it reads or to the initial
//! state, and every finalized location to its chosen final store.
//! Built incrementally, but each refinement is a fresh value.

use std::collections::BTreeMap;
use std::fmt;

use skerry_lib::event::{EventId, Location};
use skerry_lib::relation::Rel;
use skerry_lib::value::Cst;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RfKey<C: Cst> {
    Load(EventId),
    Final(Location<C>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RfSource {
    Init,
    Store(EventId),
}

#[derive(Clone, Debug, Default)]
pub struct RfMap<C: Cst> {
    map: BTreeMap<RfKey<C>, RfSource>,
}

impl<C: Cst> RfMap<C> {
    pub fn new() -> Self {
        RfMap { map: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: RfKey<C>, source: RfSource) {
        self.map.insert(key, source);
    }

    pub fn load(&self, load: EventId) -> Option<RfSource> {
        self.map.get(&RfKey::Load(load)).copied()
    }

    pub fn final_of(&self, loc: &Location<C>) -> Option<RfSource> {
        self.map.get(&RfKey::Final(loc.clone())).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RfKey<C>, RfSource)> {
        self.map.iter().map(|(key, source)| (key, *source))
    }

    pub fn loads(&self) -> impl Iterator<Item = (EventId, RfSource)> + '_ {
        self.map.iter().filter_map(|(key, source)| match key {
            RfKey::Load(load) => Some((*load, *source)),
            RfKey::Final(_) => None,
        })
    }

    pub fn finals(&self) -> impl Iterator<Item = (&Location<C>, RfSource)> {
        self.map.iter().filter_map(|(key, source)| match key {
            RfKey::Load(_) => None,
            RfKey::Final(loc) => Some((loc, *source)),
        })
    }

    /// The store-to-load edges, i.e. `(w, r)` for every load `r`
    /// mapped to a store `w`.
    pub fn store_edges(&self) -> Rel {
        self.loads()
            .filter_map(|(load, source)| match source {
                RfSource::Store(store) => Some((store, load)),
                RfSource::Init => None,
            })
            .collect()
    }
}

impl<C: Cst> fmt::Display for RfMap<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, source)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?
            }
            match key {
                RfKey::Load(load) => write!(f, "{}", load)?,
                RfKey::Final(loc) => write!(f, "final {}", loc)?,
            }
            match source {
                RfSource::Init => write!(f, " <- init")?,
                RfSource::Store(store) => write!(f, " <- {}", store)?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::value::C64;

    #[test]
    fn test_store_edges() {
        let mut rfmap = RfMap::<C64>::new();
        rfmap.insert(RfKey::Load(EventId::from_u32(1)), RfSource::Store(EventId::from_u32(0)));
        rfmap.insert(RfKey::Load(EventId::from_u32(2)), RfSource::Init);
        let edges = rfmap.store_edges();
        assert_eq!(edges.len(), 1);
        assert!(edges.contains(EventId::from_u32(0), EventId::from_u32(1)))
    }
}
