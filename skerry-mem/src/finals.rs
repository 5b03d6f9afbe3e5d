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

//! Finalization: for each surviving reads-from choice, enumerate the
//! compatible final store per location, derive the relations a memory
//! model consumes, reject coherence cycles, and assemble the concrete
//! executions.

use std::collections::{BTreeMap, BTreeSet};

use skerry_lib::config::{Config, Speedcheck};
use skerry_lib::event::{EventId, EventStructure, Location};
use skerry_lib::log;
use skerry_lib::relation::Rel;
use skerry_lib::state::{Cond, State};
use skerry_lib::value::Cst;

use crate::litmus::Litmus;
use crate::product::Product;
use crate::rfmap::{RfKey, RfMap, RfSource};
use crate::semantics::Semantics;

/// A fully valued candidate execution: no symbolic variables remain,
/// the reads-from map covers every load and finalized location, and
/// the derived relations are ready for a model to evaluate.
#[derive(Clone, Debug)]
pub struct Concrete<C: Cst> {
    pub es: EventStructure<C>,
    pub rfmap: RfMap<C>,
    /// The derived final state: the initial state overridden by each
    /// location's chosen final store.
    pub fstate: State<C>,
    /// Program order extended with intra-instruction causality,
    /// transitively closed.
    pub po_iico: Rel,
    /// The po_iico pairs of memory events on the same location.
    pub ppoloc: Rel,
    /// Store-to-load reads-from edges.
    pub store_load_vbf: Rel,
    /// For each load reading the initial state, its edges to every
    /// store on the same location.
    pub init_load_vbf: Rel,
    /// Paired atomic accesses (load-reserve/store-conditional and
    /// friends).
    pub atomic_load_store: Rel,
    /// Edges from superseded stores and loads to each location's
    /// chosen final store.
    pub last_store_vbf: Rel,
    /// The preliminary coherence order; acyclic in every delivered
    /// execution.
    pub pco: Rel,
}

/// The uniproc contribution to the coherence order: program order
/// between same-location accesses constrains which stores may precede
/// which. `None` means the reads-from choice contradicts coherence
/// outright and the whole structure is dead.
fn uniproc_edges<C: Cst>(es: &EventStructure<C>, rfmap: &RfMap<C>, ppoloc: &Rel) -> Option<Rel> {
    let mut edges = Rel::new();

    let source_of = |load: EventId| match rfmap.load(load) {
        Some(source) => source,
        None => panic!("memory load {} missing from the reads-from map", load),
    };

    for (first, second) in ppoloc.iter() {
        let first_is_store = es.event(first).is_memory_write();
        let second_is_store = es.event(second).is_memory_write();

        match (first_is_store, second_is_store) {
            // Same-location stores in program order must be coherence
            // ordered the same way
            (true, true) => edges.insert(first, second),

            // A load after a store must read that store or a
            // coherence successor of it
            (true, false) => match source_of(second) {
                RfSource::Store(w) if w != first => edges.insert(first, w),
                RfSource::Store(_) => (),
                RfSource::Init => return None,
            },

            // A store after a load must be a coherence successor of
            // whatever the load read
            (false, true) => match source_of(first) {
                RfSource::Store(w) if w != second => edges.insert(w, second),
                RfSource::Store(_) | RfSource::Init => (),
            },

            // Two loads in program order: the store read first cannot
            // be a coherence successor of the store read second
            (false, false) => match (source_of(first), source_of(second)) {
                (RfSource::Store(w1), RfSource::Store(w2)) if w1 != w2 => edges.insert(w1, w2),
                (RfSource::Store(_), RfSource::Init) => return None,
                _ => (),
            },
        }
    }
    Some(edges)
}

fn worth_going<C: Cst, I>(litmus: &Litmus<C, I>, fstate: &State<C>) -> bool {
    match &litmus.cond {
        // Universal claims need every final state
        Cond::Forall(_) => true,
        Cond::Exists(prop) | Cond::NotExists(prop) => prop.eval(fstate),
    }
}

struct FinalGroup<C: Cst> {
    loc: Location<C>,
    /// Every store to the location.
    stores: Vec<EventId>,
    /// The stores that may be the final one.
    cands: Vec<EventId>,
}

/// Enumerate the final-store selections of one reads-from candidate,
/// delivering each coherent concrete execution to the continuation
/// and threading the accumulator through it.
pub fn fold_mem_finals<C, S, A, F>(
    litmus: &Litmus<C, S::Instr>,
    sem: &S,
    cfg: &Config,
    es: &EventStructure<C>,
    rfmap: &RfMap<C>,
    on_concrete: &mut F,
    mut acc: A,
) -> A
where
    C: Cst,
    S: Semantics<C>,
    F: FnMut(Concrete<C>, A) -> A,
{
    debug_assert!(es.is_concrete(), "symbolic variables remain at finalization");

    let order = es.po_iico().transitive_closure();

    let mut ppoloc = Rel::new();
    for e1 in es.memory_events() {
        for e2 in es.memory_events() {
            if order.contains(e1.id, e2.id) && e1.location().normalize() == e2.location().normalize() {
                ppoloc.insert(e1.id, e2.id)
            }
        }
    }

    let mut store_load_vbf = Rel::new();
    let mut init_load_vbf = Rel::new();
    for (load, source) in rfmap.loads() {
        if !es.event(load).is_memory_read() {
            continue;
        }
        match source {
            RfSource::Store(store) => store_load_vbf.insert(store, load),
            RfSource::Init => {
                let loc = es.event(load).location().normalize();
                for store in es.memory_events().filter(|w| w.is_memory_write()) {
                    if store.location().normalize() == loc {
                        init_load_vbf.insert(load, store.id)
                    }
                }
            }
        }
    }

    let mut atomic_load_store = Rel::new();
    for read in es.memory_events().filter(|ev| ev.is_memory_read() && ev.annots.is_atomic() && !ev.annots.is_rmw()) {
        for write in es.memory_events().filter(|ev| ev.is_memory_write() && ev.annots.is_atomic() && !ev.annots.is_rmw()) {
            if read.location().normalize() != write.location().normalize() || !order.contains(read.id, write.id) {
                continue;
            }
            let intervening = es.memory_events().any(|between| {
                between.id != read.id
                    && between.id != write.id
                    && between.annots.is_atomic()
                    && between.location().normalize() == read.location().normalize()
                    && order.contains(read.id, between.id)
                    && order.contains(between.id, write.id)
            });
            if !intervening && sem.atomic_pair_allowed(read, write) {
                atomic_load_store.insert(read.id, write.id)
            }
        }
    }

    // The selection-independent part of the coherence order: the
    // init-write seed and the uniproc derivation
    let mut pco_base = Rel::new();
    if cfg.initwrites {
        for init_write in es.memory_events().filter(|ev| ev.is_init()) {
            for store in es.memory_events().filter(|ev| ev.is_memory_write() && !ev.is_init()) {
                if init_write.location().normalize() == store.location().normalize() {
                    pco_base.insert(init_write.id, store.id)
                }
            }
        }
    }
    if cfg.optace {
        match uniproc_edges(es, rfmap, &ppoloc) {
            Some(edges) => pco_base.extend(&edges),
            None => {
                log!(log::FINAL, "reads-from contradicts coherence, skipping structure");
                return acc;
            }
        }
    }

    // Group the stores per location
    let mut stores_by_loc: BTreeMap<Location<C>, Vec<EventId>> = BTreeMap::new();
    for store in es.memory_events().filter(|ev| ev.is_memory_write()) {
        stores_by_loc.entry(store.location().normalize()).or_insert_with(Vec::new).push(store.id)
    }

    // Locations that are only ever loaded still get a final entry, so
    // the final state covers every location the test can observe
    let mut load_only: BTreeSet<Location<C>> = BTreeSet::new();
    for load in es.memory_events().filter(|ev| ev.is_memory_read()) {
        let loc = load.location().normalize();
        if !stores_by_loc.contains_key(&loc) {
            load_only.insert(loc);
        }
    }

    let observed = |loc: &Location<C>| !cfg.observed_finals_only || litmus.observed.contains(loc);

    let groups: Vec<FinalGroup<C>> = stores_by_loc
        .iter()
        .filter(|(loc, _)| observed(loc))
        .map(|(loc, stores)| {
            let cands = if cfg.optace {
                // Only stores that no other store to the location is
                // ordered after can be final
                stores.iter().copied().filter(|w| stores.iter().all(|w2| w2 == w || !order.contains(*w, *w2))).collect()
            } else {
                stores.clone()
            };
            FinalGroup { loc: loc.clone(), stores: stores.clone(), cands }
        })
        .collect();

    let dims: Vec<Vec<EventId>> = groups.iter().map(|group| group.cands.clone()).collect();
    log!(log::FINAL, &format!("{} final-store selection(s)", Product::new(&dims).total()));

    for selection in Product::new(&dims) {
        let mut rfmap = rfmap.clone();
        for (group, store) in groups.iter().zip(selection.iter()) {
            rfmap.insert(RfKey::Final(group.loc.clone()), RfSource::Store(**store))
        }
        for loc in load_only.iter().filter(|loc| observed(loc)) {
            rfmap.insert(RfKey::Final(loc.clone()), RfSource::Init)
        }

        if cfg!(debug_assertions) {
            for loc in &litmus.observed {
                if stores_by_loc.contains_key(loc) && observed(loc) {
                    assert!(rfmap.final_of(loc).is_some(), "no final entry for observed location {}", loc)
                }
            }
        }

        let mut fstate = litmus.init.clone();
        for (loc, source) in rfmap.finals() {
            if let RfSource::Store(store) = source {
                let value = match es.event(store).written_value().as_cst() {
                    Some(value) => value,
                    None => panic!("symbolic value written by final store {}", store),
                };
                fstate.bind(loc.clone(), value)
            }
        }

        if cfg.check_filter {
            if let Some(filter) = &litmus.filter {
                if !filter.eval(&fstate) {
                    log!(log::FINAL, &format!("filter rejects {}", fstate));
                    continue;
                }
            }
        }

        if cfg.speedcheck != Speedcheck::Off && !worth_going(litmus, &fstate) {
            log!(log::FINAL, &format!("speedcheck skips {}", fstate));
            continue;
        }

        // Everything else on the location is viewed before the final
        // store
        let mut last_store_vbf = Rel::new();
        for (group, chosen) in groups.iter().zip(selection.iter()) {
            for store in &group.stores {
                if *store != **chosen {
                    last_store_vbf.insert(*store, **chosen)
                }
            }
            for load in es.memory_events().filter(|ev| ev.is_memory_read()) {
                if load.location().normalize() == group.loc {
                    last_store_vbf.insert(load.id, **chosen)
                }
            }
        }

        let pco = pco_base
            .union(&last_store_vbf.restrict(|from, to| es.event(from).is_memory_write() && es.event(to).is_memory_write()));
        if !pco.is_acyclic() {
            log!(log::FINAL, "cyclic coherence order, skipping selection");
            continue;
        }

        let concrete = Concrete {
            es: es.clone(),
            rfmap,
            fstate,
            po_iico: order.clone(),
            ppoloc: ppoloc.clone(),
            store_load_vbf: store_load_vbf.clone(),
            init_load_vbf: init_load_vbf.clone(),
            atomic_load_store: atomic_load_store.clone(),
            last_store_vbf,
            pco,
        };
        acc = on_concrete(concrete, acc)
    }
    acc
}
