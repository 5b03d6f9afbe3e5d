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

//! Memory-level reads-from. Unlike registers there is no unique
//! answer: every load may read from any compatible store (or from the
//! initial state), so this module streams the cartesian product of
//! per-load choices, solving the value and location equations of each
//! tuple and handing the survivors on.

use skerry_lib::config::Config;
use skerry_lib::constraint::{Constraint, Expr};
use skerry_lib::event::{Event, EventId, EventStructure};
use skerry_lib::log;
use skerry_lib::relation::Rel;
use skerry_lib::solver::{self, Answer};
use skerry_lib::state::State;
use skerry_lib::value::{Cst, Val};

use crate::product::Product;
use crate::regs::Resolved;
use crate::rfmap::{RfKey, RfMap, RfSource};

/// Whether a load may even tentatively read from a store: distinct
/// events, locations not determined to differ, and (under optace) the
/// store not ordered after the load on its own thread.
fn compatible<C: Cst>(cfg: &Config, order: &Rel, load: &Event<C>, store: &Event<C>) -> bool {
    if store.id == load.id {
        return false;
    }
    let load_loc = load.location().normalize();
    let store_loc = store.location().normalize();
    if load_loc.is_determined() && store_loc.is_determined() && load_loc != store_loc {
        return false;
    }
    if cfg.optace && order.contains(load.id, store.id) {
        return false;
    }
    true
}

/// The value and location equations for one load reading from one
/// source. Returns `None` when a constraint is directly contradictory
/// (both sides determined and unequal), letting the caller discard
/// the tuple without invoking the solver.
fn rf_cnstrnts<C: Cst>(
    init: &State<C>,
    es: &EventStructure<C>,
    load: EventId,
    source: RfSource,
    cnstrnts: &mut Vec<Constraint<C>>,
) -> Option<()> {
    let load = es.event(load);
    match source {
        RfSource::Store(store) => {
            let store = es.event(store);
            let value_eq = Constraint::eq(*load.read_value(), *store.written_value());
            let load_addr = load.location().val().expect("memory load with a register location");
            let store_addr = store.location().val().expect("memory store with a register location");
            let loc_eq = Constraint::eq(*load_addr, *store_addr);
            for cnstrnt in [value_eq, loc_eq] {
                if cnstrnt.direct_contradiction() {
                    return None;
                }
                cnstrnts.push(cnstrnt)
            }
        }
        RfSource::Init => {
            let loc = load.location();
            let cnstrnt = if loc.is_determined() {
                Constraint::eq(*load.read_value(), Val::Cst(init.read(loc)))
            } else {
                // The location is still symbolic, so the initial
                // value lookup is deferred to the solver
                Constraint::Assign(*load.read_value(), Expr::ReadInit(loc.clone(), init.clone()))
            };
            if cnstrnt.direct_contradiction() {
                return None;
            }
            cnstrnts.push(cnstrnt)
        }
    }
    Some(())
}

/// Enumerate every memory reads-from choice of the
/// register-resolved structure, calling `each` with the substituted
/// structure, the extended rfmap, and the solver residual for every
/// tuple whose equations have a solution.
pub fn solve_mem<C: Cst, F>(init: &State<C>, cfg: &Config, resolved: &Resolved<C>, mut each: F)
where
    F: FnMut(EventStructure<C>, RfMap<C>, Vec<Constraint<C>>),
{
    let es = &resolved.es;
    let order = es.po_iico().transitive_closure();

    let loads: Vec<EventId> = es.events.values().filter(|ev| ev.is_memory_read()).map(|ev| ev.id).collect();
    let stores: Vec<EventId> = es.events.values().filter(|ev| ev.is_memory_write()).map(|ev| ev.id).collect();

    let candidates: Vec<Vec<RfSource>> = loads
        .iter()
        .map(|load| {
            let load = es.event(*load);
            let mut sources = Vec::new();
            // With explicit init-write events the initial state is
            // already present as stores
            if !cfg.initwrites {
                sources.push(RfSource::Init)
            }
            for store in &stores {
                let store = es.event(*store);
                if compatible(cfg, &order, load, store) {
                    sources.push(RfSource::Store(store.id))
                }
            }
            sources
        })
        .collect();

    let tuples = Product::new(&candidates);
    log!(log::RFM, &format!("{} load(s), {} store(s), {} reads-from tuple(s)", loads.len(), stores.len(), tuples.total()));

    for tuple in tuples {
        let mut cnstrnts = resolved.residual.clone();
        let mut contradiction = false;
        for (load, source) in loads.iter().zip(tuple.iter()) {
            if rf_cnstrnts(init, es, *load, **source, &mut cnstrnts).is_none() {
                contradiction = true;
                break;
            }
        }
        if contradiction {
            continue;
        }

        match solver::solve(cnstrnts) {
            Answer::NoSolns => (),
            Answer::Maybe(sigma, residual) => {
                let es = es.subst(&sigma);
                let mut rfmap = resolved.rfmap.clone();
                for (load, source) in loads.iter().zip(tuple.iter()) {
                    rfmap.insert(RfKey::Load(*load), **source)
                }
                each(es, rfmap, residual)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::event::{Annots, EventKind, Location};
    use skerry_lib::symtab::Symtab;
    use skerry_lib::value::{SymGen, C64};

    fn store(id: u32, thread: usize, po: usize, loc: &Location<C64>, value: Val<C64>) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread,
            po,
            kind: EventKind::MemWrite,
            loc: Some(loc.clone()),
            read: None,
            written: Some(value),
            annots: Annots::default(),
        }
    }

    fn load(id: u32, thread: usize, po: usize, loc: &Location<C64>, value: Val<C64>) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread,
            po,
            kind: EventKind::MemRead,
            loc: Some(loc.clone()),
            read: Some(value),
            written: None,
            annots: Annots::default(),
        }
    }

    fn resolved(es: EventStructure<C64>) -> Resolved<C64> {
        Resolved { es, rfmap: RfMap::new(), residual: Vec::new() }
    }

    #[test]
    fn test_enumerates_init_and_stores() {
        let mut symtab = Symtab::new();
        let mut vars = SymGen::new();
        let x = Location::global(symtab.intern("x"));

        let mut es = EventStructure::new();
        es.insert(store(0, 0, 0, &x, Val::Cst(C64::num(1))));
        es.insert(load(1, 1, 0, &x, Val::Var(vars.fresh())));

        let mut init = State::new();
        init.bind(x.clone(), C64::num(0));

        let mut seen = Vec::new();
        solve_mem(&init, &Config::default(), &resolved(es), |es, rfmap, residual| {
            assert!(residual.is_empty());
            assert!(es.is_concrete());
            let value = es.event(EventId::from_u32(1)).read.unwrap();
            seen.push((rfmap.load(EventId::from_u32(1)).unwrap(), value))
        });

        assert_eq!(
            seen,
            vec![
                (RfSource::Init, Val::Cst(C64::num(0))),
                (RfSource::Store(EventId::from_u32(0)), Val::Cst(C64::num(1)))
            ]
        )
    }

    #[test]
    fn test_different_locations_are_incompatible() {
        let mut symtab = Symtab::new();
        let mut vars = SymGen::new();
        let x = Location::global(symtab.intern("x"));
        let y = Location::global(symtab.intern("y"));

        let mut es = EventStructure::new();
        es.insert(store(0, 0, 0, &y, Val::Cst(C64::num(1))));
        es.insert(load(1, 1, 0, &x, Val::Var(vars.fresh())));

        let mut count = 0;
        solve_mem(&State::new(), &Config::default(), &resolved(es), |_, rfmap, _| {
            assert_eq!(rfmap.load(EventId::from_u32(1)), Some(RfSource::Init));
            count += 1
        });
        assert_eq!(count, 1)
    }

    #[test]
    fn test_optace_rejects_reading_a_later_store() {
        let mut symtab = Symtab::new();
        let mut vars = SymGen::new();
        let x = Location::global(symtab.intern("x"));

        // The load precedes the store on the same thread
        let mut es = EventStructure::new();
        es.insert(load(0, 0, 0, &x, Val::Var(vars.fresh())));
        es.insert(store(1, 0, 1, &x, Val::Cst(C64::num(1))));

        let mut sources = Vec::new();
        solve_mem(&State::new(), &Config::default(), &resolved(es.clone()), |_, rfmap, _| {
            sources.push(rfmap.load(EventId::from_u32(0)).unwrap())
        });
        assert_eq!(sources, vec![RfSource::Init]);

        let mut cfg = Config::default();
        cfg.optace = false;
        let mut sources = Vec::new();
        solve_mem(&State::new(), &cfg, &resolved(es), |_, rfmap, _| {
            sources.push(rfmap.load(EventId::from_u32(0)).unwrap())
        });
        assert_eq!(sources, vec![RfSource::Init, RfSource::Store(EventId::from_u32(1))])
    }

    #[test]
    fn test_unroll_residual_survives_to_the_continuation() {
        let mut symtab = Symtab::new();
        let label = symtab.intern("L");
        let es = EventStructure::<C64>::new();
        let resolved = Resolved { es, rfmap: RfMap::new(), residual: vec![Constraint::Unroll(label)] };

        let mut count = 0;
        solve_mem(&State::new(), &Config::default(), &resolved, |_, _, residual| {
            assert_eq!(residual.len(), 1);
            assert!(residual[0].is_unroll());
            count += 1
        });
        assert_eq!(count, 1)
    }
}
