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

//! Register-level reads-from. Unlike memory, register reads-from is
//! unique: each register read takes its value from the latest write
//! to that register before it on its own thread, or from the initial
//! state if there is none. Resolving it first shrinks the variable
//! system the memory enumeration has to solve per tuple.

use std::collections::BTreeMap;

use skerry_lib::constraint::Constraint;
use skerry_lib::event::{Event, EventStructure, Location};
use skerry_lib::log;
use skerry_lib::relation::Rel;
use skerry_lib::solver::{self, Answer};
use skerry_lib::state::State;
use skerry_lib::value::{Cst, Val};

use crate::rfmap::{RfKey, RfMap, RfSource};

/// A structure with register reads-from resolved: the register value
/// equations are solved and substituted away, and the rfmap holds the
/// register entries.
pub struct Resolved<C: Cst> {
    pub es: EventStructure<C>,
    pub rfmap: RfMap<C>,
    pub residual: Vec<Constraint<C>>,
}

/// The latest write of a set under the given order. Register writes
/// to one register on one thread are totally ordered by construction
/// of the semantics; the assertion enforces that invariant.
fn latest_write<'a, C: Cst>(order: &Rel, writes: &[&'a Event<C>]) -> Option<&'a Event<C>> {
    let mut latest: Option<&'a Event<C>> = None;
    for w in writes {
        match latest {
            None => latest = Some(w),
            Some(prev) => {
                if order.contains(prev.id, w.id) {
                    latest = Some(w)
                } else {
                    debug_assert!(
                        order.contains(w.id, prev.id),
                        "register writes {} and {} are unordered",
                        w.id,
                        prev.id
                    )
                }
            }
        }
    }
    latest
}

pub fn solve_regs<C: Cst>(
    init: &State<C>,
    es: &EventStructure<C>,
    cnstrnts: &[Constraint<C>],
) -> Option<Resolved<C>> {
    let order = es.po_iico().transitive_closure();
    let mut cnstrnts = cnstrnts.to_vec();
    let mut rfmap = RfMap::new();

    for load in es.events.values().filter(|ev| ev.is_reg_read()) {
        let loc = load.location();
        let writes: Vec<&Event<C>> = es
            .events
            .values()
            .filter(|w| w.is_reg_write() && w.thread == load.thread && w.location() == loc && order.contains(w.id, load.id))
            .collect();

        match latest_write(&order, &writes) {
            None => {
                rfmap.insert(RfKey::Load(load.id), RfSource::Init);
                cnstrnts.push(Constraint::eq(*load.read_value(), Val::Cst(init.read(loc))))
            }
            Some(w) => {
                rfmap.insert(RfKey::Load(load.id), RfSource::Store(w.id));
                cnstrnts.push(Constraint::eq(*load.read_value(), *w.written_value()))
            }
        }
    }

    // The final value of each written register
    let mut by_reg: BTreeMap<Location<C>, Vec<&Event<C>>> = BTreeMap::new();
    for w in es.events.values().filter(|ev| ev.is_reg_write()) {
        by_reg.entry(w.location().clone()).or_insert_with(Vec::new).push(w)
    }
    for (loc, writes) in by_reg {
        let last = latest_write(&order, &writes).expect("non-empty register write group");
        rfmap.insert(RfKey::Final(loc), RfSource::Store(last.id));
    }

    match solver::solve(cnstrnts) {
        Answer::NoSolns => {
            // The register equations alone are constructively
            // consistent, so this means the structure's own
            // constraints (e.g. both sides of an undetermined branch)
            // were contradictory.
            log!(log::SOLVER, "register stage unsatisfiable, skipping structure");
            None
        }
        Answer::Maybe(sigma, residual) => Some(Resolved { es: es.subst(&sigma), rfmap, residual }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::event::{Annots, EventId, EventKind};
    use skerry_lib::symtab::Symtab;
    use skerry_lib::value::{SymGen, C64};

    fn reg_write(id: u32, po: usize, loc: &Location<C64>, value: Val<C64>) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread: 0,
            po,
            kind: EventKind::RegWrite,
            loc: Some(loc.clone()),
            read: None,
            written: Some(value),
            annots: Annots::default(),
        }
    }

    fn reg_read(id: u32, po: usize, loc: &Location<C64>, value: Val<C64>) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread: 0,
            po,
            kind: EventKind::RegRead,
            loc: Some(loc.clone()),
            read: Some(value),
            written: None,
            annots: Annots::default(),
        }
    }

    #[test]
    fn test_reads_latest_write() {
        let mut symtab = Symtab::new();
        let mut vars = SymGen::new();
        let r0 = Location::Register(0, symtab.intern("r0"));

        let read_val = Val::Var(vars.fresh());
        let mut es = EventStructure::new();
        es.insert(reg_write(0, 0, &r0, Val::Cst(C64::num(1))));
        es.insert(reg_write(1, 1, &r0, Val::Cst(C64::num(2))));
        es.insert(reg_read(2, 2, &r0, read_val));

        let resolved = solve_regs(&State::new(), &es, &[]).unwrap();
        assert!(resolved.residual.is_empty());
        assert_eq!(resolved.rfmap.load(EventId::from_u32(2)), Some(RfSource::Store(EventId::from_u32(1))));
        assert_eq!(resolved.rfmap.final_of(&r0), Some(RfSource::Store(EventId::from_u32(1))));
        // The read value was substituted through the structure
        assert_eq!(es.event(EventId::from_u32(2)).read, Some(read_val));
        assert_eq!(resolved.es.event(EventId::from_u32(2)).read, Some(Val::Cst(C64::num(2))))
    }

    #[test]
    fn test_unwritten_register_reads_initial_state() {
        let mut symtab = Symtab::new();
        let mut vars = SymGen::new();
        let r0 = Location::Register(0, symtab.intern("r0"));

        let mut init = State::new();
        init.bind(r0.clone(), C64::num(9));

        let read_val = Val::Var(vars.fresh());
        let mut es = EventStructure::new();
        es.insert(reg_read(0, 0, &r0, read_val));

        let resolved = solve_regs(&init, &es, &[]).unwrap();
        assert_eq!(resolved.rfmap.load(EventId::from_u32(0)), Some(RfSource::Init));
        assert_eq!(resolved.es.event(EventId::from_u32(0)).read, Some(Val::Cst(C64::num(9))))
    }

    #[test]
    fn test_contradictory_constraints_skip_the_structure() {
        let es = EventStructure::<C64>::new();
        let contradiction = Constraint::eq(Val::Cst(C64::num(0)), Val::Cst(C64::num(1)));
        assert!(solve_regs(&State::new(), &es, &[contradiction]).is_none())
    }
}
