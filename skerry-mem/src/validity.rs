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

//! Cycle and intervening-write checks over a candidate's reads-from
//! map.

use skerry_lib::event::EventStructure;
use skerry_lib::value::Cst;

use crate::rfmap::{RfMap, RfSource};

/// Whether the reads-from edges united with intra-causality form a
/// cycle. Only consulted by the debug assertion explaining why an
/// otherwise satisfiable-looking system had no solution.
pub fn rfmap_is_cyclic<C: Cst>(es: &EventStructure<C>, rfmap: &RfMap<C>) -> bool {
    let rel = es.intra_data.union(&es.intra_ctrl).union(&rfmap.store_edges());
    !rel.is_acyclic()
}

/// The uniproc sanity of a fully determined reads-from choice: no
/// store to the same location strictly between a load and the store
/// it reads, and no store to the same location before a load that
/// reads the initial state. Returns false when the candidate must be
/// discarded.
pub fn check_rfmap<C: Cst>(es: &EventStructure<C>, rfmap: &RfMap<C>) -> bool {
    let order = es.po_iico().transitive_closure();

    for (load, source) in rfmap.loads() {
        let load = es.event(load);
        if !load.is_memory_read() {
            continue;
        }
        let loc = load.location().normalize();
        let same_loc_stores =
            es.memory_events().filter(|w| w.is_memory_write() && w.location().normalize() == loc);

        match source {
            RfSource::Store(store) => {
                for between in same_loc_stores {
                    if between.id != store
                        && order.contains(store, between.id)
                        && order.contains(between.id, load.id)
                    {
                        return false;
                    }
                }
            }
            RfSource::Init => {
                for store in same_loc_stores {
                    if order.contains(store.id, load.id) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfmap::RfKey;
    use skerry_lib::event::{Annots, Event, EventId, EventKind, Location};
    use skerry_lib::symtab::Symtab;
    use skerry_lib::value::{Val, C64};

    fn mem_event(id: u32, po: usize, kind: EventKind, loc: &Location<C64>) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread: 0,
            po,
            kind,
            loc: Some(loc.clone()),
            read: Some(Val::Cst(C64::num(0))),
            written: Some(Val::Cst(C64::num(0))),
            annots: Annots::default(),
        }
    }

    #[test]
    fn test_check_rfmap_rejects_reading_over_a_store() {
        let mut symtab = Symtab::new();
        let x = Location::global(symtab.intern("x"));

        // W x ; W x ; R x, with the read taking its value from the
        // first write over the second
        let mut es = EventStructure::new();
        es.insert(mem_event(0, 0, EventKind::MemWrite, &x));
        es.insert(mem_event(1, 1, EventKind::MemWrite, &x));
        es.insert(mem_event(2, 2, EventKind::MemRead, &x));

        let mut rfmap = RfMap::new();
        rfmap.insert(RfKey::Load(EventId::from_u32(2)), RfSource::Store(EventId::from_u32(0)));
        assert!(!check_rfmap(&es, &rfmap));

        let mut rfmap = RfMap::new();
        rfmap.insert(RfKey::Load(EventId::from_u32(2)), RfSource::Store(EventId::from_u32(1)));
        assert!(check_rfmap(&es, &rfmap));
    }

    #[test]
    fn test_check_rfmap_rejects_init_read_after_a_store() {
        let mut symtab = Symtab::new();
        let x = Location::global(symtab.intern("x"));

        let mut es = EventStructure::new();
        es.insert(mem_event(0, 0, EventKind::MemWrite, &x));
        es.insert(mem_event(1, 1, EventKind::MemRead, &x));

        let mut rfmap = RfMap::new();
        rfmap.insert(RfKey::Load(EventId::from_u32(1)), RfSource::Init);
        assert!(!check_rfmap(&es, &rfmap))
    }

    #[test]
    fn test_rfmap_cycle_through_intra_causality() {
        let mut symtab = Symtab::new();
        let x = Location::global(symtab.intern("x"));

        let mut es = EventStructure::new();
        es.insert(mem_event(0, 0, EventKind::MemRead, &x));
        es.insert(mem_event(1, 0, EventKind::MemWrite, &x));
        // The write's data depends on the read
        es.intra_data.insert(EventId::from_u32(0), EventId::from_u32(1));

        // ... and the read takes its value from that same write
        let mut rfmap = RfMap::new();
        rfmap.insert(RfKey::Load(EventId::from_u32(0)), RfSource::Store(EventId::from_u32(1)));
        assert!(rfmap_is_cyclic(&es, &rfmap));

        let acyclic = RfMap::new();
        assert!(!rfmap_is_cyclic(&es, &acyclic))
    }
}
