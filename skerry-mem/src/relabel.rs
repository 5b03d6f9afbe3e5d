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

//! Canonicalizes the event identifiers of a structure so that the
//! memory events occupy the contiguous prefix `0..n_mem`, keeping
//! their original relative order, with everything else following.
//! Downstream passes rely on this to index memory events densely.

use std::collections::BTreeMap;

use skerry_lib::event::{EventId, EventStructure};
use skerry_lib::value::Cst;

pub fn relabel<C: Cst>(es: EventStructure<C>) -> EventStructure<C> {
    let mut mapping: BTreeMap<EventId, EventId> = BTreeMap::new();
    let mut next = 0u32;

    for ev in es.events.values().filter(|ev| ev.is_memory()) {
        mapping.insert(ev.id, EventId::from_u32(next));
        next += 1
    }
    for ev in es.events.values().filter(|ev| !ev.is_memory()) {
        mapping.insert(ev.id, EventId::from_u32(next));
        next += 1
    }

    let rename = |id: EventId| *mapping.get(&id).expect("relation mentions an event missing from the structure");

    let mut relabelled = EventStructure::new();
    for ev in es.events.values() {
        let mut ev = ev.clone();
        ev.id = rename(ev.id);
        relabelled.insert(ev)
    }
    relabelled.intra_data = es.intra_data.rename(rename);
    relabelled.intra_ctrl = es.intra_ctrl.rename(rename);
    relabelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::event::{Annots, Event, EventKind, Location};
    use skerry_lib::symtab::Symtab;
    use skerry_lib::value::{Val, C64};

    fn structure() -> EventStructure<C64> {
        let mut symtab = Symtab::new();
        let x = symtab.intern("x");
        let mut es = EventStructure::new();
        // A register write, a memory read, and a memory write, with
        // deliberately sparse, out-of-order identifiers
        es.insert(Event {
            id: EventId::from_u32(4),
            thread: 0,
            po: 0,
            kind: EventKind::RegWrite,
            loc: None,
            read: None,
            written: Some(Val::Cst(C64::num(0))),
            annots: Annots::default(),
        });
        es.insert(Event {
            id: EventId::from_u32(7),
            thread: 0,
            po: 1,
            kind: EventKind::MemRead,
            loc: Some(Location::global(x)),
            read: Some(Val::Cst(C64::num(0))),
            written: None,
            annots: Annots::default(),
        });
        es.insert(Event {
            id: EventId::from_u32(9),
            thread: 0,
            po: 2,
            kind: EventKind::MemWrite,
            loc: Some(Location::global(x)),
            read: None,
            written: Some(Val::Cst(C64::num(1))),
            annots: Annots::default(),
        });
        es.intra_data.insert(EventId::from_u32(7), EventId::from_u32(9));
        es
    }

    #[test]
    fn test_memory_events_form_the_prefix() {
        let es = relabel(structure());
        let mem_ids: Vec<u32> = es.memory_events().map(|ev| ev.id.to_u32()).collect();
        assert_eq!(mem_ids, vec![0, 1]);
        assert_eq!(es.events.len(), 3);
        // The read had the smaller original identifier, so it comes first
        assert!(es.event(EventId::from_u32(0)).is_memory_read());
        assert!(es.event(EventId::from_u32(1)).is_memory_write());
        assert!(es.event(EventId::from_u32(2)).is_reg_write());
        // Relations follow the renaming
        assert!(es.intra_data.contains(EventId::from_u32(0), EventId::from_u32(1)))
    }

    #[test]
    fn test_relabel_is_idempotent() {
        let once = relabel(structure());
        let twice = relabel(once.clone());
        let once_ids: Vec<EventId> = once.events.keys().copied().collect();
        let twice_ids: Vec<EventId> = twice.events.keys().copied().collect();
        assert_eq!(once_ids, twice_ids);
        assert_eq!(once.intra_data, twice.intra_data);
        assert_eq!(once.intra_ctrl, twice.intra_ctrl)
    }
}
