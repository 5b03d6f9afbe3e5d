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

//! Events and event structures. An event is a single atomic
//! occurrence in a candidate execution (a memory access, a register
//! update, a barrier, a branch decision); an event structure is a set
//! of events together with the two intra-thread causality relations
//! built by the instruction semantics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::relation::Rel;
use crate::symtab::Name;
use crate::value::{Cst, Substitution, Val};

pub type ThreadId = usize;

/// The pseudo thread that owns the initial-state write events when
/// the `initwrites` option is enabled. It never appears in a
/// structure's thread list and is unrelated by program order.
pub const INIT_THREAD: ThreadId = usize::MAX;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    id: u32,
}

impl EventId {
    pub fn from_u32(id: u32) -> Self {
        EventId { id }
    }

    pub fn to_u32(self) -> u32 {
        self.id
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "e{}", self.id)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    MemRead,
    MemWrite,
    /// A write representing the initial value of a memory location,
    /// present only when the `initwrites` option is enabled.
    InitWrite,
    RegRead,
    RegWrite,
    Barrier,
    /// A branch-decision event, the target of intra-control edges.
    Commit,
}

/// Instruction-set specific markers carried by an event, in a flag
/// word. `rmw` marks reader-writer combined events (a compare and
/// swap observed as a single event), which the atomic pair derivation
/// must skip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Annots {
    bits: u8,
}

const ACQUIRE: u8 = 1;
const RELEASE: u8 = 2;
const EXCLUSIVE: u8 = 4;
const ATOMIC: u8 = 8;
const RMW: u8 = 16;

impl Annots {
    pub fn acquire(self) -> Self {
        Annots { bits: self.bits | ACQUIRE }
    }

    pub fn release(self) -> Self {
        Annots { bits: self.bits | RELEASE }
    }

    pub fn exclusive(self) -> Self {
        Annots { bits: self.bits | EXCLUSIVE }
    }

    pub fn atomic(self) -> Self {
        Annots { bits: self.bits | ATOMIC }
    }

    pub fn rmw(self) -> Self {
        Annots { bits: self.bits | RMW }
    }

    pub fn is_acquire(self) -> bool {
        self.bits & ACQUIRE > 0
    }

    pub fn is_release(self) -> bool {
        self.bits & RELEASE > 0
    }

    pub fn is_exclusive(self) -> bool {
        self.bits & EXCLUSIVE > 0
    }

    pub fn is_atomic(self) -> bool {
        self.bits & ATOMIC > 0
    }

    pub fn is_rmw(self) -> bool {
        self.bits & RMW > 0
    }
}

/// Where an access lands. Global cells are addressed by a (possibly
/// still symbolic) value; `Deref` is a global reached through a
/// pointer value; registers are always concrete.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Location<C> {
    Global(Val<C>),
    Deref(Val<C>),
    Register(ThreadId, Name),
}

impl<C: Cst> Location<C> {
    pub fn global(name: Name) -> Self {
        Location::Global(Val::Cst(C::addr(name)))
    }

    pub fn is_determined(&self) -> bool {
        match self {
            Location::Global(v) | Location::Deref(v) => v.is_determined(),
            Location::Register(_, _) => true,
        }
    }

    /// The address value of a global or dereferenced location.
    pub fn val(&self) -> Option<&Val<C>> {
        match self {
            Location::Global(v) | Location::Deref(v) => Some(v),
            Location::Register(_, _) => None,
        }
    }

    /// A determined `Deref` is the same cell as the global it points
    /// at, so comparisons go through this.
    pub fn normalize(&self) -> Location<C> {
        match self {
            Location::Deref(Val::Cst(c)) => Location::Global(Val::Cst(*c)),
            _ => self.clone(),
        }
    }

    pub fn subst(&self, sigma: &Substitution<C>) -> Location<C> {
        match self {
            Location::Global(v) => Location::Global(v.subst(sigma)),
            Location::Deref(v) => Location::Deref(v.subst(sigma)),
            Location::Register(tid, reg) => Location::Register(*tid, *reg),
        }
    }
}

impl<C: Cst> fmt::Display for Location<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Location::Global(v) => write!(f, "[{}]", v),
            Location::Deref(v) => write!(f, "[*{}]", v),
            Location::Register(tid, reg) => write!(f, "{}:{}", tid, reg),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Event<C> {
    pub id: EventId,
    pub thread: ThreadId,
    /// Program-order index of the instruction this event belongs to,
    /// within its thread.
    pub po: usize,
    pub kind: EventKind,
    pub loc: Option<Location<C>>,
    pub read: Option<Val<C>>,
    pub written: Option<Val<C>>,
    pub annots: Annots,
}

impl<C: Cst> Event<C> {
    pub fn is_memory(&self) -> bool {
        matches!(self.kind, EventKind::MemRead | EventKind::MemWrite | EventKind::InitWrite)
    }

    pub fn is_memory_read(&self) -> bool {
        matches!(self.kind, EventKind::MemRead)
    }

    pub fn is_memory_write(&self) -> bool {
        matches!(self.kind, EventKind::MemWrite | EventKind::InitWrite)
    }

    pub fn is_init(&self) -> bool {
        matches!(self.kind, EventKind::InitWrite)
    }

    pub fn is_reg_read(&self) -> bool {
        matches!(self.kind, EventKind::RegRead)
    }

    pub fn is_reg_write(&self) -> bool {
        matches!(self.kind, EventKind::RegWrite)
    }

    pub fn is_load(&self) -> bool {
        matches!(self.kind, EventKind::MemRead | EventKind::RegRead)
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, EventKind::Barrier)
    }

    /// The location of a memory or register access. Every such event
    /// has one; its absence is a bug in the instruction semantics.
    pub fn location(&self) -> &Location<C> {
        match &self.loc {
            Some(loc) => loc,
            None => panic!("event {} has no location", self.id),
        }
    }

    pub fn read_value(&self) -> &Val<C> {
        match &self.read {
            Some(v) => v,
            None => panic!("event {} has no read value", self.id),
        }
    }

    pub fn written_value(&self) -> &Val<C> {
        match &self.written {
            Some(v) => v,
            None => panic!("event {} has no written value", self.id),
        }
    }

    pub fn subst(&self, sigma: &Substitution<C>) -> Event<C> {
        Event {
            id: self.id,
            thread: self.thread,
            po: self.po,
            kind: self.kind,
            loc: self.loc.as_ref().map(|loc| loc.subst(sigma)),
            read: self.read.as_ref().map(|v| v.subst(sigma)),
            written: self.written.as_ref().map(|v| v.subst(sigma)),
            annots: self.annots,
        }
    }
}

/// A set of events with the two intra-thread causality relations and
/// the list of participating threads. Structures are immutable once
/// they leave the instruction driver, except for variable
/// substitution, which produces a fresh structure.
#[derive(Clone, Debug, Default)]
pub struct EventStructure<C> {
    pub events: BTreeMap<EventId, Event<C>>,
    /// Address/data dependencies within an instruction.
    pub intra_data: Rel,
    /// Control dependencies within an instruction.
    pub intra_ctrl: Rel,
    pub threads: Vec<ThreadId>,
}

impl<C: Cst> EventStructure<C> {
    pub fn new() -> Self {
        EventStructure { events: BTreeMap::new(), intra_data: Rel::new(), intra_ctrl: Rel::new(), threads: Vec::new() }
    }

    pub fn insert(&mut self, ev: Event<C>) {
        if ev.thread != INIT_THREAD && !self.threads.contains(&ev.thread) {
            self.threads.push(ev.thread);
            self.threads.sort_unstable()
        }
        let prev = self.events.insert(ev.id, ev);
        assert!(prev.is_none(), "duplicate event identifier in structure")
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event(&self, id: EventId) -> &Event<C> {
        match self.events.get(&id) {
            Some(ev) => ev,
            None => panic!("event {} missing from structure", id),
        }
    }

    /// Disjoint union, used by the parallel and sequential
    /// composition of fragments.
    pub fn union(mut self, other: EventStructure<C>) -> EventStructure<C> {
        for (_, ev) in other.events {
            self.insert(ev)
        }
        self.intra_data.extend(&other.intra_data);
        self.intra_ctrl.extend(&other.intra_ctrl);
        self
    }

    pub fn memory_events(&self) -> impl Iterator<Item = &Event<C>> {
        self.events.values().filter(|ev| ev.is_memory())
    }

    pub fn n_mem(&self) -> usize {
        self.memory_events().count()
    }

    /// Program order per thread extended with the intra-instruction
    /// causality edges. Init-write pseudo-thread events are unrelated
    /// here; only the coherence seed orders them.
    pub fn po_iico(&self) -> Rel {
        let mut rel = self.intra_data.union(&self.intra_ctrl);
        for e1 in self.events.values() {
            if e1.thread == INIT_THREAD {
                continue;
            }
            for e2 in self.events.values() {
                if e1.thread == e2.thread && e1.po < e2.po {
                    rel.insert(e1.id, e2.id)
                }
            }
        }
        rel
    }

    pub fn subst(&self, sigma: &Substitution<C>) -> EventStructure<C> {
        if sigma.is_empty() {
            return self.clone();
        }
        EventStructure {
            events: self.events.iter().map(|(id, ev)| (*id, ev.subst(sigma))).collect(),
            intra_data: self.intra_data.clone(),
            intra_ctrl: self.intra_ctrl.clone(),
            threads: self.threads.clone(),
        }
    }

    /// True when no symbolic variable remains anywhere in the
    /// structure. Every delivered concrete execution satisfies this.
    pub fn is_concrete(&self) -> bool {
        self.events.values().all(|ev| {
            ev.loc.as_ref().map_or(true, |loc| loc.is_determined())
                && ev.read.as_ref().map_or(true, |v| v.is_determined())
                && ev.written.as_ref().map_or(true, |v| v.is_determined())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::C64;

    fn event(id: u32, thread: ThreadId, po: usize, kind: EventKind) -> Event<C64> {
        Event {
            id: EventId::from_u32(id),
            thread,
            po,
            kind,
            loc: None,
            read: None,
            written: None,
            annots: Annots::default(),
        }
    }

    #[test]
    fn test_po_iico_orders_within_threads_only() {
        let mut es = EventStructure::new();
        es.insert(event(0, 0, 0, EventKind::Barrier));
        es.insert(event(1, 0, 1, EventKind::Barrier));
        es.insert(event(2, 1, 0, EventKind::Barrier));
        let rel = es.po_iico();
        assert!(rel.contains(EventId::from_u32(0), EventId::from_u32(1)));
        assert!(!rel.contains(EventId::from_u32(1), EventId::from_u32(0)));
        assert!(!rel.contains(EventId::from_u32(0), EventId::from_u32(2)));
    }

    #[test]
    fn test_po_iico_ignores_init_thread() {
        let mut es = EventStructure::new();
        es.insert(event(0, INIT_THREAD, 0, EventKind::InitWrite));
        es.insert(event(1, INIT_THREAD, 0, EventKind::InitWrite));
        es.insert(event(2, 0, 0, EventKind::Barrier));
        assert!(es.po_iico().is_empty());
        assert_eq!(es.threads, vec![0])
    }

    #[test]
    fn test_annots() {
        let a = Annots::default().acquire().atomic();
        assert!(a.is_acquire());
        assert!(a.is_atomic());
        assert!(!a.is_release());
        assert!(!a.is_rmw());
    }
}
