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

//! The composition combinators for building candidate event
//! structures. A [Frag] is the list of alternatives a piece of code
//! can execute as; each alternative carries an output value, the
//! constraints accumulated so far, the events generated so far, and
//! the entry/exit event frontiers that sequencing draws dependency
//! edges between. The instruction driver and the per-instruction
//! semantics build everything through these combinators and never
//! inspect a fragment directly.

use skerry_lib::constraint::Constraint;
use skerry_lib::event::{Annots, Event, EventId, EventKind, EventStructure, Location, INIT_THREAD};
use skerry_lib::state::State;
use skerry_lib::symtab::Name;
use skerry_lib::value::{Cst, Val};

/// Event identifiers are drawn from one generator per test, threaded
/// explicitly through the driver and the semantics.
#[derive(Clone, Debug, Default)]
pub struct EidGen {
    next: u32,
}

impl EidGen {
    pub fn new() -> Self {
        EidGen { next: 0 }
    }

    pub fn fresh(&mut self) -> EventId {
        let id = EventId::from_u32(self.next);
        self.next += 1;
        id
    }
}

/// One alternative execution of a fragment of code.
#[derive(Clone, Debug)]
pub struct Branch<A, C: Cst> {
    pub output: A,
    pub cnstrnts: Vec<Constraint<C>>,
    pub es: EventStructure<C>,
    /// The events sequencing draws dependency edges into.
    pub entry: Vec<EventId>,
    /// The events sequencing draws dependency edges out of.
    pub exit: Vec<EventId>,
}

#[derive(Clone, Debug)]
pub struct Frag<A, C: Cst> {
    pub branches: Vec<Branch<A, C>>,
}

impl<C: Cst> Frag<(), C> {
    /// A fragment executing a single event.
    pub fn event(ev: Event<C>) -> Self {
        let id = ev.id;
        let mut es = EventStructure::new();
        es.insert(ev);
        Frag { branches: vec![Branch { output: (), cnstrnts: Vec::new(), es, entry: vec![id], exit: vec![id] }] }
    }

    /// The sentinel for a trace truncated at the loop unrolling
    /// bound. Its constraint is unsolvable, so no execution built
    /// from this fragment is ever delivered.
    pub fn too_far(label: Name) -> Self {
        Frag {
            branches: vec![Branch {
                output: (),
                cnstrnts: vec![Constraint::Unroll(label)],
                es: EventStructure::new(),
                entry: Vec::new(),
                exit: Vec::new(),
            }],
        }
    }

    /// One init-write event per global location of the initial state,
    /// on the init pseudo-thread.
    pub fn init_writes(state: &State<C>, ids: &mut EidGen) -> Self {
        let mut es = EventStructure::new();
        let mut frontier = Vec::new();
        for (loc, value) in state.iter() {
            if let Location::Global(_) = loc {
                let id = ids.fresh();
                es.insert(Event {
                    id,
                    thread: INIT_THREAD,
                    po: 0,
                    kind: EventKind::InitWrite,
                    loc: Some(loc.clone()),
                    read: None,
                    written: Some(Val::Cst(value)),
                    annots: Annots::default(),
                });
                frontier.push(id)
            }
        }
        Frag {
            branches: vec![Branch {
                output: (),
                cnstrnts: Vec::new(),
                es,
                entry: frontier.clone(),
                exit: frontier,
            }],
        }
    }
}

impl<A, C: Cst> Frag<A, C> {
    pub fn unit(output: A) -> Self {
        Frag {
            branches: vec![Branch {
                output,
                cnstrnts: Vec::new(),
                es: EventStructure::new(),
                entry: Vec::new(),
                exit: Vec::new(),
            }],
        }
    }

    /// The fragment with no alternatives at all. Used by the driver
    /// to give up on a thread after a user error has been recorded.
    pub fn empty() -> Self {
        Frag { branches: Vec::new() }
    }

    pub fn map<B, F: FnMut(A) -> B>(self, mut f: F) -> Frag<B, C> {
        Frag {
            branches: self
                .branches
                .into_iter()
                .map(|br| Branch { output: f(br.output), cnstrnts: br.cnstrnts, es: br.es, entry: br.entry, exit: br.exit })
                .collect(),
        }
    }

    /// Attach a constraint to every alternative.
    pub fn cnstrnt(mut self, cnstrnt: Constraint<C>) -> Self {
        for br in &mut self.branches {
            br.cnstrnts.push(cnstrnt.clone())
        }
        self
    }

    /// Monadic sequencing: run the continuation on each alternative's
    /// output and splice the resulting events after it. No dependency
    /// edges are drawn; program order between instructions comes from
    /// the po indices the driver threads through.
    pub fn then<B, F: FnMut(A) -> Frag<B, C>>(self, mut f: F) -> Frag<B, C> {
        let mut branches = Vec::new();
        for br in self.branches {
            let Branch { output, cnstrnts, es, entry, exit } = br;
            let cont = f(output);
            for tail in cont.branches {
                let Branch { output, cnstrnts: tail_cnstrnts, es: tail_es, entry: tail_entry, exit: tail_exit } = tail;
                let head_empty = es.is_empty();
                let tail_empty = tail_es.is_empty();
                let mut merged_cnstrnts = cnstrnts.clone();
                merged_cnstrnts.extend(tail_cnstrnts);
                branches.push(Branch {
                    output,
                    cnstrnts: merged_cnstrnts,
                    es: es.clone().union(tail_es),
                    entry: if head_empty { tail_entry } else { entry.clone() },
                    exit: if tail_empty { exit.clone() } else { tail_exit },
                })
            }
        }
        Frag { branches }
    }

    fn seq_edges<B: Clone>(self, other: Frag<B, C>, data: bool) -> Frag<B, C> {
        let mut branches = Vec::new();
        for br in self.branches {
            for tail in other.branches.iter().cloned() {
                let head_empty = br.es.is_empty();
                let tail_empty = tail.es.is_empty();
                let mut cnstrnts = br.cnstrnts.clone();
                cnstrnts.extend(tail.cnstrnts);
                let mut es = br.es.clone().union(tail.es);
                for from in &br.exit {
                    for to in &tail.entry {
                        if data {
                            es.intra_data.insert(*from, *to)
                        } else {
                            es.intra_ctrl.insert(*from, *to)
                        }
                    }
                }
                branches.push(Branch {
                    output: tail.output,
                    cnstrnts,
                    es,
                    entry: if head_empty { tail.entry } else { br.entry.clone() },
                    exit: if tail_empty { br.exit.clone() } else { tail.exit },
                })
            }
        }
        Frag { branches }
    }

    /// Sequence another fragment after this one, drawing
    /// intra-causality-data edges from this fragment's exits to the
    /// other's entries. How instruction semantics wires address and
    /// data dependencies.
    pub fn seq_data<B: Clone>(self, other: Frag<B, C>) -> Frag<B, C> {
        self.seq_edges(other, true)
    }

    /// As [Frag::seq_data], with intra-causality-control edges.
    pub fn seq_ctrl<B: Clone>(self, other: Frag<B, C>) -> Frag<B, C> {
        self.seq_edges(other, false)
    }

    /// Parallel composition: every alternative of one fragment
    /// against every alternative of the other, with no ordering
    /// between their events.
    pub fn par<B: Clone>(self, other: Frag<B, C>) -> Frag<(A, B), C>
    where
        A: Clone,
    {
        let mut branches = Vec::new();
        for br in &self.branches {
            for other_br in &other.branches {
                let mut cnstrnts = br.cnstrnts.clone();
                cnstrnts.extend(other_br.cnstrnts.iter().cloned());
                let mut entry = br.entry.clone();
                entry.extend(&other_br.entry);
                let mut exit = br.exit.clone();
                exit.extend(&other_br.exit);
                branches.push(Branch {
                    output: (br.output.clone(), other_br.output.clone()),
                    cnstrnts,
                    es: br.es.clone().union(other_br.es.clone()),
                    entry,
                    exit,
                })
            }
        }
        Frag { branches }
    }

    /// Branch on a guard value. A determined guard picks a side
    /// immediately; a symbolic one keeps both sides, pinning the
    /// guard to one or zero so the solver can discard the infeasible
    /// side later.
    pub fn choice(guard: Val<C>, taken: Frag<A, C>, fallthrough: Frag<A, C>) -> Frag<A, C> {
        match guard.as_cst() {
            Some(c) => {
                if c.is_zero() {
                    fallthrough
                } else {
                    taken
                }
            }
            None => {
                let mut branches = taken.cnstrnt(Constraint::eq(guard, Val::Cst(C::one()))).branches;
                branches.extend(fallthrough.cnstrnt(Constraint::eq(guard, Val::Cst(C::zero()))).branches);
                Frag { branches }
            }
        }
    }

    /// The candidate list this fragment has built.
    pub fn into_output(self) -> Vec<(Vec<Constraint<C>>, EventStructure<C>)> {
        self.branches.into_iter().map(|br| (br.cnstrnts, br.es)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::value::{Sym, C64};

    fn event(id: &mut EidGen, kind: EventKind) -> Event<C64> {
        Event { id: id.fresh(), thread: 0, po: 0, kind, loc: None, read: None, written: None, annots: Annots::default() }
    }

    #[test]
    fn test_seq_data_draws_edges() {
        let mut ids = EidGen::new();
        let a = event(&mut ids, EventKind::RegRead);
        let b = event(&mut ids, EventKind::RegWrite);
        let (aid, bid) = (a.id, b.id);
        let frag = Frag::event(a).seq_data(Frag::event(b));
        assert_eq!(frag.branches.len(), 1);
        let br = &frag.branches[0];
        assert!(br.es.intra_data.contains(aid, bid));
        assert_eq!(br.entry, vec![aid]);
        assert_eq!(br.exit, vec![bid]);
    }

    #[test]
    fn test_unit_is_neutral_for_sequencing() {
        let mut ids = EidGen::new();
        let a = event(&mut ids, EventKind::Barrier);
        let aid = a.id;
        let frag = Frag::unit(()).seq_data(Frag::event(a));
        let br = &frag.branches[0];
        assert!(br.es.intra_data.is_empty());
        assert_eq!(br.entry, vec![aid]);
        assert_eq!(br.exit, vec![aid]);
    }

    #[test]
    fn test_choice_on_determined_guard_picks_a_side() {
        let taken = Frag::<u32, C64>::unit(1);
        let fallthrough = Frag::unit(2);
        let frag = Frag::choice(Val::Cst(C64::num(7)), taken, fallthrough);
        assert_eq!(frag.branches.len(), 1);
        assert_eq!(frag.branches[0].output, 1);

        let taken = Frag::<u32, C64>::unit(1);
        let fallthrough = Frag::unit(2);
        let frag = Frag::choice(Val::Cst(C64::num(0)), taken, fallthrough);
        assert_eq!(frag.branches[0].output, 2);
    }

    #[test]
    fn test_choice_on_symbolic_guard_keeps_both_sides() {
        let guard = Val::<C64>::Var(Sym::from_u32(0));
        let frag = Frag::choice(guard, Frag::unit(1), Frag::unit(2));
        assert_eq!(frag.branches.len(), 2);
        for br in &frag.branches {
            assert_eq!(br.cnstrnts.len(), 1)
        }
    }

    #[test]
    fn test_then_is_a_cartesian_product() {
        let two = Frag::<u32, C64> { branches: Frag::unit(1).branches.into_iter().chain(Frag::unit(2).branches).collect() };
        let frag = two.then(|n| {
            Frag { branches: Frag::unit(n * 10).branches.into_iter().chain(Frag::unit(n * 100).branches).collect() }
        });
        let outputs: Vec<u32> = frag.branches.iter().map(|br| br.output).collect();
        assert_eq!(outputs, vec![10, 100, 20, 200])
    }

    #[test]
    fn test_par_merges_disjoint_events() {
        let mut ids = EidGen::new();
        let a = event(&mut ids, EventKind::Barrier);
        let b = event(&mut ids, EventKind::Barrier);
        let frag = Frag::event(a).par(Frag::event(b));
        assert_eq!(frag.branches.len(), 1);
        assert_eq!(frag.branches[0].es.events.len(), 2);
        assert!(frag.branches[0].es.intra_data.is_empty());
    }
}
