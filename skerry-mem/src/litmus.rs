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

//! The parsed form of a litmus test as the enumerator consumes it: a
//! program laid out as labelled, addressed code blocks, the start
//! point of each thread, the initial store, and the observation
//! clause with its optional filter. Parsing concrete test formats
//! into this shape is a frontend concern.

use std::collections::{BTreeMap, BTreeSet};

use skerry_lib::event::{Location, ThreadId};
use skerry_lib::state::{Cond, Prop, State};
use skerry_lib::symtab::{Name, Symtab};
use skerry_lib::value::Cst;

/// Each thread occupies its own address range, so jump targets can
/// never alias across threads.
const THREAD_STRIDE: u64 = 0x1000;
const INSTR_SIZE: u64 = 4;

pub struct Litmus<C: Cst, I> {
    pub name: String,
    pub symtab: Symtab,
    /// Label to code block. A block is the ordered (address,
    /// instruction) suffix of its thread starting at the label.
    pub program: BTreeMap<Name, Vec<(u64, I)>>,
    /// Thread entry points.
    pub starts: Vec<(ThreadId, Name)>,
    pub init: State<C>,
    pub cond: Cond<C>,
    /// An optional predicate restricting which final states are
    /// interesting at all, applied before the observation clause.
    pub filter: Option<Prop<C>>,
    /// The locations the observation clause mentions.
    pub observed: BTreeSet<Location<C>>,
}

/// The code of one thread before layout: instructions with optional
/// labels attached.
pub struct ThreadCode<I> {
    pub thread: ThreadId,
    pub code: Vec<(Option<String>, I)>,
}

impl<I> ThreadCode<I> {
    pub fn new(thread: ThreadId) -> Self {
        ThreadCode { thread, code: Vec::new() }
    }

    pub fn instr(mut self, instr: I) -> Self {
        self.code.push((None, instr));
        self
    }

    pub fn labelled(mut self, label: &str, instr: I) -> Self {
        self.code.push((Some(label.to_string()), instr));
        self
    }
}

impl<C: Cst, I: Clone> Litmus<C, I> {
    /// Lay the threads out into addressed code blocks. Every label
    /// gets a block holding the suffix of its thread from that label,
    /// and each thread gets an entry block for its start point.
    pub fn new(
        name: &str,
        mut symtab: Symtab,
        threads: Vec<ThreadCode<I>>,
        init: State<C>,
        cond: Cond<C>,
        filter: Option<Prop<C>>,
    ) -> Self {
        let mut program = BTreeMap::new();
        let mut starts = Vec::new();

        for thread in &threads {
            let base = THREAD_STRIDE * (thread.thread as u64 + 1);
            let addressed: Vec<(u64, I)> = thread
                .code
                .iter()
                .enumerate()
                .map(|(i, (_, instr))| (base + i as u64 * INSTR_SIZE, instr.clone()))
                .collect();

            let entry = symtab.intern(&format!("P{}", thread.thread));
            starts.push((thread.thread, entry));
            program.insert(entry, addressed.clone());

            for (i, (label, _)) in thread.code.iter().enumerate() {
                if let Some(label) = label {
                    let label = symtab.intern(label);
                    program.insert(label, addressed[i..].to_vec());
                }
            }
        }

        let observed = cond.locations();
        Litmus { name: name.to_string(), symtab, program, starts, init, cond, filter, observed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::value::C64;

    #[test]
    fn test_layout() {
        let mut symtab = Symtab::new();
        let loop_head = symtab.intern("L");
        let x = Location::<C64>::global(symtab.intern("x"));

        let t0 = ThreadCode::new(0).instr("a").labelled("L", "b").instr("c");
        let t1 = ThreadCode::new(1).instr("d");
        let litmus = Litmus::new(
            "layout",
            symtab,
            vec![t0, t1],
            State::new(),
            Cond::Exists(Prop::Eq(x, C64::num(0))),
            None,
        );

        assert_eq!(litmus.starts.len(), 2);
        let p0 = &litmus.program[&litmus.starts[0].1];
        assert_eq!(p0.len(), 3);
        // Addresses are contiguous within a thread, disjoint across threads
        assert!(p0[0].0 < p0[1].0);
        let p1 = &litmus.program[&litmus.starts[1].1];
        assert!(p0[2].0 < p1[0].0);
        // The label block is the suffix from the label
        let l = &litmus.program[&loop_head];
        assert_eq!(l.len(), 2);
        assert_eq!(l[0].0, p0[1].0);
        assert_eq!(litmus.observed.len(), 1)
    }
}
