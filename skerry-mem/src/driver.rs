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

//! The instruction driver: walks each thread's code from its entry
//! label, hands every instruction to the semantics, follows branch
//! verdicts through the choice combinator, unrolls loops up to the
//! configured bound, and composes the threads (and optionally the
//! init writes) in parallel into the abstract event structures of the
//! test.

use std::collections::BTreeMap;

use skerry_lib::config::Config;
use skerry_lib::constraint::Constraint;
use skerry_lib::error::ExecError;
use skerry_lib::event::{EventStructure, ThreadId};
use skerry_lib::log;
use skerry_lib::symtab::Name;
use skerry_lib::value::{Cst, SymGen};

use crate::compose::{EidGen, Frag};
use crate::litmus::Litmus;
use crate::relabel::relabel;
use crate::semantics::{InstrInfo, Semantics, Verdict};

/// The abstract event structures of a test, relabelled, with the
/// constraints each accumulated. `too_far` is set when at least one
/// trace was truncated at the loop unrolling bound.
pub struct Glommed<C: Cst> {
    pub structures: Vec<(usize, Vec<Constraint<C>>, EventStructure<C>)>,
    pub too_far: bool,
}

/// The per-label back-jump counts of one trace path. Forked paths
/// each get their own copy, so unrolling in one arm of a conditional
/// never throttles the other.
#[derive(Clone, Debug, Default)]
struct Unrolling {
    visits: BTreeMap<Name, usize>,
}

impl Unrolling {
    fn new() -> Self {
        Unrolling { visits: BTreeMap::new() }
    }

    fn seen(&self, label: Name) -> usize {
        self.visits.get(&label).copied().unwrap_or(0)
    }

    fn visit(&self, label: Name) -> Unrolling {
        let mut unrolling = self.clone();
        unrolling.visits.insert(label, self.seen(label) + 1);
        unrolling
    }
}

struct Driver<'a, C: Cst, S: Semantics<C>> {
    litmus: &'a Litmus<C, S::Instr>,
    sem: &'a S,
    cfg: &'a Config,
    /// Labels indexed by the address their block starts at.
    labels_at: BTreeMap<u64, Vec<Name>>,
    ids: EidGen,
    vars: SymGen,
    too_far: bool,
    err: Option<ExecError>,
}

impl<'a, C: Cst, S: Semantics<C>> Driver<'a, C, S> {
    fn fail(&mut self, err: ExecError) {
        if self.err.is_none() {
            self.err = Some(err)
        }
    }

    fn thread(&mut self, tid: ThreadId, entry: Name) -> Frag<(), C> {
        let litmus = self.litmus;
        match litmus.program.get(&entry) {
            None => {
                let label = litmus.symtab.to_str(entry).to_string();
                self.fail(ExecError::UndefinedEntry(label));
                Frag::empty()
            }
            Some(block) => self.walk(tid, block, 0, &Unrolling::new(), 0),
        }
    }

    fn walk(
        &mut self,
        tid: ThreadId,
        code: &'a [(u64, S::Instr)],
        po: usize,
        unrolling: &Unrolling,
        depth: usize,
    ) -> Frag<(), C> {
        let ((addr, instr), rest) = match code.split_first() {
            None => return Frag::unit(()),
            Some((head, rest)) => (head, rest),
        };

        let labels = self.labels_at.get(addr).map(|labels| labels.as_slice()).unwrap_or(&[]);
        let ii = InstrInfo { po, thread: tid, instr, unroll_count: depth, labels };
        let head = self.sem.build_semantics(&ii, &mut self.ids, &mut self.vars);

        head.then(|(next_po, verdict)| match verdict {
            Verdict::Next => self.walk(tid, rest, next_po, unrolling, depth),
            Verdict::Jump(label) => self.jump(tid, label, *addr, next_po, unrolling),
            Verdict::CondJump(guard, label) => {
                let taken = self.jump(tid, label, *addr, next_po, unrolling);
                let fallthrough = self.walk(tid, rest, next_po, unrolling, depth);
                Frag::choice(guard, taken, fallthrough)
            }
        })
    }

    fn jump(&mut self, tid: ThreadId, label: Name, from_addr: u64, po: usize, unrolling: &Unrolling) -> Frag<(), C> {
        let litmus = self.litmus;
        let block = match litmus.program.get(&label) {
            None => {
                let label = litmus.symtab.to_str(label).to_string();
                self.fail(ExecError::UndefinedLabel(label));
                return Frag::empty();
            }
            Some(block) => block.as_slice(),
        };
        let target_addr = match block.first() {
            None => return Frag::unit(()),
            Some((addr, _)) => *addr,
        };

        if target_addr <= from_addr {
            // A back-jump: re-entering the label consumes one visit
            let seen = unrolling.seen(label);
            if seen + 1 >= self.cfg.unroll {
                self.too_far = true;
                log!(log::UNROLL, &format!("loop unrolling limit reached at {}", litmus.symtab.to_str(label)));
                Frag::too_far(label)
            } else {
                let unrolling = unrolling.visit(label);
                self.walk(tid, block, po, &unrolling, seen + 1)
            }
        } else {
            self.walk(tid, block, po, unrolling, unrolling.seen(label))
        }
    }
}

/// Symbolically execute every thread of the test under the given
/// semantics, producing the candidate abstract event structures.
/// Structure indices are contiguous from zero in generation order,
/// and the generation order is deterministic.
pub fn glommed_event_structures<C: Cst, S: Semantics<C>>(
    litmus: &Litmus<C, S::Instr>,
    sem: &S,
    cfg: &Config,
) -> Result<Glommed<C>, ExecError> {
    let mut labels_at: BTreeMap<u64, Vec<Name>> = BTreeMap::new();
    for (label, block) in &litmus.program {
        if let Some((addr, _)) = block.first() {
            labels_at.entry(*addr).or_insert_with(Vec::new).push(*label)
        }
    }

    let mut driver = Driver {
        litmus,
        sem,
        cfg,
        labels_at,
        ids: EidGen::new(),
        vars: SymGen::new(),
        too_far: false,
        err: None,
    };

    let mut composed: Frag<(), C> = Frag::unit(());
    for (tid, entry) in &litmus.starts {
        let thread = driver.thread(*tid, *entry);
        composed = composed.par(thread).map(|_| ())
    }
    if cfg.initwrites {
        let init_writes = Frag::init_writes(&litmus.init, &mut driver.ids);
        composed = composed.par(init_writes).map(|_| ())
    }

    if let Some(err) = driver.err {
        return Err(err);
    }

    let structures: Vec<(usize, Vec<Constraint<C>>, EventStructure<C>)> = composed
        .into_output()
        .into_iter()
        .enumerate()
        .map(|(i, (cnstrnts, es))| (i, cnstrnts, relabel(es)))
        .collect();

    log!(log::VERBOSE, &format!("{}: {} abstract event structure(s)", litmus.name, structures.len()));

    Ok(Glommed { structures, too_far: driver.too_far })
}
