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

//! The contract between the instruction driver and an instruction
//! set. The driver hands the semantics one instruction at a time with
//! its context; the semantics answers with a fragment whose output is
//! the updated program-order index and a branching verdict.

use skerry_lib::event::{Event, ThreadId};
use skerry_lib::symtab::Name;
use skerry_lib::value::{Cst, SymGen, Val};

use crate::compose::{EidGen, Frag};

/// What the control flow does after an instruction.
#[derive(Copy, Clone, Debug)]
pub enum Verdict<C> {
    /// Fall through to the next instruction.
    Next,
    Jump(Name),
    /// Branch on a (possibly symbolic) guard value: taken when the
    /// guard is non-zero. The driver explores both sides via
    /// [Frag::choice].
    CondJump(Val<C>, Name),
}

/// The per-instruction context built by the driver.
pub struct InstrInfo<'a, I> {
    /// Program-order index of this instruction within its thread.
    pub po: usize,
    pub thread: ThreadId,
    pub instr: &'a I,
    /// How many times the enclosing loop label has been re-entered on
    /// this trace path; zero outside unrolled loops.
    pub unroll_count: usize,
    /// The labels attached to this instruction's address.
    pub labels: &'a [Name],
}

pub trait Semantics<C: Cst> {
    type Instr;

    /// Build the event fragment for one instruction. Event ids and
    /// symbolic variables are drawn from the generators the driver
    /// threads through every call.
    fn build_semantics(
        &self,
        ii: &InstrInfo<'_, Self::Instr>,
        ids: &mut EidGen,
        vars: &mut SymGen,
    ) -> Frag<(usize, Verdict<C>), C>;

    /// Whether the instruction set permits this atomic read and
    /// atomic write to form a paired unit (a load-reserve with its
    /// store-conditional, a lock with its unlock). Consulted by the
    /// atomic pair derivation during finalization.
    fn atomic_pair_allowed(&self, _read: &Event<C>, _write: &Event<C>) -> bool {
        true
    }
}
