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

//! A minimal load/store instruction set. Real architectures plug
//! into the driver through the same [Semantics] trait; this one
//! exists so the enumerator can be exercised without one, and is what
//! the test suite drives. Values flow between the events of an
//! instruction through shared symbolic variables, with explicit
//! intra-causality edges for the dependencies.

use skerry_lib::constraint::{Constraint, Expr, Op};
use skerry_lib::event::{Annots, Event, EventKind, Location};
use skerry_lib::symtab::Name;
use skerry_lib::value::{Cst, SymGen, Val};

use crate::compose::{EidGen, Frag};
use crate::semantics::{InstrInfo, Semantics, Verdict};

pub type Reg = Name;

#[derive(Copy, Clone, Debug)]
pub enum Operand {
    Imm(i64),
    Reg(Reg),
}

#[derive(Clone, Debug)]
pub enum Instr {
    /// `dst := src`
    Mov(Reg, Operand),
    /// `dst := lhs + rhs`
    Add(Reg, Reg, Operand),
    /// `dst := [addr]`
    Load { dst: Reg, addr: Name, annots: Annots },
    /// `[addr] := src`
    Store { addr: Name, src: Operand, annots: Annots },
    Fence,
    Jump(Name),
    /// Branch to the label when the register is non-zero.
    JumpNz(Reg, Name),
}

impl Instr {
    pub fn load(dst: Reg, addr: Name) -> Self {
        Instr::Load { dst, addr, annots: Annots::default() }
    }

    pub fn load_acquire(dst: Reg, addr: Name) -> Self {
        Instr::Load { dst, addr, annots: Annots::default().acquire() }
    }

    /// A load-reserve, one half of an atomic pair.
    pub fn load_reserve(dst: Reg, addr: Name) -> Self {
        Instr::Load { dst, addr, annots: Annots::default().atomic().exclusive() }
    }

    pub fn store(addr: Name, src: Operand) -> Self {
        Instr::Store { addr, src, annots: Annots::default() }
    }

    pub fn store_release(addr: Name, src: Operand) -> Self {
        Instr::Store { addr, src, annots: Annots::default().release() }
    }

    /// A store-conditional, the other half of an atomic pair.
    pub fn store_conditional(addr: Name, src: Operand) -> Self {
        Instr::Store { addr, src, annots: Annots::default().atomic().exclusive() }
    }
}

pub struct Isa;

impl Isa {
    fn read_reg<C: Cst, I>(ii: &InstrInfo<'_, I>, reg: Reg, ids: &mut EidGen, vars: &mut SymGen) -> (Frag<(), C>, Val<C>) {
        let value = Val::Var(vars.fresh());
        let ev = Event {
            id: ids.fresh(),
            thread: ii.thread,
            po: ii.po,
            kind: EventKind::RegRead,
            loc: Some(Location::Register(ii.thread, reg)),
            read: Some(value),
            written: None,
            annots: Annots::default(),
        };
        (Frag::event(ev), value)
    }

    fn write_reg<C: Cst, I>(ii: &InstrInfo<'_, I>, reg: Reg, value: Val<C>, ids: &mut EidGen) -> Frag<(), C> {
        Frag::event(Event {
            id: ids.fresh(),
            thread: ii.thread,
            po: ii.po,
            kind: EventKind::RegWrite,
            loc: Some(Location::Register(ii.thread, reg)),
            read: None,
            written: Some(value),
            annots: Annots::default(),
        })
    }

    /// An immediate is just a constant; a register operand reads the
    /// register and yields the value variable the read produced.
    fn operand<C: Cst, I>(ii: &InstrInfo<'_, I>, operand: Operand, ids: &mut EidGen, vars: &mut SymGen) -> (Frag<(), C>, Val<C>) {
        match operand {
            Operand::Imm(i) => (Frag::unit(()), Val::Cst(C::num(i))),
            Operand::Reg(reg) => Self::read_reg(ii, reg, ids, vars),
        }
    }
}

impl<C: Cst> Semantics<C> for Isa {
    type Instr = Instr;

    fn build_semantics(
        &self,
        ii: &InstrInfo<'_, Instr>,
        ids: &mut EidGen,
        vars: &mut SymGen,
    ) -> Frag<(usize, Verdict<C>), C> {
        let next = ii.po + 1;
        match ii.instr {
            Instr::Mov(dst, src) => {
                let (src, value) = Self::operand(ii, *src, ids, vars);
                src.seq_data(Self::write_reg(ii, *dst, value, ids)).map(move |_| (next, Verdict::Next))
            }

            Instr::Add(dst, lhs, rhs) => {
                let (lhs, lhs_value) = Self::read_reg::<C, _>(ii, *lhs, ids, vars);
                let (rhs, rhs_value) = Self::operand(ii, *rhs, ids, vars);
                let sum = Val::Var(vars.fresh());
                lhs.par(rhs)
                    .seq_data(Self::write_reg(ii, *dst, sum, ids))
                    .cnstrnt(Constraint::Assign(sum, Expr::Binop(Op::Add, lhs_value, rhs_value)))
                    .map(move |_| (next, Verdict::Next))
            }

            Instr::Load { dst, addr, annots } => {
                let value = Val::Var(vars.fresh());
                let read = Event {
                    id: ids.fresh(),
                    thread: ii.thread,
                    po: ii.po,
                    kind: EventKind::MemRead,
                    loc: Some(Location::global(*addr)),
                    read: Some(value),
                    written: None,
                    annots: *annots,
                };
                Frag::event(read).seq_data(Self::write_reg(ii, *dst, value, ids)).map(move |_| (next, Verdict::Next))
            }

            Instr::Store { addr, src, annots } => {
                let (src, value) = Self::operand(ii, *src, ids, vars);
                let write = Event {
                    id: ids.fresh(),
                    thread: ii.thread,
                    po: ii.po,
                    kind: EventKind::MemWrite,
                    loc: Some(Location::global(*addr)),
                    read: None,
                    written: Some(value),
                    annots: *annots,
                };
                src.seq_data(Frag::event(write)).map(move |_| (next, Verdict::Next))
            }

            Instr::Fence => {
                let fence = Event {
                    id: ids.fresh(),
                    thread: ii.thread,
                    po: ii.po,
                    kind: EventKind::Barrier,
                    loc: None,
                    read: None,
                    written: None,
                    annots: Annots::default(),
                };
                Frag::event(fence).map(move |_| (next, Verdict::Next))
            }

            Instr::Jump(label) => {
                let label = *label;
                Frag::unit((next, Verdict::Jump(label)))
            }

            Instr::JumpNz(reg, label) => {
                let (read, value) = Self::read_reg::<C, _>(ii, *reg, ids, vars);
                let commit = Event {
                    id: ids.fresh(),
                    thread: ii.thread,
                    po: ii.po,
                    kind: EventKind::Commit,
                    loc: None,
                    read: None,
                    written: None,
                    annots: Annots::default(),
                };
                let guard = Val::Var(vars.fresh());
                let label = *label;
                read.seq_ctrl(Frag::event(commit))
                    .cnstrnt(Constraint::Assign(guard, Expr::Binop(Op::Ne, value, Val::Cst(C::zero()))))
                    .map(move |_| (next, Verdict::CondJump(guard, label)))
            }
        }
    }

    /// Only a load-reserve may pair with a store-conditional.
    fn atomic_pair_allowed(&self, read: &Event<C>, write: &Event<C>) -> bool {
        read.annots.is_exclusive() && write.annots.is_exclusive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skerry_lib::symtab::Symtab;
    use skerry_lib::value::C64;

    fn info(instr: &Instr) -> InstrInfo<'_, Instr> {
        InstrInfo { po: 0, thread: 0, instr, unroll_count: 0, labels: &[] }
    }

    #[test]
    fn test_load_wires_memory_to_register() {
        let mut symtab = Symtab::new();
        let mut ids = EidGen::new();
        let mut vars = SymGen::new();
        let instr = Instr::load(symtab.intern("r0"), symtab.intern("x"));

        let frag: Frag<_, C64> = Isa.build_semantics(&info(&instr), &mut ids, &mut vars);
        assert_eq!(frag.branches.len(), 1);
        let br = &frag.branches[0];
        assert_eq!(br.es.events.len(), 2);
        assert_eq!(br.es.intra_data.len(), 1);

        let read = br.es.events.values().find(|ev| ev.is_memory_read()).unwrap();
        let write = br.es.events.values().find(|ev| ev.is_reg_write()).unwrap();
        // The register write carries the same value variable the load reads
        assert_eq!(read.read, write.written);
        assert!(br.es.intra_data.contains(read.id, write.id));
    }

    #[test]
    fn test_store_immediate_has_no_dependencies() {
        let mut symtab = Symtab::new();
        let mut ids = EidGen::new();
        let mut vars = SymGen::new();
        let instr = Instr::store(symtab.intern("x"), Operand::Imm(1));

        let frag: Frag<_, C64> = Isa.build_semantics(&info(&instr), &mut ids, &mut vars);
        let br = &frag.branches[0];
        assert_eq!(br.es.events.len(), 1);
        assert!(br.es.intra_data.is_empty());
        let write = br.es.events.values().next().unwrap();
        assert_eq!(write.written, Some(Val::Cst(C64::num(1))));
    }

    #[test]
    fn test_conditional_branch_has_a_ctrl_edge_and_a_symbolic_guard() {
        let mut symtab = Symtab::new();
        let mut ids = EidGen::new();
        let mut vars = SymGen::new();
        let instr = Instr::JumpNz(symtab.intern("r0"), symtab.intern("L"));

        let frag: Frag<_, C64> = Isa.build_semantics(&info(&instr), &mut ids, &mut vars);
        let br = &frag.branches[0];
        assert_eq!(br.es.intra_ctrl.len(), 1);
        assert_eq!(br.cnstrnts.len(), 1);
        match br.output.1 {
            Verdict::CondJump(guard, _) => assert!(!guard.is_determined()),
            _ => panic!("expected a conditional jump verdict"),
        }
    }
}
