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

//! The variable-equation language accumulated during symbolic
//! execution and reads-from enumeration, solved by [crate::solver].

use std::fmt;

use crate::event::Location;
use crate::state::State;
use crate::symtab::Name;
use crate::value::{Cst, Substitution, Val};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Eq,
    Ne,
}

impl Op {
    /// Evaluate over constants. Arithmetic is only defined on
    /// numbers; comparison works on any pair of constants and yields
    /// one or zero.
    pub fn eval<C: Cst>(self, lhs: C, rhs: C) -> Option<C> {
        match self {
            Op::Add => Some(C::num(lhs.as_num()?.wrapping_add(rhs.as_num()?))),
            Op::Sub => Some(C::num(lhs.as_num()?.wrapping_sub(rhs.as_num()?))),
            Op::Eq => Some(if lhs == rhs { C::one() } else { C::zero() }),
            Op::Ne => Some(if lhs == rhs { C::zero() } else { C::one() }),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Eq => write!(f, "=="),
            Op::Ne => write!(f, "!="),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expr<C: Cst> {
    Atom(Val<C>),
    /// The value the initial state holds at a location that is still
    /// symbolic. The state snapshot is captured by value when the
    /// constraint is created; the solver performs the lookup once the
    /// location becomes determined.
    ReadInit(Location<C>, State<C>),
    Binop(Op, Val<C>, Val<C>),
}

impl<C: Cst> Expr<C> {
    pub fn subst(&self, sigma: &Substitution<C>) -> Expr<C> {
        match self {
            Expr::Atom(v) => Expr::Atom(v.subst(sigma)),
            Expr::ReadInit(loc, state) => Expr::ReadInit(loc.subst(sigma), state.clone()),
            Expr::Binop(op, a, b) => Expr::Binop(*op, a.subst(sigma), b.subst(sigma)),
        }
    }
}

impl<C: Cst> fmt::Display for Expr<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Atom(v) => write!(f, "{}", v),
            Expr::ReadInit(loc, _) => write!(f, "init({})", loc),
            Expr::Binop(op, a, b) => write!(f, "{} {} {}", a, op, b),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Constraint<C: Cst> {
    Assign(Val<C>, Expr<C>),
    /// The sentinel attached when a trace was truncated at the loop
    /// unrolling bound for a label. Never solvable, so no execution
    /// containing one is ever delivered.
    Unroll(Name),
}

impl<C: Cst> Constraint<C> {
    pub fn eq(lhs: Val<C>, rhs: Val<C>) -> Self {
        Constraint::Assign(lhs, Expr::Atom(rhs))
    }

    pub fn is_unroll(&self) -> bool {
        matches!(self, Constraint::Unroll(_))
    }

    pub fn subst(&self, sigma: &Substitution<C>) -> Constraint<C> {
        match self {
            Constraint::Assign(lhs, rhs) => Constraint::Assign(lhs.subst(sigma), rhs.subst(sigma)),
            Constraint::Unroll(label) => Constraint::Unroll(*label),
        }
    }

    /// Both sides already determined and unequal. Callers use this to
    /// discard a reads-from choice without invoking the solver.
    pub fn direct_contradiction(&self) -> bool {
        match self {
            Constraint::Assign(Val::Cst(lhs), Expr::Atom(Val::Cst(rhs))) => lhs != rhs,
            _ => false,
        }
    }
}

impl<C: Cst> fmt::Display for Constraint<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Assign(lhs, rhs) => write!(f, "{} := {}", lhs, rhs),
            Constraint::Unroll(label) => write!(f, "unroll({})", label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::C64;

    #[test]
    fn test_op_eval() {
        assert_eq!(Op::Add.eval(C64::num(2), C64::num(3)), Some(C64::num(5)));
        assert_eq!(Op::Ne.eval(C64::num(2), C64::num(3)), Some(C64::num(1)));
        assert_eq!(Op::Eq.eval(C64::num(2), C64::num(3)), Some(C64::num(0)));
    }

    #[test]
    fn test_no_arithmetic_on_addresses() {
        let mut symtab = crate::symtab::Symtab::new();
        let x = C64::addr(symtab.intern("x"));
        assert_eq!(Op::Add.eval(x, C64::num(1)), None);
        assert_eq!(Op::Eq.eval(x, x), Some(C64::num(1)));
    }

    #[test]
    fn test_direct_contradiction() {
        let c = Constraint::eq(Val::Cst(C64::num(0)), Val::Cst(C64::num(1)));
        assert!(c.direct_contradiction());
        let c = Constraint::eq(Val::<C64>::Var(crate::value::Sym::from_u32(0)), Val::Cst(C64::num(1)));
        assert!(!c.direct_contradiction());
    }
}
