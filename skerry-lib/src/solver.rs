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

//! The equation solver. Constraint sets over litmus-test values are
//! equality driven, so a worklist that repeatedly substitutes known
//! bindings, evaluates determined expressions, and binds variables is
//! complete for them; anything left over is returned as the residual
//! for the caller to classify.

use crate::constraint::{Constraint, Expr};
use crate::log;
use crate::value::{Cst, Substitution, Val};

pub enum Answer<C: Cst> {
    /// The constraint set is unsatisfiable.
    NoSolns,
    /// A substitution for every variable the equations determine,
    /// plus the constraints that remain undetermined under it.
    Maybe(Substitution<C>, Vec<Constraint<C>>),
}

fn simplify<C: Cst>(expr: Expr<C>) -> Expr<C> {
    match expr {
        Expr::Binop(op, Val::Cst(a), Val::Cst(b)) => match op.eval(a, b) {
            Some(c) => Expr::Atom(Val::Cst(c)),
            // Undefined applications (arithmetic on an address) stay
            // residual rather than failing the whole system.
            None => Expr::Binop(op, Val::Cst(a), Val::Cst(b)),
        },
        Expr::ReadInit(loc, state) => {
            if loc.is_determined() {
                Expr::Atom(Val::Cst(state.read(&loc)))
            } else {
                Expr::ReadInit(loc, state)
            }
        }
        expr => expr,
    }
}

/// Solve a constraint set. Each pass substitutes the bindings found
/// so far into every remaining constraint, so a pass either makes
/// progress or the system has reached its residual fixed point.
pub fn solve<C: Cst>(cnstrnts: Vec<Constraint<C>>) -> Answer<C> {
    let mut sigma = Substitution::new();
    let mut work = cnstrnts;

    loop {
        let mut progress = false;
        let mut residual = Vec::new();

        for cnstrnt in work {
            match cnstrnt.subst(&sigma) {
                Constraint::Unroll(label) => residual.push(Constraint::Unroll(label)),

                Constraint::Assign(lhs, rhs) => match simplify(rhs) {
                    Expr::Atom(rhs) => match (lhs, rhs) {
                        (Val::Cst(a), Val::Cst(b)) => {
                            if a == b {
                                progress = true
                            } else {
                                log!(log::SOLVER, &format!("contradiction {} /= {}", a, b));
                                return Answer::NoSolns;
                            }
                        }
                        (Val::Var(v), Val::Var(w)) if v == w => progress = true,
                        (Val::Var(v), rhs) => {
                            sigma.bind(v, rhs);
                            progress = true
                        }
                        (Val::Cst(a), Val::Var(v)) => {
                            sigma.bind(v, Val::Cst(a));
                            progress = true
                        }
                    },
                    rhs => residual.push(Constraint::Assign(lhs, rhs)),
                },
            }
        }

        if !progress {
            log!(log::SOLVER, &format!("solved with {} residual constraint(s)", residual.len()));
            return Answer::Maybe(sigma, residual);
        }
        work = residual;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Op;
    use crate::event::Location;
    use crate::state::State;
    use crate::symtab::Symtab;
    use crate::value::{Sym, SymGen, C64};

    fn var(gen: &mut SymGen) -> Val<C64> {
        Val::Var(gen.fresh())
    }

    fn num(i: i64) -> Val<C64> {
        Val::Cst(C64::num(i))
    }

    #[test]
    fn test_solve_chain() {
        let mut gen = SymGen::new();
        let (a, b) = (var(&mut gen), var(&mut gen));
        let cs = vec![Constraint::eq(a, b), Constraint::eq(b, num(3))];
        match solve(cs) {
            Answer::Maybe(sigma, residual) => {
                assert!(residual.is_empty());
                assert_eq!(a.subst(&sigma), num(3));
                assert_eq!(b.subst(&sigma), num(3));
            }
            Answer::NoSolns => panic!("expected a solution"),
        }
    }

    #[test]
    fn test_solve_contradiction() {
        let mut gen = SymGen::new();
        let a = var(&mut gen);
        let cs = vec![Constraint::eq(a, num(0)), Constraint::eq(a, num(1))];
        assert!(matches!(solve(cs), Answer::NoSolns))
    }

    #[test]
    fn test_binop_propagates() {
        let mut gen = SymGen::new();
        let (a, b) = (var(&mut gen), var(&mut gen));
        let cs = vec![
            Constraint::Assign(b, Expr::Binop(Op::Add, a, num(1))),
            Constraint::eq(a, num(41)),
        ];
        match solve(cs) {
            Answer::Maybe(sigma, residual) => {
                assert!(residual.is_empty());
                assert_eq!(b.subst(&sigma), num(42));
            }
            Answer::NoSolns => panic!("expected a solution"),
        }
    }

    #[test]
    fn test_unroll_is_residual() {
        let mut symtab = Symtab::new();
        let label = symtab.intern("loop");
        let cs = vec![Constraint::<C64>::Unroll(label)];
        match solve(cs) {
            Answer::Maybe(_, residual) => {
                assert_eq!(residual.len(), 1);
                assert!(residual[0].is_unroll());
            }
            Answer::NoSolns => panic!("unroll sentinels are not contradictions"),
        }
    }

    #[test]
    fn test_read_init_resolves_once_location_is_determined() {
        let mut symtab = Symtab::new();
        let mut gen = SymGen::new();
        let x = symtab.intern("x");

        let mut init = State::new();
        init.bind(Location::global(x), C64::num(7));

        let addr = gen.fresh();
        let value = var(&mut gen);
        let cs = vec![
            Constraint::Assign(value, Expr::ReadInit(Location::Global(Val::Var(addr)), init)),
            Constraint::eq(Val::Var(addr), Val::Cst(C64::addr(x))),
        ];
        match solve(cs) {
            Answer::Maybe(sigma, residual) => {
                assert!(residual.is_empty());
                assert_eq!(value.subst(&sigma), num(7));
            }
            Answer::NoSolns => panic!("expected a solution"),
        }
    }

    #[test]
    fn test_var_var_cycle_collapses() {
        let a = Val::<C64>::Var(Sym::from_u32(0));
        let b = Val::<C64>::Var(Sym::from_u32(1));
        let cs = vec![Constraint::eq(a, b), Constraint::eq(b, a), Constraint::eq(a, num(5))];
        match solve(cs) {
            Answer::Maybe(sigma, residual) => {
                assert!(residual.is_empty());
                assert_eq!(b.subst(&sigma), num(5));
            }
            Answer::NoSolns => panic!("expected a solution"),
        }
    }
}
