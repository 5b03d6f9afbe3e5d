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

//! The entry points tying the pipeline together: register resolution,
//! memory reads-from enumeration, and finalization, with fold-style
//! continuations for delivered executions and loop-bound rejections.

use skerry_lib::config::Config;
use skerry_lib::constraint::Constraint;
use skerry_lib::error::ExecError;
use skerry_lib::event::EventStructure;
use skerry_lib::log;
use skerry_lib::value::Cst;

use crate::driver;
use crate::finals::{self, Concrete};
use crate::litmus::Litmus;
use crate::memrf;
use crate::regs;
use crate::rfmap::RfMap;
use crate::semantics::Semantics;
use crate::validity;

#[allow(clippy::too_many_arguments)]
fn when_unsolved<C, I, A, FL>(
    litmus: &Litmus<C, I>,
    es: &EventStructure<C>,
    rfmap: &RfMap<C>,
    residual: &[Constraint<C>],
    loop_reported: &mut bool,
    on_loop_exceeded: &mut FL,
    acc: A,
) -> A
where
    C: Cst,
    FL: FnMut(A) -> A,
{
    if residual.iter().all(Constraint::is_unroll) {
        // The trace was truncated at the unrolling bound; report it
        // once per structure however many tuples die on it
        if *loop_reported {
            acc
        } else {
            *loop_reported = true;
            for cnstrnt in residual {
                if let Constraint::Unroll(label) = cnstrnt {
                    log!(log::UNROLL, &format!("unrolling too deep at {}", litmus.symtab.to_str(*label)))
                }
            }
            on_loop_exceeded(acc)
        }
    } else {
        // An unsolvable system without unroll sentinels can only come
        // from a reads-from choice that is cyclic with causality
        debug_assert!(
            validity::rfmap_is_cyclic(es, rfmap),
            "unsolvable residual on an acyclic reads-from candidate"
        );
        log!(log::RFM, "dropping candidate with unsolvable constraints");
        acc
    }
}

/// Resolve and enumerate the reads-from of one abstract event
/// structure, delivering every concrete execution via `on_concrete`
/// and every loop-bound rejection via `on_loop_exceeded`, fold-style.
#[allow(clippy::too_many_arguments)]
pub fn calculate_rf_with_cnstrnts<C, S, A, FC, FL>(
    litmus: &Litmus<C, S::Instr>,
    sem: &S,
    cfg: &Config,
    es: &EventStructure<C>,
    cnstrnts: &[Constraint<C>],
    mut on_concrete: FC,
    mut on_loop_exceeded: FL,
    acc: A,
) -> A
where
    C: Cst,
    S: Semantics<C>,
    FC: FnMut(Concrete<C>, A) -> A,
    FL: FnMut(A) -> A,
{
    let resolved = match regs::solve_regs(&litmus.init, es, cnstrnts) {
        None => return acc,
        Some(resolved) => resolved,
    };

    let mut acc = Some(acc);
    let mut loop_reported = false;
    memrf::solve_mem(&litmus.init, cfg, &resolved, |es, rfmap, residual| {
        let a = acc.take().unwrap();
        let a = if !residual.is_empty() {
            when_unsolved(litmus, &es, &rfmap, &residual, &mut loop_reported, &mut on_loop_exceeded, a)
        } else if cfg.optace && !validity::check_rfmap(&es, &rfmap) {
            log!(log::RFM, "intervening write rejects reads-from candidate");
            a
        } else {
            finals::fold_mem_finals(litmus, sem, cfg, &es, &rfmap, &mut on_concrete, a)
        };
        acc = Some(a)
    });
    acc.unwrap()
}

/// Run the whole pipeline over a test: generate the abstract event
/// structures and fold every concrete execution of every structure
/// through the continuations. Returns the accumulator and whether any
/// trace hit the loop unrolling bound.
pub fn candidate_executions<C, S, A, FC, FL>(
    litmus: &Litmus<C, S::Instr>,
    sem: &S,
    cfg: &Config,
    mut on_concrete: FC,
    mut on_loop_exceeded: FL,
    mut acc: A,
) -> Result<(A, bool), ExecError>
where
    C: Cst,
    S: Semantics<C>,
    FC: FnMut(Concrete<C>, A) -> A,
    FL: FnMut(A) -> A,
{
    let glommed = driver::glommed_event_structures(litmus, sem, cfg)?;
    for (index, cnstrnts, es) in &glommed.structures {
        log!(log::VERBOSE, &format!("structure {}: {} event(s)", index, es.events.len()));
        acc = calculate_rf_with_cnstrnts(litmus, sem, cfg, es, cnstrnts, &mut on_concrete, &mut on_loop_exceeded, acc)
    }
    Ok((acc, glommed.too_far))
}
