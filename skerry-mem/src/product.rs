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

/// A streaming cartesian product over a slice of per-dimension
/// choices, used for reads-from tuples and final-store selections.
/// Tuples come out in odometer order, so the enumeration is
/// deterministic and nothing is ever materialized. With zero
/// dimensions it yields exactly one empty tuple; with any empty
/// dimension it yields nothing.
pub struct Product<'a, A> {
    index: Vec<usize>,
    max_index: Vec<usize>,
    dims: &'a [Vec<A>],
    out_of_bounds: bool,
}

impl<'a, A> Product<'a, A> {
    pub fn new(dims: &'a [Vec<A>]) -> Self {
        Product {
            index: vec![0; dims.len()],
            max_index: dims.iter().map(|dim| dim.len()).collect(),
            dims,
            out_of_bounds: !dims.iter().all(|dim| !dim.is_empty()),
        }
    }

    pub fn total(&self) -> usize {
        if self.out_of_bounds {
            0
        } else {
            self.max_index.iter().product()
        }
    }
}

fn increment_index(index: &mut [usize], max_index: &[usize], carry: usize) -> bool {
    if carry == index.len() {
        return true;
    }

    index[carry] += 1;
    if index[carry] == max_index[carry] {
        index[carry] = 0;
        increment_index(index, max_index, carry + 1)
    } else {
        false
    }
}

impl<'a, A> Iterator for Product<'a, A> {
    type Item = Vec<&'a A>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.out_of_bounds {
            None
        } else {
            let mut result = Vec::with_capacity(self.dims.len());
            self.dims.iter().zip(self.index.iter()).for_each(|(dim, i)| result.push(&dim[*i]));
            self.out_of_bounds = increment_index(&mut self.index, &self.max_index, 0);
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_order() {
        let dims = vec![vec![0, 1], vec![10, 20]];
        let tuples: Vec<Vec<i32>> = Product::new(&dims).map(|t| t.into_iter().copied().collect()).collect();
        assert_eq!(tuples, vec![vec![0, 10], vec![1, 10], vec![0, 20], vec![1, 20]])
    }

    #[test]
    fn test_zero_dimensions_yield_one_empty_tuple() {
        let dims: Vec<Vec<i32>> = Vec::new();
        let tuples: Vec<_> = Product::new(&dims).collect();
        assert_eq!(tuples.len(), 1);
        assert!(tuples[0].is_empty())
    }

    #[test]
    fn test_empty_dimension_yields_nothing() {
        let dims = vec![vec![1], Vec::new()];
        assert_eq!(Product::new(&dims).count(), 0);
        assert_eq!(Product::new(&dims).total(), 0)
    }
}
