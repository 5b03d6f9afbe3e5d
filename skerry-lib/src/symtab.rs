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

//! Interned identifiers for the names appearing in a test: memory
//! cells, registers, and code labels. Names are `u32` wrappers so
//! they can be compared, hashed, and ordered cheaply; the [Symtab]
//! owns the underlying strings.

use ahash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    id: u32,
}

impl Name {
    pub fn from_u32(id: u32) -> Self {
        Name { id }
    }

    pub fn to_u32(self) -> u32 {
        self.id
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Symtab {
    strings: Vec<String>,
    table: HashMap<String, Name, ahash::RandomState>,
}

impl Symtab {
    pub fn new() -> Self {
        Symtab { strings: Vec::new(), table: HashMap::default() }
    }

    pub fn intern(&mut self, sym: &str) -> Name {
        match self.table.get(sym) {
            None => {
                let name = Name::from_u32(self.strings.len() as u32);
                self.strings.push(sym.to_string());
                self.table.insert(sym.to_string(), name);
                name
            }
            Some(name) => *name,
        }
    }

    pub fn get(&self, sym: &str) -> Option<Name> {
        self.table.get(sym).copied()
    }

    /// Panics if the name was interned by a different symbol table.
    pub fn to_str(&self, name: Name) -> &str {
        &self.strings[name.to_u32() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_round_trip() {
        let mut symtab = Symtab::new();
        let x = symtab.intern("x");
        let y = symtab.intern("y");
        assert_ne!(x, y);
        assert_eq!(symtab.intern("x"), x);
        assert_eq!(symtab.to_str(x), "x");
        assert_eq!(symtab.get("y"), Some(y));
        assert_eq!(symtab.get("z"), None);
    }
}
