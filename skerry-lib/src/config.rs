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

//! Runtime options for the enumerator, with a TOML loader so
//! frontends can keep per-test option files.

use toml::Value;

use crate::log;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Speedcheck {
    Off,
    On,
    /// Reserved for frontends that want to stop at the first
    /// interesting execution; the enumerator treats it as `On`.
    Fast,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Trace the constraint solver.
    pub solver: bool,
    /// Trace reads-from enumeration.
    pub rfm: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Diagnostic verbosity, 0 is silent.
    pub verbose: u32,
    /// Prune executions that could never satisfy the per-location
    /// program-order/coherence consistency requirement (uniproc).
    pub optace: bool,
    /// How many times a back-jump target may be entered on a single
    /// trace before the trace is truncated.
    pub unroll: usize,
    pub speedcheck: Speedcheck,
    /// Only enumerate final stores for locations the observation
    /// clause mentions.
    pub observed_finals_only: bool,
    /// Model initial values as explicit init-write events instead of
    /// an implicit `Init` reads-from source.
    pub initwrites: bool,
    /// Apply the test's filter predicate to final states.
    pub check_filter: bool,
    pub debug: DebugFlags,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbose: 0,
            optace: true,
            unroll: 2,
            speedcheck: Speedcheck::Off,
            observed_finals_only: false,
            initwrites: false,
            check_filter: true,
            debug: DebugFlags::default(),
        }
    }
}

fn get_bool(config: &Value, key: &str, default: bool) -> Result<bool, String> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| format!("{} should be a boolean in configuration", key)),
    }
}

fn get_int(config: &Value, key: &str, default: u64) -> Result<u64, String> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => match v.as_integer() {
            Some(i) if i >= 0 => Ok(i as u64),
            _ => Err(format!("{} should be a non-negative integer in configuration", key)),
        },
    }
}

fn get_speedcheck(config: &Value) -> Result<Speedcheck, String> {
    match config.get("speedcheck") {
        None => Ok(Speedcheck::Off),
        Some(v) => match v.as_str() {
            Some("off") => Ok(Speedcheck::Off),
            Some("on") => Ok(Speedcheck::On),
            Some("fast") => Ok(Speedcheck::Fast),
            _ => Err("speedcheck should be one of \"off\", \"on\", \"fast\" in configuration".to_string()),
        },
    }
}

fn get_debug(config: &Value) -> Result<DebugFlags, String> {
    match config.get("debug") {
        None => Ok(DebugFlags::default()),
        Some(table) => Ok(DebugFlags {
            solver: get_bool(table, "solver", false)?,
            rfm: get_bool(table, "rfm", false)?,
        }),
    }
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config = match contents.parse::<Value>() {
            Ok(config) => config,
            Err(e) => return Err(format!("Error when parsing configuration: {}", e)),
        };
        let defaults = Config::default();

        Ok(Config {
            verbose: get_int(&config, "verbose", defaults.verbose as u64)? as u32,
            optace: get_bool(&config, "optace", defaults.optace)?,
            unroll: get_int(&config, "unroll", defaults.unroll as u64)? as usize,
            speedcheck: get_speedcheck(&config)?,
            observed_finals_only: get_bool(&config, "observed_finals_only", defaults.observed_finals_only)?,
            initwrites: get_bool(&config, "initwrites", defaults.initwrites)?,
            check_filter: get_bool(&config, "check_filter", defaults.check_filter)?,
            debug: get_debug(&config)?,
        })
    }

    /// The logging flag word this configuration asks for, to be
    /// passed to [crate::log::set_flags] by the frontend.
    pub fn log_flags(&self) -> u32 {
        let mut flags = 0u32;
        if self.verbose > 0 {
            flags |= log::VERBOSE | log::UNROLL
        }
        if self.verbose > 1 {
            flags |= log::RFM | log::FINAL
        }
        if self.debug.solver {
            flags |= log::SOLVER
        }
        if self.debug.rfm {
            flags |= log::RFM
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.unroll, 2);
        assert!(config.optace);
        assert!(!config.initwrites);
        assert_eq!(config.speedcheck, Speedcheck::Off);
    }

    #[test]
    fn test_parse() {
        let contents = r#"
            verbose = 1
            unroll = 4
            optace = false
            initwrites = true
            speedcheck = "fast"

            [debug]
            solver = true
        "#;
        let config = Config::parse(contents).unwrap();
        assert_eq!(config.verbose, 1);
        assert_eq!(config.unroll, 4);
        assert!(!config.optace);
        assert!(config.initwrites);
        assert_eq!(config.speedcheck, Speedcheck::Fast);
        assert!(config.debug.solver);
        assert!(!config.debug.rfm);
        assert!(config.log_flags() & log::SOLVER > 0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::parse("unroll = -1").is_err());
        assert!(Config::parse("speedcheck = \"sometimes\"").is_err());
        assert!(Config::parse("optace = 3").is_err());
    }
}
