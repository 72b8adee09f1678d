#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_panics_doc, clippy::module_name_repetitions)]

use std::{
    fmt::Display,
    process::{ExitCode, Termination},
};

#[macro_use]
pub mod dqcnf;
pub mod cegar;
pub mod cli;
pub mod counter;
pub mod dqdimacs;
pub mod literal;
pub mod sat;
pub mod vartable;

// Re-export
pub use cegar::{Cegar, DqbfInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SolverResult {
    Satisfiable = 10,
    Unsatisfiable = 20,
    Unknown = 30,
}

impl Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Satisfiable => write!(f, "satisfiable"),
            SolverResult::Unsatisfiable => write!(f, "unsatisfiable"),
            SolverResult::Unknown => write!(f, "unknown"),
        }
    }
}

impl Termination for SolverResult {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}
