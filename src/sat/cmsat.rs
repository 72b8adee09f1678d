//! Implementation of SAT solver interface for (cryptominisat)[https://crates.io/crates/cryptominisat].

use std::convert::Infallible;

use cryptominisat::Lbool;

use super::SatSolver;
use crate::literal::{Lit, Var};

pub struct CryptoMiniSat {
    solver: cryptominisat::Solver,
    num_vars: u32,
}

impl CryptoMiniSat {
    /// The backend requires variables to be allocated before use.
    fn reserve(&mut self, lits: &[Lit]) {
        let needed = lits.iter().map(|lit| lit.var().as_index() + 1).max().unwrap_or(0);
        while (self.num_vars as usize) < needed {
            self.solver.new_var();
            self.num_vars += 1;
        }
    }

    fn convert(lit: Lit) -> cryptominisat::Lit {
        cryptominisat::Lit::new(lit.var().as_index().try_into().unwrap(), lit.is_negative())
            .expect("reserved variable index is in range")
    }

    fn convert_back(lit: cryptominisat::Lit) -> Lit {
        Var::from_index(lit.var()).lit(!lit.isneg())
    }
}

impl SatSolver for CryptoMiniSat {
    type Err = Infallible;

    fn add_clause(&mut self, lits: &[Lit]) {
        self.reserve(lits);
        let lits: Vec<cryptominisat::Lit> = lits.iter().map(|&lit| Self::convert(lit)).collect();
        self.solver.add_clause(&lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Lit]) -> Result<bool, Self::Err> {
        self.reserve(assumptions);
        let assumptions: Vec<cryptominisat::Lit> =
            assumptions.iter().map(|&lit| Self::convert(lit)).collect();
        match self.solver.solve_with_assumptions(&assumptions) {
            Lbool::True => Ok(true),
            Lbool::False => Ok(false),
            Lbool::Undef => unreachable!("solving without limits cannot be indeterminate"),
        }
    }

    fn model(&mut self) -> Option<Vec<Lit>> {
        Some(
            self.solver
                .get_model()
                .iter()
                .enumerate()
                .filter_map(|(idx, &value)| {
                    let polarity = match value {
                        Lbool::True => true,
                        Lbool::False => false,
                        Lbool::Undef => return None,
                    };
                    Some(Var::from_index(idx.try_into().unwrap()).lit(polarity))
                })
                .collect(),
        )
    }

    fn failed_assumptions(&mut self) -> Option<Vec<Lit>> {
        // the conflict is reported as a clause over the negated assumptions
        Some(self.solver.get_conflict().iter().map(|&lit| !Self::convert_back(lit)).collect())
    }
}

impl Default for CryptoMiniSat {
    fn default() -> Self {
        Self { solver: cryptominisat::Solver::new(), num_vars: 0 }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_basic() -> Result<(), Box<dyn std::error::Error>> {
        crate::sat::test::test_basic::<CryptoMiniSat>()
    }
}
