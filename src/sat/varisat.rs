//! Implementation of SAT solver interface for (varisat)[https://crates.io/crates/varisat].

use super::SatSolver;
use crate::literal::Lit;
use varisat::ExtendFormula;

pub struct Varisat<'a> {
    solver: varisat::Solver<'a>,
}

impl From<Lit> for varisat::Lit {
    fn from(lit: Lit) -> Self {
        varisat::Lit::from_dimacs(lit.to_dimacs().try_into().unwrap())
    }
}

impl From<varisat::Lit> for Lit {
    fn from(vlit: varisat::Lit) -> Self {
        Lit::from_dimacs(vlit.to_dimacs().try_into().unwrap())
    }
}

impl<'a> SatSolver for Varisat<'a> {
    type Err = varisat::solver::SolverError;

    fn add_clause(&mut self, lits: &[Lit]) {
        let lits: Vec<varisat::Lit> = lits.iter().map(|&lit| lit.into()).collect();
        self.solver.add_clause(&lits);
    }

    fn solve_with_assumptions(&mut self, assumptions: &[Lit]) -> Result<bool, Self::Err> {
        let assumptions: Vec<varisat::Lit> = assumptions.iter().map(|&lit| lit.into()).collect();
        self.solver.assume(&assumptions);
        let result = self.solver.solve()?;
        Ok(result)
    }

    fn model(&mut self) -> Option<Vec<Lit>> {
        Some(self.solver.model()?.into_iter().map(Lit::from).collect())
    }

    fn failed_assumptions(&mut self) -> Option<Vec<Lit>> {
        Some(self.solver.failed_core()?.iter().map(|&vlit| Lit::from(vlit)).collect())
    }
}

impl<'a> Default for Varisat<'a> {
    fn default() -> Self {
        Self { solver: varisat::Solver::new() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_basic() -> Result<(), Box<dyn std::error::Error>> {
        crate::sat::test::test_basic::<Varisat>()
    }
}
