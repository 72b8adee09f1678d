//! Generic SAT solver interface that supports incremental solving

use crate::literal::Lit;

#[cfg(feature = "cryptominisat")]
pub mod cmsat;
pub mod varisat;

/// Incremental SAT solver service.
///
/// Clauses and assumptions are given as [`crate::literal::Lit`] over the id
/// namespace shared by all services in one solver; backends translate to
/// their own literal representation. Several independent instances may
/// coexist in one process, each with its own clause database.
pub trait SatSolver: Default {
    type Err: std::error::Error + Send + Sync + 'static;

    fn add_clause(&mut self, lits: &[Lit]);
    fn solve_with_assumptions(&mut self, assumptions: &[Lit]) -> Result<bool, Self::Err>;
    /// Total assignment over all variables known to the backend.
    /// Available after a satisfiable solve call.
    fn model(&mut self) -> Option<Vec<Lit>>;
    /// Subset of the last assumptions sufficient for infeasibility
    /// (possibly empty). Available after an unsatisfiable solve call.
    fn failed_assumptions(&mut self) -> Option<Vec<Lit>>;

    fn solve(&mut self) -> Result<bool, Self::Err> {
        self.solve_with_assumptions(&[])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    pub(crate) fn test_basic<S: SatSolver>() -> Result<(), Box<dyn std::error::Error>> {
        let mut solver = S::default();

        let x = Lit::from_dimacs(1);
        let y = Lit::from_dimacs(2);
        let z = Lit::from_dimacs(3);

        solver.add_clause(&[!x, y]);
        solver.add_clause(&[!y, z]);
        assert!(solver.solve()?);

        solver.add_clause(&[!z, x]);
        assert!(solver.solve()?);

        let model = solver.model().unwrap();
        assert!(
            [x, y, z].into_iter().all(|lit| model.contains(&lit))
                || [!x, !y, !z].into_iter().all(|lit| model.contains(&lit))
        );

        // solve with assumptions
        let ignore_clauses = Lit::from_dimacs(4);
        solver.add_clause(&[ignore_clauses, !z, !y]);
        solver.add_clause(&[ignore_clauses, z, y]);

        assert!(!solver.solve_with_assumptions(&[!ignore_clauses])?);
        let failed = solver.failed_assumptions().unwrap();
        assert!(failed.contains(&!ignore_clauses));

        solver.add_clause(&[ignore_clauses]);
        assert!(solver.solve()?);

        Ok(())
    }
}
