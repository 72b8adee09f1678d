use std::{fmt::Display, time::Duration};

#[derive(Debug, Default)]
pub(crate) struct Statistics {
    pub(crate) global: GlobalStats,
    pub(crate) refinement: RefinementStats,
}

#[derive(Debug, Default)]
pub(crate) struct GlobalStats {
    pub(crate) iterations: u32,
    pub(crate) solve_time: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct RefinementStats {
    pub(crate) expansion_variables: u32,
    pub(crate) blocking_clauses: u32,
}

/// Statistics of the formula under decision.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaStatistics {
    pub total_variables: usize,
    pub universal_variables: usize,
    pub existential_variables: usize,
    pub clauses: usize,
    pub max_clause_size: usize,
    pub avg_clause_size: f64,
    pub max_dependencies: usize,
}

impl Display for FormulaStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "variables: {}", self.total_variables)?;
        writeln!(f, "  universal: {}", self.universal_variables)?;
        writeln!(f, "  existential: {}", self.existential_variables)?;
        writeln!(f, "clauses: {}", self.clauses)?;
        writeln!(f, "  max size: {}", self.max_clause_size)?;
        writeln!(f, "  avg size: {:.2}", self.avg_clause_size)?;
        writeln!(f, "max dependencies: {}", self.max_dependencies)
    }
}
