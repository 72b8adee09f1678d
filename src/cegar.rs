//! Counterexample-guided expansion refinement for DQBF.
//!
//! The solver keeps a candidate Skolem model for every existential variable
//! as an ordered decision list encoded into the *counterexample solver* and
//! refines it with expansion variables until either no counterexample is
//! left (satisfiable) or the *expansion solver* runs out of assignments to
//! the expansion variables (unsatisfiable).

use self::{
    decision_list::DecisionLists,
    expansion::ExpansionRegistry,
    stats::{FormulaStatistics, Statistics},
};
use crate::{
    counter::VarCounter,
    literal::{Lit, Var},
    sat::{varisat::Varisat, SatSolver},
    vartable::{NamedLits, VarTable},
    SolverResult,
};
use derivative::Derivative;
use miette::Diagnostic;
use std::{
    collections::{BTreeMap, HashSet},
    time::Instant,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub(crate) mod decision_list;
pub(crate) mod equivalence;
pub(crate) mod expansion;
pub mod stats;

#[cfg(test)]
mod test;

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("variable `{0}` is not registered")]
    UnknownVariable(String),

    #[error("variable {0} is not an existential variable")]
    InvalidExistential(Var),

    #[error("existential {0} has no decision list yet")]
    UninitializedExistential(Var),

    #[error("literal {lit} is outside the dependency set of existential {var}")]
    AssignmentOutsideDependencies { var: Var, lit: Lit },
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error("SAT service failure")]
    SatService(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    fn from_sat<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::SatService(Box::new(err))
    }
}

/// Constructor inputs, as produced by a frontend such as
/// [`crate::dqcnf::DQCNF::instantiate`].
#[derive(Debug, Clone)]
pub struct DqbfInstance {
    /// Name registry covering every variable of the matrix.
    pub vars: VarTable,
    /// Existential variable names with their ordered universal dependencies.
    pub dependencies: Vec<(String, Vec<String>)>,
    /// CNF of the quantifier-free body, Tseitin gates included.
    pub matrix: Vec<Vec<Lit>>,
    /// Universal variable names in order of introduction.
    pub universals: Vec<String>,
    /// Id whose truth means "the matrix is satisfied".
    pub output_gate: Var,
}

/// Ordered universal dependencies of one existential variable.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencySet {
    pub(crate) order: Vec<Var>,
    set: HashSet<Var>,
}

impl DependencySet {
    fn new(order: Vec<Var>) -> Self {
        let set = order.iter().copied().collect();
        Self { order, set }
    }

    pub(crate) fn contains(&self, var: Var) -> bool {
        self.set.contains(&var)
    }
}

/// A verified counterexample: the existential literals responsible for the
/// violation and the universal assignment enabling it, both sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Counterexample {
    pub(crate) existential_core: Vec<Lit>,
    pub(crate) universal_assignment: Vec<Lit>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Cegar<S: SatSolver = Varisat<'static>> {
    pub(crate) vars: VarTable,
    matrix: Vec<Vec<Lit>>,
    output_gate: Var,
    pub(crate) universals: Vec<Var>,
    universal_set: HashSet<Var>,
    pub(crate) existentials: Vec<Var>,
    existential_set: HashSet<Var>,
    pub(crate) deps: BTreeMap<Var, DependencySet>,
    pub(crate) counter: VarCounter,
    pub(crate) lists: DecisionLists,
    pub(crate) expansion: ExpansionRegistry,
    expansion_assignment: Vec<Lit>,
    #[derivative(Debug = "ignore")]
    counterexample_solver: S,
    #[derivative(Debug = "ignore")]
    expansion_solver: S,
    last_counterexample: Option<Counterexample>,
    pub(crate) stats: Statistics,
}

impl<S: SatSolver> Cegar<S> {
    /// Creates a solver from frontend output.
    ///
    /// When no counter is supplied, the fresh-id watermark is computed from
    /// the registry and the matrix. The counterexample solver is
    /// bootstrapped with the matrix and a decision list is initialized for
    /// every existential.
    ///
    /// # Errors
    ///
    /// Fails if a dependency or universal name is not registered.
    pub fn new(instance: DqbfInstance, counter: Option<VarCounter>) -> Result<Self, ModelError> {
        let DqbfInstance { vars, dependencies, matrix, universals, output_gate } = instance;

        let resolve = |name: &str| {
            vars.id(name).ok_or_else(|| ModelError::UnknownVariable(name.to_owned()))
        };
        let universals: Vec<Var> =
            universals.iter().map(|name| resolve(name)).collect::<Result<_, _>>()?;
        let mut existentials = Vec::with_capacity(dependencies.len());
        let mut deps = BTreeMap::new();
        for (name, dep_names) in &dependencies {
            let existential = resolve(name)?;
            let order: Vec<Var> =
                dep_names.iter().map(|name| resolve(name)).collect::<Result<_, _>>()?;
            existentials.push(existential);
            deps.insert(existential, DependencySet::new(order));
        }

        let counter = counter.unwrap_or_else(|| {
            let matrix_max =
                matrix.iter().flatten().map(|lit| lit.var().to_dimacs()).max().unwrap_or(0);
            VarCounter::new(vars.max_id().unwrap_or(0).max(matrix_max))
        });

        let mut counterexample_solver = S::default();
        for clause in &matrix {
            counterexample_solver.add_clause(clause);
        }

        let mut solver = Self {
            vars,
            matrix,
            output_gate,
            universal_set: universals.iter().copied().collect(),
            universals,
            existential_set: existentials.iter().copied().collect(),
            existentials,
            deps,
            counter,
            lists: DecisionLists::default(),
            expansion: ExpansionRegistry::default(),
            expansion_assignment: Vec::new(),
            counterexample_solver,
            expansion_solver: S::default(),
            last_counterexample: None,
            stats: Statistics::default(),
        };
        for idx in 0..solver.existentials.len() {
            let existential = solver.existentials[idx];
            solver.init_model(existential)?;
        }
        Ok(solver)
    }

    /// Initializes the decision list of `existential`.
    /// A second call for the same variable is a no-op.
    pub(crate) fn init_model(&mut self, existential: Var) -> Result<(), ModelError> {
        if !self.existential_set.contains(&existential) {
            return Err(ModelError::InvalidExistential(existential));
        }
        self.lists.init(
            existential,
            &mut self.counterexample_solver,
            &mut self.counter,
            &mut self.vars,
        );
        Ok(())
    }

    pub(crate) fn set_default(&mut self, existential: Var, value: bool) -> Result<(), ModelError> {
        if !self.existential_set.contains(&existential) {
            return Err(ModelError::InvalidExistential(existential));
        }
        self.lists.set_default(existential, value)
    }

    /// Returns the expansion variable of `existential` under `assignment`,
    /// creating it (and its decision-list rule) on first use.
    pub(crate) fn get_expansion(
        &mut self,
        existential: Var,
        assignment: &[Lit],
    ) -> Result<Var, ModelError> {
        if !self.existential_set.contains(&existential) {
            return Err(ModelError::InvalidExistential(existential));
        }
        let deps = &self.deps[&existential];
        self.expansion.get_or_insert(
            existential,
            assignment,
            deps,
            &mut self.lists,
            &mut self.counterexample_solver,
            &mut self.counter,
            &mut self.vars,
        )
    }

    /// Searches for a universal assignment under which the candidate model
    /// violates the matrix.
    ///
    /// Returns `None` if the candidate model is correct. Otherwise the
    /// counterexample is re-verified with the output gate asserted; that
    /// query must be unsatisfiable and its core, restricted to existential
    /// ids, names the functions responsible for the violation.
    fn get_counterexample(&mut self) -> Result<Option<Counterexample>, Error> {
        let mut assumptions = vec![self.output_gate.negative()];
        self.lists.model_assumptions(&mut assumptions);
        assumptions.extend_from_slice(&self.expansion_assignment);
        debug!(
            "counterexample query with {} assumptions: {}",
            assumptions.len(),
            NamedLits::new(&assumptions, &self.vars)
        );

        if !self.counterexample_solver.solve_with_assumptions(&assumptions).map_err(Error::from_sat)? {
            debug!("no counterexample, the candidate model is correct");
            return Ok(None);
        }

        let model = self.counterexample_solver.model().expect("model is available after SAT");
        let mut universal_assignment: Vec<Lit> =
            model.iter().copied().filter(|lit| self.universal_set.contains(&lit.var())).collect();
        let mut existential_assignment: Vec<Lit> =
            model.iter().copied().filter(|lit| self.existential_set.contains(&lit.var())).collect();
        universal_assignment.sort_unstable_by_key(|l| Lit::var(*l));
        existential_assignment.sort_unstable_by_key(|l| Lit::var(*l));
        debug!(
            "potential counterexample: existentials {}, universals {}",
            NamedLits::new(&existential_assignment, &self.vars),
            NamedLits::new(&universal_assignment, &self.vars)
        );

        // verification: under this assignment the matrix must be infeasible
        let mut verification =
            Vec::with_capacity(universal_assignment.len() + existential_assignment.len() + 1);
        verification.extend_from_slice(&universal_assignment);
        verification.extend_from_slice(&existential_assignment);
        verification.push(self.output_gate.positive());
        let verified = self
            .counterexample_solver
            .solve_with_assumptions(&verification)
            .map_err(Error::from_sat)?;
        assert!(!verified, "counterexample verification query returned SAT");

        let core = self.counterexample_solver.failed_assumptions().unwrap_or_default();
        let mut existential_core: Vec<Lit> =
            core.into_iter().filter(|lit| self.existential_set.contains(&lit.var())).collect();
        existential_core.sort_unstable_by_key(|l| Lit::var(*l));
        debug!(
            "counterexample verified, existential core: {}",
            NamedLits::new(&existential_core, &self.vars)
        );

        Ok(Some(Counterexample { existential_core, universal_assignment }))
    }

    /// Refines the candidate model with a verified counterexample.
    ///
    /// Every core existential gets an expansion variable for the universal
    /// assignment restricted to its dependencies, its default is flipped
    /// against the counterexample, and the enabling expansion assignment is
    /// blocked in the expansion solver.
    fn refine(&mut self, counterexample: &Counterexample) -> Result<(), ModelError> {
        let mut blocking = Vec::with_capacity(counterexample.existential_core.len());
        for &lit in &counterexample.existential_core {
            let existential = lit.var();
            let deps = &self.deps[&existential];
            let assignment: Vec<Lit> = counterexample
                .universal_assignment
                .iter()
                .copied()
                .filter(|lit| deps.contains(lit.var()))
                .collect();
            // the rule must be installed before the default flip so that the
            // flip only affects the trailing default slot
            let expansion = self.get_expansion(existential, &assignment)?;
            if lit.is_positive() {
                blocking.push(expansion.negative());
                self.set_default(existential, false)?;
            } else {
                blocking.push(expansion.positive());
                self.set_default(existential, true)?;
            }
        }
        debug!("blocking clause: {}", NamedLits::new(&blocking, &self.vars));
        self.expansion_solver.add_clause(&blocking);
        self.stats.refinement.blocking_clauses += 1;
        self.stats.refinement.expansion_variables = self.expansion.len().try_into().unwrap();
        Ok(())
    }

    /// Decides the DQBF.
    ///
    /// # Errors
    ///
    /// Propagates SAT service failures.
    pub fn solve(&mut self) -> Result<SolverResult, Error> {
        let instant = Instant::now();
        let result = self._solve();
        self.stats.global.solve_time = instant.elapsed();
        info!("\n{:#?}", self.stats);
        result
    }

    fn _solve(&mut self) -> Result<SolverResult, Error> {
        loop {
            self.stats.global.iterations += 1;
            debug!("=== iteration {} ===", self.stats.global.iterations);

            let Some(counterexample) = self.get_counterexample()? else {
                info!("satisfiable after {} iterations", self.stats.global.iterations);
                if tracing::enabled!(tracing::Level::DEBUG) {
                    self.enumerate_model_functions()?;
                }
                return Ok(SolverResult::Satisfiable);
            };

            if self.last_counterexample.as_ref() == Some(&counterexample) {
                error!(
                    "counterexample repeated: core {}, universals {}",
                    NamedLits::new(&counterexample.existential_core, &self.vars),
                    NamedLits::new(&counterexample.universal_assignment, &self.vars)
                );
                panic!("no progress: the same counterexample was produced twice in a row");
            }
            self.last_counterexample = Some(counterexample.clone());

            self.refine(&counterexample)?;

            debug!("expansion solver check with {} expansion variables", self.expansion.len());
            if !self.expansion_solver.solve().map_err(Error::from_sat)? {
                info!("unsatisfiable after {} iterations", self.stats.global.iterations);
                return Ok(SolverResult::Unsatisfiable);
            }
            let model = self.expansion_solver.model().expect("model is available after SAT");
            self.expansion_assignment =
                model.into_iter().filter(|lit| self.expansion.contains_id(lit.var())).collect();
            debug!(
                "expansion model: {}",
                NamedLits::new(&self.expansion_assignment, &self.vars)
            );
        }
    }

    /// Evaluates the candidate model functions under a universal assignment.
    ///
    /// Returns the existential outputs, or `None` if the model is
    /// inconsistent under this assignment (an internal error, logged).
    ///
    /// # Errors
    ///
    /// Propagates SAT service failures.
    pub fn model_function(
        &mut self,
        universal_assignment: &[Lit],
    ) -> Result<Option<Vec<Lit>>, Error> {
        let mut assumptions = Vec::new();
        self.lists.model_assumptions(&mut assumptions);
        assumptions.extend_from_slice(universal_assignment);
        // pin the expansion values whose defining assignment matches
        for &existential in &self.existentials {
            let deps = &self.deps[&existential];
            let restricted: Vec<Lit> = universal_assignment
                .iter()
                .copied()
                .filter(|lit| deps.contains(lit.var()))
                .collect();
            if let Some(expansion) = self.expansion.lookup(existential, &restricted) {
                if let Some(&value) =
                    self.expansion_assignment.iter().find(|lit| lit.var() == expansion)
                {
                    assumptions.push(value);
                }
            }
        }

        if !self.counterexample_solver.solve_with_assumptions(&assumptions).map_err(Error::from_sat)? {
            error!(
                "candidate model is inconsistent under {}",
                NamedLits::new(universal_assignment, &self.vars)
            );
            return Ok(None);
        }
        let model = self.counterexample_solver.model().expect("model is available after SAT");
        let mut outputs: Vec<Lit> =
            model.into_iter().filter(|lit| self.existential_set.contains(&lit.var())).collect();
        outputs.sort_unstable_by_key(|l| Lit::var(*l));
        Ok(Some(outputs))
    }

    /// Logs the model-function outputs for every universal assignment.
    fn enumerate_model_functions(&mut self) -> Result<(), Error> {
        let universals = self.universals.clone();
        if universals.len() > 16 {
            warn!("skipping model-function enumeration over {} universals", universals.len());
            return Ok(());
        }
        info!("model functions for all universal assignments:");
        for bits in 0..(1_u32 << universals.len()) {
            let assignment: Vec<Lit> = universals
                .iter()
                .enumerate()
                .map(|(idx, &var)| var.lit(bits & (1 << idx) != 0))
                .collect();
            match self.model_function(&assignment)? {
                Some(outputs) => info!(
                    "  {} -> {}",
                    NamedLits::new(&assignment, &self.vars),
                    NamedLits::new(&outputs, &self.vars)
                ),
                None => error!("  {} -> no valid output", NamedLits::new(&assignment, &self.vars)),
            }
        }
        Ok(())
    }

    /// Statistics of the formula under decision.
    #[must_use]
    pub fn statistics(&self) -> FormulaStatistics {
        #[allow(clippy::cast_precision_loss)]
        let avg_clause_size = if self.matrix.is_empty() {
            0.0
        } else {
            self.matrix.iter().map(Vec::len).sum::<usize>() as f64 / self.matrix.len() as f64
        };
        FormulaStatistics {
            total_variables: self.vars.len(),
            universal_variables: self.universals.len(),
            existential_variables: self.existentials.len(),
            clauses: self.matrix.len(),
            max_clause_size: self.matrix.iter().map(Vec::len).max().unwrap_or(0),
            avg_clause_size,
            max_dependencies: self.deps.values().map(|deps| deps.order.len()).max().unwrap_or(0),
        }
    }

    /// The variable registry, including all auxiliaries created so far.
    #[must_use]
    pub fn variables(&self) -> &VarTable {
        &self.vars
    }

    #[cfg(test)]
    pub(crate) fn from_dqcnf(dqcnf: &crate::dqcnf::DQCNF) -> Self {
        let (instance, counter) = dqcnf.instantiate();
        Self::new(instance, Some(counter)).expect("instantiated inputs are well-formed")
    }
}
