//! Canonical interning of expansion variables.
//!
//! An expansion variable stands for the value of an existential variable
//! under one complete assignment to its dependencies. This registry is the
//! sole producer of expansion variables; a variable, once created, persists
//! forever.

use super::{decision_list::DecisionLists, DependencySet, ModelError};
use crate::{
    counter::VarCounter,
    literal::{Lit, Var},
    sat::SatSolver,
    vartable::VarTable,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub(crate) struct ExpansionRegistry {
    by_assignment: HashMap<(Var, Vec<Lit>), Var>,
    ids: HashSet<Var>,
}

impl ExpansionRegistry {
    pub(crate) fn len(&self) -> usize {
        self.by_assignment.len()
    }

    pub(crate) fn contains_id(&self, var: Var) -> bool {
        self.ids.contains(&var)
    }

    /// Looks up the expansion variable of `(existential, assignment)`
    /// without creating it.
    pub(crate) fn lookup(&self, existential: Var, assignment: &[Lit]) -> Option<Var> {
        self.by_assignment.get(&(existential, canonical(assignment))).copied()
    }

    /// Returns the expansion variable of `(existential, assignment)`,
    /// allocating it on first use.
    ///
    /// On allocation, a decision-list rule "if the dependencies match
    /// `assignment` exactly, then `existential <-> expansion`" is installed.
    /// The assignment is canonicalized, so any permutation yields the same
    /// variable and no redundant rules.
    ///
    /// # Errors
    ///
    /// Fails if `assignment` mentions a variable outside the dependency set.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn get_or_insert<S: SatSolver>(
        &mut self,
        existential: Var,
        assignment: &[Lit],
        deps: &DependencySet,
        lists: &mut DecisionLists,
        solver: &mut S,
        counter: &mut VarCounter,
        vars: &mut VarTable,
    ) -> Result<Var, ModelError> {
        for &lit in assignment {
            if !deps.contains(lit.var()) {
                return Err(ModelError::AssignmentOutsideDependencies { var: existential, lit });
            }
        }

        let key = (existential, canonical(assignment));
        if let Some(&expansion) = self.by_assignment.get(&key) {
            return Ok(expansion);
        }

        let expansion = counter.fresh();
        let values = key
            .1
            .iter()
            .map(|lit| {
                format!(
                    "{}={}",
                    vars.display_name(lit.var()),
                    if lit.is_positive() { "T" } else { "F" }
                )
            })
            .collect::<Vec<_>>()
            .join("_");
        let name = if values.is_empty() {
            format!("exp_{}", vars.display_name(existential))
        } else {
            format!("exp_{}_{values}", vars.display_name(existential))
        };
        vars.insert(name, expansion);
        debug!("created expansion variable {}", vars.display_name(expansion));

        self.ids.insert(expansion);
        let premise = key.1.clone();
        self.by_assignment.insert(key, expansion);
        lists.add_rule(existential, &premise, true, Some(expansion), solver, counter, vars)?;
        Ok(expansion)
    }
}

fn canonical(assignment: &[Lit]) -> Vec<Lit> {
    let mut assignment = assignment.to_vec();
    assignment.sort_unstable_by_key(|l| Lit::var(*l));
    assignment
}
