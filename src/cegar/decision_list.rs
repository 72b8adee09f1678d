//! Ordered decision-list encoding of candidate Skolem functions.
//!
//! Every existential variable `e` carries a list of rules
//! `R_1, ..., R_k`: "if the premise holds and no earlier rule fired, then
//! `e <-> value_i`", followed by a trailing default `e <-> value_{k+1}`.
//! The list is encoded into the counterexample solver with three auxiliary
//! variables per rule; the default is selected by assuming the current
//! `fire` and `value` handles.

use super::ModelError;
use crate::{
    counter::VarCounter,
    literal::{Lit, LitSlice, Var},
    sat::SatSolver,
    vartable::VarTable,
};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub(crate) struct DecisionLists {
    lists: BTreeMap<Var, DecisionList>,
    /// Unit literals fixing constant rule conclusions; part of every
    /// counterexample-solver query.
    permanent: Vec<Lit>,
}

#[derive(Debug)]
pub(crate) struct DecisionList {
    /// Signed literal of the trailing default value slot. The sign is the
    /// default polarity and the literal is assumed as-is.
    value: Lit,
    /// True iff none of the installed rules fired.
    nofired: Var,
    /// Firing indicator of the slot the next rule will specialize.
    fire: Var,
    /// Slot index the next rule will occupy.
    next_rule: u32,
    /// One record per installed rule.
    rules: Vec<RuleRecord>,
}

/// Diagnostic record of one installed rule.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub(crate) struct RuleRecord {
    pub(crate) index: u32,
    pub(crate) fire: Var,
    pub(crate) nofired: Var,
    pub(crate) value: Var,
    pub(crate) premise: Vec<Lit>,
}

impl DecisionList {
    pub(crate) fn rules(&self) -> &[RuleRecord] {
        &self.rules
    }
}

impl DecisionLists {
    pub(crate) fn get(&self, existential: Var) -> Option<&DecisionList> {
        self.lists.get(&existential)
    }

    /// Initializes the decision list of `existential` with an empty rule
    /// list and a trailing default. Calling this twice is a no-op.
    pub(crate) fn init<S: SatSolver>(
        &mut self,
        existential: Var,
        solver: &mut S,
        counter: &mut VarCounter,
        vars: &mut VarTable,
    ) {
        if self.lists.contains_key(&existential) {
            return;
        }
        let name = vars.display_name(existential);

        let value = counter.fresh();
        vars.insert(format!("{name}_value_1"), value);
        let nofired = counter.fresh();
        vars.insert(format!("{name}_nofired_0"), nofired);
        let fire = counter.fresh();
        vars.insert(format!("{name}_fire_1"), fire);

        // before any rule, no rule has fired
        solver.add_clause(&[nofired.positive()]);
        // default path: fire_1 and nofired_0 select value_1
        solver.add_clause(&[
            nofired.negative(),
            fire.negative(),
            existential.negative(),
            value.positive(),
        ]);
        solver.add_clause(&[
            nofired.negative(),
            fire.negative(),
            existential.positive(),
            value.negative(),
        ]);
        debug!("initialized decision list for {name}");

        self.lists.insert(
            existential,
            DecisionList {
                value: value.positive(),
                nofired,
                fire,
                next_rule: 1,
                rules: Vec::new(),
            },
        );
    }

    /// Sets the polarity of the trailing default value.
    pub(crate) fn set_default(&mut self, existential: Var, value: bool) -> Result<(), ModelError> {
        let list =
            self.lists.get_mut(&existential).ok_or(ModelError::UninitializedExistential(existential))?;
        list.value = list.value.var().lit(value);
        Ok(())
    }

    /// Installs a rule specializing the current default slot.
    ///
    /// The slot's firing indicator becomes equivalent to the premise
    /// conjunction, a fresh `nofired` chains the rule into the list, and a
    /// fresh default slot is selected behind it. The conclusion either
    /// fixes the slot's value variable as a permanent assumption
    /// (`value_var` is `None`) or binds it to `value_var`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_rule<S: SatSolver>(
        &mut self,
        existential: Var,
        premise: &[Lit],
        conclusion: bool,
        value_var: Option<Var>,
        solver: &mut S,
        counter: &mut VarCounter,
        vars: &mut VarTable,
    ) -> Result<(), ModelError> {
        let list =
            self.lists.get_mut(&existential).ok_or(ModelError::UninitializedExistential(existential))?;
        let previous_nofired = list.nofired;
        let rule_fire = list.fire;
        let rule_value = list.value.var();
        let rule_index = list.next_rule;
        let name = vars.display_name(existential);

        let next_fire = counter.fresh();
        vars.insert(format!("{name}_fire_{}", rule_index + 1), next_fire);
        let rule_nofired = counter.fresh();
        vars.insert(format!("{name}_nofired_{rule_index}"), rule_nofired);
        let next_value = counter.fresh();
        vars.insert(format!("{name}_value_{}", rule_index + 1), next_value);

        // rule_fire <-> conjunction of the premise; an empty premise
        // collapses to the unit clause `rule_fire`
        for &lit in premise {
            solver.add_clause(&[rule_fire.negative(), lit]);
        }
        let mut fire_def: Vec<Lit> = premise.iter().map(|&lit| !lit).collect();
        fire_def.push(rule_fire.positive());
        solver.add_clause(&fire_def);

        // rule_nofired <-> previous_nofired & !rule_fire
        solver.add_clause(&[rule_nofired.negative(), previous_nofired.positive()]);
        solver.add_clause(&[rule_nofired.negative(), rule_fire.negative()]);
        solver.add_clause(&[
            rule_nofired.positive(),
            previous_nofired.negative(),
            rule_fire.positive(),
        ]);

        // the new trailing default: next_fire and rule_nofired select
        // next_value
        solver.add_clause(&[
            next_fire.negative(),
            rule_nofired.negative(),
            existential.negative(),
            next_value.positive(),
        ]);
        solver.add_clause(&[
            next_fire.negative(),
            rule_nofired.negative(),
            existential.positive(),
            next_value.negative(),
        ]);

        // conclusion of the specialized slot
        match value_var {
            None => {
                self.permanent.push(rule_value.lit(conclusion));
            }
            Some(value_var) => {
                solver.add_clause(&[rule_value.negative(), value_var.positive()]);
                solver.add_clause(&[rule_value.positive(), value_var.negative()]);
            }
        }

        list.rules.push(RuleRecord {
            index: rule_index,
            fire: rule_fire,
            nofired: rule_nofired,
            value: rule_value,
            premise: premise.to_vec(),
        });
        list.value = next_value.positive();
        list.nofired = rule_nofired;
        list.fire = next_fire;
        list.next_rule = rule_index + 1;
        debug!("installed rule {rule_index} for {name} with premise {}", LitSlice::from(premise));
        Ok(())
    }

    /// Pushes the assumptions selecting the current candidate model: the
    /// permanent conclusions, every trailing `fire` indicator, and every
    /// signed default value.
    pub(crate) fn model_assumptions(&self, assumptions: &mut Vec<Lit>) {
        assumptions.extend_from_slice(&self.permanent);
        for list in self.lists.values() {
            assumptions.push(list.fire.positive());
        }
        for list in self.lists.values() {
            assumptions.push(list.value);
        }
    }
}
