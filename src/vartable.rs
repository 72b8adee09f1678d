//! Bijective registry mapping variable and gate names to propositional ids.
//!
//! Every id that ever appears in a clause has an entry here, including the
//! auxiliaries allocated during solving. The names are purely diagnostic.

use crate::literal::{Lit, Var};
use std::{collections::HashMap, fmt::Display};

#[derive(Debug, Clone, Default)]
pub struct VarTable {
    by_name: HashMap<String, Var>,
    by_id: HashMap<Var, String>,
}

impl VarTable {
    /// Registers `var` under `name`. Both directions must be unmapped.
    pub fn insert(&mut self, name: impl Into<String>, var: Var) {
        let name = name.into();
        debug_assert!(!self.by_name.contains_key(&name), "name {name} registered twice");
        debug_assert!(!self.by_id.contains_key(&var), "id {var} registered twice");
        self.by_id.insert(var, name.clone());
        self.by_name.insert(name, var);
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, var: Var) -> Option<&str> {
        self.by_id.get(&var).map(String::as_str)
    }

    /// The registered name, or a placeholder for unregistered ids.
    #[must_use]
    pub fn display_name(&self, var: Var) -> String {
        self.name(var).map_or_else(|| format!("id{var}"), str::to_owned)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Largest registered id, in DIMACS numbering.
    #[must_use]
    pub fn max_id(&self) -> Option<i32> {
        self.by_id.keys().map(|var| var.to_dimacs()).max()
    }
}

/// Renders a literal list with registered names, e.g. `[x, ~y]`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NamedLits<'a> {
    lits: &'a [Lit],
    vars: &'a VarTable,
}

impl<'a> NamedLits<'a> {
    pub(crate) fn new(lits: &'a [Lit], vars: &'a VarTable) -> Self {
        Self { lits, vars }
    }
}

impl<'a> Display for NamedLits<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sorted: Vec<Lit> = self.lits.to_vec();
        sorted.sort_unstable_by_key(|l| Lit::var(*l));
        write!(f, "[")?;
        for (idx, lit) in sorted.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            if lit.is_negative() {
                write!(f, "~")?;
            }
            write!(f, "{}", self.vars.display_name(lit.var()))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bijective_lookup() {
        let mut table = VarTable::default();
        let x = Var::from_dimacs(1);
        let y = Var::from_dimacs(2);
        table.insert("x", x);
        table.insert("y", y);
        assert_eq!(table.id("x"), Some(x));
        assert_eq!(table.name(y), Some("y"));
        assert_eq!(table.id("z"), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.max_id(), Some(2));
    }

    #[test]
    fn named_display() {
        let mut table = VarTable::default();
        table.insert("x", Var::from_dimacs(1));
        table.insert("y", Var::from_dimacs(2));
        let lits = [Lit::from_dimacs(-2), Lit::from_dimacs(1)];
        assert_eq!(format!("{}", NamedLits::new(&lits, &table)), "[x, ~y]");
    }
}
