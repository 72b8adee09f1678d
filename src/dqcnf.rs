//! A straight-forward representation of a DQBF in CNF.

use crate::{
    cegar::DqbfInstance,
    counter::VarCounter,
    dqdimacs::FromDqdimacs,
    literal::{Lit, Var},
    vartable::VarTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DQCNF {
    pub universals: Vec<Var>,
    /// Existential variables with their ordered dependency lists.
    pub existentials: Vec<(Var, Vec<Var>)>,
    pub matrix: Vec<Vec<Lit>>,
}

impl DQCNF {
    #[must_use]
    pub fn new(universals: &[u32], existentials: &[(u32, Vec<u32>)], matrix: &[Vec<i32>]) -> Self {
        let to_var = |&var: &u32| Var::from_dimacs(var.try_into().unwrap());
        let universals = universals.iter().map(to_var).collect();
        let existentials = existentials
            .iter()
            .map(|(var, deps)| (to_var(var), deps.iter().map(to_var).collect()))
            .collect();
        let matrix = matrix
            .iter()
            .map(|lits| lits.iter().map(|&lit| Lit::from_dimacs(lit)).collect())
            .collect();
        DQCNF { universals, existentials, matrix }
    }

    fn num_clauses(&self) -> u32 {
        self.matrix.len().try_into().unwrap()
    }

    fn num_variables(&self) -> u32 {
        self.universals
            .iter()
            .chain(self.existentials.iter().map(|(var, _)| var))
            .chain(self.existentials.iter().flat_map(|(_, deps)| deps))
            .map(|var| var.to_dimacs())
            .chain(self.matrix.iter().flatten().map(|lit| lit.var().to_dimacs()))
            .max()
            .unwrap_or_default()
            .try_into()
            .unwrap()
    }

    /// Builds the solver constructor inputs from this formula.
    ///
    /// Original variables are named by their DIMACS number. Matrix variables
    /// bound by no quantifier are treated as outermost existentials without
    /// dependencies. The matrix conjunction is Tseitin-encoded: one gate
    /// `t_i` per clause and an output gate `out` equivalent to the
    /// quantifier-free body.
    #[must_use]
    pub fn instantiate(&self) -> (DqbfInstance, VarCounter) {
        let mut vars = VarTable::default();
        for &universal in &self.universals {
            vars.insert(universal.to_dimacs().to_string(), universal);
        }
        for &(existential, _) in &self.existentials {
            vars.insert(existential.to_dimacs().to_string(), existential);
        }
        let mut free: Vec<Var> = self
            .matrix
            .iter()
            .flatten()
            .map(|lit| lit.var())
            .filter(|&var| vars.name(var).is_none())
            .collect();
        free.sort_unstable();
        free.dedup();
        for &var in &free {
            vars.insert(var.to_dimacs().to_string(), var);
        }

        // the fresh-id watermark is computed once, here
        let watermark = vars
            .max_id()
            .unwrap_or(0)
            .max(self.matrix.iter().flatten().map(|lit| lit.var().to_dimacs()).max().unwrap_or(0));
        let mut counter = VarCounter::new(watermark);

        let mut matrix = Vec::new();
        let mut gates = Vec::with_capacity(self.matrix.len());
        for (idx, clause) in self.matrix.iter().enumerate() {
            let gate = counter.fresh();
            vars.insert(format!("t{}", idx + 1), gate);
            let mut implies = Vec::with_capacity(clause.len() + 1);
            implies.push(gate.negative());
            implies.extend_from_slice(clause);
            matrix.push(implies);
            for &lit in clause {
                matrix.push(vec![!lit, gate.positive()]);
            }
            gates.push(gate);
        }
        let output_gate = counter.fresh();
        vars.insert("out", output_gate);
        for &gate in &gates {
            matrix.push(vec![output_gate.negative(), gate.positive()]);
        }
        let mut conjunction = Vec::with_capacity(gates.len() + 1);
        conjunction.push(output_gate.positive());
        conjunction.extend(gates.iter().map(|&gate| gate.negative()));
        matrix.push(conjunction);

        let universals = self.universals.iter().map(|&var| vars.display_name(var)).collect();
        let dependencies = self
            .existentials
            .iter()
            .map(|(existential, deps)| {
                (
                    vars.display_name(*existential),
                    deps.iter().map(|&dep| vars.display_name(dep)).collect(),
                )
            })
            .chain(free.iter().map(|&var| (vars.display_name(var), Vec::new())))
            .collect();

        (DqbfInstance { vars, dependencies, matrix, universals, output_gate }, counter)
    }
}

impl FromDqdimacs for DQCNF {
    fn set_num_variables(&mut self, _: u32) {}

    fn set_num_clauses(&mut self, _: u32) {}

    fn universals(&mut self, vars: &[Var]) {
        self.universals.extend_from_slice(vars);
    }

    fn existentials(&mut self, vars: &[Var]) {
        for &var in vars {
            self.existentials.push((var, self.universals.clone()));
        }
    }

    fn dependency(&mut self, var: Var, deps: &[Var]) {
        self.existentials.push((var, deps.to_owned()));
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        self.matrix.push(lits.to_owned());
    }
}

impl std::fmt::Display for DQCNF {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_variables(), self.num_clauses())?;
        if !self.universals.is_empty() {
            writeln!(
                f,
                "a {} 0",
                self.universals.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
            )?;
        }
        for (existential, deps) in &self.existentials {
            write!(f, "d {existential}")?;
            for dep in deps {
                write!(f, " {dep}")?;
            }
            writeln!(f, " 0")?;
        }
        for clause in &self.matrix {
            for lit in clause {
                write!(f, "{lit} ")?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
macro_rules! dqcnf_core {
    ($univs:expr, $exists:expr, $matrix:expr,) => {
		(crate::dqcnf::DQCNF::new(&$univs, &$exists, &$matrix))
	};
    ($univs:expr, $exists:expr, $matrix:expr, a $( $x:literal )* ; $($tail:tt)* ) => {{
		$univs.extend_from_slice(&[ $( $x ),* ]);
        dqcnf_core![$univs, $exists, $matrix, $($tail)*]
    }};
    ($univs:expr, $exists:expr, $matrix:expr, e $( $x:literal )* ; $($tail:tt)* ) => {{
        $(
            let deps = $univs.clone();
            $exists.push(($x, deps));
        )*
        dqcnf_core![$univs, $exists, $matrix, $($tail)*]
    }};
    ($univs:expr, $exists:expr, $matrix:expr, d $v:literal $( $x:literal )* ; $($tail:tt)* ) => {{
        $exists.push(($v, vec![ $( $x ),* ]));
        dqcnf_core![$univs, $exists, $matrix, $($tail)*]
    }};
    ($univs:expr, $exists:expr, $matrix:expr, $( $x:literal )* ; $($tail:tt)* ) => {{
		$matrix.push(vec![ $( $x ),* ]);
        dqcnf_core![$univs, $exists, $matrix, $($tail)*]
    }};
}

/// Macro that creates a [`DQCNF`] instance from a DQDIMACS-like
/// representation. The main differences are:
/// * No support for comments
/// * No header line
/// * Lines are seperated by `;`, whereas DQDIMACS uses `0`.
///
/// `e` lines bind existentials depending on all universals declared so far;
/// `d` lines name the existential first and then its dependencies.
///
/// # Example
/// ```
/// let dqcnf = dqcnf_formula![
///     a 1 2;
///     d 3 1;
///     d 4 2;
///     3 4;
/// ];
/// ```
///
#[cfg(test)]
macro_rules! dqcnf_formula {
	($($tail:tt)*) => {
		 {
			 let mut universals: Vec<u32> = Vec::new();
			 let mut existentials: Vec<(u32, Vec<u32>)> = Vec::new();
			 let mut matrix: Vec<Vec<i32>> = Vec::new();
			 dqcnf_core![universals, existentials, matrix, $($tail)*]
		 }

	};
}

/// Provides a strategy for randomly generating DQCNFs.
#[cfg(test)]
pub(crate) mod strategy {
    use super::DQCNF;
    use crate::literal::strategy::lit;
    use proptest::{
        collection::{self, SizeRange},
        prelude::*,
    };

    /// A strategy to generate a DQCNF with the provided parameters.
    pub(crate) fn dqcnf(
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = DQCNF> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        (1..5usize, 0..4usize)
            .prop_flat_map(move |(num_universals, num_existentials)| {
                let num_vars: u32 = (num_universals + num_existentials).try_into().unwrap();
                let deps =
                    collection::vec(collection::vec(any::<bool>(), num_universals), num_existentials);
                let matrix =
                    collection::vec(collection::vec(lit(0..num_vars), clause_len.clone()), clauses.clone());
                (deps, matrix).prop_map(move |(deps, matrix)| {
                    let universals: Vec<u32> = (1..=num_universals.try_into().unwrap()).collect();
                    let existentials: Vec<(u32, Vec<u32>)> = deps
                        .into_iter()
                        .enumerate()
                        .map(|(idx, mask)| {
                            let var = u32::try_from(num_universals + idx + 1).unwrap();
                            let deps = mask
                                .into_iter()
                                .enumerate()
                                .filter(|(_, keep)| *keep)
                                .map(|(dep, _)| u32::try_from(dep + 1).unwrap())
                                .collect();
                            (var, deps)
                        })
                        .collect();
                    let matrix: Vec<Vec<i32>> = matrix
                        .into_iter()
                        .map(|clause| clause.into_iter().map(crate::literal::Lit::to_dimacs).collect())
                        .collect();
                    DQCNF::new(&universals, &existentials, &matrix)
                })
            })
            .no_shrink()
    }
}

#[cfg(test)]
mod test {

    #[test]
    fn dqcnf_macro() {
        let dqcnf = dqcnf_formula![
            a 1 2;
            d 3 1;
            e 4;
            3 4;
        ];
        assert_eq!(dqcnf.num_clauses(), 1);
        assert_eq!(dqcnf.num_variables(), 4);
        assert_eq!(dqcnf.existentials.len(), 2);
        // `e` lines depend on every universal declared so far
        assert_eq!(dqcnf.existentials[1].1.len(), 2);
    }

    #[test]
    fn instantiate_tseitin() {
        let dqcnf = dqcnf_formula![
            a 1;
            d 2 1;
            -1 2;
        ];
        let (instance, counter) = dqcnf.instantiate();
        // one clause gate plus the output gate
        assert_eq!(counter.watermark(), 4);
        assert_eq!(instance.vars.id("t1"), Some(crate::literal::Var::from_dimacs(3)));
        assert_eq!(instance.vars.id("out"), Some(instance.output_gate));
        // t1 <-> (-1 | 2), out <-> t1
        assert_eq!(instance.matrix.len(), 5);
        assert_eq!(instance.universals, vec!["1".to_owned()]);
        assert_eq!(instance.dependencies, vec![("2".to_owned(), vec!["1".to_owned()])]);
    }

    #[test]
    fn instantiate_binds_free_variables() {
        let dqcnf = dqcnf_formula![
            a 1;
            -1 2;
        ];
        let (instance, _) = dqcnf.instantiate();
        assert_eq!(instance.dependencies, vec![("2".to_owned(), Vec::new())]);
    }

    #[test]
    fn instantiate_empty_matrix() {
        let dqcnf = dqcnf_formula![
            e 1;
        ];
        let (instance, _) = dqcnf.instantiate();
        // the output gate of an empty conjunction is asserted outright
        assert_eq!(instance.matrix, vec![vec![instance.output_gate.positive()]]);
    }
}
