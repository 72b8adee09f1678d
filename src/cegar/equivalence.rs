//! Detection of equivalent existential variables.
//!
//! Two existentials are equivalent if their dependency lists have equal
//! length and the matrix never lets them differ while their dependencies
//! agree position by position. Each candidate pair is reduced to one SAT
//! query under a pair-specific activation literal in a dedicated solver.

use super::{Cegar, Error};
use crate::{literal::Var, sat::SatSolver};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

impl<S: SatSolver> Cegar<S> {
    /// Groups the existential variables into equivalence classes.
    ///
    /// Returns a map from class representative to all members, singletons
    /// included.
    ///
    /// # Errors
    ///
    /// Propagates SAT service failures.
    pub fn detect_equivalent_existentials(&mut self) -> Result<BTreeMap<Var, Vec<Var>>, Error> {
        info!("detecting equivalent existential variables");

        let mut detection_solver = S::default();
        for clause in &self.matrix {
            detection_solver.add_clause(clause);
        }

        let mut classes = UnionFind::new(self.existentials.iter().copied());

        // only variables with equally long dependency lists can pair up
        let mut buckets: BTreeMap<usize, Vec<Var>> = BTreeMap::new();
        for &existential in &self.existentials {
            buckets.entry(self.deps[&existential].order.len()).or_default().push(existential);
        }

        for (dep_count, bucket) in &buckets {
            debug!("checking {} variables with {dep_count} dependencies", bucket.len());
            for i in 0..bucket.len() {
                for j in i + 1..bucket.len() {
                    let (first, second) = (bucket[i], bucket[j]);
                    if classes.same_set(first, second) {
                        continue;
                    }

                    let activation = self.counter.fresh();
                    let name = format!(
                        "equiv_{}_{}",
                        self.vars.display_name(first),
                        self.vars.display_name(second)
                    );
                    self.vars.insert(name, activation);

                    // guarded: dependencies agree position by position
                    let pairs = self.deps[&first]
                        .order
                        .iter()
                        .copied()
                        .zip(self.deps[&second].order.iter().copied());
                    for (dep1, dep2) in pairs {
                        detection_solver.add_clause(&[
                            activation.negative(),
                            dep1.positive(),
                            dep2.negative(),
                        ]);
                        detection_solver.add_clause(&[
                            activation.negative(),
                            dep1.negative(),
                            dep2.positive(),
                        ]);
                    }
                    // guarded: the pair differs
                    detection_solver.add_clause(&[
                        activation.negative(),
                        first.positive(),
                        second.positive(),
                    ]);
                    detection_solver.add_clause(&[
                        activation.negative(),
                        first.negative(),
                        second.negative(),
                    ]);

                    let assumptions = [activation.positive(), self.output_gate.positive()];
                    if !detection_solver
                        .solve_with_assumptions(&assumptions)
                        .map_err(Error::from_sat)?
                    {
                        info!(
                            "found equivalent pair: {} and {}",
                            self.vars.display_name(first),
                            self.vars.display_name(second)
                        );
                        classes.union(first, second);
                    }
                }
            }
        }

        Ok(classes.classes())
    }
}

/// Union-find with iterative path compression and union by rank.
#[derive(Debug)]
pub(crate) struct UnionFind {
    parent: HashMap<Var, Var>,
    rank: HashMap<Var, u32>,
}

impl UnionFind {
    pub(crate) fn new(elements: impl IntoIterator<Item = Var>) -> Self {
        let parent: HashMap<Var, Var> = elements.into_iter().map(|elem| (elem, elem)).collect();
        let rank = parent.keys().map(|&elem| (elem, 0)).collect();
        Self { parent, rank }
    }

    pub(crate) fn find(&mut self, element: Var) -> Var {
        let mut root = element;
        while self.parent[&root] != root {
            root = self.parent[&root];
        }
        let mut current = element;
        while current != root {
            let next = self.parent[&current];
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    pub(crate) fn union(&mut self, first: Var, second: Var) {
        let first = self.find(first);
        let second = self.find(second);
        if first == second {
            return;
        }
        match self.rank[&first].cmp(&self.rank[&second]) {
            std::cmp::Ordering::Less => {
                self.parent.insert(first, second);
            }
            std::cmp::Ordering::Greater => {
                self.parent.insert(second, first);
            }
            std::cmp::Ordering::Equal => {
                self.parent.insert(second, first);
                *self.rank.get_mut(&first).unwrap() += 1;
            }
        }
    }

    pub(crate) fn same_set(&mut self, first: Var, second: Var) -> bool {
        self.find(first) == self.find(second)
    }

    /// All classes, members sorted by id.
    pub(crate) fn classes(&mut self) -> BTreeMap<Var, Vec<Var>> {
        let mut elements: Vec<Var> = self.parent.keys().copied().collect();
        elements.sort_unstable();
        let mut classes: BTreeMap<Var, Vec<Var>> = BTreeMap::new();
        for element in elements {
            let root = self.find(element);
            classes.entry(root).or_default().push(element);
        }
        classes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn var(dimacs: i32) -> Var {
        Var::from_dimacs(dimacs)
    }

    #[test]
    fn singletons() {
        let mut uf = UnionFind::new([var(1), var(2), var(3)]);
        assert!(!uf.same_set(var(1), var(2)));
        assert_eq!(uf.classes().len(), 3);
    }

    #[test]
    fn union_and_find() {
        let mut uf = UnionFind::new([var(1), var(2), var(3), var(4)]);
        uf.union(var(1), var(2));
        uf.union(var(3), var(4));
        assert!(uf.same_set(var(1), var(2)));
        assert!(!uf.same_set(var(2), var(3)));
        uf.union(var(2), var(3));
        assert!(uf.same_set(var(1), var(4)));
        let classes = uf.classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes.values().next().unwrap(), &vec![var(1), var(2), var(3), var(4)]);
    }

    #[test]
    fn union_is_idempotent() {
        let mut uf = UnionFind::new([var(1), var(2)]);
        uf.union(var(1), var(2));
        uf.union(var(2), var(1));
        assert_eq!(uf.classes().len(), 1);
    }
}
