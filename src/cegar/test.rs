use crate::{
    cegar::{Cegar, ModelError},
    literal::Lit,
    SolverResult,
};

fn lit(dimacs: i32) -> Lit {
    Lit::from_dimacs(dimacs)
}

#[test]
fn trivial_sat_without_universals() {
    let dqcnf = dqcnf_formula![
        e 1 2;
        -1 2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    // a single iteration, no expansion needed
    assert_eq!(solver.stats.global.iterations, 1);
    assert_eq!(solver.expansion.len(), 0);
    // the initial defaults already satisfy the matrix
    let outputs = solver.model_function(&[]).unwrap().unwrap();
    assert_eq!(outputs, vec![lit(1), lit(2)]);
}

#[test]
fn trivial_unsat() {
    let dqcnf = dqcnf_formula![
        e 1;
        1;
        -1;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Unsatisfiable);
    assert!(solver.stats.global.iterations <= 2);
}

#[test]
fn linear_qbf_as_dqbf() {
    // forall u exists e(u). u <-> e
    let dqcnf = dqcnf_formula![
        a 1;
        d 2 1;
        -1 2;
        1 -2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    // one expansion variable per universal polarity
    assert_eq!(solver.expansion.len(), 2);
    assert_eq!(solver.model_function(&[lit(-1)]).unwrap().unwrap(), vec![lit(-2)]);
    assert_eq!(solver.model_function(&[lit(1)]).unwrap().unwrap(), vec![lit(2)]);
}

#[test]
fn henkin_branching_unsat() {
    // forall u1 u2 exists e1(u1) e2(u2).
    // (e1 <-> u1) & (e2 <-> u2) & (e1 | e2)
    // setting u1 = u2 = false forces e1 = e2 = false
    let dqcnf = dqcnf_formula![
        a 1 2;
        d 3 1;
        d 4 2;
        -3 1;
        3 -1;
        -4 2;
        4 -2;
        3 4;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Unsatisfiable);
    // progress is bounded by the four (existential, assignment) pairs plus
    // the blocking clauses over them
    assert!(solver.stats.global.iterations <= 20);
}

#[test]
fn dependency_branching_sat() {
    // each existential copies the universal it may see
    let dqcnf = dqcnf_formula![
        a 1 2;
        d 3 1;
        d 4 2;
        -3 1;
        3 -1;
        -4 2;
        4 -2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    assert_eq!(
        solver.model_function(&[lit(1), lit(-2)]).unwrap().unwrap(),
        vec![lit(3), lit(-4)]
    );
}

#[test]
fn equivalent_existentials_detected() {
    let dqcnf = dqcnf_formula![
        a 1;
        d 2 1;
        d 3 1;
        -2 3;
        2 -3;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let classes = solver.detect_equivalent_existentials().unwrap();
    assert_eq!(classes.len(), 1);
    let members = classes.values().next().unwrap();
    assert_eq!(members, &vec![lit(2).var(), lit(3).var()]);
}

#[test]
fn xor_existentials_not_equivalent() {
    let dqcnf = dqcnf_formula![
        a 1;
        d 2 1;
        d 3 1;
        2 3;
        -2 -3;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let classes = solver.detect_equivalent_existentials().unwrap();
    assert_eq!(classes.len(), 2);
    assert!(classes.values().all(|members| members.len() == 1));
}

#[test]
fn different_dependency_counts_never_pair() {
    // the matrix forces equality, but the dependency lists differ in length
    let dqcnf = dqcnf_formula![
        a 1;
        d 2 1;
        d 3;
        -2 3;
        2 -3;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let classes = solver.detect_equivalent_existentials().unwrap();
    assert_eq!(classes.len(), 2);
}

#[test]
fn free_variables_are_outer_existentials() {
    let dqcnf = dqcnf_formula![
        a 1;
        1 2;
        -1 2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    assert_eq!(solver.model_function(&[lit(1)]).unwrap().unwrap(), vec![lit(2)]);
}

#[test]
fn empty_dependency_set_interns_one_expansion() {
    // variable 2 must be constantly false, discovered through refinement
    let dqcnf = dqcnf_formula![
        a 1;
        d 2;
        -2 1;
        -2 -1;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    // only the empty-assignment expansion exists for variable 2
    assert_eq!(solver.expansion.len(), 1);
    assert_eq!(solver.model_function(&[lit(1)]).unwrap().unwrap(), vec![lit(-2)]);
}

#[test]
fn init_model_twice_is_noop() {
    let dqcnf = dqcnf_formula![
        e 1;
        1;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let existential = solver.existentials[0];
    let watermark = solver.counter.watermark();
    solver.init_model(existential).unwrap();
    assert_eq!(solver.counter.watermark(), watermark);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
}

#[test]
fn invalid_existential_rejected() {
    let dqcnf = dqcnf_formula![
        a 1;
        d 2 1;
        -1 2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let universal = solver.universals[0];
    assert!(matches!(
        solver.init_model(universal),
        Err(ModelError::InvalidExistential(var)) if var == universal
    ));
    assert!(matches!(
        solver.get_expansion(universal, &[]),
        Err(ModelError::InvalidExistential(var)) if var == universal
    ));
}

#[test]
fn formula_statistics() {
    let dqcnf = dqcnf_formula![
        a 1 2;
        d 3 1 2;
        d 4 2;
        1 2 3;
        -3 4;
    ];
    let solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    let stats = solver.statistics();
    assert_eq!(stats.universal_variables, 2);
    assert_eq!(stats.existential_variables, 2);
    assert_eq!(stats.max_dependencies, 2);
    // the matrix also carries the Tseitin gate clauses
    assert_eq!(stats.clauses, 2 + 3 + 2 + 2 + 1);
    assert_eq!(stats.max_clause_size, 4);
}

#[test]
fn negated_copies_need_full_expansion() {
    // e3 = !u1 and e4 = !u2; exercises several refinement rounds, with the
    // stall assertion inside solve() guarding the no-repeat property
    let dqcnf = dqcnf_formula![
        a 1 2;
        d 3 1;
        d 4 2;
        -3 -1;
        3 1;
        -4 -2;
        4 2;
        3 4 1 2;
    ];
    let mut solver: Cegar = Cegar::from_dqcnf(&dqcnf);
    assert_eq!(solver.solve().unwrap(), SolverResult::Satisfiable);
    assert_eq!(solver.model_function(&[lit(1), lit(2)]).unwrap().unwrap(), vec![lit(-3), lit(-4)]);
    assert_eq!(solver.model_function(&[lit(-1), lit(-2)]).unwrap().unwrap(), vec![lit(3), lit(4)]);
}
