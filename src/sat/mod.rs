/*!
The SAT bridge.

A thin facade over an incremental SAT solver with assumptions and
failed-assumption cores. The rest of the library speaks signed DIMACS
literals through this interface only, so the backend is replaceable by
anything honouring the same contract:

- `add_clause` — append a clause, permanently;
- `solve_under` — solve under a fresh set of assumption literals (previous
  assumptions never leak);
- `failed_assumptions` — after an unsatisfiable solve, the subset of
  assumption literals the proof used;
- `value_of` — after a satisfiable solve, the polarity of a variable.

The backend here is [varisat]. A solver error is reported as
[Outcome::Unknown]: the enumeration layer treats that as "unsatisfiable
with an empty core" so it always makes progress, and it is logged.
*/

use std::collections::HashMap;

use varisat::{ExtendFormula, Lit, Solver, Var};

use crate::misc::log::targets;

/// Signed DIMACS literal to backend literal; variable `v` is index `v - 1`.
fn to_lit(lit: i32) -> Lit {
    Var::from_index((lit.unsigned_abs() - 1) as usize).lit(lit > 0)
}

/// Backend literal to signed DIMACS literal.
fn from_lit(lit: Lit) -> i32 {
    let var = (lit.var().index() + 1) as i32;
    if lit.is_positive() {
        var
    } else {
        -var
    }
}

/// Result of a solve call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Sat,
    Unsat,
    Unknown,
}

/// Counters reported by [SatBridge::stats].
#[derive(Clone, Copy, Debug, Default)]
pub struct SolverStats {
    pub clauses: usize,
    pub solves: usize,
}

/// Wraps the backend solver for one resolve session.
pub struct SatBridge {
    solver: Solver<'static>,
    /// Variable polarities of the most recent satisfying assignment.
    model: HashMap<i32, bool>,
    /// Failed assumption literals of the most recent unsatisfiable solve.
    failed: Vec<i32>,
    stats: SolverStats,
}

impl Default for SatBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SatBridge {
    pub fn new() -> Self {
        SatBridge {
            solver: Solver::new(),
            model: HashMap::new(),
            failed: Vec::new(),
            stats: SolverStats::default(),
        }
    }

    /// Append a clause of signed DIMACS literals.
    pub fn add_clause(&mut self, lits: &[i32]) {
        let lits: Vec<Lit> = lits.iter().map(|l| to_lit(*l)).collect();
        self.solver.add_clause(&lits);
        self.stats.clauses += 1;
    }

    /// Solve under exactly these assumptions.
    pub fn solve_under(&mut self, assumptions: &[i32]) -> Outcome {
        let lits: Vec<Lit> = assumptions.iter().map(|l| to_lit(*l)).collect();
        self.solver.assume(&lits);
        self.stats.solves += 1;

        match self.solver.solve() {
            Ok(true) => {
                self.model.clear();
                if let Some(model) = self.solver.model() {
                    for lit in model {
                        let dimacs = from_lit(lit);
                        self.model.insert(dimacs.abs(), dimacs > 0);
                    }
                }
                Outcome::Sat
            }
            Ok(false) => {
                self.failed = self
                    .solver
                    .failed_core()
                    .map(|core| core.iter().map(|l| from_lit(*l)).collect())
                    .unwrap_or_default();
                Outcome::Unsat
            }
            Err(e) => {
                log::warn!(target: targets::SOLVER, "solver returned unknown: {e}");
                Outcome::Unknown
            }
        }
    }

    /// The failed assumption literals of the last unsatisfiable solve.
    pub fn failed_assumptions(&self) -> &[i32] {
        &self.failed
    }

    /// Polarity of a variable in the last satisfying assignment:
    /// `1` true, `-1` false, `0` unassigned.
    pub fn value_of(&self, var: u32) -> i8 {
        match self.model.get(&(var as i32)) {
            Some(true) => 1,
            Some(false) => -1,
            None => 0,
        }
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }
}

impl std::fmt::Debug for SatBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SatBridge")
            .field("clauses", &self.stats.clauses)
            .field("solves", &self.stats.solves)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumptions_do_not_leak_between_solves() {
        let mut bridge = SatBridge::new();
        bridge.add_clause(&[-1, 2]);
        bridge.add_clause(&[-2]);

        assert_eq!(bridge.solve_under(&[1]), Outcome::Unsat);
        assert!(bridge.failed_assumptions().contains(&1));

        // without the assumption the formula is satisfiable again
        assert_eq!(bridge.solve_under(&[]), Outcome::Sat);
        assert_eq!(bridge.value_of(2), -1);
    }

    #[test]
    fn failed_core_is_a_subset_of_assumptions() {
        let mut bridge = SatBridge::new();
        bridge.add_clause(&[-1, 2]);
        bridge.add_clause(&[-3, 4]);
        bridge.add_clause(&[-4, 5]);
        bridge.add_clause(&[-2, -5]);

        assert_eq!(bridge.solve_under(&[1, 3, 6]), Outcome::Unsat);
        let failed = bridge.failed_assumptions();
        assert!(failed.contains(&1));
        assert!(failed.contains(&3));
        assert!(!failed.contains(&6));
    }
}
