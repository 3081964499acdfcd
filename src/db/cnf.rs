/*!
The clause store.

Every clause handed to the solver is mirrored here, so the DIMACS dump and
the clause statistics do not depend on solver internals. Clauses are
append-only for the lifetime of a session; assertions about current feature
values are always assumptions, never clauses.
*/

/// Append-only store of emitted clauses, as signed DIMACS literals.
#[derive(Debug, Default)]
pub struct ClauseDb {
    clauses: Vec<Vec<i32>>,
}

impl ClauseDb {
    pub fn push(&mut self, clause: Vec<i32>) {
        debug_assert!(!clause.is_empty());
        debug_assert!(clause.iter().all(|l| *l != 0));
        self.clauses.push(clause);
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[i32]> {
        self.clauses.iter().map(|c| c.as_slice())
    }
}
