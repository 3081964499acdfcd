/*!
CNF encoding of the constraint set.

A constraint that is already a disjunction of literals is emitted as a
single clause. Anything else is Tseitin-encoded: each non-atomic child of a
conjunction or disjunction gets a fresh temporary atom `T` and the standard
defining clauses

- `T ↔ A ∧ B`: `(¬A ∨ ¬B ∨ T)`, `(A ∨ ¬T)`, `(B ∨ ¬T)`;
- `T ↔ A ∨ B`: `(A ∨ B ∨ ¬T)`, `(¬A ∨ T)`, `(¬B ∨ T)`.

Negation is free: the builder pushed every `¬` down to an atom. A constraint
whose root is a conjunction splits into its children, each asserted
independently.

Encoding starts with the two unit clauses pinning the constant atoms. Every
clause goes to the solver and is mirrored in the [ClauseDb].
*/

use crate::db::atom::AtomTable;
use crate::db::cnf::ClauseDb;
use crate::misc::log::targets;
use crate::sat::SatBridge;
use crate::structures::atom::AtomId;
use crate::structures::pexpr::{Pexpr, PexprId, PexprPool};

/// Encode all constraints into `clauses` and the solver.
pub fn encode(
    pool: &PexprPool,
    atoms: &mut AtomTable,
    constraints: &[Vec<PexprId>],
    clauses: &mut ClauseDb,
    bridge: &mut SatBridge,
) {
    let mut encoder = Encoder {
        pool,
        atoms,
        clauses,
        bridge,
    };

    // unit clauses fixing the constants
    let const_false = encoder.atoms.const_false;
    let const_true = encoder.atoms.const_true;
    encoder.emit(vec![-const_false.lit()]);
    encoder.emit(vec![const_true.lit()]);

    for list in constraints {
        for constraint in list {
            encoder.constraint(*constraint);
        }
    }

    log::debug!(
        target: targets::CNF,
        "{} clauses, {} temporaries",
        encoder.clauses.len(),
        encoder.atoms.tseitin_count()
    );
}

struct Encoder<'a> {
    pool: &'a PexprPool,
    atoms: &'a mut AtomTable,
    clauses: &'a mut ClauseDb,
    bridge: &'a mut SatBridge,
}

impl<'a> Encoder<'a> {
    fn emit(&mut self, clause: Vec<i32>) {
        self.bridge.add_clause(&clause);
        self.clauses.push(clause);
    }

    fn constraint(&mut self, e: PexprId) {
        if self.pool.is_clause(e) {
            let mut clause = Vec::new();
            self.collect_literals(e, &mut clause);
            self.emit(clause);
        } else {
            self.tseitin_root(e);
        }
    }

    fn collect_literals(&self, e: PexprId, out: &mut Vec<i32>) {
        match self.pool.get(e) {
            Pexpr::Or(l, r) => {
                self.collect_literals(l, out);
                self.collect_literals(r, out);
            }
            _ => match self.pool.literal_of(e) {
                Some(lit) => out.push(lit),
                None => {
                    log::error!(target: targets::CNF, "non-literal in a clause position");
                }
            },
        }
    }

    fn tseitin_root(&mut self, e: PexprId) {
        match self.pool.get(e) {
            // both children of a root conjunction hold independently
            Pexpr::And(l, r) => {
                for child in [l, r] {
                    if self.pool.is_clause(child) {
                        let mut clause = Vec::new();
                        self.collect_literals(child, &mut clause);
                        self.emit(clause);
                    } else {
                        self.tseitin_root(child);
                    }
                }
            }
            Pexpr::Or(l, r) => self.tseitin_or_root(l, r),
            _ => {
                log::error!(target: targets::CNF, "unexpected root in Tseitin encoding");
            }
        }
    }

    /// The literal standing for a side: the side itself when atomic, a
    /// fresh temporary otherwise.
    fn side_literal(&mut self, e: PexprId) -> (i32, Option<AtomId>) {
        if self.pool.is_literal(e) {
            (self.pool.literal_of(e).unwrap(), None)
        } else {
            let tmp = self.atoms.fresh_tseitin();
            (tmp.lit(), Some(tmp))
        }
    }

    fn tseitin_or_root(&mut self, l: PexprId, r: PexprId) {
        let (a, tmp_l) = self.side_literal(l);
        let (b, tmp_r) = self.side_literal(r);

        self.emit(vec![a, b]);

        if let Some(t) = tmp_l {
            self.define(l, t);
        }
        if let Some(t) = tmp_r {
            self.define(r, t);
        }
    }

    /// Emit the defining clauses of `t ↔ e` and recurse into non-atomic
    /// children.
    fn define(&mut self, e: PexprId, t: AtomId) {
        let c = t.lit();
        match self.pool.get(e) {
            Pexpr::And(l, r) => {
                let (a, tmp_l) = self.side_literal(l);
                let (b, tmp_r) = self.side_literal(r);

                self.emit(vec![-a, -b, c]);
                self.emit(vec![a, -c]);
                self.emit(vec![b, -c]);

                if let Some(t) = tmp_l {
                    self.define(l, t);
                }
                if let Some(t) = tmp_r {
                    self.define(r, t);
                }
            }
            Pexpr::Or(l, r) => {
                let (a, tmp_l) = self.side_literal(l);
                let (b, tmp_r) = self.side_literal(r);

                self.emit(vec![a, b, -c]);
                self.emit(vec![-a, c]);
                self.emit(vec![-b, c]);

                if let Some(t) = tmp_l {
                    self.define(l, t);
                }
                if let Some(t) = tmp_r {
                    self.define(r, t);
                }
            }
            _ => {
                log::error!(target: targets::CNF, "temporary defined for a literal");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::Outcome;

    fn setup() -> (PexprPool, AtomTable) {
        let model = crate::structures::feature::FeatureModel::new();
        let atoms = AtomTable::new(&model);
        let pool = PexprPool::new(atoms.const_false, atoms.const_true);
        (pool, atoms)
    }

    /// Run one constraint through the encoder and return its clause count.
    fn encode_one(pool: &PexprPool, atoms: &mut AtomTable, e: PexprId) -> (ClauseDb, SatBridge) {
        let mut clauses = ClauseDb::default();
        let mut bridge = SatBridge::new();
        encode(pool, atoms, &[vec![e]], &mut clauses, &mut bridge);
        (clauses, bridge)
    }

    #[test]
    fn a_disjunction_of_literals_is_one_clause() {
        let (mut pool, mut atoms) = setup();
        let x = atoms.fresh_tseitin();
        let y = atoms.fresh_tseitin();
        let px = pool.atom(x);
        let py = pool.atom(y);
        let ny = pool.pnot(py);
        let or = pool.por(px, ny);

        let (clauses, _) = encode_one(&pool, &mut atoms, or);
        // two constant units plus the constraint itself
        assert_eq!(clauses.len(), 3);
        assert!(clauses.iter().any(|c| c == &[x.lit(), -y.lit()][..]));
    }

    #[test]
    fn tseitin_encoding_is_equisatisfiable() {
        let (mut pool, mut atoms) = setup();
        let x = atoms.fresh_tseitin();
        let y = atoms.fresh_tseitin();
        let z = atoms.fresh_tseitin();
        let px = pool.atom(x);
        let py = pool.atom(y);
        let pz = pool.atom(z);

        // (x ∧ y) ∨ ¬z : not a clause, needs a temporary
        let and = pool.pand(px, py);
        let nz = pool.pnot(pz);
        let or = pool.por(and, nz);

        let (_, mut bridge) = encode_one(&pool, &mut atoms, or);

        assert_eq!(bridge.solve_under(&[z.lit()]), Outcome::Sat);
        assert_eq!(bridge.value_of(x.0), 1);
        assert_eq!(bridge.value_of(y.0), 1);

        assert_eq!(
            bridge.solve_under(&[z.lit(), -x.lit()]),
            Outcome::Unsat
        );
    }
}
