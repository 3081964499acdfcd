/*!
Propositional expressions over atoms.

Pexprs are built only through the smart constructors on [PexprPool], which
enforce three things on the fly:

- constants are absorbed (`x ∧ ⊥ = ⊥`, `x ∧ ⊤ = x`, dually for or);
- negation is pushed to atoms (De Morgan) and double negation is removed;
- structurally identical siblings of a conjunction or disjunction collapse.

Every stored pexpr is therefore in negation normal form.

The pool is a hash-consing arena: structurally equal expressions share one
node, so the structural-equality checks the simplifications rely on are id
comparisons, and the whole pool is dropped with its session.
*/

use std::collections::HashMap;

use crate::structures::atom::AtomId;

/// Index of a pexpr node in its [PexprPool].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PexprId(pub u32);

/// A node of a propositional expression.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Pexpr {
    Atom(AtomId),
    Not(PexprId),
    And(PexprId, PexprId),
    Or(PexprId, PexprId),
}

/// Session-scoped arena of hash-consed pexpr nodes.
#[derive(Debug)]
pub struct PexprPool {
    nodes: Vec<Pexpr>,
    interned: HashMap<Pexpr, PexprId>,
    ptrue: PexprId,
    pfalse: PexprId,
}

impl PexprPool {
    /// A pool knowing the atoms of the two constants.
    pub fn new(const_false: AtomId, const_true: AtomId) -> Self {
        let mut pool = PexprPool {
            nodes: Vec::new(),
            interned: HashMap::new(),
            ptrue: PexprId(0),
            pfalse: PexprId(0),
        };
        pool.pfalse = pool.intern(Pexpr::Atom(const_false));
        pool.ptrue = pool.intern(Pexpr::Atom(const_true));
        pool
    }

    pub fn get(&self, id: PexprId) -> Pexpr {
        self.nodes[id.0 as usize]
    }

    /// The constant-true pexpr.
    pub fn ptrue(&self) -> PexprId {
        self.ptrue
    }

    /// The constant-false pexpr.
    pub fn pfalse(&self) -> PexprId {
        self.pfalse
    }

    fn intern(&mut self, node: Pexpr) -> PexprId {
        if let Some(id) = self.interned.get(&node) {
            return *id;
        }
        let id = PexprId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.interned.insert(node, id);
        id
    }

    /// The pexpr for a single atom.
    pub fn atom(&mut self, a: AtomId) -> PexprId {
        self.intern(Pexpr::Atom(a))
    }

    /// Conjunction with constant absorption and duplicate collapse.
    pub fn pand(&mut self, a: PexprId, b: PexprId) -> PexprId {
        if a == self.pfalse || b == self.pfalse {
            return self.pfalse;
        }
        if a == self.ptrue {
            return b;
        }
        if b == self.ptrue {
            return a;
        }
        if a == b {
            return a;
        }
        self.intern(Pexpr::And(a, b))
    }

    /// Disjunction with constant absorption and duplicate collapse.
    pub fn por(&mut self, a: PexprId, b: PexprId) -> PexprId {
        if a == self.pfalse {
            return b;
        }
        if b == self.pfalse {
            return a;
        }
        if a == self.ptrue || b == self.ptrue {
            return self.ptrue;
        }
        if a == b {
            return a;
        }
        self.intern(Pexpr::Or(a, b))
    }

    /// Negation: constants flip, double negation cancels, and De Morgan
    /// pushes the negation down over conjunction and disjunction.
    pub fn pnot(&mut self, a: PexprId) -> PexprId {
        if a == self.pfalse {
            return self.ptrue;
        }
        if a == self.ptrue {
            return self.pfalse;
        }
        match self.get(a) {
            Pexpr::Not(inner) => inner,
            Pexpr::And(l, r) => {
                let nl = self.pnot(l);
                let nr = self.pnot(r);
                self.por(nl, nr)
            }
            Pexpr::Or(l, r) => {
                let nl = self.pnot(l);
                let nr = self.pnot(r);
                self.pand(nl, nr)
            }
            Pexpr::Atom(_) => self.intern(Pexpr::Not(a)),
        }
    }

    /// `a → b`, as `¬a ∨ b`.
    pub fn pimplies(&mut self, a: PexprId, b: PexprId) -> PexprId {
        let na = self.pnot(a);
        self.por(na, b)
    }

    /// An atom or a negated atom.
    pub fn is_literal(&self, id: PexprId) -> bool {
        match self.get(id) {
            Pexpr::Atom(_) => true,
            Pexpr::Not(inner) => matches!(self.get(inner), Pexpr::Atom(_)),
            _ => false,
        }
    }

    /// A disjunction of literals, directly emittable as one clause.
    pub fn is_clause(&self, id: PexprId) -> bool {
        match self.get(id) {
            Pexpr::Atom(_) => true,
            Pexpr::Not(inner) => matches!(self.get(inner), Pexpr::Atom(_)),
            Pexpr::Or(l, r) => self.is_clause(l) && self.is_clause(r),
            Pexpr::And(_, _) => false,
        }
    }

    /// Negation only in front of atoms. Holds for everything the
    /// constructors produce.
    pub fn is_nnf(&self, id: PexprId) -> bool {
        match self.get(id) {
            Pexpr::Atom(_) => true,
            Pexpr::Not(inner) => matches!(self.get(inner), Pexpr::Atom(_)),
            Pexpr::And(l, r) | Pexpr::Or(l, r) => self.is_nnf(l) && self.is_nnf(r),
        }
    }

    /// The signed SAT literal of an atom or negated atom.
    pub fn literal_of(&self, id: PexprId) -> Option<i32> {
        match self.get(id) {
            Pexpr::Atom(a) => Some(a.lit()),
            Pexpr::Not(inner) => match self.get(inner) {
                Pexpr::Atom(a) => Some(-a.lit()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> PexprPool {
        PexprPool::new(AtomId(1), AtomId(2))
    }

    #[test]
    fn constants_absorb() {
        let mut p = pool();
        let a = p.atom(AtomId(3));
        let t = p.ptrue();
        let f = p.pfalse();

        assert_eq!(p.pand(a, f), f);
        assert_eq!(p.pand(a, t), a);
        assert_eq!(p.por(a, f), a);
        assert_eq!(p.por(a, t), t);
        assert_eq!(p.pand(a, a), a);
        assert_eq!(p.por(a, a), a);
    }

    #[test]
    fn negation_stays_on_atoms() {
        let mut p = pool();
        let a = p.atom(AtomId(3));
        let b = p.atom(AtomId(4));

        let and = p.pand(a, b);
        let neg = p.pnot(and);
        assert!(p.is_nnf(neg));
        assert!(matches!(p.get(neg), Pexpr::Or(_, _)));

        let double = p.pnot(neg);
        assert!(p.is_nnf(double));
        // ¬¬(a ∧ b) normalises back to a conjunction of the two atoms.
        assert_eq!(double, and);
    }

    #[test]
    fn implication_shape() {
        let mut p = pool();
        let a = p.atom(AtomId(3));
        let b = p.atom(AtomId(4));
        let imp = p.pimplies(a, b);
        assert!(p.is_clause(imp));
    }

    #[test]
    fn interning_makes_equality_structural() {
        let mut p = pool();
        let a = p.atom(AtomId(3));
        let b = p.atom(AtomId(4));
        let e1 = p.pand(a, b);
        let e2 = p.pand(a, b);
        assert_eq!(e1, e2);
    }
}
