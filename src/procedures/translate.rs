/*!
Translation of rule expressions into propositional expressions.

A tristate-aware rule has two propositional readings: "evaluates to yes"
and "evaluates to yes or mod". Both are produced here, together with the
exact-mod reading used by the default encoding. The translation tables:

| rule      | yes                 | mod                          | yes-or-mod              |
|-----------|---------------------|------------------------------|-------------------------|
| `a && b`  | Ya ∧ Yb             | (Ya∨Ma) ∧ (Yb∨Mb) ∧ ¬(Ya∧Yb) | (Ya∨Ma) ∧ (Yb∨Mb)       |
| `a \|\| b`| Ya ∨ Yb             | (Ma∨Mb) ∧ ¬Ya ∧ ¬Yb          | Ya ∨ Ma ∨ Yb ∨ Mb       |
| `!a`      | ¬(Ya ∨ Ma)          | Ma                           | ¬(Ya ∨ Ma) ∨ Ma         |

A rule can evaluate to `mod` only if it mentions the `m` constant or a
tristate feature; a single pre-pass computes that and short-circuits the
mod reading to constant false otherwise.

Equality splits on the operand kinds; ordered comparisons are evaluated for
a small hard-coded whitelist the original rule base uses as version/size
checks and are conservatively false everywhere else.
*/

use crate::misc::log::targets;
use crate::procedures::constraints::ConstraintBuilder;
use crate::structures::feature::{parse_prefix_int, FeatureId, FeatureType, Tristate};
use crate::structures::pexpr::PexprId;
use crate::structures::rule::{ExprId, RuleExpr};

impl<'a> ConstraintBuilder<'a> {
    /// The pexpr for "feature is yes".
    pub(crate) fn feat_y(&mut self, f: FeatureId) -> PexprId {
        let a = self.atoms.atom_y(self.model, f);
        self.pool.atom(a)
    }

    /// The pexpr for "feature is mod".
    pub(crate) fn feat_m(&mut self, f: FeatureId) -> PexprId {
        let a = self.atoms.atom_m(self.model, f);
        self.pool.atom(a)
    }

    /// The pexpr for "feature is yes or mod".
    pub(crate) fn feat_both(&mut self, f: FeatureId) -> PexprId {
        if self.model.feature(f).ftype == FeatureType::Tristate {
            let m = self.feat_m(f);
            let y = self.feat_y(f);
            self.pool.por(m, y)
        } else {
            self.feat_y(f)
        }
    }

    /// The pexpr for "feature is selected to yes or mod"; false without a
    /// reverse dependency.
    pub(crate) fn feat_sel_both(&mut self, f: FeatureId) -> PexprId {
        if self.model.feature(f).rev_dep.is_none() {
            return self.pool.pfalse();
        }
        let sel_y = match self.atoms.selected_y(f) {
            Some(a) => self.pool.atom(a),
            None => return self.pool.pfalse(),
        };
        match self.atoms.selected_m(f) {
            Some(m) => {
                let m = self.pool.atom(m);
                self.pool.por(m, sel_y)
            }
            None => sel_y,
        }
    }

    /// Whether a rule can evaluate to `mod` at all.
    pub(crate) fn can_evaluate_to_mod(&self, e: ExprId) -> bool {
        match self.model.rules.get(e) {
            RuleExpr::Symbol(f) => {
                self.model.feature(f).const_tri == Some(Tristate::Mod)
                    || self.model.feature(f).ftype == FeatureType::Tristate
            }
            RuleExpr::And(l, r) | RuleExpr::Or(l, r) => {
                self.can_evaluate_to_mod(l) || self.can_evaluate_to_mod(r)
            }
            RuleExpr::Not(inner) => self.can_evaluate_to_mod(inner),
            _ => false,
        }
    }

    /// When the rule evaluates to `yes`.
    pub(crate) fn pexpr_y(&mut self, e: ExprId) -> PexprId {
        match self.model.rules.get(e) {
            RuleExpr::Symbol(f) => self.feat_y(f),
            RuleExpr::And(l, r) => {
                let pl = self.pexpr_y(l);
                let pr = self.pexpr_y(r);
                self.pool.pand(pl, pr)
            }
            RuleExpr::Or(l, r) => {
                let pl = self.pexpr_y(l);
                let pr = self.pexpr_y(r);
                self.pool.por(pl, pr)
            }
            RuleExpr::Not(inner) => {
                let y = self.pexpr_y(inner);
                let m = self.pexpr_m(inner);
                let any = self.pool.por(y, m);
                self.pool.pnot(any)
            }
            RuleExpr::Equal(l, r) => self.pexpr_y_equals(l, r),
            RuleExpr::Unequal(l, r) => {
                let eq = self.pexpr_y_equals(l, r);
                self.pool.pnot(eq)
            }
            RuleExpr::Lth(..) | RuleExpr::Leq(..) | RuleExpr::Gth(..) | RuleExpr::Geq(..) => {
                self.pexpr_y_comparison(e)
            }
        }
    }

    /// When the rule evaluates exactly to `mod`; constant false if it
    /// cannot.
    pub(crate) fn pexpr_m(&mut self, e: ExprId) -> PexprId {
        if !self.can_evaluate_to_mod(e) {
            return self.pool.pfalse();
        }
        match self.model.rules.get(e) {
            RuleExpr::Symbol(f) => self.feat_m(f),
            RuleExpr::And(l, r) => {
                // (Ya ∨ Ma) ∧ (Yb ∨ Mb) ∧ ¬(Ya ∧ Yb)
                let ya = self.pexpr_y(l);
                let yb = self.pexpr_y(r);
                let both_yes = self.pool.pand(ya, yb);
                let not_both_yes = self.pool.pnot(both_yes);
                let ma = self.pexpr_m(l);
                let mb = self.pexpr_m(r);
                let la = self.pool.por(ya, ma);
                let lb = self.pool.por(yb, mb);
                let left = self.pool.pand(la, lb);
                self.pool.pand(left, not_both_yes)
            }
            RuleExpr::Or(l, r) => {
                // (Ma ∨ Mb) ∧ ¬Ya ∧ ¬Yb
                let yb = self.pexpr_y(r);
                let not_yb = self.pool.pnot(yb);
                let ma = self.pexpr_m(l);
                let mb = self.pexpr_m(r);
                let any_m = self.pool.por(ma, mb);
                let ya = self.pexpr_y(l);
                let not_ya = self.pool.pnot(ya);
                let left = self.pool.pand(any_m, not_ya);
                self.pool.pand(left, not_yb)
            }
            RuleExpr::Not(inner) => self.pexpr_m(inner),
            _ => {
                // comparisons cannot pass the pre-check
                log::error!(target: targets::TRANSLATE, "mod reading of a non-tristate rule");
                self.pool.pfalse()
            }
        }
    }

    /// When the rule evaluates to `yes` or `mod`.
    pub(crate) fn pexpr_both(&mut self, e: ExprId) -> PexprId {
        if !self.can_evaluate_to_mod(e) {
            return self.pexpr_y(e);
        }
        match self.model.rules.get(e) {
            RuleExpr::Symbol(_) | RuleExpr::Not(_) => {
                let m = self.pexpr_m(e);
                let y = self.pexpr_y(e);
                self.pool.por(m, y)
            }
            RuleExpr::And(l, r) => {
                let ya = self.pexpr_y(l);
                let ma = self.pexpr_m(l);
                let pa = self.pool.por(ya, ma);
                let yb = self.pexpr_y(r);
                let mb = self.pexpr_m(r);
                let pb = self.pool.por(yb, mb);
                self.pool.pand(pa, pb)
            }
            RuleExpr::Or(l, r) => {
                let ya = self.pexpr_y(l);
                let ma = self.pexpr_m(l);
                let pa = self.pool.por(ya, ma);
                let yb = self.pexpr_y(r);
                let mb = self.pexpr_m(r);
                let pb = self.pool.por(yb, mb);
                self.pool.por(pa, pb)
            }
            RuleExpr::Equal(l, r) => self.pexpr_y_equals(l, r),
            RuleExpr::Unequal(l, r) => {
                let eq = self.pexpr_y_equals(l, r);
                self.pool.pnot(eq)
            }
            _ => self.pexpr_y_comparison(e),
        }
    }

    /// The yes reading of `l = r`, split on operand kinds.
    fn pexpr_y_equals(&mut self, l: FeatureId, r: FeatureId) -> PexprId {
        let model = self.model;

        // two tristate constants
        if model.is_tristate_constant(l) && model.is_tristate_constant(r) {
            return if l == r { self.pool.ptrue() } else { self.pool.pfalse() };
        }

        // two literal constants
        if model.feature(l).ftype == FeatureType::Unknown
            && model.feature(r).ftype == FeatureType::Unknown
        {
            return if model.feature(l).name == model.feature(r).name {
                self.pool.ptrue()
            } else {
                self.pool.pfalse()
            };
        }

        // two boolean/tristate operands, constants included
        if model.is_bool_or_triconst(l) && model.is_bool_or_triconst(r) {
            let ly = self.feat_y(l);
            let ry = self.feat_y(r);
            let yes = self.equiv(ly, ry);
            let lm = self.feat_m(l);
            let rm = self.feat_m(r);
            let modded = self.equiv(lm, rm);
            return self.pool.pand(yes, modded);
        }

        // a non-boolean against a literal
        if model.is_nonboolean(l) && model.feature(r).ftype == FeatureType::Unknown {
            let value = model.feature(r).name.clone().unwrap_or_default();
            let atom = self.atoms.nonbool_val_or_create(model, l, &value);
            return self.pool.atom(atom);
        }
        if model.feature(l).ftype == FeatureType::Unknown && model.is_nonboolean(r) {
            let value = model.feature(l).name.clone().unwrap_or_default();
            let atom = self.atoms.nonbool_val_or_create(model, r, &value);
            return self.pool.atom(atom);
        }

        // a non-boolean against a tristate constant can never hold
        if model.is_nonboolean(l) && model.is_tristate_constant(r) {
            return self.pool.pfalse();
        }
        if model.is_tristate_constant(l) && model.is_nonboolean(r) {
            return self.pool.pfalse();
        }

        // remaining mixes (two non-booleans, boolean against literal) are a
        // known limitation and conservatively false
        log::debug!(
            target: targets::TRANSLATE,
            "unsupported equality {} = {}",
            model.display_name(l),
            model.display_name(r)
        );
        self.pool.pfalse()
    }

    fn equiv(&mut self, a: PexprId, b: PexprId) -> PexprId {
        let both = self.pool.pand(a, b);
        let na = self.pool.pnot(a);
        let nb = self.pool.pnot(b);
        let neither = self.pool.pand(na, nb);
        self.pool.por(both, neither)
    }

    /// Ordered comparisons: only two feature pairs of the original rule
    /// base are evaluated, everything else is conservatively false.
    fn pexpr_y_comparison(&mut self, e: ExprId) -> PexprId {
        let (l, r) = match self.model.rules.get(e) {
            RuleExpr::Lth(l, r)
            | RuleExpr::Leq(l, r)
            | RuleExpr::Gth(l, r)
            | RuleExpr::Geq(l, r) => (l, r),
            _ => return self.pool.pfalse(),
        };

        let model = self.model;
        let named =
            |id: FeatureId, name: &str| model.feature(id).name.as_deref() == Some(name);

        if named(l, "GCC_VERSION") || named(r, "GCC_VERSION") {
            let (version_sym, literal_sym) = if named(l, "GCC_VERSION") { (l, r) } else { (r, l) };
            let actual = parse_prefix_int(&model.string_value(version_sym), 10);
            let wanted =
                parse_prefix_int(model.feature(literal_sym).name.as_deref().unwrap_or(""), 10);
            // compare in source order, not lookup order
            let (lhs, rhs) = if named(l, "GCC_VERSION") { (actual, wanted) } else { (wanted, actual) };
            let holds = self.holds(e, lhs, rhs);
            return self.const_of(holds);
        }

        if (named(l, "CRAMFS") || named(r, "CRAMFS")) && (named(l, "MTD") || named(r, "MTD")) {
            let lv = model.tristate_value(l) as i64;
            let rv = model.tristate_value(r) as i64;
            let holds = self.holds(e, lv, rv);
            return self.const_of(holds);
        }

        self.pool.pfalse()
    }

    fn holds(&self, e: ExprId, lhs: i64, rhs: i64) -> bool {
        match self.model.rules.get(e) {
            RuleExpr::Lth(..) => lhs < rhs,
            RuleExpr::Leq(..) => lhs <= rhs,
            RuleExpr::Gth(..) => lhs > rhs,
            RuleExpr::Geq(..) => lhs >= rhs,
            _ => false,
        }
    }

    fn const_of(&mut self, b: bool) -> PexprId {
        if b {
            self.pool.ptrue()
        } else {
            self.pool.pfalse()
        }
    }
}
