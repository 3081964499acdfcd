/*!
Constraint generation.

Walks every feature of the model and emits the full constraint set:

1. tristate exclusion, and `mod` requiring the modules feature;
2. select propagation through SELECTED_Y/SELECTED_M with the accumulated
   selector disjunctions;
3. direct-dependency implications for booleans and tristates;
4. choice prompt, choice member dependencies, and choice-group exclusivity;
5. invisible-default behaviour through NO_PROMPT_COND atoms, with defaults
   folded under the first-match-wins discipline;
6. non-boolean domain (at-least-one, at-most-one), range filters, value
   dependencies, and visible-prompt-forces-value.

Constraints attach to the feature that owns them, in emission order, and are
never mutated afterwards; the CNF encoder is their only consumer.
*/

use crate::db::atom::AtomTable;
use crate::misc::log::targets;
use crate::structures::feature::{
    parse_prefix_int, FeatureId, FeatureModel, FeatureType,
};
use crate::structures::pexpr::{PexprId, PexprPool};
use crate::structures::rule::RuleExpr;

/// A feature the boolean invisible-default encoding skips, working around a
/// double definition upstream. Needs upstream confirmation.
const SKIPPED_DEFAULT_OFF: &str = "X86_EXTENDED_PLATFORM";

/// Shared state of constraint generation; the rule translation lives in
/// [crate::procedures::translate].
pub struct ConstraintBuilder<'a> {
    pub(crate) model: &'a FeatureModel,
    pub(crate) atoms: &'a mut AtomTable,
    pub(crate) pool: &'a mut PexprPool,
    constraints: Vec<Vec<PexprId>>,
    /// Per-feature disjunction of "something selects this to yes".
    list_sel_y: Vec<Option<PexprId>>,
    /// Per-feature disjunction of "something selects this to at least mod".
    list_sel_m: Vec<Option<PexprId>>,
}

/// The folded defaults of one feature.
struct DefaultMap {
    /// Condition under which some default makes the feature `yes`.
    yes: PexprId,
    /// Condition under which some default makes the feature `mod`.
    modded: PexprId,
    /// Whether any default entered the map at all.
    any: bool,
}

/// Emit the constraint set for a model. Returns one ordered constraint list
/// per feature.
pub fn generate(
    model: &FeatureModel,
    atoms: &mut AtomTable,
    pool: &mut PexprPool,
) -> Vec<Vec<PexprId>> {
    let n = model.len();
    let mut builder = ConstraintBuilder {
        model,
        atoms,
        pool,
        constraints: vec![Vec::new(); n],
        list_sel_y: vec![None; n],
        list_sel_m: vec![None; n],
    };

    builder.booleans();
    builder.selected_links();
    builder.nonbooleans();

    log::debug!(
        target: targets::CONSTRAINTS,
        "emitted {} constraints",
        builder.constraints.iter().map(Vec::len).sum::<usize>()
    );

    builder.constraints
}

impl<'a> ConstraintBuilder<'a> {
    fn add(&mut self, owner: FeatureId, c: PexprId) {
        if c == self.pool.ptrue() {
            return;
        }
        if c == self.pool.pfalse() {
            log::error!(
                target: targets::CONSTRAINTS,
                "contradictory constraint on {}",
                self.model.display_name(owner)
            );
        }
        debug_assert!(self.pool.is_nnf(c));
        self.constraints[owner.0 as usize].push(c);
    }

    /// Add, skipping a constraint the owner already carries.
    fn add_dedup(&mut self, owner: FeatureId, c: PexprId) {
        if self.constraints[owner.0 as usize].contains(&c) {
            return;
        }
        self.add(owner, c);
    }

    fn modules_y(&mut self) -> PexprId {
        match self.model.modules {
            Some(m) => self.feat_y(m),
            None => self.pool.pfalse(),
        }
    }

    /// The `yes`/`mod` readings of an optional visibility condition;
    /// constant true when absent.
    fn cond_y_both(&mut self, cond: Option<crate::structures::rule::ExprId>) -> (PexprId, PexprId) {
        match cond {
            Some(c) => (self.pexpr_y(c), self.pexpr_both(c)),
            None => (self.pool.ptrue(), self.pool.ptrue()),
        }
    }

    /* boolean pass */

    fn booleans(&mut self) {
        for id in self.model.ids() {
            if !self.model.is_boolean(id) {
                continue;
            }

            if self.model.feature(id).ftype == FeatureType::Tristate {
                self.tristate_exclusion(id);
            }

            self.selects_of(id);

            if self.model.feature(id).dir_dep.is_some()
                && !self.model.is_choice(id)
                && !self.model.is_choice_member(id)
            {
                self.bool_dependencies(id);
            }

            if self.model.is_choice(id) {
                self.choice_prompt(id);
            }

            if self.model.is_choice(id) || self.model.is_choice_member(id) {
                self.choice_dependencies(id);
            }

            if self.model.is_choice(id) {
                self.choice_group(id);
            }

            self.invisible_defaults(id);
        }
    }

    /// `X` and `X_MODULE` are mutually exclusive, and `X_MODULE` needs the
    /// modules feature.
    fn tristate_exclusion(&mut self, id: FeatureId) {
        let y = self.feat_y(id);
        let m = self.feat_m(id);
        let ny = self.pool.pnot(y);
        let nm = self.pool.pnot(m);
        let excl = self.pool.por(ny, nm);
        self.add(id, excl);

        if self.model.modules.is_some() {
            let modules = self.modules_y();
            let c = self.pool.pimplies(m, modules);
            self.add(id, c);
        }
    }

    /// Every `select target if cond` site on `id` feeds the target's
    /// SELECTED_Y/SELECTED_M atoms and selector disjunctions.
    fn selects_of(&mut self, id: FeatureId) {
        for prop in self.model.feature(id).selects.clone() {
            let target = prop.target;

            if self.model.feature(target).ftype == FeatureType::Unknown
                || !self.model.is_boolean(target)
            {
                continue;
            }
            if self.model.feature(target).rev_dep.is_none() {
                continue;
            }

            let (cond_y, cond_both) = self.cond_y_both(prop.cond);

            let src_y = self.feat_y(id);
            let trigger_y = self.pool.pand(cond_y, src_y);
            let Some(sel_y) = self.atoms.selected_y(target) else {
                continue;
            };
            let sel_y = self.pool.atom(sel_y);
            let e1 = self.pool.pimplies(trigger_y, sel_y);
            self.add(target, e1);

            self.list_sel_y[target.0 as usize] = Some(match self.list_sel_y[target.0 as usize] {
                Some(acc) => self.pool.por(acc, trigger_y),
                None => trigger_y,
            });

            // nothing more to do when neither side can be a module
            if self.model.feature(id).ftype == FeatureType::Bool
                && self.model.feature(target).ftype == FeatureType::Bool
            {
                continue;
            }

            let src_both = self.feat_both(id);
            let trigger_both = self.pool.pand(cond_both, src_both);
            let target_sel_both = self.feat_sel_both(target);
            let e2 = self.pool.pimplies(trigger_both, target_sel_both);
            self.add(target, e2);

            if self.model.feature(target).ftype == FeatureType::Tristate {
                self.list_sel_m[target.0 as usize] =
                    Some(match self.list_sel_m[target.0 as usize] {
                        Some(acc) => self.pool.por(acc, trigger_both),
                        None => trigger_both,
                    });
            } else {
                self.list_sel_y[target.0 as usize] =
                    Some(match self.list_sel_y[target.0 as usize] {
                        Some(acc) => self.pool.por(acc, trigger_both),
                        None => trigger_both,
                    });
            }
        }
    }

    /// Tie each SELECTED_* atom to the accumulated selector disjunction and
    /// to the feature value it forces.
    fn selected_links(&mut self) {
        for id in self.model.ids() {
            if !self.model.is_boolean(id)
                || self.model.is_choice(id)
                || self.model.is_choice_member(id)
            {
                continue;
            }
            if self.model.feature(id).rev_dep.is_none() {
                continue;
            }
            let Some(list_y) = self.list_sel_y[id.0 as usize] else {
                continue;
            };

            let Some(sel_y) = self.atoms.selected_y(id) else {
                continue;
            };
            let sel_y = self.pool.atom(sel_y);

            let y = self.feat_y(id);
            let forced = self.pool.pimplies(sel_y, y);
            self.add(id, forced);

            let grounded = self.pool.pimplies(sel_y, list_y);
            self.add(id, grounded);

            if self.model.feature(id).ftype == FeatureType::Bool {
                continue;
            }

            let Some(sel_m) = self.atoms.selected_m(id) else {
                continue;
            };
            let sel_m = self.pool.atom(sel_m);

            let both = self.feat_both(id);
            let forced_m = self.pool.pimplies(sel_m, both);
            self.add(id, forced_m);

            if let Some(list_m) = self.list_sel_m[id.0 as usize] {
                let grounded_m = self.pool.pimplies(sel_m, list_m);
                self.add(id, grounded_m);
            }
        }
    }

    /// `X` implies its dependency or its selection.
    fn bool_dependencies(&mut self, id: FeatureId) {
        let Some(dep) = self.model.feature(id).dir_dep else {
            return;
        };
        let dep_both = self.pexpr_both(dep);

        if self.model.feature(id).ftype == FeatureType::Tristate {
            let dep_y = self.pexpr_y(dep);
            let sel_y = match self.atoms.selected_y(id) {
                Some(a) => self.pool.atom(a),
                None => self.pool.pfalse(),
            };
            let y = self.feat_y(id);
            let dep_or_sel = self.pool.por(dep_y, sel_y);
            let c1 = self.pool.pimplies(y, dep_or_sel);
            self.add(id, c1);

            let m = self.feat_m(id);
            let sel_both = self.feat_sel_both(id);
            let dep_or_sel_m = self.pool.por(dep_both, sel_both);
            let c2 = self.pool.pimplies(m, dep_or_sel_m);
            self.add(id, c2);
        } else {
            let y = self.feat_y(id);
            let sel_both = self.feat_sel_both(id);
            let dep_or_sel = self.pool.por(dep_both, sel_both);
            let c = self.pool.pimplies(y, dep_or_sel);
            self.add(id, c);
        }
    }

    /* choices */

    /// A non-optional visible choice is on; an active choice has a visible
    /// prompt.
    fn choice_prompt(&mut self, id: FeatureId) {
        let Some(prompt) = self.model.feature(id).prompt.clone() else {
            return;
        };
        let prompt_cond = match prompt.cond {
            Some(c) => self.pexpr_both(c),
            None => self.pool.ptrue(),
        };
        let both = self.feat_both(id);

        if !self.model.feature(id).choice_optional {
            let required = self.pool.pimplies(prompt_cond, both);
            self.add(id, required);
        }

        let gated = self.pool.pimplies(both, prompt_cond);
        self.add(id, gated);
    }

    /// Choice groups depend through their prompt, members through their
    /// direct dependency.
    fn choice_dependencies(&mut self, id: FeatureId) {
        let to_parse = if self.model.is_choice(id) {
            match self.model.feature(id).prompt.as_ref().and_then(|p| p.cond) {
                Some(c) => c,
                None => return,
            }
        } else {
            match self.model.feature(id).dir_dep {
                Some(d) => d,
                None => return,
            }
        };

        let dep_both = self.pexpr_both(to_parse);

        if self.model.feature(id).ftype == FeatureType::Tristate {
            let dep_y = self.pexpr_y(to_parse);
            let y = self.feat_y(id);
            let c1 = self.pool.pimplies(y, dep_y);
            self.add_dedup(id, c1);

            let m = self.feat_m(id);
            let c2 = self.pool.pimplies(m, dep_both);
            self.add_dedup(id, c2);
        } else {
            let y = self.feat_y(id);
            let c = self.pool.pimplies(y, dep_both);
            self.add_dedup(id, c);
        }
    }

    /// Membership and exclusivity of a choice group.
    fn choice_group(&mut self, id: FeatureId) {
        if self.model.feature(id).prompt.is_none() {
            return;
        }

        let members = self.model.feature(id).choice_members.clone();
        let prompted: Vec<FeatureId> = members
            .iter()
            .copied()
            .filter(|m| self.model.has_prompt(*m))
            .collect();

        // an enabled choice enables at least one prompted member
        let mut any_member: Option<PexprId> = None;
        for m in &prompted {
            let my = self.feat_y(*m);
            any_member = Some(match any_member {
                Some(acc) => self.pool.por(acc, my),
                None => my,
            });
        }
        if let Some(any) = any_member {
            let y = self.feat_y(id);
            let c = self.pool.pimplies(y, any);
            self.add(id, c);
        }

        // every member, prompted or not, implies the group
        for m in &members {
            let mb = self.feat_both(*m);
            let gb = self.feat_both(id);
            let c = self.pool.pimplies(mb, gb);
            self.add(id, c);
        }

        let group_tri = self.model.feature(id).ftype == FeatureType::Tristate;

        // members can only be modules when the whole group is
        if group_tri {
            for m in &members {
                if self.model.feature(*m).ftype == FeatureType::Tristate {
                    let mm = self.feat_m(*m);
                    let gm = self.feat_m(id);
                    let c = self.pool.pimplies(mm, gm);
                    self.add(id, c);
                }
            }
        }

        // a boolean group admits no modules at all
        if !group_tri {
            for m in &members {
                if self.model.feature(*m).ftype == FeatureType::Tristate {
                    let mm = self.feat_m(*m);
                    let c = self.pool.pnot(mm);
                    self.add(id, c);
                }
            }
        }

        // prompted members are pairwise exclusive at yes
        for (i, a) in prompted.iter().enumerate() {
            for b in &prompted[i + 1..] {
                let ay = self.feat_y(*a);
                let by = self.feat_y(*b);
                let na = self.pool.pnot(ay);
                let nb = self.pool.pnot(by);
                let c = self.pool.por(na, nb);
                self.add(id, c);
            }
        }

        // a member at yes rules out later members being modules
        if group_tri {
            for (i, p) in prompted.iter().enumerate() {
                let later_tri: Vec<FeatureId> = prompted[i + 1..]
                    .iter()
                    .copied()
                    .filter(|q| self.model.feature(*q).ftype == FeatureType::Tristate)
                    .collect();
                if later_tri.is_empty() {
                    continue;
                }

                let mut none_mod: Option<PexprId> = None;
                for q in later_tri {
                    let qm = self.feat_m(q);
                    let nq = self.pool.pnot(qm);
                    none_mod = Some(match none_mod {
                        Some(acc) => self.pool.pand(acc, nq),
                        None => nq,
                    });
                }
                let none_mod = none_mod.unwrap();
                let py = self.feat_y(*p);
                let c = self.pool.pimplies(py, none_mod);
                self.add(id, c);
            }
        }
    }

    /* invisible defaults */

    /// Behaviour of a feature while its prompt is invisible: defaults pull
    /// it on, and without an applicable default only a selector may hold it
    /// on.
    fn invisible_defaults(&mut self, id: FeatureId) {
        let prompt = self.model.feature(id).prompt.clone();

        // an unconditional prompt is always visible, nothing to encode
        if let Some(p) = &prompt {
            if p.cond.is_none() {
                return;
            }
        }

        let (prompt_both, prompt_yes, npc_cond) = match &prompt {
            None => (self.pool.pfalse(), self.pool.pfalse(), self.pool.ptrue()),
            Some(p) => {
                let cond = p.cond.unwrap();
                let both = self.pexpr_both(cond);
                let yes = self.pexpr_y(cond);
                let not_both = self.pool.pnot(both);
                (both, yes, not_both)
            }
        };

        let npc_atom = self.atoms.create_npc(self.model, id);
        let npc = self.pool.atom(npc_atom);
        let c = self.pool.pimplies(npc_cond, npc);
        self.add(id, c);

        let defaults = self.fold_defaults(id);
        let default_both = self.pool.por(defaults.yes, defaults.modded);

        let tri = self.model.feature(id).ftype == FeatureType::Tristate;

        // tristates are only selectable as yes while visible as yes
        if tri {
            let y = self.feat_y(id);
            let inner = self.pool.pimplies(y, prompt_yes);
            let e1 = self.pool.pimplies(prompt_both, inner);
            self.add(id, e1);
        }

        // invisible and off by default: only a selector can hold the value
        if tri {
            let y = self.feat_y(id);
            let m = self.feat_m(id);
            let (sel_y, sel_m, sel_both) = match self.atoms.selected_y(id) {
                Some(sy) => {
                    let sy = self.pool.atom(sy);
                    let sm = self
                        .atoms
                        .selected_m(id)
                        .map(|a| self.pool.atom(a))
                        .unwrap_or_else(|| self.pool.pfalse());
                    let either = self.pool.por(sm, sy);
                    (
                        self.pool.pimplies(y, sy),
                        self.pool.pimplies(m, sm),
                        self.pool.pimplies(y, either),
                    )
                }
                None => {
                    let ny = self.pool.pnot(y);
                    let nm = self.pool.pnot(m);
                    (ny, nm, ny)
                }
            };

            let modules = self.modules_y();
            let no_modules = self.pool.pnot(modules);

            let not_dy = self.pool.pnot(defaults.yes);
            let c1 = self.pool.pimplies(not_dy, sel_y);
            let c2 = self.pool.pimplies(modules, c1);
            let c3 = self.pool.pimplies(npc, c2);
            self.add(id, c3);

            let not_dm = self.pool.pnot(defaults.modded);
            let d1 = self.pool.pimplies(not_dm, sel_m);
            let d2 = self.pool.pimplies(modules, d1);
            let d3 = self.pool.pimplies(npc, d2);
            self.add(id, d3);

            let not_db = self.pool.pnot(default_both);
            let e1 = self.pool.pimplies(not_db, sel_both);
            let e2 = self.pool.pimplies(no_modules, e1);
            let e3 = self.pool.pimplies(npc, e2);
            self.add(id, e3);
        } else {
            // the upstream encoding skips this branch for one doubly
            // defined feature
            if self.model.feature(id).name.as_deref() != Some(SKIPPED_DEFAULT_OFF) {
                let y = self.feat_y(id);
                let sel_y = match self.atoms.selected_y(id) {
                    Some(sy) => {
                        let sy = self.pool.atom(sy);
                        self.pool.pimplies(y, sy)
                    }
                    None => self.pool.pnot(y),
                };
                let not_db = self.pool.pnot(default_both);
                let e1 = self.pool.pimplies(not_db, sel_y);
                let e2 = self.pool.pimplies(npc, e1);
                self.add_dedup(id, e2);
            }
        }

        // invisible and on by default: the defaults pull the feature up
        if !defaults.any {
            return;
        }
        if tri {
            let y = self.feat_y(id);
            let pull_y = self.pool.pimplies(defaults.yes, y);
            let e1 = self.pool.pimplies(npc, pull_y);
            self.add(id, e1);

            let both = self.feat_both(id);
            let pull_m = self.pool.pimplies(defaults.modded, both);
            let e2 = self.pool.pimplies(npc, pull_m);
            self.add(id, e2);
        } else {
            let y = self.feat_y(id);
            let pull = self.pool.pimplies(default_both, y);
            let c = self.pool.pimplies(npc, pull);
            self.add(id, c);
        }
    }

    /// Fold the defaults of a feature, each guarded by the negation of the
    /// conditions of earlier defaults.
    fn fold_defaults(&mut self, id: FeatureId) -> DefaultMap {
        let mut map = DefaultMap {
            yes: self.pool.pfalse(),
            modded: self.pool.pfalse(),
            any: false,
        };
        let mut covered = self.pool.pfalse();

        let tri = self.model.feature(id).ftype == FeatureType::Tristate;

        for d in self.model.feature(id).defaults.clone() {
            let (cond_yes, cond_mod, cond_both) = match d.cond {
                Some(c) => (self.pexpr_y(c), self.pexpr_m(c), self.pexpr_both(c)),
                None => (self.pool.ptrue(), self.pool.ptrue(), self.pool.ptrue()),
            };

            let value = self.model.rules.get(d.value);

            match value {
                RuleExpr::Symbol(v) if tri && v == self.model.const_yes => {
                    Self::fold_into(self.pool, &mut map.yes, cond_yes, &mut covered);
                    Self::fold_into(self.pool, &mut map.modded, cond_mod, &mut covered);
                    map.any = true;
                }
                RuleExpr::Symbol(v) if self.model.is_tristate_constant(v) => {
                    let slot = if v == self.model.const_yes {
                        &mut map.yes
                    } else if v == self.model.const_mod {
                        &mut map.modded
                    } else {
                        // a default of `n` adds nothing
                        continue;
                    };
                    Self::fold_into(self.pool, slot, cond_both, &mut covered);
                    map.any = true;
                }
                RuleExpr::Symbol(v)
                    if self.model.feature(v).ftype == FeatureType::Unknown =>
                {
                    // literal defaults only matter for non-boolean values
                    continue;
                }
                _ if tri => {
                    let vy = self.pexpr_y(d.value);
                    let ey = self.pool.pand(vy, cond_yes);
                    Self::fold_into(self.pool, &mut map.yes, ey, &mut covered);

                    let vm = self.pexpr_m(d.value);
                    let em = self.pool.pand(vm, cond_mod);
                    Self::fold_into(self.pool, &mut map.modded, em, &mut covered);
                    map.any = true;
                }
                RuleExpr::Symbol(v)
                    if self.model.is_nonboolean(id) && self.model.is_nonboolean(v) =>
                {
                    continue;
                }
                _ => {
                    let vb = self.pexpr_both(d.value);
                    let eb = self.pool.pand(vb, cond_both);
                    Self::fold_into(self.pool, &mut map.yes, eb, &mut covered);
                    map.any = true;
                }
            }
        }

        map
    }

    fn fold_into(pool: &mut PexprPool, slot: &mut PexprId, cond: PexprId, covered: &mut PexprId) {
        let not_covered = pool.pnot(*covered);
        let guarded = pool.pand(cond, not_covered);
        *slot = pool.por(*slot, guarded);
        *covered = pool.por(*covered, cond);
    }

    /* non-boolean pass */

    fn nonbooleans(&mut self) {
        // first everything that may add known values
        for id in self.model.ids() {
            if !self.model.is_nonboolean(id) {
                continue;
            }

            if matches!(
                self.model.feature(id).ftype,
                FeatureType::Int | FeatureType::Hex
            ) {
                self.nonbool_range_values(id);
            }

            if self.model.has_prompt(id) {
                self.nonbool_prompt_forces_value(id);
            }

            let current = self.model.string_value(id);
            if !current.is_empty() {
                self.atoms.nonbool_val_or_create(self.model, id, &current);
            }
        }

        // then the constraints over the now-complete domains
        for id in self.model.ids() {
            if !self.model.is_nonboolean(id) {
                continue;
            }

            if matches!(
                self.model.feature(id).ftype,
                FeatureType::Int | FeatureType::Hex
            ) {
                self.nonbool_ranges(id);
            }

            if self.model.feature(id).dir_dep.is_some() {
                self.nonbool_dependencies(id);
            }

            self.nonbool_at_least_one(id);
            self.nonbool_at_most_one(id);
        }
    }

    /// Range bounds are known values of the domain.
    fn nonbool_range_values(&mut self, id: FeatureId) {
        for range in self.model.feature(id).ranges.clone() {
            let lo = self.model.display_name(range.lo);
            let hi = self.model.display_name(range.hi);
            self.atoms.nonbool_val_or_create(self.model, id, &lo);
            self.atoms.nonbool_val_or_create(self.model, id, &hi);
        }
    }

    /// A visible prompt implies the feature has a value.
    fn nonbool_prompt_forces_value(&mut self, id: FeatureId) {
        let cond = self
            .model
            .feature(id)
            .prompt
            .as_ref()
            .and_then(|p| p.cond);
        let prompt_cond = match cond {
            Some(c) => self.pexpr_both(c),
            None => self.pool.ptrue(),
        };

        let Some(no_value) = self.atoms.nonbool_val(id, "n") else {
            return;
        };
        let no_value = self.pool.atom(no_value);
        let some_value = self.pool.pnot(no_value);
        let c = self.pool.pimplies(prompt_cond, some_value);
        self.add(id, c);
    }

    /// Under each range, known values outside the bounds are ruled out.
    /// Later ranges are guarded by the negation of earlier conditions.
    fn nonbool_ranges(&mut self, id: FeatureId) {
        let base = match self.model.feature(id).ftype {
            FeatureType::Hex => 16,
            _ => 10,
        };

        let mut earlier: Vec<PexprId> = Vec::new();

        for range in self.model.feature(id).ranges.clone() {
            let prop_cond = match range.cond {
                Some(c) => self.pexpr_both(c),
                None => self.pool.ptrue(),
            };

            let mut guard = prop_cond;
            for prev in &earlier {
                let np = self.pool.pnot(*prev);
                guard = self.pool.pand(guard, np);
            }
            earlier.push(prop_cond);

            let lo = parse_prefix_int(&self.model.string_value(range.lo), base);
            let hi = parse_prefix_int(&self.model.string_value(range.hi), base);

            for atom in self.atoms.nonbool_vals(id).to_vec() {
                let value = self.atoms.atom(atom).nb_val.clone().unwrap_or_default();
                let n = parse_prefix_int(&value, base);
                if n >= lo && n <= hi {
                    continue;
                }
                let p = self.pool.atom(atom);
                let np = self.pool.pnot(p);
                let c = self.pool.pimplies(guard, np);
                self.add(id, c);
            }
        }
    }

    /// Any set value implies the direct dependency. Selected features are
    /// exempt, as in the original.
    fn nonbool_dependencies(&mut self, id: FeatureId) {
        if self.model.feature(id).rev_dep.is_some() {
            return;
        }
        let Some(dep) = self.model.feature(id).dir_dep else {
            return;
        };
        let dep_both = self.pexpr_both(dep);

        let mut any_value = self.pool.pfalse();
        for atom in self.atoms.nonbool_vals(id).to_vec().iter().skip(1) {
            let p = self.pool.atom(*atom);
            any_value = self.pool.por(any_value, p);
        }

        let c = self.pool.pimplies(any_value, dep_both);
        self.add(id, c);
    }

    fn nonbool_at_least_one(&mut self, id: FeatureId) {
        let mut any = None;
        for atom in self.atoms.nonbool_vals(id).to_vec() {
            let p = self.pool.atom(atom);
            any = Some(match any {
                Some(acc) => self.pool.por(acc, p),
                None => p,
            });
        }
        if let Some(any) = any {
            self.add(id, any);
        }
    }

    fn nonbool_at_most_one(&mut self, id: FeatureId) {
        let vals = self.atoms.nonbool_vals(id).to_vec();
        for (i, a) in vals.iter().enumerate() {
            for b in &vals[i + 1..] {
                let pa = self.pool.atom(*a);
                let pb = self.pool.atom(*b);
                let na = self.pool.pnot(pa);
                let nb = self.pool.pnot(pb);
                let c = self.pool.por(na, nb);
                self.add(id, c);
            }
        }
    }
}
