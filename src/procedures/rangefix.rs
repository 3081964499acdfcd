/*!
Diagnosis enumeration: the RangeFix algorithm.

Over an unsatisfiable conflict, enumerate up to `max_diagnoses` minimal sets
of soft atoms whose polarity flips restore satisfiability.

The soft set **C** holds the atoms of every user-controllable feature — one
per boolean, two per tristate, the whole domain of a non-boolean — except
the conflict features, whose atoms are hard-locked at their target
polarities. A worklist **E** of partial diagnoses starts from the empty set.
Each iteration assumes the current value of every atom in `C \ E₀` plus the
conflict targets and solves:

- satisfiable: `E₀` is a diagnosis — every removed assumption needed
  flipping;
- unsatisfiable: the failed-assumption core seeds one-atom extensions of
  every partial diagnosis that does not already hit it, with
  minimal-hitting-set pruning against the worklist and the accepted set.

The worklist is FIFO, so diagnoses come out in discovery order and the
smallest candidates are tried first; termination follows from the finite
soft set. Both budgets are soft, and a cancellation flag is polled at the
top of every iteration.

Post-processing re-solves each diagnosis with flipped polarities, drops
fixes the satisfying model forces anyway through a SELECTED_* atom, and
converts the surviving atoms to feature-level fixes (a four-case decoder
for tristates; for a non-boolean the diagnosis always holds two atoms, the
value leaving and the value arriving).
*/

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::Config;
use crate::context::ConflictValue;
use crate::db::atom::AtomTable;
use crate::misc::log::targets;
use crate::reports::{Diagnosis, FeatureFix, FixValue};
use crate::sat::{Outcome, SatBridge};
use crate::structures::atom::{AtomId, AtomKind};
use crate::structures::feature::{FeatureId, FeatureModel, FeatureType, Tristate};

/// One enumeration run over a prepared solver.
pub struct RangeFix<'a> {
    model: &'a FeatureModel,
    atoms: &'a mut AtomTable,
    bridge: &'a mut SatBridge,
    config: &'a Config,
    cancel: &'a AtomicBool,
    conflict: &'a [ConflictValue],
    /// The soft constraint set C.
    soft: Vec<AtomId>,
}

impl<'a> RangeFix<'a> {
    pub fn new(
        model: &'a FeatureModel,
        atoms: &'a mut AtomTable,
        bridge: &'a mut SatBridge,
        config: &'a Config,
        cancel: &'a AtomicBool,
        conflict: &'a [ConflictValue],
    ) -> Self {
        let soft = soft_set(model, atoms, conflict);
        RangeFix {
            model,
            atoms,
            bridge,
            config,
            cancel,
            conflict,
            soft,
        }
    }

    /// Enumerate diagnoses and convert them to feature-level fixes.
    pub fn run(mut self) -> Vec<Diagnosis> {
        let raw = self.generate();
        log::info!(target: targets::RANGEFIX, "{} raw diagnoses", raw.len());

        if self.config.minimise_diagnoses {
            self.minimise_diagnoses(raw)
        } else {
            raw.iter().map(|d| self.convert_diagnosis(d)).collect()
        }
    }

    fn generate(&mut self) -> Vec<Vec<AtomId>> {
        let mut worklist: VecDeque<Vec<AtomId>> = VecDeque::new();
        let mut accepted: Vec<Vec<AtomId>> = Vec::new();

        worklist.push_back(Vec::new());
        let start = Instant::now();

        while let Some(e0) = worklist.pop_front() {
            // the flag is consumed on observation
            if self.cancel.swap(false, Ordering::AcqRel) {
                log::info!(target: targets::RANGEFIX, "cancelled, returning partial results");
                break;
            }

            let assumptions = self.assumptions_without(&e0);
            let outcome = self.bridge.solve_under(&assumptions);

            if outcome == Outcome::Sat {
                if !e0.is_empty() {
                    log::debug!(
                        target: targets::RANGEFIX,
                        "diagnosis found: {}",
                        self.render_atom_set(&e0)
                    );
                    accepted.push(e0);
                    if accepted.len() >= self.config.max_diagnoses {
                        break;
                    }
                }
                continue;
            }

            if start.elapsed() > self.config.time_budget {
                log::info!(target: targets::RANGEFIX, "time budget exhausted");
                break;
            }

            // unknown counts as unsatisfiable with an empty core, so the
            // candidate is dropped and enumeration moves on
            let mut core = match outcome {
                Outcome::Unsat => self.soft_core(),
                _ => Vec::new(),
            };
            if self.config.minimise_cores {
                self.minimise_core(&mut core);
            }
            log::debug!(
                target: targets::RANGEFIX,
                "unsat core: {}",
                self.render_atom_set(&core)
            );

            // expand every partial diagnosis that misses the core
            let olds: Vec<Vec<AtomId>> = std::iter::once(e0).chain(worklist.drain(..)).collect();
            let mut kept: VecDeque<Vec<AtomId>> = VecDeque::new();
            let mut added: Vec<Vec<AtomId>> = Vec::new();

            for (index, partial) in olds.iter().enumerate() {
                if intersects(partial, &core) {
                    kept.push_back(partial.clone());
                    continue;
                }

                for x in &core {
                    let mut extended = partial.clone();
                    if !extended.contains(x) {
                        extended.push(*x);
                    }

                    let dominated = olds
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, o)| o)
                        .chain(kept.iter())
                        .chain(added.iter())
                        .chain(accepted.iter())
                        .any(|other| is_subset(other, &extended));

                    if !dominated {
                        added.push(extended);
                    }
                }
            }

            worklist = kept;
            worklist.extend(added);
        }

        accepted
    }

    /// Assumption literals: every soft atom outside `excluded` at its
    /// current-value polarity, plus the conflict targets.
    fn assumptions_without(&mut self, excluded: &[AtomId]) -> Vec<i32> {
        let mut lits = Vec::with_capacity(self.soft.len() + 2 * self.conflict.len());

        for atom in &self.soft {
            if excluded.contains(atom) {
                continue;
            }
            let polarity = current_polarity(self.model, self.atoms, *atom);
            self.atoms.atom_mut(*atom).assumed = polarity;
            lits.push(if polarity { atom.lit() } else { -atom.lit() });
        }

        self.push_conflict_lits(&mut lits);
        lits
    }

    /// Assumption literals for exactly `core` plus the conflict targets.
    fn assumptions_of(&mut self, core: &[AtomId]) -> Vec<i32> {
        let mut lits = Vec::with_capacity(core.len() + 2 * self.conflict.len());
        for atom in core {
            let polarity = current_polarity(self.model, self.atoms, *atom);
            lits.push(if polarity { atom.lit() } else { -atom.lit() });
        }
        self.push_conflict_lits(&mut lits);
        lits
    }

    fn push_conflict_lits(&mut self, lits: &mut Vec<i32>) {
        for value in self.conflict {
            conflict_lits(self.model, self.atoms, value, lits);
        }
    }

    /// The failed assumptions restricted to the soft set, deduplicated.
    fn soft_core(&self) -> Vec<AtomId> {
        let mut core = Vec::new();
        for lit in self.bridge.failed_assumptions() {
            let Some(atom) = self.atoms.lookup_by_sat(lit.unsigned_abs()) else {
                continue;
            };
            if self.soft.contains(&atom) && !core.contains(&atom) {
                core.push(atom);
            }
        }
        core
    }

    /// Deletion-based core shrinking: drop a member whenever the remainder
    /// stays unsatisfiable.
    fn minimise_core(&mut self, core: &mut Vec<AtomId>) {
        if core.len() <= 1 {
            return;
        }

        let mut index = 0;
        while index < core.len() && core.len() > 1 {
            let mut candidate = core.clone();
            candidate.remove(index);

            let assumptions = self.assumptions_of(&candidate);
            match self.bridge.solve_under(&assumptions) {
                Outcome::Unsat => {
                    core.remove(index);
                }
                _ => index += 1,
            }
        }
    }

    /* conversion to feature fixes */

    /// Re-solve each diagnosis with flipped polarities and drop fixes the
    /// model forces anyway through a SELECTED_* atom.
    fn minimise_diagnoses(&mut self, raw: Vec<Vec<AtomId>>) -> Vec<Diagnosis> {
        let mut result = Vec::with_capacity(raw.len());

        for d in &raw {
            let mut lits = self.assumptions_without(d);
            for atom in d {
                let polarity = current_polarity(self.model, self.atoms, *atom);
                lits.push(if polarity { -atom.lit() } else { atom.lit() });
            }

            if self.bridge.solve_under(&lits) != Outcome::Sat {
                log::error!(target: targets::RANGEFIX, "diagnosis not satisfiable when flipped");
                result.push(self.convert_diagnosis(d));
                continue;
            }

            let mut diagnosis = self.convert_diagnosis(d);
            diagnosis.fixes.retain(|fix| {
                let sel = match &fix.value {
                    FixValue::Tri(Tristate::Yes) => self.atoms.selected_y(fix.feature),
                    FixValue::Tri(Tristate::Mod) => self.atoms.selected_m(fix.feature),
                    _ => None,
                };
                match sel {
                    // forced by a selector in the model: drop the fix
                    Some(sel) => self.bridge.value_of(sel.0) != 1,
                    None => true,
                }
            });
            result.push(diagnosis);
        }

        result
    }

    /// The conflict targets first, then one fix per changed feature.
    fn convert_diagnosis(&self, d: &[AtomId]) -> Diagnosis {
        let mut diagnosis = Diagnosis::default();

        for value in self.conflict {
            diagnosis.fixes.push(FeatureFix {
                feature: value.feature,
                value: value.value.clone(),
            });
        }

        for atom in d {
            let Some(feature) = self.atoms.atom(*atom).feature else {
                continue;
            };
            if diagnosis.contains(feature) {
                continue;
            }

            let value = if self.model.is_boolean(feature) {
                FixValue::Tri(self.new_tristate(*atom, feature, d))
            } else if self.model.is_nonboolean(feature) {
                FixValue::Str(self.new_string(*atom, feature, d))
            } else {
                continue;
            };

            diagnosis.fixes.push(FeatureFix { feature, value });
        }

        diagnosis
    }

    /// The value a boolean/tristate feature moves to.
    ///
    /// For a plain boolean the new value is the opposite of the last
    /// assumption. For a tristate it is deduced from which of the Y/M atoms
    /// sits in the diagnosis and how it was assumed.
    fn new_tristate(&self, atom: AtomId, feature: FeatureId, d: &[AtomId]) -> Tristate {
        let assumed = current_polarity(self.model, self.atoms, atom);

        if self.model.feature(feature).ftype == FeatureType::Bool {
            return if assumed { Tristate::No } else { Tristate::Yes };
        }

        let kind = self.atoms.atom(atom).kind;
        match kind {
            AtomKind::SymbolY | AtomKind::ChoiceY => {
                if assumed {
                    // leaving yes: towards mod when the mod atom flips too
                    let m = self.atoms.atom_m(self.model, feature);
                    if d.contains(&m) {
                        Tristate::Mod
                    } else {
                        Tristate::No
                    }
                } else {
                    Tristate::Yes
                }
            }
            AtomKind::SymbolM | AtomKind::ChoiceM => {
                if assumed {
                    // leaving mod: towards yes when the yes atom flips too
                    let y = self.atoms.atom_y(self.model, feature);
                    if d.contains(&y) {
                        Tristate::Yes
                    } else {
                        Tristate::No
                    }
                } else {
                    Tristate::Mod
                }
            }
            _ => {
                log::error!(target: targets::RANGEFIX, "tristate fix from a non-symbol atom");
                Tristate::No
            }
        }
    }

    /// The value a non-boolean feature moves to: the partner atom of the
    /// same feature that flips to true carries the new literal.
    fn new_string(&self, atom: AtomId, feature: FeatureId, d: &[AtomId]) -> String {
        let assumed = current_polarity(self.model, self.atoms, atom);

        if !assumed {
            return self.atoms.atom(atom).nb_val.clone().unwrap_or_default();
        }

        for other in d {
            if *other == atom {
                continue;
            }
            if self.atoms.atom(*other).feature != Some(feature) {
                continue;
            }
            return self.atoms.atom(*other).nb_val.clone().unwrap_or_default();
        }

        log::error!(target: targets::RANGEFIX, "no partner value atom in diagnosis");
        String::new()
    }

    fn render_atom_set(&self, set: &[AtomId]) -> String {
        let names: Vec<String> = set
            .iter()
            .map(|a| {
                let atom = self.atoms.atom(*a);
                format!("{} <{}>", atom.name, if atom.assumed { "T" } else { "F" })
            })
            .collect();
        format!("[{}]", names.join(", "))
    }
}

/// The soft constraint set: atoms of named, prompted, non-conflict
/// features.
fn soft_set(model: &FeatureModel, atoms: &AtomTable, conflict: &[ConflictValue]) -> Vec<AtomId> {
    let mut soft = Vec::new();

    for id in model.ids() {
        let f = model.feature(id);
        if f.ftype == FeatureType::Unknown || f.is_const {
            continue;
        }
        if conflict.iter().any(|c| c.feature == id) {
            continue;
        }
        if f.name.is_none() || f.prompt.is_none() {
            continue;
        }

        match f.ftype {
            FeatureType::Bool => soft.push(atoms.atom_y(model, id)),
            FeatureType::Tristate => {
                soft.push(atoms.atom_y(model, id));
                soft.push(atoms.atom_m(model, id));
            }
            _ => soft.extend_from_slice(atoms.nonbool_vals(id)),
        }
    }

    soft
}

/// The polarity an atom takes when the current configuration is assumed.
pub(crate) fn current_polarity(model: &FeatureModel, atoms: &AtomTable, atom: AtomId) -> bool {
    let a = atoms.atom(atom);
    let Some(feature) = a.feature else {
        return false;
    };

    match a.kind {
        AtomKind::SymbolY | AtomKind::ChoiceY => {
            model.tristate_value(feature) == Tristate::Yes
        }
        AtomKind::SymbolM | AtomKind::ChoiceM => model.tristate_value(feature) == Tristate::Mod,
        AtomKind::NonboolEq => {
            let no_value = atoms.nonbool_vals(feature).first() == Some(&atom);
            if no_value {
                !model.has_value(feature)
            } else {
                model.has_value(feature)
                    && a.nb_val.as_deref() == Some(model.string_value(feature).as_str())
            }
        }
        _ => false,
    }
}

/// Append the assumption literals locking a conflict target.
pub(crate) fn conflict_lits(
    model: &FeatureModel,
    atoms: &AtomTable,
    value: &ConflictValue,
    lits: &mut Vec<i32>,
) {
    let feature = value.feature;
    match &value.value {
        FixValue::Tri(target) => {
            let y = atoms.atom_y(model, feature);
            let m = atoms.atom_m(model, feature);
            match (model.feature(feature).ftype, *target) {
                (FeatureType::Bool, Tristate::Yes) => lits.push(y.lit()),
                (FeatureType::Bool, _) => lits.push(-y.lit()),
                (FeatureType::Tristate, Tristate::Yes) => {
                    lits.push(y.lit());
                    lits.push(-m.lit());
                }
                (FeatureType::Tristate, Tristate::Mod) => {
                    lits.push(-y.lit());
                    lits.push(m.lit());
                }
                (FeatureType::Tristate, Tristate::No) => {
                    lits.push(-y.lit());
                    lits.push(-m.lit());
                }
                _ => {}
            }
        }
        FixValue::Str(target) => {
            // only values already in the domain can be locked
            match atoms.nonbool_val(feature, target) {
                Some(wanted) => {
                    for candidate in atoms.nonbool_vals(feature) {
                        if *candidate == wanted {
                            lits.push(candidate.lit());
                        } else {
                            lits.push(-candidate.lit());
                        }
                    }
                }
                None => {
                    log::warn!(
                        target: targets::RANGEFIX,
                        "conflict value {:?} for {} is not a known domain value",
                        target,
                        model.display_name(feature)
                    );
                }
            }
        }
    }
}

fn intersects(a: &[AtomId], b: &[AtomId]) -> bool {
    a.iter().any(|x| b.contains(x))
}

fn is_subset(a: &[AtomId], b: &[AtomId]) -> bool {
    a.iter().all(|x| b.contains(x))
}
