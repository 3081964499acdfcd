/*!
The resolve session.

A [ResolveContext] owns everything the original keeps in globals: the model
snapshot, the atom table, the pexpr pool, the per-feature constraints, the
clause store, the solver handle, and the cancellation flag. It is built once
per session and reused across conflicts: current feature values enter the
solver as assumptions only, never as clauses.

The session is single-threaded; the one concession to concurrency is the
[InterruptHandle], a cloneable flag another thread may set to make a running
enumeration return its partial results.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::db::atom::AtomTable;
use crate::db::cnf::ClauseDb;
use crate::misc::log::targets;
use crate::procedures::{apply, cnf, constraints, rangefix};
use crate::reports::{Diagnosis, FixValue};
use crate::sat::{Outcome, SatBridge};
use crate::structures::feature::{FeatureId, FeatureModel, FeatureType, Tristate};
use crate::structures::pexpr::{PexprId, PexprPool};
use crate::types::err::{ApplyError, ErrorKind};

/// One requested feature/value pair of a conflict.
#[derive(Clone, Debug)]
pub struct ConflictValue {
    pub feature: FeatureId,
    pub value: FixValue,
}

impl ConflictValue {
    pub fn tri(feature: FeatureId, value: Tristate) -> Self {
        ConflictValue {
            feature,
            value: FixValue::Tri(value),
        }
    }

    pub fn string(feature: FeatureId, value: impl Into<String>) -> Self {
        ConflictValue {
            feature,
            value: FixValue::Str(value.into()),
        }
    }
}

/// Requests a running enumeration to stop; safe to use from another thread.
#[derive(Clone, Debug)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A resolve session.
pub struct ResolveContext {
    pub model: FeatureModel,
    pub atoms: AtomTable,
    pub pool: PexprPool,
    constraints: Vec<Vec<PexprId>>,
    pub clauses: ClauseDb,
    pub bridge: SatBridge,
    pub config: Config,
    cancel: Arc<AtomicBool>,
    /// Features of the most recent conflict, for the apply step.
    last_conflict: Vec<FeatureId>,
}

impl ResolveContext {
    /// Build a session: recompute values, allocate atoms, emit constraints,
    /// encode clauses, load the solver.
    pub fn from_model(mut model: FeatureModel, config: Config) -> Result<Self, ErrorKind> {
        model.recalc_all();

        let mut atoms = AtomTable::new(&model);
        let mut pool = PexprPool::new(atoms.const_false, atoms.const_true);
        let constraints = constraints::generate(&model, &mut atoms, &mut pool);

        let mut clauses = ClauseDb::default();
        let mut bridge = SatBridge::new();
        cnf::encode(&pool, &mut atoms, &constraints, &mut clauses, &mut bridge);

        log::info!(
            target: targets::SOLVER,
            "session built: {} features, {} variables, {} clauses",
            model.len(),
            atoms.var_count(),
            clauses.len()
        );

        Ok(ResolveContext {
            model,
            atoms,
            pool,
            constraints,
            clauses,
            bridge,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            last_conflict: Vec::new(),
        })
    }

    /// The constraints attached to a feature, in emission order.
    pub fn constraints_of(&self, id: FeatureId) -> &[PexprId] {
        &self.constraints[id.0 as usize]
    }

    /// Total number of emitted constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().map(Vec::len).sum()
    }

    /// A handle the UI thread can use to stop a running enumeration.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(self.cancel.clone())
    }

    /// Whether all requested values can simply be set on the current
    /// configuration, no resolution needed.
    pub fn within_range(&self, conflict: &[ConflictValue]) -> bool {
        conflict.iter().all(|c| match &c.value {
            FixValue::Tri(target) => {
                self.model.tristate_value(c.feature) == *target
                    || self.model.tristate_within_range(c.feature, *target)
            }
            FixValue::Str(target) => {
                &self.model.string_value(c.feature) == target
                    || self.model.string_within_range(c.feature, target)
            }
        })
    }

    /// Assumption literals for the current value of every feature outside
    /// `skip`.
    fn current_assumptions(&mut self, skip: &[FeatureId], lits: &mut Vec<i32>) {
        for id in self.model.ids() {
            let f = self.model.feature(id);
            if f.ftype == FeatureType::Unknown || f.is_const {
                continue;
            }
            if skip.contains(&id) {
                continue;
            }

            match f.ftype {
                FeatureType::Bool | FeatureType::Tristate => {
                    let y = self.atoms.atom_y(&self.model, id);
                    let m = self.atoms.atom_m(&self.model, id);
                    let value = self.model.tristate_value(id);

                    let y_pol = value == Tristate::Yes;
                    self.atoms.atom_mut(y).assumed = y_pol;
                    lits.push(if y_pol { y.lit() } else { -y.lit() });

                    if f.ftype == FeatureType::Tristate {
                        let m_pol = value == Tristate::Mod;
                        self.atoms.atom_mut(m).assumed = m_pol;
                        lits.push(if m_pol { m.lit() } else { -m.lit() });
                    }
                }
                _ => {
                    // unset strings stay unconstrained
                    if f.ftype == FeatureType::String && self.model.string_value(id).is_empty() {
                        continue;
                    }
                    for atom in self.atoms.nonbool_vals(id).to_vec() {
                        let polarity = rangefix::current_polarity(&self.model, &self.atoms, atom);
                        self.atoms.atom_mut(atom).assumed = polarity;
                        lits.push(if polarity { atom.lit() } else { -atom.lit() });
                    }
                }
            }
        }
    }

    /// Solve under the current configuration alone. [Outcome::Sat] means
    /// the configuration is consistent with the rule base.
    pub fn check_current(&mut self) -> Outcome {
        let mut lits = Vec::new();
        self.current_assumptions(&[], &mut lits);
        self.bridge.solve_under(&lits)
    }

    /// Resolve a conflict: diagnoses come back in discovery order, empty
    /// when nothing needs fixing (or nothing was found in budget).
    pub fn resolve(&mut self, conflict: &[ConflictValue]) -> Result<Vec<Diagnosis>, ErrorKind> {
        if conflict.is_empty() {
            return Ok(Vec::new());
        }

        self.last_conflict = conflict.iter().map(|c| c.feature).collect();

        if self.within_range(conflict) {
            log::info!(target: targets::RANGEFIX, "all values already within range");
            return Ok(Vec::new());
        }

        let skip: Vec<FeatureId> = conflict.iter().map(|c| c.feature).collect();
        let mut lits = Vec::new();
        for value in conflict {
            rangefix::conflict_lits(&self.model, &self.atoms, value, &mut lits);
        }
        self.current_assumptions(&skip, &mut lits);

        match self.bridge.solve_under(&lits) {
            Outcome::Sat => {
                log::info!(target: targets::RANGEFIX, "conflict is satisfiable as-is");
                Ok(Vec::new())
            }
            Outcome::Unsat => {
                let engine = rangefix::RangeFix::new(
                    &self.model,
                    &mut self.atoms,
                    &mut self.bridge,
                    &self.config,
                    &self.cancel,
                    conflict,
                );
                Ok(engine.run())
            }
            Outcome::Unknown => {
                log::warn!(target: targets::RANGEFIX, "solver undecided, no diagnoses");
                Ok(Vec::new())
            }
        }
    }

    /// Apply a chosen diagnosis to the live configuration. Returns the
    /// number of features set; partially applied diagnoses surface as an
    /// [ApplyError::Partial].
    pub fn apply(&mut self, diagnosis: &Diagnosis) -> Result<usize, ErrorKind> {
        if diagnosis
            .fixes
            .iter()
            .any(|fix| fix.feature.0 as usize >= self.model.len())
        {
            return Err(ApplyError::UnknownFeature.into());
        }

        let conflict = self.last_conflict.clone();
        let report = apply::apply_fix(&mut self.model, diagnosis, &conflict);

        if report.complete {
            Ok(report.changed)
        } else {
            Err(ApplyError::Partial(report.changed).into())
        }
    }
}
