/*!
Applying a diagnosis to the live configuration.

Fixes are not order-independent: a selector target only comes into range
once its selecting feature is set, the modules feature gates every `mod`
value. Instead of computing an order, the applier retries: each round walks
the unapplied fixes, recomputes the feature's current value, and attempts
the set; a rejected value is simply retried next round. The loop ends when
every fix holds, when all conflict targets are reached, or after `2·|d|`
rounds, and reports how many features it actually set.
*/

use crate::misc::log::targets;
use crate::reports::{Diagnosis, FeatureFix, FixValue};
use crate::structures::feature::{FeatureId, FeatureModel};

/// What an application run achieved.
#[derive(Clone, Copy, Debug)]
pub struct ApplyReport {
    /// Features actually set by the applier.
    pub changed: usize,
    /// Whether every fix holds (or every conflict target was reached).
    pub complete: bool,
}

/// Replay a diagnosis onto the model with fixed-point retries.
///
/// `conflict` names the features of the original request; reaching all of
/// their targets ends the run early.
pub fn apply_fix(
    model: &mut FeatureModel,
    diagnosis: &Diagnosis,
    conflict: &[FeatureId],
) -> ApplyReport {
    let total = diagnosis.fixes.len();
    let mut remaining: Vec<FeatureFix> = diagnosis.fixes.clone();
    let mut applied = 0usize;
    let mut changed = 0usize;
    let mut rounds = 0usize;

    log::debug!(target: targets::APPLY, "applying {} fixes", total);

    while applied < total && !targets_reached(model, diagnosis, conflict) {
        if rounds > total * 2 {
            log::info!(
                target: targets::APPLY,
                "gave up after {rounds} rounds, {changed} features set"
            );
            return ApplyReport {
                changed,
                complete: false,
            };
        }

        model.recalc_all();

        let mut still_open = Vec::new();
        for fix in remaining {
            let at_target = match &fix.value {
                FixValue::Tri(tri) => model.tristate_value(fix.feature) == *tri,
                FixValue::Str(s) => &model.string_value(fix.feature) == s,
            };
            if at_target {
                applied += 1;
                continue;
            }

            let taken = match &fix.value {
                FixValue::Tri(tri) => model.set_tristate(fix.feature, *tri),
                FixValue::Str(s) => model.set_string(fix.feature, s),
            };

            if taken {
                log::debug!(
                    target: targets::APPLY,
                    "{} set",
                    model.display_name(fix.feature)
                );
                applied += 1;
                changed += 1;
            } else {
                // out of range at this moment, try again next round
                still_open.push(fix);
            }
        }
        remaining = still_open;
        rounds += 1;
    }

    ApplyReport {
        changed,
        complete: true,
    }
}

/// Whether every conflict feature named by the diagnosis holds its target.
fn targets_reached(model: &FeatureModel, diagnosis: &Diagnosis, conflict: &[FeatureId]) -> bool {
    let mut seen_any = false;

    for fix in &diagnosis.fixes {
        if !conflict.contains(&fix.feature) {
            continue;
        }
        seen_any = true;

        let reached = match &fix.value {
            FixValue::Tri(tri) => model.tristate_value(fix.feature) == *tri,
            FixValue::Str(s) => &model.string_value(fix.feature) == s,
        };
        if !reached {
            return false;
        }
    }

    seen_any
}
