/*!
Diagnoses and debug artefacts.

A [Diagnosis] is the user-facing result of conflict resolution: an ordered
list of feature/value pairs which, applied together, make the requested
change consistent with the rule base. The [dump] module writes the two
debug artefacts — the constraint listing and the DIMACS form of the CNF.
*/

use crate::structures::feature::{FeatureId, FeatureModel, Tristate};

pub mod dump;

/// The value a fix assigns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FixValue {
    /// For boolean and tristate features.
    Tri(Tristate),
    /// For string, int, and hex features.
    Str(String),
}

/// One feature/value pair of a diagnosis.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeatureFix {
    pub feature: FeatureId,
    pub value: FixValue,
}

/// A set of fixes which together restore satisfiability.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Diagnosis {
    /// In application order: the conflict targets first, then the computed
    /// fixes.
    pub fixes: Vec<FeatureFix>,
}

impl Diagnosis {
    pub fn contains(&self, feature: FeatureId) -> bool {
        self.fixes.iter().any(|fix| fix.feature == feature)
    }

    /// `[A => yes, B => no]`, for the CLI and traces.
    pub fn render(&self, model: &FeatureModel) -> String {
        let mut out = String::from("[");
        for (i, fix) in self.fixes.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&model.display_name(fix.feature));
            out.push_str(" => ");
            match &fix.value {
                FixValue::Tri(tri) => out.push_str(&tri.to_string()),
                FixValue::Str(s) => out.push_str(s),
            }
        }
        out.push(']');
        out
    }
}
