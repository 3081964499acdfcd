/*!
Atoms: the propositional variables of the encoding.

Each atom represents one aspect of a feature — "F is yes", "F is mod",
"N has value 7", "F is selected to yes", "F has no visible prompt" — or is
a constant or a Tseitin temporary. Every atom owns exactly one SAT variable,
and the [atom table](crate::db::atom) maintains the bijection for the
lifetime of a session.
*/

use crate::structures::feature::FeatureId;

/// Index of an atom; equal to its (positive) SAT variable.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AtomId(pub u32);

impl AtomId {
    /// The positive DIMACS literal for this atom.
    pub fn lit(self) -> i32 {
        self.0 as i32
    }
}

/// What an atom stands for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AtomKind {
    /// "Feature is yes".
    SymbolY,

    /// "Feature is mod".
    SymbolM,

    /// "Non-boolean feature has this specific value".
    NonboolEq,

    /// "Choice group is yes".
    ChoiceY,

    /// "Choice group is mod".
    ChoiceM,

    /// "Feature is selected to yes by a reverse dependency".
    SelectedY,

    /// "Feature is selected to at least mod by a reverse dependency".
    SelectedM,

    /// "Feature has no visible prompt".
    NoPromptCond,

    /// Tseitin temporary.
    Tseitin,

    /// The constant true; fixed by a unit clause.
    ConstTrue,

    /// The constant false; fixed by a unit clause.
    ConstFalse,
}

/// A propositional variable of the encoding.
#[derive(Clone, Debug)]
pub struct Atom {
    pub kind: AtomKind,

    /// Human-readable name, for traces and the DIMACS preamble.
    pub name: String,

    /// Owning feature, when there is one.
    pub feature: Option<FeatureId>,

    /// The literal value a [AtomKind::NonboolEq] atom stands for.
    pub nb_val: Option<String>,

    /// Polarity this atom was given in the most recent assumption pass.
    pub assumed: bool,
}
