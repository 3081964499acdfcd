/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library
and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the feature model and value recalculation.
    pub const MODEL: &str = "model";

    /// Logs related to the feature-model loader.
    pub const LOADER: &str = "loader";

    /// Logs related to [rule translation](crate::procedures::translate).
    pub const TRANSLATE: &str = "translate";

    /// Logs related to [constraint generation](crate::procedures::constraints).
    pub const CONSTRAINTS: &str = "constraints";

    /// Logs related to [CNF encoding](crate::procedures::cnf).
    pub const CNF: &str = "cnf";

    /// Logs related to the [SAT bridge](crate::sat).
    pub const SOLVER: &str = "solver";

    /// Logs related to [diagnosis enumeration](crate::procedures::rangefix).
    pub const RANGEFIX: &str = "rangefix";

    /// Logs related to [applying a diagnosis](crate::procedures::apply).
    pub const APPLY: &str = "apply";
}
