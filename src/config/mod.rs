/*!
Configuration of a resolve session.

All knobs sit on the diagnosis engine: the enumeration budgets and the two
minimisation passes. The budgets are *soft* — returning fewer diagnoses than
asked for is not an error, and hitting the wall-clock budget simply stops
enumeration with whatever has been found.
*/

use std::time::Duration;

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// Stop after this many diagnoses.
    pub max_diagnoses: usize,

    /// Wall-clock budget for diagnosis enumeration.
    pub time_budget: Duration,

    /// Shrink each unsatisfiable core by deletion before expanding it.
    pub minimise_cores: bool,

    /// Drop fixes the solver forces anyway (selected features) from each
    /// diagnosis.
    pub minimise_diagnoses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_diagnoses: 3,
            time_budget: Duration::from_secs(10),
            minimise_cores: true,
            minimise_diagnoses: true,
        }
    }
}
