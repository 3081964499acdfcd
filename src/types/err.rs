/*!
Error types used in the library.

- Load errors are fatal to a session and surfaced to the caller.
- Model inconsistencies (a rule mentioning an unknown feature, an
  unsupported comparison) are *not* errors: the offending subexpression
  conservatively evaluates to false and a log entry is made.
- A solver returning unknown is treated as unsatisfiable with an empty core
  so enumeration always makes progress.

Names of the error enums — for the most part — overlap with corresponding
modules.
*/

/// A union of varied error kinds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An error while parsing a feature-model file.
    Load(LoadError),

    /// An error while building a resolve session.
    Build(BuildError),

    /// An error while applying a diagnosis.
    Apply(ApplyError),

    /// The attempted action could not be completed given the state of the session.
    InvalidState,
}

/// Errors while reading a feature model or a configuration file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadError {
    /// The file could not be read.
    Io(String),

    /// Some unspecific problem at a specific line.
    Line(usize, String),

    /// A block was opened but never closed (`choice`/`if` without a matching end).
    UnclosedBlock(&'static str),

    /// A block end without a matching opener.
    StrayBlockEnd(&'static str),

    /// A malformed expression at a specific line.
    Expression(usize, String),
}

impl From<LoadError> for ErrorKind {
    fn from(e: LoadError) -> Self {
        ErrorKind::Load(e)
    }
}

/// Errors when building a resolve session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildError {
    /// A constraint that is constant false was emitted.
    /// The rule base contradicts itself before any value is assumed.
    ContradictoryConstraint,

    /// There are no more fresh SAT variables.
    VariablesExhausted,
}

impl From<BuildError> for ErrorKind {
    fn from(e: BuildError) -> Self {
        ErrorKind::Build(e)
    }
}

/// Errors when applying a diagnosis to the live configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyError {
    /// A fix addresses a feature the model does not know.
    UnknownFeature,

    /// A value was rejected by the model and remained unapplied after the
    /// round limit. Carries the number of fixes that were applied.
    Partial(usize),
}

impl From<ApplyError> for ErrorKind {
    fn from(e: ApplyError) -> Self {
        ErrorKind::Apply(e)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Load(LoadError::Io(msg)) => write!(f, "load: {msg}"),
            ErrorKind::Load(LoadError::Line(n, msg)) => write!(f, "load: line {n}: {msg}"),
            ErrorKind::Load(LoadError::UnclosedBlock(what)) => {
                write!(f, "load: unclosed `{what}` block")
            }
            ErrorKind::Load(LoadError::StrayBlockEnd(what)) => {
                write!(f, "load: `{what}` without opener")
            }
            ErrorKind::Load(LoadError::Expression(n, msg)) => {
                write!(f, "load: line {n}: bad expression: {msg}")
            }
            ErrorKind::Build(BuildError::ContradictoryConstraint) => {
                write!(f, "build: rule base is contradictory")
            }
            ErrorKind::Build(BuildError::VariablesExhausted) => {
                write!(f, "build: out of SAT variables")
            }
            ErrorKind::Apply(ApplyError::UnknownFeature) => {
                write!(f, "apply: fix for unknown feature")
            }
            ErrorKind::Apply(ApplyError::Partial(n)) => {
                write!(f, "apply: only {n} fixes could be applied")
            }
            ErrorKind::InvalidState => write!(f, "invalid session state"),
        }
    }
}

impl std::error::Error for ErrorKind {}
