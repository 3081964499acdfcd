//! The procedures of a resolve session, in pipeline order.
//!
//! [translate] turns rule expressions into propositional expressions,
//! [constraints] walks the model and emits the full constraint set,
//! [cnf] encodes constraints to clauses, [rangefix] enumerates diagnoses
//! over an unsatisfiable conflict, and [apply] replays a chosen diagnosis
//! onto the live configuration.

pub mod apply;
pub mod cnf;
pub mod constraints;
pub mod rangefix;
pub mod translate;
