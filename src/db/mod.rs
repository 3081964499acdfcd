//! The databases of a resolve session.
//!
//! - The [atom table](atom) owns SAT-variable allocation and the
//!   variable-to-atom bijection.
//! - The [clause store](cnf) mirrors every clause handed to the solver so
//!   dumps do not depend on solver internals.

pub mod atom;
pub mod cnf;
