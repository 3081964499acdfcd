//! The structures of a resolve session.
//!
//! - A [feature model](feature) is the read-only view of features, values,
//!   and rules the session is built from.
//! - [Rule expressions](rule) are the tristate-aware expression trees the
//!   model attaches to features.
//! - [Atoms](atom) are the propositional variables of the encoding.
//! - [Pexprs](pexpr) are propositional formulas over atoms, kept in negation
//!   normal form by construction.

pub mod atom;
pub mod feature;
pub mod pexpr;
pub mod rule;
