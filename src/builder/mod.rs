//! Building a feature model from its on-disk form.
//!
//! The [kconfig] module parses the Kconfig subset the resolver consumes;
//! [dotconfig] reads a `.config`-style value file over a parsed model.

pub mod dotconfig;
pub mod kconfig;
