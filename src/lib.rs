/*!
A conflict resolver for Kconfig-style feature models.

A feature model assigns each feature a boolean, tristate, or string/number
value, subject to a large rule base: dependencies, reverse dependencies
(`select`), defaults, mutually exclusive choice groups, and value ranges.
When a requested value is blocked by the rules, confix computes *diagnoses* —
minimal sets of other features whose values, changed together with the
request, make the configuration consistent again — and can apply a chosen
diagnosis to the live configuration.

The pipeline:

- Every feature aspect ("F is yes", "F is mod", "N has value 7") becomes a
  propositional [atom](structures::atom) with its own SAT variable.
- The rule base is [translated](procedures::translate) into
  [propositional expressions](structures::pexpr) in negation normal form and
  collected as per-feature [constraints](procedures::constraints).
- Constraints are [encoded](procedures::cnf) to CNF — directly where already
  clausal, via Tseitin temporaries otherwise — and handed to an incremental
  [SAT solver](sat) once per session.
- Current feature values are installed as solver *assumptions*, never as
  clauses, so one session serves any number of conflicts.
- On an unsatisfiable request, [RangeFix](procedures::rangefix) enumerates
  diagnoses by hitting-set search over failed-assumption cores, and the
  [applier](procedures::apply) replays a chosen diagnosis onto the model
  with fixed-point retries.

# Example

```rust
use confix::{builder, config::Config, context::ResolveContext};
use confix::structures::feature::Tristate;

let source = "
config A
\tbool \"feature a\"

config B
\tbool \"feature b\"
\tselect A
";

let model = builder::kconfig::parse_str(source).unwrap();
let mut ctx = ResolveContext::from_model(model, Config::default()).unwrap();

// B=y selects A, so requesting A=n while B=y needs one fix: B=n.
let b = ctx.model.feature_by_name("B").unwrap();
assert!(ctx.model.set_tristate(b, Tristate::Yes));
let a = ctx.model.feature_by_name("A").unwrap();

let diagnoses = ctx.resolve(&[confix::ConflictValue::tri(a, Tristate::No)]).unwrap();
assert!(!diagnoses.is_empty());
```

# Logs

Calls to [log!](log) are made throughout; no log implementation is linked by
the library. The targets are listed in [misc::log].
*/

#![allow(clippy::collapsible_else_if)]
#![allow(clippy::single_match)]

pub mod builder;
pub mod config;
pub mod context;
pub mod db;
pub mod misc;
pub mod procedures;
pub mod reports;
pub mod sat;
pub mod structures;
pub mod types;

pub use context::{ConflictValue, ResolveContext};
pub use reports::{Diagnosis, FeatureFix, FixValue};
