//! Randomized models: diagnosis validity and apply-loop termination.
//!
//! Small boolean/tristate models with depth-limited expressions, a random
//! current assignment, and a random conflict. Every resolve must succeed,
//! the apply loop must terminate on every returned diagnosis, and a fully
//! applied diagnosis must honour the request.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use confix::builder::{dotconfig, kconfig};
use confix::config::Config;
use confix::context::{ConflictValue, ResolveContext};
use confix::structures::feature::Tristate;

struct Generated {
    source: String,
    dotcfg: String,
    names: Vec<String>,
}

fn generate(rng: &mut StdRng) -> Generated {
    let count = rng.gen_range(3..8);
    let mut source = String::from("config MODULES\n\tbool \"modules\"\n\tdefault y\n\n");
    let mut names = Vec::new();
    let mut tristates = vec![false; count];

    for i in 0..count {
        let name = format!("F{i}");
        let tri = rng.gen_bool(0.3);
        tristates[i] = tri;

        source.push_str(&format!("config {name}\n"));
        source.push_str(&format!(
            "\t{} \"feature {i}\"\n",
            if tri { "tristate" } else { "bool" }
        ));

        if i > 0 && rng.gen_bool(0.4) {
            let dep = rng.gen_range(0..i);
            if rng.gen_bool(0.3) {
                source.push_str(&format!("\tdepends on !F{dep}\n"));
            } else {
                source.push_str(&format!("\tdepends on F{dep}\n"));
            }
        }

        if i > 0 && rng.gen_bool(0.25) {
            let target = rng.gen_range(0..i);
            source.push_str(&format!("\tselect F{target}\n"));
        }

        if rng.gen_bool(0.3) {
            source.push_str("\tdefault y\n");
        }

        source.push('\n');
        names.push(name);
    }

    let mut dotcfg = String::new();
    for (i, name) in names.iter().enumerate() {
        let value = if tristates[i] {
            match rng.gen_range(0..3) {
                0 => 'n',
                1 => 'm',
                _ => 'y',
            }
        } else if rng.gen_bool(0.5) {
            'y'
        } else {
            'n'
        };
        if value == 'n' {
            dotcfg.push_str(&format!("# CONFIG_{name} is not set\n"));
        } else {
            dotcfg.push_str(&format!("CONFIG_{name}={value}\n"));
        }
    }

    Generated {
        source,
        dotcfg,
        names,
    }
}

fn build(generated: &Generated) -> ResolveContext {
    let mut model = kconfig::parse_str(&generated.source).expect("generated model parses");
    dotconfig::read_str(&mut model, &generated.dotcfg);
    ResolveContext::from_model(model, Config::default()).expect("session builds")
}

#[test]
fn random_conflicts_resolve_and_apply() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for round in 0..20 {
        let generated = generate(&mut rng);
        let mut ctx = build(&generated);

        let name = &generated.names[rng.gen_range(0..generated.names.len())];
        let feature = ctx.model.feature_by_name(name).unwrap();
        let is_tri = ctx.model.feature(feature).ftype
            == confix::structures::feature::FeatureType::Tristate;

        let current = ctx.model.tristate_value(feature);
        let target = loop {
            let candidate = match rng.gen_range(0..3) {
                0 => Tristate::No,
                1 if is_tri => Tristate::Mod,
                _ => Tristate::Yes,
            };
            if candidate != current {
                break candidate;
            }
        };

        let conflict = ConflictValue::tri(feature, target);
        let diagnoses = ctx
            .resolve(std::slice::from_ref(&conflict))
            .unwrap_or_else(|e| panic!("round {round}: resolve failed: {e}"));

        for d in &diagnoses {
            let mut fresh = build(&generated);
            let fresh_feature = fresh.model.feature_by_name(name).unwrap();
            let _ = fresh
                .resolve(&[ConflictValue::tri(fresh_feature, target)])
                .unwrap();

            // best-effort application: success must honour the request
            if fresh.apply(d).is_ok() {
                assert_eq!(
                    fresh.model.tristate_value(fresh_feature),
                    target,
                    "round {round}: applied diagnosis missed its target"
                );
            }
        }
    }
}

#[test]
fn cancellation_returns_partial_results() {
    // a conflict that would produce a diagnosis, interrupted before the
    // first enumeration step
    let model = kconfig::parse_str(
        "
config A
\tbool \"a\"

config B
\tbool \"b\"
\tselect A
",
    )
    .unwrap();
    let mut ctx = ResolveContext::from_model(model, Config::default()).unwrap();
    let a = ctx.model.feature_by_name("A").unwrap();
    let b = ctx.model.feature_by_name("B").unwrap();
    assert!(ctx.model.set_tristate(b, Tristate::Yes));

    ctx.interrupt_handle().interrupt();
    let diagnoses = ctx.resolve(&[ConflictValue::tri(a, Tristate::No)]).unwrap();
    assert!(diagnoses.is_empty());

    // the flag was consumed: the same conflict resolves afterwards
    let diagnoses = ctx.resolve(&[ConflictValue::tri(a, Tristate::No)]).unwrap();
    assert_eq!(diagnoses.len(), 1);
}
