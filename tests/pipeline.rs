//! Pipeline invariants: round-trips, encoding properties, minimality.

use confix::builder::{dotconfig, kconfig};
use confix::config::Config;
use confix::context::{ConflictValue, ResolveContext};
use confix::reports::dump;
use confix::sat::Outcome;
use confix::structures::feature::Tristate;

const MIXED_MODEL: &str = "
config MODULES
\tbool \"modules\"
\tdefault y

config BASE
\tbool \"base layer\"
\tdefault y

config DRIVER
\ttristate \"a driver\"
\tdepends on BASE

config EXTRA
\tbool \"extra bits\"
\tdepends on DRIVER
\tselect HELPER

config HELPER
\tbool \"helper\"

config NAME
\tstring \"instance name\"

config SLOTS
\tint \"slot count\"
\tdefault 4
\trange 1 8
";

fn context(dotcfg: &str) -> ResolveContext {
    let mut model = kconfig::parse_str(MIXED_MODEL).expect("model parses");
    dotconfig::read_str(&mut model, dotcfg);
    ResolveContext::from_model(model, Config::default()).expect("session builds")
}

#[test]
fn a_default_configuration_is_consistent() {
    let mut ctx = context("");
    assert_eq!(ctx.check_current(), Outcome::Sat);
}

#[test]
fn satisfying_assignments_respect_tristate_exclusion() {
    let mut ctx = context("CONFIG_DRIVER=m\nCONFIG_SLOTS=4\n");
    assert_eq!(ctx.check_current(), Outcome::Sat);

    for id in ctx.model.ids() {
        let y = ctx.atoms.atom_y(&ctx.model, id);
        let m = ctx.atoms.atom_m(&ctx.model, id);
        if y == m {
            continue;
        }
        assert!(
            !(ctx.bridge.value_of(y.0) == 1 && ctx.bridge.value_of(m.0) == 1),
            "feature {} is both yes and mod",
            ctx.model.display_name(id)
        );
    }
}

#[test]
fn satisfying_assignments_pick_exactly_one_domain_value() {
    let mut ctx = context("CONFIG_NAME=\"alpha\"\nCONFIG_SLOTS=4\n");
    assert_eq!(ctx.check_current(), Outcome::Sat);

    for id in ctx.model.ids() {
        if !ctx.model.is_nonboolean(id) {
            continue;
        }
        let true_count = ctx
            .atoms
            .nonbool_vals(id)
            .iter()
            .filter(|a| ctx.bridge.value_of(a.0) == 1)
            .count();
        assert_eq!(
            true_count,
            1,
            "feature {} has {true_count} active domain values",
            ctx.model.display_name(id)
        );
    }
}

#[test]
fn every_diagnosis_restores_satisfiability_when_applied() {
    // EXTRA needs DRIVER, DRIVER needs BASE; with BASE off the request
    // cascades
    let mut ctx = context("# CONFIG_BASE is not set\n");
    let extra = ctx.model.feature_by_name("EXTRA").unwrap();

    let diagnoses = ctx
        .resolve(&[ConflictValue::tri(extra, Tristate::Yes)])
        .unwrap();
    assert!(!diagnoses.is_empty());

    // applying is best-effort: a value can be out of range mid-way; a fully
    // applied diagnosis must honour the request and leave the
    // configuration consistent, and at least one diagnosis must go through
    let mut fully_applied = 0;
    for d in &diagnoses {
        let mut fresh = context("# CONFIG_BASE is not set\n");
        let target = fresh.model.feature_by_name("EXTRA").unwrap();
        let _ = fresh
            .resolve(&[ConflictValue::tri(target, Tristate::Yes)])
            .unwrap();

        if fresh.apply(d).is_ok() {
            fully_applied += 1;
            assert_eq!(fresh.model.tristate_value(target), Tristate::Yes);
            assert_eq!(fresh.check_current(), Outcome::Sat);
        }
    }
    assert!(fully_applied >= 1);
}

#[test]
fn no_accepted_diagnosis_dominates_another() {
    let mut ctx = context("# CONFIG_BASE is not set\n");
    let extra = ctx.model.feature_by_name("EXTRA").unwrap();

    let diagnoses = ctx
        .resolve(&[ConflictValue::tri(extra, Tristate::Yes)])
        .unwrap();

    for (i, a) in diagnoses.iter().enumerate() {
        for (j, b) in diagnoses.iter().enumerate() {
            if i == j {
                continue;
            }
            let a_in_b = a
                .fixes
                .iter()
                .all(|fix| b.fixes.iter().any(|other| other == fix));
            assert!(
                !a_in_b,
                "diagnosis {i} is contained in diagnosis {j}"
            );
        }
    }
}

#[test]
fn selector_driven_fixes_are_dropped_from_diagnoses() {
    // EXTRA selects HELPER, so a diagnosis turning EXTRA on never asks the
    // user to also set HELPER by hand
    let mut ctx = context("# CONFIG_BASE is not set\n");
    let extra = ctx.model.feature_by_name("EXTRA").unwrap();
    let helper = ctx.model.feature_by_name("HELPER").unwrap();

    let diagnoses = ctx
        .resolve(&[ConflictValue::tri(extra, Tristate::Yes)])
        .unwrap();
    assert!(!diagnoses.is_empty());

    for d in &diagnoses {
        assert!(!d.contains(helper), "selector target left in diagnosis");
    }
}

#[test]
fn dumps_have_the_documented_shape() {
    let ctx = context("");

    let mut constraints = Vec::new();
    dump::write_constraints(&ctx, &mut constraints).unwrap();
    let constraints = String::from_utf8(constraints).unwrap();
    assert!(constraints.lines().count() >= ctx.constraint_count());
    assert!(constraints.contains("MODULES"));

    let mut dimacs = Vec::new();
    dump::write_dimacs(&ctx, &mut dimacs).unwrap();
    let dimacs = String::from_utf8(dimacs).unwrap();

    let header = format!("p cnf {} {}", ctx.atoms.var_count(), ctx.clauses.len());
    assert!(dimacs.contains(&header));
    assert!(dimacs.lines().filter(|l| l.starts_with("c ")).count() >= ctx.model.len());
    for line in dimacs.lines() {
        if !line.starts_with('c') && !line.starts_with('p') {
            assert!(line.ends_with(" 0") || line == "0");
        }
    }
}
