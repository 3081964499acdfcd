//! End-to-end scenarios over inline feature models.

use confix::builder::{dotconfig, kconfig};
use confix::config::Config;
use confix::context::{ConflictValue, ResolveContext};
use confix::reports::FixValue;
use confix::sat::Outcome;
use confix::structures::feature::Tristate;

fn context(source: &str) -> ResolveContext {
    let model = kconfig::parse_str(source).expect("model parses");
    ResolveContext::from_model(model, Config::default()).expect("session builds")
}

fn context_with_values(source: &str, dotcfg: &str) -> ResolveContext {
    let mut model = kconfig::parse_str(source).expect("model parses");
    dotconfig::read_str(&mut model, dotcfg);
    ResolveContext::from_model(model, Config::default()).expect("session builds")
}

mod select_propagation {
    use super::*;

    const MODEL: &str = "
config A
\tbool \"feature a\"

config B
\tbool \"feature b\"
\tselect A
";

    #[test]
    fn forward_needs_no_diagnosis() {
        let mut ctx = context(MODEL);
        let b = ctx.model.feature_by_name("B").unwrap();

        // setting B=y is in range as-is: selecting B also selects A
        let diagnoses = ctx
            .resolve(&[ConflictValue::tri(b, Tristate::Yes)])
            .unwrap();
        assert!(diagnoses.is_empty());
        assert!(ctx.model.set_tristate(b, Tristate::Yes));

        let a = ctx.model.feature_by_name("A").unwrap();
        assert_eq!(ctx.model.tristate_value(a), Tristate::Yes);
    }

    #[test]
    fn deselecting_the_target_requires_dropping_the_selector() {
        let mut ctx = context(MODEL);
        let a = ctx.model.feature_by_name("A").unwrap();
        let b = ctx.model.feature_by_name("B").unwrap();
        assert!(ctx.model.set_tristate(b, Tristate::Yes));

        let diagnoses = ctx.resolve(&[ConflictValue::tri(a, Tristate::No)]).unwrap();
        assert_eq!(diagnoses.len(), 1);

        let d = &diagnoses[0];
        assert!(d
            .fixes
            .iter()
            .any(|f| f.feature == b && f.value == FixValue::Tri(Tristate::No)));

        // applying the diagnosis reaches the requested value
        let applied = ctx.apply(d).unwrap();
        assert!(applied >= 1);
        assert_eq!(ctx.model.tristate_value(a), Tristate::No);
        assert_eq!(ctx.model.tristate_value(b), Tristate::No);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }
}

mod modules_gate {
    use super::*;

    const MODEL: &str = "
config MODULES
\tbool \"modules\"

config F
\ttristate \"feature f\"
\tdepends on MODULES
";

    #[test]
    fn module_value_is_in_range_while_modules_are_on() {
        let mut ctx = context(MODEL);
        let modules = ctx.model.feature_by_name("MODULES").unwrap();
        let f = ctx.model.feature_by_name("F").unwrap();
        assert!(ctx.model.set_tristate(modules, Tristate::Yes));

        let diagnoses = ctx.resolve(&[ConflictValue::tri(f, Tristate::Mod)]).unwrap();
        assert!(diagnoses.is_empty());
        assert!(ctx.model.set_tristate(f, Tristate::Mod));
    }

    #[test]
    fn module_value_without_modules_needs_one_fix() {
        let mut ctx = context(MODEL);
        let modules = ctx.model.feature_by_name("MODULES").unwrap();
        let f = ctx.model.feature_by_name("F").unwrap();

        let diagnoses = ctx.resolve(&[ConflictValue::tri(f, Tristate::Mod)]).unwrap();
        assert_eq!(diagnoses.len(), 1);

        let d = &diagnoses[0];
        assert!(d
            .fixes
            .iter()
            .any(|fix| fix.feature == modules && fix.value == FixValue::Tri(Tristate::Yes)));
        // minimal: the conflict target and the one fix
        assert_eq!(d.fixes.len(), 2);

        ctx.apply(d).unwrap();
        assert_eq!(ctx.model.tristate_value(f), Tristate::Mod);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }
}

mod choice_exclusivity {
    use super::*;

    const MODEL: &str = "
choice
\tprompt \"pick one\"

config X
\tbool \"x\"

config Y
\tbool \"y\"

config Z
\tbool \"z\"

endchoice
";

    #[test]
    fn switching_member_drops_only_the_active_one() {
        let mut ctx = context(MODEL);
        let x = ctx.model.feature_by_name("X").unwrap();
        let y = ctx.model.feature_by_name("Y").unwrap();
        let z = ctx.model.feature_by_name("Z").unwrap();
        assert!(ctx.model.set_tristate(x, Tristate::Yes));

        let diagnoses = ctx.resolve(&[ConflictValue::tri(y, Tristate::Yes)]).unwrap();
        assert_eq!(diagnoses.len(), 1);

        let d = &diagnoses[0];
        assert!(d
            .fixes
            .iter()
            .any(|fix| fix.feature == x && fix.value == FixValue::Tri(Tristate::No)));
        // minimality: the untouched member is not dragged in
        assert!(!d.contains(z));

        ctx.apply(d).unwrap();
        assert_eq!(ctx.model.tristate_value(y), Tristate::Yes);
        assert_eq!(ctx.model.tristate_value(x), Tristate::No);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }
}

mod tristate_decoding {
    use super::*;

    #[test]
    fn dependency_on_not_f_offers_dropping_f() {
        let mut ctx = context(
            "
config MODULES
\tbool \"modules\"
\tdefault y

config F
\ttristate \"feature f\"

config G
\tbool \"feature g\"
\tdepends on !F
",
        );
        let f = ctx.model.feature_by_name("F").unwrap();
        let g = ctx.model.feature_by_name("G").unwrap();
        assert!(ctx.model.set_tristate(f, Tristate::Yes));

        let diagnoses = ctx.resolve(&[ConflictValue::tri(g, Tristate::Yes)]).unwrap();
        assert!(!diagnoses.is_empty());

        // both F=n and F=m satisfy !F; whichever is returned must apply
        let d = &diagnoses[0];
        let fix = d.fixes.iter().find(|fix| fix.feature == f).expect("fix for F");
        assert!(matches!(
            fix.value,
            FixValue::Tri(Tristate::No) | FixValue::Tri(Tristate::Mod)
        ));

        ctx.apply(d).unwrap();
        assert_eq!(ctx.model.tristate_value(g), Tristate::Yes);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }

    #[test]
    fn equality_with_mod_decodes_through_both_atoms() {
        let mut ctx = context(
            "
config MODULES
\tbool \"modules\"
\tdefault y

config F
\ttristate \"feature f\"

config G
\tbool \"feature g\"
\tdepends on F=m
",
        );
        let f = ctx.model.feature_by_name("F").unwrap();
        let g = ctx.model.feature_by_name("G").unwrap();
        assert!(ctx.model.set_tristate(f, Tristate::Yes));

        let diagnoses = ctx.resolve(&[ConflictValue::tri(g, Tristate::Yes)]).unwrap();
        assert!(!diagnoses.is_empty());

        // leaving yes towards mod: both tristate atoms flip together
        let d = &diagnoses[0];
        let fix = d.fixes.iter().find(|fix| fix.feature == f).expect("fix for F");
        assert_eq!(fix.value, FixValue::Tri(Tristate::Mod));

        ctx.apply(d).unwrap();
        assert_eq!(ctx.model.tristate_value(f), Tristate::Mod);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }
}

mod invisible_defaults {
    use super::*;

    #[test]
    fn invisible_default_on_cannot_be_turned_off() {
        let mut ctx = context(
            "
config H
\tbool
\tdefault y

config J
\tbool \"j\"
",
        );
        let h = ctx.model.feature_by_name("H").unwrap();

        // the default drives the invisible feature on
        assert_eq!(ctx.model.tristate_value(h), Tristate::Yes);
        assert_eq!(ctx.check_current(), Outcome::Sat);

        // no prompted feature can make H=n consistent
        let diagnoses = ctx.resolve(&[ConflictValue::tri(h, Tristate::No)]).unwrap();
        assert!(diagnoses.is_empty());
        assert!(!ctx.within_range(&[ConflictValue::tri(h, Tristate::No)]));
    }

    #[test]
    fn invisible_default_off_follows_its_selector() {
        // H has no prompt and no default: the encoding routes its value
        // through SELECTED_Y
        let mut ctx = context(
            "
config S
\tbool \"s\"
\tselect H

config H
\tbool
",
        );
        let s = ctx.model.feature_by_name("S").unwrap();
        let h = ctx.model.feature_by_name("H").unwrap();

        // selector off: H rests at n, consistently
        assert_eq!(ctx.model.tristate_value(h), Tristate::No);
        assert_eq!(ctx.check_current(), Outcome::Sat);

        // selector on: H follows
        assert!(ctx.model.set_tristate(s, Tristate::Yes));
        assert_eq!(ctx.model.tristate_value(h), Tristate::Yes);
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }
}

mod range_filters {
    use super::*;

    const MODEL: &str = "
config C1
\tbool \"c one\"
\tdefault y

config N
\tint \"n\"
\trange 1 10 if C1
\trange 20 30 if !C1
";

    #[test]
    fn out_of_range_value_is_rejected_by_the_encoding() {
        let mut ctx = context_with_values(MODEL, "CONFIG_N=15\n");
        assert_eq!(ctx.check_current(), Outcome::Unsat);
    }

    #[test]
    fn in_range_value_is_accepted() {
        let mut ctx = context_with_values(MODEL, "CONFIG_N=5\n");
        assert_eq!(ctx.check_current(), Outcome::Sat);
    }

    #[test]
    fn later_ranges_are_guarded_by_earlier_conditions() {
        let mut ctx = context_with_values(MODEL, "# CONFIG_C1 is not set\nCONFIG_N=25\n");
        assert_eq!(ctx.check_current(), Outcome::Sat);

        let mut ctx = context_with_values(MODEL, "# CONFIG_C1 is not set\nCONFIG_N=5\n");
        assert_eq!(ctx.check_current(), Outcome::Unsat);
    }

    #[test]
    fn range_moves_are_within_range_directly() {
        let ctx = context_with_values(MODEL, "CONFIG_N=15\n");
        let n = ctx.model.feature_by_name("N").unwrap();
        assert!(ctx.within_range(&[ConflictValue::string(n, "7")]));
        assert!(!ctx.within_range(&[ConflictValue::string(n, "40")]));
    }
}
