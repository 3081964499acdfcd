//! The confix command line driver.
//!
//! Interactive mode loads a feature model, then loops: feature name, desired
//! value, list the computed diagnoses, apply the chosen one. One-shot mode
//! (`-s`) emits the constraint listing and the DIMACS dump instead.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

use confix::builder::{dotconfig, kconfig};
use confix::config::Config;
use confix::context::{ConflictValue, ResolveContext};
use confix::reports::dump;
use confix::sat::Outcome;
use confix::structures::feature::{FeatureId, FeatureType, Tristate};

fn cli() -> Command {
    Command::new("confix")
        .about("Resolves conflicts in Kconfig-style feature models via SAT-based diagnosis")
        .arg(
            Arg::new("kconfig")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("The feature-model file to load."),
        )
        .arg(
            Arg::new("single")
                .short('s')
                .long("single-shot")
                .action(ArgAction::SetTrue)
                .help("Dump constraints and DIMACS instead of resolving interactively."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("A .config file with current values to load over the model."),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for the single-shot dump files (default: current directory)."),
        )
        .arg(
            Arg::new("max_diagnoses")
                .long("max-diagnoses")
                .value_parser(value_parser!(usize))
                .help("Stop after this many diagnoses (default: 3)."),
        )
        .arg(
            Arg::new("time_budget")
                .long("time-budget")
                .value_parser(value_parser!(u64))
                .help("Wall-clock budget for enumeration, in seconds (default: 10)."),
        )
}

fn main() {
    env_logger::init();
    let matches = cli().get_matches();

    let path: &PathBuf = matches.get_one("kconfig").expect("required");

    let mut model = match kconfig::parse_file(path) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("confix: {e}");
            std::process::exit(1);
        }
    };

    if let Some(config_path) = matches.get_one::<PathBuf>("config") {
        match dotconfig::read_file(&mut model, config_path) {
            Ok(n) => println!("Loaded {n} values from {}", config_path.display()),
            Err(e) => {
                eprintln!("confix: {e}");
                std::process::exit(1);
            }
        }
    }

    let mut config = Config::default();
    if let Some(n) = matches.get_one::<usize>("max_diagnoses") {
        config.max_diagnoses = *n;
    }
    if let Some(secs) = matches.get_one::<u64>("time_budget") {
        config.time_budget = std::time::Duration::from_secs(*secs);
    }

    let mut ctx = match ResolveContext::from_model(model, config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("confix: {e}");
            std::process::exit(1);
        }
    };

    if matches.get_flag("single") {
        let out = matches
            .get_one::<PathBuf>("out")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        single_shot(&mut ctx, &out);
        return;
    }

    interactive(&mut ctx);
}

/// Emit the two debug artefacts and a consistency report.
fn single_shot(ctx: &mut ResolveContext, out: &std::path::Path) {
    let stats = ctx.bridge.stats();
    println!(
        "{} features, {} constraints, {} variables, {} clauses",
        ctx.model.len(),
        ctx.constraint_count(),
        ctx.atoms.var_count(),
        stats.clauses,
    );

    match ctx.check_current() {
        Outcome::Sat => println!("Current configuration is consistent."),
        Outcome::Unsat => println!("Current configuration violates the rule base."),
        Outcome::Unknown => println!("Solver could not decide the current configuration."),
    }

    let constraints_path = out.join("confix_constraints.txt");
    let dimacs_path = out.join("confix_constraints.dimacs");

    if let Err(e) = write_artifacts(ctx, &constraints_path, &dimacs_path) {
        eprintln!("confix: writing dumps: {e}");
        std::process::exit(1);
    }

    println!("Constraints written to {}", constraints_path.display());
    println!("DIMACS written to {}", dimacs_path.display());
}

fn write_artifacts(
    ctx: &ResolveContext,
    constraints: &std::path::Path,
    dimacs: &std::path::Path,
) -> std::io::Result<()> {
    let mut f = std::io::BufWriter::new(std::fs::File::create(constraints)?);
    dump::write_constraints(ctx, &mut f)?;
    f.flush()?;

    let mut f = std::io::BufWriter::new(std::fs::File::create(dimacs)?);
    dump::write_dimacs(ctx, &mut f)?;
    f.flush()
}

fn interactive(ctx: &mut ResolveContext) {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(feature) = read_feature(ctx, &mut lines) else {
            return;
        };

        println!(
            "Found {}, type {}, current value {}",
            ctx.model.display_name(feature),
            ctx.model.feature(feature).ftype.name(),
            ctx.model.string_value(feature),
        );

        print!("Desired value: ");
        let _ = std::io::stdout().flush();
        let Some(Ok(value)) = lines.next() else {
            return;
        };
        let value = value.trim();

        let Some(conflict) = make_conflict(ctx, feature, value) else {
            println!("Not a valid value for this feature.");
            continue;
        };

        let diagnoses = match ctx.resolve(std::slice::from_ref(&conflict)) {
            Ok(diagnoses) => diagnoses,
            Err(e) => {
                eprintln!("confix: {e}");
                continue;
            }
        };

        if diagnoses.is_empty() {
            if ctx.within_range(std::slice::from_ref(&conflict)) {
                println!("Value is already within range, just set it.");
            } else {
                println!("No diagnosis found within budget.");
            }
            continue;
        }

        println!("=== GENERATED DIAGNOSES ===");
        println!(" 0: No changes wanted");
        for (i, d) in diagnoses.iter().enumerate() {
            println!(" {}: {}", i + 1, d.render(&ctx.model));
        }

        print!("> Choose option: ");
        let _ = std::io::stdout().flush();
        let Some(Ok(choice)) = lines.next() else {
            return;
        };
        let Ok(choice) = choice.trim().parse::<usize>() else {
            continue;
        };
        if choice == 0 || choice > diagnoses.len() {
            continue;
        }

        match ctx.apply(&diagnoses[choice - 1]) {
            Ok(n) => println!("Applied, {n} features set."),
            Err(e) => println!("Partially applied: {e}"),
        }
    }
}

fn read_feature(
    ctx: &ResolveContext,
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
) -> Option<FeatureId> {
    loop {
        print!("Feature name (empty to quit): ");
        let _ = std::io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => return None,
        };
        let name = line.trim();
        if name.is_empty() {
            return None;
        }
        match ctx.model.feature_by_name(name) {
            Some(id) if !ctx.model.feature(id).is_const => return Some(id),
            _ => println!("No such feature."),
        }
    }
}

fn make_conflict(ctx: &ResolveContext, feature: FeatureId, value: &str) -> Option<ConflictValue> {
    if ctx.model.is_boolean(feature) {
        let mut tri = Tristate::from_str(value)?;
        // booleans cannot be modules
        if ctx.model.feature(feature).ftype == FeatureType::Bool && tri == Tristate::Mod {
            tri = Tristate::Yes;
        }
        Some(ConflictValue::tri(feature, tri))
    } else if ctx.model.is_nonboolean(feature) {
        Some(ConflictValue::string(feature, value))
    } else {
        None
    }
}
