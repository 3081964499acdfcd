/*!
Reading a `.config`-style value file over a parsed model.

Two line forms matter: `CONFIG_<NAME>=<value>` and
`# CONFIG_<NAME> is not set`. Values `y`/`m`/`n` set boolean and tristate
user values, quoted strings and bare literals set non-boolean ones. Lines
for unknown features are logged and skipped; everything else is a comment.
*/

use crate::misc::log::targets;
use crate::structures::feature::{FeatureModel, Tristate};
use crate::types::err::{ErrorKind, LoadError};

/// Apply a `.config` file to the model. Returns the number of values set.
pub fn read_file(model: &mut FeatureModel, path: &std::path::Path) -> Result<usize, ErrorKind> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
    Ok(read_str(model, &source))
}

/// Apply `.config` source text to the model.
pub fn read_str(model: &mut FeatureModel, source: &str) -> usize {
    let mut set = 0usize;

    for line in source.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("# CONFIG_") {
            if let Some(name) = rest.strip_suffix(" is not set") {
                if let Some(id) = model.feature_by_name(name) {
                    if model.is_boolean(id) {
                        model.feature_mut(id).user_tri = Some(Tristate::No);
                        set += 1;
                    }
                } else {
                    log::debug!(target: targets::LOADER, "unknown feature {name} in .config");
                }
            }
            continue;
        }

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(rest) = line.strip_prefix("CONFIG_") else {
            continue;
        };
        let Some((name, value)) = rest.split_once('=') else {
            continue;
        };

        let Some(id) = model.feature_by_name(name) else {
            log::debug!(target: targets::LOADER, "unknown feature {name} in .config");
            continue;
        };

        if model.is_boolean(id) {
            match Tristate::from_str(value) {
                Some(tri) => {
                    model.feature_mut(id).user_tri = Some(tri);
                    set += 1;
                }
                None => {
                    log::warn!(
                        target: targets::LOADER,
                        "bad tristate value {value:?} for {name}"
                    );
                }
            }
        } else if model.is_nonboolean(id) {
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            model.feature_mut(id).user_str = Some(value.to_string());
            set += 1;
        }
    }

    model.recalc_all();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::kconfig;

    #[test]
    fn values_apply_over_defaults() {
        let mut model = kconfig::parse_str(
            "
config A
\tbool \"a\"
\tdefault y

config NAME
\tstring \"name\"
",
        )
        .unwrap();

        let applied = read_str(
            &mut model,
            "# comment\n# CONFIG_A is not set\nCONFIG_NAME=\"dev\"\nCONFIG_MISSING=y\n",
        );
        assert_eq!(applied, 2);

        let a = model.feature_by_name("A").unwrap();
        assert_eq!(model.tristate_value(a), Tristate::No);
        let name = model.feature_by_name("NAME").unwrap();
        assert_eq!(model.string_value(name), "dev");
    }
}
