/*!
The atom table.

One place owns SAT-variable allocation, so the constraint generator, the CNF
encoder, and the diagnosis engine all agree on numbering. The table is
append-only for the lifetime of a session, and `AtomId(v)` is both the index
into the table and the SAT variable `v`.

At construction the table allocates, per feature:

- boolean/tristate: a SYMBOL_Y atom, plus SYMBOL_M for tristates (plain
  booleans share the constant-false atom as their `mod` side);
- choice groups: the same pair with `Choice_<prompt>` names;
- features with a reverse dependency: SELECTED_Y (and SELECTED_M for
  tristates);
- non-booleans: a three-value default domain (`n`, then a type-appropriate
  zero and one) so the domain encoding always has an at-least-one
  constraint. Further values are created on demand.

NO_PROMPT_COND atoms and Tseitin temporaries are created later, during
constraint generation and CNF encoding.
*/

use crate::structures::atom::{Atom, AtomId, AtomKind};
use crate::structures::feature::{FeatureId, FeatureModel, FeatureType};

/// Allocates atoms and maintains the SAT-variable bijection.
#[derive(Debug)]
pub struct AtomTable {
    /// Index 0 is a placeholder so that `atoms[v]` is SAT variable `v`.
    atoms: Vec<Atom>,

    pub const_false: AtomId,
    pub const_true: AtomId,

    sym_y: Vec<Option<AtomId>>,
    sym_m: Vec<Option<AtomId>>,
    sel_y: Vec<Option<AtomId>>,
    sel_m: Vec<Option<AtomId>>,
    npc: Vec<Option<AtomId>>,
    nb_vals: Vec<Vec<AtomId>>,

    tmp_count: u32,
}

impl AtomTable {
    /// Build the table for a model, allocating the constants and every
    /// feature-owned atom.
    pub fn new(model: &FeatureModel) -> Self {
        let n = model.len();
        let placeholder = Atom {
            kind: AtomKind::ConstFalse,
            name: String::new(),
            feature: None,
            nb_val: None,
            assumed: false,
        };

        let mut table = AtomTable {
            atoms: vec![placeholder],
            const_false: AtomId(0),
            const_true: AtomId(0),
            sym_y: vec![None; n],
            sym_m: vec![None; n],
            sel_y: vec![None; n],
            sel_m: vec![None; n],
            npc: vec![None; n],
            nb_vals: vec![Vec::new(); n],
            tmp_count: 0,
        };

        table.const_false = table.alloc(AtomKind::ConstFalse, "0".to_string(), None, None);
        table.const_true = table.alloc(AtomKind::ConstTrue, "1".to_string(), None, None);

        for id in model.ids() {
            table.create_feature_atoms(model, id);
        }

        table
    }

    fn alloc(
        &mut self,
        kind: AtomKind,
        name: String,
        feature: Option<FeatureId>,
        nb_val: Option<String>,
    ) -> AtomId {
        let id = AtomId(self.atoms.len() as u32);
        self.atoms.push(Atom {
            kind,
            name,
            feature,
            nb_val,
            assumed: false,
        });
        id
    }

    fn create_feature_atoms(&mut self, model: &FeatureModel, id: FeatureId) {
        let f = model.feature(id);

        if f.is_const {
            return;
        }

        if f.is_choice {
            // choices are named after their prompt, spaces removed
            let prompt = f.prompt.as_ref().map(|p| p.text.as_str()).unwrap_or("");
            let base: String = prompt.chars().filter(|c| *c != ' ').collect();

            let y = self.alloc(AtomKind::ChoiceY, format!("Choice_{base}"), Some(id), None);
            self.sym_y[id.0 as usize] = Some(y);

            let m = if f.ftype == FeatureType::Tristate {
                self.alloc(AtomKind::ChoiceM, format!("Choice_{base}_MODULE"), Some(id), None)
            } else {
                self.const_false
            };
            self.sym_m[id.0 as usize] = Some(m);
            return;
        }

        match f.ftype {
            FeatureType::Bool | FeatureType::Tristate => {
                let name = f.name.clone().unwrap_or_default();

                let y = self.alloc(AtomKind::SymbolY, name.clone(), Some(id), None);
                self.sym_y[id.0 as usize] = Some(y);

                let m = if f.ftype == FeatureType::Tristate {
                    self.alloc(AtomKind::SymbolM, format!("{name}_MODULE"), Some(id), None)
                } else {
                    self.const_false
                };
                self.sym_m[id.0 as usize] = Some(m);

                if f.rev_dep.is_some() {
                    let sel_y = self.alloc(AtomKind::SelectedY, format!("{name}_sel_y"), Some(id), None);
                    self.sel_y[id.0 as usize] = Some(sel_y);

                    if f.ftype == FeatureType::Tristate {
                        let sel_m =
                            self.alloc(AtomKind::SelectedM, format!("{name}_sel_m"), Some(id), None);
                        self.sel_m[id.0 as usize] = Some(sel_m);
                    }
                }
            }
            FeatureType::Int | FeatureType::Hex | FeatureType::String => {
                let seed: [&str; 3] = match f.ftype {
                    FeatureType::Int => ["n", "0", "1"],
                    FeatureType::Hex => ["n", "0x0", "0x1"],
                    _ => ["n", "", "nonempty"],
                };
                for value in seed {
                    self.create_nonbool(model, id, value);
                }
            }
            FeatureType::Unknown => {
                self.sym_y[id.0 as usize] = Some(self.const_false);
                self.sym_m[id.0 as usize] = Some(self.const_false);
            }
        }
    }

    /* lookups */

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[id.0 as usize]
    }

    pub fn atom_mut(&mut self, id: AtomId) -> &mut Atom {
        &mut self.atoms[id.0 as usize]
    }

    /// The atom for SAT variable `var`, if allocated.
    pub fn lookup_by_sat(&self, var: u32) -> Option<AtomId> {
        if var == 0 || var as usize >= self.atoms.len() {
            return None;
        }
        Some(AtomId(var))
    }

    /// Number of allocated SAT variables.
    pub fn var_count(&self) -> u32 {
        self.atoms.len() as u32 - 1
    }

    /// The "is yes" atom of a feature. Constant-false for features that
    /// have none; the tristate constants map to the constant atoms.
    pub fn atom_y(&self, model: &FeatureModel, id: FeatureId) -> AtomId {
        if let Some(tri) = model.feature(id).const_tri {
            return match tri {
                crate::structures::feature::Tristate::Yes => self.const_true,
                _ => self.const_false,
            };
        }
        self.sym_y[id.0 as usize].unwrap_or(self.const_false)
    }

    /// The "is mod" atom of a feature; constant-false for plain booleans.
    pub fn atom_m(&self, model: &FeatureModel, id: FeatureId) -> AtomId {
        if let Some(tri) = model.feature(id).const_tri {
            return match tri {
                crate::structures::feature::Tristate::Mod => self.const_true,
                _ => self.const_false,
            };
        }
        self.sym_m[id.0 as usize].unwrap_or(self.const_false)
    }

    pub fn selected_y(&self, id: FeatureId) -> Option<AtomId> {
        self.sel_y[id.0 as usize]
    }

    pub fn selected_m(&self, id: FeatureId) -> Option<AtomId> {
        self.sel_m[id.0 as usize]
    }

    pub fn npc(&self, id: FeatureId) -> Option<AtomId> {
        self.npc[id.0 as usize]
    }

    /// Create the NO_PROMPT_COND atom for a feature.
    pub fn create_npc(&mut self, model: &FeatureModel, id: FeatureId) -> AtomId {
        if let Some(existing) = self.npc[id.0 as usize] {
            return existing;
        }
        let prefix = if model.is_choice(id) { "Choice_" } else { "" };
        let name = format!("{prefix}{}_NPC", model.display_name(id));
        let atom = self.alloc(AtomKind::NoPromptCond, name, Some(id), None);
        self.npc[id.0 as usize] = Some(atom);
        atom
    }

    /// The ordered domain atoms of a non-boolean; index 0 is "no value".
    pub fn nonbool_vals(&self, id: FeatureId) -> &[AtomId] {
        &self.nb_vals[id.0 as usize]
    }

    /// The domain atom for a specific value, if known.
    pub fn nonbool_val(&self, id: FeatureId, value: &str) -> Option<AtomId> {
        self.nb_vals[id.0 as usize]
            .iter()
            .copied()
            .find(|a| self.atom(*a).nb_val.as_deref() == Some(value))
    }

    fn create_nonbool(&mut self, model: &FeatureModel, id: FeatureId, value: &str) -> AtomId {
        let name = format!("{}={}", model.display_name(id), value);
        let atom = self.alloc(AtomKind::NonboolEq, name, Some(id), Some(value.to_string()));
        self.nb_vals[id.0 as usize].push(atom);
        atom
    }

    /// The domain atom for a value, created if missing.
    pub fn nonbool_val_or_create(
        &mut self,
        model: &FeatureModel,
        id: FeatureId,
        value: &str,
    ) -> AtomId {
        match self.nonbool_val(id, value) {
            Some(atom) => atom,
            None => self.create_nonbool(model, id, value),
        }
    }

    /// A fresh Tseitin temporary.
    pub fn fresh_tseitin(&mut self) -> AtomId {
        self.tmp_count += 1;
        let name = format!("T_{}", self.tmp_count);
        self.alloc(AtomKind::Tseitin, name, None, None)
    }

    /// Count of Tseitin temporaries created so far.
    pub fn tseitin_count(&self) -> u32 {
        self.tmp_count
    }

    /// All allocated atom ids, constants first.
    pub fn ids(&self) -> impl Iterator<Item = AtomId> {
        (1..self.atoms.len() as u32).map(AtomId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> FeatureModel {
        let mut model = FeatureModel::new();
        let a = model.lookup("A");
        model.feature_mut(a).ftype = FeatureType::Bool;
        let t = model.lookup("T");
        model.feature_mut(t).ftype = FeatureType::Tristate;
        let n = model.lookup("N");
        model.feature_mut(n).ftype = FeatureType::Int;
        model
    }

    #[test]
    fn variables_and_atoms_are_a_bijection() {
        let model = tiny_model();
        let table = AtomTable::new(&model);

        for id in table.ids() {
            assert_eq!(table.lookup_by_sat(id.0), Some(id));
        }
        assert_eq!(table.lookup_by_sat(0), None);
        assert_eq!(table.lookup_by_sat(table.var_count() + 1), None);
    }

    #[test]
    fn bool_shares_const_false_as_mod() {
        let model = tiny_model();
        let table = AtomTable::new(&model);
        let a = model.feature_by_name("A").unwrap();
        let t = model.feature_by_name("T").unwrap();

        assert_eq!(table.atom_m(&model, a), table.const_false);
        assert_ne!(table.atom_m(&model, t), table.const_false);
    }

    #[test]
    fn tristate_constants_map_to_constant_atoms() {
        let model = tiny_model();
        let table = AtomTable::new(&model);

        assert_eq!(table.atom_y(&model, model.const_yes), table.const_true);
        assert_eq!(table.atom_m(&model, model.const_mod), table.const_true);
        assert_eq!(table.atom_y(&model, model.const_no), table.const_false);
    }

    #[test]
    fn nonbool_domain_is_seeded() {
        let model = tiny_model();
        let mut table = AtomTable::new(&model);
        let n = model.feature_by_name("N").unwrap();

        let vals = table.nonbool_vals(n);
        assert_eq!(vals.len(), 3);
        assert_eq!(table.atom(vals[0]).nb_val.as_deref(), Some("n"));

        let seven = table.nonbool_val_or_create(&model, n, "7");
        assert_eq!(table.nonbool_val(n, "7"), Some(seven));
        assert_eq!(table.nonbool_val_or_create(&model, n, "7"), seven);
    }
}
