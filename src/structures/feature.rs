/*!
The feature model: the read-only snapshot a resolve session is built from,
plus the mutation surface a diagnosis is applied through.

Features are stored in a flat vector and referenced by [FeatureId]
everywhere — rule expressions, choice membership, selector targets. The
model also owns the [rule arena](crate::structures::rule) and the designated
modules feature, which the original keeps as globals.

Value semantics follow the Kconfig evaluation rules the resolver observes:
`&&` is minimum, `||` is maximum, `!` flips around `mod`; a feature's
effective value is its user value clamped to the prompt's visibility, with
invisible features falling back to their first visible default, and the
reverse dependency acting as a lower bound. `mod` collapses to `yes` for
plain booleans and when the modules feature is off.
*/

use std::collections::HashMap;

use crate::misc::log::targets;
use crate::structures::rule::{ExprId, RuleArena, RuleExpr};

/// Index of a feature in its [FeatureModel].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FeatureId(pub u32);

/// The three-valued domain of boolean and tristate features.
///
/// Ordered `No < Mod < Yes`, the ordering Kconfig evaluation relies on.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Tristate {
    No,
    Mod,
    Yes,
}

impl Tristate {
    /// Boolean negation: `!no = yes`, `!mod = mod`, `!yes = no`.
    pub fn flip(self) -> Self {
        match self {
            Tristate::No => Tristate::Yes,
            Tristate::Mod => Tristate::Mod,
            Tristate::Yes => Tristate::No,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Tristate::No => 'n',
            Tristate::Mod => 'm',
            Tristate::Yes => 'y',
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "n" => Some(Tristate::No),
            "m" => Some(Tristate::Mod),
            "y" => Some(Tristate::Yes),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tristate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let word = match self {
            Tristate::No => "no",
            Tristate::Mod => "mod",
            Tristate::Yes => "yes",
        };
        write!(f, "{word}")
    }
}

/// The type of a feature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeatureType {
    Unknown,
    Bool,
    Tristate,
    Int,
    Hex,
    String,
}

impl FeatureType {
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Unknown => "unknown",
            FeatureType::Bool => "bool",
            FeatureType::Tristate => "tristate",
            FeatureType::Int => "int",
            FeatureType::Hex => "hex",
            FeatureType::String => "string",
        }
    }
}

/// A prompt with its visibility condition.
#[derive(Clone, Debug)]
pub struct Prompt {
    pub text: String,
    pub cond: Option<ExprId>,
}

/// One `default` entry; earlier entries take precedence.
#[derive(Clone, Copy, Debug)]
pub struct DefaultProp {
    pub value: ExprId,
    pub cond: Option<ExprId>,
}

/// One `select` or `imply` entry on the *selecting* feature.
#[derive(Clone, Copy, Debug)]
pub struct SelectProp {
    pub target: FeatureId,
    pub cond: Option<ExprId>,
}

/// One `range lo hi` entry; bounds are feature references whose names carry
/// the literals.
#[derive(Clone, Copy, Debug)]
pub struct RangeProp {
    pub lo: FeatureId,
    pub hi: FeatureId,
    pub cond: Option<ExprId>,
}

/// A feature of the model.
#[derive(Clone, Debug)]
pub struct Feature {
    /// Declared name. Choice groups have none.
    pub name: Option<String>,

    pub ftype: FeatureType,

    /// A literal constant from an expression (a quoted string or a bare
    /// undeclared word), or one of the three tristate constants.
    pub is_const: bool,

    /// Set for the three tristate constants `n`/`m`/`y`.
    pub const_tri: Option<Tristate>,

    pub is_choice: bool,
    pub choice_optional: bool,
    pub choice_members: Vec<FeatureId>,
    /// Back-pointer of a choice member to its group.
    pub choice_group: Option<FeatureId>,

    pub prompt: Option<Prompt>,
    pub dir_dep: Option<ExprId>,
    /// Disjunction of selectors, accumulated from `select` sites.
    pub rev_dep: Option<ExprId>,
    /// Disjunction of weak selectors, accumulated from `imply` sites.
    pub implied: Option<ExprId>,

    pub defaults: Vec<DefaultProp>,
    pub selects: Vec<SelectProp>,
    pub implies: Vec<SelectProp>,
    pub ranges: Vec<RangeProp>,

    /// User-requested value for boolean/tristate features.
    pub user_tri: Option<Tristate>,
    /// User-requested value for non-boolean features.
    pub user_str: Option<String>,

    /// Effective value for boolean/tristate features.
    pub cur_tri: Tristate,
    /// Effective value for non-boolean features; `None` means no value set.
    pub cur_str: Option<String>,
}

impl Feature {
    fn new(name: Option<String>) -> Self {
        Feature {
            name,
            ftype: FeatureType::Unknown,
            is_const: false,
            const_tri: None,
            is_choice: false,
            choice_optional: false,
            choice_members: Vec::new(),
            choice_group: None,
            prompt: None,
            dir_dep: None,
            rev_dep: None,
            implied: None,
            defaults: Vec::new(),
            selects: Vec::new(),
            implies: Vec::new(),
            ranges: Vec::new(),
            user_tri: None,
            user_str: None,
            cur_tri: Tristate::No,
            cur_str: None,
        }
    }
}

/// Parse a leading integer the way `strtoll` does: longest valid prefix,
/// zero if there is none. Hex accepts an optional `0x` prefix.
pub fn parse_prefix_int(s: &str, base: u32) -> i64 {
    let s = s.trim();
    let (neg, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let s = if base == 16 {
        s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
    } else {
        s
    };

    let mut value: i64 = 0;
    for c in s.chars() {
        match c.to_digit(base) {
            Some(d) => value = value.saturating_mul(base as i64).saturating_add(d as i64),
            None => break,
        }
    }

    if neg {
        -value
    } else {
        value
    }
}

/// The model: all features, the rule arena, and the designated modules
/// feature.
#[derive(Debug)]
pub struct FeatureModel {
    features: Vec<Feature>,
    pub rules: RuleArena,
    /// The feature whose value enables the `mod` level globally, if any.
    pub modules: Option<FeatureId>,

    by_name: HashMap<String, FeatureId>,
    consts_by_name: HashMap<String, FeatureId>,

    pub const_no: FeatureId,
    pub const_mod: FeatureId,
    pub const_yes: FeatureId,
}

impl Default for FeatureModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureModel {
    pub fn new() -> Self {
        let mut model = FeatureModel {
            features: Vec::new(),
            rules: RuleArena::default(),
            modules: None,
            by_name: HashMap::new(),
            consts_by_name: HashMap::new(),
            const_no: FeatureId(0),
            const_mod: FeatureId(1),
            const_yes: FeatureId(2),
        };

        for (name, tri) in [("n", Tristate::No), ("m", Tristate::Mod), ("y", Tristate::Yes)] {
            let mut f = Feature::new(Some(name.to_string()));
            f.is_const = true;
            f.const_tri = Some(tri);
            f.cur_tri = tri;
            model.features.push(f);
        }

        model
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> {
        (0..self.features.len() as u32).map(FeatureId)
    }

    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.0 as usize]
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> &mut Feature {
        &mut self.features[id.0 as usize]
    }

    /// Look up a declared (or referenced) feature by name.
    pub fn feature_by_name(&self, name: &str) -> Option<FeatureId> {
        match name {
            "n" => Some(self.const_no),
            "m" => Some(self.const_mod),
            "y" => Some(self.const_yes),
            _ => self.by_name.get(name).copied(),
        }
    }

    /// Get or create the feature a bare word refers to. Undeclared words
    /// stay [FeatureType::Unknown] and act as literal constants.
    pub fn lookup(&mut self, name: &str) -> FeatureId {
        if let Some(id) = self.feature_by_name(name) {
            return id;
        }
        let id = FeatureId(self.features.len() as u32);
        self.features.push(Feature::new(Some(name.to_string())));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Get or create the constant feature for a quoted literal.
    pub fn lookup_const(&mut self, value: &str) -> FeatureId {
        match value {
            "n" => return self.const_no,
            "m" => return self.const_mod,
            "y" => return self.const_yes,
            _ => {}
        }
        if let Some(id) = self.consts_by_name.get(value) {
            return *id;
        }
        let id = FeatureId(self.features.len() as u32);
        let mut f = Feature::new(Some(value.to_string()));
        f.is_const = true;
        self.features.push(f);
        self.consts_by_name.insert(value.to_string(), id);
        id
    }

    /// Create an unnamed choice group.
    pub fn new_choice(&mut self) -> FeatureId {
        let id = FeatureId(self.features.len() as u32);
        let mut f = Feature::new(None);
        f.is_choice = true;
        f.ftype = FeatureType::Bool;
        self.features.push(f);
        id
    }

    /* type predicates, after the original's sym_is_* helpers */

    pub fn is_boolean(&self, id: FeatureId) -> bool {
        matches!(self.feature(id).ftype, FeatureType::Bool | FeatureType::Tristate)
    }

    pub fn is_nonboolean(&self, id: FeatureId) -> bool {
        matches!(
            self.feature(id).ftype,
            FeatureType::Int | FeatureType::Hex | FeatureType::String
        )
    }

    pub fn is_tristate_constant(&self, id: FeatureId) -> bool {
        self.feature(id).const_tri.is_some()
    }

    pub fn is_bool_or_triconst(&self, id: FeatureId) -> bool {
        self.is_tristate_constant(id) || self.is_boolean(id)
    }

    pub fn is_choice(&self, id: FeatureId) -> bool {
        self.feature(id).is_choice
    }

    pub fn is_choice_member(&self, id: FeatureId) -> bool {
        self.feature(id).choice_group.is_some()
    }

    pub fn has_prompt(&self, id: FeatureId) -> bool {
        self.feature(id).prompt.is_some()
    }

    /// The name for traces: declared name, or the prompt text for choices.
    pub fn display_name(&self, id: FeatureId) -> String {
        let f = self.feature(id);
        match (&f.name, &f.prompt) {
            (Some(name), _) => name.clone(),
            (None, Some(prompt)) => prompt.text.clone(),
            (None, None) => format!("<anon {}>", id.0),
        }
    }

    /* values */

    /// Effective tristate value; `no` for non-booleans and unknowns.
    pub fn tristate_value(&self, id: FeatureId) -> Tristate {
        let f = self.feature(id);
        if let Some(tri) = f.const_tri {
            return tri;
        }
        match f.ftype {
            FeatureType::Bool | FeatureType::Tristate => f.cur_tri,
            _ => Tristate::No,
        }
    }

    /// Effective value as a string: `y`/`m`/`n` for booleans, the stored
    /// string (or empty) for non-booleans, the name itself for constants.
    pub fn string_value(&self, id: FeatureId) -> String {
        let f = self.feature(id);
        if f.is_const {
            return f.name.clone().unwrap_or_default();
        }
        match f.ftype {
            FeatureType::Bool | FeatureType::Tristate => {
                self.tristate_value(id).as_char().to_string()
            }
            _ => f.cur_str.clone().unwrap_or_default(),
        }
    }

    /// Whether a non-boolean feature currently has a value set.
    pub fn has_value(&self, id: FeatureId) -> bool {
        self.feature(id).cur_str.is_some()
    }

    fn modules_enabled(&self) -> bool {
        match self.modules {
            Some(m) => self.tristate_value(m) != Tristate::No,
            None => false,
        }
    }

    /* rule evaluation over current values */

    /// Evaluate a rule expression against the current values.
    pub fn eval(&self, id: ExprId) -> Tristate {
        match self.rules.get(id) {
            RuleExpr::Symbol(f) => self.tristate_value(f),
            RuleExpr::And(l, r) => std::cmp::min(self.eval(l), self.eval(r)),
            RuleExpr::Or(l, r) => std::cmp::max(self.eval(l), self.eval(r)),
            RuleExpr::Not(e) => self.eval(e).flip(),
            RuleExpr::Equal(l, r) => {
                if self.string_value(l) == self.string_value(r) {
                    Tristate::Yes
                } else {
                    Tristate::No
                }
            }
            RuleExpr::Unequal(l, r) => {
                if self.string_value(l) != self.string_value(r) {
                    Tristate::Yes
                } else {
                    Tristate::No
                }
            }
            RuleExpr::Lth(l, r) => self.eval_ord(l, r, |o| o == std::cmp::Ordering::Less),
            RuleExpr::Leq(l, r) => self.eval_ord(l, r, |o| o != std::cmp::Ordering::Greater),
            RuleExpr::Gth(l, r) => self.eval_ord(l, r, |o| o == std::cmp::Ordering::Greater),
            RuleExpr::Geq(l, r) => self.eval_ord(l, r, |o| o != std::cmp::Ordering::Less),
        }
    }

    fn eval_ord(
        &self,
        l: FeatureId,
        r: FeatureId,
        accept: impl Fn(std::cmp::Ordering) -> bool,
    ) -> Tristate {
        let lv = self.string_value(l);
        let rv = self.string_value(r);
        let base = |id: FeatureId, s: &str| match self.feature(id).ftype {
            FeatureType::Hex => 16,
            FeatureType::Int => 10,
            _ => {
                if s.starts_with("0x") || s.starts_with("0X") {
                    16
                } else {
                    10
                }
            }
        };
        let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-' || c == 'x' || c == 'X');
        let ord = if numeric(&lv) && numeric(&rv) {
            parse_prefix_int(&lv, base(l, &lv)).cmp(&parse_prefix_int(&rv, base(r, &rv)))
        } else {
            lv.cmp(&rv)
        };
        if accept(ord) {
            Tristate::Yes
        } else {
            Tristate::No
        }
    }

    /* value recalculation */

    /// Prompt visibility: the prompt condition joined with the direct
    /// dependency; `no` without a prompt.
    pub fn visibility(&self, id: FeatureId) -> Tristate {
        let f = self.feature(id);
        let Some(prompt) = &f.prompt else {
            return Tristate::No;
        };
        let mut vis = match prompt.cond {
            Some(cond) => self.eval(cond),
            None => Tristate::Yes,
        };
        if let Some(dep) = f.dir_dep {
            vis = std::cmp::min(vis, self.eval(dep));
        }
        vis
    }

    fn default_tri(&self, id: FeatureId) -> Tristate {
        for d in &self.feature(id).defaults {
            let cond = match d.cond {
                Some(c) => self.eval(c),
                None => Tristate::Yes,
            };
            if cond == Tristate::No {
                continue;
            }
            return std::cmp::min(self.eval(d.value), cond);
        }
        Tristate::No
    }

    fn default_str(&self, id: FeatureId) -> Option<String> {
        for d in &self.feature(id).defaults {
            let cond = match d.cond {
                Some(c) => self.eval(c),
                None => Tristate::Yes,
            };
            if cond == Tristate::No {
                continue;
            }
            if let RuleExpr::Symbol(v) = self.rules.get(d.value) {
                return Some(self.string_value(v));
            }
        }
        None
    }

    fn recalc(&mut self, id: FeatureId) {
        let f = self.feature(id);
        if f.is_const {
            return;
        }

        if f.is_choice {
            // a visible choice is on unless it is optional
            let vis = self.visibility(id);
            let optional = f.choice_optional;
            let is_bool = f.ftype == FeatureType::Bool;
            let mut val = if optional {
                std::cmp::min(f.user_tri.unwrap_or(Tristate::No), vis)
            } else {
                vis
            };
            if val == Tristate::Mod && (is_bool || !self.modules_enabled()) {
                val = Tristate::Yes;
            }
            self.feature_mut(id).cur_tri = val;
            return;
        }

        match f.ftype {
            FeatureType::Bool | FeatureType::Tristate => {
                let is_bool = f.ftype == FeatureType::Bool;
                let vis = self.visibility(id);
                let rev = match self.feature(id).rev_dep {
                    Some(r) => self.eval(r),
                    None => Tristate::No,
                };

                let base = match (vis != Tristate::No, self.feature(id).user_tri) {
                    (true, Some(user)) => std::cmp::min(user, vis),
                    _ => self.default_tri(id),
                };

                let mut val = std::cmp::max(base, rev);
                if val == Tristate::Mod && (is_bool || !self.modules_enabled()) {
                    val = Tristate::Yes;
                }
                self.feature_mut(id).cur_tri = val;
            }
            FeatureType::Int | FeatureType::Hex | FeatureType::String => {
                let val = match self.feature(id).user_str.clone() {
                    Some(user) => Some(user),
                    None => self.default_str(id),
                };
                self.feature_mut(id).cur_str = val;
            }
            FeatureType::Unknown => {}
        }
    }

    /// Recompute every feature's effective value to a fixed point.
    ///
    /// Values feed into each other through dependencies and selectors, so a
    /// bounded number of passes is run until nothing changes.
    pub fn recalc_all(&mut self) {
        for pass in 0..8 {
            let before: Vec<(Tristate, Option<String>)> = self
                .features
                .iter()
                .map(|f| (f.cur_tri, f.cur_str.clone()))
                .collect();

            for id in self.ids().collect::<Vec<_>>() {
                self.recalc(id);
            }

            let stable = self
                .features
                .iter()
                .zip(before.iter())
                .all(|(f, b)| f.cur_tri == b.0 && f.cur_str == b.1);
            if stable {
                log::trace!(target: targets::MODEL, "values stable after {} passes", pass + 1);
                return;
            }
        }
        log::warn!(target: targets::MODEL, "value recalculation did not stabilise");
    }

    /* mutation */

    /// Whether `val` can be set on a boolean/tristate feature right now.
    pub fn tristate_within_range(&self, id: FeatureId, val: Tristate) -> bool {
        if !self.is_boolean(id) {
            return false;
        }
        let f = self.feature(id);
        let mut val = val;
        if val == Tristate::Mod && (f.ftype == FeatureType::Bool || !self.modules_enabled()) {
            val = Tristate::Yes;
        }
        if f.ftype == FeatureType::Bool && val == Tristate::Mod {
            return false;
        }

        let vis = self.visibility(id);
        if vis == Tristate::No && !self.is_choice_member(id) {
            return false;
        }
        let rev = match f.rev_dep {
            Some(r) => self.eval(r),
            None => Tristate::No,
        };

        // a choice member cannot go to yes past a sibling already at yes
        if val == Tristate::Yes {
            if let Some(group) = f.choice_group {
                let blocked = self
                    .feature(group)
                    .choice_members
                    .iter()
                    .any(|m| *m != id && self.tristate_value(*m) == Tristate::Yes);
                if blocked {
                    return false;
                }
            }
        }

        val >= rev && val <= std::cmp::max(vis, rev)
    }

    /// Set a boolean/tristate feature; reports whether the value was taken.
    pub fn set_tristate(&mut self, id: FeatureId, val: Tristate) -> bool {
        if !self.tristate_within_range(id, val) {
            log::debug!(
                target: targets::MODEL,
                "{} = {} rejected (out of range)",
                self.display_name(id),
                val
            );
            return false;
        }
        self.feature_mut(id).user_tri = Some(val);
        self.recalc_all();
        true
    }

    /// Whether `val` is a well-formed, in-range value for a non-boolean.
    pub fn string_within_range(&self, id: FeatureId, val: &str) -> bool {
        let f = self.feature(id);
        let base = match f.ftype {
            FeatureType::Int => {
                let body = val.strip_prefix('-').unwrap_or(val);
                if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
                    return false;
                }
                10
            }
            FeatureType::Hex => {
                let body = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")).unwrap_or(val);
                if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
                    return false;
                }
                16
            }
            FeatureType::String => return true,
            _ => return false,
        };

        let n = parse_prefix_int(val, base);
        for range in &self.feature(id).ranges {
            let active = match range.cond {
                Some(c) => self.eval(c) != Tristate::No,
                None => true,
            };
            if !active {
                continue;
            }
            let lo = parse_prefix_int(&self.string_value(range.lo), base);
            let hi = parse_prefix_int(&self.string_value(range.hi), base);
            return n >= lo && n <= hi;
        }
        true
    }

    /// Set a non-boolean feature (or a boolean via `y`/`m`/`n`); reports
    /// whether the value was taken.
    pub fn set_string(&mut self, id: FeatureId, val: &str) -> bool {
        if self.is_boolean(id) {
            return match Tristate::from_str(val) {
                Some(tri) => self.set_tristate(id, tri),
                None => false,
            };
        }
        if !self.is_nonboolean(id) || !self.string_within_range(id, val) {
            log::debug!(
                target: targets::MODEL,
                "{} = {:?} rejected (out of range)",
                self.display_name(id),
                val
            );
            return false;
        }
        self.feature_mut(id).user_str = Some(val.to_string());
        self.recalc_all();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_int_parses_like_strtoll() {
        assert_eq!(parse_prefix_int("10", 10), 10);
        assert_eq!(parse_prefix_int("-3", 10), -3);
        assert_eq!(parse_prefix_int("0x1f", 16), 31);
        assert_eq!(parse_prefix_int("1f", 16), 31);
        assert_eq!(parse_prefix_int("n", 10), 0);
        assert_eq!(parse_prefix_int("", 10), 0);
        assert_eq!(parse_prefix_int("12abc", 10), 12);
    }

    #[test]
    fn tristate_ordering_and_flip() {
        assert!(Tristate::No < Tristate::Mod && Tristate::Mod < Tristate::Yes);
        assert_eq!(Tristate::No.flip(), Tristate::Yes);
        assert_eq!(Tristate::Mod.flip(), Tristate::Mod);
    }

    #[test]
    fn and_is_min_or_is_max() {
        let mut model = FeatureModel::new();
        let a = model.lookup("A");
        let b = model.lookup("B");
        model.feature_mut(a).ftype = FeatureType::Tristate;
        model.feature_mut(b).ftype = FeatureType::Tristate;
        model.feature_mut(a).cur_tri = Tristate::Mod;
        model.feature_mut(b).cur_tri = Tristate::Yes;

        let ea = model.rules.symbol(a);
        let eb = model.rules.symbol(b);
        let and = model.rules.and(ea, eb);
        let or = model.rules.or(ea, eb);
        let not = model.rules.not(ea);

        assert_eq!(model.eval(and), Tristate::Mod);
        assert_eq!(model.eval(or), Tristate::Yes);
        assert_eq!(model.eval(not), Tristate::Mod);
    }
}
