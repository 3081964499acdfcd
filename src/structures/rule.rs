/*!
Rule expressions.

A rule expression is a tree over feature references: the dependency,
visibility, default, and selector conditions of the model are all rule
expressions. Nodes live in a [RuleArena] and reference each other — and
features — by index, so cyclic selector graphs need no cyclic data
structures.

Comparisons other than (in)equality are only meaningfully supported between
an integer-valued feature and a literal; the translation layer evaluates a
narrow whitelist and treats everything else as constant false.
*/

use crate::structures::feature::FeatureId;

/// Index of a rule expression in its [RuleArena].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExprId(pub u32);

/// A node of a rule expression tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleExpr {
    /// A reference to a feature or constant.
    Symbol(FeatureId),

    And(ExprId, ExprId),

    Or(ExprId, ExprId),

    Not(ExprId),

    /// `l = r` on the features' values.
    Equal(FeatureId, FeatureId),

    /// `l != r` on the features' values.
    Unequal(FeatureId, FeatureId),

    Lth(FeatureId, FeatureId),

    Leq(FeatureId, FeatureId),

    Gth(FeatureId, FeatureId),

    Geq(FeatureId, FeatureId),
}

/// Append-only store of rule expression nodes.
#[derive(Debug, Default)]
pub struct RuleArena {
    nodes: Vec<RuleExpr>,
}

impl RuleArena {
    pub fn push(&mut self, node: RuleExpr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: ExprId) -> RuleExpr {
        self.nodes[id.0 as usize]
    }

    pub fn symbol(&mut self, f: FeatureId) -> ExprId {
        self.push(RuleExpr::Symbol(f))
    }

    pub fn and(&mut self, l: ExprId, r: ExprId) -> ExprId {
        self.push(RuleExpr::And(l, r))
    }

    pub fn or(&mut self, l: ExprId, r: ExprId) -> ExprId {
        self.push(RuleExpr::Or(l, r))
    }

    pub fn not(&mut self, e: ExprId) -> ExprId {
        self.push(RuleExpr::Not(e))
    }
}
