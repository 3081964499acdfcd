/*!
A line-oriented parser for the Kconfig subset the resolver consumes.

Supported entries: `config`, `menuconfig`, `choice`/`endchoice` (with
`optional`), the type lines `bool`/`tristate`/`string`/`hex`/`int` with an
optional inline prompt, `prompt`, `depends on`, `select`, `imply`,
`default`/`def_bool`/`def_tristate`, `range`, `option modules`, and
`if`/`endif` blocks whose conditions fold into the dependencies of the
entries they enclose. `menu`, `endmenu`, `comment`, `source`, `mainmenu`,
and `visible if` are tolerated and skipped; `help` blocks are consumed by
indentation.

Expressions use the Kconfig grammar: `!` over `&&` over `||`, comparisons
between two symbols, parentheses, quoted constants. Reverse dependencies are
accumulated onto the *selected* feature from every `select` site, weak
reverse dependencies from every `imply` site.

As in the original frontend, a prompt's effective visibility includes the
entry's dependencies; they are folded into the prompt condition when an
entry's block ends.
*/

use crate::misc::log::targets;
use crate::structures::feature::{
    DefaultProp, FeatureId, FeatureModel, FeatureType, Prompt, RangeProp, SelectProp,
};
use crate::structures::rule::ExprId;
use crate::types::err::{ErrorKind, LoadError};

/// Parse a feature model from a file.
pub fn parse_file(path: &std::path::Path) -> Result<FeatureModel, ErrorKind> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
    parse_str(&source)
}

/// Parse a feature model from source text.
pub fn parse_str(source: &str) -> Result<FeatureModel, ErrorKind> {
    let mut parser = Parser {
        model: FeatureModel::new(),
        cur: None,
        cur_choice: None,
        if_stack: Vec::new(),
        help_indent: None,
    };

    for (index, raw) in source.lines().enumerate() {
        parser.line(index + 1, raw)?;
    }

    if !parser.if_stack.is_empty() {
        return Err(LoadError::UnclosedBlock("if").into());
    }
    if parser.cur_choice.is_some() {
        return Err(LoadError::UnclosedBlock("choice").into());
    }

    parser.finalize_current();
    let mut model = parser.model;

    // without an explicit `option modules`, a MODULES feature takes the role
    if model.modules.is_none() {
        if let Some(id) = model.feature_by_name("MODULES") {
            if model.is_boolean(id) {
                model.modules = Some(id);
            }
        }
    }

    model.recalc_all();
    Ok(model)
}

struct Parser {
    model: FeatureModel,
    /// The entry attribute lines currently apply to; `None` swallows them.
    cur: Option<FeatureId>,
    cur_choice: Option<FeatureId>,
    if_stack: Vec<ExprId>,
    /// Indentation of an open help block.
    help_indent: Option<usize>,
}

impl Parser {
    fn line(&mut self, number: usize, raw: &str) -> Result<(), ErrorKind> {
        // help text runs until the indentation drops back
        if let Some(indent) = self.help_indent {
            if raw.trim().is_empty() || leading_whitespace(raw) >= indent {
                return Ok(());
            }
            self.help_indent = None;
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let mut toks = tokenize(line).map_err(|msg| LoadError::Line(number, msg))?;

        let keyword = match toks.first() {
            Some(Tok::Ident(word)) => word.clone(),
            _ => return Err(LoadError::Line(number, "expected a keyword".into()).into()),
        };
        toks.remove(0);
        let mut toks = TokStream::new(toks, number);

        match keyword.as_str() {
            "config" | "menuconfig" => {
                self.finalize_current();
                let name = toks.ident()?;
                let id = self.model.lookup(&name);
                self.cur = Some(id);
                self.enter_entry(id);
            }
            "choice" => {
                self.finalize_current();
                let id = self.model.new_choice();
                self.cur = Some(id);
                self.cur_choice = Some(id);
                self.enter_entry(id);
            }
            "endchoice" => {
                self.finalize_current();
                if self.cur_choice.take().is_none() {
                    return Err(LoadError::StrayBlockEnd("endchoice").into());
                }
                self.cur = None;
            }
            "if" => {
                let cond = self.expr(&mut toks)?;
                self.if_stack.push(cond);
            }
            "endif" => {
                if self.if_stack.pop().is_none() {
                    return Err(LoadError::StrayBlockEnd("endif").into());
                }
            }
            "menu" | "endmenu" | "mainmenu" | "source" | "comment" | "visible" => {
                // structural entries the resolver has no use for; attribute
                // lines below a menu or comment are swallowed
                if keyword == "menu" || keyword == "comment" {
                    self.finalize_current();
                    self.cur = None;
                }
            }
            "help" | "---help---" => {
                self.help_indent = Some(leading_whitespace(raw) + 1);
            }
            "bool" | "boolean" | "tristate" | "string" | "hex" | "int" => {
                let ftype = match keyword.as_str() {
                    "bool" | "boolean" => FeatureType::Bool,
                    "tristate" => FeatureType::Tristate,
                    "string" => FeatureType::String,
                    "hex" => FeatureType::Hex,
                    _ => FeatureType::Int,
                };
                let prompt = toks.opt_string();
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    self.model.feature_mut(id).ftype = ftype;
                    if let Some(text) = prompt {
                        self.model.feature_mut(id).prompt = Some(Prompt { text, cond });
                    }
                }
            }
            "def_bool" | "def_tristate" => {
                let value = self.expr(&mut toks)?;
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    self.model.feature_mut(id).ftype = if keyword == "def_bool" {
                        FeatureType::Bool
                    } else {
                        FeatureType::Tristate
                    };
                    let cond = self.guard(cond);
                    self.model
                        .feature_mut(id)
                        .defaults
                        .push(DefaultProp { value, cond });
                }
            }
            "prompt" => {
                let text = toks
                    .opt_string()
                    .ok_or(LoadError::Line(number, "prompt needs a string".into()))?;
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    self.model.feature_mut(id).prompt = Some(Prompt { text, cond });
                }
            }
            "default" => {
                let value = self.expr(&mut toks)?;
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    let cond = self.guard(cond);
                    self.model
                        .feature_mut(id)
                        .defaults
                        .push(DefaultProp { value, cond });
                }
            }
            "depends" => {
                toks.keyword("on")?;
                let dep = self.expr(&mut toks)?;
                if let Some(id) = self.cur {
                    self.and_into_dir_dep(id, dep);
                }
            }
            "select" | "imply" => {
                let target_name = toks.ident()?;
                let target = self.model.lookup(&target_name);
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    let cond = self.guard(cond);
                    let prop = SelectProp { target, cond };

                    // the reverse dependency accumulates on the target
                    let mut trigger = self.model.rules.symbol(id);
                    if let Some(c) = cond {
                        trigger = self.model.rules.and(trigger, c);
                    }

                    if keyword == "select" {
                        self.model.feature_mut(id).selects.push(prop);
                        let rev = match self.model.feature(target).rev_dep {
                            Some(existing) => self.model.rules.or(existing, trigger),
                            None => trigger,
                        };
                        self.model.feature_mut(target).rev_dep = Some(rev);
                    } else {
                        self.model.feature_mut(id).implies.push(prop);
                        let implied = match self.model.feature(target).implied {
                            Some(existing) => self.model.rules.or(existing, trigger),
                            None => trigger,
                        };
                        self.model.feature_mut(target).implied = Some(implied);
                    }
                }
            }
            "range" => {
                let lo_name = toks.ident()?;
                let hi_name = toks.ident()?;
                let lo = self.model.lookup(&lo_name);
                let hi = self.model.lookup(&hi_name);
                let cond = self.opt_if(&mut toks)?;
                if let Some(id) = self.cur {
                    let cond = self.guard(cond);
                    self.model
                        .feature_mut(id)
                        .ranges
                        .push(RangeProp { lo, hi, cond });
                }
            }
            "option" => {
                let word = toks.opt_ident();
                if word.as_deref() == Some("modules") {
                    self.model.modules = self.cur;
                }
            }
            "optional" => {
                if let Some(id) = self.cur_choice {
                    self.model.feature_mut(id).choice_optional = true;
                }
            }
            other => {
                log::debug!(target: targets::LOADER, "line {number}: skipping `{other}`");
            }
        }

        Ok(())
    }

    /// A new `config`/`choice` entry: fold the `if` stack into its
    /// dependencies, record choice membership.
    fn enter_entry(&mut self, id: FeatureId) {
        for cond in self.if_stack.clone() {
            self.and_into_dir_dep(id, cond);
        }

        if let Some(choice) = self.cur_choice {
            if choice != id && !self.model.feature(choice).choice_members.contains(&id) {
                self.model.feature_mut(choice).choice_members.push(id);
                self.model.feature_mut(id).choice_group = Some(choice);
            }
        }
    }

    /// Block end: a prompt's effective visibility includes the entry's
    /// dependencies.
    fn finalize_current(&mut self) {
        let Some(id) = self.cur.take() else {
            return;
        };
        let Some(dep) = self.model.feature(id).dir_dep else {
            return;
        };
        let Some(prompt) = self.model.feature(id).prompt.clone() else {
            return;
        };

        let cond = match prompt.cond {
            Some(c) => self.model.rules.and(c, dep),
            None => dep,
        };
        self.model.feature_mut(id).prompt = Some(Prompt {
            text: prompt.text,
            cond: Some(cond),
        });
    }

    fn and_into_dir_dep(&mut self, id: FeatureId, dep: ExprId) {
        let combined = match self.model.feature(id).dir_dep {
            Some(existing) => self.model.rules.and(existing, dep),
            None => dep,
        };
        self.model.feature_mut(id).dir_dep = Some(combined);
    }

    /// A property condition under open `if` blocks carries them too.
    fn guard(&mut self, cond: Option<ExprId>) -> Option<ExprId> {
        let mut acc = cond;
        for outer in self.if_stack.clone() {
            acc = Some(match acc {
                Some(c) => self.model.rules.and(c, outer),
                None => outer,
            });
        }
        acc
    }

    fn opt_if(&mut self, toks: &mut TokStream) -> Result<Option<ExprId>, ErrorKind> {
        if toks.eat_if() {
            Ok(Some(self.expr(toks)?))
        } else {
            toks.expect_end()?;
            Ok(None)
        }
    }

    /* expression parsing: ! over && over ||, comparisons on symbols */

    fn expr(&mut self, toks: &mut TokStream) -> Result<ExprId, ErrorKind> {
        let mut left = self.and_expr(toks)?;
        while toks.eat(&Tok::OrOr) {
            let right = self.and_expr(toks)?;
            left = self.model.rules.or(left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self, toks: &mut TokStream) -> Result<ExprId, ErrorKind> {
        let mut left = self.not_expr(toks)?;
        while toks.eat(&Tok::AndAnd) {
            let right = self.not_expr(toks)?;
            left = self.model.rules.and(left, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self, toks: &mut TokStream) -> Result<ExprId, ErrorKind> {
        if toks.eat(&Tok::Not) {
            let inner = self.not_expr(toks)?;
            return Ok(self.model.rules.not(inner));
        }
        self.cmp_expr(toks)
    }

    fn cmp_expr(&mut self, toks: &mut TokStream) -> Result<ExprId, ErrorKind> {
        if toks.eat(&Tok::LParen) {
            let inner = self.expr(toks)?;
            toks.expect(&Tok::RParen)?;
            return Ok(inner);
        }

        let left = self.symbol(toks)?;

        let op = match toks.peek() {
            Some(Tok::Eq) => Some(Tok::Eq),
            Some(Tok::Neq) => Some(Tok::Neq),
            Some(Tok::Lt) => Some(Tok::Lt),
            Some(Tok::Le) => Some(Tok::Le),
            Some(Tok::Gt) => Some(Tok::Gt),
            Some(Tok::Ge) => Some(Tok::Ge),
            _ => None,
        };

        let Some(op) = op else {
            return Ok(self.model.rules.symbol(left));
        };
        toks.next();

        let right = self.symbol(toks)?;
        let node = match op {
            Tok::Eq => crate::structures::rule::RuleExpr::Equal(left, right),
            Tok::Neq => crate::structures::rule::RuleExpr::Unequal(left, right),
            Tok::Lt => crate::structures::rule::RuleExpr::Lth(left, right),
            Tok::Le => crate::structures::rule::RuleExpr::Leq(left, right),
            Tok::Gt => crate::structures::rule::RuleExpr::Gth(left, right),
            _ => crate::structures::rule::RuleExpr::Geq(left, right),
        };
        Ok(self.model.rules.push(node))
    }

    fn symbol(&mut self, toks: &mut TokStream) -> Result<FeatureId, ErrorKind> {
        match toks.next() {
            Some(Tok::Ident(word)) => Ok(self.model.lookup(&word)),
            Some(Tok::Str(value)) => Ok(self.model.lookup_const(&value)),
            _ => Err(LoadError::Expression(toks.line, "expected a symbol".into()).into()),
        }
    }
}

fn leading_whitespace(s: &str) -> usize {
    s.chars().take_while(|c| c.is_whitespace()).count()
}

/* tokens */

#[derive(Clone, Debug, Eq, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    If,
    AndAnd,
    OrOr,
    Not,
    LParen,
    RParen,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '/'
}

fn tokenize(line: &str) -> Result<Vec<Tok>, String> {
    let mut toks = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '"' | '\'' => {
                let mut value = String::new();
                let mut closed = false;
                while let Some(d) = chars.next() {
                    if d == '\\' {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    } else if d == c {
                        closed = true;
                        break;
                    } else {
                        value.push(d);
                    }
                }
                if !closed {
                    return Err("unterminated string".into());
                }
                toks.push(Tok::Str(value));
            }
            '&' => match chars.next() {
                Some('&') => toks.push(Tok::AndAnd),
                _ => return Err("expected `&&`".into()),
            },
            '|' => match chars.next() {
                Some('|') => toks.push(Tok::OrOr),
                _ => return Err("expected `||`".into()),
            },
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    toks.push(Tok::Neq);
                } else {
                    toks.push(Tok::Not);
                }
            }
            '=' => toks.push(Tok::Eq),
            '<' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    toks.push(Tok::Le);
                } else {
                    toks.push(Tok::Lt);
                }
            }
            '>' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    toks.push(Tok::Ge);
                } else {
                    toks.push(Tok::Gt);
                }
            }
            '(' => toks.push(Tok::LParen),
            ')' => toks.push(Tok::RParen),
            _ if is_word_char(c) => {
                let mut word = String::new();
                word.push(c);
                while let Some(d) = chars.peek() {
                    if is_word_char(*d) {
                        word.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if word == "if" {
                    toks.push(Tok::If);
                } else {
                    toks.push(Tok::Ident(word));
                }
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }

    Ok(toks)
}

struct TokStream {
    toks: Vec<Tok>,
    pos: usize,
    line: usize,
}

impl TokStream {
    fn new(toks: Vec<Tok>, line: usize) -> Self {
        TokStream { toks, pos: 0, line }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_if(&mut self) -> bool {
        self.eat(&Tok::If)
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), ErrorKind> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(LoadError::Expression(self.line, format!("expected {tok:?}")).into())
        }
    }

    fn expect_end(&self) -> Result<(), ErrorKind> {
        if self.pos == self.toks.len() {
            Ok(())
        } else {
            Err(LoadError::Expression(self.line, "trailing tokens".into()).into())
        }
    }

    fn ident(&mut self) -> Result<String, ErrorKind> {
        match self.next() {
            Some(Tok::Ident(word)) => Ok(word),
            _ => Err(LoadError::Line(self.line, "expected a name".into()).into()),
        }
    }

    fn keyword(&mut self, word: &str) -> Result<(), ErrorKind> {
        match self.next() {
            Some(Tok::Ident(w)) if w == word => Ok(()),
            _ => Err(LoadError::Line(self.line, format!("expected `{word}`")).into()),
        }
    }

    fn opt_ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Tok::Ident(_)) => match self.next() {
                Some(Tok::Ident(word)) => Some(word),
                _ => None,
            },
            _ => None,
        }
    }

    fn opt_string(&mut self) -> Option<String> {
        match self.peek() {
            Some(Tok::Str(_)) => match self.next() {
                Some(Tok::Str(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::feature::Tristate;

    #[test]
    fn a_small_model_parses() {
        let model = parse_str(
            "
config MODULES
\tbool \"modules\"
\tdefault y

config A
\ttristate \"feature a\"
\tdepends on MODULES

config B
\tbool \"feature b\"
\tselect A if MODULES
",
        )
        .unwrap();

        let a = model.feature_by_name("A").unwrap();
        let b = model.feature_by_name("B").unwrap();
        assert_eq!(model.feature(a).ftype, FeatureType::Tristate);
        assert_eq!(model.feature(b).ftype, FeatureType::Bool);
        assert!(model.feature(a).rev_dep.is_some());
        assert_eq!(model.feature(b).selects.len(), 1);
        assert_eq!(model.modules, model.feature_by_name("MODULES"));
    }

    #[test]
    fn if_blocks_fold_into_dependencies() {
        let model = parse_str(
            "
config GATE
\tbool \"gate\"

if GATE
config INNER
\tbool \"inner\"
endif
",
        )
        .unwrap();

        let inner = model.feature_by_name("INNER").unwrap();
        let dep = model.feature(inner).dir_dep.expect("if fold");
        // gate defaults off, so the inner prompt is invisible
        assert_eq!(model.eval(dep), Tristate::No);
        assert_eq!(model.visibility(inner), Tristate::No);
    }

    #[test]
    fn choices_collect_members() {
        let model = parse_str(
            "
choice
\tprompt \"pick one\"

config X
\tbool \"x\"

config Y
\tbool \"y\"

endchoice
",
        )
        .unwrap();

        let x = model.feature_by_name("X").unwrap();
        let group = model.feature(x).choice_group.expect("membership");
        assert!(model.is_choice(group));
        assert_eq!(model.feature(group).choice_members.len(), 2);
        // a visible non-optional choice is on
        assert_eq!(model.tristate_value(group), Tristate::Yes);
    }

    #[test]
    fn expressions_respect_precedence() {
        let model = parse_str(
            "
config A
\tbool \"a\"
\tdefault y

config B
\tbool \"b\"

config C
\tbool \"c\"
\tdefault y

config D
\tbool \"d\"
\tdepends on A && B || C
",
        )
        .unwrap();

        // && binds tighter than ||, so the dependency holds through C
        let d = model.feature_by_name("D").unwrap();
        let dep = model.feature(d).dir_dep.unwrap();
        assert_eq!(model.eval(dep), Tristate::Yes);
    }

    #[test]
    fn unbalanced_blocks_are_rejected() {
        assert!(parse_str("if A\n").is_err());
        assert!(parse_str("endif\n").is_err());
        assert!(parse_str("endchoice\n").is_err());
    }
}
