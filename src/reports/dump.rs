/*!
Debug artefacts: the constraint listing and the DIMACS dump.

Neither is a binary-format contract. The constraint listing holds one infix
pexpr per line; the DIMACS dump carries a `c <var> <name>` comment line per
atom ahead of the standard `p cnf` header, so cores and models read back in
solver tooling can be mapped to feature aspects.
*/

use std::io::{self, Write};

use crate::context::ResolveContext;
use crate::structures::pexpr::{Pexpr, PexprId, PexprPool};

/// Render a pexpr infix, parenthesising only on operator changes.
fn render_pexpr(
    ctx: &ResolveContext,
    pool: &PexprPool,
    e: PexprId,
    parent: Option<&'static str>,
    out: &mut String,
) {
    match pool.get(e) {
        Pexpr::Atom(a) => out.push_str(&ctx.atoms.atom(a).name),
        Pexpr::Not(inner) => {
            out.push('!');
            render_pexpr(ctx, pool, inner, Some("!"), out);
        }
        Pexpr::And(l, r) => {
            let wrap = parent != Some("&&");
            if wrap {
                out.push('(');
            }
            render_pexpr(ctx, pool, l, Some("&&"), out);
            out.push_str(" && ");
            render_pexpr(ctx, pool, r, Some("&&"), out);
            if wrap {
                out.push(')');
            }
        }
        Pexpr::Or(l, r) => {
            let wrap = parent != Some("||");
            if wrap {
                out.push('(');
            }
            render_pexpr(ctx, pool, l, Some("||"), out);
            out.push_str(" || ");
            render_pexpr(ctx, pool, r, Some("||"), out);
            if wrap {
                out.push(')');
            }
        }
    }
}

/// One constraint per line, in feature order.
pub fn write_constraints(ctx: &ResolveContext, w: &mut impl Write) -> io::Result<()> {
    for id in ctx.model.ids() {
        for constraint in ctx.constraints_of(id) {
            let mut line = String::new();
            render_pexpr(ctx, &ctx.pool, *constraint, None, &mut line);
            writeln!(w, "{line}")?;
        }
    }
    Ok(())
}

/// The CNF in DIMACS, preceded by a variable-name preamble.
pub fn write_dimacs(ctx: &ResolveContext, w: &mut impl Write) -> io::Result<()> {
    for id in ctx.atoms.ids() {
        writeln!(w, "c {} {}", id.0, ctx.atoms.atom(id).name)?;
    }

    writeln!(w, "p cnf {} {}", ctx.atoms.var_count(), ctx.clauses.len())?;
    for clause in ctx.clauses.iter() {
        for lit in clause {
            write!(w, "{lit} ")?;
        }
        writeln!(w, "0")?;
    }
    Ok(())
}
