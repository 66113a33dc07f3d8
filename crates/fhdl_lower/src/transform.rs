//! Shared machinery for expression-rewriting lowerers.
//!
//! A [`Lowerer`] rewrites expressions top-down. While a statement is being
//! rewritten it may queue statements to run right after it
//! ([`extra_stmts`](Lowerer::extra_stmts)) or combinational statements for
//! the whole fragment ([`comb`](Lowerer::comb)).

use crate::error::LowerError;
use fhdl_ir::{Constant, Design, Expr, Fragment, IoDirection, Statement};

pub(crate) trait Lowerer {
    /// Rewrites one expression. `target` is set for assignment targets.
    fn lower_expr(&mut self, design: &mut Design, expr: Expr, target: bool) -> Result<Expr, LowerError>;

    fn extra_stmts(&mut self) -> &mut Vec<Statement>;

    fn comb(&mut self) -> &mut Vec<Statement>;

    /// Rewrites `target <- value`, followed by any statements the rewrite queued.
    fn lower_assign(
        &mut self,
        design: &mut Design,
        target: Expr,
        value: Expr,
    ) -> Result<Vec<Statement>, LowerError> {
        let saved = std::mem::take(self.extra_stmts());
        let target = self.lower_expr(design, target, true)?;
        let value = self.lower_expr(design, value, false)?;
        let extra = std::mem::replace(self.extra_stmts(), saved);
        let mut out = Vec::with_capacity(1 + extra.len());
        out.push(Statement::Assign { target, value });
        out.extend(extra);
        Ok(out)
    }

    fn lower_stmts(&mut self, design: &mut Design, stmts: Vec<Statement>) -> Result<Vec<Statement>, LowerError> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Statement::Assign { target, value } => out.extend(self.lower_assign(design, target, value)?),
                Statement::If {
                    condition,
                    then_body,
                    else_body,
                } => out.push(Statement::If {
                    condition: self.lower_expr(design, condition, false)?,
                    then_body: self.lower_stmts(design, then_body)?,
                    else_body: self.lower_stmts(design, else_body)?,
                }),
                Statement::Case { test, mut arms } => {
                    let test = self.lower_expr(design, test, false)?;
                    for arm in &mut arms {
                        arm.body = self.lower_stmts(design, std::mem::take(&mut arm.body))?;
                    }
                    out.push(Statement::Case { test, arms });
                }
            }
        }
        Ok(out)
    }
}

/// Rebuilds `expr` with every direct child passed through `f`.
///
/// Slice, part and concatenation operands and array choices inherit the
/// target flag; every other child is read.
pub(crate) fn map_children(
    expr: Expr,
    target: bool,
    f: &mut impl FnMut(Expr, bool) -> Result<Expr, LowerError>,
) -> Result<Expr, LowerError> {
    Ok(match expr {
        leaf @ (Expr::Const(_) | Expr::Signal(_) | Expr::ClockSignal(_) | Expr::ResetSignal { .. }) => leaf,
        Expr::Unary { op, operand } => Expr::Unary {
            op,
            operand: Box::new(f(*operand, false)?),
        },
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op,
            lhs: Box::new(f(*lhs, false)?),
            rhs: Box::new(f(*rhs, false)?),
        },
        Expr::Mux {
            select,
            on_true,
            on_false,
        } => Expr::Mux {
            select: Box::new(f(*select, false)?),
            on_true: Box::new(f(*on_true, false)?),
            on_false: Box::new(f(*on_false, false)?),
        },
        Expr::Slice { value, start, stop } => Expr::Slice {
            value: Box::new(f(*value, target)?),
            start,
            stop,
        },
        Expr::Part { value, offset, width } => Expr::Part {
            value: Box::new(f(*value, target)?),
            offset: Box::new(f(*offset, false)?),
            width,
        },
        Expr::Cat(items) => Expr::Cat(items.into_iter().map(|e| f(e, target)).collect::<Result<_, _>>()?),
        Expr::Replicate { value, count } => Expr::Replicate {
            value: Box::new(f(*value, false)?),
            count,
        },
        Expr::ArrayProxy { choices, key } => Expr::ArrayProxy {
            choices: choices.into_iter().map(|e| f(e, target)).collect::<Result<_, _>>()?,
            key: Box::new(f(*key, false)?),
        },
    })
}

/// Runs `lowerer` over every statement and special expression of `fragment`.
///
/// Outputs of specials are rewritten as targets; bidirectional connections
/// are left alone. Queued combinational statements are appended to the
/// fragment.
pub(crate) fn apply_lowerer<L: Lowerer>(
    lowerer: &mut L,
    design: &mut Design,
    fragment: &mut Fragment,
) -> Result<(), LowerError> {
    let comb = std::mem::take(&mut fragment.comb);
    fragment.comb = lowerer.lower_stmts(design, comb)?;
    for stmts in fragment.sync.values_mut() {
        let taken = std::mem::take(stmts);
        *stmts = lowerer.lower_stmts(design, taken)?;
    }
    fragment.comb.append(lowerer.comb());

    fragment.specials.sort_by_key(|s| s.sequence);
    for special in &mut fragment.specials {
        for (slot, direction) in special.expressions_mut() {
            if direction == IoDirection::InOut {
                continue;
            }
            let saved = std::mem::take(lowerer.extra_stmts());
            let expr = std::mem::replace(slot, Expr::Const(Constant::new(0)));
            *slot = lowerer.lower_expr(design, expr, direction == IoDirection::Output)?;
            fragment.comb.append(lowerer.comb());
            let extra = std::mem::replace(lowerer.extra_stmts(), saved);
            fragment.comb.extend(extra);
        }
    }
    Ok(())
}
