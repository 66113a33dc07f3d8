//! Slices and parts of anything but a plain signal.
//!
//! Verilog can only select bits of a named net, so `(a + b)[3:1]` becomes a
//! fresh signal driven by `a + b` and sliced instead. In a target the
//! assignment is reversed: the proxy is written and drives the original
//! expression.

use crate::error::LowerError;
use crate::transform::{apply_lowerer, map_children, Lowerer};
use fhdl_ir::{Design, Expr, Fragment, SignalSpec, Statement};

#[derive(Default)]
struct ComplexSliceLowerer {
    extra: Vec<Statement>,
    comb: Vec<Statement>,
    introduced: usize,
}

impl ComplexSliceLowerer {
    fn proxy(&mut self, design: &mut Design, value: Expr, target: bool) -> Result<Expr, LowerError> {
        let proxy = design.signal_for(&value, SignalSpec::new(1).named("slice_proxy"))?;
        self.introduced += 1;
        let stmts = if target {
            self.lower_assign(design, value, proxy.into())?
        } else {
            self.lower_assign(design, proxy.into(), value)?
        };
        self.comb.extend(stmts);
        Ok(Expr::Signal(proxy))
    }
}

impl Lowerer for ComplexSliceLowerer {
    fn lower_expr(&mut self, design: &mut Design, expr: Expr, target: bool) -> Result<Expr, LowerError> {
        let expr = match expr {
            Expr::Slice { value, start, stop } if !matches!(*value, Expr::Signal(_)) => Expr::Slice {
                value: Box::new(self.proxy(design, *value, target)?),
                start,
                stop,
            },
            Expr::Part { value, offset, width } if !matches!(*value, Expr::Signal(_)) => Expr::Part {
                value: Box::new(self.proxy(design, *value, target)?),
                offset,
                width,
            },
            other => other,
        };
        map_children(expr, target, &mut |e, t| self.lower_expr(design, e, t))
    }

    fn extra_stmts(&mut self) -> &mut Vec<Statement> {
        &mut self.extra
    }

    fn comb(&mut self) -> &mut Vec<Statement> {
        &mut self.comb
    }
}

/// Replaces every slice or part of a non-signal with a slice of a proxy
/// signal. Returns the number of proxies introduced; a second run on the
/// result introduces none.
pub fn lower_complex_slices(design: &mut Design, fragment: &mut Fragment) -> Result<usize, LowerError> {
    let mut lowerer = ComplexSliceLowerer::default();
    design.enter_scope("complexslicelowerer");
    let result = apply_lowerer(&mut lowerer, design, fragment);
    design.exit_scope();
    result?;
    Ok(lowerer.introduced)
}
