//! Arrays and clock/reset references.
//!
//! An array read becomes a variable signal assigned by a `case` on the key;
//! an array write becomes a `case` assigning the selected choice. Both make
//! the highest index the default arm, so out-of-range keys select the last
//! element. Clock and reset references are replaced by the signals of the
//! named domain.

use crate::error::LowerError;
use crate::transform::{apply_lowerer, map_children, Lowerer};
use fhdl_ir::{Case, ClockDomain, Constant, Design, Expr, Fragment, SignalSpec, Statement};

struct BasicLowerer<'a> {
    domains: &'a [ClockDomain],
    extra: Vec<Statement>,
    comb: Vec<Statement>,
    arrays: usize,
}

impl BasicLowerer<'_> {
    fn domain(&self, name: &str) -> Result<&ClockDomain, LowerError> {
        self.domains
            .iter()
            .find(|cd| cd.name == name)
            .ok_or_else(|| LowerError::UnresolvedClockDomain {
                domain: name.to_string(),
                available: sorted_names(self.domains),
            })
    }

    fn lower_array(&mut self, design: &mut Design, proxy: Expr, target: bool) -> Result<Expr, LowerError> {
        let shape = design.shape_of(&proxy)?;
        let Expr::ArrayProxy { choices, key } = proxy else {
            return Ok(proxy);
        };
        let muxed = design.create_signal(SignalSpec::new(shape).named("array_muxed").variable())?;
        self.arrays += 1;
        let key = self.lower_expr(design, *key, false)?;
        let mut case = Case::new(key);
        for (n, choice) in choices.into_iter().enumerate() {
            let body = if target {
                self.lower_assign(design, choice, muxed.into())?
            } else {
                let value = self.lower_expr(design, choice, false)?;
                vec![muxed.assign(value)]
            };
            case = case.arm(Constant::new(n as i64), body);
        }
        let stmt: Statement = case.make_default(None).into();
        if target {
            self.extra.push(stmt);
        } else {
            self.comb.push(stmt);
        }
        Ok(Expr::Signal(muxed))
    }
}

impl Lowerer for BasicLowerer<'_> {
    fn lower_expr(&mut self, design: &mut Design, expr: Expr, target: bool) -> Result<Expr, LowerError> {
        match expr {
            array @ Expr::ArrayProxy { .. } => self.lower_array(design, array, target),
            Expr::ClockSignal(domain) => Ok(Expr::Signal(self.domain(&domain)?.clk)),
            Expr::ResetSignal {
                domain,
                allow_reset_less,
            } => {
                let rst = self.domain(&domain)?.rst;
                match rst {
                    Some(rst) => Ok(Expr::Signal(rst)),
                    None if allow_reset_less => Ok(Expr::Const(Constant::new(0))),
                    None => Err(LowerError::ResetLessDomain { domain }),
                }
            }
            other => map_children(other, target, &mut |e, t| self.lower_expr(design, e, t)),
        }
    }

    fn extra_stmts(&mut self) -> &mut Vec<Statement> {
        &mut self.extra
    }

    fn comb(&mut self) -> &mut Vec<Statement> {
        &mut self.comb
    }
}

pub(crate) fn sorted_names(domains: &[ClockDomain]) -> Vec<String> {
    let mut names: Vec<String> = domains.iter().map(|cd| cd.name.clone()).collect();
    names.sort();
    names
}

/// Lowers arrays and clock/reset references against the fragment's own
/// clock domains. Returns the number of arrays lowered.
pub fn lower_basics(design: &mut Design, fragment: &mut Fragment) -> Result<usize, LowerError> {
    let domains = fragment.clock_domains.clone();
    let mut lowerer = BasicLowerer {
        domains: &domains,
        extra: Vec::new(),
        comb: Vec::new(),
        arrays: 0,
    };
    design.enter_scope("basiclowerer");
    let result = apply_lowerer(&mut lowerer, design, fragment);
    design.exit_scope();
    result?;
    tracing::debug!(arrays = lowerer.arrays, "lowered basic constructs");
    Ok(lowerer.arrays)
}
