//! Expression and declaration printing.
//!
//! The signedness tracked while printing follows the shape inference rules
//! of `fhdl_ir::bits`: whenever an operator combines a signed and an
//! unsigned operand, the unsigned one is zero-extended by one bit and cast
//! with `$signed({1'd0, ...})`. Shifts keep the sign of their left operand
//! and comparisons are unsigned.

use crate::error::EmitError;
use fhdl_ir::{Constant, Design, Expr, IrError, SignalId, UnaryOp};
use fhdl_namer::Namer;

fn zero_extend(text: &str) -> String {
    format!("$signed({{1'd0, {text}}})")
}

/// Prints a sized literal: `<w>'d<v>` or, for signed constants, `<w>'sd<v>`
/// with the two's complement bits as value.
pub fn print_constant(c: &Constant) -> String {
    let shape = c.shape();
    if shape.signed {
        format!("{}'sd{}", shape.width, c.to_unsigned())
    } else {
        format!("{}'d{}", shape.width, c.value())
    }
}

/// Prints the declaration tail of a signal: `signed [w-1:0] name`.
pub fn print_signal_decl(design: &Design, namer: &Namer, id: SignalId) -> Result<String, EmitError> {
    let shape = design[id].shape;
    let mut r = String::new();
    if shape.signed {
        r.push_str("signed ");
    }
    if shape.width > 1 {
        r.push_str(&format!("[{}:0] ", shape.width - 1));
    }
    r.push_str(namer.get_name(id)?);
    Ok(r)
}

/// Prints expressions of a lowered fragment.
#[derive(Clone, Copy)]
pub struct ExprPrinter<'a> {
    design: &'a Design,
    namer: &'a Namer,
}

impl<'a> ExprPrinter<'a> {
    /// A printer resolving signal names through `namer`.
    pub fn new(design: &'a Design, namer: &'a Namer) -> Self {
        Self { design, namer }
    }

    /// Prints `expr` as Verilog.
    pub fn print(&self, expr: &Expr) -> Result<String, EmitError> {
        Ok(self.print_signed(expr)?.0)
    }

    /// The name of a signal.
    pub fn name(&self, id: SignalId) -> Result<&'a str, EmitError> {
        Ok(self.namer.get_name(id)?)
    }

    /// Prints `expr` and reports whether Verilog sees it as signed.
    fn print_signed(&self, expr: &Expr) -> Result<(String, bool), EmitError> {
        match expr {
            Expr::Const(c) => Ok((print_constant(c), c.shape().signed)),
            Expr::Signal(id) => Ok((self.name(*id)?.to_string(), self.design[*id].shape.signed)),
            Expr::Unary { op, operand } => {
                let (r, s) = self.print_signed(operand)?;
                Ok(match op {
                    UnaryOp::Neg if s => (format!("(-{r})"), true),
                    UnaryOp::Neg => (format!("(-{})", zero_extend(&r)), true),
                    UnaryOp::Not => (format!("(~{r})"), s),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let (mut r1, s1) = self.print_signed(lhs)?;
                let (mut r2, s2) = self.print_signed(rhs)?;
                if !op.is_shift() {
                    if s2 && !s1 {
                        r1 = zero_extend(&r1);
                    }
                    if s1 && !s2 {
                        r2 = zero_extend(&r2);
                    }
                }
                let signed = if op.is_comparison() {
                    false
                } else if op.is_shift() {
                    s1
                } else {
                    s1 || s2
                };
                Ok((format!("({r1} {} {r2})", op.symbol()), signed))
            }
            Expr::Mux {
                select,
                on_true,
                on_false,
            } => {
                let (sel, _) = self.print_signed(select)?;
                let (mut r2, s2) = self.print_signed(on_true)?;
                let (mut r3, s3) = self.print_signed(on_false)?;
                if s2 && !s3 {
                    r3 = zero_extend(&r3);
                }
                if s3 && !s2 {
                    r2 = zero_extend(&r2);
                }
                Ok((format!("({sel} ? {r2} : {r3})"), s2 || s3))
            }
            Expr::Slice { value, start, stop } => {
                if let Expr::Signal(id) = value.as_ref() {
                    if self.design[*id].shape.width == 1 && *start == 0 && *stop == 1 {
                        return self.print_signed(value);
                    }
                }
                let (r, s) = self.print_signed(value)?;
                let range = if start + 1 == *stop {
                    format!("[{start}]")
                } else {
                    format!("[{}:{start}]", stop.saturating_sub(1))
                };
                Ok((format!("{r}{range}"), s))
            }
            Expr::Part { value, offset, width } => {
                let (r, s) = self.print_signed(value)?;
                let (o, _) = self.print_signed(offset)?;
                Ok((format!("{r}[{o} +: {width}]"), s))
            }
            Expr::Cat(items) => {
                let parts = items
                    .iter()
                    .rev()
                    .map(|e| self.print(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((format!("{{{}}}", parts.join(", ")), false))
            }
            Expr::Replicate { value, count } => Ok((format!("{{{count}{{{}}}}}", self.print(value)?), false)),
            Expr::ClockSignal(_) | Expr::ResetSignal { .. } | Expr::ArrayProxy { .. } => {
                Err(IrError::UnknownExpressionKind {
                    kind: expr.kind_name(),
                    context: "Verilog expression",
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhdl_ir::{Shape, SignalSpec};

    fn setup() -> (Design, SignalId, SignalId, SignalId) {
        let mut d = Design::new();
        let x = d.signal("x", 8).unwrap();
        let y = d.create_signal(SignalSpec::new(Shape::signed(4)).named("y")).unwrap();
        let b = d.signal("b", 1).unwrap();
        (d, x, y, b)
    }

    fn print(d: &Design, e: &Expr) -> String {
        let namer = Namer::build(d, d.signals().iter().map(|(id, _)| id), std::iter::empty()).unwrap();
        ExprPrinter::new(d, &namer).print(e).unwrap()
    }

    #[test]
    fn constants_are_sized() {
        assert_eq!(print_constant(&Constant::new(5)), "3'd5");
        assert_eq!(print_constant(&Constant::with_shape(-1, Shape::signed(4))), "4'sd15");
        assert_eq!(print_constant(&Constant::with_shape(3, Shape::signed(4))), "4'sd3");
        assert_eq!(print_constant(&Constant::from(true)), "1'd1");
    }

    #[test]
    fn mixed_sign_add_extends_unsigned_side() {
        let (d, x, y, _) = setup();
        assert_eq!(print(&d, &(x + y)), "($signed({1'd0, x}) + y)");
        assert_eq!(print(&d, &(y + x)), "(y + $signed({1'd0, x}))");
    }

    #[test]
    fn same_sign_operands_are_untouched() {
        let (d, x, _, b) = setup();
        assert_eq!(print(&d, &(x & b)), "(x & b)");
    }

    #[test]
    fn shifts_never_cast() {
        let (d, _, y, b) = setup();
        assert_eq!(print(&d, &(Expr::from(y) << Expr::from(b))), "(y <<< b)");
    }

    #[test]
    fn comparison_result_is_unsigned() {
        let (d, x, y, b) = setup();
        let e = Expr::from(y).cmp_lt(x) + b;
        assert_eq!(print(&d, &e), "((y < $signed({1'd0, x})) + b)");
    }

    #[test]
    fn unsigned_negation_becomes_signed() {
        let (d, x, _, _) = setup();
        assert_eq!(print(&d, &(-Expr::from(x))), "(-$signed({1'd0, x}))");
    }

    #[test]
    fn mux_matches_operand_signs() {
        let (d, x, y, b) = setup();
        assert_eq!(print(&d, &Expr::mux(b, x, y)), "(b ? $signed({1'd0, x}) : y)");
    }

    #[test]
    fn slices_and_parts() {
        let (d, x, _, b) = setup();
        assert_eq!(print(&d, &Expr::from(x).slice(2, 6).unwrap()), "x[5:2]");
        assert_eq!(print(&d, &Expr::from(x).bit(3).unwrap()), "x[3]");
        assert_eq!(print(&d, &Expr::from(b).bit(0).unwrap()), "b");
        assert_eq!(print(&d, &Expr::from(x).part(b, 4)), "x[b +: 4]");
    }

    #[test]
    fn cat_prints_most_significant_first() {
        let (d, x, _, b) = setup();
        assert_eq!(print(&d, &Expr::cat([x, b])), "{b, x}");
        assert_eq!(print(&d, &Expr::from(b).replicate(3)), "{3{b}}");
    }

    #[test]
    fn signal_declarations() {
        let (d, x, y, b) = setup();
        let namer = Namer::build(&d, [x, y, b], std::iter::empty()).unwrap();
        assert_eq!(print_signal_decl(&d, &namer, x).unwrap(), "[7:0] x");
        assert_eq!(print_signal_decl(&d, &namer, y).unwrap(), "signed [3:0] y");
        assert_eq!(print_signal_decl(&d, &namer, b).unwrap(), "b");
    }

    #[test]
    fn unlowered_constructs_are_rejected() {
        let (d, ..) = setup();
        let namer = Namer::default();
        let err = ExprPrinter::new(&d, &namer).print(&Expr::clock("sys")).unwrap_err();
        assert!(matches!(err, EmitError::Ir(IrError::UnknownExpressionKind { .. })));
    }
}
