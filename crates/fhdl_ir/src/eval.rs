//! Reference evaluation of expressions and statements.
//!
//! The [`Evaluator`] executes statements with immediate (blocking)
//! semantics against a map of signal values. It is not a simulator: there
//! is no notion of time or clock edges. It exists to check that rewrites
//! preserve meaning.

use crate::design::Design;
use crate::error::IrError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::ids::SignalId;
use crate::shape::Shape;
use crate::stmt::{CaseKey, Statement};
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::collections::HashMap;

/// Signal values plus the design they belong to.
#[derive(Debug)]
pub struct Evaluator<'d> {
    design: &'d Design,
    values: HashMap<SignalId, BigInt>,
}

impl<'d> Evaluator<'d> {
    /// An evaluator where every signal holds its reset value.
    pub fn new(design: &'d Design) -> Self {
        Self {
            design,
            values: HashMap::new(),
        }
    }

    /// Current value of a signal.
    pub fn get(&self, id: SignalId) -> BigInt {
        self.values
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.design[id].reset.value().clone())
    }

    /// Sets a signal, wrapping the value to the signal's shape.
    pub fn set(&mut self, id: SignalId, value: impl Into<BigInt>) {
        let wrapped = self.design[id].shape.wrap(&value.into());
        self.values.insert(id, wrapped);
    }

    /// Evaluates an expression to a value of its inferred shape.
    pub fn eval(&self, expr: &Expr) -> Result<BigInt, IrError> {
        let shape = self.design.shape_of(expr)?;
        let raw = match expr {
            Expr::Const(c) => c.value().clone(),
            Expr::Signal(id) => self.get(*id),
            Expr::ClockSignal(_) | Expr::ResetSignal { .. } => {
                return Err(IrError::UnknownExpressionKind {
                    kind: expr.kind_name(),
                    context: "evaluation",
                })
            }
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => !v,
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                binary(*op, a, b)?
            }
            Expr::Mux {
                select,
                on_true,
                on_false,
            } => {
                if self.eval(select)?.is_zero() {
                    self.eval(on_false)?
                } else {
                    self.eval(on_true)?
                }
            }
            Expr::Slice { value, start, .. } => self.eval(value)? >> *start,
            Expr::Part { value, offset, .. } => {
                let offset = to_shift(&self.eval(offset)?)?;
                self.eval(value)? >> offset
            }
            Expr::Cat(items) => {
                let mut acc = BigInt::zero();
                let mut pos = 0u32;
                for item in items {
                    let width = self.design.shape_of(item)?.width;
                    acc |= self.eval_bits(item, width)? << pos;
                    pos += width;
                }
                acc
            }
            Expr::Replicate { value, count } => {
                let width = self.design.shape_of(value)?.width;
                let bits = self.eval_bits(value, width)?;
                let mut acc = BigInt::zero();
                for n in 0..*count {
                    acc |= &bits << (n * width);
                }
                acc
            }
            Expr::ArrayProxy { choices, key } => {
                let index = self.array_index(choices.len(), key)?;
                self.eval(&choices[index])?
            }
        };
        Ok(shape.wrap(&raw))
    }

    fn eval_bits(&self, expr: &Expr, width: u32) -> Result<BigInt, IrError> {
        Ok(Shape::unsigned(width).wrap(&self.eval(expr)?))
    }

    /// Out-of-range keys select the last choice.
    fn array_index(&self, len: usize, key: &Expr) -> Result<usize, IrError> {
        let key = self.eval(key)?;
        let last = len.saturating_sub(1);
        if key.is_negative() {
            return Ok(0);
        }
        Ok(key.to_usize().map_or(last, |k| k.min(last)))
    }

    /// Executes statements with blocking semantics.
    pub fn execute(&mut self, stmts: &[Statement]) -> Result<(), IrError> {
        for stmt in stmts {
            match stmt {
                Statement::Assign { target, value } => {
                    let width = self.design.shape_of(target)?.width;
                    let bits = self.eval_bits(value, width)?;
                    self.write(target, bits)?;
                }
                Statement::If {
                    condition,
                    then_body,
                    else_body,
                } => {
                    if self.eval(condition)?.is_zero() {
                        self.execute(else_body)?;
                    } else {
                        self.execute(then_body)?;
                    }
                }
                Statement::Case { test, arms } => {
                    let value = self.eval(test)?;
                    let chosen = arms
                        .iter()
                        .find(|arm| matches!(&arm.key, CaseKey::Value(c) if *c.value() == value))
                        .or_else(|| arms.iter().find(|arm| arm.key == CaseKey::Default));
                    if let Some(arm) = chosen {
                        self.execute(&arm.body)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stores raw `bits` (unsigned, target width) through an assignment
    /// target.
    fn write(&mut self, target: &Expr, bits: BigInt) -> Result<(), IrError> {
        match target {
            Expr::Signal(id) => {
                self.set(*id, bits);
                Ok(())
            }
            Expr::Slice { value, start, stop } => self.write_range(value, *start, stop - start, bits),
            Expr::Part { value, offset, width } => {
                let offset = to_shift(&self.eval(offset)?)?;
                self.write_range(value, offset, *width, bits)
            }
            Expr::Cat(items) => {
                let mut pos = 0u32;
                for item in items {
                    let width = self.design.shape_of(item)?.width;
                    let chunk = Shape::unsigned(width).wrap(&(&bits >> pos));
                    self.write(item, chunk)?;
                    pos += width;
                }
                Ok(())
            }
            Expr::ArrayProxy { choices, key } => {
                let index = self.array_index(choices.len(), key)?;
                self.write(&choices[index], bits)
            }
            other => Err(IrError::UnsupportedTarget {
                kind: other.kind_name(),
            }),
        }
    }

    fn write_range(&mut self, inner: &Expr, start: u32, width: u32, bits: BigInt) -> Result<(), IrError> {
        let inner_width = self.design.shape_of(inner)?.width;
        let current = self.eval_bits(inner, inner_width)?;
        let mask = ((BigInt::one() << width) - 1u32) << start;
        let cleared = current & !mask.clone();
        let inserted = (bits << start) & mask;
        self.write(inner, cleared | inserted)
    }
}

fn to_shift(v: &BigInt) -> Result<u32, IrError> {
    if v.is_negative() {
        return Ok(0);
    }
    v.to_u32().ok_or_else(|| IrError::WidthOverflow {
        what: format!("shift by {v}"),
    })
}

fn binary(op: BinaryOp, a: BigInt, b: BigInt) -> Result<BigInt, IrError> {
    let truth = |t: bool| BigInt::from(u8::from(t));
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => a << to_shift(&b)?,
        BinaryOp::Shr => a >> to_shift(&b)?,
        BinaryOp::Eq => truth(a == b),
        BinaryOp::Ne => truth(a != b),
        BinaryOp::Lt => truth(a < b),
        BinaryOp::Le => truth(a <= b),
        BinaryOp::Gt => truth(a > b),
        BinaryOp::Ge => truth(a >= b),
    })
}
