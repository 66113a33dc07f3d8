//! Expression trees.
//!
//! [`Expr`] is a closed sum type over every value kind the toolkit knows
//! about. Shapes are never stored on nodes; they are recomputed from the
//! leaves by [`crate::bits`] whenever they are needed.

use crate::error::IrError;
use crate::ids::SignalId;
use crate::shape::{Constant, Shape};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::ops;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`).
    Neg,
    /// Bitwise NOT (`~`).
    Not,
}

impl UnaryOp {
    /// Verilog operator text.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "~",
        }
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Bitwise AND (`&`).
    And,
    /// Bitwise OR (`|`).
    Or,
    /// Bitwise XOR (`^`).
    Xor,
    /// Arithmetic left shift (`<<<`).
    Shl,
    /// Arithmetic right shift (`>>>`).
    Shr,
    /// Equality (`==`).
    Eq,
    /// Inequality (`!=`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl BinaryOp {
    /// Verilog operator text.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<<",
            BinaryOp::Shr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    /// Whether the operator yields a one-bit truth value.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Whether the operator is a shift, whose operands are never sign-matched.
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal.
    Const(Constant),
    /// A signal reference.
    Signal(SignalId),
    /// The clock of a named domain, resolved during lowering.
    ClockSignal(String),
    /// The reset of a named domain, resolved during lowering.
    ResetSignal {
        /// Domain name.
        domain: String,
        /// Resolve to constant 0 if the domain has no reset.
        allow_reset_less: bool,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A ternary choice `select ? on_true : on_false`.
    Mux {
        /// One-bit selector.
        select: Box<Expr>,
        /// Value when the selector is non-zero.
        on_true: Box<Expr>,
        /// Value when the selector is zero.
        on_false: Box<Expr>,
    },
    /// A constant bit range `value[start:stop]`, `stop` exclusive.
    Slice {
        /// The sliced value.
        value: Box<Expr>,
        /// First bit.
        start: u32,
        /// One past the last bit.
        stop: u32,
    },
    /// A variable-offset part select `value[offset +: width]`.
    Part {
        /// The selected value.
        value: Box<Expr>,
        /// Bit offset expression.
        offset: Box<Expr>,
        /// Number of bits selected.
        width: u32,
    },
    /// Concatenation, first element in the least significant bits.
    Cat(Vec<Expr>),
    /// `count` copies of `value`.
    Replicate {
        /// Repeated value.
        value: Box<Expr>,
        /// Number of copies.
        count: u32,
    },
    /// Selects `choices[key]`, saturating to the last choice.
    ArrayProxy {
        /// Candidate values, never empty.
        choices: Vec<Expr>,
        /// Index expression.
        key: Box<Expr>,
    },
}

impl Expr {
    /// A constant with an explicit shape.
    pub fn constant(value: impl Into<BigInt>, shape: impl Into<Shape>) -> Self {
        Expr::Const(Constant::with_shape(value, shape.into()))
    }

    /// The clock of `domain`.
    pub fn clock(domain: impl Into<String>) -> Self {
        Expr::ClockSignal(domain.into())
    }

    /// The reset of `domain`; resolving it fails if the domain has no reset.
    pub fn reset(domain: impl Into<String>) -> Self {
        Expr::ResetSignal {
            domain: domain.into(),
            allow_reset_less: false,
        }
    }

    /// The reset of `domain`, or constant 0 if the domain has no reset.
    pub fn reset_or_zero(domain: impl Into<String>) -> Self {
        Expr::ResetSignal {
            domain: domain.into(),
            allow_reset_less: true,
        }
    }

    /// Bits `start..stop` of this value.
    pub fn slice(self, start: u32, stop: u32) -> Result<Expr, IrError> {
        if stop < start {
            return Err(IrError::InvertedSlice { start, stop });
        }
        Ok(Expr::Slice {
            value: Box::new(self),
            start,
            stop,
        })
    }

    /// Bit `index` of this value.
    pub fn bit(self, index: u32) -> Result<Expr, IrError> {
        let stop = index.checked_add(1).ok_or_else(|| IrError::WidthOverflow {
            what: format!("bit select at index {index}"),
        })?;
        Ok(Expr::Slice {
            value: Box::new(self),
            start: index,
            stop,
        })
    }

    /// `width` bits starting at the variable `offset`.
    pub fn part(self, offset: impl Into<Expr>, width: u32) -> Expr {
        Expr::Part {
            value: Box::new(self),
            offset: Box::new(offset.into()),
            width,
        }
    }

    /// Concatenates values, first one in the least significant bits.
    pub fn cat<I, E>(items: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::Cat(items.into_iter().map(Into::into).collect())
    }

    /// `count` copies of this value.
    pub fn replicate(self, count: u32) -> Expr {
        Expr::Replicate {
            value: Box::new(self),
            count,
        }
    }

    /// Selects among `choices` by `key`.
    pub fn array<I, E>(choices: I, key: impl Into<Expr>) -> Result<Expr, IrError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let choices: Vec<Expr> = choices.into_iter().map(Into::into).collect();
        if choices.is_empty() {
            return Err(IrError::EmptyArray);
        }
        Ok(Expr::ArrayProxy {
            choices,
            key: Box::new(key.into()),
        })
    }

    /// `select ? on_true : on_false`.
    pub fn mux(select: impl Into<Expr>, on_true: impl Into<Expr>, on_false: impl Into<Expr>) -> Expr {
        Expr::Mux {
            select: Box::new(select.into()),
            on_true: Box::new(on_true.into()),
            on_false: Box::new(on_false.into()),
        }
    }

    /// A binary operation node.
    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    /// A unary operation node.
    pub fn unary(op: UnaryOp, operand: impl Into<Expr>) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand.into()),
        }
    }

    /// `self == rhs`.
    pub fn cmp_eq(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Eq, self, rhs)
    }

    /// `self != rhs`.
    pub fn cmp_ne(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Ne, self, rhs)
    }

    /// `self < rhs`.
    pub fn cmp_lt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Lt, self, rhs)
    }

    /// `self <= rhs`.
    pub fn cmp_le(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Le, self, rhs)
    }

    /// `self > rhs`.
    pub fn cmp_gt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Gt, self, rhs)
    }

    /// `self >= rhs`.
    pub fn cmp_ge(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Ge, self, rhs)
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Const(_) => "Constant",
            Expr::Signal(_) => "Signal",
            Expr::ClockSignal(_) => "ClockSignal",
            Expr::ResetSignal { .. } => "ResetSignal",
            Expr::Unary { .. } | Expr::Binary { .. } => "Operator",
            Expr::Mux { .. } => "Mux",
            Expr::Slice { .. } => "Slice",
            Expr::Part { .. } => "Part",
            Expr::Cat(_) => "Cat",
            Expr::Replicate { .. } => "Replicate",
            Expr::ArrayProxy { .. } => "ArrayProxy",
        }
    }

    /// The signal this expression directly names, if any.
    pub fn as_signal(&self) -> Option<SignalId> {
        match self {
            Expr::Signal(id) => Some(*id),
            _ => None,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Signal(_) | Expr::ClockSignal(_) | Expr::ResetSignal { .. } => {
                Vec::new()
            }
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Mux {
                select,
                on_true,
                on_false,
            } => vec![select, on_true, on_false],
            Expr::Slice { value, .. } | Expr::Replicate { value, .. } => vec![value],
            Expr::Part { value, offset, .. } => vec![value, offset],
            Expr::Cat(items) => items.iter().collect(),
            Expr::ArrayProxy { choices, key } => {
                let mut out: Vec<&Expr> = choices.iter().collect();
                out.push(key);
                out
            }
        }
    }

    /// Mutable counterpart of [`children`](Self::children).
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Const(_) | Expr::Signal(_) | Expr::ClockSignal(_) | Expr::ResetSignal { .. } => {
                Vec::new()
            }
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Mux {
                select,
                on_true,
                on_false,
            } => vec![select, on_true, on_false],
            Expr::Slice { value, .. } | Expr::Replicate { value, .. } => vec![value],
            Expr::Part { value, offset, .. } => vec![value, offset],
            Expr::Cat(items) => items.iter_mut().collect(),
            Expr::ArrayProxy { choices, key } => {
                let mut out: Vec<&mut Expr> = choices.iter_mut().collect();
                out.push(key);
                out
            }
        }
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Visits this node and every descendant mutably, parents first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        f(self);
        for child in self.children_mut() {
            child.walk_mut(f);
        }
    }
}

impl From<Constant> for Expr {
    fn from(c: Constant) -> Self {
        Expr::Const(c)
    }
}

impl From<SignalId> for Expr {
    fn from(id: SignalId) -> Self {
        Expr::Signal(id)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

macro_rules! impl_from_int {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Expr {
                fn from(v: $int) -> Self {
                    Expr::Const(Constant::new(v))
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, u32, u64);

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Const(Constant::from(v))
    }
}

macro_rules! impl_operators {
    ($ty:ty) => {
        impl_operators!(@binary $ty, Add, add, Add);
        impl_operators!(@binary $ty, Sub, sub, Sub);
        impl_operators!(@binary $ty, Mul, mul, Mul);
        impl_operators!(@binary $ty, BitAnd, bitand, And);
        impl_operators!(@binary $ty, BitOr, bitor, Or);
        impl_operators!(@binary $ty, BitXor, bitxor, Xor);
        impl_operators!(@binary $ty, Shl, shl, Shl);
        impl_operators!(@binary $ty, Shr, shr, Shr);

        impl ops::Neg for $ty {
            type Output = Expr;

            fn neg(self) -> Expr {
                Expr::unary(UnaryOp::Neg, self)
            }
        }

        impl ops::Not for $ty {
            type Output = Expr;

            fn not(self) -> Expr {
                Expr::unary(UnaryOp::Not, self)
            }
        }
    };
    (@binary $ty:ty, $trait:ident, $method:ident, $op:ident) => {
        impl<R: Into<Expr>> ops::$trait<R> for $ty {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::binary(BinaryOp::$op, self, rhs)
            }
        }
    };
}

impl_operators!(Expr);
impl_operators!(SignalId);
