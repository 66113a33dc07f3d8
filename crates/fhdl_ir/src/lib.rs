//! Value/statement model for the fhdl elaboration toolkit.
//!
//! Designs are built from [`Signal`]s owned by a [`Design`] arena, composed
//! into [`Expr`] trees and [`Statement`]s, and grouped into [`Fragment`]s
//! together with [`Special`] constructs and [`ClockDomain`]s. Shapes are
//! never stored on expression nodes; [`bits::value_shape`] recomputes them.

#![warn(missing_docs)]

pub mod arena;
pub mod bits;
pub mod design;
pub mod error;
pub mod eval;
pub mod expr;
pub mod fragment;
pub mod ids;
pub mod memory;
pub mod module;
pub mod shape;
pub mod signal;
pub mod special;
pub mod stmt;
pub mod tracer;
pub mod visit;

pub use arena::{Arena, ArenaId};
pub use design::Design;
pub use error::IrError;
pub use eval::Evaluator;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use fragment::{ClockDomain, Fragment};
pub use ids::{Sequence, SignalId};
pub use memory::{Memory, MemoryPort, PortConfig, PortMode, PortSignals};
pub use module::Module;
pub use shape::{bits_for, log2_int, Constant, Shape};
pub use signal::{AttrValue, BacktraceEntry, Signal, SignalAttr, SignalSpec};
pub use special::{
    AsyncResetSynchronizer, BusSynchronizer, DdrInput, DdrOutput, DifferentialInput, DifferentialOutput,
    Instance, InstanceItem, IoDirection, MultiReg, ParamValue, PulseSynchronizer, Special, SpecialBody,
    SpecialKind, Tristate,
};
pub use stmt::{Case, CaseArm, CaseKey, If, Statement};
