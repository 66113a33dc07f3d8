//! Specials: structured constructs that need lowering or self-emission.
//!
//! Every special exposes its expressions together with their direction
//! relative to the special, which is how lowering passes rewrite them and
//! how the emitter classifies module ports.

use crate::expr::Expr;
use crate::ids::Sequence;
use crate::memory::Memory;
use crate::shape::Constant;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Direction of a special's expression, seen from the special.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoDirection {
    /// Read by the special.
    Input,
    /// Driven by the special.
    Output,
    /// Bidirectional pad connection.
    InOut,
}

/// Discriminant of a [`SpecialBody`], used to key overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialKind {
    /// [`MultiReg`].
    MultiReg,
    /// [`PulseSynchronizer`].
    PulseSynchronizer,
    /// [`BusSynchronizer`].
    BusSynchronizer,
    /// [`AsyncResetSynchronizer`].
    AsyncResetSynchronizer,
    /// [`DifferentialInput`].
    DifferentialInput,
    /// [`DifferentialOutput`].
    DifferentialOutput,
    /// [`DdrInput`].
    DdrInput,
    /// [`DdrOutput`].
    DdrOutput,
    /// [`Tristate`].
    Tristate,
    /// [`Instance`].
    Instance,
    /// [`Memory`].
    Memory,
}

impl fmt::Display for SpecialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Clock-domain-crossing register chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiReg {
    /// Input, from any domain.
    pub i: Expr,
    /// Output, synchronous to `odomain`.
    pub o: Expr,
    /// Destination domain.
    pub odomain: String,
    /// Number of register stages.
    pub n: u32,
    /// Reset value of every stage.
    pub reset: BigInt,
}

impl MultiReg {
    /// A two-stage synchronizer into `odomain`.
    pub fn new(i: impl Into<Expr>, o: impl Into<Expr>, odomain: impl Into<String>) -> Self {
        Self {
            i: i.into(),
            o: o.into(),
            odomain: odomain.into(),
            n: 2,
            reset: BigInt::from(0),
        }
    }
}

/// Transfers single-cycle pulses between domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseSynchronizer {
    /// Pulse input in `idomain`.
    pub i: Expr,
    /// Pulse output in `odomain`.
    pub o: Expr,
    /// Source domain.
    pub idomain: String,
    /// Destination domain.
    pub odomain: String,
}

/// Transfers a multi-bit value between domains with a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSynchronizer {
    /// Value in `idomain`.
    pub i: Expr,
    /// Value in `odomain`.
    pub o: Expr,
    /// Source domain.
    pub idomain: String,
    /// Destination domain.
    pub odomain: String,
    /// Source-domain cycles before a lost handshake is restarted.
    pub timeout: u32,
}

/// Drives a domain reset from an asynchronous source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncResetSynchronizer {
    /// The domain clock.
    pub clock: Expr,
    /// The domain reset being driven.
    pub reset: Expr,
    /// Asynchronous reset source.
    pub async_reset: Expr,
}

impl AsyncResetSynchronizer {
    /// Synchronizes `async_reset` onto the reset of `domain`.
    pub fn new(domain: &str, async_reset: impl Into<Expr>) -> Self {
        Self {
            clock: Expr::clock(domain),
            reset: Expr::reset(domain),
            async_reset: async_reset.into(),
        }
    }
}

/// Differential input buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialInput {
    /// Positive pad.
    pub i_p: Expr,
    /// Negative pad.
    pub i_n: Expr,
    /// Single-ended output.
    pub o: Expr,
}

/// Differential output buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialOutput {
    /// Single-ended input.
    pub i: Expr,
    /// Positive pad.
    pub o_p: Expr,
    /// Negative pad.
    pub o_n: Expr,
}

/// Double-data-rate input register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdrInput {
    /// Pad input.
    pub i: Expr,
    /// Data captured on the rising edge.
    pub o1: Expr,
    /// Data captured on the falling edge.
    pub o2: Expr,
    /// Sampling clock.
    pub clk: Expr,
}

/// Double-data-rate output register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdrOutput {
    /// Data driven on the rising edge.
    pub i1: Expr,
    /// Data driven on the falling edge.
    pub i2: Expr,
    /// Pad output.
    pub o: Expr,
    /// Output clock.
    pub clk: Expr,
}

/// Tristate pad driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tristate {
    /// The bidirectional pad.
    pub target: Expr,
    /// Value driven when enabled.
    pub o: Expr,
    /// Output enable.
    pub oe: Expr,
    /// Value read back from the pad.
    pub i: Option<Expr>,
}

/// Value of an [`Instance`] parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A sized literal.
    Const(Constant),
    /// A quoted string.
    Str(String),
    /// Text printed verbatim.
    Preformatted(String),
}

/// One connection or parameter of an [`Instance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceItem {
    /// `#(.name(value))`.
    Parameter {
        /// Parameter name.
        name: String,
        /// Parameter value.
        value: ParamValue,
    },
    /// Input port connection.
    Input {
        /// Port name on the instantiated module.
        name: String,
        /// Connected expression.
        expr: Expr,
    },
    /// Output port connection.
    Output {
        /// Port name on the instantiated module.
        name: String,
        /// Connected expression.
        expr: Expr,
    },
    /// Bidirectional port connection.
    InOut {
        /// Port name on the instantiated module.
        name: String,
        /// Connected expression.
        expr: Expr,
    },
}

/// Instantiation of an external module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Module being instantiated.
    pub of: String,
    /// Instance name; defaults to `of`.
    pub name: Option<String>,
    /// Parameters and connections in declaration order.
    pub items: Vec<InstanceItem>,
    /// Text for a trailing `/* synthesis ... */` comment.
    pub synthesis_directive: Option<String>,
}

impl Instance {
    /// An instance of `of` with no connections.
    pub fn new(of: impl Into<String>) -> Self {
        Self {
            of: of.into(),
            name: None,
            items: Vec::new(),
            synthesis_directive: None,
        }
    }

    /// Sets the instance name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a parameter.
    pub fn param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.items.push(InstanceItem::Parameter {
            name: name.into(),
            value,
        });
        self
    }

    /// Connects an input port.
    pub fn input(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.items.push(InstanceItem::Input {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }

    /// Connects an output port.
    pub fn output(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.items.push(InstanceItem::Output {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }

    /// Connects a bidirectional port.
    pub fn inout(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.items.push(InstanceItem::InOut {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }
}

/// The data of a special.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialBody {
    /// See [`MultiReg`].
    MultiReg(MultiReg),
    /// See [`PulseSynchronizer`].
    PulseSynchronizer(PulseSynchronizer),
    /// See [`BusSynchronizer`].
    BusSynchronizer(BusSynchronizer),
    /// See [`AsyncResetSynchronizer`].
    AsyncResetSynchronizer(AsyncResetSynchronizer),
    /// See [`DifferentialInput`].
    DifferentialInput(DifferentialInput),
    /// See [`DifferentialOutput`].
    DifferentialOutput(DifferentialOutput),
    /// See [`DdrInput`].
    DdrInput(DdrInput),
    /// See [`DdrOutput`].
    DdrOutput(DdrOutput),
    /// See [`Tristate`].
    Tristate(Tristate),
    /// See [`Instance`].
    Instance(Instance),
    /// See [`Memory`].
    Memory(Memory),
}

macro_rules! impl_into_body {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for SpecialBody {
                fn from(v: $ty) -> Self {
                    SpecialBody::$ty(v)
                }
            }
        )*
    };
}

impl_into_body!(
    MultiReg,
    PulseSynchronizer,
    BusSynchronizer,
    AsyncResetSynchronizer,
    DifferentialInput,
    DifferentialOutput,
    DdrInput,
    DdrOutput,
    Tristate,
    Instance,
    Memory
);

/// A special with its creation-order key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Special {
    /// Creation-order key; also the special's identity within a fragment.
    pub sequence: Sequence,
    /// The special's data.
    pub body: SpecialBody,
}

impl Special {
    /// The special's kind.
    pub fn kind(&self) -> SpecialKind {
        match &self.body {
            SpecialBody::MultiReg(_) => SpecialKind::MultiReg,
            SpecialBody::PulseSynchronizer(_) => SpecialKind::PulseSynchronizer,
            SpecialBody::BusSynchronizer(_) => SpecialKind::BusSynchronizer,
            SpecialBody::AsyncResetSynchronizer(_) => SpecialKind::AsyncResetSynchronizer,
            SpecialBody::DifferentialInput(_) => SpecialKind::DifferentialInput,
            SpecialBody::DifferentialOutput(_) => SpecialKind::DifferentialOutput,
            SpecialBody::DdrInput(_) => SpecialKind::DdrInput,
            SpecialBody::DdrOutput(_) => SpecialKind::DdrOutput,
            SpecialBody::Tristate(_) => SpecialKind::Tristate,
            SpecialBody::Instance(_) => SpecialKind::Instance,
            SpecialBody::Memory(_) => SpecialKind::Memory,
        }
    }

    /// Every expression of the special with its direction.
    pub fn expressions(&self) -> Vec<(&Expr, IoDirection)> {
        use IoDirection::{InOut, Input, Output};
        match &self.body {
            SpecialBody::MultiReg(s) => vec![(&s.i, Input), (&s.o, Output)],
            SpecialBody::PulseSynchronizer(s) => vec![(&s.i, Input), (&s.o, Output)],
            SpecialBody::BusSynchronizer(s) => vec![(&s.i, Input), (&s.o, Output)],
            SpecialBody::AsyncResetSynchronizer(s) => vec![
                (&s.clock, Input),
                (&s.reset, Output),
                (&s.async_reset, Input),
            ],
            SpecialBody::DifferentialInput(s) => {
                vec![(&s.i_p, Input), (&s.i_n, Input), (&s.o, Output)]
            }
            SpecialBody::DifferentialOutput(s) => {
                vec![(&s.i, Input), (&s.o_p, Output), (&s.o_n, Output)]
            }
            SpecialBody::DdrInput(s) => vec![
                (&s.i, Input),
                (&s.o1, Output),
                (&s.o2, Output),
                (&s.clk, Input),
            ],
            SpecialBody::DdrOutput(s) => vec![
                (&s.i1, Input),
                (&s.i2, Input),
                (&s.o, Output),
                (&s.clk, Input),
            ],
            SpecialBody::Tristate(s) => {
                let mut out = vec![(&s.target, InOut), (&s.o, Input), (&s.oe, Input)];
                out.extend(s.i.iter().map(|e| (e, Output)));
                out
            }
            SpecialBody::Instance(s) => s
                .items
                .iter()
                .filter_map(|item| match item {
                    InstanceItem::Parameter { .. } => None,
                    InstanceItem::Input { expr, .. } => Some((expr, Input)),
                    InstanceItem::Output { expr, .. } => Some((expr, Output)),
                    InstanceItem::InOut { expr, .. } => Some((expr, InOut)),
                })
                .collect(),
            SpecialBody::Memory(m) => m.ports.iter().flat_map(|p| p.expressions()).collect(),
        }
    }

    /// Mutable counterpart of [`expressions`](Self::expressions).
    pub fn expressions_mut(&mut self) -> Vec<(&mut Expr, IoDirection)> {
        use IoDirection::{InOut, Input, Output};
        match &mut self.body {
            SpecialBody::MultiReg(s) => vec![(&mut s.i, Input), (&mut s.o, Output)],
            SpecialBody::PulseSynchronizer(s) => vec![(&mut s.i, Input), (&mut s.o, Output)],
            SpecialBody::BusSynchronizer(s) => vec![(&mut s.i, Input), (&mut s.o, Output)],
            SpecialBody::AsyncResetSynchronizer(s) => vec![
                (&mut s.clock, Input),
                (&mut s.reset, Output),
                (&mut s.async_reset, Input),
            ],
            SpecialBody::DifferentialInput(s) => {
                vec![(&mut s.i_p, Input), (&mut s.i_n, Input), (&mut s.o, Output)]
            }
            SpecialBody::DifferentialOutput(s) => {
                vec![(&mut s.i, Input), (&mut s.o_p, Output), (&mut s.o_n, Output)]
            }
            SpecialBody::DdrInput(s) => vec![
                (&mut s.i, Input),
                (&mut s.o1, Output),
                (&mut s.o2, Output),
                (&mut s.clk, Input),
            ],
            SpecialBody::DdrOutput(s) => vec![
                (&mut s.i1, Input),
                (&mut s.i2, Input),
                (&mut s.o, Output),
                (&mut s.clk, Input),
            ],
            SpecialBody::Tristate(s) => {
                let mut out = vec![
                    (&mut s.target, InOut),
                    (&mut s.o, Input),
                    (&mut s.oe, Input),
                ];
                out.extend(s.i.iter_mut().map(|e| (e, Output)));
                out
            }
            SpecialBody::Instance(s) => s
                .items
                .iter_mut()
                .filter_map(|item| match item {
                    InstanceItem::Parameter { .. } => None,
                    InstanceItem::Input { expr, .. } => Some((expr, Input)),
                    InstanceItem::Output { expr, .. } => Some((expr, Output)),
                    InstanceItem::InOut { expr, .. } => Some((expr, InOut)),
                })
                .collect(),
            SpecialBody::Memory(m) => m
                .ports
                .iter_mut()
                .flat_map(|p| p.expressions_mut())
                .collect(),
        }
    }

    /// Clock domains the special names directly, not through expressions.
    pub fn named_domains(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match &self.body {
            SpecialBody::MultiReg(s) => {
                out.insert(s.odomain.clone());
            }
            SpecialBody::PulseSynchronizer(PulseSynchronizer {
                idomain, odomain, ..
            })
            | SpecialBody::BusSynchronizer(BusSynchronizer {
                idomain, odomain, ..
            }) => {
                out.insert(idomain.clone());
                out.insert(odomain.clone());
            }
            SpecialBody::Memory(m) => out.extend(m.ports.iter().map(|p| p.domain.clone())),
            _ => {}
        }
        out
    }

    /// Renames the directly named domain `old` to `new`.
    ///
    /// Clock and reset expressions are left alone.
    pub fn rename_named_domain(&mut self, old: &str, new: &str) {
        let rename = |d: &mut String| {
            if d == old {
                *d = new.to_string();
            }
        };
        match &mut self.body {
            SpecialBody::MultiReg(s) => rename(&mut s.odomain),
            SpecialBody::PulseSynchronizer(PulseSynchronizer {
                idomain, odomain, ..
            })
            | SpecialBody::BusSynchronizer(BusSynchronizer {
                idomain, odomain, ..
            }) => {
                rename(idomain);
                rename(odomain);
            }
            SpecialBody::Memory(m) => m.ports.iter_mut().for_each(|p| rename(&mut p.domain)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    fn sig(n: u32) -> Expr {
        Expr::Signal(SignalId::from_raw(n))
    }

    fn special(body: impl Into<SpecialBody>) -> Special {
        Special {
            sequence: Sequence::from_raw(0),
            body: body.into(),
        }
    }

    #[test]
    fn kinds_match_bodies() {
        assert_eq!(special(MultiReg::new(sig(0), sig(1), "sys")).kind(), SpecialKind::MultiReg);
        assert_eq!(special(Instance::new("BUFG")).kind(), SpecialKind::Instance);
    }

    #[test]
    fn instance_directions_skip_parameters() {
        let inst = Instance::new("IBUF")
            .param("IOSTANDARD", ParamValue::Str("LVCMOS33".into()))
            .input("I", sig(0))
            .output("O", sig(1))
            .inout("IO", sig(2));
        let s = special(inst);
        let dirs: Vec<_> = s.expressions().into_iter().map(|(_, d)| d).collect();
        assert_eq!(dirs, vec![IoDirection::Input, IoDirection::Output, IoDirection::InOut]);
    }

    #[test]
    fn async_reset_exposes_domain_reset_as_output() {
        let s = special(AsyncResetSynchronizer::new("sys", sig(0)));
        let outputs: Vec<_> = s
            .expressions()
            .into_iter()
            .filter(|(_, d)| *d == IoDirection::Output)
            .map(|(e, _)| e.clone())
            .collect();
        assert_eq!(outputs, vec![Expr::reset("sys")]);
    }

    #[test]
    fn named_domains_and_rename() {
        let mut s = special(PulseSynchronizer {
            i: sig(0),
            o: sig(1),
            idomain: "a".into(),
            odomain: "b".into(),
        });
        assert_eq!(s.named_domains().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        s.rename_named_domain("a", "c");
        assert!(s.named_domains().contains("c"));
    }

    #[test]
    fn expressions_mut_rewrites_in_place() {
        let mut s = special(MultiReg::new(sig(0), sig(1), "sys"));
        for (e, _) in s.expressions_mut() {
            *e = sig(7);
        }
        assert!(s.expressions().iter().all(|(e, _)| **e == sig(7)));
    }
}
