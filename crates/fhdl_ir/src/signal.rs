//! Signals: named, typed bit-vector value cells.

use crate::ids::{Sequence, SignalId};
use crate::shape::{Constant, Shape};
use fhdl_common::Ident;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One step of a signal's construction backtrace: a scope or leaf name and
/// the instance number it had when the signal was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BacktraceEntry {
    /// Scope or variable name.
    pub name: Ident,
    /// Per-name instance number.
    pub index: u32,
}

/// Value of a raw Verilog attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    /// Printed unquoted.
    Int(i64),
    /// Printed as a quoted string.
    Str(String),
}

/// A synthesis attribute attached to a signal.
///
/// Tags order before raw pairs, which is the order they are printed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalAttr {
    /// A toolchain-independent tag such as `keep` or `no_retiming`,
    /// translated at emission time.
    Tag(String),
    /// A literal `name = value` attribute passed through verbatim.
    Pair {
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: AttrValue,
    },
}

impl SignalAttr {
    /// Shorthand for [`SignalAttr::Tag`].
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }
}

/// A signal stored in the design arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Creation-order key.
    pub sequence: Sequence,
    /// Width and signedness.
    pub shape: Shape,
    /// Value taken on reset, wrapped to `shape`.
    pub reset: Constant,
    /// Excluded from reset insertion.
    pub reset_less: bool,
    /// Assigned with blocking assignments inside clocked blocks.
    pub variable: bool,
    /// Name used verbatim instead of the computed hierarchical name.
    pub name_override: Option<String>,
    /// Scopes open at creation time followed by the signal's own leaf.
    pub backtrace: Vec<BacktraceEntry>,
    /// Naming lineage: this signal is named under `related`'s name.
    pub related: Option<SignalId>,
    /// Synthesis attributes.
    pub attrs: BTreeSet<SignalAttr>,
}

/// Everything needed to create a [`Signal`] except the tracer state.
#[derive(Debug, Clone)]
pub struct SignalSpec {
    pub(crate) name: Option<String>,
    pub(crate) shape: Shape,
    pub(crate) reset: BigInt,
    pub(crate) reset_less: bool,
    pub(crate) variable: bool,
    pub(crate) name_override: Option<String>,
    pub(crate) related: Option<SignalId>,
    pub(crate) attrs: BTreeSet<SignalAttr>,
}

impl SignalSpec {
    /// A spec for an anonymous signal of the given shape.
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            name: None,
            shape: shape.into(),
            reset: BigInt::from(0),
            reset_less: false,
            variable: false,
            name_override: None,
            related: None,
            attrs: BTreeSet::new(),
        }
    }

    /// Sets the leaf name recorded in the backtrace.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the reset value.
    pub fn reset(mut self, value: impl Into<BigInt>) -> Self {
        self.reset = value.into();
        self
    }

    /// Excludes the signal from reset insertion.
    pub fn reset_less(mut self) -> Self {
        self.reset_less = true;
        self
    }

    /// Marks the signal as a variable.
    pub fn variable(mut self) -> Self {
        self.variable = true;
        self
    }

    /// Forces the emitted name.
    pub fn name_override(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Names the signal under another signal's name.
    pub fn related(mut self, parent: SignalId) -> Self {
        self.related = Some(parent);
        self
    }

    /// Adds a synthesis attribute.
    pub fn attr(mut self, attr: SignalAttr) -> Self {
        self.attrs.insert(attr);
        self
    }
}
