//! The design arena: signals, creation order and construction scopes.
//!
//! A [`Design`] replaces stack introspection with an explicit tracer. Code
//! that builds hardware opens named scopes with [`Design::scope`]; every
//! signal created inside records the open scopes and its own leaf name, and
//! that backtrace is what the namer later turns into a readable identifier.

use crate::arena::Arena;
use crate::bits;
use crate::error::IrError;
use crate::expr::Expr;
use crate::fragment::ClockDomain;
use crate::ids::{Sequence, SignalId};
use crate::memory::{Memory, MemoryPort, PortConfig, PortSignals};
use crate::shape::{Constant, Shape};
use crate::signal::{BacktraceEntry, Signal, SignalSpec};
use crate::special::{Special, SpecialBody};
use crate::tracer::{remove_underscore, Tracer, DEFAULT_LEAF_NAME};
use fhdl_common::{Ident, Interner};
use std::ops::Index;

/// Owns every signal of a design plus the state used to name them.
#[derive(Debug, Default)]
pub struct Design {
    signals: Arena<SignalId, Signal>,
    interner: Interner,
    tracer: Tracer,
    next_sequence: u64,
}

impl Design {
    /// An empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next creation-order key.
    pub fn next_sequence(&mut self) -> Sequence {
        let seq = Sequence::from_raw(self.next_sequence);
        self.next_sequence += 1;
        seq
    }

    /// All signals, in creation order.
    pub fn signals(&self) -> &Arena<SignalId, Signal> {
        &self.signals
    }

    /// The signal with the given ID.
    pub fn get(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Mutable access to a signal's attributes.
    pub fn get_mut(&mut self, id: SignalId) -> &mut Signal {
        &mut self.signals[id]
    }

    /// The identifier interner used for backtrace names.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Interns a name.
    pub fn intern(&mut self, name: &str) -> Ident {
        self.interner.get_or_intern(name)
    }

    /// Resolves a backtrace name.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    /// Creates a signal from a spec, tracing it under the open scopes.
    pub fn create_signal(&mut self, spec: SignalSpec) -> Result<SignalId, IrError> {
        let leaf = spec.name.as_deref().unwrap_or(DEFAULT_LEAF_NAME);
        if spec.shape.width == 0 {
            return Err(IrError::ZeroWidth {
                name: leaf.to_string(),
            });
        }
        let leaf = self.interner.get_or_intern(remove_underscore(leaf));
        let backtrace = self.tracer.trace(leaf);
        let sequence = self.next_sequence();
        let signal = Signal {
            sequence,
            shape: spec.shape,
            reset: Constant::with_shape(spec.reset, spec.shape),
            reset_less: spec.reset_less,
            variable: spec.variable,
            name_override: spec.name_override,
            backtrace,
            related: spec.related,
            attrs: spec.attrs,
        };
        Ok(self.signals.alloc(signal))
    }

    /// Creates a plain signal.
    pub fn signal(&mut self, name: &str, shape: impl Into<Shape>) -> Result<SignalId, IrError> {
        self.create_signal(SignalSpec::new(shape).named(name))
    }

    /// Creates a signal with the shape, reset and flags of `other`.
    pub fn signal_like(&mut self, other: SignalId, name: &str) -> Result<SignalId, IrError> {
        let src = &self.signals[other];
        let mut spec = SignalSpec::new(src.shape)
            .named(name)
            .reset(src.reset.value().clone());
        spec.reset_less = src.reset_less;
        spec.variable = src.variable;
        spec.attrs = src.attrs.clone();
        self.create_signal(spec)
    }

    /// Creates a signal holding values of `expr`'s shape.
    pub fn signal_for(&mut self, expr: &Expr, spec: SignalSpec) -> Result<SignalId, IrError> {
        let shape = self.shape_of(expr)?;
        self.create_signal(SignalSpec { shape, ..spec })
    }

    /// Runs `f` with a new instance of scope `name` open.
    pub fn scope<R>(&mut self, name: &str, f: impl FnOnce(&mut Design) -> R) -> R {
        self.enter_scope(name);
        let r = f(self);
        self.exit_scope();
        r
    }

    /// Opens a new instance of scope `name`.
    pub fn enter_scope(&mut self, name: &str) -> BacktraceEntry {
        let ident = self.interner.get_or_intern(remove_underscore(name));
        self.tracer.enter(ident)
    }

    /// Re-opens an existing scope instance.
    pub fn reenter_scope(&mut self, entry: BacktraceEntry) {
        self.tracer.reenter(entry);
    }

    /// Closes the innermost scope.
    pub fn exit_scope(&mut self) -> Option<BacktraceEntry> {
        self.tracer.exit()
    }

    /// Creates a clock domain with `<name>_clk` and `<name>_rst` signals.
    ///
    /// A leading `cd_` is stripped from `name`.
    pub fn clock_domain(&mut self, name: &str, reset_less: bool) -> Result<ClockDomain, IrError> {
        let name = name.strip_prefix("cd_").unwrap_or(name).to_string();
        let clk = self.create_signal(SignalSpec::new(1).name_override(format!("{name}_clk")))?;
        let rst = if reset_less {
            None
        } else {
            Some(self.create_signal(SignalSpec::new(1).name_override(format!("{name}_rst")))?)
        };
        Ok(ClockDomain { name, clk, rst })
    }

    /// Stamps a special with the next creation-order key.
    pub fn special(&mut self, body: impl Into<SpecialBody>) -> Special {
        Special {
            sequence: self.next_sequence(),
            body: body.into(),
        }
    }

    /// Adds a port to `memory`, creating its signals inside a scope named
    /// after the memory.
    pub fn memory_port(&mut self, memory: &mut Memory, config: PortConfig) -> Result<PortSignals, IrError> {
        let granularity = if config.we_granularity >= memory.width {
            0
        } else {
            config.we_granularity
        };
        let scope = memory.name.clone();
        let (depth, width) = (memory.depth, memory.width);
        let signals = self.scope(&scope, |d| -> Result<PortSignals, IrError> {
            let adr = d.signal("adr", Shape::for_max(u64::from(depth))?)?;
            let dat_r = d.signal("dat_r", width)?;
            let (we, dat_w) = if config.write_capable {
                let we_width = if granularity == 0 { 1 } else { width / granularity };
                (Some(d.signal("we", we_width)?), Some(d.signal("dat_w", width)?))
            } else {
                (None, None)
            };
            let re = if config.has_re {
                Some(d.signal("re", 1)?)
            } else {
                None
            };
            Ok(PortSignals {
                adr,
                dat_r,
                we,
                dat_w,
                re,
            })
        })?;
        memory.ports.push(MemoryPort {
            adr: signals.adr.into(),
            dat_r: signals.dat_r.into(),
            we: signals.we.map(Expr::from),
            dat_w: signals.dat_w.map(Expr::from),
            re: signals.re.map(Expr::from),
            clock: Expr::clock(config.domain.clone()),
            domain: config.domain,
            async_read: config.async_read,
            we_granularity: granularity,
            mode: config.mode,
        });
        Ok(signals)
    }

    /// Infers the shape of an expression.
    pub fn shape_of(&self, expr: &Expr) -> Result<Shape, IrError> {
        bits::value_shape(expr, &self.signals)
    }

    /// The backtrace of a signal as resolved `(name, index)` pairs.
    pub fn backtrace_names(&self, id: SignalId) -> Vec<(&str, u32)> {
        self.signals[id]
            .backtrace
            .iter()
            .map(|e| (self.interner.resolve(e.name), e.index))
            .collect()
    }
}

impl Index<SignalId> for Design {
    type Output = Signal;

    fn index(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn signals_get_increasing_sequences() {
        let mut d = Design::new();
        let a = d.signal("a", 4).unwrap();
        let s = d.special(crate::special::Instance::new("X"));
        let b = d.signal("b", 4).unwrap();
        assert!(d[a].sequence < s.sequence);
        assert!(s.sequence < d[b].sequence);
    }

    #[test]
    fn backtrace_records_scopes() {
        let mut d = Design::new();
        let x = d.scope("top", |d| d.scope("uart", |d| d.signal("tx", 1).unwrap()));
        assert_eq!(d.backtrace_names(x), vec![("top", 0), ("uart", 0), ("tx", 0)]);
    }

    #[test]
    fn scope_instances_are_numbered() {
        let mut d = Design::new();
        let a = d.scope("sub", |d| d.signal("sig", 1).unwrap());
        let b = d.scope("sub", |d| d.signal("sig", 1).unwrap());
        assert_eq!(d.backtrace_names(a), vec![("sub", 0), ("sig", 0)]);
        assert_eq!(d.backtrace_names(b), vec![("sub", 1), ("sig", 1)]);
    }

    #[test]
    fn anonymous_signals_use_default_leaf() {
        let mut d = Design::new();
        let s = d.create_signal(SignalSpec::new(3)).unwrap();
        assert_eq!(d.backtrace_names(s), vec![("sig", 0)]);
    }

    #[test]
    fn leading_underscore_is_stripped() {
        let mut d = Design::new();
        let s = d.signal("_count", 3).unwrap();
        assert_eq!(d.backtrace_names(s), vec![("count", 0)]);
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut d = Design::new();
        assert!(matches!(d.signal("z", 0), Err(IrError::ZeroWidth { .. })));
    }

    #[test]
    fn reset_wraps_to_shape() {
        let mut d = Design::new();
        let s = d.create_signal(SignalSpec::new(4).reset(-1)).unwrap();
        assert_eq!(d[s].reset.value(), &BigInt::from(15));
    }

    #[test]
    fn clock_domain_naming() {
        let mut d = Design::new();
        let cd = d.clock_domain("cd_pix", false).unwrap();
        assert_eq!(cd.name, "pix");
        assert_eq!(d[cd.clk].name_override.as_deref(), Some("pix_clk"));
        let rst = cd.rst.unwrap();
        assert_eq!(d[rst].name_override.as_deref(), Some("pix_rst"));
        assert!(d.clock_domain("sys", true).unwrap().rst.is_none());
    }

    #[test]
    fn memory_port_signals() {
        let mut d = Design::new();
        let mut mem = Memory::new("mem", 32, 12);
        let cfg = PortConfig {
            write_capable: true,
            has_re: true,
            we_granularity: 8,
            ..PortConfig::default()
        };
        let p = d.memory_port(&mut mem, cfg).unwrap();
        assert_eq!(d[p.adr].shape, Shape::unsigned(4));
        assert_eq!(d[p.we.unwrap()].shape, Shape::unsigned(4));
        assert!(p.re.is_some());
        assert_eq!(mem.ports.len(), 1);
        assert_eq!(mem.ports[0].we_granularity, 8);
        assert_eq!(d.backtrace_names(p.dat_r)[0], ("mem", 0));
    }

    #[test]
    fn signal_like_copies_shape_and_reset() {
        let mut d = Design::new();
        let a = d
            .create_signal(SignalSpec::new(Shape::signed(6)).reset(-3).reset_less())
            .unwrap();
        let b = d.signal_like(a, "b").unwrap();
        assert_eq!(d[b].shape, Shape::signed(6));
        assert_eq!(d[b].reset.value(), &BigInt::from(-3));
        assert!(d[b].reset_less);
    }
}
