//! Conformance test helpers for the fhdl elaboration pipeline.
//!
//! Provides small building blocks that run a design through the full
//! pipeline (flatten → resolve domains → lower → name → emit) and return the
//! results in a form convenient for assertions in integration tests.

#![warn(missing_docs)]

use fhdl_config::{load_options_from_str, ElabOptions};
use fhdl_ir::{Design, Expr, Fragment, If, Module, Shape, SignalId, SignalSpec};
use fhdl_lower::SpecialOverrides;
use fhdl_verilog::{convert_with, ConvOutput, ConvertError, SpecialEmitters};

/// A design together with the result of converting it.
pub struct Elaborated {
    /// The design after lowering added its helper signals.
    pub design: Design,
    /// The conversion output.
    pub output: ConvOutput,
}

impl Elaborated {
    /// The emitted Verilog.
    pub fn source(&self) -> &str {
        &self.output.main_source
    }

    /// The name the namer assigned to `signal`.
    pub fn name(&self, signal: SignalId) -> &str {
        self.output
            .namer
            .get_name(signal)
            .unwrap_or_else(|e| panic!("signal {signal:?} is unnamed: {e}"))
    }

    /// Whether some line of the source equals `line` once trimmed.
    pub fn has_line(&self, line: &str) -> bool {
        self.source().lines().any(|l| l.trim() == line)
    }

    /// Number of source lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.source().lines().filter(|l| l.contains(needle)).count()
    }
}

/// Parses options from TOML text.
pub fn options(toml: &str) -> ElabOptions {
    load_options_from_str(toml).unwrap_or_else(|e| panic!("bad test options: {e}"))
}

/// Converts `fragment` with default options and the built-in specials.
pub fn elaborate(
    design: Design,
    fragment: Fragment,
    ios: impl IntoIterator<Item = SignalId>,
) -> Result<Elaborated, ConvertError> {
    elaborate_with(
        design,
        fragment,
        ios,
        &ElabOptions::default(),
        &SpecialOverrides::new(),
        &SpecialEmitters::builtin(),
    )
}

/// Converts `fragment` with explicit options, overrides and emitters.
pub fn elaborate_with(
    mut design: Design,
    fragment: Fragment,
    ios: impl IntoIterator<Item = SignalId>,
    options: &ElabOptions,
    overrides: &SpecialOverrides,
    emitters: &SpecialEmitters,
) -> Result<Elaborated, ConvertError> {
    let output = convert_with(&mut design, fragment, ios, options, overrides, emitters)?;
    Ok(Elaborated { design, output })
}

/// Ports of [`counter`].
pub struct Counter {
    /// Counts while high.
    pub enable: SignalId,
    /// The count.
    pub count: SignalId,
    /// High when the count wraps.
    pub wrap: SignalId,
}

/// A free-running counter in the `sys` domain, built under scope `name`.
pub fn counter(design: &mut Design, name: &str, width: u32) -> (Module, Counter) {
    design.scope(name, |d| {
        let enable = d.signal("enable", 1).unwrap();
        let count = d.signal("count", width).unwrap();
        let wrap = d.signal("wrap", 1).unwrap();
        let mut m = Module::new();
        m.sync("sys", If::new(enable, [count.assign(count + 1)]));
        m.comb(wrap.assign(Expr::from(count).cmp_eq((1u64 << width) - 1)));
        (m, Counter { enable, count, wrap })
    })
}

/// An unsigned operand `x` and a signed operand `y` of the given widths.
pub fn mixed_operands(design: &mut Design, xwidth: u32, ywidth: u32) -> (SignalId, SignalId) {
    let x = design.signal("x", xwidth).unwrap();
    let y = design
        .create_signal(SignalSpec::new(Shape::signed(ywidth)).named("y"))
        .unwrap();
    (x, y)
}
