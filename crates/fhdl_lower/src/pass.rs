//! Lowering pass runner and pass trait.
//!
//! Provides the [`LoweringPass`] trait and [`run_passes`], which applies a
//! pass list in order. [`standard_passes`] builds the list used to prepare
//! a fragment for Verilog emission.

use crate::basics::lower_basics;
use crate::complex_slices::lower_complex_slices;
use crate::error::LowerError;
use crate::memory::{full_memory_we, memory_to_array, split_memory};
use crate::resets::insert_resets;
use crate::specials::{lower_specials, SpecialOverrides};
use fhdl_config::MemoryOptions;
use fhdl_ir::{Design, Fragment};

/// A single rewrite of a flattened fragment.
pub trait LoweringPass {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the pass, returning `true` if it changed the fragment.
    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError>;
}

/// Slices of non-signals become slices of proxy signals.
pub struct ComplexSlicePass;

impl LoweringPass for ComplexSlicePass {
    fn name(&self) -> &'static str {
        "complex-slices"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        Ok(lower_complex_slices(design, fragment)? > 0)
    }
}

/// Synchronous blocks get a reset branch.
pub struct ResetPass;

impl LoweringPass for ResetPass {
    fn name(&self) -> &'static str {
        "resets"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        let domains = fragment.clock_domains.clone();
        Ok(insert_resets(design, fragment, &domains) > 0)
    }
}

/// Arrays and clock/reset references are lowered.
pub struct BasicPass;

impl LoweringPass for BasicPass {
    fn name(&self) -> &'static str {
        "basics"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        let before = fragment.clone();
        lower_basics(design, fragment)?;
        Ok(*fragment != before)
    }
}

/// Specials are replaced by overrides or generic implementations.
pub struct SpecialPass<'a> {
    /// Platform overrides, consulted before the generic lowering.
    pub overrides: &'a SpecialOverrides,
}

impl LoweringPass for SpecialPass<'_> {
    fn name(&self) -> &'static str {
        "specials"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        Ok(lower_specials(design, fragment, self.overrides)? > 0)
    }
}

/// Memories with partial write enables are split per granule.
pub struct FullMemoryWePass;

impl LoweringPass for FullMemoryWePass {
    fn name(&self) -> &'static str {
        "memory-full-we"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        Ok(full_memory_we(design, fragment)? > 0)
    }
}

/// Memories are split into power-of-two parts.
pub struct SplitMemoryPass;

impl LoweringPass for SplitMemoryPass {
    fn name(&self) -> &'static str {
        "memory-split"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        Ok(split_memory(design, fragment)? > 0)
    }
}

/// Memories become register arrays.
pub struct MemoryToArrayPass;

impl LoweringPass for MemoryToArrayPass {
    fn name(&self) -> &'static str {
        "memory-to-array"
    }

    fn run(&self, design: &mut Design, fragment: &mut Fragment) -> Result<bool, LowerError> {
        Ok(memory_to_array(design, fragment)? > 0)
    }
}

/// The pass list that prepares a flattened fragment with resolved clock
/// domains for emission.
///
/// The order is: complex slices, resets, basics, specials, basics, then the
/// enabled memory rewrites followed by another round of complex slices and
/// basics.
pub fn standard_passes<'a>(memory: &MemoryOptions, overrides: &'a SpecialOverrides) -> Vec<Box<dyn LoweringPass + 'a>> {
    let mut passes: Vec<Box<dyn LoweringPass + 'a>> = vec![
        Box::new(ComplexSlicePass),
        Box::new(ResetPass),
        Box::new(BasicPass),
        Box::new(SpecialPass { overrides }),
        Box::new(BasicPass),
    ];
    let mut memory_passes: Vec<Box<dyn LoweringPass + 'a>> = Vec::new();
    if memory.full_we {
        memory_passes.push(Box::new(FullMemoryWePass));
    }
    if memory.split_depth {
        memory_passes.push(Box::new(SplitMemoryPass));
    }
    if memory.to_array {
        memory_passes.push(Box::new(MemoryToArrayPass));
    }
    if !memory_passes.is_empty() {
        passes.extend(memory_passes);
        passes.push(Box::new(ComplexSlicePass));
        passes.push(Box::new(BasicPass));
    }
    passes
}

/// Runs `passes` in order, stopping at the first error.
pub fn run_passes(design: &mut Design, fragment: &mut Fragment, passes: &[Box<dyn LoweringPass + '_>]) -> Result<(), LowerError> {
    for pass in passes {
        let changed = pass.run(design, fragment)?;
        tracing::debug!(pass = pass.name(), changed, "lowering pass finished");
    }
    Ok(())
}

/// Runs [`standard_passes`] on `fragment`.
pub fn lower_fragment(
    design: &mut Design,
    fragment: &mut Fragment,
    memory: &MemoryOptions,
    overrides: &SpecialOverrides,
) -> Result<(), LowerError> {
    let passes = standard_passes(memory, overrides);
    run_passes(design, fragment, &passes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhdl_ir::{visit, Expr, MultiReg, Statement};

    fn names(passes: &[Box<dyn LoweringPass + '_>]) -> Vec<&'static str> {
        passes.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn default_pipeline_order() {
        let overrides = SpecialOverrides::new();
        let passes = standard_passes(&MemoryOptions::default(), &overrides);
        assert_eq!(
            names(&passes),
            vec!["complex-slices", "resets", "basics", "specials", "basics"]
        );
    }

    #[test]
    fn memory_passes_are_followed_by_cleanup() {
        let overrides = SpecialOverrides::new();
        let memory = MemoryOptions {
            full_we: true,
            split_depth: true,
            to_array: false,
        };
        let passes = standard_passes(&memory, &overrides);
        assert_eq!(
            names(&passes)[5..],
            ["memory-full-we", "memory-split", "complex-slices", "basics"]
        );
    }

    #[test]
    fn pipeline_leaves_only_plain_constructs() {
        let mut d = Design::new();
        let mut f = Fragment::new();
        f.clock_domains.push(d.clock_domain("sys", false).unwrap());
        f.clock_domains.push(d.clock_domain("pix", false).unwrap());
        let sel = d.signal("sel", 1).unwrap();
        let a = d.signal("a", 4).unwrap();
        let b = d.signal("b", 4).unwrap();
        let o = d.signal("o", 4).unwrap();
        f.add_sync("sys", [a.assign((Expr::from(a) + 1).slice(0, 4).unwrap())]);
        f.add_comb([b.assign(Expr::array([a, o], sel).unwrap())]);
        f.add_special(d.special(MultiReg::new(a, o, "pix")));

        lower_fragment(&mut d, &mut f, &MemoryOptions::default(), &SpecialOverrides::new()).unwrap();
        assert!(f.specials.is_empty());
        let mut leftovers = 0;
        for stmt in f.comb.iter().chain(f.sync.values().flatten()) {
            visit::for_each_expr(stmt, &mut |e, _| {
                e.walk(&mut |n| match n {
                    Expr::ArrayProxy { .. } | Expr::ClockSignal(_) | Expr::ResetSignal { .. } => leftovers += 1,
                    Expr::Slice { value, .. } if !matches!(**value, Expr::Signal(_)) => leftovers += 1,
                    _ => {}
                })
            });
        }
        assert_eq!(leftovers, 0);
        assert!(matches!(f.sync["sys"][0], Statement::If { .. }));
    }
}
