//! Lowering passes for fhdl fragments.
//!
//! Turns a flattened fragment into one the Verilog emitter can print
//! directly:
//! 1. **Complex slices**: slices of expressions become slices of proxy signals
//! 2. **Resets**: synchronous blocks get a reset branch
//! 3. **Basics**: arrays become `case` statements, clock and reset references
//!    become domain signals
//! 4. **Specials**: synchronizers and platform primitives are replaced by
//!    overrides or portable implementations
//! 5. **Memories**: optional decomposition by write granule, by depth or into
//!    register arrays
//!
//! # Usage
//!
//! ```ignore
//! use fhdl_lower::{lower_fragment, resolve_clock_domains, SpecialOverrides};
//! resolve_clock_domains(&mut design, &mut fragment, true)?;
//! lower_fragment(&mut design, &mut fragment, &options.memory, &SpecialOverrides::new())?;
//! ```

#![warn(missing_docs)]

mod basics;
mod complex_slices;
mod domains;
mod error;
mod generic;
mod memory;
mod pass;
mod resets;
mod specials;
mod transform;

pub use basics::lower_basics;
pub use complex_slices::lower_complex_slices;
pub use domains::{rename_clock_domain, resolve_clock_domains};
pub use error::LowerError;
pub use memory::{full_memory_we, memory_to_array, split_memory};
pub use pass::{
    lower_fragment, run_passes, standard_passes, BasicPass, ComplexSlicePass, FullMemoryWePass, LoweringPass,
    MemoryToArrayPass, ResetPass, SpecialPass, SplitMemoryPass,
};
pub use resets::{generate_reset, insert_reset, insert_resets};
pub use specials::{is_self_emitting, lower_specials, SpecialOverride, SpecialOverrides};
