//! Verilog emission for fhdl designs.
//!
//! [`convert`] takes a fragment tree and the signals to expose as ports and
//! produces one Verilog module:
//! 1. **Flatten** the fragment tree
//! 2. **Resolve** clock domains, creating undeclared ones if allowed
//! 3. **Lower** the fragment with `fhdl_lower`
//! 4. **Name** every signal with `fhdl_namer`, avoiding Verilog keywords
//! 5. **Print** the header, declarations, combinational and synchronous
//!    blocks, then the remaining specials
//!
//! # Usage
//!
//! ```ignore
//! use fhdl_config::ElabOptions;
//! use fhdl_verilog::convert;
//!
//! let output = convert(&mut design, fragment, [a, b, q], &ElabOptions::default())?;
//! output.write(Path::new("build"), "top.v")?;
//! ```

#![warn(missing_docs)]

mod convert;
mod error;
mod expr;
mod module;
mod output;
mod specials;
mod stmt;

pub use convert::{convert, convert_with};
pub use error::{ConvertError, EmitError};
pub use expr::{print_constant, print_signal_decl, ExprPrinter};
pub use output::{ConvOutput, DataFiles};
pub use specials::{
    EmitContext, InstanceEmitter, MemoryEmitter, SpecialEmitter, SpecialEmitters, TristateEmitter,
};
pub use stmt::{AssignMode, StmtPrinter};
