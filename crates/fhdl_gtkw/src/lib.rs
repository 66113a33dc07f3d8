//! GTKWave save files for fhdl designs.
//!
//! Traces reference signals by the names the [`fhdl_namer::Namer`] of a
//! conversion assigned, so a save file written from
//! `ConvOutput::namer` stays valid for the
//! dump of that module.
//!
//! # Usage
//!
//! ```ignore
//! use fhdl_gtkw::GtkwSave;
//!
//! let mut save = GtkwSave::new(&design, &output.namer).dumpfile("top.vcd");
//! save.add(clk)?.add(counter)?;
//! save.add_group("fifo", |name| name.starts_with("fifo"), true)?;
//! save.write(Path::new("top.gtkw"))?;
//! ```

#![warn(missing_docs)]

mod error;
mod save;

pub use error::GtkwError;
pub use save::{Base, GtkwSave, TraceStyle};
