//! The save-file builder.

use crate::error::GtkwError;
use fhdl_ir::{Design, SignalId};
use fhdl_namer::Namer;
use std::path::Path;

const TR_HEX: u32 = 0x2;
const TR_DEC: u32 = 0x4;
const TR_BIN: u32 = 0x8;
const TR_RJUSTIFY: u32 = 0x20;
const TR_BLANK: u32 = 0x200;
const TR_SIGNED: u32 = 0x400;
const TR_COLLAPSED: u32 = 0x1000;
const TR_CLOSED: u32 = 0x40_0000;
const TR_GRP_BEGIN: u32 = 0x80_0000;
const TR_GRP_END: u32 = 0x100_0000;

/// Number base of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Hexadecimal.
    Hex,
    /// Decimal, signed for signed signals.
    Dec,
    /// Binary.
    Bin,
}

/// Display options of one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceStyle {
    /// Base; hex for buses and binary for single bits when unset.
    pub base: Option<Base>,
    /// GTKWave color index.
    pub color: Option<u8>,
    /// Name shown instead of the signal name.
    pub alias: Option<String>,
}

/// Builds a `.gtkw` file whose traces use the names of a [`Namer`].
///
/// Traces are written in the order they are added. Every trace references
/// `<prefix><name>`, with `[msb:0]` appended for buses, so the prefix must
/// match the hierarchy path of the module in the dump.
pub struct GtkwSave<'a> {
    design: &'a Design,
    namer: &'a Namer,
    prefix: String,
    dumpfile: Option<String>,
    savefile: Option<String>,
    body: String,
    traces: usize,
}

impl<'a> GtkwSave<'a> {
    /// A save file for a module dumped under `top.`.
    pub fn new(design: &'a Design, namer: &'a Namer) -> Self {
        Self {
            design,
            namer,
            prefix: "top.".to_string(),
            dumpfile: None,
            savefile: None,
            body: String::new(),
            traces: 0,
        }
    }

    /// Sets the hierarchy prefix of every trace, `top.` by default.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the waveform file GTKWave opens.
    pub fn dumpfile(mut self, path: impl Into<String>) -> Self {
        self.dumpfile = Some(path.into());
        self
    }

    /// Sets the path GTKWave saves changes to.
    pub fn savefile(mut self, path: impl Into<String>) -> Self {
        self.savefile = Some(path.into());
        self
    }

    /// Adds a trace for `signal` with the default style.
    pub fn add(&mut self, signal: SignalId) -> Result<&mut Self, GtkwError> {
        self.add_styled(signal, &TraceStyle::default())
    }

    /// Adds a trace for `signal`.
    pub fn add_styled(&mut self, signal: SignalId, style: &TraceStyle) -> Result<&mut Self, GtkwError> {
        let name = self.namer.get_name(signal)?;
        let shape = self.design[signal].shape;
        let mut path = format!("{}{name}", self.prefix);
        if shape.width > 1 {
            path.push_str(&format!("[{}:0]", shape.width - 1));
        }
        let base = style.base.unwrap_or(if shape.width > 1 { Base::Hex } else { Base::Bin });
        let flags = TR_RJUSTIFY
            | match base {
                Base::Hex => TR_HEX,
                Base::Bin => TR_BIN,
                Base::Dec if shape.signed => TR_DEC | TR_SIGNED,
                Base::Dec => TR_DEC,
            };
        if let Some(color) = style.color {
            self.body.push_str(&format!("[color] {color}\n"));
        }
        self.body.push_str(&format!("@{flags:x}\n"));
        match &style.alias {
            Some(alias) => self.body.push_str(&format!("+{{{alias}}} {path}\n")),
            None => self.body.push_str(&format!("{path}\n")),
        }
        self.traces += 1;
        Ok(self)
    }

    /// Adds a group named `name` holding every named signal whose name
    /// satisfies `filter`, in creation order. Returns the number of traces
    /// added; an empty group is not written.
    pub fn add_group(
        &mut self,
        name: &str,
        filter: impl Fn(&str) -> bool,
        closed: bool,
    ) -> Result<usize, GtkwError> {
        let members: Vec<SignalId> = self
            .namer
            .iter()
            .filter(|(_, n)| filter(n))
            .map(|(id, _)| id)
            .collect();
        if members.is_empty() {
            tracing::debug!(group = name, "skipped empty trace group");
            return Ok(0);
        }
        self.group(name, closed, |save| {
            for &id in &members {
                save.add(id)?;
            }
            Ok(())
        })?;
        Ok(members.len())
    }

    /// Wraps the traces added by `f` in a group.
    pub fn group(
        &mut self,
        name: &str,
        closed: bool,
        f: impl FnOnce(&mut Self) -> Result<(), GtkwError>,
    ) -> Result<(), GtkwError> {
        let closed_flags = if closed { TR_CLOSED } else { 0 };
        self.body.push_str(&format!("@{:x}\n-{name}\n", TR_BLANK | TR_GRP_BEGIN | closed_flags));
        f(self)?;
        let end = TR_BLANK | TR_GRP_END | if closed { TR_CLOSED | TR_COLLAPSED } else { 0 };
        self.body.push_str(&format!("@{end:x}\n-{name}\n"));
        Ok(())
    }

    /// The save file text.
    pub fn finish(&self) -> String {
        let mut r = String::from("[*]\n[*] Machine-generated using fhdl\n[*]\n");
        if let Some(dumpfile) = &self.dumpfile {
            r.push_str(&format!("[dumpfile] \"{dumpfile}\"\n"));
        }
        if let Some(savefile) = &self.savefile {
            r.push_str(&format!("[savefile] \"{savefile}\"\n"));
        }
        r.push_str("[timestart] 0\n");
        if !self.prefix.is_empty() {
            r.push_str(&format!("[treeopen] {}\n", self.prefix));
        }
        r.push_str(&self.body);
        r
    }

    /// Writes the save file to `path`.
    pub fn write(&self, path: &Path) -> Result<(), GtkwError> {
        std::fs::write(path, self.finish())?;
        tracing::debug!(path = %path.display(), traces = self.traces, "wrote gtkw save file");
        Ok(())
    }
}
