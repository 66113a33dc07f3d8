//! Memories and their ports.

use crate::expr::Expr;
use crate::ids::SignalId;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Read behavior of a synchronous port during a same-cycle write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortMode {
    /// Read data shows the value being written.
    #[default]
    WriteFirst,
    /// Read data shows the old value.
    ReadFirst,
    /// Read data keeps its previous value while writing.
    NoChange,
}

/// One read and/or write port of a [`Memory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPort {
    /// Word address.
    pub adr: Expr,
    /// Read data.
    pub dat_r: Expr,
    /// Write enable, one bit per granule; `None` for read-only ports.
    pub we: Option<Expr>,
    /// Write data; present iff `we` is.
    pub dat_w: Option<Expr>,
    /// Read enable; `None` reads every cycle.
    pub re: Option<Expr>,
    /// Clock of the owning domain, resolved during lowering.
    pub clock: Expr,
    /// Owning clock domain.
    pub domain: String,
    /// Combinational read.
    pub async_read: bool,
    /// Bits per write-enable line; 0 means the whole word.
    pub we_granularity: u32,
    /// Read-during-write behavior.
    pub mode: PortMode,
}

impl MemoryPort {
    /// Write-enable granularity in bits, treating 0 as the full word width.
    pub fn granularity(&self, width: u32) -> u32 {
        if self.we_granularity == 0 || self.we_granularity >= width {
            width
        } else {
            self.we_granularity
        }
    }

    /// Every expression of the port with its direction relative to the
    /// memory.
    pub fn expressions(&self) -> Vec<(&Expr, crate::special::IoDirection)> {
        use crate::special::IoDirection::{Input, Output};
        let mut out = vec![(&self.adr, Input)];
        out.extend(self.we.iter().map(|e| (e, Input)));
        out.extend(self.dat_w.iter().map(|e| (e, Input)));
        out.extend(self.re.iter().map(|e| (e, Input)));
        out.push((&self.dat_r, Output));
        out.push((&self.clock, Input));
        out
    }

    /// Mutable counterpart of [`expressions`](Self::expressions).
    pub fn expressions_mut(&mut self) -> Vec<(&mut Expr, crate::special::IoDirection)> {
        use crate::special::IoDirection::{Input, Output};
        let mut out = vec![(&mut self.adr, Input)];
        out.extend(self.we.iter_mut().map(|e| (e, Input)));
        out.extend(self.dat_w.iter_mut().map(|e| (e, Input)));
        out.extend(self.re.iter_mut().map(|e| (e, Input)));
        out.push((&mut self.dat_r, Output));
        out.push((&mut self.clock, Input));
        out
    }
}

/// Options for [`Design::memory_port`](crate::design::Design::memory_port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Create `we` and `dat_w`.
    pub write_capable: bool,
    /// Combinational read.
    pub async_read: bool,
    /// Create `re`.
    pub has_re: bool,
    /// Bits per write-enable line; 0 means the whole word.
    pub we_granularity: u32,
    /// Read-during-write behavior.
    pub mode: PortMode,
    /// Owning clock domain.
    pub domain: String,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            write_capable: false,
            async_read: false,
            has_re: false,
            we_granularity: 0,
            mode: PortMode::WriteFirst,
            domain: "sys".to_string(),
        }
    }
}

/// Signals created for a new memory port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSignals {
    /// Address input.
    pub adr: SignalId,
    /// Read data output.
    pub dat_r: SignalId,
    /// Write enable, for write-capable ports.
    pub we: Option<SignalId>,
    /// Write data, for write-capable ports.
    pub dat_w: Option<SignalId>,
    /// Read enable, if requested.
    pub re: Option<SignalId>,
}

/// A named storage array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Base name of the emitted array.
    pub name: String,
    /// Word width in bits.
    pub width: u32,
    /// Number of words.
    pub depth: u32,
    /// Initial contents, word 0 first; missing words are zero.
    pub init: Option<Vec<BigInt>>,
    /// Ports in creation order.
    pub ports: Vec<MemoryPort>,
}

impl Memory {
    /// A memory with no ports.
    pub fn new(name: impl Into<String>, width: u32, depth: u32) -> Self {
        Self {
            name: name.into(),
            width,
            depth,
            init: None,
            ports: Vec::new(),
        }
    }

    /// Sets the initial contents.
    pub fn with_init(mut self, init: impl IntoIterator<Item = BigInt>) -> Self {
        self.init = Some(init.into_iter().collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port() -> MemoryPort {
        MemoryPort {
            adr: Expr::Signal(SignalId::from_raw(0)),
            dat_r: Expr::Signal(SignalId::from_raw(1)),
            we: Some(Expr::Signal(SignalId::from_raw(2))),
            dat_w: Some(Expr::Signal(SignalId::from_raw(3))),
            re: None,
            clock: Expr::clock("sys"),
            domain: "sys".into(),
            async_read: false,
            we_granularity: 8,
            mode: PortMode::ReadFirst,
        }
    }

    #[test]
    fn granularity_defaults_to_width() {
        let mut p = port();
        assert_eq!(p.granularity(32), 8);
        p.we_granularity = 0;
        assert_eq!(p.granularity(32), 32);
        p.we_granularity = 64;
        assert_eq!(p.granularity(32), 32);
    }

    #[test]
    fn port_expression_directions() {
        use crate::special::IoDirection;
        let p = port();
        let dirs: Vec<IoDirection> = p.expressions().into_iter().map(|(_, d)| d).collect();
        assert_eq!(dirs.len(), 5);
        assert_eq!(dirs.iter().filter(|d| **d == IoDirection::Output).count(), 1);
    }

    #[test]
    fn init_is_recorded() {
        let m = Memory::new("mem", 8, 4).with_init([1, 2].map(BigInt::from));
        assert_eq!(m.init.as_ref().map(Vec::len), Some(2));
    }
}
