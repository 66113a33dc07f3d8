//! Builder for composing fragments from submodules.

use crate::fragment::{ClockDomain, Fragment};
use crate::special::Special;
use crate::stmt::Statement;

/// Accumulates statements, specials, clock domains and submodules.
///
/// Every method returns the builder so calls can be chained.
#[derive(Debug, Default, Clone)]
pub struct Module {
    fragment: Fragment,
}

impl Module {
    /// An empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a combinational statement.
    pub fn comb(&mut self, stmt: impl Into<Statement>) -> &mut Self {
        self.fragment.comb.push(stmt.into());
        self
    }

    /// Adds several combinational statements.
    pub fn comb_all(&mut self, stmts: impl IntoIterator<Item = Statement>) -> &mut Self {
        self.fragment.add_comb(stmts);
        self
    }

    /// Adds a synchronous statement to `domain`.
    pub fn sync(&mut self, domain: &str, stmt: impl Into<Statement>) -> &mut Self {
        self.fragment.add_sync(domain, [stmt.into()]);
        self
    }

    /// Adds several synchronous statements to `domain`.
    pub fn sync_all(&mut self, domain: &str, stmts: impl IntoIterator<Item = Statement>) -> &mut Self {
        self.fragment.add_sync(domain, stmts);
        self
    }

    /// Adds a special.
    pub fn add_special(&mut self, special: Special) -> &mut Self {
        self.fragment.add_special(special);
        self
    }

    /// Declares a clock domain.
    pub fn add_clock_domain(&mut self, cd: ClockDomain) -> &mut Self {
        self.fragment.clock_domains.push(cd);
        self
    }

    /// Nests another module.
    pub fn add_submodule(&mut self, sub: Module) -> &mut Self {
        self.fragment.subfragments.push(sub.into_fragment());
        self
    }

    /// Nests a prebuilt fragment.
    pub fn add_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.fragment.subfragments.push(fragment);
        self
    }

    /// The accumulated fragment, submodules nested.
    pub fn into_fragment(self) -> Fragment {
        self.fragment
    }
}

impl From<Module> for Fragment {
    fn from(m: Module) -> Self {
        m.into_fragment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;
    use crate::stmt::If;

    fn sig(n: u32) -> SignalId {
        SignalId::from_raw(n)
    }

    #[test]
    fn chained_building() {
        let mut sub = Module::new();
        sub.comb(sig(2).assign(sig(3)));
        let mut top = Module::new();
        top.comb(sig(0).assign(1))
            .sync("sys", If::new(sig(0), [sig(1).assign(sig(1) + 1)]))
            .add_submodule(sub);
        let f = top.into_fragment();
        assert_eq!(f.comb.len(), 1);
        assert_eq!(f.sync["sys"].len(), 1);
        assert_eq!(f.subfragments.len(), 1);
        assert_eq!(f.flatten().comb.len(), 2);
    }
}
