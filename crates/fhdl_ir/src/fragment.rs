//! Fragments: the unit of elaborated design.

use crate::ids::SignalId;
use crate::special::Special;
use crate::stmt::Statement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// A named clock and optional reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Domain name.
    pub name: String,
    /// Clock signal.
    pub clk: SignalId,
    /// Synchronous reset, absent for reset-less domains.
    pub rst: Option<SignalId>,
}

/// Combinational and per-domain synchronous statements, specials, clock
/// domains and nested fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Combinational statements.
    pub comb: Vec<Statement>,
    /// Synchronous statements keyed by domain name.
    pub sync: BTreeMap<String, Vec<Statement>>,
    /// Specials, unique by sequence.
    pub specials: Vec<Special>,
    /// Declared clock domains.
    pub clock_domains: Vec<ClockDomain>,
    /// Nested fragments, folded in by [`flatten`](Fragment::flatten).
    pub subfragments: Vec<Fragment>,
}

impl Fragment {
    /// An empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends combinational statements.
    pub fn add_comb(&mut self, stmts: impl IntoIterator<Item = Statement>) {
        self.comb.extend(stmts);
    }

    /// Appends synchronous statements to `domain`.
    pub fn add_sync(&mut self, domain: impl Into<String>, stmts: impl IntoIterator<Item = Statement>) {
        self.sync.entry(domain.into()).or_default().extend(stmts);
    }

    /// Adds a special unless one with the same sequence is already present.
    pub fn add_special(&mut self, special: Special) {
        if !self.specials.iter().any(|s| s.sequence == special.sequence) {
            self.specials.push(special);
        }
    }

    /// Concatenates `other` into this fragment.
    pub fn merge(&mut self, other: Fragment) {
        self.comb.extend(other.comb);
        for (domain, stmts) in other.sync {
            self.sync.entry(domain).or_default().extend(stmts);
        }
        for special in other.specials {
            self.add_special(special);
        }
        self.clock_domains.extend(other.clock_domains);
        self.subfragments.extend(other.subfragments);
    }

    /// Folds every nested fragment into this one, depth first.
    pub fn flatten(mut self) -> Fragment {
        let subs = std::mem::take(&mut self.subfragments);
        for sub in subs {
            self.merge(sub.flatten());
        }
        self
    }

    /// The declared clock domain called `name`.
    pub fn clock_domain(&self, name: &str) -> Option<&ClockDomain> {
        self.clock_domains.iter().find(|cd| cd.name == name)
    }

    /// Specials in creation order.
    pub fn sorted_specials(&self) -> Vec<&Special> {
        let mut out: Vec<&Special> = self.specials.iter().collect();
        out.sort_by_key(|s| s.sequence);
        out
    }

    /// Whether the fragment holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.comb.is_empty()
            && self.sync.values().all(Vec::is_empty)
            && self.specials.is_empty()
            && self.clock_domains.is_empty()
            && self.subfragments.iter().all(Fragment::is_empty)
    }
}

impl AddAssign for Fragment {
    fn add_assign(&mut self, other: Fragment) {
        self.merge(other);
    }
}

impl Add for Fragment {
    type Output = Fragment;

    fn add(mut self, other: Fragment) -> Fragment {
        self.merge(other);
        self
    }
}
