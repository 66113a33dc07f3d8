//! The signal-to-name mapping shared by every artifact of a run.

use crate::error::NamerError;
use crate::tree::name_generation;
use fhdl_common::{is_identifier, FhdlResult, InternalError};
use fhdl_ir::{Design, SignalId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// An injective mapping from signals to identifiers.
///
/// Built once over the final signal set with [`Namer::build`]. Reserved
/// words and explicit name overrides share a usage counter with computed
/// names, so a second claimant of a name gets an `_<n>` suffix.
#[derive(Debug, Clone, Default)]
pub struct Namer {
    names: BTreeMap<SignalId, String>,
    counts: HashMap<String, u32>,
    taken: HashSet<String>,
}

impl Namer {
    /// Names `signals`, avoiding every word in `reserved`.
    ///
    /// Signals with a name override are registered first, then all others,
    /// each group in creation order. Ancestors reached through `related`
    /// take part in naming but only the given signals get an entry.
    pub fn build<'a>(
        design: &Design,
        signals: impl IntoIterator<Item = SignalId>,
        reserved: impl IntoIterator<Item = &'a str>,
    ) -> Result<Namer, NamerError> {
        let signals: BTreeSet<SignalId> = signals.into_iter().collect();
        let mut namer = Namer::default();
        for word in reserved {
            namer.counts.insert(word.to_string(), 1);
            namer.taken.insert(word.to_string());
        }

        let computed = hierarchical_names(design, &signals)?;

        let mut order: Vec<SignalId> = signals.into_iter().collect();
        order.sort_by_key(|&id| (design[id].name_override.is_none(), design[id].sequence));
        for id in order {
            let base = match &design[id].name_override {
                Some(name) => name.as_str(),
                None => computed
                    .get(&id)
                    .map(String::as_str)
                    .ok_or_else(|| InternalError::new("signal missing from computed names"))?,
            };
            if !is_identifier(base) {
                return Err(NamerError::InvalidIdentifier { name: base.to_string() });
            }
            let name = namer.allocate(base);
            namer.names.insert(id, name);
        }
        Ok(namer)
    }

    /// The name of `signal`.
    pub fn get_name(&self, signal: SignalId) -> Result<&str, NamerError> {
        self.names
            .get(&signal)
            .map(String::as_str)
            .ok_or(NamerError::SignalNotFound(signal))
    }

    /// Whether `signal` has a name.
    pub fn contains(&self, signal: SignalId) -> bool {
        self.names.contains_key(&signal)
    }

    /// Claims a fresh identifier based on `base` for a non-signal object
    /// such as a memory array or an instance.
    pub fn fresh(&mut self, base: &str) -> String {
        self.allocate(base)
    }

    /// All `(signal, name)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Number of named signals.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no signal is named.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn allocate(&mut self, base: &str) -> String {
        let mut n = self.counts.get(base).copied().unwrap_or(0);
        let name = loop {
            let candidate = if n == 0 { base.to_string() } else { format!("{base}_{n}") };
            if !self.taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.counts.insert(base.to_string(), n + 1);
        self.taken.insert(name.clone());
        name
    }
}

/// Computes the hierarchical name of every signal in `signals`, with each
/// related signal's name prefixed by its parent's.
fn hierarchical_names(design: &Design, signals: &BTreeSet<SignalId>) -> FhdlResult<HashMap<SignalId, String>> {
    let mut generations: Vec<BTreeSet<SignalId>> = Vec::new();
    for &id in signals {
        let chain = lineage(design, id)?;
        for (level, &member) in chain.iter().enumerate() {
            if generations.len() <= level {
                generations.push(BTreeSet::new());
            }
            generations[level].insert(member);
        }
    }

    let mut local: HashMap<SignalId, String> = HashMap::new();
    for (level, members) in generations.iter().enumerate() {
        let members: Vec<SignalId> = members.iter().copied().collect();
        let (names, strategy) = name_generation(design, &members)?;
        tracing::debug!(
            generation = level,
            signals = members.len(),
            strategy = strategy.as_str(),
            "named signal generation"
        );
        local.extend(members.into_iter().zip(names));
    }

    let mut full = HashMap::with_capacity(signals.len());
    for &id in signals {
        let mut name = local
            .get(&id)
            .cloned()
            .ok_or_else(|| InternalError::new("signal missing from its generation"))?;
        let mut cur = id;
        while let Some(parent) = design[cur].related {
            let prefix = local
                .get(&parent)
                .ok_or_else(|| InternalError::new("related signal missing from its generation"))?;
            name = format!("{prefix}_{name}");
            cur = parent;
        }
        full.insert(id, name);
    }
    Ok(full)
}

/// The `related` chain of `id`, root first.
fn lineage(design: &Design, id: SignalId) -> FhdlResult<Vec<SignalId>> {
    let mut chain = vec![id];
    let mut cur = id;
    while let Some(parent) = design[cur].related {
        if chain.len() > design.signals().len() {
            return Err(InternalError::new("cycle in related signals"));
        }
        chain.push(parent);
        cur = parent;
    }
    chain.reverse();
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhdl_common::VERILOG_KEYWORDS;
    use fhdl_ir::SignalSpec;

    fn build(design: &Design, signals: &[SignalId]) -> Namer {
        Namer::build(design, signals.iter().copied(), VERILOG_KEYWORDS.iter().copied()).unwrap()
    }

    #[test]
    fn keywords_get_suffixed() {
        let mut d = Design::new();
        let reg = d.signal("reg", 1).unwrap();
        let wire = d.signal("wire", 1).unwrap();
        let namer = build(&d, &[reg, wire]);
        assert_eq!(namer.get_name(reg).unwrap(), "reg_1");
        assert_eq!(namer.get_name(wire).unwrap(), "wire_1");
    }

    #[test]
    fn overrides_are_used_verbatim() {
        let mut d = Design::new();
        let clk = d.create_signal(SignalSpec::new(1).name_override("sys_clk")).unwrap();
        let data = d.signal("data", 8).unwrap();
        let namer = build(&d, &[clk, data]);
        assert_eq!(namer.get_name(clk).unwrap(), "sys_clk");
        assert_eq!(namer.get_name(data).unwrap(), "data");
    }

    #[test]
    fn override_wins_over_computed_name() {
        let mut d = Design::new();
        let computed = d.signal("led", 1).unwrap();
        let forced = d.create_signal(SignalSpec::new(1).name_override("led")).unwrap();
        let namer = build(&d, &[computed, forced]);
        assert_eq!(namer.get_name(forced).unwrap(), "led");
        assert_eq!(namer.get_name(computed).unwrap(), "led_1");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut d = Design::new();
        let bad = d.create_signal(SignalSpec::new(1).name_override("a b")).unwrap();
        let err = Namer::build(&d, [bad], VERILOG_KEYWORDS.iter().copied()).unwrap_err();
        assert_eq!(err, NamerError::InvalidIdentifier { name: "a b".into() });
    }

    #[test]
    fn invalid_scope_name_is_rejected() {
        let mut d = Design::new();
        let s = d.signal("bad-name", 1).unwrap();
        let err = Namer::build(&d, [s], std::iter::empty()).unwrap_err();
        assert!(matches!(err, NamerError::InvalidIdentifier { .. }));
    }

    #[test]
    fn related_signals_are_prefixed_by_parent() {
        let mut d = Design::new();
        let bus = d.signal("bus", 8).unwrap();
        let valid = d.create_signal(SignalSpec::new(1).named("valid").related(bus)).unwrap();
        let ready = d.create_signal(SignalSpec::new(1).named("ready").related(bus)).unwrap();
        let namer = build(&d, &[bus, valid, ready]);
        assert_eq!(namer.get_name(bus).unwrap(), "bus");
        assert_eq!(namer.get_name(valid).unwrap(), "bus_valid");
        assert_eq!(namer.get_name(ready).unwrap(), "bus_ready");
    }

    #[test]
    fn related_parent_outside_the_set_still_prefixes() {
        let mut d = Design::new();
        let parent = d.scope("phy", |d| d.signal("rx", 1).unwrap());
        let child = d.create_signal(SignalSpec::new(1).named("sync").related(parent)).unwrap();
        let namer = build(&d, &[child]);
        assert_eq!(namer.get_name(child).unwrap(), "rx_sync");
        assert!(!namer.contains(parent));
    }

    #[test]
    fn unknown_signal_is_an_error() {
        let mut d = Design::new();
        let a = d.signal("a", 1).unwrap();
        let b = d.signal("b", 1).unwrap();
        let namer = build(&d, &[a]);
        assert_eq!(namer.get_name(b), Err(NamerError::SignalNotFound(b)));
    }

    #[test]
    fn fresh_names_avoid_signal_names() {
        let mut d = Design::new();
        let mem = d.signal("mem", 8).unwrap();
        let mut namer = build(&d, &[mem]);
        assert_eq!(namer.fresh("mem"), "mem_1");
        assert_eq!(namer.fresh("mem"), "mem_2");
        assert_eq!(namer.fresh("storage"), "storage");
    }

    #[test]
    fn suffix_never_reuses_a_taken_name() {
        let mut d = Design::new();
        let explicit = d.create_signal(SignalSpec::new(1).name_override("reg_1")).unwrap();
        let kw = d.signal("reg", 1).unwrap();
        let namer = build(&d, &[explicit, kw]);
        assert_eq!(namer.get_name(explicit).unwrap(), "reg_1");
        assert_eq!(namer.get_name(kw).unwrap(), "reg_2");
    }

    #[test]
    fn names_are_injective_and_valid() {
        let mut d = Design::new();
        let mut all = Vec::new();
        for _ in 0..3 {
            d.scope("lane", |d| {
                all.push(d.signal("data", 8).unwrap());
                all.push(d.signal("valid", 1).unwrap());
                d.scope("fifo", |d| all.push(d.signal("data", 8).unwrap()));
            });
        }
        all.push(d.signal("data", 8).unwrap());
        all.push(d.create_signal(SignalSpec::new(2)).unwrap());
        all.push(d.create_signal(SignalSpec::new(2)).unwrap());
        let namer = build(&d, &all);
        let names: HashSet<&str> = namer.iter().map(|(_, n)| n).collect();
        assert_eq!(names.len(), all.len());
        for name in names {
            assert!(is_identifier(name), "{name}");
            assert!(!VERILOG_KEYWORDS.contains(&name), "{name}");
        }
    }

    #[test]
    fn repeated_builds_are_identical() {
        let mut d = Design::new();
        let mut all = Vec::new();
        for _ in 0..2 {
            d.scope("sub", |d| all.push(d.signal("x", 1).unwrap()));
        }
        let first: Vec<String> = build(&d, &all).iter().map(|(_, n)| n.to_string()).collect();
        let second: Vec<String> = build(&d, &all).iter().map(|(_, n)| n.to_string()).collect();
        assert_eq!(first, second);
        assert_eq!(first, ["x0", "x1"]);
    }
}
