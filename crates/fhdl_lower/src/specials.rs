//! Special lowering and platform overrides.
//!
//! Lowering is iterative: a lowered special may produce new specials (a bus
//! synchronizer produces pulse synchronizers, which produce register
//! chains), so passes repeat until only self-emitting specials remain.

use crate::complex_slices::lower_complex_slices;
use crate::error::LowerError;
use crate::generic;
use crate::resets::insert_resets;
use fhdl_ir::{Design, Fragment, Sequence, Special, SpecialKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Platform-specific lowering for one kind of special.
pub trait SpecialOverride {
    /// Returns the fragment that replaces `special`.
    fn lower(&self, design: &mut Design, special: &Special) -> Result<Fragment, LowerError>;
}

impl<F> SpecialOverride for F
where
    F: Fn(&mut Design, &Special) -> Result<Fragment, LowerError>,
{
    fn lower(&self, design: &mut Design, special: &Special) -> Result<Fragment, LowerError> {
        self(design, special)
    }
}

/// Overrides keyed by special kind.
#[derive(Default)]
pub struct SpecialOverrides {
    map: BTreeMap<SpecialKind, Box<dyn SpecialOverride>>,
}

impl SpecialOverrides {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `imp` for `kind`, replacing any earlier registration.
    pub fn register(&mut self, kind: SpecialKind, imp: impl SpecialOverride + 'static) -> &mut Self {
        self.map.insert(kind, Box::new(imp));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: SpecialKind, imp: impl SpecialOverride + 'static) -> Self {
        self.register(kind, imp);
        self
    }

    /// The override registered for `kind`.
    pub fn get(&self, kind: SpecialKind) -> Option<&dyn SpecialOverride> {
        self.map.get(&kind).map(|b| b.as_ref())
    }

    /// Whether `kind` has an override.
    pub fn contains(&self, kind: SpecialKind) -> bool {
        self.map.contains_key(&kind)
    }
}

impl fmt::Debug for SpecialOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

/// Whether the emitter prints `kind` itself when no override lowers it.
pub fn is_self_emitting(kind: SpecialKind) -> bool {
    matches!(kind, SpecialKind::Memory | SpecialKind::Instance | SpecialKind::Tristate)
}

fn is_lowerable(special: &Special, overrides: &SpecialOverrides) -> bool {
    overrides.contains(special.kind()) || !is_self_emitting(special.kind())
}

/// Replaces every lowerable special by its implementation until none is
/// left. Returns the number of specials lowered.
///
/// Specials are lowered in creation order. The fragment an implementation
/// produces gets its complex slices lowered and resets inserted against the
/// enclosing fragment's clock domains before it is merged; arrays and clock
/// references are left for the following basic lowering.
pub fn lower_specials(
    design: &mut Design,
    fragment: &mut Fragment,
    overrides: &SpecialOverrides,
) -> Result<usize, LowerError> {
    let domains = fragment.clock_domains.clone();
    let mut lowered: BTreeSet<Sequence> = BTreeSet::new();
    loop {
        fragment.specials.sort_by_key(|s| s.sequence);
        let (pending, kept): (Vec<Special>, Vec<Special>) = std::mem::take(&mut fragment.specials)
            .into_iter()
            .partition(|s| is_lowerable(s, overrides) && !lowered.contains(&s.sequence));
        fragment.specials = kept;
        if pending.is_empty() {
            break;
        }
        for special in pending {
            let kind = special.kind();
            let mut generated = match overrides.get(kind) {
                Some(imp) => imp.lower(design, &special)?,
                None => generic::lower(design, &special)?,
            };
            lower_complex_slices(design, &mut generated)?;
            insert_resets(design, &mut generated, &domains);
            tracing::debug!(%kind, sequence = special.sequence.as_raw(), "lowered special");
            lowered.insert(special.sequence);
            fragment.merge(generated);
        }
    }
    Ok(lowered.len())
}
