//! Option types deserialized from TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one attribute tag is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrTranslation {
    /// Emit `name = "value"`.
    Attr(String, String),
    /// `true` emits `tag = "true"`; `false` drops the tag.
    Flag(bool),
}

/// Which memory decomposition passes run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryOptions {
    /// Split memories by write-enable granule.
    pub full_we: bool,
    /// Split memories whose depth is not a power of two.
    pub split_depth: bool,
    /// Replace memories by register arrays.
    pub to_array: bool,
}

/// Options of one elaboration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElabOptions {
    /// Name of the emitted module.
    pub name: String,
    /// Synthesize undeclared clock domains instead of failing.
    pub create_clock_domains: bool,
    /// Emit reset values as register initializers.
    pub reg_initialization: bool,
    /// Kick simulation-style combinational blocks with a dummy event.
    pub dummy_signal: bool,
    /// Use blocking assignments in simulation-style combinational blocks.
    pub blocking_assign: bool,
    /// Group combinational statements by target instead of one block per
    /// target.
    pub regular_comb: bool,
    /// Print a `$display` line from every simulation-style block.
    pub display_run: bool,
    /// Attribute tag translation; absent means every tag passes through.
    pub attr_translate: Option<BTreeMap<String, AttrTranslation>>,
    /// Memory decomposition passes.
    pub memory: MemoryOptions,
}

impl Default for ElabOptions {
    fn default() -> Self {
        Self {
            name: "top".to_string(),
            create_clock_domains: true,
            reg_initialization: true,
            dummy_signal: true,
            blocking_assign: false,
            regular_comb: true,
            display_run: false,
            attr_translate: None,
            memory: MemoryOptions::default(),
        }
    }
}

/// Result of looking up an attribute tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrLookup {
    /// Render as `name = "value"`.
    Emit(String, String),
    /// Drop the tag.
    Suppressed,
    /// The translation table has no entry for the tag.
    Unknown,
}

impl ElabOptions {
    /// Translates an attribute tag.
    pub fn translate_attr(&self, tag: &str) -> AttrLookup {
        let Some(table) = &self.attr_translate else {
            return AttrLookup::Emit(tag.to_string(), "true".to_string());
        };
        match table.get(tag) {
            Some(AttrTranslation::Attr(name, value)) => AttrLookup::Emit(name.clone(), value.clone()),
            Some(AttrTranslation::Flag(true)) => AttrLookup::Emit(tag.to_string(), "true".to_string()),
            Some(AttrTranslation::Flag(false)) => AttrLookup::Suppressed,
            None => AttrLookup::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_table() {
        let opts = ElabOptions::default();
        assert_eq!(
            opts.translate_attr("keep"),
            AttrLookup::Emit("keep".into(), "true".into())
        );
    }

    #[test]
    fn table_lookup() {
        let mut table = BTreeMap::new();
        table.insert(
            "keep".to_string(),
            AttrTranslation::Attr("dont_touch".into(), "yes".into()),
        );
        table.insert("no_retiming".to_string(), AttrTranslation::Flag(false));
        table.insert("async_reg".to_string(), AttrTranslation::Flag(true));
        let opts = ElabOptions {
            attr_translate: Some(table),
            ..ElabOptions::default()
        };
        assert_eq!(
            opts.translate_attr("keep"),
            AttrLookup::Emit("dont_touch".into(), "yes".into())
        );
        assert_eq!(opts.translate_attr("no_retiming"), AttrLookup::Suppressed);
        assert_eq!(
            opts.translate_attr("async_reg"),
            AttrLookup::Emit("async_reg".into(), "true".into())
        );
        assert_eq!(opts.translate_attr("mystery"), AttrLookup::Unknown);
    }
}
