//! Conversion output: the Verilog source, the namer and side files.

use fhdl_common::ContentHash;
use fhdl_namer::Namer;
use std::collections::BTreeMap;
use std::path::Path;

/// Side files requested by specials during emission, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFiles {
    files: BTreeMap<String, String>,
}

impl DataFiles {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `content` under `base`, or `base_<n>` if `base` is taken.
    /// Returns the file name actually used.
    pub fn add(&mut self, base: &str, content: String) -> String {
        let mut name = base.to_string();
        let mut i = 1;
        while self.files.contains_key(&name) {
            name = format!("{base}_{i}");
            i += 1;
        }
        self.files.insert(name.clone(), content);
        name
    }

    /// The content of file `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// All `(name, content)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of [`convert`](crate::convert).
#[derive(Debug, Clone)]
pub struct ConvOutput {
    /// The generated module.
    pub main_source: String,
    /// Names of every signal in the module, for waveform tooling.
    pub namer: Namer,
    /// Files that must be written next to the Verilog source.
    pub data_files: DataFiles,
    /// Hash over the source and every data file.
    pub content_hash: ContentHash,
}

impl ConvOutput {
    pub(crate) fn new(main_source: String, namer: Namer, data_files: DataFiles) -> Self {
        let mut parts: Vec<&[u8]> = vec![main_source.as_bytes()];
        for (name, content) in data_files.iter() {
            parts.push(name.as_bytes());
            parts.push(content.as_bytes());
        }
        let content_hash = ContentHash::from_parts(parts);
        Self {
            main_source,
            namer,
            data_files,
            content_hash,
        }
    }

    /// Writes the source to `dir/filename` and every data file to `dir`.
    pub fn write(&self, dir: &Path, filename: &str) -> std::io::Result<()> {
        std::fs::write(dir.join(filename), &self.main_source)?;
        for (name, content) in self.data_files.iter() {
            std::fs::write(dir.join(name), content)?;
        }
        tracing::debug!(dir = %dir.display(), files = self.data_files.len() + 1, "wrote conversion output");
        Ok(())
    }
}

impl std::fmt::Display for ConvOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.main_source)
    }
}
