//! Options file loading and validation.

use crate::error::ConfigError;
use crate::types::ElabOptions;
use fhdl_common::{is_identifier, is_keyword};
use std::path::Path;

/// Loads and validates options from a TOML file.
pub fn load_options(path: &Path) -> Result<ElabOptions, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_options_from_str(&content)
}

/// Parses and validates options from a string.
///
/// Every key is optional; an empty string yields the defaults.
pub fn load_options_from_str(content: &str) -> Result<ElabOptions, ConfigError> {
    let options: ElabOptions =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_options(&options)?;
    Ok(options)
}

/// Checks that option values are consistent.
pub fn validate_options(options: &ElabOptions) -> Result<(), ConfigError> {
    if !is_identifier(&options.name) {
        return Err(ConfigError::ValidationError(format!(
            "module name `{}` is not a legal identifier",
            options.name
        )));
    }
    if is_keyword(&options.name) {
        return Err(ConfigError::ValidationError(format!(
            "module name `{}` is a reserved keyword",
            options.name
        )));
    }
    if options.memory.to_array && options.memory.split_depth {
        return Err(ConfigError::ValidationError(
            "memory.to_array replaces memories, memory.split_depth cannot also be set".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrTranslation;
    use std::io::Write;

    #[test]
    fn empty_gives_defaults() {
        let opts = load_options_from_str("").unwrap();
        assert_eq!(opts, ElabOptions::default());
        assert_eq!(opts.name, "top");
        assert!(opts.create_clock_domains);
        assert!(opts.regular_comb);
        assert!(!opts.memory.full_we);
    }

    #[test]
    fn parse_full_options() {
        let toml = r#"
name = "soc"
create_clock_domains = false
reg_initialization = false
regular_comb = false
dummy_signal = false
blocking_assign = true
display_run = true

[attr_translate]
keep = ["keep", "true"]
no_retiming = false

[memory]
full_we = true
split_depth = true
"#;
        let opts = load_options_from_str(toml).unwrap();
        assert_eq!(opts.name, "soc");
        assert!(!opts.create_clock_domains);
        assert!(!opts.reg_initialization);
        assert!(!opts.regular_comb);
        assert!(opts.blocking_assign);
        assert!(opts.display_run);
        let table = opts.attr_translate.as_ref().unwrap();
        assert_eq!(
            table["keep"],
            AttrTranslation::Attr("keep".into(), "true".into())
        );
        assert_eq!(table["no_retiming"], AttrTranslation::Flag(false));
        assert!(opts.memory.full_we && opts.memory.split_depth);
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_options_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn wrong_type_errors() {
        let err = load_options_from_str("regular_comb = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn keyword_name_rejected() {
        let err = load_options_from_str("name = \"module\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn illegal_name_rejected() {
        let err = load_options_from_str("name = \"2fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn conflicting_memory_passes_rejected() {
        let toml = "[memory]\nto_array = true\nsplit_depth = true\n";
        let err = load_options_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"blinky\"").unwrap();
        let opts = load_options(file.path()).unwrap();
        assert_eq!(opts.name, "blinky");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_options(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
