//! Compiler configuration.
//!
//! Defaults can be overlaid from a TOML file (`--config`), then overridden
//! by command-line flags.

use serde::Deserialize;

/// Effective configuration used by the driver.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Emit the XML parse-tree dump instead of VM code.
    pub xml: bool,
    /// Echo each produced artifact to standard output as well.
    pub tee: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_xml(mut self, xml: bool) -> Self {
        self.xml = xml;
        self
    }

    pub fn with_tee(mut self, tee: bool) -> Self {
        self.tee = tee;
        self
    }

    /// Overlay settings from a config file; absent keys keep their
    /// current values.
    pub fn merge(&mut self, file: FileConfig) {
        if let Some(xml) = file.xml {
            self.xml = xml;
        }
        if let Some(tee) = file.tee {
            self.tee = tee;
        }
    }
}

/// Raw shape of a TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub xml: Option<bool>,
    pub tee: Option<bool>,
}

impl FileConfig {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid config file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::new();
        assert!(!config.xml);
        assert!(!config.tee);
    }

    #[test]
    fn test_merge_overlays_present_keys_only() {
        let mut config = CompilerConfig::new().with_tee(true);
        config.merge(FileConfig::from_toml("xml = true\n").unwrap());
        assert!(config.xml);
        assert!(config.tee, "absent key must not reset an earlier value");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = FileConfig::from_toml("emit_ast = true\n").unwrap_err();
        assert!(err.contains("invalid config file"), "{}", err);
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::new().with_xml(true).with_tee(true);
        assert!(config.xml && config.tee);
    }
}
