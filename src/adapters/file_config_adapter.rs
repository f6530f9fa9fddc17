//! INI file configuration adapter.
//!
//! Keys are case-sensitive so indicator keys keep the spelling rules use.
//! Only `#` starts a comment: `;` is the rule separator in strategy files.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

const COMMENT_SYMBOLS: &[char] = &['#'];

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    fn empty() -> Ini {
        let mut config = Ini::new_cs();
        config.set_comment_symbols(COMMENT_SYMBOLS);
        config
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Self::empty();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Self::empty();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    /// Sorted, since the underlying map does not keep file order.
    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
