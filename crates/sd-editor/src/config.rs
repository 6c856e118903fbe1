//! Editor tuning knobs.

use sd_core::GroupLayout;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("historyLimit must be at least 1")]
    ZeroHistory,
    #[error("pasteOffset must be a finite number")]
    PasteOffset,
}

/// Settings for one editing session. Every field has a default, so a
/// partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Undo snapshots kept, current state included.
    pub history_limit: usize,
    /// Offsets applied around new groups.
    pub group: GroupLayout,
    /// How far pasted components are nudged right and down, in pixels.
    pub paste_offset: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            group: GroupLayout::default(),
            paste_offset: 20.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        if config.history_limit == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if !config.paste_offset.is_finite() {
            return Err(ConfigError::PasteOffset);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{ "historyLimit": 5, "group": { "padding": 8 } }"#)
            .unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.group.padding, 8.0);
        assert_eq!(config.group.header_height, 0.0);
        assert_eq!(config.paste_offset, 20.0);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
        assert!(matches!(EditorConfig::from_json("42"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_history_is_rejected() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "historyLimit": 0 }"#),
            Err(ConfigError::ZeroHistory)
        ));
    }
}
