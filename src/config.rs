//! Preprocessing and decoding limits, loadable from a YAML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a terminal literal is split into sub-tokens before gen/copy routing.
///
/// The two dataset-construction passes of the reference pipeline disagreed
/// on this, so it is a per-deployment choice rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizationPolicy {
    /// Split on the `-SP-` separator marker, re-emitting the marker between
    /// fragments so that concatenating the sub-tokens reproduces the
    /// literal exactly.
    #[default]
    SeparatorSplit,
    /// Treat the whole literal as a single token.
    WholeString,
}

/// Limits and policies shared by encoding, decoding, and preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bounded prefix of the input query visible to copy actions; a copy
    /// source index is only valid in `[0, max_query_length)`.
    pub max_query_length: usize,
    /// Serialized action sequences are truncated to this many steps by the
    /// batching layer.
    pub max_example_action_num: usize,
    /// Cap on the annotation (query) vocabulary.
    pub annot_vocab_size: usize,
    /// Cap on the terminal (sub-token) vocabulary.
    pub terminal_vocab_size: usize,
    pub tokenization: TokenizationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_query_length: 70,
            max_example_action_num: 100,
            annot_vocab_size: 5980,
            terminal_vocab_size: 4830,
            tokenization: TokenizationPolicy::default(),
        }
    }
}

impl Config {
    /// Loads a config from a YAML file, validating the limits.
    pub fn load(path: &Path) -> Result<Config, crate::VyakaError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::VyakaError::io(format!("reading {}", path.display()), e))?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| crate::VyakaError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), crate::VyakaError> {
        if self.max_query_length == 0 {
            return Err(crate::VyakaError::config("max_query_length must be positive"));
        }
        if self.max_example_action_num == 0 {
            return Err(crate::VyakaError::config(
                "max_example_action_num must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tokenization, TokenizationPolicy::SeparatorSplit);
    }

    #[test]
    fn yaml_round_trip() {
        let config = Config {
            max_query_length: 50,
            tokenization: TokenizationPolicy::WholeString,
            ..Config::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_yaml::from_str::<Config>("max_query_len: 3\n");
        assert!(err.is_err());
    }

    #[test]
    fn zero_limits_fail_validation() {
        let config = Config {
            max_query_length: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
