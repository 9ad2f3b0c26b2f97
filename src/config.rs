//! Command-line configuration for the `restaurant` binary.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::huffman::WeightMode;

pub const USAGE: &str = "<input_file> [--weights=preserve|recompute]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Command stream to replay.
    pub input_file: PathBuf,

    /// How huffman rotations treat node weights.
    pub weight_mode: WeightMode,
}

impl Config {
    /// Parses the arguments that follow the program name.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut input_file = None;
        let mut weight_mode = WeightMode::default();

        for arg in args {
            if let Some(value) = arg.strip_prefix("--weights=") {
                weight_mode = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidWeightMode(value.to_string()))?;
            } else if arg.starts_with("--") || input_file.is_some() {
                return Err(ConfigError::UnknownArgument(arg.clone()));
            } else {
                input_file = Some(PathBuf::from(arg));
            }
        }

        Ok(Config {
            input_file: input_file.ok_or(ConfigError::MissingInput)?,
            weight_mode,
        })
    }
}
