//! Fixed configuration handed to the decoding collaborator.

use crate::capture::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Barcode symbology the collaborator is asked to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    /// Code 128, used on the inventory's SKU labels.
    #[default]
    Code128,
    /// EAN-13 retail barcodes.
    Ean13,
    /// QR codes.
    QrCode,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Symbology::Code128 => "Code 128",
            Symbology::Ean13 => "EAN-13",
            Symbology::QrCode => "QR code",
        };
        f.write_str(name)
    }
}

/// Decoder settings. One attempt per still, no worker fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// The single symbology to look for.
    pub symbology: Symbology,
    /// Stills wider than this are downscaled before recognition.
    pub max_input_width: u32,
    /// Search the frame for the symbol instead of assuming it fills the frame.
    pub locate: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            symbology: Symbology::Code128,
            max_input_width: 800,
            locate: true,
        }
    }
}

impl DecodeConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_width == 0 {
            return Err(ConfigError::InvalidDecodeWidth);
        }
        Ok(())
    }
}
