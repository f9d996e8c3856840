//! QR recognition with rqrr.

use super::{BarcodeDecoder, DecodeConfig, DecodeError, Symbology};
use crate::snapshot::EncodedImage;
use image::imageops::FilterType;

/// In-process QR decoder.
///
/// Only [`Symbology::QrCode`] is supported; any other configured symbology
/// is reported as unsupported, which the adapter treats as a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(
        &self,
        image: &EncodedImage,
        config: &DecodeConfig,
    ) -> Result<Option<String>, DecodeError> {
        if config.symbology != Symbology::QrCode {
            return Err(DecodeError::Unsupported(config.symbology));
        }

        let mut still = image::load_from_memory(image.bytes())
            .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
        if still.width() > config.max_input_width {
            still = still.resize(config.max_input_width, u32::MAX, FilterType::Triangle);
        }

        let mut prepared = rqrr::PreparedImage::prepare(still.to_luma8());
        let grids = prepared.detect_grids();
        tracing::trace!(grids = grids.len(), "QR grids detected");

        // Without localization the symbol is assumed to fill the frame,
        // so only the dominant grid is worth decoding.
        let candidates = if config.locate { grids.len() } else { grids.len().min(1) };
        for grid in grids.iter().take(candidates) {
            match grid.decode() {
                Ok((_meta, content)) => return Ok(Some(content)),
                Err(e) => tracing::debug!("QR grid failed to decode: {:?}", e),
            }
        }
        Ok(None)
    }
}
