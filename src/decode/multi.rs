//! Linear and matrix barcode recognition with rxing.

use super::{BarcodeDecoder, DecodeConfig, DecodeError, Symbology};
use crate::snapshot::EncodedImage;
use image::imageops::FilterType;
use rxing::BarcodeFormat;

/// In-process decoder for every [`Symbology`].
///
/// Only the configured symbology is searched for. With `locate` off the
/// symbol is expected to cross the middle third of the frame, and only
/// that band is scanned.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiFormatDecoder;

impl MultiFormatDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }
}

fn barcode_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::QrCode => BarcodeFormat::QR_CODE,
    }
}

impl BarcodeDecoder for MultiFormatDecoder {
    fn decode(
        &self,
        image: &EncodedImage,
        config: &DecodeConfig,
    ) -> Result<Option<String>, DecodeError> {
        let mut still = image::load_from_memory(image.bytes())
            .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
        if still.width() > config.max_input_width {
            still = still.resize(config.max_input_width, u32::MAX, FilterType::Triangle);
        }
        if !config.locate && still.height() >= 3 {
            let band = still.height() / 3;
            still = still.crop_imm(0, band, still.width(), band);
        }

        let luma = still.to_luma8();
        let (width, height) = luma.dimensions();
        let format = barcode_format(config.symbology);

        // rxing reports "nothing there" as an error like any other failure.
        match rxing::helpers::detect_in_luma(luma.into_raw(), width, height, Some(format)) {
            Ok(found) => Ok(Some(found.getText().to_string())),
            Err(e) => {
                tracing::debug!(symbology = %config.symbology, "No symbol read: {:?}", e);
                Ok(None)
            }
        }
    }
}
