//! QR image rendering.
//!
//! Renders a payload into a grayscale PNG QR code. Rendering is a pure
//! function of the payload text and the [`QrSettings`], so re-rendering a
//! stored ticket reproduces the issued artifact byte for byte.

use crate::config::{QrErrorCorrection, QrSettings};
use crate::constants::{MAX_QR_MODULE_SCALE, PNG_DATA_URI_PREFIX};
use crate::error::{Result, TicketError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Luma};
use qrcode::{EcLevel, QrCode};

/// A rendered ticket: PNG bytes of the QR code.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketArtifact {
    png: Vec<u8>,
}

impl TicketArtifact {
    /// Raw PNG bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Consumes the artifact, returning the PNG bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }

    /// The artifact as a `data:image/png;base64,...` URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(&self.png))
    }
}

impl std::fmt::Debug for TicketArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketArtifact")
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Renders payload text into [`TicketArtifact`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketImageEncoder {
    settings: QrSettings,
}

impl TicketImageEncoder {
    /// Create an encoder with the given settings.
    #[must_use]
    pub const fn new(settings: QrSettings) -> Self {
        Self { settings }
    }

    /// The encoder's settings.
    #[must_use]
    pub const fn settings(&self) -> &QrSettings {
        &self.settings
    }

    /// Render `payload` as a PNG QR code.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Encoding`] if the payload exceeds the symbol
    /// capacity at the configured error-correction level, or if PNG encoding
    /// fails.
    pub fn render(&self, payload: &str) -> Result<TicketArtifact> {
        let encoding_error = |reason: String| TicketError::Encoding {
            payload_len: payload.len(),
            reason,
        };

        let code = QrCode::with_error_correction_level(
            payload.as_bytes(),
            ec_level(self.settings.error_correction),
        )
        .map_err(|e| encoding_error(e.to_string()))?;

        let scale = self.settings.module_scale.clamp(1, MAX_QR_MODULE_SCALE);
        let image = code
            .render::<Luma<u8>>()
            .module_dimensions(scale, scale)
            .quiet_zone(self.settings.quiet_zone)
            .build();

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::L8,
            )
            .map_err(|e| encoding_error(e.to_string()))?;

        tracing::debug!(
            payload_len = payload.len(),
            width = image.width(),
            png_bytes = png.len(),
            "Rendered ticket QR code"
        );

        Ok(TicketArtifact { png })
    }
}

const fn ec_level(level: QrErrorCorrection) -> EcLevel {
    match level {
        QrErrorCorrection::Low => EcLevel::L,
        QrErrorCorrection::Medium => EcLevel::M,
        QrErrorCorrection::Quartile => EcLevel::Q,
        QrErrorCorrection::High => EcLevel::H,
    }
}
