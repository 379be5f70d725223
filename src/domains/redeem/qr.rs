use anyhow::{Context, Result};
use image::{DynamicImage, Rgba};
use qrcode::QrCode;
use std::io::Cursor;
use url::Url;

/// Configuración del QR de validación
pub struct QrConfig {
    /// Tamaño máximo del QR en píxeles
    pub size: u32,
    /// Base URL pública del servicio
    pub base_url: String,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            size: 600,
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Builds the validation URL carried by a QR code and renders it to PNG.
pub struct QrRenderer {
    pub config: QrConfig,
}

impl QrRenderer {
    pub fn new(config: QrConfig) -> Self {
        Self { config }
    }

    /// URL the scanner lands on; the token string rides as a query
    /// parameter so it survives URL encoding untouched.
    pub fn validation_url(&self, token: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.base_url)
            .context("Invalid public base URL")?;
        url.set_path("/api/v1/redeem/view");
        url.query_pairs_mut().clear().append_pair("token", token);
        Ok(url.to_string())
    }

    /// PNG bytes of the QR for a token's validation URL.
    pub fn render_png(&self, token: &str) -> Result<Vec<u8>> {
        let url = self.validation_url(token)?;

        let code = QrCode::new(url.as_bytes()).context("Error al crear QR code")?;
        let qr_image = code
            .render::<Rgba<u8>>()
            .max_dimensions(self.config.size, self.config.size)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(qr_image)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .context("Error al escribir imagen PNG")?;

        Ok(buffer.into_inner())
    }
}
