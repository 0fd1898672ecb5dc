// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders pairing codes into a scannable image.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

use hookwire_core::HookwireError;

/// Prefix of every rendered pairing artifact.
pub const QR_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

/// Renders `code` as a QR SVG wrapped in a data URL.
pub fn render_data_url(code: &str) -> Result<String, HookwireError> {
    let qr = QrCode::new(code.as_bytes())
        .map_err(|e| HookwireError::protocol(format!("failed to encode pairing code: {e}")))?;
    let image = qr
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build();
    Ok(format!("{QR_DATA_URL_PREFIX}{}", STANDARD.encode(image)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg_data_url() {
        let url = render_data_url("2@AbCdEf,1234567890,abcdef==").unwrap();
        let body = url.strip_prefix(QR_DATA_URL_PREFIX).expect("prefix");
        let svg = String::from_utf8(STANDARD.decode(body).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn different_codes_render_differently() {
        assert_ne!(render_data_url("a").unwrap(), render_data_url("b").unwrap());
    }
}
