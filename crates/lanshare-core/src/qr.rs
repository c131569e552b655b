//! 二维码生成
//!
//! 把首页地址编码为 PNG，手机扫码即可访问。

use image::{ImageBuffer, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

/// 二维码四周留白（模块数）
const QUIET_ZONE: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("failed to write PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// 生成 PNG 二维码，边长不小于 `min_size` 像素
pub fn encode_png(data: &str, min_size: u32) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)?;
    let modules = code.to_colors();
    let qr_width = code.width();

    let total_modules = qr_width as u32 + 2 * QUIET_ZONE;
    let module_size = min_size.div_ceil(total_modules).max(1);
    let image_size = total_modules * module_size;
    let quiet_pixels = QUIET_ZONE * module_size;

    let mut img: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(image_size, image_size, Luma([255u8]));

    for (idx, color) in modules.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let row = (idx / qr_width) as u32;
        let col = (idx % qr_width) as u32;
        let x_start = quiet_pixels + col * module_size;
        let y_start = quiet_pixels + row * module_size;

        for dy in 0..module_size {
            for dx in 0..module_size {
                img.put_pixel(x_start + dx, y_start + dy, Luma([0u8]));
            }
        }
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
