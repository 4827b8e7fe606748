//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 解码阶段（`decode_asset`）：
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限快速拒绝，拒绝零尺寸
//! 3. 完整解码一次，确认数据完整
//! 4. 记录原始尺寸，保留原始字节
//!
//! 嵌入阶段（`prepare_for_embedding`）：
//! 1. 解码并把透明像素合成到白底
//! 2. 按放置尺寸与目标 DPI 算出所需像素，超出时降采样（只缩不放）
//! 3. 输出 RGB 字节，并校验长度一致性

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::source::{EmbeddedImage, ImageAsset, RawImageData};
use super::{ImageConfig, ImageError};
use crate::layout::Placement;

const CM_PER_INCH: f64 = 2.54;

/// 将下载得到的原始字节解码校验为 `ImageAsset`。
pub(crate) fn decode_asset(raw: RawImageData, config: &ImageConfig) -> Result<ImageAsset, ImageError> {
    let format: ImageFormat = image::guess_format(&raw.bytes)
        .map_err(|e| ImageError::Decode(format!("不支持的图片格式：{}", e)))?;

    let (header_width, header_height) = inspect_dimensions_from_memory(&raw.bytes)?;
    validate_dimensions(header_width, header_height)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory_with_format(&raw.bytes, format)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    validate_dimensions(width, height)?;

    log::info!(
        "✅ 图片解码成功 - 格式: {:?} 尺寸: {}x{} 大小: {}KB",
        format,
        width,
        height,
        raw.bytes.len() / 1024
    );

    Ok(ImageAsset::new(raw.url, raw.bytes, width, height, format))
}

/// 为写入文档准备像素数据。
///
/// 放置尺寸由原始尺寸计算得出；这里只决定嵌入多少像素。
pub fn prepare_for_embedding(
    asset: &ImageAsset,
    placement: Placement,
    config: &ImageConfig,
) -> Result<EmbeddedImage, ImageError> {
    let decoded = image::load_from_memory_with_format(asset.bytes(), asset.format())
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    let flattened = flatten_on_white(&decoded);
    let (width, height) = flattened.dimensions();
    validate_dimensions(width, height)?;

    let (target_width, target_height) = embed_pixel_size(width, height, placement, config.embed_dpi);
    let prepared = if target_width < width {
        downscale(flattened, target_width, target_height, config.resize_filter)
    } else {
        flattened
    };

    let (out_width, out_height) = prepared.dimensions();
    let rgb = prepared.into_raw();

    let expected_len = (out_width as usize)
        .checked_mul(out_height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

    if rgb.len() != expected_len {
        return Err(ImageError::Decode("解码后像素数据长度异常".to_string()));
    }

    Ok(EmbeddedImage {
        width: out_width,
        height: out_height,
        rgb,
    })
}

/// 按放置宽度与 DPI 计算需要的像素尺寸，不超过原始尺寸。
fn embed_pixel_size(width: u32, height: u32, placement: Placement, dpi: f64) -> (u32, u32) {
    if !(dpi.is_finite() && dpi > 0.0) {
        return (width, height);
    }

    let needed_width = (placement.width / CM_PER_INCH * dpi).ceil();
    if !needed_width.is_finite() || needed_width >= width as f64 {
        return (width, height);
    }

    let target_width = (needed_width as u32).max(1);
    let scaled_height = (height as u64 * target_width as u64 + width as u64 / 2) / width as u64;
    let target_height = (scaled_height as u32).max(1);
    (target_width, target_height)
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

/// 透明像素按 alpha 合成到白底；不透明图片直接转换。
fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn downscale(
    image: RgbImage,
    target_width: u32,
    target_height: u32,
    filter: image::imageops::FilterType,
) -> RgbImage {
    log::info!(
        "🧩 嵌入前降采样：{}x{} -> {}x{}（filter={:?}）",
        image.width(),
        image.height(),
        target_width,
        target_height,
        filter
    );

    match resize_with_fast_image_resize(&image, target_width, target_height, filter) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::imageops::resize：{}", err);
            image::imageops::resize(&image, target_width, target_height, filter)
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbImage,
    target_width: u32,
    target_height: u32,
    filter: image::imageops::FilterType,
) -> Result<RgbImage, ImageError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
    match filter {
        image::imageops::FilterType::Nearest => fr::FilterType::Box,
        image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
        image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
        image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
        image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn raw(bytes: Vec<u8>) -> RawImageData {
        RawImageData {
            bytes,
            url: "https://x.com/a.png".to_string(),
        }
    }

    #[test]
    fn decode_keeps_original_dimensions_and_bytes() {
        let png = create_png_bytes(1200, 800);
        let asset = decode_asset(raw(png.clone()), &ImageConfig::default()).expect("decode should succeed");

        assert_eq!((asset.width(), asset.height()), (1200, 800));
        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!(asset.extension(), "png");
        assert_eq!(asset.bytes(), png.as_slice());
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        let result = decode_asset(raw(b"definitely not an image".to_vec()), &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let mut png = create_png_bytes(64, 64);
        png.truncate(png.len() / 2);

        let result = decode_asset(raw(png), &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn stress_rejects_too_many_pixels() {
        let mut config = ImageConfig::default();
        config.max_decoded_pixels = 1_000;

        let result = decode_asset(raw(create_png_bytes(100, 100)), &config);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn embedding_downscales_to_placement_dpi() {
        let asset = decode_asset(raw(create_png_bytes(2000, 1000)), &ImageConfig::default())
            .expect("decode should succeed");
        let mut config = ImageConfig::default();
        config.embed_dpi = 100.0;

        // 19cm @ 100dpi ≈ 749px
        let placement = Placement { width: 19.0, height: 9.5 };
        let embedded = prepare_for_embedding(&asset, placement, &config).expect("embedding failed");

        assert_eq!(embedded.width, 749);
        assert_eq!(embedded.height, 375);
        assert_eq!(embedded.rgb.len(), (embedded.width * embedded.height * 3) as usize);
    }

    #[test]
    fn embedding_never_upscales() {
        let asset = decode_asset(raw(create_png_bytes(40, 30)), &ImageConfig::default())
            .expect("decode should succeed");
        let placement = Placement { width: 19.0, height: 14.25 };

        let embedded = prepare_for_embedding(&asset, placement, &ImageConfig::default())
            .expect("embedding failed");

        assert_eq!((embedded.width, embedded.height), (40, 30));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = ImageBuffer::from_pixel(2, 2, Rgba([0u8, 0, 0, 0]));
        let flattened = flatten_on_white(&DynamicImage::ImageRgba8(img));

        assert_eq!(flattened.get_pixel(0, 0).0, [255, 255, 255]);
    }
}
