//! # 数据模型
//!
//! ## 设计思路
//!
//! 将“下载结果”和“流水线中间结果”解耦：
//! - `RawImageData` 表示已下载但未解码的字节
//! - `ImageAsset` 表示解码校验通过、尺寸已知的图片（创建后不可变）
//! - `EmbeddedImage` 表示可直接写入文档的 RGB 像素数据

use image::ImageFormat;

/// 下载阶段输出：原始字节与来源地址。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源地址（用于日志与诊断）。
    pub(crate) url: String,
}

/// 已成功下载并解码的图片。
///
/// `width` / `height` 始终是原始像素尺寸，排版计算只依赖这两个值。
#[derive(Debug, Clone)]
pub struct ImageAsset {
    url: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    format: ImageFormat,
}

impl ImageAsset {
    pub(crate) fn new(url: String, bytes: Vec<u8>, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            url,
            bytes,
            width,
            height,
            format,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 原始字节（保存到磁盘时原样写出）。
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// 按检测到的格式给出文件扩展名，例如 `jpg` / `png`。
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// 嵌入阶段输出：按放置尺寸与目标 DPI 准备好的 RGB 像素。
pub struct EmbeddedImage {
    /// 像素宽度。
    pub width: u32,
    /// 像素高度。
    pub height: u32,
    /// RGB 字节数组（`width * height * 3`）。
    pub rgb: Vec<u8>,
}
