//! 页面排版计算模块
//!
//! 该模块实现“单页内容区”的核心几何算法：给定图片原始像素尺寸与固定的页面内容区，
//! 计算保持宽高比、完整放入内容区、且尽可能大的放置尺寸。
//!
//! # 设计思路
//!
//! - 算法纯函数化：输入为原始尺寸与内容区，输出唯一放置尺寸，便于测试。
//! - 先按宽度铺满，再检查高度是否越界，越界则改为按高度铺满。
//! - 对异常输入（零尺寸、负尺寸、非有限值）返回错误，而不是静默回退。
//! - 只接受原始解码尺寸，不接受预览缩略图尺寸，避免多次取整误差累积。
//!
//! 单位与内容区一致（默认厘米）。

use serde::{Deserialize, Serialize};

/// 排版计算错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("图片尺寸无效：{width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("页面内容区无效：{width}x{height}")]
    InvalidContentArea { width: f64, height: f64 },
}

/// 页面几何配置（单位：厘米）。
///
/// 默认 A4 纵向，四边各 1 厘米边距。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 21.0,
            page_height: 29.7,
            margin_top: 1.0,
            margin_bottom: 1.0,
            margin_left: 1.0,
            margin_right: 1.0,
        }
    }
}

impl PageGeometry {
    /// 页面尺寸减去边距后的可打印区域。
    ///
    /// 边距吃掉整页时返回 `InvalidContentArea`。
    pub fn content_area(&self) -> Result<ContentArea, LayoutError> {
        ContentArea::new(
            self.page_width - self.margin_left - self.margin_right,
            self.page_height - self.margin_top - self.margin_bottom,
        )
    }
}

/// 页面内容区（整次运行固定不变）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentArea {
    width: f64,
    height: f64,
}

impl ContentArea {
    pub fn new(width: f64, height: f64) -> Result<Self, LayoutError> {
        if !is_positive(width) || !is_positive(height) {
            return Err(LayoutError::InvalidContentArea { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// 单张图片的放置尺寸。
///
/// 后置条件：
/// - `width <= area.width` 且 `height <= area.height`
/// - 至少一个维度等于内容区对应边
/// - `height / width == 原始高 / 原始宽`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
}

/// 计算图片在内容区中的最大等比放置尺寸。
///
/// # 实现步骤
/// 1. 校验原始尺寸（宽、高都必须为正的有限值）
/// 2. 计算 `aspect = 高 / 宽`
/// 3. 先按内容区宽度铺满，得到候选高度
/// 4. 候选高度超出内容区时，改为按内容区高度铺满，反推宽度
///
/// # 示例
/// ```rust
/// use article_image_docs::layout::{fit, ContentArea};
///
/// let area = ContentArea::new(19.0, 27.7)?;
/// let placement = fit(800.0, 2000.0, area)?;
/// assert!((placement.height - 27.7).abs() < 1e-9);
/// assert!((placement.width - 11.08).abs() < 1e-9);
/// # Ok::<(), article_image_docs::layout::LayoutError>(())
/// ```
pub fn fit(native_width: f64, native_height: f64, area: ContentArea) -> Result<Placement, LayoutError> {
    if !is_positive(native_width) || !is_positive(native_height) {
        return Err(LayoutError::InvalidDimensions {
            width: native_width,
            height: native_height,
        });
    }

    let aspect = native_height / native_width;

    // 优先铺满宽度
    let mut target_width = area.width;
    let mut target_height = area.width * aspect;

    // 高度越界则改为铺满高度
    if target_height > area.height {
        target_height = area.height;
        target_width = area.height / aspect;
    }

    Ok(Placement {
        width: target_width,
        height: target_height,
    })
}

/// 以像素尺寸为输入的便捷入口。
pub fn fit_pixels(width: u32, height: u32, area: ContentArea) -> Result<Placement, LayoutError> {
    fit(width as f64, height as f64, area)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
