//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中性能档位（quality / balanced / speed）作为高层语义，映射到嵌入文档时的
//! 像素密度与缩放滤镜。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `ImagePerformanceProfile` 负责档位字符串解析与反向输出。
//! - `apply_performance_profile` 将档位转换为具体阈值。
//! - `infer_performance_profile` 用于从当前配置反推档位（命令行输出当前状态）。

use image::imageops::FilterType;

use super::ImageError;

/// 图片处理配置。
///
/// 字段覆盖了下载、解码、并发与嵌入文档四个阶段。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 下载原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 单次 HTTP 请求超时时间（秒）。整次抓取（含重试）的上限由此推算。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载分块读取超时时间（毫秒），实际取值不超过单次请求超时。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 同时进行中的下载数量上限。
    pub max_concurrent_fetches: usize,
    /// 嵌入文档时的目标像素密度（DPI）。超出部分会被降采样。
    pub embed_dpi: f64,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 10,
            connect_timeout: 8,
            stream_chunk_timeout_ms: 5_000,
            max_redirects: 5,
            max_decoded_pixels: 40_000_000,
            max_concurrent_fetches: 4,
            embed_dpi: 200.0,
            resize_filter: FilterType::Triangle,
        }
    }
}

/// 图片性能档位（面向用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与体积平衡
/// - `Speed`：优先生成速度与文档体积
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl ImagePerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use article_image_docs::image_handler::ImagePerformanceProfile;
    ///
    /// let p = ImagePerformanceProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), article_image_docs::image_handler::ImageError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ImageConfig {
    /// 基于当前参数反推性能档位。
    pub fn infer_performance_profile(&self) -> ImagePerformanceProfile {
        if self.embed_dpi >= 300.0 {
            return ImagePerformanceProfile::Quality;
        }

        if self.embed_dpi <= 150.0 {
            return ImagePerformanceProfile::Speed;
        }

        ImagePerformanceProfile::Balanced
    }

    /// 应用指定性能档位到实际参数。
    pub fn apply_performance_profile(&mut self, profile: ImagePerformanceProfile) {
        match profile {
            ImagePerformanceProfile::Quality => {
                self.embed_dpi = 300.0;
                self.resize_filter = FilterType::Lanczos3;
            }
            ImagePerformanceProfile::Balanced => {
                self.embed_dpi = 200.0;
                self.resize_filter = FilterType::Triangle;
            }
            ImagePerformanceProfile::Speed => {
                self.embed_dpi = 120.0;
                self.resize_filter = FilterType::Nearest;
            }
        }
    }
}
