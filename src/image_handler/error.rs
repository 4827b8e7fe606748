//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 单张图片在“下载 → 校验 → 解码”链路中可能出现的所有失败都收敛到 `ImageError`。
//! 这些错误只影响当前这一张图片：上层记录、计数后跳过，继续处理剩余图片。

/// 单张图片处理错误。
///
/// 批量流程中不会直接向上抛出，而是被收集进 `FetchReport::failures`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("图片尺寸无效：{width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
