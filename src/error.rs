//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，作为整条“提取 → 下载 → 排版 → 生成文档”
//! 链路在调用层面的返回类型。
//!
//! 单张图片的失败（下载、解码、尺寸、追加到文档）不会变成 `AppError`：
//! 它们被记录、计数后跳过，最终体现在汇总结果里。真正让整次调用失败的只有
//! 文章地址无效与全部图片下载失败两种情况，其余分支服务于命令行外壳。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为各模块错误提供 `From` 转换，无需手动 map。

use crate::document::DocumentError;
use crate::image_handler::ImageError;
use crate::layout::LayoutError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 文章地址无法解析出协议与主机
    #[error("文章地址无效: {0}")]
    InvalidBaseUrl(String),

    /// 所有候选图片都下载或解码失败
    #[error("所有图片下载失败（共 {attempted} 张）")]
    AllAssetsFailed { attempted: usize },

    /// 图片处理错误（页面下载等调用级场景）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 排版配置错误
    #[error("排版错误: {0}")]
    Layout(#[from] LayoutError),

    /// 文档生成失败
    #[error("文档生成失败: {0}")]
    Document(#[from] DocumentError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读取或解析失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 图片选择参数无效
    #[error("选择参数无效: {0}")]
    Selection(String),
}
