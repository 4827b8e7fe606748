//! # 文档生成模块（document）
//!
//! ## 设计思路
//!
//! 排版决策（放置尺寸）在 `layout` 中计算完成，本模块只负责“把一块图片按给定尺寸
//! 追加到分页文档，并最终序列化为字节”。
//!
//! `DocumentAssembler` 是编排层唯一依赖的接口，具体容器格式可替换；
//! 默认实现 `PdfAssembler` 基于 printpdf。
//!
//! ## 实现思路
//!
//! - 追加按调用顺序进行，单次追加失败返回 `DocumentError::Append`，由调用方记录并跳过。
//! - 序列化消费 assembler 本身，一个实例只产出一份文档。
//! - 文档字节直接返回，落盘由调用方决定。

mod pdf;

use crate::image_handler::ImageAsset;
use crate::layout::Placement;

pub use pdf::PdfAssembler;

/// 文档生成错误。
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// 单个图片块追加失败
    #[error("追加图片块失败: {0}")]
    Append(String),

    /// 文档序列化失败
    #[error("文档序列化失败: {0}")]
    Serialize(String),
}

/// 分页文档写入接口。
pub trait DocumentAssembler {
    /// 追加一个图片块，`placement` 为内容区单位下的目标尺寸。
    fn append_image_block(&mut self, asset: &ImageAsset, placement: Placement) -> Result<(), DocumentError>;

    /// 已成功追加的图片块数量。
    fn block_count(&self) -> usize;

    /// 序列化为文档字节。
    fn serialize(self) -> Result<Vec<u8>, DocumentError>
    where
        Self: Sized;
}
