//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“网络下载 → 字节校验 → 解码 → 嵌入前降采样”按职责拆分为多个子模块，
//! 避免单文件膨胀与耦合。
//!
//! - `handler`：编排批量下载（并发上限、超时、顺序保持）
//! - `loader`：负责 HTTP 下载、重试与安全校验，并定义 `AssetFetcher` 接缝
//! - `pipeline`：负责解码、像素限制、嵌入前降采样
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型，内部细节保持 `mod` 私有。
//! 下载器通过泛型参数注入 `ImageHandler`，测试中可以替换为内存实现。
//!
//! ## 新同事快速上手
//!
//! ```text
//! article::collect
//!    ↓
//! handler.rs（批量编排 + 阶段耗时日志）
//!    ├─ loader.rs（HTTP 下载 + URL/体积/签名校验）
//!    └─ pipeline.rs（解码 + 像素限制）
//!    ↓
//! FetchReport（成功按发现顺序，失败计数）
//!    ↓
//! article::assemble → pipeline.rs（嵌入前降采样）→ document
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 并发、超时、顺序相关问题优先看 `handler.rs`
//! - 单阶段行为优化分别改 `loader/pipeline`

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::{ImageConfig, ImagePerformanceProfile};
pub use error::ImageError;
pub use handler::{FailureStage, FetchFailure, FetchReport, FetchedAsset, ImageHandler, ProcessSummary};
pub use loader::{AssetFetcher, HttpFetcher};
pub use pipeline::prepare_for_embedding;
pub use source::{EmbeddedImage, ImageAsset};
