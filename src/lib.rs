//! # 文章图片排版工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  命令行 (cli)                             │
//! │   参数 + 设置文件 → 下载页面 → 打印列表 → 保存 / 生成文档 │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ article ──── collect / assemble 两段编排              │
//! │  │                                                       │
//! │  ├─ extractor ── <img> 属性挑选 + 地址补全 + 过滤          │
//! │  │                                                       │
//! │  ├─ image_handler  并发下载·解码·嵌入前降采样              │
//! │  │                                                       │
//! │  ├─ layout ───── 内容区等比放置计算                        │
//! │  ├─ document ─── 分页文档写入 (printpdf)                   │
//! │  ├─ selection    编号选择集                               │
//! │  ├─ storage      原图与文档落盘                           │
//! │  └─ settings     JSON 设置文件                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，调用级失败的返回类型 |
//! | [`extractor`] | 从文章 HTML 中提取有序的绝对图片地址 |
//! | [`image_handler`] | 有上限的并发下载、解码校验、嵌入前降采样 |
//! | [`layout`] | 保持宽高比、放入内容区的最大放置尺寸 |
//! | [`document`] | `DocumentAssembler` 接口与 PDF 实现 |
//! | [`article`] | 串联提取、下载、排版与文档追加 |
//! | [`selection`] | 解析 `1,3,5-7` 形式的选择集 |
//! | [`storage`] | 保存原图、写出文档 |
//! | [`settings`] | 页面几何、接收规则、图片参数的 JSON 覆盖 |
//! | [`cli`] | 命令行参数与完整流程 |

pub mod error;
pub mod article;
pub mod cli;
pub mod document;
pub mod extractor;
pub mod image_handler;
pub mod layout;
pub mod selection;
pub mod settings;
pub mod storage;
