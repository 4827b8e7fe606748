//! 图片与文档落盘模块
//!
//! # 设计思路
//!
//! 所有写盘操作都以调用方显式给出的路径为准，核心流程本身不接触文件系统。
//! 目录不存在时自动创建，避免上层判断。
//!
//! # 实现思路
//!
//! - 原始字节原样写出，文件名为 `image_{编号}.{扩展名}`，编号与命令行列表一致。
//! - 单张写入失败只记录并计数，剩余图片继续写。
//! - 目录创建失败属于调用级错误，直接返回。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::image_handler::ImageAsset;

/// 保存结果汇总。
#[derive(Debug, Clone, Default)]
pub struct SaveSummary {
    pub saved: Vec<PathBuf>,
    pub failed: usize,
}

/// 确保目录存在。
pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// 将选中图片的原始字节写入目录。
///
/// # 参数
/// * `dir` - 目标目录，不存在时自动创建
/// * `selected` - `(编号, 图片)` 列表，编号用于生成文件名
pub fn save_assets(dir: &Path, selected: &[(usize, &ImageAsset)]) -> Result<SaveSummary, AppError> {
    ensure_dir(dir)?;

    let mut summary = SaveSummary::default();
    for (number, asset) in selected {
        let path = dir.join(format!("image_{}.{}", number, asset.extension()));
        match fs::write(&path, asset.bytes()) {
            Ok(()) => summary.saved.push(path),
            Err(err) => {
                log::warn!("⚠️ 保存图片 {} 失败：{}（{}）", number, err, path.display());
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "💾 图片保存完成 - 成功: {} 失败: {} 目录: {}",
        summary.saved.len(),
        summary.failed,
        dir.display()
    );

    Ok(summary)
}

/// 解析文档输出路径：已存在的目录下生成带时间戳的文件名，其余原样返回。
pub fn resolve_output_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        let timestamp = Local::now().format("%Y%m%d%H%M%S");
        return path.join(format!("article_images_{}.pdf", timestamp));
    }
    path.to_path_buf()
}

/// 写出文档字节，父目录不存在时自动创建。
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(path, bytes)?;
    log::info!("📄 文档已写出：{}（{}KB）", path.display(), bytes.len() / 1024);
    Ok(())
}
