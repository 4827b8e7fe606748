//! 文章处理编排模块
//!
//! # 设计思路
//!
//! 把“提取 → 下载”与“排版 → 追加到文档”两段流程串起来，并把单张图片的失败
//! 全部吸收为计数，只有文章地址无效、全部下载失败这两种情况让整次调用失败。
//!
//! 选择集与文档容器都由调用方提供，本模块不持有界面状态，也不接触文件系统。
//!
//! # 实现思路
//!
//! - `collect`：提取地址，区分两种“空”结果，然后批量下载。
//! - `assemble`：对每张选中图片用原始尺寸计算放置尺寸，按选择顺序追加。

use crate::document::DocumentAssembler;
use crate::error::AppError;
use crate::extractor::{ExtractionStatus, ReferencePolicy, extract_with_policy};
use crate::image_handler::{AssetFetcher, FetchReport, ImageAsset, ImageHandler};
use crate::layout::{ContentArea, fit_pixels};

/// 提取并下载后的结果。
#[derive(Debug)]
pub enum CollectOutcome {
    /// 页面中没有 `<img>` 元素。
    NoImagesFound,
    /// 有 `<img>` 元素，但没有可用的图片地址。
    NoValidReferences { element_count: usize },
    /// 至少一张图片下载成功。
    Assets(FetchReport),
}

/// 提取文章中的图片并下载。
pub async fn collect<F: AssetFetcher>(
    handler: &ImageHandler<F>,
    markup: &str,
    base_url: &str,
    policy: &ReferencePolicy,
) -> Result<CollectOutcome, AppError> {
    collect_with_progress(handler, markup, base_url, policy, |_, _| {}).await
}

/// 同 `collect`，下载阶段每完成一张回调一次 `(已完成, 总数)`。
pub async fn collect_with_progress<F, P>(
    handler: &ImageHandler<F>,
    markup: &str,
    base_url: &str,
    policy: &ReferencePolicy,
    on_progress: P,
) -> Result<CollectOutcome, AppError>
where
    F: AssetFetcher,
    P: Fn(usize, usize),
{
    let extraction = extract_with_policy(markup, base_url, policy)?;

    match extraction.status() {
        ExtractionStatus::NoImagesFound => return Ok(CollectOutcome::NoImagesFound),
        ExtractionStatus::NoValidReferencesFound => {
            return Ok(CollectOutcome::NoValidReferences {
                element_count: extraction.element_count,
            });
        }
        ExtractionStatus::Found(count) => log::info!("🔗 找到 {} 个图片地址，开始下载", count),
    }

    let report = handler
        .fetch_assets_with_progress(&extraction.urls, on_progress)
        .await?;

    if report.is_all_failed() {
        return Err(AppError::AllAssetsFailed {
            attempted: report.summary().attempted,
        });
    }

    Ok(CollectOutcome::Assets(report))
}

/// 单张图片追加失败的记录。
#[derive(Debug)]
pub struct AssemblyFailure {
    pub number: usize,
    pub error: AppError,
}

/// 文档追加汇总。
#[derive(Debug, Default)]
pub struct AssemblySummary {
    pub appended: usize,
    pub failures: Vec<AssemblyFailure>,
}

/// 按选择顺序把图片追加到文档。
///
/// `selected` 为 `(编号, 图片)`，编号只用于日志与失败记录。
pub fn assemble<D: DocumentAssembler>(
    assembler: &mut D,
    selected: &[(usize, &ImageAsset)],
    area: ContentArea,
) -> AssemblySummary {
    let mut summary = AssemblySummary::default();

    for &(number, asset) in selected {
        let result = fit_pixels(asset.width(), asset.height(), area)
            .map_err(AppError::from)
            .and_then(|placement| {
                assembler
                    .append_image_block(asset, placement)
                    .map_err(AppError::from)
            });

        match result {
            Ok(()) => summary.appended += 1,
            Err(error) => {
                log::warn!("⚠️ 图片 {} 未能加入文档，已跳过：{}", number, error);
                summary.failures.push(AssemblyFailure { number, error });
            }
        }
    }

    log::info!(
        "🧾 文档排版完成 - 追加: {} 跳过: {}",
        summary.appended,
        summary.failures.len()
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentError;
    use crate::image_handler::{ImageConfig, ImageError};
    use crate::layout::{PageGeometry, Placement};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::collections::HashMap;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, 255]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    struct MapFetcher(HashMap<String, Vec<u8>>);

    impl AssetFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| ImageError::Network("HTTP 404: 未找到".to_string()))
        }
    }

    fn handler(routes: &[(&str, Vec<u8>)]) -> ImageHandler<MapFetcher> {
        let map = routes.iter().map(|(url, bytes)| (url.to_string(), bytes.clone())).collect();
        ImageHandler::new(MapFetcher(map), ImageConfig::default())
    }

    #[derive(Default)]
    struct RecordingAssembler {
        placements: Vec<(String, Placement)>,
        reject_url: Option<String>,
    }

    impl DocumentAssembler for RecordingAssembler {
        fn append_image_block(&mut self, asset: &ImageAsset, placement: Placement) -> Result<(), DocumentError> {
            if self.reject_url.as_deref() == Some(asset.url()) {
                return Err(DocumentError::Append("unreadable".to_string()));
            }
            self.placements.push((asset.url().to_string(), placement));
            Ok(())
        }

        fn block_count(&self) -> usize {
            self.placements.len()
        }

        fn serialize(self) -> Result<Vec<u8>, DocumentError> {
            Ok(Vec::new())
        }
    }

    fn a4_area() -> ContentArea {
        PageGeometry::default().content_area().expect("valid geometry")
    }

    #[tokio::test]
    async fn collect_reports_markup_without_images() {
        let outcome = collect(&handler(&[]), "<p>hello</p>", "https://x.com", &ReferencePolicy::default())
            .await
            .expect("collect failed");

        assert!(matches!(outcome, CollectOutcome::NoImagesFound));
    }

    #[tokio::test]
    async fn collect_reports_images_without_valid_references() {
        let outcome = collect(
            &handler(&[]),
            r#"<img><img src="/a.svg">"#,
            "https://x.com",
            &ReferencePolicy::default(),
        )
        .await
        .expect("collect failed");

        assert!(matches!(outcome, CollectOutcome::NoValidReferences { element_count: 2 }));
    }

    #[tokio::test]
    async fn collect_fails_when_every_download_fails() {
        let result = collect(
            &handler(&[]),
            r#"<img src="/a.png"><img src="/b.png">"#,
            "https://x.com/post",
            &ReferencePolicy::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::AllAssetsFailed { attempted: 2 })));
    }

    #[tokio::test]
    async fn collect_fails_on_invalid_base_url() {
        let result = collect(&handler(&[]), r#"<img src="/a.png">"#, "nowhere", &ReferencePolicy::default()).await;

        assert!(matches!(result, Err(AppError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn collect_keeps_successes_and_counts_skips() {
        let handler = handler(&[("https://x.com/b.png", png_bytes(20, 10))]);

        let outcome = collect(
            &handler,
            r#"<img src="/a.png"><img data-src="/b.png">"#,
            "https://x.com/post",
            &ReferencePolicy::default(),
        )
        .await
        .expect("collect failed");

        let CollectOutcome::Assets(report) = outcome else {
            panic!("expected assets");
        };
        assert_eq!(report.summary().succeeded, 1);
        assert_eq!(report.summary().skipped, 1);
        assert_eq!(report.assets()[0].index, 1);
        assert_eq!(report.assets()[0].asset.url(), "https://x.com/b.png");
    }

    #[tokio::test]
    async fn assemble_uses_selection_order_and_original_dimensions() {
        let handler = handler(&[
            ("https://x.com/wide.png", png_bytes(1000, 500)),
            ("https://x.com/tall.png", png_bytes(800, 2000)),
        ]);
        let report = handler
            .fetch_assets(&["https://x.com/wide.png".to_string(), "https://x.com/tall.png".to_string()])
            .await
            .expect("batch should complete");
        let wide = &report.assets()[0].asset;
        let tall = &report.assets()[1].asset;
        let mut assembler = RecordingAssembler::default();

        let summary = assemble(&mut assembler, &[(2, tall), (1, wide)], a4_area());

        assert_eq!(summary.appended, 2);
        assert_eq!(assembler.placements[0].0, "https://x.com/tall.png");
        let tall_placement = assembler.placements[0].1;
        assert!((tall_placement.height - 27.7).abs() < 1e-9);
        assert!((tall_placement.width - 11.08).abs() < 1e-9);
        let wide_placement = assembler.placements[1].1;
        assert!((wide_placement.width - 19.0).abs() < 1e-9);
        assert!((wide_placement.height - 9.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn assemble_absorbs_append_failures() {
        let handler = handler(&[
            ("https://x.com/a.png", png_bytes(10, 10)),
            ("https://x.com/b.png", png_bytes(10, 10)),
        ]);
        let report = handler
            .fetch_assets(&["https://x.com/a.png".to_string(), "https://x.com/b.png".to_string()])
            .await
            .expect("batch should complete");
        let mut assembler = RecordingAssembler {
            reject_url: Some("https://x.com/a.png".to_string()),
            ..RecordingAssembler::default()
        };
        let selected: Vec<(usize, &ImageAsset)> =
            report.assets().iter().map(|a| (a.index + 1, &a.asset)).collect();

        let summary = assemble(&mut assembler, &selected, a4_area());

        assert_eq!(summary.appended, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].number, 1);
        assert!(matches!(summary.failures[0].error, AppError::Document(_)));
        assert_eq!(assembler.block_count(), 1);
    }
}
