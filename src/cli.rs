//! 命令行入口模块
//!
//! # 设计思路
//!
//! 命令行是核心流程的一个外壳：负责读取参数与设置、下载文章页面、打印编号列表，
//! 再按用户选择保存原图或生成文档。核心模块只返回数值与汇总，展示全部在这里完成。
//!
//! # 实现思路
//!
//! 1. 合并配置：默认值 → 设置文件 → 命令行参数（后者覆盖前者）；
//!    `--profile` 通过编排器的运行时切档生效，并打印当前档位
//! 2. 下载页面 → `article::collect`，两种“空”结果只提示、不算失败
//! 3. 打印列表（编号、尺寸、格式、地址）
//! 4. 按选择集保存原图、生成 PDF

use std::path::PathBuf;

use clap::Parser;

use crate::article::{self, CollectOutcome};
use crate::document::{DocumentAssembler, PdfAssembler};
use crate::error::AppError;
use crate::image_handler::{
    AssetFetcher, FetchReport, HttpFetcher, ImageConfig, ImageHandler, ImagePerformanceProfile,
};
use crate::selection::Selection;
use crate::settings::{AppSettings, load_settings};
use crate::storage;

/// Extract the images of an article page and lay them out into an A4 PDF
#[derive(Parser, Debug)]
#[command(name = "article-image-docs", version, about)]
pub struct Cli {
    /// Article page URL
    pub url: String,

    /// Write a PDF with the selected images (file path, or an existing directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Images to use, by list number: `all` or e.g. `1,3,5-7`
    #[arg(short, long, default_value = "all")]
    pub select: Selection,

    /// Save the selected original images into this directory
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// JSON settings file (page geometry, reference policy, image options)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Performance profile: quality / balanced / speed
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Maximum number of concurrent downloads
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-image download timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only print the image list, do not save or build a document
    #[arg(long, default_value_t = false)]
    pub list_only: bool,
}

impl Cli {
    /// 读取设置文件（未指定时使用默认值）。
    pub fn load_settings(&self) -> Result<AppSettings, AppError> {
        match &self.settings {
            Some(path) => load_settings(path),
            None => Ok(AppSettings::default()),
        }
    }

    /// 合并设置文件与命令行数值参数得到图片配置。`--profile` 不在这里处理。
    pub fn image_config(&self, settings: &AppSettings) -> Result<ImageConfig, AppError> {
        let mut config = ImageConfig::default();
        settings.image.apply(&mut config)?;

        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err(AppError::Settings("--concurrency 必须大于 0".to_string()));
            }
            config.max_concurrent_fetches = concurrency;
        }
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err(AppError::Settings("--timeout 必须大于 0".to_string()));
            }
            config.download_timeout = timeout;
        }

        Ok(config)
    }

    /// 应用 `--profile`（若有）并返回当前生效档位。
    pub fn apply_profile<F: AssetFetcher>(
        &self,
        handler: &ImageHandler<F>,
    ) -> Result<ImagePerformanceProfile, AppError> {
        if let Some(profile) = &self.profile {
            handler.set_performance_profile(ImagePerformanceProfile::from_str(profile)?)?;
        }
        Ok(handler.get_performance_profile()?)
    }
}

/// 执行一次完整流程。
pub async fn run(cli: &Cli) -> Result<(), AppError> {
    let settings = cli.load_settings()?;
    let config = cli.image_config(&settings)?;

    let handler = ImageHandler::new(HttpFetcher::new(&config)?, config);
    let profile = cli.apply_profile(&handler)?;
    println!("性能档位：{}", profile.as_str());

    let markup = handler.fetcher().fetch_page(&cli.url).await?;

    let outcome = article::collect_with_progress(&handler, &markup, &cli.url, &settings.policy, |done, total| {
        log::debug!("⏳ 下载进度 {}/{}", done, total);
    })
    .await?;

    let report = match outcome {
        CollectOutcome::NoImagesFound => {
            println!("未找到任何图片");
            return Ok(());
        }
        CollectOutcome::NoValidReferences { element_count } => {
            println!("找到 {} 个图片元素，但没有有效的图片链接", element_count);
            return Ok(());
        }
        CollectOutcome::Assets(report) => report,
    };

    print_report(&report);

    if cli.list_only {
        return Ok(());
    }

    let picked = cli.select.pick(report.assets())?;
    if picked.is_empty() {
        println!("未选择任何图片");
        return Ok(());
    }
    let selected: Vec<_> = picked.iter().map(|(number, fetched)| (*number, &fetched.asset)).collect();
    println!("已选择 {} 张图片", selected.len());

    if let Some(dir) = &cli.save_dir {
        let summary = storage::save_assets(dir, &selected)?;
        println!("成功保存 {} 张图片到 {}", summary.saved.len(), dir.display());
    }

    if let Some(output) = &cli.output {
        let mut assembler = PdfAssembler::new(cli.url.as_str(), settings.page, handler.config_snapshot()?)?;
        let area = assembler.content_area();
        let summary = article::assemble(&mut assembler, &selected, area);
        log::info!("📄 共追加 {} 页", assembler.block_count());

        let bytes = assembler.serialize()?;
        let path = storage::resolve_output_path(output);
        storage::write_document(&path, &bytes)?;
        println!(
            "文档已保存到：{}（{} 页，跳过 {} 张）",
            path.display(),
            summary.appended,
            summary.failures.len()
        );
    }

    Ok(())
}

fn print_report(report: &FetchReport) {
    for (position, fetched) in report.assets().iter().enumerate() {
        let asset = &fetched.asset;
        println!(
            "{:>3}. {}x{} {} {}",
            position + 1,
            asset.width(),
            asset.height(),
            asset.extension().to_uppercase(),
            asset.url()
        );
    }

    let summary = report.summary();
    println!(
        "共找到 {} 个图片地址，成功 {} 张，跳过 {} 张",
        summary.attempted, summary.succeeded, summary.skipped
    );
}
