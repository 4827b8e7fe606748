//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 负责批量下载的编排与配置管理，不关心地址从哪里来、结果给谁用。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按发现顺序为每个地址启动下载任务（并发数受信号量限制）
//! 3. 每个任务独立完成“下载 → 解码校验”（解码在阻塞线程中执行），失败只影响自己
//! 4. 结果写入按发现位置预分配的槽位，最终顺序与完成顺序无关
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时切档。
//! - 单次批量内使用“同一配置快照”，避免处理中途配置漂移。
//! - 每个任务都套一层总时长上限（容纳全部重试），超时与其他失败一样被吸收并计数。
//! - 失败记录所处阶段（下载 / 解码），两类失败分开统计。
//! - 记录批量总耗时与成功/跳过数量，便于诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::loader::{AssetFetcher, fetch_budget, redact_url_for_log};
use super::pipeline::decode_asset;
use super::source::{ImageAsset, RawImageData};
use super::{ImageConfig, ImageError, ImagePerformanceProfile};

/// 批量下载编排器。
pub struct ImageHandler<F: AssetFetcher> {
    fetcher: Arc<F>,
    config: Arc<RwLock<ImageConfig>>,
}

/// 成功的图片，附带其在发现顺序中的位置（从 0 开始）。
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub index: usize,
    pub asset: ImageAsset,
}

/// 失败发生的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// 网络、超时、状态码、体积或内容类型校验。
    Fetch,
    /// 拿到字节之后的格式识别、像素上限与完整解码。
    Decode,
}

/// 被跳过的图片及原因。
#[derive(Debug)]
pub struct FetchFailure {
    pub index: usize,
    pub url: String,
    pub stage: FailureStage,
    pub error: ImageError,
}

/// 处理数量汇总。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

/// 一次批量下载的结果。
#[derive(Debug, Default)]
pub struct FetchReport {
    assets: Vec<FetchedAsset>,
    failures: Vec<FetchFailure>,
}

impl FetchReport {
    /// 成功的图片，按发现顺序排列。
    pub fn assets(&self) -> &[FetchedAsset] {
        &self.assets
    }

    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            attempted: self.assets.len() + self.failures.len(),
            succeeded: self.assets.len(),
            skipped: self.failures.len(),
        }
    }

    /// 尝试过至少一张且全部失败。
    pub fn is_all_failed(&self) -> bool {
        self.assets.is_empty() && !self.failures.is_empty()
    }

    /// 某一阶段的失败数量。
    pub fn failures_at(&self, stage: FailureStage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }
}

impl<F: AssetFetcher> ImageHandler<F> {
    /// 根据下载器与初始配置创建编排器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use article_image_docs::image_handler::{HttpFetcher, ImageConfig, ImageHandler};
    ///
    /// let config = ImageConfig::default();
    /// let handler = ImageHandler::new(HttpFetcher::new(&config)?, config);
    /// # Ok::<(), article_image_docs::image_handler::ImageError>(())
    /// ```
    pub fn new(fetcher: F, config: ImageConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次批量使用一致参数。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置性能档位。
    pub fn set_performance_profile(&self, profile: ImagePerformanceProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换图片性能档位：{:?}（embed_dpi={}, filter={:?}）",
            profile,
            config.embed_dpi,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_performance_profile(&self) -> Result<ImagePerformanceProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_performance_profile())
    }

    /// 批量下载并解码，结果保持发现顺序。
    pub async fn fetch_assets(&self, urls: &[String]) -> Result<FetchReport, ImageError> {
        self.fetch_assets_with_progress(urls, |_, _| {}).await
    }

    /// 同 `fetch_assets`，每完成一个任务回调一次 `(已完成, 总数)`。
    ///
    /// 进度展示由调用方负责，这里只报告数字。
    pub async fn fetch_assets_with_progress<P>(
        &self,
        urls: &[String],
        on_progress: P,
    ) -> Result<FetchReport, ImageError>
    where
        P: Fn(usize, usize),
    {
        let config = self.config_snapshot()?;
        let total = urls.len();
        let total_start = Instant::now();

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let config = config.clone();
            let url = url.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetch_one(fetcher.as_ref(), &url, &config).await,
                    Err(_) => Err((
                        FailureStage::Fetch,
                        ImageError::ResourceLimit("下载并发控制已关闭".to_string()),
                    )),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<ImageAsset, (FailureStage, ImageError)>>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => log::error!("❌ 下载任务异常终止：{}", err),
            }
            on_progress(completed, total);
        }

        let mut report = FetchReport::default();
        for (index, (slot, url)) in slots.into_iter().zip(urls).enumerate() {
            match slot {
                Some(Ok(asset)) => report.assets.push(FetchedAsset { index, asset }),
                Some(Err((stage, error))) => {
                    let action = match stage {
                        FailureStage::Fetch => "下载",
                        FailureStage::Decode => "解码",
                    };
                    log::warn!(
                        "⚠️ {}图片 {} 失败，已跳过：{}（{}）",
                        action,
                        index + 1,
                        error,
                        redact_url_for_log(url)
                    );
                    report.failures.push(FetchFailure {
                        index,
                        url: url.clone(),
                        stage,
                        error,
                    });
                }
                None => report.failures.push(FetchFailure {
                    index,
                    url: url.clone(),
                    stage: FailureStage::Fetch,
                    error: ImageError::Network("下载任务异常终止".to_string()),
                }),
            }
        }

        let summary = report.summary();
        log::info!(
            "✅ 批量下载完成 - attempted={} succeeded={} skipped={}（下载 {} / 解码 {}） total={}ms",
            summary.attempted,
            summary.succeeded,
            summary.skipped,
            report.failures_at(FailureStage::Fetch),
            report.failures_at(FailureStage::Decode),
            total_start.elapsed().as_millis()
        );

        Ok(report)
    }
}

async fn fetch_one<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    config: &ImageConfig,
) -> Result<ImageAsset, (FailureStage, ImageError)> {
    // 总上限覆盖全部重试；单次请求的超时由下载器自己负责
    let budget = fetch_budget(config);
    let bytes = tokio::time::timeout(budget, fetcher.fetch(url))
        .await
        .map_err(|_| ImageError::Timeout(format!("下载超时（总计 {} 秒）", budget.as_secs())))
        .and_then(|result| result)
        .map_err(|e| (FailureStage::Fetch, e))?;

    // 解码是 CPU 密集操作，放到阻塞线程池
    let raw = RawImageData {
        bytes,
        url: url.to_string(),
    };
    let config = config.clone();
    tokio::task::spawn_blocking(move || decode_asset(raw, &config))
        .await
        .map_err(|e| ImageError::Decode(format!("解码线程执行失败：{}", e)))
        .and_then(|result| result)
        .map_err(|e| (FailureStage::Decode, e))
}
