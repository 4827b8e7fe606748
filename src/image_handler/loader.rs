//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! `AssetFetcher` 把“给一个地址，拿回字节或失败”抽象成可替换的接口，
//! 批量流程只依赖这个接口，测试中可以注入假实现。
//!
//! `HttpFetcher` 是基于 reqwest 的默认实现，并在“尽可能早”的阶段执行输入校验，
//! 尽快失败，减少不必要的内存与带宽消耗。
//!
//! ## 实现思路
//!
//! - 复用同一个 `reqwest::Client`（连接池、单次请求超时、重定向上限）。
//! - 可重试错误（超时 / 连接失败 / 408 / 429 / 5xx）按指数退避加抖动重试，
//!   单次等待不超过 `NETWORK_RETRY_MAX_DELAY_MS`。
//! - `fetch_budget` 给出一次抓取（含全部重试）的总时长上限，由编排层使用。
//! - 状态码 + 内容类型 + 体积 + 文件签名逐层校验。
//! - 网络错误统一映射到 `ImageError`，便于上层计数。

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{ImageConfig, ImageError};

const STREAM_SIGNATURE_PROBE_BYTES: usize = 4096;
const NETWORK_RETRY_MAX_ATTEMPTS: u8 = 3;
const NETWORK_RETRY_BASE_DELAY_MS: u64 = 180;
const NETWORK_RETRY_MAX_DELAY_MS: u64 = 2_000;
const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2";
const ACCEPT_PAGE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// 图片下载接口。
///
/// 每次调用彼此独立、无副作用；单次失败不影响其他调用。
pub trait AssetFetcher: Send + Sync + 'static {
    /// 下载单个地址，返回原始字节。
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ImageError>> + Send;
}

/// 基于 reqwest 的下载器。
pub struct HttpFetcher {
    client: reqwest::Client,
    config: ImageConfig,
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        self.download_with_validation(url).await
    }
}

impl HttpFetcher {
    /// 根据配置创建下载器。
    pub fn new(config: &ImageConfig) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ImageError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 下载文章页面 HTML。
    pub async fn fetch_page(&self, url: &str) -> Result<String, ImageError> {
        log::info!("🌐 开始获取文章内容 - URL: {}", redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ImageError::InvalidFormat(format!("URL 格式错误：{}", e)))?;
        ensure_web_scheme(&parsed)?;

        let response = self.send_with_retry(parsed, ACCEPT_PAGE).await?;

        if !response.status().is_success() {
            return Err(ImageError::Network(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                status_message(response.status().as_u16())
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e, url))?;

        log::debug!("✅ 页面下载完成 - {} 字符", text.chars().count());
        Ok(text)
    }

    /// 执行带校验的图片下载。
    ///
    /// 使用分块读取，边读边检查体积上限与文件签名。
    pub(crate) async fn download_with_validation(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        log::debug!("📡 下载图片 - URL: {}", redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ImageError::InvalidFormat(format!("URL 格式错误：{}", e)))?;
        ensure_web_scheme(&parsed)?;

        let mut response = self.send_with_retry(parsed, ACCEPT_IMAGE).await?;

        if !response.status().is_success() {
            return Err(ImageError::Network(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                status_message(response.status().as_u16())
            )));
        }

        if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            if let Ok(ct_str) = ct.to_str() {
                if !is_image_content_type(ct_str) {
                    return Err(ImageError::InvalidFormat(format!("不是图片类型：{}", ct_str)));
                }
            }
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            if size > self.config.max_file_size {
                return Err(ImageError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    self.config.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let initial_capacity = total_len
            .map(|len| len.min(self.config.max_file_size).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut total: u64 = 0;
        let mut signature_validated = false;
        let chunk_timeout = chunk_timeout(&self.config);

        loop {
            let next_chunk = tokio::time::timeout(chunk_timeout, response.chunk())
                .await
                .map_err(|_| ImageError::Timeout("下载数据流读取超时".to_string()))?;

            let Some(chunk) = next_chunk.map_err(|e| self.map_reqwest_error(e, url))? else {
                break;
            };

            total = total.saturating_add(chunk.len() as u64);
            if total > self.config.max_file_size {
                return Err(ImageError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);

            if !signature_validated {
                signature_validated =
                    validate_stream_signature_probe(&buffer, STREAM_SIGNATURE_PROBE_BYTES)?;
            }
        }

        if !signature_validated {
            validate_image_signature(&buffer)?;
        }

        log::debug!("✅ 下载完成 - {} bytes", total);
        Ok(buffer)
    }

    async fn send_with_retry(
        &self,
        url: reqwest::Url,
        accept: &str,
    ) -> Result<reqwest::Response, ImageError> {
        let referer = format!("{}://{}/", url.scheme(), url.host_str().unwrap_or(""));
        let mut attempt: u8 = 1;

        loop {
            let send_result = self
                .client
                .get(url.clone())
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .header(reqwest::header::ACCEPT, accept)
                .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
                .header(reqwest::header::REFERER, referer.as_str())
                .send()
                .await;

            match send_result {
                Ok(resp) => {
                    if attempt < NETWORK_RETRY_MAX_ATTEMPTS && is_retryable_http_status(resp.status()) {
                        let delay_ms = compute_retry_delay_with_jitter(
                            attempt,
                            retry_after_hint_ms(resp.headers()),
                        );

                        log::warn!(
                            "⚠️ HTTP {}（第 {}/{} 次，可重试）；{}ms 后重试",
                            resp.status().as_u16(),
                            attempt,
                            NETWORK_RETRY_MAX_ATTEMPTS,
                            delay_ms
                        );

                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Ok(resp);
                }
                Err(err) => {
                    if attempt >= NETWORK_RETRY_MAX_ATTEMPTS || !is_retryable_network_error(&err) {
                        return Err(self.map_reqwest_error(err, url.as_str()));
                    }

                    let delay_ms = compute_retry_delay_with_jitter(attempt, None);
                    log::warn!(
                        "⚠️ 网络请求失败（第 {}/{} 次，可重试）：{}；{}ms 后重试",
                        attempt,
                        NETWORK_RETRY_MAX_ATTEMPTS,
                        sanitize_error_message_with_redacted_url(&err.to_string(), url.as_str()),
                        delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str) -> ImageError {
        let err_msg = sanitize_error_message_with_redacted_url(&e.to_string(), url);

        if e.is_timeout() {
            ImageError::Timeout(format!("下载超时（{}秒）", self.config.download_timeout))
        } else if e.is_connect() {
            ImageError::Network(format!("无法连接：{}", err_msg))
        } else {
            ImageError::Network(format!("请求失败：{}", err_msg))
        }
    }
}

/// 一次抓取的总时长上限：每次尝试的请求超时加上两次尝试之间的最长等待。
pub(crate) fn fetch_budget(config: &ImageConfig) -> Duration {
    let attempts = NETWORK_RETRY_MAX_ATTEMPTS as u64;
    let per_attempt_ms = config.download_timeout.saturating_mul(1000);
    let backoff_ms = NETWORK_RETRY_MAX_DELAY_MS.saturating_mul(attempts - 1);
    Duration::from_millis(per_attempt_ms.saturating_mul(attempts).saturating_add(backoff_ms))
}

/// 分块读取超时不超过单次请求超时，否则永远不会先触发。
fn chunk_timeout(config: &ImageConfig) -> Duration {
    let request_ms = config.download_timeout.saturating_mul(1000);
    Duration::from_millis(config.stream_chunk_timeout_ms.min(request_ms).max(1))
}

fn ensure_web_scheme(url: &reqwest::Url) -> Result<(), ImageError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ImageError::InvalidFormat("仅支持 HTTP/HTTPS".to_string()));
    }
    Ok(())
}

fn retry_after_hint_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?;
    let text = value.to_str().ok()?.trim();
    let secs = text.parse::<u64>().ok()?;
    Some(secs.saturating_mul(1000))
}

fn compute_retry_delay_with_jitter(attempt: u8, server_hint_ms: Option<u64>) -> u64 {
    let exp = NETWORK_RETRY_BASE_DELAY_MS.saturating_mul(1_u64 << (attempt.saturating_sub(1) as u32));
    let base = server_hint_ms.unwrap_or(exp);
    let jitter_bound = (base / 2).max(1);
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let jitter = seed % (jitter_bound + 1);
    base.saturating_add(jitter).min(NETWORK_RETRY_MAX_DELAY_MS)
}

fn is_retryable_http_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn is_retryable_network_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }

    let msg = error.to_string().to_lowercase();
    msg.contains("connection reset")
        || msg.contains("connection closed before message completed")
        || msg.contains("peer closed connection")
}

fn is_image_content_type(content_type: &str) -> bool {
    let base = content_type
        .split(';')
        .next()
        .map(|base| base.trim().to_ascii_lowercase())
        .unwrap_or_default();

    // 部分图床对图片返回通用二进制类型
    base.starts_with("image/") || base == "application/octet-stream"
}

/// 日志中只保留 `scheme://host[:port]/path`，去掉查询串与片段。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    let path = parsed.path();

    format!("{}://{}{}{}", parsed.scheme(), host, port, path)
}

fn sanitize_error_message_with_redacted_url(error_msg: &str, url: &str) -> String {
    let redacted = redact_url_for_log(url);
    error_msg.replace(url, &redacted)
}

/// 常见 HTTP 状态码本地化文案。
fn status_message(code: u16) -> &'static str {
    match code {
        404 => "未找到",
        403 => "访问被拒绝",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| ImageError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ImageError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 流式下载阶段的签名探测：尽早识别并拒绝非图片内容。
///
/// 返回值：
/// - `Ok(true)`：已识别为图片
/// - `Ok(false)`：当前字节不足以判断，继续下载
/// - `Err(...)`：已识别为非图片，或达到探测上限仍无法识别
fn validate_stream_signature_probe(bytes: &[u8], probe_limit: usize) -> Result<bool, ImageError> {
    if bytes.is_empty() {
        return Ok(false);
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::InvalidFormat(format!(
                "下载内容不是图片类型：{}",
                kind.mime_type()
            )));
        }
        return Ok(true);
    }

    if bytes.len() >= probe_limit {
        return Err(ImageError::InvalidFormat(format!(
            "下载前 {} 字节内无法识别图片类型",
            probe_limit
        )));
    }

    Ok(false)
}
