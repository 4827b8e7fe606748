//! # 地址补全
//!
//! 将可能是相对路径的图片地址补全为带协议的绝对地址。
//! 只使用文章地址的 `协议 + 主机（含端口）` 部分，不做目录级相对解析。

use reqwest::Url;

use crate::error::AppError;

const ABSOLUTE_PREFIXES: [&str; 2] = ["http://", "https://"];

/// 已解析的文章地址：仅保留 `scheme://host[:port]`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    origin: String,
}

impl BaseUrl {
    /// 解析文章地址。
    ///
    /// 无法解析出协议与主机时返回 `AppError::InvalidBaseUrl`。
    pub fn parse(base_url: &str) -> Result<Self, AppError> {
        let trimmed = base_url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|e| AppError::InvalidBaseUrl(format!("{}（{}）", trimmed, e)))?;

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| AppError::InvalidBaseUrl(format!("{}（缺少主机地址）", trimmed)))?;

        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

        Ok(Self {
            origin: format!("{}://{}{}", parsed.scheme(), host, port),
        })
    }

    /// `scheme://host[:port]`，不带结尾斜杠。
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// 补全候选地址。已是 http/https 绝对地址的原样返回。
    pub fn resolve(&self, candidate: &str) -> String {
        if is_absolute(candidate) {
            return candidate.to_string();
        }

        if candidate.starts_with('/') {
            format!("{}{}", self.origin, candidate)
        } else {
            format!("{}/{}", self.origin, candidate)
        }
    }
}

/// 单次补全：`normalize(base_url, candidate) -> absolute_url`。
///
/// 候选地址已是绝对地址时不会解析 `base_url`。
///
/// # 示例
/// ```rust
/// use article_image_docs::extractor::normalize;
///
/// let url = normalize("https://x.com/art", "/a.png")?;
/// assert_eq!(url, "https://x.com/a.png");
/// # Ok::<(), article_image_docs::error::AppError>(())
/// ```
pub fn normalize(base_url: &str, candidate: &str) -> Result<String, AppError> {
    if is_absolute(candidate) {
        return Ok(candidate.to_string());
    }

    Ok(BaseUrl::parse(base_url)?.resolve(candidate))
}

fn is_absolute(candidate: &str) -> bool {
    ABSOLUTE_PREFIXES
        .iter()
        .any(|prefix| candidate.starts_with(prefix))
}
