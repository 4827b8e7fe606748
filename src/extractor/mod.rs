//! # 图片引用提取模块（extractor）
//!
//! ## 设计思路
//!
//! 文章 HTML 中的图片标记并不统一：有的直接写 `src`，有的依赖懒加载属性，
//! 还有只给 `data-srcset` 的。该模块把这些差异收敛为一个有序的绝对地址列表。
//!
//! - `sources`：按固定优先级从元素属性中挑选候选地址
//! - `normalize`：相对地址补全为绝对地址
//! - 本文件：遍历 `<img>`、过滤非图片地址、统计结果状态
//!
//! ## 实现思路
//!
//! 1. 先解析文章地址，失败则整个调用失败（无法补全任何相对地址）
//! 2. 按文档顺序遍历 `<img>`，每个元素最多产出一个地址
//! 3. 只保留扩展名是图片、或原始候选地址本身包含图床标记的地址
//!    （标记在补全前检查，文章主机名不参与匹配）
//! 4. 返回 `Extraction`，由调用方区分“没有图片元素”与“没有有效地址”

mod normalize;
mod sources;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use normalize::{BaseUrl, normalize};

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("静态选择器 `img` 必然合法"));

/// 默认识别的图片扩展名。
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

/// 默认图床标记：这类地址不带扩展名，但确实是图片。
pub const VENDOR_MARKER: &str = "mmbiz";

/// 候选地址的接收规则。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePolicy {
    /// 小写扩展名，不带点。
    pub extensions: Vec<String>,
    /// 命中即接收的子串（不检查扩展名）。空字符串表示关闭该规则。
    pub vendor_marker: String,
}

impl Default for ReferencePolicy {
    fn default() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            vendor_marker: VENDOR_MARKER.to_string(),
        }
    }
}

impl ReferencePolicy {
    /// 补全后的地址扩展名匹配（忽略大小写，只看路径部分），
    /// 或补全前的候选地址包含图床标记，即接收。
    pub fn accepts(&self, candidate: &str, resolved: &str) -> bool {
        self.has_vendor_marker(candidate) || self.has_image_extension(resolved)
    }

    fn has_vendor_marker(&self, candidate: &str) -> bool {
        !self.vendor_marker.is_empty() && candidate.contains(&self.vendor_marker)
    }

    fn has_image_extension(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        self.extensions.iter().any(|ext| {
            path.strip_suffix(ext.to_ascii_lowercase().as_str())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// 一次提取的结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// 文档中 `<img>` 元素的总数。
    pub element_count: usize,
    /// 按文档顺序排列的绝对地址。
    pub urls: Vec<String>,
}

/// 提取结果状态。两种“空”结果语义不同，都不是错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// 页面里没有任何 `<img>`。
    NoImagesFound,
    /// 有 `<img>`，但没有一个产出可接收的地址。
    NoValidReferencesFound,
    /// 至少找到一个地址。
    Found(usize),
}

impl Extraction {
    pub fn status(&self) -> ExtractionStatus {
        if self.element_count == 0 {
            ExtractionStatus::NoImagesFound
        } else if self.urls.is_empty() {
            ExtractionStatus::NoValidReferencesFound
        } else {
            ExtractionStatus::Found(self.urls.len())
        }
    }
}

/// 使用默认接收规则提取图片地址。
///
/// # 示例
/// ```rust
/// use article_image_docs::extractor::extract;
///
/// let extraction = extract(r#"<p><img src="/a.png"></p>"#, "https://x.com/art")?;
/// assert_eq!(extraction.urls, vec!["https://x.com/a.png".to_string()]);
/// # Ok::<(), article_image_docs::error::AppError>(())
/// ```
pub fn extract(markup: &str, base_url: &str) -> Result<Extraction, AppError> {
    extract_with_policy(markup, base_url, &ReferencePolicy::default())
}

/// 按指定接收规则提取图片地址。
pub fn extract_with_policy(
    markup: &str,
    base_url: &str,
    policy: &ReferencePolicy,
) -> Result<Extraction, AppError> {
    let base = BaseUrl::parse(base_url)?;
    let document = Html::parse_document(markup);

    let mut extraction = Extraction::default();

    for element in document.select(&IMG_SELECTOR) {
        extraction.element_count += 1;

        let Some(candidate) = sources::select_source(element.value()) else {
            continue;
        };

        let resolved = base.resolve(&candidate);
        if !policy.accepts(&candidate, &resolved) {
            log::debug!("🚫 跳过非图片地址：{}", resolved);
            continue;
        }

        extraction.urls.push(resolved);
    }

    log::info!(
        "🔍 图片引用提取完成 - 元素: {} 有效地址: {}",
        extraction.element_count,
        extraction.urls.len()
    );

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_src_is_resolved_against_article_origin() {
        let extraction = extract(r#"<img src="/a.png">"#, "https://x.com/art").expect("extract failed");

        assert_eq!(extraction.urls, vec!["https://x.com/a.png"]);
    }

    #[test]
    fn srcset_only_image_uses_first_candidate() {
        let markup = r#"<img data-srcset="https://cdn.mmbiz/b.jpg 2x, https://cdn.mmbiz/b_small.jpg 1x">"#;
        let extraction = extract(markup, "https://x.com/art").expect("extract failed");

        assert_eq!(extraction.urls, vec!["https://cdn.mmbiz/b.jpg"]);
    }

    #[test]
    fn document_order_is_preserved_across_attribute_kinds() {
        let markup = r#"
            <img data-src="https://mmbiz.qpic.cn/sz_mmbiz_jpg/abc/640?wx_fmt=jpeg">
            <img src="second.PNG">
            <img data-srcset="/third.gif 1x">
        "#;
        let extraction = extract(markup, "https://mp.weixin.qq.com/s/xyz").expect("extract failed");

        assert_eq!(
            extraction.urls,
            vec![
                "https://mmbiz.qpic.cn/sz_mmbiz_jpg/abc/640?wx_fmt=jpeg",
                "https://mp.weixin.qq.com/second.PNG",
                "https://mp.weixin.qq.com/third.gif",
            ]
        );
        assert_eq!(extraction.status(), ExtractionStatus::Found(3));
    }

    #[test]
    fn non_image_references_are_dropped() {
        let markup = r#"<img src="/tracker.php"><img src="/icon.svg"><img src="/ok.jpeg?x=1">"#;
        let extraction = extract(markup, "https://x.com").expect("extract failed");

        assert_eq!(extraction.element_count, 3);
        assert_eq!(extraction.urls, vec!["https://x.com/ok.jpeg?x=1"]);
    }

    #[test]
    fn empty_statuses_are_distinguished() {
        let none = extract("<p>text only</p>", "https://x.com").expect("extract failed");
        assert_eq!(none.status(), ExtractionStatus::NoImagesFound);

        let invalid = extract(r#"<img><img src="  "><img src="/doc.pdf">"#, "https://x.com")
            .expect("extract failed");
        assert_eq!(invalid.status(), ExtractionStatus::NoValidReferencesFound);
    }

    #[test]
    fn invalid_base_fails_whole_call() {
        let result = extract(r#"<img src="https://x.com/a.png">"#, "::not a url::");

        assert!(matches!(result, Err(AppError::InvalidBaseUrl(_))));
    }

    #[test]
    fn custom_policy_overrides_marker_and_extensions() {
        let policy = ReferencePolicy {
            extensions: vec!["webp".to_string()],
            vendor_marker: String::new(),
        };
        let markup = r#"<img src="/a.webp"><img src="https://mmbiz.qpic.cn/x/0">"#;
        let extraction = extract_with_policy(markup, "https://x.com", &policy).expect("extract failed");

        assert_eq!(extraction.urls, vec!["https://x.com/a.webp"]);
    }

    #[test]
    fn article_host_does_not_count_as_vendor_marker() {
        let markup = r#"<img src="/s/banner"><img src="//mmbiz.qpic.cn/x/640"><img src="/ok.png">"#;
        let extraction = extract(markup, "https://mmbiz.example.com/post").expect("extract failed");

        assert_eq!(
            extraction.urls,
            vec![
                "https://mmbiz.example.com//mmbiz.qpic.cn/x/640",
                "https://mmbiz.example.com/ok.png",
            ]
        );
    }

    #[test]
    fn policy_requires_dot_before_extension() {
        let policy = ReferencePolicy::default();

        assert!(policy.accepts("/a.JPG", "https://x.com/a.JPG"));
        assert!(!policy.accepts("/notapng", "https://x.com/notapng"));
    }
}
