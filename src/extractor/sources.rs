//! # 图片来源属性策略
//!
//! 每个 `<img>` 元素的地址可能出现在多个属性中（懒加载页面尤甚）。
//! 这里把“按属性取值”拆成一组有序的取值函数，依次尝试，第一个非空结果胜出。

use scraper::node::Element;

/// 从元素中取出一个候选地址。
pub(crate) type SourceStrategy = fn(&Element) -> SourcePick;

/// 单个策略的结果。
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SourcePick {
    /// 属性缺失或为空白，交给下一个策略。
    Empty,
    /// 取到地址。
    Found(String),
    /// 属性非空但解析失败，跳过整个元素。
    Malformed,
}

/// 固定优先级：`src` → `data-src` → `data-srcset`。
pub(crate) const SOURCE_STRATEGIES: [SourceStrategy; 3] = [primary_source, lazy_source, srcset_source];

/// 依次尝试所有策略，返回第一个取到的地址。
pub(crate) fn select_source(element: &Element) -> Option<String> {
    for strategy in SOURCE_STRATEGIES {
        match strategy(element) {
            SourcePick::Empty => continue,
            SourcePick::Found(url) => return Some(url),
            SourcePick::Malformed => return None,
        }
    }
    None
}

fn primary_source(element: &Element) -> SourcePick {
    plain_attribute(element, "src")
}

fn lazy_source(element: &Element) -> SourcePick {
    plain_attribute(element, "data-src")
}

fn srcset_source(element: &Element) -> SourcePick {
    match non_blank(element, "data-srcset") {
        Some(value) => match first_srcset_url(value) {
            Some(url) => SourcePick::Found(url.to_string()),
            None => SourcePick::Malformed,
        },
        None => SourcePick::Empty,
    }
}

fn plain_attribute(element: &Element, name: &str) -> SourcePick {
    match non_blank(element, name) {
        Some(value) => SourcePick::Found(value.to_string()),
        None => SourcePick::Empty,
    }
}

fn non_blank<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// 取 srcset 第一项的地址部分，忽略 `2x` / `640w` 之类的描述符。
pub(crate) fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset.split(',').next()?.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_img(markup: &str) -> Option<String> {
        let document = Html::parse_fragment(markup);
        let selector = Selector::parse("img").expect("selector");
        let element = document.select(&selector).next().expect("no img in fixture");
        select_source(element.value())
    }

    #[test]
    fn srcset_parser_takes_first_url_only() {
        assert_eq!(
            first_srcset_url("https://a/b.jpg 2x, https://a/c.jpg 1x"),
            Some("https://a/b.jpg")
        );
        assert_eq!(first_srcset_url("  https://a/b.jpg"), Some("https://a/b.jpg"));
        assert_eq!(first_srcset_url(", https://a/c.jpg 1x"), None);
    }

    #[test]
    fn primary_source_wins_over_lazy_attributes() {
        let url = first_img(r#"<img src="/a.png" data-src="/b.png" data-srcset="/c.png 2x">"#);

        assert_eq!(url.as_deref(), Some("/a.png"));
    }

    #[test]
    fn blank_primary_falls_through_to_lazy_source() {
        let url = first_img(r#"<img src="   " data-src=" /b.png ">"#);

        assert_eq!(url.as_deref(), Some("/b.png"));
    }

    #[test]
    fn srcset_is_last_resort() {
        let url = first_img(r#"<img data-srcset="https://cdn.mmbiz/b.jpg 2x, https://cdn.mmbiz/b_small.jpg 1x">"#);

        assert_eq!(url.as_deref(), Some("https://cdn.mmbiz/b.jpg"));
    }

    #[test]
    fn malformed_srcset_skips_element() {
        assert_eq!(first_img(r#"<img data-srcset=", /x.png 1x">"#), None);
    }

    #[test]
    fn element_without_sources_yields_nothing() {
        assert_eq!(first_img(r#"<img alt="decorative">"#), None);
    }
}
