//! 图片选择模块
//!
//! # 设计思路
//!
//! 选择集是调用方的决定：全部，或按编号挑选。编号从 1 开始，与命令行打印的列表一致。
//! 选择只产出“哪些、什么顺序”，不持有任何计数状态。
//!
//! # 实现思路
//!
//! - 支持 `all` / `*` 以及 `1,3,5-7` 形式的编号与区间。
//! - 顺序按调用方给出的顺序，重复编号只保留第一次。
//! - 越界编号整体报错，空选择不是错误（由调用方提示）。
//! - 编号上限为 `MAX_NUMBER`，区间展开前先校验，超大区间直接拒绝。

use std::str::FromStr;

use crate::error::AppError;

/// 可选编号上限。
pub const MAX_NUMBER: usize = 10_000;

/// 调用方选中的图片集合。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// 1 起始编号，保持给定顺序。
    Numbers(Vec<usize>),
}

impl Selection {
    /// 解析选择表达式。
    ///
    /// # 示例
    /// ```rust
    /// use article_image_docs::selection::Selection;
    ///
    /// let selection = Selection::parse("3,1-2")?;
    /// assert_eq!(selection, Selection::Numbers(vec![3, 1, 2]));
    /// # Ok::<(), article_image_docs::error::AppError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed == "*" {
            return Ok(Self::All);
        }

        let mut numbers = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut push = |n: usize| {
            if seen.insert(n) {
                numbers.push(n);
            }
        };

        for part in trimmed.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_number(start)?;
                    let end = parse_number(end)?;
                    if start > end {
                        return Err(AppError::Selection(format!("区间起点大于终点：{}", part)));
                    }
                    (start..=end).for_each(&mut push);
                }
                None => push(parse_number(part)?),
            }
        }

        Ok(Self::Numbers(numbers))
    }

    /// 按选择挑出条目，返回 `(编号, 条目)`。
    ///
    /// 任一编号越界时整体失败。
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Result<Vec<(usize, &'a T)>, AppError> {
        match self {
            Self::All => Ok(items.iter().enumerate().map(|(i, item)| (i + 1, item)).collect()),
            Self::Numbers(numbers) => numbers
                .iter()
                .map(|&number| {
                    number
                        .checked_sub(1)
                        .and_then(|i| items.get(i))
                        .map(|item| (number, item))
                        .ok_or_else(|| {
                            AppError::Selection(format!("编号 {} 超出范围（共 {} 张）", number, items.len()))
                        })
                })
                .collect(),
        }
    }
}

impl FromStr for Selection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_number(raw: &str) -> Result<usize, AppError> {
    let number: usize = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Selection(format!("无法解析编号：{}", raw.trim())))?;
    if number == 0 {
        return Err(AppError::Selection("编号从 1 开始".to_string()));
    }
    if number > MAX_NUMBER {
        return Err(AppError::Selection(format!("编号 {} 过大（上限 {}）", number, MAX_NUMBER)));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keeps_every_item_in_order() {
        let items = ["a", "b", "c"];
        let picked = Selection::All.pick(&items).expect("pick failed");

        assert_eq!(picked, vec![(1, &"a"), (2, &"b"), (3, &"c")]);
    }

    #[test]
    fn caller_order_wins_and_duplicates_are_dropped() {
        let selection = Selection::parse("3, 1-2, 3").expect("parse failed");
        let items = ["a", "b", "c"];

        let picked = selection.pick(&items).expect("pick failed");

        assert_eq!(picked, vec![(3, &"c"), (1, &"a"), (2, &"b")]);
    }

    #[test]
    fn out_of_range_number_is_rejected() {
        let selection = Selection::parse("1,4").expect("parse failed");

        assert!(matches!(selection.pick(&["a", "b"]), Err(AppError::Selection(_))));
    }

    #[test]
    fn malformed_input_is_rejected() {
        for input in ["x", "0", "3-1", "1-b"] {
            assert!(Selection::parse(input).is_err(), "input {:?} should fail", input);
        }
    }

    #[test]
    fn huge_ranges_are_rejected_before_expansion() {
        for input in ["1-18446744073709551615", "1-10001", "99999999"] {
            assert!(
                matches!(Selection::parse(input), Err(AppError::Selection(_))),
                "input {:?} should fail",
                input
            );
        }

        let widest = Selection::parse("1-10000,1-10000").expect("parse failed");
        assert!(matches!(widest, Selection::Numbers(ref numbers) if numbers.len() == MAX_NUMBER));
    }

    #[test]
    fn empty_input_is_an_empty_selection() {
        let selection = Selection::parse(" , ").expect("parse failed");

        assert_eq!(selection, Selection::Numbers(Vec::new()));
        assert!(selection.pick(&["a"]).expect("pick failed").is_empty());
    }

    #[test]
    fn all_keyword_is_case_insensitive() {
        assert_eq!(Selection::parse("ALL").expect("parse failed"), Selection::All);
        assert_eq!("*".parse::<Selection>().expect("parse failed"), Selection::All);
    }
}
