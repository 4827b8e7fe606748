//! 应用设置模块
//!
//! # 设计思路
//!
//! 设置文件是可选的 JSON：页面几何、地址接收规则与图片处理参数都可以覆盖，
//! 缺省字段一律回退到默认值，旧文件在新增字段后仍可读取。
//!
//! # 实现思路
//!
//! - 所有结构体都标注 `#[serde(default)]`。
//! - 图片参数以 `Option` 表达“未设置”，先应用性能档位，再逐项覆盖。
//! - 解析或校验失败统一返回 `AppError::Settings`。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractor::ReferencePolicy;
use crate::image_handler::{ImageConfig, ImagePerformanceProfile};
use crate::layout::PageGeometry;

/// 设置文件内容。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub page: PageGeometry,
    pub policy: ReferencePolicy,
    pub image: ImageOverrides,
}

/// 图片处理参数覆盖项。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOverrides {
    /// `quality` / `balanced` / `speed`
    pub profile: Option<String>,
    pub max_file_size: Option<u64>,
    pub download_timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
    pub max_redirects: Option<usize>,
    pub max_decoded_pixels: Option<u64>,
    pub max_concurrent_fetches: Option<usize>,
    pub embed_dpi: Option<f64>,
}

impl ImageOverrides {
    /// 把覆盖项写入配置。档位先生效，显式数值随后覆盖。
    pub fn apply(&self, config: &mut ImageConfig) -> Result<(), AppError> {
        if let Some(profile) = &self.profile {
            let profile = ImagePerformanceProfile::from_str(profile).map_err(|e| AppError::Settings(e.to_string()))?;
            config.apply_performance_profile(profile);
        }

        if let Some(value) = self.max_file_size {
            config.max_file_size = positive(value, "max_file_size")?;
        }
        if let Some(value) = self.download_timeout {
            config.download_timeout = positive(value, "download_timeout")?;
        }
        if let Some(value) = self.connect_timeout {
            config.connect_timeout = positive(value, "connect_timeout")?;
        }
        if let Some(value) = self.max_redirects {
            config.max_redirects = value;
        }
        if let Some(value) = self.max_decoded_pixels {
            config.max_decoded_pixels = positive(value, "max_decoded_pixels")?;
        }
        if let Some(value) = self.max_concurrent_fetches {
            config.max_concurrent_fetches = positive(value as u64, "max_concurrent_fetches")? as usize;
        }
        if let Some(value) = self.embed_dpi {
            if !(value.is_finite() && value > 0.0) {
                return Err(AppError::Settings(format!("embed_dpi 必须为正数：{}", value)));
            }
            config.embed_dpi = value;
        }

        Ok(())
    }
}

fn positive(value: u64, field: &str) -> Result<u64, AppError> {
    if value == 0 {
        return Err(AppError::Settings(format!("{} 必须大于 0", field)));
    }
    Ok(value)
}

/// 读取设置文件。
pub fn load_settings(path: &Path) -> Result<AppSettings, AppError> {
    let content = fs::read_to_string(path)?;
    let settings = parse_settings(&content)?;
    log::info!("⚙️ 已加载设置文件：{}", path.display());
    Ok(settings)
}

/// 解析设置 JSON 并校验页面几何。
pub fn parse_settings(content: &str) -> Result<AppSettings, AppError> {
    let settings = serde_json::from_str::<AppSettings>(content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

    settings
        .page
        .content_area()
        .map_err(|e| AppError::Settings(e.to_string()))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = parse_settings("{}").expect("parse failed");

        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn partial_page_override_keeps_other_defaults() {
        let settings = parse_settings(r#"{"page": {"margin_left": 2.0}}"#).expect("parse failed");

        assert_eq!(settings.page.margin_left, 2.0);
        assert_eq!(settings.page.page_width, 21.0);
        assert_eq!(settings.policy, ReferencePolicy::default());
    }

    #[test]
    fn invalid_json_is_a_settings_error() {
        assert!(matches!(parse_settings("{not json"), Err(AppError::Settings(_))));
    }

    #[test]
    fn margins_eating_the_page_are_rejected() {
        let result = parse_settings(r#"{"page": {"margin_top": 15.0, "margin_bottom": 15.0}}"#);

        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[test]
    fn profile_applies_before_explicit_values() {
        let settings = parse_settings(
            r#"{"image": {"profile": "quality", "embed_dpi": 240.0, "max_concurrent_fetches": 2}}"#,
        )
        .expect("parse failed");
        let mut config = ImageConfig::default();

        settings.image.apply(&mut config).expect("apply failed");

        assert_eq!(config.embed_dpi, 240.0);
        assert_eq!(config.resize_filter, image::imageops::FilterType::Lanczos3);
        assert_eq!(config.max_concurrent_fetches, 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let overrides = ImageOverrides {
            download_timeout: Some(0),
            ..ImageOverrides::default()
        };

        assert!(overrides.apply(&mut ImageConfig::default()).is_err());
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let overrides = ImageOverrides {
            profile: Some("turbo".to_string()),
            ..ImageOverrides::default()
        };

        assert!(matches!(overrides.apply(&mut ImageConfig::default()), Err(AppError::Settings(_))));
    }
}
