//! # PDF 文档生成
//!
//! ## 实现思路
//!
//! 每个图片块独占一页：页面尺寸取自 `PageGeometry`，图片在内容区内水平居中、
//! 顶部贴齐上边距，绘制尺寸严格等于传入的放置尺寸。
//!
//! 第一页在第一次成功追加时才创建，避免空文档或追加失败时留下空白页。
//! 像素数据先经 `prepare_for_embedding` 降采样到目标 DPI，再写入 PDF。

use std::io::{BufWriter, Cursor, Write};

use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Px,
};

use super::{DocumentAssembler, DocumentError};
use crate::image_handler::{ImageAsset, ImageConfig, prepare_for_embedding};
use crate::layout::{ContentArea, LayoutError, PageGeometry, Placement};

const LAYER_NAME: &str = "Layer 1";
const MM_PER_CM: f64 = 10.0;
const MM_PER_INCH: f64 = 25.4;
/// 写入 PDF 时声明的像素密度，实际尺寸由缩放系数决定。
const RENDER_DPI: f64 = 300.0;
/// 放置尺寸与内容区比较时允许的浮点误差（厘米）。
const PLACEMENT_TOLERANCE: f64 = 1e-6;

/// 基于 printpdf 的文档生成器。
pub struct PdfAssembler {
    title: String,
    geometry: PageGeometry,
    area: ContentArea,
    config: ImageConfig,
    doc: Option<PdfDocumentReference>,
    blocks: usize,
}

impl PdfAssembler {
    /// 创建生成器。页面几何无效时直接失败。
    pub fn new(title: impl Into<String>, geometry: PageGeometry, config: ImageConfig) -> Result<Self, LayoutError> {
        let area = geometry.content_area()?;
        Ok(Self {
            title: title.into(),
            geometry,
            area,
            config,
            doc: None,
            blocks: 0,
        })
    }

    pub fn content_area(&self) -> ContentArea {
        self.area
    }

    /// 新建一页并返回其图层；第一次调用时创建文档本身。
    fn next_page_layer(&mut self) -> PdfLayerReference {
        let width = Mm(to_mm(self.geometry.page_width));
        let height = Mm(to_mm(self.geometry.page_height));

        match &self.doc {
            Some(doc) => {
                let (page, layer) = doc.add_page(width, height, LAYER_NAME);
                doc.get_page(page).get_layer(layer)
            }
            None => {
                let (doc, page, layer) = PdfDocument::new(self.title.clone(), width, height, LAYER_NAME);
                let layer_ref = doc.get_page(page).get_layer(layer);
                self.doc = Some(doc);
                layer_ref
            }
        }
    }

    fn validate_placement(&self, placement: Placement) -> Result<(), DocumentError> {
        let valid = placement.width.is_finite()
            && placement.height.is_finite()
            && placement.width > 0.0
            && placement.height > 0.0
            && placement.width <= self.area.width() + PLACEMENT_TOLERANCE
            && placement.height <= self.area.height() + PLACEMENT_TOLERANCE;

        if !valid {
            return Err(DocumentError::Append(format!(
                "放置尺寸 {:.3}x{:.3} 超出内容区 {:.3}x{:.3}",
                placement.width,
                placement.height,
                self.area.width(),
                self.area.height()
            )));
        }
        Ok(())
    }
}

impl DocumentAssembler for PdfAssembler {
    fn append_image_block(&mut self, asset: &ImageAsset, placement: Placement) -> Result<(), DocumentError> {
        self.validate_placement(placement)?;

        let embedded = prepare_for_embedding(asset, placement, &self.config)
            .map_err(|e| DocumentError::Append(e.to_string()))?;

        let offset_x = self.geometry.margin_left + (self.area.width() - placement.width) / 2.0;
        let offset_y = self.geometry.page_height - self.geometry.margin_top - placement.height;

        let natural_width_mm = embedded.width as f64 / RENDER_DPI * MM_PER_INCH;
        let natural_height_mm = embedded.height as f64 / RENDER_DPI * MM_PER_INCH;
        let scale_x = placement.width * MM_PER_CM / natural_width_mm;
        let scale_y = placement.height * MM_PER_CM / natural_height_mm;

        let image = Image::from(ImageXObject {
            width: Px(embedded.width as usize),
            height: Px(embedded.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: embedded.rgb,
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        let layer = self.next_page_layer();
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(to_mm(offset_x))),
                translate_y: Some(Mm(to_mm(offset_y))),
                scale_x: Some(scale_x as f32),
                scale_y: Some(scale_y as f32),
                dpi: Some(RENDER_DPI as f32),
                ..Default::default()
            },
        );

        self.blocks += 1;
        log::debug!(
            "📄 第 {} 页：{:.2}x{:.2}cm（嵌入像素 {}x{}）",
            self.blocks,
            placement.width,
            placement.height,
            embedded.width,
            embedded.height
        );

        Ok(())
    }

    fn block_count(&self) -> usize {
        self.blocks
    }

    fn serialize(self) -> Result<Vec<u8>, DocumentError> {
        let Some(doc) = self.doc else {
            return Err(DocumentError::Serialize("文档中没有任何图片块".to_string()));
        };

        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(Cursor::new(&mut buf));
            doc.save(&mut writer)
                .map_err(|e| DocumentError::Serialize(e.to_string()))?;
            writer
                .flush()
                .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        }

        log::info!("✅ PDF 序列化完成 - 页数: {} 大小: {}KB", self.blocks, buf.len() / 1024);
        Ok(buf)
    }
}

fn to_mm(cm: f64) -> f32 {
    (cm * MM_PER_CM) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::fit_pixels;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

    fn png_asset(width: u32, height: u32) -> ImageAsset {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 255) as u8, (y % 255) as u8, 90, 200]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        ImageAsset::new(
            "https://x.com/a.png".to_string(),
            cursor.into_inner(),
            width,
            height,
            ImageFormat::Png,
        )
    }

    fn assembler() -> PdfAssembler {
        PdfAssembler::new("test", PageGeometry::default(), ImageConfig::default()).expect("valid geometry")
    }

    #[test]
    fn appended_blocks_serialize_to_pdf() {
        let wide = png_asset(400, 100);
        let tall = png_asset(100, 400);
        let mut pdf = assembler();
        let area = pdf.content_area();

        for asset in [&wide, &tall] {
            let placement = fit_pixels(asset.width(), asset.height(), area).expect("fit failed");
            pdf.append_image_block(asset, placement).expect("append failed");
        }

        assert_eq!(pdf.block_count(), 2);
        let bytes = pdf.serialize().expect("serialize failed");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn oversized_placement_is_rejected_without_adding_a_page() {
        let asset = png_asset(50, 50);
        let mut pdf = assembler();

        let result = pdf.append_image_block(&asset, Placement { width: 25.0, height: 25.0 });

        assert!(matches!(result, Err(DocumentError::Append(_))));
        assert_eq!(pdf.block_count(), 0);
        assert!(matches!(pdf.serialize(), Err(DocumentError::Serialize(_))));
    }

    #[test]
    fn empty_document_cannot_be_serialized() {
        assert!(matches!(assembler().serialize(), Err(DocumentError::Serialize(_))));
    }

    #[test]
    fn invalid_geometry_is_rejected_up_front() {
        let geometry = PageGeometry {
            margin_left: 11.0,
            margin_right: 11.0,
            ..PageGeometry::default()
        };

        assert!(PdfAssembler::new("bad", geometry, ImageConfig::default()).is_err());
    }
}
