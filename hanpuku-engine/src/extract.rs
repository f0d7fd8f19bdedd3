use hanpuku_core::document::{
    Artboard, CanonicalColor, Document, Group, ItemType, Metadata, Path, PathPoint,
};
use hanpuku_core::geometry::Bounds2D;
use hanpuku_core::host::{ElementId, HostApplication, HostDocument, HostPathPoint};
use tracing::{debug, info};

use crate::color::ColorNormalizer;
use crate::errors::{ExtractError, ExtractErrorKind};
use crate::naming::standardize_document;
use crate::options::ExtractOptions;
use crate::tags::TagNames;

/// 读取路径点并翻转三组坐标的纵向分量。
pub fn extract_points(points: &[HostPathPoint]) -> Vec<PathPoint> {
    points
        .iter()
        .map(|point| PathPoint {
            anchor: point.anchor.flip_y(),
            left_direction: point.left_direction.flip_y(),
            right_direction: point.right_direction.flip_y(),
        })
        .collect()
}

/// 文档显示名：宿主文件名第一个 `.` 之前的部分。
pub fn display_name(host_name: &str) -> &str {
    host_name.split('.').next().unwrap_or_default()
}

/// 递归提取器。调用前文档必须已经完成名称标准化。
pub struct TreeExtractor<'a, D: ?Sized> {
    document: &'a D,
    options: &'a ExtractOptions,
    tags: TagNames,
    colors: &'a mut ColorNormalizer,
}

impl<'a, D> TreeExtractor<'a, D>
where
    D: HostDocument + ?Sized,
{
    pub fn new(
        document: &'a D,
        options: &'a ExtractOptions,
        colors: &'a mut ColorNormalizer,
    ) -> Self {
        Self {
            document,
            options,
            tags: options.tag_names(),
            colors,
        }
    }

    pub fn extract_path(&mut self, id: ElementId) -> Result<Path, ExtractError> {
        let document = self.document;
        let style = document.path_style(id)?;

        let mut fill = self.colors.normalize(&style.fill_color);
        let mut stroke = self.colors.normalize(&style.stroke_color);
        if !style.filled {
            fill = CanonicalColor::None;
        }
        if !style.stroked {
            stroke = CanonicalColor::None;
        }

        Ok(Path {
            item_type: ItemType::Path,
            name: document.element_name(id)?,
            fill,
            stroke,
            stroke_width: style.stroke_width,
            opacity: style.opacity / 100.0,
            closed: style.closed,
            z_index: self.z_index(id)?,
            points: extract_points(&document.path_points(id)?),
            metadata: self.metadata(id)?,
        })
    }

    /// 提取图层或组。只有 `ItemType::Group` 会读取元数据标签。
    pub fn extract_group(&mut self, id: ElementId, kind: ItemType) -> Result<Group, ExtractError> {
        let document = self.document;
        let mut group = Group::new(kind, document.element_name(id)?, self.z_index(id)?);
        if kind == ItemType::Group {
            group.metadata = Some(self.metadata(id)?);
        }

        for child in document.child_groups(id)? {
            group.groups.push(self.extract_group(child, ItemType::Group)?);
        }
        for child in document.child_paths(id)? {
            group.paths.push(self.extract_path(child)?);
        }
        Ok(group)
    }

    fn z_index(&self, id: ElementId) -> Result<i64, ExtractError> {
        match self.document.z_order(id) {
            Ok(z_index) => Ok(z_index),
            Err(err) if self.options.absorb_z_order_faults => {
                debug!(
                    element = id.get(),
                    error = %err,
                    fallback = self.options.z_order_fallback,
                    "无法读取层叠位置，使用默认值"
                );
                Ok(self.options.z_order_fallback)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn metadata(&self, id: ElementId) -> Result<Metadata, ExtractError> {
        let raw_data = self.required_tag(id, &self.tags.data)?;
        let data = serde_json::from_str(&raw_data).map_err(|source| {
            ExtractError::new(ExtractErrorKind::MalformedData {
                element: self.element_label(id),
                tag: self.tags.data.clone(),
                source,
            })
        })?;
        Ok(Metadata {
            data,
            class_names: self.required_tag(id, &self.tags.class_names)?,
            reverse_transform: self.required_tag(id, &self.tags.reverse_transform)?,
        })
    }

    fn required_tag(&self, id: ElementId, tag: &str) -> Result<String, ExtractError> {
        match self.document.tag(id, tag)? {
            Some(value) => Ok(value),
            None => Err(ExtractError::new(ExtractErrorKind::MissingTag {
                element: self.element_label(id),
                tag: tag.to_string(),
            })),
        }
    }

    fn element_label(&self, id: ElementId) -> String {
        self.document
            .element_name(id)
            .unwrap_or_else(|_| format!("#{}", id.get()))
    }
}

/// 提取当前活动文档。没有打开的文档时返回 `Ok(None)`。
///
/// 提取前会先对整个文档做名称标准化，这会永久修改宿主元素的名称与标签。
pub fn extract_document<A>(
    app: &mut A,
    options: &ExtractOptions,
    colors: &mut ColorNormalizer,
) -> Result<Option<Document>, ExtractError>
where
    A: HostApplication + ?Sized,
{
    if app.document_count() == 0 {
        info!("没有打开的文档");
        return Ok(None);
    }

    let document = app.active_document()?;
    standardize_document(document, options)?;
    let document = &*document;

    let host_name = document.name()?;
    let mut output = Document::new(display_name(&host_name));

    let mut bounds = Bounds2D::empty();
    for id in document.artboards()? {
        let rect = document.artboard_rect(id)?.flip_vertical();
        bounds.include_rect(&rect);
        output.artboards.push(Artboard {
            name: document.element_name(id)?,
            rect,
        });
    }
    output.set_bounds(bounds.extent());

    let mut extractor = TreeExtractor::new(document, options, colors);
    for id in document.layers()? {
        output.layers.push(extractor.extract_group(id, ItemType::Layer)?);
    }

    for id in document.selection()? {
        output.selection.push(document.element_name(id)?);
    }

    info!(
        document = %output.name,
        artboards = output.artboards.len(),
        layers = output.layers.len(),
        selection = output.selection.len(),
        "文档提取完成"
    );
    Ok(Some(output))
}
