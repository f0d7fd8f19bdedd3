//! 宿主文档模型的能力接口。
//!
//! 提取流程只通过这里的 trait 访问宿主：元素以 `ElementId` 句柄引用，
//! 同一元素可以同时出现在扁平集合（如 `path_items`）与容器子列表中。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point2, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于序列化或日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no active document")]
    NoActiveDocument,
    #[error("element {0} does not exist")]
    UnknownElement(u64),
    #[error("element {id} does not support {capability}")]
    Unsupported { id: u64, capability: &'static str },
    #[error("Internal error: zOrderPosition is unavailable for element {0}")]
    ZOrderUnavailable(u64),
    #[error("{0}")]
    Fault(String),
}

/// 宿主颜色值，按颜色模型区分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum HostColor {
    Rgb {
        red: f64,
        green: f64,
        blue: f64,
    },
    Gray {
        gray: f64,
    },
    Cmyk {
        cyan: f64,
        magenta: f64,
        yellow: f64,
        black: f64,
    },
    NoColor,
    /// 其它宿主颜色模型（渐变、图案、专色等），只保留类型名。
    Other {
        typename: String,
    },
}

impl HostColor {
    /// 宿主脚本层使用的类型名。
    pub fn typename(&self) -> &str {
        match self {
            HostColor::Rgb { .. } => "RGBColor",
            HostColor::Gray { .. } => "GrayColor",
            HostColor::Cmyk { .. } => "CMYKColor",
            HostColor::NoColor => "NoColor",
            HostColor::Other { typename } => typename,
        }
    }
}

/// 路径上的一个点：锚点与左右两个控制柄，均为宿主坐标。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPathPoint {
    pub anchor: Point2,
    pub left_direction: Point2,
    pub right_direction: Point2,
}

impl HostPathPoint {
    /// 控制柄与锚点重合的角点。
    pub fn corner(anchor: Point2) -> Self {
        Self {
            anchor,
            left_direction: anchor,
            right_direction: anchor,
        }
    }
}

/// 路径的外观属性。`opacity` 为宿主的百分比（0–100）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathStyle {
    pub fill_color: HostColor,
    pub stroke_color: HostColor,
    pub filled: bool,
    pub stroked: bool,
    pub stroke_width: f64,
    pub opacity: f64,
    pub closed: bool,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            fill_color: HostColor::NoColor,
            stroke_color: HostColor::NoColor,
            filled: true,
            stroked: true,
            stroke_width: 1.0,
            opacity: 100.0,
            closed: false,
        }
    }
}

/// 单个打开文档的能力集合。
///
/// 标签查询以 `Option` 表示“不存在”，`Err` 仅用于真正的宿主故障。
pub trait HostDocument {
    fn name(&self) -> Result<String, HostError>;

    fn artboards(&self) -> Result<Vec<ElementId>, HostError>;
    fn layers(&self) -> Result<Vec<ElementId>, HostError>;
    /// 文档内全部组元素（任意嵌套深度）。
    fn group_items(&self) -> Result<Vec<ElementId>, HostError>;
    /// 文档内全部路径元素（任意嵌套深度）。
    fn path_items(&self) -> Result<Vec<ElementId>, HostError>;
    fn selection(&self) -> Result<Vec<ElementId>, HostError>;

    fn element_name(&self, id: ElementId) -> Result<String, HostError>;
    fn set_element_name(&mut self, id: ElementId, name: &str) -> Result<(), HostError>;
    /// 元素的宿主类型名，命名回退时使用。
    fn type_label(&self, id: ElementId) -> Result<String, HostError>;

    fn tag(&self, id: ElementId, name: &str) -> Result<Option<String>, HostError>;
    fn add_tag(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), HostError>;

    fn artboard_rect(&self, id: ElementId) -> Result<Rect, HostError>;

    fn child_groups(&self, id: ElementId) -> Result<Vec<ElementId>, HostError>;
    fn child_paths(&self, id: ElementId) -> Result<Vec<ElementId>, HostError>;
    fn z_order(&self, id: ElementId) -> Result<i64, HostError>;

    fn path_style(&self, id: ElementId) -> Result<PathStyle, HostError>;
    fn path_points(&self, id: ElementId) -> Result<Vec<HostPathPoint>, HostError>;
}

/// 宿主应用：打开文档数量与当前活动文档。
pub trait HostApplication {
    type Document: HostDocument;

    fn document_count(&self) -> usize;
    fn active_document(&mut self) -> Result<&mut Self::Document, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_color_typenames_match_script_names() {
        assert_eq!(
            HostColor::Rgb {
                red: 1.0,
                green: 2.0,
                blue: 3.0
            }
            .typename(),
            "RGBColor"
        );
        assert_eq!(HostColor::NoColor.typename(), "NoColor");
        let pattern = HostColor::Other {
            typename: "PatternColor".to_string(),
        };
        assert_eq!(pattern.typename(), "PatternColor");
    }

    #[test]
    fn path_style_defaults_fill_missing_fields() {
        let style: PathStyle = serde_json::from_str(
            r#"{ "fillColor": { "model": "gray", "gray": 50 }, "opacity": 40 }"#,
        )
        .unwrap();
        assert_eq!(style.fill_color, HostColor::Gray { gray: 50.0 });
        assert_eq!(style.stroke_color, HostColor::NoColor);
        assert!(style.filled);
        assert_eq!(style.opacity, 40.0);
        assert_eq!(style.stroke_width, 1.0);
    }
}
