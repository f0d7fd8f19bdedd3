pub mod host;
pub mod memory;

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 宿主坐标系的纵轴向上，规范输出的纵轴向下，二者之间只差一次取反。
    #[inline]
    pub fn flip_y(value: f64) -> f64 {
        // 以减法代替取负，避免序列化出 `-0.0`。
        0.0 - value
    }

    /// 二维点，内部以 `glam::DVec2` 表示，序列化为 `[x, y]`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 翻转纵坐标，横坐标保持不变。
        #[inline]
        pub fn flip_y(self) -> Self {
            Self::new(self.0.x, flip_y(self.0.y))
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl From<[f64; 2]> for Point2 {
        fn from(value: [f64; 2]) -> Self {
            Self::new(value[0], value[1])
        }
    }

    /// 画板矩形，字段顺序与宿主一致：`[left, top, right, bottom]`。
    ///
    /// 宿主并不保证 `left <= right`、`top <= bottom`，这里按原样保存，不做排序。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(from = "[f64; 4]", into = "[f64; 4]")]
    pub struct Rect {
        pub left: f64,
        pub top: f64,
        pub right: f64,
        pub bottom: f64,
    }

    impl Rect {
        #[inline]
        pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
            Self {
                left,
                top,
                right,
                bottom,
            }
        }

        #[inline]
        pub fn to_array(self) -> [f64; 4] {
            [self.left, self.top, self.right, self.bottom]
        }

        /// 翻转两个纵向分量（`top` 与 `bottom`）。
        #[inline]
        pub fn flip_vertical(self) -> Self {
            Self {
                top: flip_y(self.top),
                bottom: flip_y(self.bottom),
                ..self
            }
        }
    }

    impl From<[f64; 4]> for Rect {
        fn from(value: [f64; 4]) -> Self {
            Self::new(value[0], value[1], value[2], value[3])
        }
    }

    impl From<Rect> for [f64; 4] {
        fn from(value: Rect) -> Self {
            value.to_array()
        }
    }

    /// 文档范围累加器。第一个矩形确定全部四个边界，之后 `left`/`top` 取较小值，
    /// `right`/`bottom` 取较大值；逐字段比较，不对矩形本身做归一化。
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Bounds2D {
        extent: Option<Rect>,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self { extent: None }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.extent.is_none()
        }

        pub fn include_rect(&mut self, rect: &Rect) {
            let Some(extent) = self.extent.as_mut() else {
                self.extent = Some(*rect);
                return;
            };
            if extent.left > rect.left {
                extent.left = rect.left;
            }
            if extent.top > rect.top {
                extent.top = rect.top;
            }
            if extent.right < rect.right {
                extent.right = rect.right;
            }
            if extent.bottom < rect.bottom {
                extent.bottom = rect.bottom;
            }
        }

        #[inline]
        pub fn extent(&self) -> Option<Rect> {
            self.extent
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn flipping_twice_restores_value() {
            for value in [0.0, 12.5, -3.25, 1e9] {
                assert_eq!(flip_y(flip_y(value)), value);
            }
            let point = Point2::new(4.0, -7.5);
            assert_eq!(point.flip_y().flip_y(), point);
            assert_eq!(point.flip_y(), Point2::new(4.0, 7.5));
        }

        #[test]
        fn rect_flip_only_touches_vertical_fields() {
            let rect = Rect::new(1.0, 2.0, 3.0, 4.0).flip_vertical();
            assert_eq!(rect.to_array(), [1.0, -2.0, 3.0, -4.0]);
        }

        #[test]
        fn single_rect_seeds_bounds() {
            let mut bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            bounds.include_rect(&Rect::new(0.0, 0.0, 10.0, 10.0).flip_vertical());
            let extent = bounds.extent().expect("bounds should be seeded");
            assert_eq!(extent.to_array(), [0.0, 0.0, 10.0, -10.0]);
        }

        #[test]
        fn bounds_fold_fieldwise_without_sorting() {
            let mut bounds = Bounds2D::empty();
            bounds.include_rect(&Rect::new(0.0, 0.0, 10.0, 10.0).flip_vertical());
            bounds.include_rect(&Rect::new(5.0, 5.0, 20.0, 20.0).flip_vertical());
            let extent = bounds.extent().unwrap();
            assert_eq!(extent.left, 0.0);
            assert_eq!(extent.top, -5.0);
            assert_eq!(extent.right, 20.0);
            assert_eq!(extent.bottom, -10.0);
        }

        #[test]
        fn rect_and_point_serialize_as_arrays() {
            let rect = serde_json::to_value(Rect::new(1.0, -2.0, 3.0, -4.0)).unwrap();
            assert_eq!(rect, serde_json::json!([1.0, -2.0, 3.0, -4.0]));
            let point = serde_json::to_value(Point2::new(0.5, 2.0)).unwrap();
            assert_eq!(point, serde_json::json!([0.5, 2.0]));
        }
    }
}

pub mod document {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::geometry::{Point2, Rect};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ItemType {
        Document,
        Layer,
        Group,
        Path,
    }

    /// 规范颜色：`rgb(r,g,b)` 或字面量 `none`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(into = "String", try_from = "String")]
    pub enum CanonicalColor {
        Rgb { red: f64, green: f64, blue: f64 },
        None,
    }

    impl CanonicalColor {
        #[inline]
        pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
            Self::Rgb { red, green, blue }
        }

        #[inline]
        pub fn is_none(&self) -> bool {
            matches!(self, CanonicalColor::None)
        }
    }

    // f64 的 Display 对整数值不输出小数部分，与宿主脚本的数字格式一致。
    impl fmt::Display for CanonicalColor {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CanonicalColor::Rgb { red, green, blue } => {
                    write!(f, "rgb({red},{green},{blue})")
                }
                CanonicalColor::None => f.write_str("none"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("invalid canonical color: {0:?}")]
    pub struct ParseColorError(String);

    impl FromStr for CanonicalColor {
        type Err = ParseColorError;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            if value == "none" {
                return Ok(CanonicalColor::None);
            }
            let invalid = || ParseColorError(value.to_string());
            let inner = value
                .strip_prefix("rgb(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(invalid)?;
            let channels = inner
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            match channels.as_slice() {
                [red, green, blue] => Ok(CanonicalColor::rgb(*red, *green, *blue)),
                _ => Err(invalid()),
            }
        }
    }

    impl From<CanonicalColor> for String {
        fn from(value: CanonicalColor) -> Self {
            value.to_string()
        }
    }

    impl TryFrom<String> for CanonicalColor {
        type Error = ParseColorError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            value.parse()
        }
    }

    /// 原生元素（组与路径）随附的元数据：`data` 已解析为 JSON，其余两项原样保留。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Metadata {
        pub data: serde_json::Value,
        pub class_names: String,
        pub reverse_transform: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Artboard {
        pub name: String,
        pub rect: Rect,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathPoint {
        pub anchor: Point2,
        pub left_direction: Point2,
        pub right_direction: Point2,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Path {
        pub item_type: ItemType,
        pub name: String,
        pub fill: CanonicalColor,
        pub stroke: CanonicalColor,
        pub stroke_width: f64,
        pub opacity: f64,
        pub closed: bool,
        pub z_index: i64,
        pub points: Vec<PathPoint>,
        #[serde(flatten)]
        pub metadata: Metadata,
    }

    /// 图层与组共用的结构。只有 `ItemType::Group` 携带元数据。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Group {
        pub item_type: ItemType,
        pub name: String,
        pub groups: Vec<Group>,
        pub paths: Vec<Path>,
        pub z_index: i64,
        #[serde(flatten)]
        pub metadata: Option<Metadata>,
    }

    impl Group {
        pub fn new(item_type: ItemType, name: impl Into<String>, z_index: i64) -> Self {
            Self {
                item_type,
                name: name.into(),
                groups: Vec::new(),
                paths: Vec::new(),
                z_index,
                metadata: None,
            }
        }

        /// 递归统计子树中的组与路径数量（不含自身）。
        pub fn descendant_count(&self) -> usize {
            self.paths.len()
                + self
                    .groups
                    .iter()
                    .map(|group| 1 + group.descendant_count())
                    .sum::<usize>()
        }
    }

    /// 输出树的根节点。文档没有画板时四个边界字段不会被序列化。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Document {
        pub item_type: ItemType,
        pub name: String,
        pub artboards: Vec<Artboard>,
        pub layers: Vec<Group>,
        pub selection: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub left: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub top: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub right: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub bottom: Option<f64>,
    }

    impl Document {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                item_type: ItemType::Document,
                name: name.into(),
                artboards: Vec::new(),
                layers: Vec::new(),
                selection: Vec::new(),
                left: None,
                top: None,
                right: None,
                bottom: None,
            }
        }

        pub fn set_bounds(&mut self, extent: Option<Rect>) {
            self.left = extent.map(|rect| rect.left);
            self.top = extent.map(|rect| rect.top);
            self.right = extent.map(|rect| rect.right);
            self.bottom = extent.map(|rect| rect.bottom);
        }

        pub fn bounds(&self) -> Option<Rect> {
            Some(Rect::new(self.left?, self.top?, self.right?, self.bottom?))
        }
    }

}
