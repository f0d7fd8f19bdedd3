//! 内存中的宿主实现，供测试与快照前端使用。

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::host::{
    ElementId, HostApplication, HostDocument, HostError, HostPathPoint, PathStyle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Artboard,
    Layer,
    Group,
    Path,
}

impl ElementKind {
    /// 宿主脚本层的构造器名称。
    pub fn type_label(self) -> &'static str {
        match self {
            ElementKind::Artboard => "Artboard",
            ElementKind::Layer => "Layer",
            ElementKind::Group => "GroupItem",
            ElementKind::Path => "PathItem",
        }
    }

    #[inline]
    pub fn is_native(self) -> bool {
        matches!(self, ElementKind::Group | ElementKind::Path)
    }

    #[inline]
    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::Layer | ElementKind::Group)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ElementBody {
    Artboard { rect: Rect },
    Layer,
    Group,
    Path {
        style: PathStyle,
        points: Vec<HostPathPoint>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryElement {
    name: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    tags: Vec<(String, String)>,
    selected: bool,
    body: ElementBody,
}

impl MemoryElement {
    fn new(name: impl Into<String>, parent: Option<ElementId>, body: ElementBody) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            tags: Vec::new(),
            selected: false,
            body,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self.body {
            ElementBody::Artboard { .. } => ElementKind::Artboard,
            ElementBody::Layer => ElementKind::Layer,
            ElementBody::Group => ElementKind::Group,
            ElementBody::Path { .. } => ElementKind::Path,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// 子元素，保持插入顺序（组与路径混排）。
    #[inline]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// 标签按插入顺序保存。
    #[inline]
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn rect(&self) -> Option<Rect> {
        match &self.body {
            ElementBody::Artboard { rect } => Some(*rect),
            _ => None,
        }
    }

    pub fn path_style(&self) -> Option<&PathStyle> {
        match &self.body {
            ElementBody::Path { style, .. } => Some(style),
            _ => None,
        }
    }

    pub fn path_points(&self) -> Option<&[HostPathPoint]> {
        match &self.body {
            ElementBody::Path { points, .. } => Some(points),
            _ => None,
        }
    }
}

/// 以 arena 方式保存元素的内存文档。`ElementId` 即 arena 下标。
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDocument {
    name: String,
    elements: Vec<MemoryElement>,
    artboards: Vec<ElementId>,
    layers: Vec<ElementId>,
}

impl MemoryDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            artboards: Vec::new(),
            layers: Vec::new(),
        }
    }

    #[inline]
    pub fn document_name(&self) -> &str {
        &self.name
    }

    pub fn add_artboard(&mut self, name: impl Into<String>, rect: Rect) -> ElementId {
        let id = self.push(MemoryElement::new(name, None, ElementBody::Artboard { rect }));
        self.artboards.push(id);
        id
    }

    pub fn add_layer(&mut self, name: impl Into<String>) -> ElementId {
        let id = self.push(MemoryElement::new(name, None, ElementBody::Layer));
        self.layers.push(id);
        id
    }

    /// 在图层或组下新建组。
    pub fn add_group(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
    ) -> Result<ElementId, HostError> {
        self.add_child(parent, MemoryElement::new(name, Some(parent), ElementBody::Group))
    }

    /// 在图层或组下新建路径。
    pub fn add_path(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        style: PathStyle,
        points: Vec<HostPathPoint>,
    ) -> Result<ElementId, HostError> {
        self.add_child(
            parent,
            MemoryElement::new(name, Some(parent), ElementBody::Path { style, points }),
        )
    }

    /// 直接写入标签（存在则覆盖），用于构造测试数据或加载快照。
    pub fn set_tag(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HostError> {
        let element = self.native_mut(id)?;
        let name = name.into();
        let value = value.into();
        match element.tags.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => element.tags.push((name, value)),
        }
        Ok(())
    }

    pub fn select(&mut self, id: ElementId) -> Result<(), HostError> {
        let element = self.native_mut(id)?;
        element.selected = true;
        Ok(())
    }

    #[inline]
    pub fn element(&self, id: ElementId) -> Option<&MemoryElement> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.elements.get(index))
    }

    #[inline]
    pub fn artboard_ids(&self) -> &[ElementId] {
        &self.artboards
    }

    #[inline]
    pub fn layer_ids(&self) -> &[ElementId] {
        &self.layers
    }

    /// 元素总数（含画板与图层）。
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 先序遍历全部图层下的原生元素。
    pub fn native_items(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.layers.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(element) = self.element(id) else {
                continue;
            };
            if element.kind().is_native() {
                out.push(id);
            }
            stack.extend(element.children.iter().rev().copied());
        }
        out
    }

    fn push(&mut self, element: MemoryElement) -> ElementId {
        let id = ElementId::new(self.elements.len() as u64);
        self.elements.push(element);
        id
    }

    fn add_child(
        &mut self,
        parent: ElementId,
        element: MemoryElement,
    ) -> Result<ElementId, HostError> {
        let parent_kind = self.lookup(parent)?.kind();
        if !parent_kind.is_container() {
            return Err(HostError::Unsupported {
                id: parent.get(),
                capability: "children",
            });
        }
        let id = self.push(element);
        self.lookup_mut(parent)?.children.push(id);
        Ok(id)
    }

    fn lookup(&self, id: ElementId) -> Result<&MemoryElement, HostError> {
        self.element(id)
            .ok_or(HostError::UnknownElement(id.get()))
    }

    fn lookup_mut(&mut self, id: ElementId) -> Result<&mut MemoryElement, HostError> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.elements.get_mut(index))
            .ok_or(HostError::UnknownElement(id.get()))
    }

    fn native(&self, id: ElementId, capability: &'static str) -> Result<&MemoryElement, HostError> {
        let element = self.lookup(id)?;
        if element.kind().is_native() {
            Ok(element)
        } else {
            Err(HostError::Unsupported {
                id: id.get(),
                capability,
            })
        }
    }

    fn native_mut(&mut self, id: ElementId) -> Result<&mut MemoryElement, HostError> {
        let element = self.lookup_mut(id)?;
        if element.kind().is_native() {
            Ok(element)
        } else {
            Err(HostError::Unsupported {
                id: id.get(),
                capability: "tags",
            })
        }
    }

    fn container(&self, id: ElementId) -> Result<&MemoryElement, HostError> {
        let element = self.lookup(id)?;
        if element.kind().is_container() {
            Ok(element)
        } else {
            Err(HostError::Unsupported {
                id: id.get(),
                capability: "children",
            })
        }
    }

    fn children_of_kind(&self, id: ElementId, kind: ElementKind) -> Result<Vec<ElementId>, HostError> {
        let element = self.container(id)?;
        Ok(element
            .children
            .iter()
            .copied()
            .filter(|child| self.element(*child).map(MemoryElement::kind) == Some(kind))
            .collect())
    }

    fn path_body(&self, id: ElementId) -> Result<(&PathStyle, &[HostPathPoint]), HostError> {
        match &self.lookup(id)?.body {
            ElementBody::Path { style, points } => Ok((style, points)),
            _ => Err(HostError::Unsupported {
                id: id.get(),
                capability: "path geometry",
            }),
        }
    }
}

impl HostDocument for MemoryDocument {
    fn name(&self) -> Result<String, HostError> {
        Ok(self.name.clone())
    }

    fn artboards(&self) -> Result<Vec<ElementId>, HostError> {
        Ok(self.artboards.clone())
    }

    fn layers(&self) -> Result<Vec<ElementId>, HostError> {
        Ok(self.layers.clone())
    }

    fn group_items(&self) -> Result<Vec<ElementId>, HostError> {
        Ok(self
            .native_items()
            .into_iter()
            .filter(|id| self.element(*id).map(MemoryElement::kind) == Some(ElementKind::Group))
            .collect())
    }

    fn path_items(&self) -> Result<Vec<ElementId>, HostError> {
        Ok(self
            .native_items()
            .into_iter()
            .filter(|id| self.element(*id).map(MemoryElement::kind) == Some(ElementKind::Path))
            .collect())
    }

    fn selection(&self) -> Result<Vec<ElementId>, HostError> {
        Ok(self
            .native_items()
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(MemoryElement::is_selected))
            .collect())
    }

    fn element_name(&self, id: ElementId) -> Result<String, HostError> {
        Ok(self.lookup(id)?.name.clone())
    }

    fn set_element_name(&mut self, id: ElementId, name: &str) -> Result<(), HostError> {
        self.lookup_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn type_label(&self, id: ElementId) -> Result<String, HostError> {
        Ok(self.lookup(id)?.kind().type_label().to_string())
    }

    fn tag(&self, id: ElementId, name: &str) -> Result<Option<String>, HostError> {
        Ok(self.native(id, "tags")?.tag(name).map(str::to_string))
    }

    fn add_tag(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), HostError> {
        self.native_mut(id)?
            .tags
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn artboard_rect(&self, id: ElementId) -> Result<Rect, HostError> {
        self.lookup(id)?.rect().ok_or(HostError::Unsupported {
            id: id.get(),
            capability: "artboardRect",
        })
    }

    fn child_groups(&self, id: ElementId) -> Result<Vec<ElementId>, HostError> {
        self.children_of_kind(id, ElementKind::Group)
    }

    fn child_paths(&self, id: ElementId) -> Result<Vec<ElementId>, HostError> {
        self.children_of_kind(id, ElementKind::Path)
    }

    // 宿主无法给出组内元素的层叠位置，这里复现同样的限制。
    fn z_order(&self, id: ElementId) -> Result<i64, HostError> {
        let element = self.lookup(id)?;
        let siblings: &[ElementId] = match (element.kind(), element.parent) {
            (ElementKind::Artboard, _) => {
                return Err(HostError::Unsupported {
                    id: id.get(),
                    capability: "zOrderPosition",
                });
            }
            (_, None) => &self.layers,
            (_, Some(parent)) => {
                let container = self.lookup(parent)?;
                if container.kind() == ElementKind::Group {
                    return Err(HostError::ZOrderUnavailable(id.get()));
                }
                &container.children
            }
        };
        siblings
            .iter()
            .position(|sibling| *sibling == id)
            .map(|index| index as i64 + 1)
            .ok_or(HostError::UnknownElement(id.get()))
    }

    fn path_style(&self, id: ElementId) -> Result<PathStyle, HostError> {
        Ok(self.path_body(id)?.0.clone())
    }

    fn path_points(&self, id: ElementId) -> Result<Vec<HostPathPoint>, HostError> {
        Ok(self.path_body(id)?.1.to_vec())
    }
}

/// 内存宿主应用，按索引记录活动文档。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryApplication {
    documents: Vec<MemoryDocument>,
    active: usize,
}

impl MemoryApplication {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: MemoryDocument) -> Self {
        let mut app = Self::new();
        app.open(document);
        app
    }

    /// 打开文档并将其设为活动文档。
    pub fn open(&mut self, document: MemoryDocument) {
        self.documents.push(document);
        self.active = self.documents.len() - 1;
    }

    pub fn set_active(&mut self, index: usize) -> Result<(), HostError> {
        if index >= self.documents.len() {
            return Err(HostError::NoActiveDocument);
        }
        self.active = index;
        Ok(())
    }

    #[inline]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn documents(&self) -> &[MemoryDocument] {
        &self.documents
    }
}

impl HostApplication for MemoryApplication {
    type Document = MemoryDocument;

    fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn active_document(&mut self) -> Result<&mut MemoryDocument, HostError> {
        self.documents
            .get_mut(self.active)
            .ok_or(HostError::NoActiveDocument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    fn sample() -> (MemoryDocument, [ElementId; 5]) {
        let mut doc = MemoryDocument::new("sample.ai");
        let layer = doc.add_layer("Layer 1");
        let group = doc.add_group(layer, "chart").unwrap();
        let nested = doc
            .add_path(group, "bar", PathStyle::default(), Vec::new())
            .unwrap();
        let inner = doc.add_group(group, "axis").unwrap();
        let top = doc
            .add_path(
                layer,
                "outline",
                PathStyle::default(),
                vec![HostPathPoint::corner(Point2::new(1.0, 2.0))],
            )
            .unwrap();
        (doc, [layer, group, nested, inner, top])
    }

    #[test]
    fn flat_collections_follow_preorder() {
        let (doc, [_, group, nested, inner, top]) = sample();
        assert_eq!(doc.group_items().unwrap(), vec![group, inner]);
        assert_eq!(doc.path_items().unwrap(), vec![nested, top]);
    }

    #[test]
    fn children_are_split_by_kind_in_host_order() {
        let (doc, [layer, group, nested, inner, top]) = sample();
        assert_eq!(doc.child_groups(layer).unwrap(), vec![group]);
        assert_eq!(doc.child_paths(layer).unwrap(), vec![top]);
        assert_eq!(doc.child_groups(group).unwrap(), vec![inner]);
        assert_eq!(doc.child_paths(group).unwrap(), vec![nested]);
    }

    #[test]
    fn z_order_faults_inside_groups() {
        let (doc, [layer, group, nested, _, top]) = sample();
        assert_eq!(doc.z_order(layer).unwrap(), 1);
        assert_eq!(doc.z_order(group).unwrap(), 1);
        assert_eq!(doc.z_order(top).unwrap(), 2);
        assert_eq!(
            doc.z_order(nested).unwrap_err(),
            HostError::ZOrderUnavailable(nested.get())
        );
    }

    #[test]
    fn tags_only_exist_on_native_elements() {
        let (mut doc, [layer, group, ..]) = sample();
        assert_eq!(doc.tag(group, "id3_data").unwrap(), None);
        doc.add_tag(group, "id3_data", "{}").unwrap();
        assert_eq!(doc.tag(group, "id3_data").unwrap().as_deref(), Some("{}"));
        assert!(matches!(
            doc.tag(layer, "id3_data"),
            Err(HostError::Unsupported { .. })
        ));
    }

    #[test]
    fn selection_and_type_labels() {
        let (mut doc, [layer, _, nested, _, _]) = sample();
        doc.select(nested).unwrap();
        assert_eq!(doc.selection().unwrap(), vec![nested]);
        assert_eq!(doc.type_label(layer).unwrap(), "Layer");
        assert_eq!(doc.type_label(nested).unwrap(), "PathItem");
    }

    #[test]
    fn application_tracks_active_document() {
        let mut app = MemoryApplication::new();
        assert_eq!(app.document_count(), 0);
        assert_eq!(app.active_document().unwrap_err(), HostError::NoActiveDocument);

        app.open(MemoryDocument::new("a.ai"));
        app.open(MemoryDocument::new("b.ai"));
        assert_eq!(app.active_document().unwrap().document_name(), "b.ai");
        app.set_active(0).unwrap();
        assert_eq!(app.active_document().unwrap().document_name(), "a.ai");
        assert!(app.set_active(5).is_err());
    }
}
