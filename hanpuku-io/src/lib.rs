use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hanpuku_core::{
    geometry::Rect,
    host::{ElementId, HostError, HostPathPoint, PathStyle},
    memory::{ElementKind, MemoryApplication, MemoryDocument, MemoryElement},
};
use hanpuku_engine::ResultEnvelope;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

impl From<HostError> for IoError {
    fn from(value: HostError) -> Self {
        IoError::InvalidDocument(value.to_string())
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<MemoryApplication, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, app: &MemoryApplication, path: &Path) -> Result<(), IoError>;
}

/// 宿主状态的 JSON 快照。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    #[serde(default)]
    pub active: usize,
    #[serde(default)]
    pub documents: Vec<DocumentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub name: String,
    #[serde(default)]
    pub artboards: Vec<ArtboardSnapshot>,
    #[serde(default)]
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtboardSnapshot {
    #[serde(default)]
    pub name: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<ItemSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemSnapshot {
    Group {
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        tags: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "is_false")]
        selected: bool,
        #[serde(default)]
        items: Vec<ItemSnapshot>,
    },
    Path {
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        tags: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "is_false")]
        selected: bool,
        #[serde(default)]
        style: PathStyle,
        #[serde(default)]
        points: Vec<HostPathPoint>,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub struct SnapshotFacade;

impl SnapshotFacade {
    pub fn new() -> Self {
        Self
    }

    /// 从快照文本构建内存宿主。
    pub fn parse(&self, source: &str) -> Result<MemoryApplication, IoError> {
        let snapshot: ApplicationSnapshot = serde_json::from_str(source)?;
        build_application(&snapshot)
    }

    /// 把内存宿主的当前状态（包括标准化后的名称与补齐的标签）导出为快照文本。
    pub fn to_json(&self, app: &MemoryApplication) -> Result<String, IoError> {
        let snapshot = capture_application(app)?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }
}

impl Default for SnapshotFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for SnapshotFacade {
    fn load(&self, path: &Path) -> Result<MemoryApplication, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let app = self.parse(&data)?;
        info!(
            path = %path.display(),
            documents = app.documents().len(),
            "已加载宿主快照"
        );
        Ok(app)
    }
}

impl DocumentSaver for SnapshotFacade {
    fn save(&self, app: &MemoryApplication, path: &Path) -> Result<(), IoError> {
        let content = self.to_json(app)?;
        write_file(path, &content)?;
        info!(path = %path.display(), "已写回宿主快照");
        Ok(())
    }
}

/// 把结果封包写入文件。
pub fn write_packet(envelope: &ResultEnvelope, path: &Path, pretty: bool) -> Result<(), IoError> {
    let content = if pretty {
        envelope.json_packet_pretty()
    } else {
        envelope.json_packet()
    };
    write_file(path, &content)
}

fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    fs::write(path, content).map_err(|source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

pub fn build_application(snapshot: &ApplicationSnapshot) -> Result<MemoryApplication, IoError> {
    let mut app = MemoryApplication::new();
    for document in &snapshot.documents {
        app.open(build_document(document)?);
    }
    if !snapshot.documents.is_empty() {
        app.set_active(snapshot.active).map_err(|_| {
            IoError::InvalidDocument(format!(
                "active document index {} out of range (documents: {})",
                snapshot.active,
                snapshot.documents.len()
            ))
        })?;
    }
    Ok(app)
}

pub fn build_document(snapshot: &DocumentSnapshot) -> Result<MemoryDocument, IoError> {
    let mut document = MemoryDocument::new(snapshot.name.clone());
    for artboard in &snapshot.artboards {
        document.add_artboard(artboard.name.clone(), artboard.rect);
    }
    for layer in &snapshot.layers {
        let id = document.add_layer(layer.name.clone());
        for item in &layer.items {
            build_item(&mut document, id, item)?;
        }
    }
    debug!(
        document = %snapshot.name,
        elements = document.len(),
        "已构建内存文档"
    );
    Ok(document)
}

fn build_item(
    document: &mut MemoryDocument,
    parent: ElementId,
    item: &ItemSnapshot,
) -> Result<(), IoError> {
    let (id, tags, selected) = match item {
        ItemSnapshot::Group {
            name,
            tags,
            selected,
            items,
        } => {
            let id = document.add_group(parent, name.clone())?;
            for child in items {
                build_item(document, id, child)?;
            }
            (id, tags, *selected)
        }
        ItemSnapshot::Path {
            name,
            tags,
            selected,
            style,
            points,
        } => {
            let id = document.add_path(parent, name.clone(), style.clone(), points.clone())?;
            (id, tags, *selected)
        }
    };
    for (name, value) in tags {
        document.set_tag(id, name.clone(), value.clone())?;
    }
    if selected {
        document.select(id)?;
    }
    Ok(())
}

pub fn capture_application(app: &MemoryApplication) -> Result<ApplicationSnapshot, IoError> {
    Ok(ApplicationSnapshot {
        active: app.active_index(),
        documents: app
            .documents()
            .iter()
            .map(capture_document)
            .collect::<Result<_, _>>()?,
    })
}

pub fn capture_document(document: &MemoryDocument) -> Result<DocumentSnapshot, IoError> {
    let mut artboards = Vec::new();
    for &id in document.artboard_ids() {
        let element = lookup(document, id)?;
        let rect = element.rect().ok_or_else(|| {
            IoError::InvalidDocument(format!("element {} is not an artboard", id.get()))
        })?;
        artboards.push(ArtboardSnapshot {
            name: element.name().to_string(),
            rect,
        });
    }

    let mut layers = Vec::new();
    for &id in document.layer_ids() {
        let element = lookup(document, id)?;
        layers.push(LayerSnapshot {
            name: element.name().to_string(),
            items: capture_children(document, element.children())?,
        });
    }

    Ok(DocumentSnapshot {
        name: document.document_name().to_string(),
        artboards,
        layers,
    })
}

fn capture_children(
    document: &MemoryDocument,
    children: &[ElementId],
) -> Result<Vec<ItemSnapshot>, IoError> {
    children
        .iter()
        .map(|&id| capture_item(document, id))
        .collect()
}

fn capture_item(document: &MemoryDocument, id: ElementId) -> Result<ItemSnapshot, IoError> {
    let element = lookup(document, id)?;
    let name = element.name().to_string();
    let tags: BTreeMap<String, String> = element.tags().iter().cloned().collect();
    let selected = element.is_selected();
    match element.kind() {
        ElementKind::Group => Ok(ItemSnapshot::Group {
            name,
            tags,
            selected,
            items: capture_children(document, element.children())?,
        }),
        ElementKind::Path => Ok(ItemSnapshot::Path {
            name,
            tags,
            selected,
            style: element.path_style().cloned().unwrap_or_default(),
            points: element.path_points().map(<[_]>::to_vec).unwrap_or_default(),
        }),
        kind => Err(IoError::InvalidDocument(format!(
            "element {} of kind {kind:?} cannot be nested in a container",
            id.get()
        ))),
    }
}

fn lookup(document: &MemoryDocument, id: ElementId) -> Result<&MemoryElement, IoError> {
    document
        .element(id)
        .ok_or_else(|| IoError::from(HostError::UnknownElement(id.get())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanpuku_core::host::{HostApplication, HostColor, HostDocument};

    const MINIMAL: &str = r#"{
        "documents": [{
            "name": "minimal.ai",
            "artboards": [{ "name": "Artboard 1", "rect": [0, 0, 100, -50] }],
            "layers": [{
                "name": "Layer 1",
                "items": [
                    { "type": "path", "name": "dot", "selected": true,
                      "style": { "fillColor": { "model": "rgb", "red": 1, "green": 2, "blue": 3 } },
                      "tags": { "id3_classNames": "dot" } },
                    { "type": "group", "name": "empty" }
                ]
            }]
        }]
    }"#;

    #[test]
    fn parse_builds_memory_host() {
        let mut app = SnapshotFacade::new().parse(MINIMAL).unwrap();
        assert_eq!(app.document_count(), 1);
        let doc = app.active_document().unwrap();
        assert_eq!(doc.document_name(), "minimal.ai");

        let paths = doc.path_items().unwrap();
        assert_eq!(paths.len(), 1);
        let style = doc.path_style(paths[0]).unwrap();
        assert_eq!(
            style.fill_color,
            HostColor::Rgb {
                red: 1.0,
                green: 2.0,
                blue: 3.0
            }
        );
        assert_eq!(doc.tag(paths[0], "id3_classNames").unwrap().as_deref(), Some("dot"));
        assert_eq!(doc.selection().unwrap(), paths);
        assert_eq!(doc.group_items().unwrap().len(), 1);
        assert_eq!(
            doc.artboard_rect(doc.artboards().unwrap()[0]).unwrap(),
            Rect::new(0.0, 0.0, 100.0, -50.0)
        );
    }

    #[test]
    fn capture_round_trips_host_state() {
        let app = SnapshotFacade::new().parse(MINIMAL).unwrap();
        let snapshot = capture_application(&app).unwrap();
        let rebuilt = build_application(&snapshot).unwrap();
        assert_eq!(rebuilt, app);
    }

    #[test]
    fn active_index_out_of_range_is_rejected() {
        let err = SnapshotFacade::new()
            .parse(r#"{ "active": 3, "documents": [{ "name": "a.ai" }] }"#)
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }

    #[test]
    fn malformed_snapshot_is_a_parse_error() {
        let err = SnapshotFacade::new()
            .parse(r#"{ "documents": [{ "layers": 3 }] }"#)
            .unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }
}
