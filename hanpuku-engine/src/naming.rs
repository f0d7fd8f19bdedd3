//! 标识符标准化：保证文档内每个元素的名称唯一且只含安全字符。
//!
//! 名称必须以 ASCII 字母开头，只能包含 `[A-Za-z0-9_-]`，区分大小写。
//! 四个扁平集合依次处理：画板、图层、全部路径、全部组；注册表在四轮之间共享，
//! 因此名称在整个文档内唯一，而不仅仅是在同一类元素内唯一。

use std::collections::{HashMap, HashSet};

use hanpuku_core::host::{ElementId, HostDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::ExtractError;
use crate::options::ExtractOptions;
use crate::tags::{TagNames, ensure_tags};

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid identifier regex"));

/// 始终视为已占用的名称。包含空串，这样无名元素一定会得到新名称。
const RESERVED_NAMES: &[&str] = &[""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCategory {
    Artboards,
    Layers,
    /// 路径与组：拥有标签存储的元素。
    Native,
}

impl ElementCategory {
    #[inline]
    pub fn is_native(self) -> bool {
        matches!(self, ElementCategory::Native)
    }

    pub fn label(self) -> &'static str {
        match self {
            ElementCategory::Artboards => "artboards",
            ElementCategory::Layers => "layers",
            ElementCategory::Native => "native",
        }
    }
}

/// 单次标准化过程的名称注册表。
#[derive(Debug, Clone)]
pub struct NameRegistry {
    assigned: HashMap<String, ElementId>,
    reserved: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self {
            assigned: HashMap::new(),
            reserved: RESERVED_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// 额外保留名称（例如调用方面板已使用的标识符）。
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    #[inline]
    pub fn is_taken(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.assigned.contains_key(name)
    }

    pub fn insert(&mut self, name: String, id: ElementId) {
        self.assigned.insert(name, id);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<ElementId> {
        self.assigned.get(name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assigned.keys().map(String::as_str)
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 标准化统计，幂等性检查依赖 `renamed`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardizeReport {
    pub visited: usize,
    pub renamed: usize,
    pub tags_created: usize,
}

impl StandardizeReport {
    fn absorb(&mut self, other: StandardizeReport) {
        self.visited += other.visited;
        self.renamed += other.renamed;
        self.tags_created += other.tags_created;
    }
}

/// 把非法字符替换为 `_`。
pub fn sanitize_name(raw: &str) -> String {
    INVALID_CHARS.replace_all(raw, "_").into_owned()
}

/// 计算候选基础名：空名回退为类型名，非字母开头时加上 `类型名_` 前缀。
pub fn base_name(raw: &str, type_label: &str) -> String {
    let sanitized = sanitize_name(raw);
    match sanitized.chars().next() {
        None => type_label.to_string(),
        Some(first) if !first.is_ascii_alphabetic() => format!("{type_label}_{sanitized}"),
        Some(_) => sanitized,
    }
}

/// 标准化一个集合。`free_id` 在同一轮内持续递增，不随元素重置。
pub fn standardize_items<D>(
    document: &mut D,
    items: &[ElementId],
    category: ElementCategory,
    registry: &mut NameRegistry,
    tags: &TagNames,
    default_tag_value: &str,
) -> Result<StandardizeReport, ExtractError>
where
    D: HostDocument + ?Sized,
{
    let mut report = StandardizeReport::default();
    let mut free_id: u64 = 1;

    for &id in items {
        let old_name = document.element_name(id)?;
        let type_label = document.type_label(id)?;
        let base = base_name(&old_name, &type_label);

        let mut new_name = base.clone();
        while registry.is_taken(&new_name) {
            new_name = format!("{base}{free_id}");
            free_id += 1;
        }

        if new_name != old_name {
            debug!(
                element = id.get(),
                category = category.label(),
                from = %old_name,
                to = %new_name,
                "元素已重命名"
            );
            document.set_element_name(id, &new_name)?;
            report.renamed += 1;
        }
        registry.insert(new_name, id);

        if category.is_native() {
            report.tags_created += ensure_tags(document, id, tags, default_tag_value)?;
        }
        report.visited += 1;
    }

    Ok(report)
}

/// 对整个文档执行标准化，顺序固定为：画板、图层、全部路径、全部组。
pub fn standardize_document<D>(
    document: &mut D,
    options: &ExtractOptions,
) -> Result<(NameRegistry, StandardizeReport), ExtractError>
where
    D: HostDocument + ?Sized,
{
    let tags = options.tag_names();
    let default_value = options.default_tag_value.as_str();
    let mut registry = NameRegistry::new();
    let mut report = StandardizeReport::default();

    let passes = [
        (document.artboards()?, ElementCategory::Artboards),
        (document.layers()?, ElementCategory::Layers),
        (document.path_items()?, ElementCategory::Native),
        (document.group_items()?, ElementCategory::Native),
    ];
    for (items, category) in passes {
        let pass = standardize_items(
            document,
            &items,
            category,
            &mut registry,
            &tags,
            default_value,
        )?;
        report.absorb(pass);
    }

    debug!(
        visited = report.visited,
        renamed = report.renamed,
        tags_created = report.tags_created,
        "名称标准化完成"
    );
    Ok((registry, report))
}
