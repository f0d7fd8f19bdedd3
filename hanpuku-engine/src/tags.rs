use hanpuku_core::host::{ElementId, HostDocument, HostError};
use tracing::trace;

pub const DATA_SUFFIX: &str = "data";
pub const CLASS_NAMES_SUFFIX: &str = "classNames";
pub const REVERSE_TRANSFORM_SUFFIX: &str = "reverseTransform";

/// 原生元素必须具备的三个宿主标签名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNames {
    pub data: String,
    pub class_names: String,
    pub reverse_transform: String,
}

impl TagNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            data: format!("{prefix}{DATA_SUFFIX}"),
            class_names: format!("{prefix}{CLASS_NAMES_SUFFIX}"),
            reverse_transform: format!("{prefix}{REVERSE_TRANSFORM_SUFFIX}"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.data.as_str(),
            self.class_names.as_str(),
            self.reverse_transform.as_str(),
        ]
        .into_iter()
    }
}

/// 补齐缺失的标签，已有标签保持原值。返回新建的标签数量。
pub fn ensure_tags<D>(
    document: &mut D,
    id: ElementId,
    names: &TagNames,
    default_value: &str,
) -> Result<usize, HostError>
where
    D: HostDocument + ?Sized,
{
    let mut created = 0;
    for name in names.iter() {
        if document.tag(id, name)?.is_some() {
            continue;
        }
        document.add_tag(id, name, default_value)?;
        trace!(element = id.get(), tag = name, "已补充缺失标签");
        created += 1;
    }
    Ok(created)
}
