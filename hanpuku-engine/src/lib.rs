pub mod color;
pub mod envelope;
pub mod extract;
pub mod naming;
pub mod tags;

pub use envelope::{EnvelopeError, ResultEnvelope};
pub use extract::extract_document;
pub use naming::{ElementCategory, NameRegistry, StandardizeReport, standardize_document};

pub mod errors {
    use std::panic::Location;

    use hanpuku_core::host::HostError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ExtractErrorKind {
        #[error(transparent)]
        Host(#[from] HostError),
        #[error("element {element} is missing tag {tag}")]
        MissingTag { element: String, tag: String },
        #[error("tag {tag} of element {element} is not valid JSON: {source}")]
        MalformedData {
            element: String,
            tag: String,
            #[source]
            source: serde_json::Error,
        },
    }

    /// 提取失败。记录触发位置，结果封包据此填写 `line`。
    #[derive(Debug, Error)]
    #[error("{kind}")]
    pub struct ExtractError {
        kind: ExtractErrorKind,
        location: &'static Location<'static>,
    }

    impl ExtractError {
        #[track_caller]
        pub fn new(kind: ExtractErrorKind) -> Self {
            Self {
                kind,
                location: Location::caller(),
            }
        }

        #[inline]
        pub fn kind(&self) -> &ExtractErrorKind {
            &self.kind
        }

        #[inline]
        pub fn location(&self) -> &'static Location<'static> {
            self.location
        }

        /// 触发位置的行号（从 1 开始）。
        #[inline]
        pub fn line(&self) -> u32 {
            self.location.line()
        }
    }

    impl From<HostError> for ExtractError {
        #[track_caller]
        fn from(value: HostError) -> Self {
            Self::new(ExtractErrorKind::Host(value))
        }
    }

    impl From<ExtractErrorKind> for ExtractError {
        #[track_caller]
        fn from(value: ExtractErrorKind) -> Self {
            Self::new(value)
        }
    }
}

pub mod options {
    use crate::tags::TagNames;

    pub const DEFAULT_TAG_PREFIX: &str = "id3_";
    pub const DEFAULT_TAG_VALUE: &str = "null";
    pub const Z_ORDER_FALLBACK: i64 = 100;

    /// 一次提取运行的参数。
    #[derive(Debug, Clone, PartialEq)]
    pub struct ExtractOptions {
        /// 宿主标签名前缀，与 `data`、`classNames`、`reverseTransform` 拼接。
        pub tag_prefix: String,
        pub default_tag_value: String,
        pub z_order_fallback: i64,
        /// 为 `false` 时，读取层叠位置的宿主故障将终止整个提取。
        pub absorb_z_order_faults: bool,
        /// 为 `false` 时复现宿主脚本中警告标记预先置位的行为，不输出诊断。
        pub warn_unsupported_color: bool,
    }

    impl ExtractOptions {
        pub fn tag_names(&self) -> TagNames {
            TagNames::with_prefix(&self.tag_prefix)
        }
    }

    impl Default for ExtractOptions {
        fn default() -> Self {
            Self {
                tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
                default_tag_value: DEFAULT_TAG_VALUE.to_string(),
                z_order_fallback: Z_ORDER_FALLBACK,
                absorb_z_order_faults: true,
                warn_unsupported_color: true,
            }
        }
    }
}
