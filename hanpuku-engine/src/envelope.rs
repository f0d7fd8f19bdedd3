use std::fmt::Display;
use std::panic::Location;

use hanpuku_core::document::Document;
use hanpuku_core::host::HostApplication;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::color::ColorNormalizer;
use crate::errors::ExtractError;
use crate::extract::extract_document;
use crate::options::ExtractOptions;

/// 封包中的错误对象。`line` 为触发位置的行号减一，以字符串形式给出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub message: String,
    pub line: String,
}

impl EnvelopeError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line: line.saturating_sub(1).to_string(),
        }
    }
}

/// 结果封包：调用方唯一能看到的输出，无论成功与否都序列化为 `{logs, error, output}`。
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultEnvelope {
    logs: Vec<String>,
    error: Option<EnvelopeError>,
    output: Option<Document>,
}

impl ResultEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在封包内执行一次完整提取。
    pub fn run<A>(app: &mut A, options: &ExtractOptions) -> Self
    where
        A: HostApplication + ?Sized,
    {
        let mut envelope = Self::new();
        let mut colors = ColorNormalizer::new(options.warn_unsupported_color);
        let result = extract_document(app, options, &mut colors);
        for line in colors.take_diagnostics() {
            envelope.log([line]);
        }
        match result {
            Ok(output) => envelope.set_output(output),
            Err(err) => envelope.log_error(&err),
        }
        envelope
    }

    /// 追加一条日志，多个片段以空格连接。
    pub fn log<I>(&mut self, parts: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let line = parts
            .into_iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.logs.push(line);
    }

    pub fn log_error(&mut self, err: &ExtractError) {
        error!(error = %err, line = err.line(), "文档提取失败");
        self.error = Some(EnvelopeError::new(err.to_string(), err.line()));
    }

    /// 记录提取流程之外的失败（例如快照无法读取），行号取调用位置。
    #[track_caller]
    pub fn log_failure(&mut self, message: impl Display) {
        let location = Location::caller();
        error!(error = %message, line = location.line(), "提取前置步骤失败");
        self.error = Some(EnvelopeError::new(message.to_string(), location.line()));
    }

    pub fn set_output(&mut self, output: Option<Document>) {
        self.output = output;
    }

    #[inline]
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    #[inline]
    pub fn error(&self) -> Option<&EnvelopeError> {
        self.error.as_ref()
    }

    #[inline]
    pub fn output(&self) -> Option<&Document> {
        self.output.as_ref()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 序列化为单个 JSON 对象。即使序列化本身失败也返回合法 JSON。
    pub fn json_packet(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| self.fallback_packet(&err))
    }

    pub fn json_packet_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| self.fallback_packet(&err))
    }

    fn fallback_packet(&self, err: &serde_json::Error) -> String {
        json!({
            "logs": self.logs,
            "error": EnvelopeError::new(err.to_string(), err.line() as u32),
            "output": null,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanpuku_core::host::{HostColor, PathStyle};
    use hanpuku_core::memory::{MemoryApplication, MemoryDocument};
    use serde_json::Value;

    fn packet(envelope: &ResultEnvelope) -> Value {
        serde_json::from_str(&envelope.json_packet()).expect("packet must be valid JSON")
    }

    #[test]
    fn empty_application_produces_null_output() {
        let mut app = MemoryApplication::new();
        let envelope = ResultEnvelope::run(&mut app, &ExtractOptions::default());
        assert!(envelope.is_success());
        assert_eq!(
            envelope.json_packet(),
            r#"{"logs":[],"error":null,"output":null}"#
        );
    }

    #[test]
    fn fault_yields_error_and_no_output() {
        let mut doc = MemoryDocument::new("broken.ai");
        let layer = doc.add_layer("Layer 1");
        let group = doc.add_group(layer, "g").unwrap();
        doc.set_tag(group, "id3_data", "[1, 2").unwrap();
        let mut app = MemoryApplication::with_document(doc);

        let envelope = ResultEnvelope::run(&mut app, &ExtractOptions::default());
        let value = packet(&envelope);
        assert_eq!(value["output"], Value::Null);
        assert!(value["error"]["message"].as_str().unwrap().contains("id3_data"));
        let line = value["error"]["line"].as_str().expect("line is a string");
        assert!(line.parse::<u32>().is_ok());
        assert!(envelope.output().is_none());
    }

    #[test]
    fn successful_run_carries_document() {
        let mut doc = MemoryDocument::new("ok.ai");
        doc.add_layer("Layer 1");
        let mut app = MemoryApplication::with_document(doc);
        let envelope = ResultEnvelope::run(&mut app, &ExtractOptions::default());
        let value = packet(&envelope);
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["output"]["itemType"], "document");
        assert_eq!(value["output"]["layers"][0]["name"], "Layer_1");
    }

    #[test]
    fn color_diagnostic_is_logged_once() {
        let mut doc = MemoryDocument::new("swatches.ai");
        let layer = doc.add_layer("Layer 1");
        for name in ["a", "b"] {
            doc.add_path(
                layer,
                name,
                PathStyle {
                    fill_color: HostColor::Other {
                        typename: "GradientColor".to_string(),
                    },
                    ..PathStyle::default()
                },
                Vec::new(),
            )
            .unwrap();
        }
        let mut app = MemoryApplication::with_document(doc);
        let envelope = ResultEnvelope::run(&mut app, &ExtractOptions::default());
        assert_eq!(
            envelope.logs(),
            ["hanpuku does not yet support GradientColor".to_string()]
        );

        let silent = ExtractOptions {
            warn_unsupported_color: false,
            ..ExtractOptions::default()
        };
        let envelope = ResultEnvelope::run(&mut app, &silent);
        assert!(envelope.logs().is_empty());
    }

    #[test]
    fn log_joins_parts_with_spaces() {
        let mut envelope = ResultEnvelope::new();
        envelope.log(["exported", "3", "paths"]);
        envelope.log([1.5, 2.0]);
        assert_eq!(envelope.logs(), ["exported 3 paths", "1.5 2"]);
    }

    #[test]
    fn failure_line_is_zero_based() {
        let mut envelope = ResultEnvelope::new();
        let expected = line!() + 1;
        envelope.log_failure("snapshot missing");
        let error = envelope.error().unwrap();
        assert_eq!(error.message, "snapshot missing");
        assert_eq!(error.line, (expected - 1).to_string());
    }
}
