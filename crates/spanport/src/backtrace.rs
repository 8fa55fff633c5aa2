//! Call-stack serialization for the cloud backend's stacktrace label.

use crate::span::StackFrame;
use serde::Serialize;

#[derive(Serialize)]
struct WireFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<&'a str>,
}

#[derive(Serialize)]
struct WireStack<'a> {
    stack_frame: Vec<WireFrame<'a>>,
}

/// Serialize captured frames, preserving order and omitting absent fields
/// per frame. Never fails: an unencodable stack yields an empty string.
pub fn format_backtrace(frames: &[StackFrame]) -> String {
    let stack = WireStack {
        stack_frame: frames
            .iter()
            .map(|frame| WireFrame {
                line_number: frame.line,
                file_name: frame.file.as_deref(),
                method_name: frame.function.as_deref(),
                class_name: frame.class.as_deref(),
            })
            .collect(),
    };
    serde_json::to_string(&stack).unwrap_or_default()
}
