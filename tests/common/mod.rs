//! Tiny ONNX models for exercising the real inference path.
//!
//! The models are written straight as protobuf so the tests need no
//! exported artifacts. Each one takes a `[N, width]` float input named
//! `features` and returns the index of the largest feature, either as an
//! int64 code or as its decimal string.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

const FLOAT: u64 = 1;
const INT64: u64 = 7;
const STRING: u64 = 8;
const ATTRIBUTE_INT: u64 = 2;

/// Minimal protobuf message writer
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.0.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.0.push(value as u8);
    }

    fn int(mut self, field: u64, value: u64) -> Self {
        self.varint(field << 3);
        self.varint(value);
        self
    }

    fn bytes(mut self, field: u64, bytes: &[u8]) -> Self {
        self.varint((field << 3) | 2);
        self.varint(bytes.len() as u64);
        self.0.extend_from_slice(bytes);
        self
    }

    fn text(self, field: u64, text: &str) -> Self {
        self.bytes(field, text.as_bytes())
    }

    fn message(self, field: u64, message: Message) -> Self {
        self.bytes(field, &message.0)
    }
}

/// ValueInfoProto for a tensor with a dynamic batch dimension
fn tensor_info(name: &str, elem_type: u64, width: Option<u64>) -> Message {
    let mut shape = Message::default().message(1, Message::default().text(2, "N"));
    if let Some(width) = width {
        shape = shape.message(1, Message::default().int(1, width));
    }
    let tensor = Message::default().int(1, elem_type).message(2, shape);
    Message::default()
        .text(1, name)
        .message(2, Message::default().message(1, tensor))
}

fn int_attribute(name: &str, value: u64) -> Message {
    Message::default()
        .text(1, name)
        .int(3, value)
        .int(20, ATTRIBUTE_INT)
}

fn node(op_type: &str, input: &str, output: &str, attributes: Vec<Message>) -> Message {
    let mut node = Message::default()
        .text(1, input)
        .text(2, output)
        .text(3, op_type)
        .text(4, op_type);
    for attribute in attributes {
        node = node.message(5, attribute);
    }
    node
}

/// Serialized model returning `argmax(features)` per row.
pub fn argmax_model(width: u64, text_labels: bool) -> Vec<u8> {
    let argmax = node(
        "ArgMax",
        "features",
        "code",
        vec![int_attribute("axis", 1), int_attribute("keepdims", 0)],
    );
    let mut graph = Message::default().message(1, argmax);
    let label = if text_labels {
        graph = graph.message(1, node("Cast", "code", "label", vec![int_attribute("to", STRING)]));
        tensor_info("label", STRING, None)
    } else {
        tensor_info("code", INT64, None)
    };
    let graph = graph
        .text(2, "argmax")
        .message(11, tensor_info("features", FLOAT, Some(width)))
        .message(12, label);

    Message::default()
        .int(1, 8)
        .text(2, "bharat-agro-tests")
        .message(7, graph)
        .message(8, Message::default().int(2, 13))
        .0
}

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("bharat-agro-onnx").join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_argmax_model(dir: &Path, file: &str, width: u64, text_labels: bool) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, argmax_model(width, text_labels)).unwrap();
    path
}
