use std::collections::BTreeMap;

use log::warn;

use super::adapter::RawOutput;
use crate::models::{ModelKind, OutputEncoding};

/// Label used when a class code has no entry in its table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Whole response message when the regional table has no entry.
pub const REGION_NOT_AVAILABLE: &str = "Crop data not available for this state.";

/// Fixed table from class code to human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    names: BTreeMap<i64, String>,
}

impl CodeTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            names: entries.into_iter().map(|(code, name)| (code, name.into())).collect(),
        }
    }

    /// Classes of the fertilizer model, in the order they were encoded
    /// during training.
    pub fn fertilizers() -> Self {
        Self::new([
            (0, "10-26-26"),
            (1, "14-35-14"),
            (2, "17-17-17"),
            (3, "20-20"),
            (4, "28-28"),
            (5, "DAP"),
            (6, "Urea"),
        ])
    }

    pub fn name_of(&self, code: i64) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn code_of(&self, name: &str) -> Option<i64> {
        self.names
            .iter()
            .find(|(_, candidate)| candidate.as_str() == name)
            .map(|(code, _)| *code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().map(|(code, name)| (*code, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A decoded model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Label(String),
    /// The lookup model has no data for the request
    NotAvailable,
}

impl Decoded {
    pub fn label(&self) -> &str {
        match self {
            Self::Label(label) => label,
            Self::NotAvailable => REGION_NOT_AVAILABLE,
        }
    }

    /// Formats the response message for `kind`.
    pub fn into_message(self, kind: ModelKind) -> String {
        match (self, kind) {
            (Self::NotAvailable, _) => REGION_NOT_AVAILABLE.to_string(),
            (Self::Label(fertilizer), ModelKind::Fertilizer) => {
                format!("{} is the best fertilizer to use in the field.", fertilizer)
            }
            (Self::Label(crop), _) => format!("{} is the best crop to be cultivated there.", crop),
        }
    }
}

/// Maps raw model outputs back to labels. Never fails: unknown outputs
/// degrade to [`UNKNOWN_LABEL`] or [`Decoded::NotAvailable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDecoder {
    fertilizers: CodeTable,
}

impl Default for ResultDecoder {
    fn default() -> Self {
        Self::new(CodeTable::fertilizers())
    }
}

impl ResultDecoder {
    pub fn new(fertilizers: CodeTable) -> Self {
        Self { fertilizers }
    }

    pub fn fertilizers(&self) -> &CodeTable {
        &self.fertilizers
    }

    pub fn decode(&self, kind: ModelKind, raw: RawOutput) -> Decoded {
        match kind.characteristics().output {
            OutputEncoding::Label => match raw {
                RawOutput::Label(label) => Decoded::Label(label),
                RawOutput::Code(code) => Decoded::Label(code.to_string()),
                RawOutput::Unmapped => Decoded::Label(UNKNOWN_LABEL.to_string()),
            },
            OutputEncoding::Code => Decoded::Label(self.decode_code(kind, raw)),
            OutputEncoding::Lookup => match raw {
                RawOutput::Label(label) => Decoded::Label(label),
                RawOutput::Code(code) => Decoded::Label(code.to_string()),
                RawOutput::Unmapped => Decoded::NotAvailable,
            },
        }
    }

    fn decode_code(&self, kind: ModelKind, raw: RawOutput) -> String {
        let name = match &raw {
            RawOutput::Code(code) => self.fertilizers.name_of(*code),
            // some exporters emit the class code as a string label
            RawOutput::Label(label) => match label.trim().parse::<i64>() {
                Ok(code) => self.fertilizers.name_of(code),
                Err(_) => self
                    .fertilizers
                    .code_of(label)
                    .and_then(|code| self.fertilizers.name_of(code)),
            },
            RawOutput::Unmapped => None,
        };
        match name {
            Some(name) => name.to_string(),
            None => {
                warn!("{} model produced unknown output {:?}", kind, raw);
                UNKNOWN_LABEL.to_string()
            }
        }
    }
}
