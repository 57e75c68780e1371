use std::collections::HashMap;

use super::error::RequestError;

/// Soil types the fertilizer model was trained on
pub const SOIL_TYPES: [&str; 5] = ["Sandy", "Loamy", "Black", "Red", "Clayey"];

/// Crop types the fertilizer model was trained on
pub const CROP_TYPES: [&str; 11] = [
    "Maize",
    "Sugarcane",
    "Cotton",
    "Tobacco",
    "Paddy",
    "Barley",
    "Wheat",
    "Millets",
    "Oil seeds",
    "Pulses",
    "Ground Nuts",
];

/// Fixed, ordered set of values accepted by one categorical field.
///
/// The code of an entry is its 0-based position. The vocabulary must be the
/// one the bound model was trained with: a different order yields different
/// codes and the model cannot tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    field: String,
    entries: Vec<String>,
    codes: HashMap<String, usize>,
}

impl Vocabulary {
    /// Creates a vocabulary that keeps the given order. Repeated entries keep
    /// their first position.
    pub fn new<I, S>(field: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self {
            field: field.into(),
            entries: Vec::new(),
            codes: HashMap::new(),
        };
        for entry in entries {
            let entry = entry.into();
            if vocabulary.codes.contains_key(&entry) {
                continue;
            }
            vocabulary.codes.insert(entry.clone(), vocabulary.entries.len());
            vocabulary.entries.push(entry);
        }
        vocabulary
    }

    /// Creates a vocabulary ordered the way a fitted label encoder assigns
    /// codes: entries sorted lexicographically.
    pub fn label_encoded<I, S>(field: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = entries.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();
        Self::new(field, sorted)
    }

    /// Name of the request field this vocabulary validates
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    /// Returns the code of `value`, or `UnknownCategory` when the value is not
    /// part of the vocabulary. Matching is exact.
    pub fn encode(&self, value: &str) -> Result<usize, RequestError> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| RequestError::UnknownCategory {
                field: self.field.clone(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_position() {
        let vocabulary = Vocabulary::new("soil_type", SOIL_TYPES);
        for (position, entry) in SOIL_TYPES.iter().enumerate() {
            assert_eq!(vocabulary.encode(entry).unwrap(), position);
            // stable across calls
            assert_eq!(vocabulary.encode(entry).unwrap(), position);
        }
    }

    #[test]
    fn test_label_encoded_order() {
        let vocabulary = Vocabulary::label_encoded("soil_type", SOIL_TYPES);
        assert_eq!(vocabulary.entries(), ["Black", "Clayey", "Loamy", "Red", "Sandy"]);
        assert_eq!(vocabulary.encode("Black").unwrap(), 0);
        assert_eq!(vocabulary.encode("Sandy").unwrap(), 4);

        let crops = Vocabulary::label_encoded("crop_type", CROP_TYPES);
        assert_eq!(crops.encode("Barley").unwrap(), 0);
        assert_eq!(crops.encode("Ground Nuts").unwrap(), 2);
        assert_eq!(crops.encode("Oil seeds").unwrap(), 5);
        assert_eq!(crops.encode("Wheat").unwrap(), 10);
    }

    #[test]
    fn test_unknown_category() {
        let vocabulary = Vocabulary::label_encoded("crop_type", CROP_TYPES);
        for value in ["Rice", "maize", "", " Maize"] {
            let err = vocabulary.encode(value).unwrap_err();
            assert_eq!(
                err,
                RequestError::UnknownCategory {
                    field: "crop_type".into(),
                    value: value.into(),
                }
            );
        }
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let vocabulary = Vocabulary::new("x", ["a", "b", "a", "c"]);
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.encode("c").unwrap(), 2);
        assert_eq!(vocabulary.decode(1), Some("b"));
        assert_eq!(vocabulary.decode(3), None);
    }
}
