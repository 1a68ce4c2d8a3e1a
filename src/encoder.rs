use crate::schema::CategoryOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label <-> key mapping for expense categories.
///
/// Fitted once when the dataset is loaded and then only read. Forecast rows
/// must be decoded through the same instance that produced the keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryEncoder {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl PartialEq for CategoryEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl From<Vec<String>> for CategoryEncoder {
    fn from(labels: Vec<String>) -> Self {
        Self::from_labels(labels)
    }
}

impl From<CategoryEncoder> for Vec<String> {
    fn from(encoder: CategoryEncoder) -> Self {
        encoder.labels
    }
}

impl CategoryEncoder {
    pub fn fit<I, S>(labels: I, order: CategoryOrder) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref();
            if !distinct.iter().any(|l| l == label) {
                distinct.push(label.to_string());
            }
        }

        if order == CategoryOrder::Sorted {
            distinct.sort();
        }

        Self::from_labels(distinct)
    }

    fn from_labels(labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(key, label)| (label.clone(), key))
            .collect();
        Self { labels, index }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn decode(&self, key: usize) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn keys(&self) -> std::ops::Range<usize> {
        0..self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_keys() {
        let encoder = CategoryEncoder::fit(
            ["Pegawai", "Modal", "Barang", "Pegawai"],
            CategoryOrder::Sorted,
        );
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.encode("Barang"), Some(0));
        assert_eq!(encoder.encode("Modal"), Some(1));
        assert_eq!(encoder.encode("Pegawai"), Some(2));
        assert_eq!(encoder.encode("Bansos"), None);
    }

    #[test]
    fn test_first_seen_keys() {
        let encoder = CategoryEncoder::fit(
            ["Pegawai", "Modal", "Barang", "Modal"],
            CategoryOrder::FirstSeen,
        );
        assert_eq!(encoder.encode("Pegawai"), Some(0));
        assert_eq!(encoder.encode("Modal"), Some(1));
        assert_eq!(encoder.encode("Barang"), Some(2));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let labels = ["Belanja Pegawai", "Belanja Barang", "Belanja Modal"];
        let encoder = CategoryEncoder::fit(labels, CategoryOrder::Sorted);
        for label in labels {
            let key = encoder.encode(label).unwrap();
            assert_eq!(encoder.decode(key), Some(label));
        }
        assert_eq!(encoder.decode(3), None);
    }

    #[test]
    fn test_round_trip_after_json() {
        let encoder = CategoryEncoder::fit(["Modal", "Barang"], CategoryOrder::Sorted);
        let json = serde_json::to_string(&encoder).unwrap();
        assert_eq!(json, r#"["Barang","Modal"]"#);
        let restored: CategoryEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);
        assert_eq!(restored.encode("Modal"), Some(1));
        assert_eq!(restored.decode(0), Some("Barang"));
    }
}
