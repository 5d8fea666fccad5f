//! Class Map
//!
//! Index to raw-label table for the classifier's output classes. Labels are
//! dataset-style strings such as `"Corn_(maize)___Common_rust_"`; turning them
//! into display text is the job of `diagnosis::labels`.
//!
//! On disk the map is JSON in one of two encodings, both normalized here:
//! - index-keyed: `{"0": "Apple___Apple_scab", "1": "Apple___Black_rot"}`
//! - label-keyed: `{"Apple___Apple_scab": 0, "Apple___Black_rot": 1}`

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::utils::{DeepLeafError, Result, ResultExt};

/// PlantVillage class labels in dataset folder sort order (38 classes).
pub const PLANTVILLAGE_LABELS: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Cherry_(including_sour)___healthy",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// Immutable index to label mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    labels: BTreeMap<usize, String>,
}

impl ClassMap {
    /// Build from an explicit ordered list (index = position)
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .enumerate()
                .map(|(i, label)| (i, label.into()))
                .collect(),
        }
    }

    /// The stock PlantVillage label table
    pub fn plantvillage() -> Self {
        Self::from_labels(PLANTVILLAGE_LABELS)
    }

    /// Parse either on-disk encoding.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| DeepLeafError::ClassMap("expected a JSON object".to_string()))?;

        if object.is_empty() {
            return Err(DeepLeafError::ClassMap("class map is empty".to_string()));
        }

        let index_keyed = object
            .keys()
            .all(|k| !k.is_empty() && k.chars().all(|c| c.is_ascii_digit()));

        let mut labels = BTreeMap::new();
        if index_keyed {
            for (key, label) in object {
                let index: usize = key
                    .parse()
                    .map_err(|_| DeepLeafError::ClassMap(format!("bad class index '{}'", key)))?;
                let label = label.as_str().ok_or_else(|| {
                    DeepLeafError::ClassMap(format!("label for index {} is not a string", index))
                })?;
                labels.insert(index, label.to_string());
            }
        } else {
            for (label, index) in object {
                let index = index
                    .as_u64()
                    .ok_or_else(|| {
                        DeepLeafError::ClassMap(format!("index for '{}' is not an integer", label))
                    })?;
                labels.insert(index as usize, label.clone());
            }
        }

        Ok(Self { labels })
    }

    /// Load a class map file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class map {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Save in the index-keyed encoding
    pub fn save(&self, path: &Path) -> Result<()> {
        let object: serde_json::Map<String, Value> = self
            .labels
            .iter()
            .map(|(i, label)| (i.to_string(), Value::String(label.clone())))
            .collect();
        let json = serde_json::to_string_pretty(&Value::Object(object))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Raw label for an index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Raw label, or `Class_<index>` when the map has no entry
    pub fn label_or_placeholder(&self, index: usize) -> String {
        self.get(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Class_{}", index))
    }

    /// Number of output classes the classifier must produce
    pub fn num_classes(&self) -> usize {
        self.labels.keys().next_back().map(|&max| max + 1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(&i, label)| (i, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_keyed_encoding() {
        let map = ClassMap::from_json_str(r#"{"0": "Apple___Apple_scab", "2": "Tomato___healthy"}"#)
            .unwrap();
        assert_eq!(map.get(0), Some("Apple___Apple_scab"));
        assert_eq!(map.get(2), Some("Tomato___healthy"));
        assert_eq!(map.get(1), None);
        assert_eq!(map.num_classes(), 3);
    }

    #[test]
    fn test_label_keyed_encoding() {
        let map = ClassMap::from_json_str(r#"{"Apple___Apple_scab": 1, "Apple___healthy": 0}"#)
            .unwrap();
        assert_eq!(map.get(0), Some("Apple___healthy"));
        assert_eq!(map.get(1), Some("Apple___Apple_scab"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_both_encodings_normalize_to_same_map() {
        let by_index = ClassMap::from_json_str(r#"{"0": "Rust", "1": "Healthy"}"#).unwrap();
        let by_label = ClassMap::from_json_str(r#"{"Healthy": 1, "Rust": 0}"#).unwrap();
        assert_eq!(by_index, by_label);
    }

    #[test]
    fn test_malformed_maps_are_rejected() {
        assert!(ClassMap::from_json_str("[]").is_err());
        assert!(ClassMap::from_json_str("{}").is_err());
        assert!(ClassMap::from_json_str(r#"{"Rust": "zero"}"#).is_err());
        assert!(ClassMap::from_json_str(r#"{"0": 5}"#).is_err());
        assert!(ClassMap::from_json_str("not json").is_err());
    }

    #[test]
    fn test_placeholder_label() {
        let map = ClassMap::plantvillage();
        assert_eq!(map.label_or_placeholder(37), "Tomato___healthy");
        assert_eq!(map.label_or_placeholder(99), "Class_99");
        assert_eq!(map.num_classes(), 38);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");
        let map = ClassMap::from_labels(["Grape___Black_rot", "Grape___healthy"]);
        map.save(&path).unwrap();
        assert_eq!(ClassMap::load(&path).unwrap(), map);
    }

    #[test]
    fn test_missing_file() {
        let result = ClassMap::load(Path::new("/nonexistent/deepleaf_classes.json"));
        assert!(result.is_err());
    }
}
