//! Label Parsing
//!
//! Grammar of a raw class label:
//!
//! ```text
//! label = crop_token SEP disease_token     SEP ∈ {"___", "__", "_"}
//! ```
//!
//! The first separator kind present wins, tried in the order above; `"_"`
//! splits at its first occurrence only. Both tokens are cleaned by turning
//! underscores into spaces, dropping the `(maize)` marker and capitalizing
//! each word (first letter upper, rest lower).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Display name of every healthy label
pub const HEALTHY_PLANT: &str = "Healthy Plant";

/// Tokens recognised as crop names when no separator gives one
const CROP_TOKENS: [&str; 12] = [
    "wheat", "rice", "paddy", "maize", "corn", "cotton", "tomato", "potato", "soybean", "grape",
    "apple", "pepper",
];

/// Structured view of a raw class label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLabel {
    /// Disease name without the crop, or "Healthy Plant"
    pub display_name: String,
    /// Normalized crop token
    pub crop_type: Option<String>,
    /// Cleaned disease text used for recommendation lookup
    pub disease_key: String,
    pub is_healthy: bool,
}

/// Canonical crop token: lowercase, `corn` to `maize`, `rice` to `paddy`.
pub fn normalize_crop(crop: &str) -> Option<String> {
    let crop = crop.trim().to_lowercase();
    if crop.is_empty() {
        return None;
    }
    let canonical = match crop.as_str() {
        "corn" | "corn_(maize)" | "corn (maize)" => "maize".to_string(),
        "rice" => "paddy".to_string(),
        _ => crop,
    };
    Some(canonical)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn clean(token: &str) -> String {
    token
        .replace('_', " ")
        .replace("(maize)", "")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_label(label: &str) -> (&str, &str) {
    for separator in ["___", "__"] {
        if let Some((crop, disease)) = label.split_once(separator) {
            return (crop, disease);
        }
    }
    label.split_once('_').unwrap_or((label, ""))
}

/// Parse a raw class label.
pub fn parse_label(label: &str) -> ParsedLabel {
    let (crop_raw, disease_raw) = split_label(label);
    let crop = clean(crop_raw);
    let disease = clean(disease_raw);

    let is_healthy =
        disease.to_lowercase().contains("healthy") || label.to_lowercase().contains("healthy");

    let display_name = if is_healthy {
        HEALTHY_PLANT.to_string()
    } else {
        let mut display = disease.as_str();
        if !crop.is_empty() {
            display = display.strip_prefix(crop.as_str()).unwrap_or(display).trim();
        }
        display = display.strip_prefix('-').unwrap_or(display).trim();
        display.to_string()
    };

    ParsedLabel {
        display_name,
        crop_type: normalize_crop(&crop),
        disease_key: disease,
        is_healthy,
    }
}

/// Crop of a raw label: the part before a `__`/`___` separator, else the
/// first recognised crop token.
pub fn derive_crop(label: &str) -> Option<String> {
    if let Some((crop, _)) = label.split_once("__") {
        if let Some(crop) = normalize_crop(crop) {
            return Some(crop);
        }
    }
    let stem = Path::new(label)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(label);
    find_crop_token(stem, &CROP_TOKENS)
        .map(|token| if token == "corn" { "maize".to_string() } else { token })
}

/// Guess a crop from an uploaded file name such as `tomato_leaf_03.jpg`.
pub fn crop_from_filename(name: &str) -> Option<String> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    find_crop_token(stem, &CROP_TOKENS[..10]).and_then(|token| normalize_crop(&token))
}

fn find_crop_token(text: &str, vocabulary: &[&str]) -> Option<String> {
    text.split(|c: char| c == '-' || c == '_')
        .map(str::to_lowercase)
        .find(|token| vocabulary.contains(&token.as_str()))
}
