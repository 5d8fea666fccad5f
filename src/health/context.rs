//! Crop Context
//!
//! Optional agronomic context that accompanies an image: declared crop,
//! growth stage, weather and soil. Encoded into a fixed-length vector for
//! context-aware health models.

use serde::{Deserialize, Serialize};

/// Crop vocabulary; position is the crop index
pub const CROP_TYPES: [&str; 12] = [
    "Paddy",
    "Wheat",
    "Maize",
    "Cotton",
    "Sugarcane",
    "Soybean",
    "Chickpea",
    "Mustard",
    "Groundnut",
    "Potato",
    "Onion",
    "Tomato",
];

/// Growth stage vocabulary
pub const CROP_STAGES: [&str; 4] = ["Seedling", "Vegetative", "Flowering", "Fruiting / Grain Filling"];

/// Length of [`ContextFeatures`]: crop one-hot, stage, weather, soil
pub const CONTEXT_FEATURES: usize = CROP_TYPES.len() + CROP_STAGES.len() + 3 + 2;

/// Index of a crop in [`CROP_TYPES`]; unknown crops map to 0.
///
/// Matching ignores case; `rice` and `corn` resolve to Paddy and Maize.
pub fn crop_index(crop_type: &str) -> usize {
    let name = crop_type.trim().to_lowercase();
    let name = match name.as_str() {
        "rice" => "paddy",
        "corn" | "corn_(maize)" => "maize",
        other => other,
    };
    CROP_TYPES
        .iter()
        .position(|c| c.to_lowercase() == name)
        .unwrap_or(0)
}

/// Whether a declared crop counts as known (present and not "Unknown")
pub fn is_declared(crop_type: Option<&str>) -> bool {
    match crop_type.map(str::trim) {
        Some(name) => !name.is_empty() && !name.eq_ignore_ascii_case("unknown"),
        None => false,
    }
}

/// Field weather at capture time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    /// Air temperature in °C
    pub temp: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Rainfall in mm
    pub rain: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temp: 25.0,
            humidity: 50.0,
            rain: 0.0,
        }
    }
}

/// Soil readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Soil {
    pub ph: f64,
    /// Volumetric moisture in %
    pub moisture: f64,
}

impl Default for Soil {
    fn default() -> Self {
        Self {
            ph: 6.5,
            moisture: 30.0,
        }
    }
}

/// Everything known about the plant besides its image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropContext {
    pub crop_type: Option<String>,
    pub crop_stage: Option<String>,
    pub weather: Option<Weather>,
    pub soil: Option<Soil>,
}

impl CropContext {
    pub fn for_crop(crop_type: impl Into<String>) -> Self {
        Self {
            crop_type: Some(crop_type.into()),
            ..Default::default()
        }
    }

    /// Declared crop, or `None` when absent or "Unknown"
    pub fn declared_crop(&self) -> Option<&str> {
        self.crop_type
            .as_deref()
            .filter(|c| is_declared(Some(c)))
            .map(str::trim)
    }

    /// Name used in assessment text
    pub fn crop_label(&self) -> &str {
        self.declared_crop().unwrap_or("Unknown")
    }

    /// Encode for a context-aware model.
    pub fn encode(&self) -> ContextFeatures {
        let mut values = [0.0f32; CONTEXT_FEATURES];

        if let Some(crop) = self.declared_crop() {
            values[crop_index(crop)] = 1.0;
        }

        let stage_offset = CROP_TYPES.len();
        if let Some(stage) = self.crop_stage.as_deref() {
            match CROP_STAGES.iter().position(|s| s.eq_ignore_ascii_case(stage.trim())) {
                Some(i) => values[stage_offset + i] = 1.0,
                None => {
                    for v in &mut values[stage_offset..stage_offset + CROP_STAGES.len()] {
                        *v = 1.0 / CROP_STAGES.len() as f32;
                    }
                }
            }
        }

        let weather_offset = stage_offset + CROP_STAGES.len();
        let weather = match &self.weather {
            Some(w) => [
                (w.temp / 50.0) as f32,
                (w.humidity / 100.0) as f32,
                (w.rain / 200.0).min(1.0) as f32,
            ],
            None => [0.5, 0.5, 0.0],
        };
        values[weather_offset..weather_offset + 3].copy_from_slice(&weather);

        let soil_offset = weather_offset + 3;
        let soil = match &self.soil {
            Some(s) => [((s.ph - 5.0) / 3.0) as f32, (s.moisture / 100.0) as f32],
            None => [0.5, 0.3],
        };
        values[soil_offset..soil_offset + 2].copy_from_slice(&soil);

        ContextFeatures { values }
    }
}

/// Fixed-length context vector: 12 crop, 4 stage, 3 weather, 2 soil
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextFeatures {
    pub values: [f32; CONTEXT_FEATURES],
}

impl ContextFeatures {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn stage(&self) -> &[f32] {
        &self.values[CROP_TYPES.len()..CROP_TYPES.len() + CROP_STAGES.len()]
    }

    pub fn weather(&self) -> &[f32] {
        let start = CROP_TYPES.len() + CROP_STAGES.len();
        &self.values[start..start + 3]
    }

    pub fn soil(&self) -> &[f32] {
        &self.values[CONTEXT_FEATURES - 2..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_index() {
        assert_eq!(crop_index("Paddy"), 0);
        assert_eq!(crop_index("wheat"), 1);
        assert_eq!(crop_index("Tomato"), 11);
        assert_eq!(crop_index("rice"), 0);
        assert_eq!(crop_index("Corn"), 2);
        assert_eq!(crop_index("Dragonfruit"), 0);
    }

    #[test]
    fn test_declared_crop() {
        assert_eq!(CropContext::for_crop("Tomato").declared_crop(), Some("Tomato"));
        assert_eq!(CropContext::for_crop("Unknown").declared_crop(), None);
        assert_eq!(CropContext::for_crop("  ").declared_crop(), None);
        assert_eq!(CropContext::default().crop_label(), "Unknown");
    }

    #[test]
    fn test_encode_defaults() {
        let features = CropContext::default().encode();
        assert_eq!(features.values.len(), 21);
        assert!(features.values[..16].iter().all(|&v| v == 0.0));
        assert_eq!(features.weather(), &[0.5, 0.5, 0.0]);
        assert_eq!(features.soil(), &[0.5, 0.3]);
    }

    #[test]
    fn test_encode_full_context() {
        let context = CropContext {
            crop_type: Some("Wheat".into()),
            crop_stage: Some("Flowering".into()),
            weather: Some(Weather {
                temp: 30.0,
                humidity: 80.0,
                rain: 500.0,
            }),
            soil: Some(Soil {
                ph: 8.0,
                moisture: 45.0,
            }),
        };
        let features = context.encode();

        assert_eq!(features.values[1], 1.0);
        assert_eq!(features.stage(), &[0.0, 0.0, 1.0, 0.0]);
        assert!((features.weather()[0] - 0.6).abs() < 1e-6);
        assert!((features.weather()[1] - 0.8).abs() < 1e-6);
        assert_eq!(features.weather()[2], 1.0);
        assert!((features.soil()[0] - 1.0).abs() < 1e-6);
        assert!((features.soil()[1] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_stage_is_uniform() {
        let context = CropContext {
            crop_stage: Some("Harvested".into()),
            ..Default::default()
        };
        assert_eq!(context.encode().stage(), &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_weather_deserializes_with_defaults() {
        let weather: Weather = serde_json::from_str(r#"{"temp": 31.5}"#).unwrap();
        assert_eq!(weather.temp, 31.5);
        assert_eq!(weather.humidity, 50.0);
        assert_eq!(weather.rain, 0.0);
    }
}
