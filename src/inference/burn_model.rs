//! burn-backed models
//!
//! Weights are `CompactRecorder` files. The networks are not `Sync`, so each
//! is kept behind a `Mutex`; one forward pass runs at a time per model.

use std::path::Path;
use std::sync::Mutex;

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::RgbImage;

use super::classifier::{preprocess, Classifier};
use crate::backend::{backend_name, default_device, InferenceBackend};
use crate::health::{ContextFeatures, HealthModel, HealthOutput, CONTEXT_FEATURES};
use crate::model::{CropHealthNet, CropHealthNetConfig, LeafNet, LeafNetConfig};
use crate::utils::{DeepLeafError, Result};

type Device = <InferenceBackend as Backend>::Device;

fn image_tensor(image: &RgbImage, size: u32, device: &Device) -> Tensor<InferenceBackend, 4> {
    let s = size as usize;
    let data = TensorData::new(preprocess(image, size), [1, 3, s, s]);
    Tensor::from_data(data, device)
}

fn to_vec(tensor: Tensor<InferenceBackend, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| DeepLeafError::Inference(format!("failed to read model output: {:?}", e)))
}

/// Disease classifier backed by [`LeafNet`]
pub struct BurnClassifier {
    model: Mutex<LeafNet<InferenceBackend>>,
    device: Device,
    input_size: u32,
}

impl BurnClassifier {
    /// Load weights for a network with `num_classes` outputs.
    pub fn load(path: &Path, num_classes: usize, input_size: u32) -> Result<Self> {
        if num_classes == 0 {
            return Err(DeepLeafError::ModelUnavailable(
                "class map defines no classes".to_string(),
            ));
        }

        let device = default_device();
        let config = LeafNetConfig::new().with_num_classes(num_classes);
        let model = LeafNet::<InferenceBackend>::new(&config, &device)
            .load_file(path, &CompactRecorder::new(), &device)
            .map_err(|e| {
                DeepLeafError::ModelUnavailable(format!(
                    "failed to load weights {}: {:?}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            model: Mutex::new(model),
            device,
            input_size,
        })
    }
}

impl Classifier for BurnClassifier {
    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let input = image_tensor(image, self.input_size, &self.device);
        let model = self
            .model
            .lock()
            .map_err(|_| DeepLeafError::Inference("classifier lock poisoned".to_string()))?;
        to_vec(model.forward_softmax(input))
    }

    fn name(&self) -> &str {
        backend_name()
    }
}

/// Crop health model backed by [`CropHealthNet`].
///
/// The network is built with a context branch; an image-only record leaves
/// that branch empty on load, which makes the model single-modal.
pub struct BurnHealthModel {
    model: Mutex<CropHealthNet<InferenceBackend>>,
    device: Device,
    input_size: u32,
    multi_modal: bool,
}

impl BurnHealthModel {
    pub fn load(path: &Path, input_size: u32) -> Result<Self> {
        let device = default_device();
        let config = CropHealthNetConfig::new().with_context_features(CONTEXT_FEATURES);
        let model = CropHealthNet::<InferenceBackend>::new(&config, &device)
            .load_file(path, &CompactRecorder::new(), &device)
            .map_err(|e| {
                DeepLeafError::ModelUnavailable(format!(
                    "failed to load health model {}: {:?}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            multi_modal: model.is_multi_modal(),
            model: Mutex::new(model),
            device,
            input_size,
        })
    }
}

impl HealthModel for BurnHealthModel {
    fn predict(&self, image: &RgbImage, context: &ContextFeatures) -> Result<HealthOutput> {
        let images = image_tensor(image, self.input_size, &self.device);
        let context = self.multi_modal.then(|| {
            let data = TensorData::new(context.as_slice().to_vec(), [1, CONTEXT_FEATURES]);
            Tensor::<InferenceBackend, 2>::from_data(data, &self.device)
        });

        let model = self
            .model
            .lock()
            .map_err(|_| DeepLeafError::Inference("health model lock poisoned".to_string()))?;
        let (health, diseases) = model.forward(images, context);

        let health: [f32; 3] = to_vec(health)?
            .try_into()
            .map_err(|v: Vec<f32>| DeepLeafError::Inference(format!("expected 3 health outputs, got {}", v.len())))?;
        let diseases: [f32; 8] = to_vec(diseases)?
            .try_into()
            .map_err(|v: Vec<f32>| DeepLeafError::Inference(format!("expected 8 disease outputs, got {}", v.len())))?;

        Ok(HealthOutput { health, diseases })
    }

    fn is_multi_modal(&self) -> bool {
        self.multi_modal
    }
}
