//! CNN architectures consumed by the inference adapter
//!
//! `LeafNet` is the disease classifier (one logit per class-map entry).
//! `CropHealthNet` shares the same convolutional backbone and adds two heads:
//! a 3-way health softmax and an 8-way multi-label disease sigmoid, with an
//! optional context vector fused in before the heads.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{activation, backend::Backend, Tensor},
};

/// Number of health classes: healthy, moderate, critical
pub const HEALTH_CLASSES: usize = 3;
/// Number of multi-label disease indicators of the health model
pub const DISEASE_INDICATORS: usize = 8;

/// Configuration for the LeafNet disease classifier
#[derive(Config, Debug)]
pub struct LeafNetConfig {
    /// Number of output classes (taken from the class map)
    #[config(default = "38")]
    pub num_classes: usize,

    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        with_pool: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Four pooled conv blocks followed by global average pooling.
///
/// Output: `[batch, base_filters * 8]` feature vectors.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Backbone<B> {
    pub fn new(base_filters: usize, device: &B::Device) -> Self {
        let base = base_filters;
        Self {
            conv1: ConvBlock::new(3, base, 3, true, device),
            conv2: ConvBlock::new(base, base * 2, 3, true, device),
            conv3: ConvBlock::new(base * 2, base * 4, 3, true, device),
            conv4: ConvBlock::new(base * 4, base * 8, 3, true, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

/// Disease classifier over the class-map labels
#[derive(Module, Debug)]
pub struct LeafNet<B: Backend> {
    pub backbone: Backbone<B>,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> LeafNet<B> {
    pub fn new(config: &LeafNetConfig, device: &B::Device) -> Self {
        let features = config.base_filters * 8;
        Self {
            backbone: Backbone::new(config.base_filters, device),
            fc1: LinearConfig::new(features, 256).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            fc2: LinearConfig::new(256, config.num_classes).init(device),
            num_classes: config.num_classes,
        }
    }

    /// Logits of shape `[batch_size, num_classes]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.backbone.forward(x);
        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Configuration for the multi-head crop health network
#[derive(Config, Debug)]
pub struct CropHealthNetConfig {
    /// Length of the encoded context vector; 0 builds an image-only model
    #[config(default = "0")]
    pub context_features: usize,

    #[config(default = "0.3")]
    pub dropout_rate: f64,

    #[config(default = "32")]
    pub base_filters: usize,
}

/// Health classes plus multi-label disease indicators
#[derive(Module, Debug)]
pub struct CropHealthNet<B: Backend> {
    pub backbone: Backbone<B>,
    /// Context projection, absent on image-only models
    pub context_fc: Option<Linear<B>>,
    pub fusion: Linear<B>,
    pub dropout: Dropout,
    pub health_head: Linear<B>,
    pub disease_head: Linear<B>,
    context_features: usize,
}

impl<B: Backend> CropHealthNet<B> {
    pub fn new(config: &CropHealthNetConfig, device: &B::Device) -> Self {
        let image_features = config.base_filters * 8;
        let (context_fc, fused) = if config.context_features > 0 {
            (
                Some(LinearConfig::new(config.context_features, 32).init(device)),
                image_features + 32,
            )
        } else {
            (None, image_features)
        };

        Self {
            backbone: Backbone::new(config.base_filters, device),
            context_fc,
            fusion: LinearConfig::new(fused, 128).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            health_head: LinearConfig::new(128, HEALTH_CLASSES).init(device),
            disease_head: LinearConfig::new(128, DISEASE_INDICATORS).init(device),
            context_features: config.context_features,
        }
    }

    /// Whether this network consumes a context vector
    pub fn is_multi_modal(&self) -> bool {
        self.context_fc.is_some()
    }

    pub fn context_features(&self) -> usize {
        self.context_features
    }

    /// Health probabilities `[batch, 3]` (softmax) and disease
    /// probabilities `[batch, 8]` (sigmoid). `context` is ignored by
    /// image-only models.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
        context: Option<Tensor<B, 2>>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut x = self.backbone.forward(images);

        if let (Some(context_fc), Some(context)) = (&self.context_fc, context) {
            let c = Relu::new().forward(context_fc.forward(context));
            x = Tensor::cat(vec![x, c], 1);
        }

        let x = Relu::new().forward(self.fusion.forward(x));
        let x = self.dropout.forward(x);

        let health = activation::softmax(self.health_head.forward(x.clone()), 1);
        let diseases = activation::sigmoid(self.disease_head.forward(x));
        (health, diseases)
    }
}
