use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::TensorData;
use burn::tensor::activation::{relu, softmax};
use burn_store::{BurnpackStore, ModuleSnapshot};

use super::{CardiacModel, ClassifierError, Label};
use crate::analysis::{ClassifierInput, IMAGE_SIZE};

type CpuBackend = NdArray;
type CpuDevice = NdArrayDevice;

/// Spatial size after three valid 3×3 convolutions, each followed by a 2×2 pool.
const FINAL_SIDE: usize = {
    let mut side = IMAGE_SIZE as usize;
    let mut block = 0;
    while block < 3 {
        side = (side - 2) / 2;
        block += 1;
    }
    side
};
const FILTERS: [usize; 3] = [32, 64, 128];
const HIDDEN_UNITS: usize = 128;
/// Width of the flattened feature vector entering the dense head.
pub const FLATTENED_FEATURES: usize = FILTERS[2] * FINAL_SIDE * FINAL_SIDE;

/// Fixed-topology spectrogram CNN: three conv/pool blocks and a two-layer
/// dense head ending in a softmax over [`Label`].
#[derive(Module, Debug)]
pub struct CardiacCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    dense: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> CardiacCnn<B> {
    /// Randomly initialised network, used as the target for loaded weights.
    pub fn new(device: &B::Device) -> Self {
        let conv = |channels: [usize; 2]| {
            Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Valid)
                .init(device)
        };
        Self {
            conv1: conv([3, FILTERS[0]]),
            conv2: conv([FILTERS[0], FILTERS[1]]),
            conv3: conv([FILTERS[1], FILTERS[2]]),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dense: LinearConfig::new(FLATTENED_FEATURES, HIDDEN_UNITS).init(device),
            output: LinearConfig::new(HIDDEN_UNITS, Label::COUNT).init(device),
        }
    }

    /// Channel-last `[batch, height, width, 3]` in, class probabilities
    /// `[batch, Label::COUNT]` out.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = input.permute([0, 3, 1, 2]);
        let x = self.pool.forward(relu(self.conv1.forward(x)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));
        // Flatten in channel-last order so dense weights exported from an
        // NHWC graph line up.
        let x: Tensor<B, 2> = x.permute([0, 2, 3, 1]).flatten(1, 3);
        let x = relu(self.dense.forward(x));
        softmax(self.output.forward(x), 1)
    }
}

/// [`CardiacCnn`] on the CPU backend, loaded from a burnpack file.
pub struct CardiacCnnModel {
    model: CardiacCnn<CpuBackend>,
    device: CpuDevice,
}

impl std::fmt::Debug for CardiacCnnModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardiacCnnModel").finish_non_exhaustive()
    }
}

impl CardiacCnnModel {
    /// Load weights from `path`. A missing, truncated or mismatched file is
    /// reported as [`ClassifierError::Unavailable`]; panics inside the
    /// backend are caught and reported the same way.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.is_file() {
            return Err(ClassifierError::Unavailable(format!(
                "model weights not found at {}",
                path.display()
            )));
        }
        let device = CpuDevice::default();
        let loaded = catch_unwind(AssertUnwindSafe(|| {
            let mut model = CardiacCnn::<CpuBackend>::new(&device);
            let mut store = BurnpackStore::from_file(path);
            model
                .load_from(&mut store)
                .map(|_| model)
                .map_err(|err| format!("{err:?}"))
        }));
        match loaded {
            Ok(Ok(model)) => Ok(Self { model, device }),
            Ok(Err(reason)) => Err(ClassifierError::Unavailable(format!(
                "failed to load weights from {}: {reason}",
                path.display()
            ))),
            Err(_) => Err(ClassifierError::Unavailable(format!(
                "model backend panicked while loading {}",
                path.display()
            ))),
        }
    }
}

impl CardiacModel for CardiacCnnModel {
    fn predict(&mut self, input: &ClassifierInput) -> Result<Vec<f32>, ClassifierError> {
        let data = TensorData::new(input.to_flat_vec(), ClassifierInput::SHAPE);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let tensor = Tensor::<CpuBackend, 4>::from_data(data, &self.device);
            self.model.forward(tensor).into_data()
        }))
        .map_err(|_| ClassifierError::Inference("model backend panicked".to_string()))?;
        let flat = outcome
            .as_slice::<f32>()
            .map_err(|err| ClassifierError::Inference(format!("unreadable output tensor: {err:?}")))?;
        Ok(flat.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_width_matches_topology() {
        assert_eq!(FINAL_SIDE, 14);
        assert_eq!(FLATTENED_FEATURES, 25_088);
    }

    #[test]
    fn forward_yields_probability_distribution() {
        let device = CpuDevice::default();
        let model = CardiacCnn::<CpuBackend>::new(&device);
        let input = Tensor::<CpuBackend, 4>::zeros(ClassifierInput::SHAPE, &device);
        let output = model.forward(input).into_data();
        let probs = output.as_slice::<f32>().unwrap();
        assert_eq!(probs.len(), Label::COUNT);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "sum {total}");
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn missing_weights_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = CardiacCnnModel::load(&dir.path().join("absent.bpk")).unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }

    #[test]
    fn corrupt_weights_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.bpk");
        std::fs::write(&path, b"definitely not a burnpack").unwrap();
        let err = CardiacCnnModel::load(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
