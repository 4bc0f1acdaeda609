use ndarray::{Array2, ArrayView2};

use crate::error::{DqnError, Result};

/// Trait defining the interface for masked regression losses
pub trait Loss: Send + Sync {
    /// Loss over a batch; `mask` selects which outputs take part
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<f32>;

    /// Gradient of the batch loss with respect to `predictions`
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// Euclidean loss on filtered outputs: `1/(2N) Σ ||q ⊙ m − t||²`.
///
/// Entries where the mask is zero carry no gradient, so only the action
/// actually taken in each sample is trained.
pub struct MaskedEuclideanLoss;

impl MaskedEuclideanLoss {
    fn check_shapes(predictions: &ArrayView2<f32>, targets: &ArrayView2<f32>, mask: &ArrayView2<f32>) -> Result<()> {
        if predictions.dim() != targets.dim() || predictions.dim() != mask.dim() {
            return Err(DqnError::dimension_mismatch(
                format!("predictions, targets and mask of shape {:?}", predictions.dim()),
                format!("targets {:?}, mask {:?}", targets.dim(), mask.dim()),
            ));
        }
        if predictions.nrows() == 0 {
            return Err(DqnError::dimension_mismatch("at least one row", "an empty batch"));
        }
        Ok(())
    }
}

impl Loss for MaskedEuclideanLoss {
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<f32> {
        Self::check_shapes(&predictions, &targets, &mask)?;
        let diff = &predictions * &mask - &targets;
        Ok((&diff * &diff).sum() / (2.0 * predictions.nrows() as f32))
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>, mask: ArrayView2<f32>) -> Result<Array2<f32>> {
        Self::check_shapes(&predictions, &targets, &mask)?;
        let diff = &predictions * &mask - &targets;
        Ok(diff * &mask / predictions.nrows() as f32)
    }
}
