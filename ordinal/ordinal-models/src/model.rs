//! Multi-head model contract.

use std::collections::BTreeMap;

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use ordinal_dataset::HostBatch;
use ordinal_types::HeadSpec;

use crate::error::{ModelError, Result};

/// Logits of every head, keyed by head tag. Each entry is `[batch, width]`.
pub type HeadLogits<B> = BTreeMap<String, Tensor<B, 2>>;

/// A network with one output per head.
///
/// Takes the host batch rather than a tensor so that the same trait serves a
/// model on an autodiff backend and its inner (inference) module.
pub trait MultiHeadModel<B: Backend> {
    /// Runs the forward pass on a batch.
    fn forward(&self, batch: &HostBatch, device: &B::Device) -> HeadLogits<B>;
}

/// Moves the inputs of a batch to the device as a `[len, nr_features]` tensor.
#[must_use]
pub fn batch_inputs<B: Backend>(batch: &HostBatch, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(
        TensorData::new(batch.inputs.clone(), [batch.len(), batch.nr_features])
            .convert::<B::FloatElem>(),
        device,
    )
}

/// Takes the logits of a head and checks their shape.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the head has no logits or the
/// logits are not `[batch_size, head.logit_width()]`.
pub fn take_head_logits<B: Backend>(
    logits: &mut HeadLogits<B>,
    head: &HeadSpec,
    batch_size: usize,
) -> Result<Tensor<B, 2>> {
    let expected = [batch_size, head.logit_width()];
    let tensor = logits.remove(&head.tag).ok_or_else(|| {
        ModelError::shape_mismatch(&head.tag, format!("{expected:?}"), "no output")
    })?;
    let dims = tensor.dims();
    if dims != expected {
        return Err(ModelError::shape_mismatch(
            &head.tag,
            format!("{expected:?}"),
            format!("{dims:?}"),
        ));
    }
    Ok(tensor)
}
