// ============================================================
// Layer 4 — Emotion Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<EmotionSample>
// into tensors on the requested device.
//
//   Input:  N samples, each padded to S positions
//   Output: input_ids [N, S], attention_mask [N, S], labels [N]
//
// All samples share the same window, so stacking is a flat
// copy followed by a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::EmotionSample;
use crate::data::encoding::TextEncoding;

// ─── EmotionBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct EmotionBatch<B: Backend> {
    /// Token IDs — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Class index per sample — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── EmotionBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct EmotionBatcher;

impl EmotionBatcher {
    pub fn new() -> Self {
        Self
    }
}

/// Stack fixed-length rows into an `[rows.len(), seq_len]` Int tensor.
pub fn stack_rows<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let seq_len = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<i64> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&x| x as i64))
        .collect();
    Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [rows.len(), seq_len]), device)
}

/// Tensors for a single inference input: batch of one.
pub fn encoding_tensors<B: Backend>(
    encoding: &TextEncoding,
    device:   &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    (
        stack_rows::<B>(&[encoding.input_ids.as_slice()], device),
        stack_rows::<B>(&[encoding.attention_mask.as_slice()], device),
    )
}

impl<B: Backend> Batcher<B, EmotionSample, EmotionBatch<B>> for EmotionBatcher {
    fn batch(&self, items: Vec<EmotionSample>, device: &B::Device) -> EmotionBatch<B> {
        let ids: Vec<&[u32]>  = items.iter().map(|s| s.input_ids.as_slice()).collect();
        let mask: Vec<&[u32]> = items.iter().map(|s| s.attention_mask.as_slice()).collect();
        let labels: Vec<i64>  = items.iter().map(|s| s.label as i64).collect();

        EmotionBatch {
            input_ids:      stack_rows::<B>(&ids, device),
            attention_mask: stack_rows::<B>(&mask, device),
            labels:         Tensor::<B, 1, Int>::from_data(
                TensorData::new(labels, [items.len()]),
                device,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let items = vec![
            EmotionSample { input_ids: vec![101, 5, 102, 0], attention_mask: vec![1, 1, 1, 0], label: 2 },
            EmotionSample { input_ids: vec![101, 6, 7, 102], attention_mask: vec![1, 1, 1, 1], label: 0 },
        ];
        let batch: EmotionBatch<TestBackend> = EmotionBatcher::new().batch(items, &device);

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        let labels: Vec<i64> = batch.labels.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![2, 0]);
    }
}
