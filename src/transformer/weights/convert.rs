//! SafeTensors dtype conversion to f32

use safetensors::tensor::TensorView;
use safetensors::Dtype;

/// Decode a floating-point tensor view into f32 values
///
/// Handles f32, f16, bf16 and f64. Integer tensors (position id buffers and
/// the like) return `None` and are skipped by the loader.
pub(crate) fn tensor_to_f32_vec(tensor: &TensorView<'_>) -> Option<Vec<f32>> {
    let data = tensor.data();

    match tensor.dtype() {
        Dtype::F32 => Some(
            data.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::F16 => Some(
            data.chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
        ),
        Dtype::BF16 => Some(
            data.chunks_exact(2)
                .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
        ),
        Dtype::F64 => Some(
            data.chunks_exact(8)
                .map(|c| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(c);
                    f64::from_le_bytes(bytes) as f32
                })
                .collect(),
        ),
        _ => None,
    }
}
