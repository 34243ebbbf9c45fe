//! Property tests for autograd forward invariants

use crate::autograd::{cross_entropy, layer_norm, matmul_compute, softmax_rows, transpose, Tensor};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_softmax_rows_are_distributions(
        values in prop::collection::vec(-30.0f32..30.0, 12)
    ) {
        let p = softmax_rows(&values, 3, 4);
        for row in p.chunks_exact(4) {
            let sum: f32 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-5);
            prop_assert!(row.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn prop_layer_norm_rows_centered(
        values in prop::collection::vec(-10.0f32..10.0, 16)
    ) {
        // Skip nearly constant rows where the normalization is dominated by eps
        prop_assume!(values.chunks_exact(8).all(|r| {
            let mean = r.iter().sum::<f32>() / 8.0;
            r.iter().map(|v| (v - mean).abs()).sum::<f32>() > 0.5
        }));
        let x = Tensor::from_vec(values, false);
        let g = Tensor::from_vec(vec![1.0; 8], false);
        let b = Tensor::from_vec(vec![0.0; 8], false);
        let y = layer_norm(&x, &g, &b, 2, 8, 1e-5);
        for row in y.data().as_slice().unwrap_or(&[]).chunks_exact(8) {
            let mean: f32 = row.iter().sum::<f32>() / 8.0;
            let var: f32 = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 8.0;
            prop_assert!(mean.abs() < 1e-4);
            prop_assert!((var - 1.0).abs() < 1e-2);
        }
    }

    #[test]
    fn prop_matmul_transpose_identity(
        a in prop::collection::vec(-5.0f32..5.0, 6),
        b in prop::collection::vec(-5.0f32..5.0, 6)
    ) {
        // (AB)^T = B^T A^T
        let ab = matmul_compute(&a, &b, 2, 3, 2);
        let bt_at = matmul_compute(&transpose(&b, 3, 2), &transpose(&a, 2, 3), 2, 3, 2);
        let ab_t = transpose(&ab, 2, 2);
        for (x, y) in ab_t.iter().zip(&bt_at) {
            prop_assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn prop_cross_entropy_non_negative(
        logits in prop::collection::vec(-20.0f32..20.0, 8),
        labels in prop::collection::vec(0usize..2, 4)
    ) {
        let loss = cross_entropy(&Tensor::from_vec(logits, false), &labels, 4, 2);
        prop_assert!(loss.item() >= 0.0);
        prop_assert!(loss.item().is_finite());
    }
}
