//! Multi-head scaled dot-product attention with a key padding mask

use super::activations::softmax_rows;
use super::matmul::{contiguous, flatten, view2};
use super::tracks;
use crate::autograd::{BackwardOp, Context, GradCell, Tensor};
use ndarray::{s, Array2, Axis};
use rand::Rng;
use std::rc::Rc;

/// Layout of the attention inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttentionShape {
    pub batch: usize,
    pub seq: usize,
    pub heads: usize,
    pub head_dim: usize,
}

impl AttentionShape {
    fn hidden(&self) -> usize {
        self.heads * self.head_dim
    }

    fn rows(&self) -> usize {
        self.batch * self.seq
    }
}

/// Multi-head self-attention over already-projected queries, keys and values
///
/// `q`, `k` and `v` are `(batch * seq) x (heads * head_dim)` buffers with the
/// heads laid out side by side, as produced by a single linear projection.
/// `key_mask` has `batch * seq` entries; keys whose mask is 0 receive no
/// attention. In training mode the attention weights go through dropout with
/// probability `dropout_p`. Returns the per-head contexts concatenated back
/// into a `(batch * seq) x (heads * head_dim)` buffer.
pub fn multi_head_attention(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    key_mask: &[u32],
    shape: AttentionShape,
    dropout_p: f32,
    ctx: &mut Context,
) -> Tensor {
    let AttentionShape { batch, seq, heads, head_dim } = shape;
    let hidden = shape.hidden();
    let rows = shape.rows();
    assert_eq!(key_mask.len(), rows, "attention: mask must have batch * seq entries");
    let use_dropout = ctx.is_training() && dropout_p > 0.0;
    let keep_scale = if dropout_p < 1.0 { 1.0 / (1.0 - dropout_p) } else { 0.0 };

    let q2 = view2(contiguous(q.data()), rows, hidden);
    let k2 = view2(contiguous(k.data()), rows, hidden);
    let v2 = view2(contiguous(v.data()), rows, hidden);
    let scale = 1.0 / (head_dim as f32).sqrt();

    let mut out = Array2::<f32>::zeros((rows, hidden));
    let mut probs = Vec::with_capacity(batch * heads * seq * seq);
    let mut drop_masks = Vec::new();

    for b in 0..batch {
        let r = b * seq..(b + 1) * seq;
        let mask = &key_mask[r.clone()];
        for h in 0..heads {
            let c = h * head_dim..(h + 1) * head_dim;
            let qh = q2.slice(s![r.clone(), c.clone()]);
            let kh = k2.slice(s![r.clone(), c.clone()]);
            let vh = v2.slice(s![r.clone(), c.clone()]);

            let mut scores = qh.dot(&kh.t()) * scale;
            for mut row in scores.axis_iter_mut(Axis(0)) {
                for (score, &m) in row.iter_mut().zip(mask) {
                    if m == 0 {
                        *score = f32::MIN;
                    }
                }
            }
            let scores_flat: Vec<f32> = scores.iter().copied().collect();
            let p = softmax_rows(&scores_flat, seq, seq);
            if use_dropout {
                let rng = ctx.rng_mut();
                let m: Vec<f32> = (0..seq * seq)
                    .map(|_| if rng.random::<f32>() < dropout_p { 0.0 } else { keep_scale })
                    .collect();
                let weights: Vec<f32> = p.iter().zip(&m).map(|(a, b)| a * b).collect();
                out.slice_mut(s![r.clone(), c]).assign(&view2(&weights, seq, seq).dot(&vh));
                drop_masks.extend_from_slice(&m);
            } else {
                out.slice_mut(s![r.clone(), c]).assign(&view2(&p, seq, seq).dot(&vh));
            }
            probs.extend_from_slice(&p);
        }
    }

    let requires_grad = tracks(&[q, k, v]);
    let mut result = Tensor::new(flatten(&out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AttentionBackward {
            q: q.clone(),
            k: k.clone(),
            v: v.clone(),
            probs,
            drop_masks,
            shape,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AttentionBackward {
    q: Tensor,
    k: Tensor,
    v: Tensor,
    /// Softmax weights, `batch x heads x seq x seq`
    probs: Vec<f32>,
    /// Scaled keep masks matching `probs`; empty when dropout was off
    drop_masks: Vec<f32>,
    shape: AttentionShape,
    result_grad: GradCell,
}

impl BackwardOp for AttentionBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().as_ref().cloned() else {
            return;
        };
        let AttentionShape { batch, seq, heads, head_dim } = self.shape;
        let hidden = self.shape.hidden();
        let rows = self.shape.rows();
        let scale = 1.0 / (head_dim as f32).sqrt();

        let d_out = view2(contiguous(&grad), rows, hidden);
        let q2 = view2(contiguous(self.q.data()), rows, hidden);
        let k2 = view2(contiguous(self.k.data()), rows, hidden);
        let v2 = view2(contiguous(self.v.data()), rows, hidden);

        let mut dq = Array2::<f32>::zeros((rows, hidden));
        let mut dk = Array2::<f32>::zeros((rows, hidden));
        let mut dv = Array2::<f32>::zeros((rows, hidden));

        for b in 0..batch {
            let r = b * seq..(b + 1) * seq;
            for h in 0..heads {
                let c = h * head_dim..(h + 1) * head_dim;
                let offset = (b * heads + h) * seq * seq;
                let p = view2(&self.probs[offset..offset + seq * seq], seq, seq);

                let d_oh = d_out.slice(s![r.clone(), c.clone()]);
                let qh = q2.slice(s![r.clone(), c.clone()]);
                let kh = k2.slice(s![r.clone(), c.clone()]);
                let vh = v2.slice(s![r.clone(), c.clone()]);

                // W = P * M (dropout mask), O = W V
                // dV = W^T dO, dP = (dO V^T) * M
                let mut dp = d_oh.dot(&vh.t());
                if self.drop_masks.is_empty() {
                    dv.slice_mut(s![r.clone(), c.clone()]).assign(&p.t().dot(&d_oh));
                } else {
                    let m = view2(&self.drop_masks[offset..offset + seq * seq], seq, seq);
                    let w = &p * &m;
                    dv.slice_mut(s![r.clone(), c.clone()]).assign(&w.t().dot(&d_oh));
                    dp *= &m;
                }

                // dS = P * (dP - rowsum(dP * P))
                let mut ds = &dp * &p;
                let row_dots = ds.sum_axis(Axis(1));
                for (i, mut row) in ds.axis_iter_mut(Axis(0)).enumerate() {
                    for (j, val) in row.iter_mut().enumerate() {
                        *val = p[[i, j]] * (dp[[i, j]] - row_dots[i]);
                    }
                }
                ds *= scale;

                dq.slice_mut(s![r.clone(), c.clone()]).assign(&ds.dot(&kh));
                dk.slice_mut(s![r.clone(), c]).assign(&ds.t().dot(&qh));
            }
        }

        if self.q.requires_grad() {
            self.q.accumulate_grad(flatten(&dq));
        }
        if self.k.requires_grad() {
            self.k.accumulate_grad(flatten(&dk));
        }
        if self.v.requires_grad() {
            self.v.accumulate_grad(flatten(&dv));
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.q, &self.k, &self.v]
    }
}
