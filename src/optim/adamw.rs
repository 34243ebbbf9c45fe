//! AdamW optimizer (Adam with decoupled weight decay)

use super::Optimizer;
use crate::Tensor;
use ndarray::{Array1, Zip};

/// AdamW optimizer
///
/// Weight decay is applied to the parameters directly instead of being added
/// to the gradient:
///
/// θ_t = θ_{t-1} - lr * λ * θ_{t-1} - lr * m̂_t / (√v̂_t + ε)
///
/// with bias-corrected moments m̂_t = m_t / (1 - β1^t) and
/// v̂_t = v_t / (1 - β2^t).
pub struct AdamW {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl AdamW {
    /// Create a new AdamW optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, weight_decay, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Create AdamW with default parameters (weight_decay = 0.01)
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8, 0.01)
    }

    /// Builder-style weight decay override
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    // Checkpoint state accessors

    /// Get optimizer step counter.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Set optimizer step counter (for checkpoint resume).
    pub fn set_step_count(&mut self, t: u64) {
        self.t = t;
    }

    /// First moment buffers, by parameter position
    #[must_use]
    pub fn first_moments(&self) -> &[Option<Array1<f32>>] {
        &self.m
    }

    /// Second moment buffers, by parameter position
    #[must_use]
    pub fn second_moments(&self) -> &[Option<Array1<f32>>] {
        &self.v
    }

    /// Set first moment buffer at index.
    pub fn set_first_moment(&mut self, idx: usize, data: Array1<f32>) {
        if idx >= self.m.len() {
            self.m.resize(idx + 1, None);
        }
        self.m[idx] = Some(data);
    }

    /// Set second moment buffer at index.
    pub fn set_second_moment(&mut self, idx: usize, data: Array1<f32>) {
        if idx >= self.v.len() {
            self.v.resize(idx + 1, None);
        }
        self.v[idx] = Some(data);
    }

    #[must_use]
    pub fn beta1(&self) -> f32 {
        self.beta1
    }

    #[must_use]
    pub fn beta2(&self) -> f32 {
        self.beta2
    }

    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    #[must_use]
    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }
}

impl Optimizer for AdamW {
    fn step_refs(&mut self, params: &mut [&mut Tensor]) {
        if self.m.len() < params.len() {
            self.m.resize(params.len(), None);
            self.v.resize(params.len(), None);
        }
        self.t += 1;

        let t = self.t as i32;
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2_sqrt = (1.0 - self.beta2.powi(t)).sqrt();
        let step_size = self.lr / bias_correction1;
        let decay = 1.0 - self.lr * self.weight_decay;
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else { continue };
            let m = self.m[i].get_or_insert_with(|| Array1::zeros(grad.len()));
            let v = self.v[i].get_or_insert_with(|| Array1::zeros(grad.len()));

            Zip::from(param.data_mut()).and(m).and(v).and(&grad).for_each(|p, m, v, &g| {
                *p *= decay;
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let denom = v.sqrt() / bias_correction2_sqrt + eps;
                *p -= step_size * *m / denom;
            });
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_first_step_matches_reference() {
        // First step: m̂ = g, v̂ = g², so the update is lr * sign(g) (up to ε)
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut param = Tensor::from_vec(vec![1.0, -2.0], true);
        param.set_grad(arr1(&[0.5, -3.0]));
        opt.step_refs(&mut [&mut param]);

        let data = param.data();
        assert_abs_diff_eq!(data[0], 0.9, epsilon = 1e-5);
        assert_abs_diff_eq!(data[1], -1.9, epsilon = 1e-5);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn test_weight_decay_is_decoupled() {
        // Zero gradient: only the decay term moves the parameter
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.5);
        let mut param = Tensor::from_vec(vec![2.0], true);
        param.set_grad(arr1(&[0.0]));
        opt.step_refs(&mut [&mut param]);
        assert_abs_diff_eq!(param.data()[0], 2.0 * (1.0 - 0.1 * 0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_params_without_grad_are_skipped() {
        let mut opt = AdamW::default_params(0.1);
        let mut a = Tensor::from_vec(vec![1.0], true);
        let mut b = Tensor::from_vec(vec![1.0], true);
        b.set_grad(arr1(&[1.0]));
        opt.step_refs(&mut [&mut a, &mut b]);

        assert_eq!(a.data()[0], 1.0);
        assert!(b.data()[0] < 1.0);
        assert!(opt.first_moments()[0].is_none());
        assert!(opt.first_moments()[1].is_some());
    }

    #[test]
    fn test_minimizes_quadratic() {
        // f(x) = (x - 3)^2
        let mut opt = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        let mut x = Tensor::from_vec(vec![0.0], true);
        for _ in 0..300 {
            let g = 2.0 * (x.data()[0] - 3.0);
            x.set_grad(arr1(&[g]));
            opt.step_refs(&mut [&mut x]);
        }
        assert_abs_diff_eq!(x.data()[0], 3.0, epsilon = 0.05);
    }

    #[test]
    fn test_restored_state_continues_identically() {
        let grads = [[0.3f32, -0.1], [0.2, 0.4], [-0.5, 0.1]];
        let mut reference = AdamW::default_params(0.05);
        let mut p_ref = Tensor::from_vec(vec![1.0, 1.0], true);
        for g in &grads[..2] {
            p_ref.set_grad(arr1(g));
            reference.step_refs(&mut [&mut p_ref]);
        }

        let mut resumed = AdamW::default_params(0.05);
        resumed.set_step_count(reference.step_count());
        if let (Some(m), Some(v)) = (&reference.first_moments()[0], &reference.second_moments()[0]) {
            resumed.set_first_moment(0, m.clone());
            resumed.set_second_moment(0, v.clone());
        }
        let mut p_res = Tensor::from_vec(p_ref.data().to_vec(), true);

        p_ref.set_grad(arr1(&grads[2]));
        reference.step_refs(&mut [&mut p_ref]);
        p_res.set_grad(arr1(&grads[2]));
        resumed.step_refs(&mut [&mut p_res]);

        for (a, b) in p_ref.data().iter().zip(p_res.data()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_hyperparameter_accessors() {
        let mut opt = AdamW::default_params(2e-5).with_weight_decay(0.0);
        assert_eq!(opt.beta1(), 0.9);
        assert_eq!(opt.beta2(), 0.999);
        assert_eq!(opt.epsilon(), 1e-8);
        assert_eq!(opt.weight_decay(), 0.0);
        opt.set_lr(1e-3);
        assert_eq!(opt.lr(), 1e-3);
    }
}
