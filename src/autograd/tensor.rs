//! Tensor with shared gradient cell for the autograd tape

use super::BackwardOp;
use ndarray::Array1;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared gradient storage. Clones of a tensor point at the same cell.
pub type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// A flat, row-major `f32` buffer that can take part in backpropagation.
///
/// Shapes are carried by the operations, not by the tensor: `matmul` takes
/// `(m, k, n)`, `layer_norm` takes `(rows, cols)` and so on.
///
/// Cloning is cheap. Data is reference counted and copied on write, the
/// gradient cell and backward op are shared, so a clone held by a backward
/// op sees the gradient accumulated into the original.
#[derive(Clone)]
pub struct Tensor {
    data: Rc<Array1<f32>>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from an ndarray buffer
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data: Rc::new(data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a tensor from a Vec
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a zero-filled tensor
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(len), requires_grad)
    }

    /// Borrow the data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Mutably borrow the data, copying first if another clone still shares it
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        Rc::make_mut(&mut self.data)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether gradients flow into this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Toggle gradient tracking (used to freeze parameters)
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Copy of the accumulated gradient, if any
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Shared handle to the gradient cell
    pub fn grad_cell(&self) -> GradCell {
        Rc::clone(&self.grad)
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add into the gradient, initializing it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += &grad,
            None => *cell = Some(grad),
        }
    }

    /// Clear the gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Attach the op that produced this tensor
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// The op that produced this tensor, if it is not a leaf
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Stable identity of the gradient cell, shared by all clones
    pub(crate) fn node_id(&self) -> usize {
        Rc::as_ptr(&self.grad) as *const () as usize
    }

    /// A leaf copy of the values, cut off from the tape
    pub fn detach(&self) -> Self {
        Self {
            data: Rc::clone(&self.data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad: false,
        }
    }

    /// Values as a plain Vec
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.to_vec()
    }

    /// Scalar value of a single-element tensor
    pub fn item(&self) -> f32 {
        self.data.first().copied().unwrap_or(0.0)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .field("has_backward_op", &self.backward_op.is_some())
            .finish()
    }
}
