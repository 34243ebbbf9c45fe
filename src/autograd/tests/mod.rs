//! Autograd tests: forward values, analytic vs numeric gradients, tape ordering

mod prop_ops;
