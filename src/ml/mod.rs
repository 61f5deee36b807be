//! Machine learning helpers for training and inference.
//!
//! These are the building blocks used to fit the event classifier on sensor
//! features, evaluate it on a held-out split, and predict test recordings.

pub mod gbdt;
pub mod metrics;
pub mod split;
