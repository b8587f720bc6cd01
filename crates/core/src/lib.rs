//! Maximum-likelihood fitting of Gaussian ancestral graph models by
//! (restricted) iterative conditional fitting.
//!
//! The entry point is [`fit::Ricf`]: give it a [`graph::MixedGraph`] and a
//! [`data::CovarianceMatrix`] and it returns a [`fit::RicfResult`] holding the
//! implied covariance and the fitted edge parameters.

pub mod data;
pub mod diagnostics;
pub mod error;
pub mod fit;
pub mod graph;
pub mod matrix;
pub mod types;

pub use error::{Result, RicfError};
