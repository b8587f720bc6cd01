//! Maximum-likelihood fitting of Gaussian ancestral graph models.
//!
//! [`Ricf`] is the entry point. [`ConGraphFitter`] fits the undirected
//! component and is usable on its own for concentration graph models.

mod congraph;
mod result;
mod ricf;
mod update;

pub use congraph::{ConGraphFit, ConGraphFitter};
pub use result::{RicfIteration, RicfResult};
pub use ricf::Ricf;
pub use update::{NodeUpdate, WorkingMatrices};
