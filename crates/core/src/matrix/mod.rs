pub mod dense;
pub mod selection;

pub use dense::{
    inverse_spd, invert_general, invert_symmetric, log_determinant_spd, one_norm, solve_symmetric, symmetrize, trace,
};
pub use selection::{assign, complement, fill, positions_in, select};
