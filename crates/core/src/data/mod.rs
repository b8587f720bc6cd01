mod covariance;
mod io;

pub use covariance::CovarianceMatrix;
