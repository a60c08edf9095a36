//! Linear regression engines.
//!
//! Direct OLS through QR factorization, L1-regularized fitting through
//! coordinate descent, and a parallel search over candidate regularization
//! strengths.

pub mod auto;
pub mod lasso;
pub mod ols;

pub use auto::{lasso_auto_fit, LassoAutoOptions, ScoredFit};
pub use lasso::{lasso_fit, soft_threshold, LassoOptions};
pub use ols::{ols_fit, OlsOptions};
