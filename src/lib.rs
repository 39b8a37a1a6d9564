//! # u-probdist
//!
//! Density, distribution and quantile functions for the classical
//! probability distributions, with the special functions behind them and a
//! small layer of textbook inference on top.
//!
//! Distribution functions follow the `d_*` / `p_*` / `q_*` naming of R and
//! take plain `f64` arguments. Invalid parameters give `NaN`; they never
//! panic.
//!
//! ## Modules
//!
//! - [`special`]: Stirling error, deviance `bd0`, `log1pmx`, log-space
//!   arithmetic, incomplete beta
//! - [`normal`]: Normal density, CDF and two quantile algorithms
//! - [`gamma`]: Regularized incomplete gamma in four regimes, gamma quantile
//! - [`chisq`]: Chi-square as Gamma(df/2, 2)
//! - [`poisson`]: Poisson mass, CDF and quantile
//! - [`binomial`]: Binomial mass via saddle point, CDF and quantile
//! - [`student`]: Student t density, CDF and quantile
//! - [`stats`]: Descriptive statistics of a sample
//! - [`inference`]: CLT helpers, confidence intervals, z and t tests
//! - [`regression`]: Least-squares line and Pearson correlation
//! - [`contingency`]: Chi-square goodness of fit and independence
//! - [`error`]: Error type of the sample-based helpers
//!
//! ## Design Philosophy
//!
//! - **Tails stay accurate**: every CDF has an upper-tail twin and the
//!   gamma family works on the log scale internally
//! - **Regimes over formulas**: each algorithm switches method by argument
//!   magnitude instead of forcing one expression everywhere
//! - **Property-based testing**: inversion, monotonicity and complement
//!   identities verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_probdist::{binomial, normal, poisson};
//!
//! // 44% shooter, exactly 7 of 10
//! assert!((binomial::d_binom(7, 10, 0.44) - 0.067).abs() < 1e-3);
//! // waiting time N(2.58, 0.76) below 4 minutes
//! assert!((normal::p_norm(4.0, 2.58, 0.76) - 0.969).abs() < 1e-3);
//! // 95th percentile of web visits at 15 per hour
//! assert_eq!(poisson::q_pois(0.95, 15.0), 22.0);
//! ```

pub mod binomial;
pub mod chisq;
pub mod contingency;
pub mod error;
pub mod gamma;
pub mod inference;
pub mod normal;
pub mod poisson;
pub mod regression;
mod search;
pub mod special;
pub mod stats;
pub mod student;

pub use error::{Result, StatsError};
