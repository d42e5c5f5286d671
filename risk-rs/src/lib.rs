//! Residual risk of transfusion-transmitted infection under pooled NAT
//! screening.
//!
//! A donation is risky while it is both infectious and missed by the screen.
//! [`window`] integrates that joint probability over the window period to give
//! risk days, [`uncertainty`] re-runs the integration under resampled inputs to
//! attach confidence intervals, and [`residual`] scales risk days by incidence.

pub mod detection;
pub mod error;
pub mod growth;
pub mod infectivity;
pub mod parameters;
pub mod quadrature;
pub mod residual;
pub mod sampling;
pub mod strategy;
pub mod uncertainty;
pub mod window;

pub use detection::{PoolSize, PooledAssay, Retests};
pub use error::{Result, RiskError};
pub use infectivity::InfectivityModel;
pub use parameters::{EpidemiologicalParameters, UncertaintySettings};
pub use residual::{ResidualRisk, ResidualRiskDraw, ResidualRiskEstimate, residual_risk, residual_risk_iwp};
pub use strategy::{EvaluationStrategy, ExecutionMode, Pooled, Sequential, worker_count};
pub use uncertainty::{ConfidenceInterval, RiskDaysBootstrap, bootstrap_risk_days, iwp_bs, iwp_bs_par};
pub use window::{WindowIntegrator, WindowParameters, risk_days, risk_days_wc};
