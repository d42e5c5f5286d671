use log::warn;
use nat_risk::{InfectivityModel, ResidualRisk, RiskError, residual_risk, risk_days_wc};
use nat_risk::residual::residual_risk_point;

use crate::input::RunInput;
use crate::output::{RiskReport, SummaryRow};

pub struct ResidualRiskModel {}

impl ResidualRiskModel {
    pub fn run(input: &RunInput, seed: Option<u64>) -> Result<RiskReport, RiskError> {
        let settings = input.settings(seed);
        let params = &input.parameters;

        if input.model == InfectivityModel::WorstCase {
            if settings.n_bs > 0 {
                warn!("uncertainty is only propagated for the continuous model; reporting point estimates");
            }
            settings.validate()?;
            let iwp = risk_days_wc(&params.nominal())?;
            let rr = residual_risk_point(params.incidence, iwp, settings.per);
            return Ok(RiskReport {
                summary: vec![
                    SummaryRow::point("risk_days", iwp),
                    SummaryRow::point("residual_risk", rr),
                ],
                draws: Vec::new(),
            });
        }

        let report = match residual_risk(params, &settings, &input.execution)? {
            ResidualRisk::PointEstimate {
                risk_days,
                residual_risk,
            } => RiskReport {
                summary: vec![
                    SummaryRow::point("risk_days", risk_days),
                    SummaryRow::point("residual_risk", residual_risk),
                ],
                draws: Vec::new(),
            },
            ResidualRisk::WithUncertainty {
                risk_days,
                risk_days_interval,
                residual_risk,
                draws,
            } => RiskReport {
                summary: vec![
                    SummaryRow {
                        metric: "risk_days",
                        estimate: risk_days,
                        interval: Some(risk_days_interval),
                        standard_error: None,
                    },
                    SummaryRow {
                        metric: "residual_risk",
                        estimate: residual_risk.point_estimate,
                        interval: Some(residual_risk.interval),
                        standard_error: Some(residual_risk.standard_error),
                    },
                ],
                draws,
            },
        };
        Ok(report)
    }
}
