use nat_risk::{ConfidenceInterval, ResidualRiskDraw};

pub const SUMMARY_HEADERS: [&str; 5] = ["metric", "estimate", "lower", "upper", "standard_error"];
pub const DRAW_HEADERS: [&str; 3] = ["draw", "risk_days", "residual_risk"];

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub metric: &'static str,
    pub estimate: f64,
    pub interval: Option<ConfidenceInterval>,
    pub standard_error: Option<f64>,
}

impl SummaryRow {
    pub fn point(metric: &'static str, estimate: f64) -> SummaryRow {
        SummaryRow {
            metric,
            estimate,
            interval: None,
            standard_error: None,
        }
    }

    pub fn to_record(&self) -> Vec<String> {
        let optional = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        vec![
            self.metric.to_string(),
            self.estimate.to_string(),
            optional(self.interval.map(|ci| ci.lower)),
            optional(self.interval.map(|ci| ci.upper)),
            optional(self.standard_error),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskReport {
    pub summary: Vec<SummaryRow>,
    pub draws: Vec<ResidualRiskDraw>,
}

impl RiskReport {
    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        self.summary.iter().map(SummaryRow::to_record).collect()
    }

    pub fn draw_rows(&self) -> Vec<Vec<String>> {
        self.draws
            .iter()
            .enumerate()
            .map(|(i, d)| vec![i.to_string(), d.risk_days.to_string(), d.residual_risk.to_string()])
            .collect()
    }
}
