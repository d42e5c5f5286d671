use nat_risk::{EpidemiologicalParameters, ExecutionMode, InfectivityModel, UncertaintySettings};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RunInput {
    pub parameters: EpidemiologicalParameters,
    #[serde(default)]
    pub model: InfectivityModel,
    #[serde(default)]
    pub uncertainty: UncertaintySettings,
    #[serde(default)]
    pub execution: ExecutionMode,
}

impl RunInput {
    /// Uncertainty settings with the environment seed, when one was given,
    /// taking precedence.
    pub fn settings(&self, seed: Option<u64>) -> UncertaintySettings {
        UncertaintySettings {
            seed: seed.unwrap_or(self.uncertainty.seed),
            ..self.uncertainty
        }
    }
}
