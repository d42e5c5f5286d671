use serde::{Deserialize, Serialize};

use crate::detection::{DEFAULT_Z, PoolSize, PooledAssay, Retests};
use crate::error::{Result, RiskError};
use crate::infectivity::DEFAULT_COPIES_PER_VIRION;
use crate::window::WindowParameters;

pub const DEFAULT_C0: f64 = 0.00025;
pub const DEFAULT_SEED: u64 = 126887;
pub const DEFAULT_N_BS: usize = 10000;
pub const DEFAULT_ALPHA: f64 = 0.05;
/// Residual risk is reported per this many transfused units.
pub const DEFAULT_PER: f64 = 1e6;

/// Nominal values and uncertainty of every input to the risk model.
///
/// `pool_size` and `retests` are validated when constructed or deserialised,
/// so a fractional or negative count never reaches the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemiologicalParameters {
    #[serde(default = "default_c0")]
    pub c0: f64,
    #[serde(default = "default_copies_per_virion")]
    pub copies_per_virion: f64,
    pub doubling_time: f64,
    pub doubling_time_sd: f64,
    pub volume_transfused: f64,
    pub volume_transfused_range: (f64, f64),
    pub k: f64,
    pub k_gamma_shape: f64,
    pub k_gamma_scale: f64,
    pub lod50: f64,
    pub lod50_sd: f64,
    pub lod95_lod50_ratio: f64,
    pub pool_size: PoolSize,
    pub retests: Retests,
    #[serde(default = "default_z")]
    pub z: f64,
    pub incidence: f64,
    pub incidence_sd: f64,
}

fn default_c0() -> f64 {
    DEFAULT_C0
}

fn default_copies_per_virion() -> f64 {
    DEFAULT_COPIES_PER_VIRION
}

fn default_z() -> f64 {
    DEFAULT_Z
}

impl EpidemiologicalParameters {
    pub fn assay(&self) -> PooledAssay {
        PooledAssay {
            pool_size: self.pool_size,
            lod50: self.lod50,
            lod95_lod50_ratio: self.lod95_lod50_ratio,
            retests: self.retests,
            z: self.z,
        }
    }

    /// Window parameters at the nominal values.
    pub fn nominal(&self) -> WindowParameters {
        WindowParameters {
            copies_per_virion: self.copies_per_virion,
            c0: self.c0,
            doubling_time: self.doubling_time,
            volume_transfused: self.volume_transfused,
            k: self.k,
            assay: self.assay(),
        }
    }
}

/// Controls for uncertainty propagation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintySettings {
    /// Number of bootstrap draws; 0 skips uncertainty propagation.
    pub n_bs: usize,
    pub alpha: f64,
    pub per: f64,
    pub seed: u64,
}

impl Default for UncertaintySettings {
    fn default() -> Self {
        UncertaintySettings {
            n_bs: DEFAULT_N_BS,
            alpha: DEFAULT_ALPHA,
            per: DEFAULT_PER,
            seed: DEFAULT_SEED,
        }
    }
}

impl UncertaintySettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(RiskError::invalid(
                "alpha",
                format!("must lie strictly between 0 and 1, got {}", self.alpha),
            ));
        }
        if !self.per.is_finite() || self.per <= 0.0 {
            return Err(RiskError::invalid("per", format!("must be positive, got {}", self.per)));
        }
        Ok(())
    }
}
