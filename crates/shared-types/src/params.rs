//! # Network Parameters
//!
//! Deployment-wide constants fixed at genesis. Every agent in one network
//! must run with bit-identical values; the [`NetworkParams::fingerprint`] is
//! carried in every datagram header so a mismatch is detected per message.

use crate::errors::ParamsError;
use shared_crypto::truncated_hash;
use std::time::Duration;

const FINGERPRINT_CONTEXT: &str = "hypersync 2024 network params fingerprint v1";

/// Header + proof record, the smallest useful datagram.
pub const MIN_DATAGRAM_BYTES: usize = 23 + 110 + 64;

/// Weights of the four state components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentWeights {
    /// Diagonal-dominant stability part.
    pub stability: f64,
    /// Antisymmetric rotation part.
    pub rotation: f64,
    /// Symmetric off-diagonal growth part.
    pub growth: f64,
    /// Binary connectivity part.
    pub connectivity: f64,
}

impl ComponentWeights {
    /// Weights in component order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.stability, self.rotation, self.growth, self.connectivity]
    }
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            stability: 0.4,
            rotation: 0.3,
            growth: 0.2,
            connectivity: 0.1,
        }
    }
}

/// Immutable network-wide configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParams {
    /// Side length `n` of the state matrix.
    pub dimension: usize,
    /// Component weights.
    pub weights: ComponentWeights,
    /// Minimum validity score for the coherence criterion.
    pub validity_threshold: f64,
    /// Magnitude below which an entry counts as zero.
    pub zero_tolerance: f64,
    /// Power-iteration cap for the eigenvector estimate.
    pub max_power_iterations: u32,
    /// Hard wall-clock budget for one worker computation.
    pub computation_timeout: Duration,
    /// Maximum size of one datagram in bytes.
    pub max_datagram_bytes: usize,
    /// How long an incomplete batch is kept before being dropped.
    pub reassembly_timeout: Duration,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            dimension: 8,
            weights: ComponentWeights::default(),
            validity_threshold: 0.8,
            zero_tolerance: 1e-9,
            max_power_iterations: 100,
            computation_timeout: Duration::from_secs(5),
            max_datagram_bytes: 1200,
            reassembly_timeout: Duration::from_secs(2),
        }
    }
}

impl NetworkParams {
    /// Check every value is usable. Called once at `Initializing`.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(4..=1024).contains(&self.dimension) {
            return Err(ParamsError::DimensionOutOfRange(self.dimension));
        }

        let weights = self.weights.as_array();
        let sum: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) || (sum - 1.0).abs() > 1e-9 {
            return Err(ParamsError::InvalidWeights(sum));
        }

        if !(0.0..=1.0).contains(&self.validity_threshold) {
            return Err(ParamsError::InvalidThreshold(self.validity_threshold));
        }

        if !(self.zero_tolerance.is_finite() && self.zero_tolerance >= 0.0) {
            return Err(ParamsError::Invalid {
                name: "zero_tolerance",
                reason: format!("{} is not a non-negative number", self.zero_tolerance),
            });
        }

        if self.max_power_iterations == 0 {
            return Err(ParamsError::Invalid {
                name: "max_power_iterations",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.computation_timeout.is_zero() {
            return Err(ParamsError::Invalid {
                name: "computation_timeout",
                reason: "must be non-zero".to_string(),
            });
        }

        if self.max_datagram_bytes < MIN_DATAGRAM_BYTES || self.max_datagram_bytes > 65_507 {
            return Err(ParamsError::DatagramTooSmall(
                self.max_datagram_bytes,
                MIN_DATAGRAM_BYTES,
            ));
        }

        Ok(())
    }

    /// Dimension as carried on the wire.
    pub fn wire_dimension(&self) -> u16 {
        self.dimension as u16
    }

    /// 8-byte digest over the bit patterns of every parameter.
    pub fn fingerprint(&self) -> [u8; 8] {
        let mut bytes = Vec::with_capacity(96);
        bytes.extend_from_slice(&(self.dimension as u64).to_be_bytes());
        for weight in self.weights.as_array() {
            bytes.extend_from_slice(&weight.to_bits().to_be_bytes());
        }
        bytes.extend_from_slice(&self.validity_threshold.to_bits().to_be_bytes());
        bytes.extend_from_slice(&self.zero_tolerance.to_bits().to_be_bytes());
        bytes.extend_from_slice(&self.max_power_iterations.to_be_bytes());
        bytes.extend_from_slice(&(self.computation_timeout.as_millis() as u64).to_be_bytes());
        bytes.extend_from_slice(&(self.max_datagram_bytes as u64).to_be_bytes());
        bytes.extend_from_slice(&(self.reassembly_timeout.as_millis() as u64).to_be_bytes());
        truncated_hash(FINGERPRINT_CONTEXT, &bytes)
    }
}
