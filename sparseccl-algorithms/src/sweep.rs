//! Density sweep: labels synthetic modules and checks every result against
//! the flood-fill reference.

use crate::synth::{generate, Pattern};
use crate::validator::{ReferenceValidator, ValidationSession};
use crate::SparseCcl;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sparseccl_core::{CclConfig, Error, ModuleExtent, OrderCheck, Result, ValidatorConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Presence probabilities from one in a million up to a full module.
#[must_use]
pub fn default_probabilities() -> Vec<f64> {
    vec![1e-6, 1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 0.5, 0.9, 1.0]
}

/// Sweep configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SweepConfig {
    /// Module grid dimensions.
    pub extent: ModuleExtent,
    /// Shape of the generated data.
    pub pattern: Pattern,
    /// Probabilities to sweep, in order.
    pub probabilities: Vec<f64>,
    /// Modules generated per probability.
    pub trials: usize,
    /// Random seed.
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            extent: ModuleExtent::default(),
            pattern: Pattern::FullRandom,
            probabilities: default_probabilities(),
            trials: 100,
            seed: 42,
        }
    }
}

impl SweepConfig {
    /// Checks the configuration for values that cannot run.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for zero trials, an empty probability
    /// list or a probability outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::ConfigError("sweep needs at least one trial".into()));
        }
        if self.probabilities.is_empty() {
            return Err(Error::ConfigError("sweep has no probabilities".into()));
        }
        if let Some(p) = self
            .probabilities
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(Error::ConfigError(format!("probability {p} is not in [0, 1]")));
        }
        Ok(())
    }
}

/// Totals for one swept probability.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SweepReport {
    /// Presence probability.
    pub probability: f64,
    /// Modules generated.
    pub trials: usize,
    /// Cells over all modules.
    pub cells: u64,
    /// Clusters over all modules.
    pub clusters: u64,
    /// Modules whose cluster count disagreed with the flood fill.
    pub mismatches: usize,
}

impl SweepReport {
    /// Average cells per module.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_cells(&self) -> f64 {
        self.cells as f64 / self.trials.max(1) as f64
    }

    /// Average clusters per module.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_clusters(&self) -> f64 {
        self.clusters as f64 / self.trials.max(1) as f64
    }
}

/// Runs labeling and validation over a range of densities.
#[derive(Debug, Clone)]
pub struct DensitySweep {
    config: SweepConfig,
    ccl: SparseCcl,
    validator: ReferenceValidator,
}

impl DensitySweep {
    /// Create with custom configuration.
    ///
    /// Labeling always checks input order, and mismatch dumps draw the grid.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an invalid configuration.
    pub fn new(config: SweepConfig) -> Result<Self> {
        Self::with_validator_config(
            ValidatorConfig::new().with_extent(config.extent),
            config,
        )
    }

    /// Create with explicit validator settings; the sweep's extent wins.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an invalid configuration.
    pub fn with_validator_config(validator: ValidatorConfig, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let validator = ReferenceValidator::new(validator.with_extent(config.extent))?;
        Ok(Self {
            config,
            ccl: SparseCcl::new(CclConfig::new().with_order_check(OrderCheck::Always)),
            validator,
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweeps every configured probability.
    ///
    /// # Errors
    /// Propagates generator, labeling and validation errors. Count mismatches
    /// are not errors; they are tallied in the reports and the session.
    pub fn run(&self, session: &mut ValidationSession) -> Result<Vec<SweepReport>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.config
            .probabilities
            .iter()
            .map(|&p| self.run_probability(p, &mut rng, session))
            .collect()
    }

    /// Generates, labels and validates `trials` modules at one probability.
    ///
    /// # Errors
    /// Propagates generator, labeling and validation errors.
    pub fn run_probability(
        &self,
        probability: f64,
        rng: &mut StdRng,
        session: &mut ValidationSession,
    ) -> Result<SweepReport> {
        let mut report = SweepReport {
            probability,
            trials: self.config.trials,
            ..SweepReport::default()
        };

        for _ in 0..self.config.trials {
            let cells = generate(self.config.extent, self.config.pattern, probability, rng)?;
            let labels = self.ccl.label_module(&cells)?;
            let outcome = self
                .validator
                .validate(&cells, labels.cluster_count(), session)?;

            report.cells += cells.len() as u64;
            report.clusters += u64::from(labels.cluster_count());
            if !outcome.is_match() {
                report.mismatches += 1;
            }
        }

        info!(
            "probability {:e}: {} trials, {:.1} cells/module, {:.1} clusters/module, {} mismatches",
            probability,
            report.trials,
            report.mean_cells(),
            report.mean_clusters(),
            report.mismatches
        );
        Ok(report)
    }
}
