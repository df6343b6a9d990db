//! Synthetic module data for exercising the labeling.
//!
//! Generators fill a presence grid and read it back in column-major order, so
//! their output always satisfies the labeling precondition.

use rand::Rng;
use sparseccl_core::{Cell, Error, ModuleBatch, ModuleExtent, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shape of generated pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Pattern {
    /// Every channel fires independently with the given probability.
    #[default]
    FullRandom,
    /// Channels seed rectangular areas with the given probability; each
    /// channel inside an area then fires with `cell_probability`.
    Clustered {
        /// Area size along `channel0`.
        cluster_width: u32,
        /// Area size along `channel1`.
        cluster_height: u32,
        /// Firing probability inside an area.
        cell_probability: f64,
    },
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} {p} is not in [0, 1]")))
    }
}

fn collect_present(extent: ModuleExtent, present: &[bool]) -> Vec<Cell> {
    let height = extent.height as usize;
    let mut cells = Vec::new();
    for channel0 in 0..extent.width {
        let column = &present[channel0 as usize * height..(channel0 as usize + 1) * height];
        cells.extend(
            column
                .iter()
                .zip(0u32..)
                .filter(|(&on, _)| on)
                .map(|(_, channel1)| Cell::at(channel0, channel1)),
        );
    }
    cells
}

/// Generates independently firing channels.
///
/// # Errors
/// Returns [`Error::ConfigError`] if `probability` is outside `[0, 1]`.
pub fn generate_full_random<R: Rng>(
    extent: ModuleExtent,
    probability: f64,
    rng: &mut R,
) -> Result<Vec<Cell>> {
    check_probability("probability", probability)?;
    let present: Vec<bool> = (0..extent.area())
        .map(|_| rng.random_bool(probability))
        .collect();
    Ok(collect_present(extent, &present))
}

/// Generates rectangular areas of partially firing channels.
///
/// Areas are clipped at the module edge and may overlap.
///
/// # Errors
/// Returns [`Error::ConfigError`] if a probability is outside `[0, 1]`.
pub fn generate_area<R: Rng>(
    extent: ModuleExtent,
    cluster_probability: f64,
    cell_probability: f64,
    cluster_width: u32,
    cluster_height: u32,
    rng: &mut R,
) -> Result<Vec<Cell>> {
    check_probability("cluster probability", cluster_probability)?;
    check_probability("cell probability", cell_probability)?;

    let height = extent.height as usize;
    let mut present = vec![false; extent.area()];
    for channel0 in 0..extent.width {
        for channel1 in 0..extent.height {
            if !rng.random_bool(cluster_probability) {
                continue;
            }
            let c0_end = channel0.saturating_add(cluster_width).min(extent.width);
            let c1_end = channel1.saturating_add(cluster_height).min(extent.height);
            for c0 in channel0..c0_end {
                for c1 in channel1..c1_end {
                    if rng.random_bool(cell_probability) {
                        present[c0 as usize * height + c1 as usize] = true;
                    }
                }
            }
        }
    }
    Ok(collect_present(extent, &present))
}

/// Generates one module following `pattern`.
///
/// # Errors
/// Returns [`Error::ConfigError`] if a probability is outside `[0, 1]`.
pub fn generate<R: Rng>(
    extent: ModuleExtent,
    pattern: Pattern,
    probability: f64,
    rng: &mut R,
) -> Result<Vec<Cell>> {
    match pattern {
        Pattern::FullRandom => generate_full_random(extent, probability, rng),
        Pattern::Clustered {
            cluster_width,
            cluster_height,
            cell_probability,
        } => generate_area(
            extent,
            probability,
            cell_probability,
            cluster_width,
            cluster_height,
            rng,
        ),
    }
}

/// Generates a flattened batch of `modules` modules.
///
/// Each module draws its own probability uniformly from
/// `0..=max_probability`, so module sizes vary across the batch.
///
/// # Errors
/// Returns [`Error::ConfigError`] if a probability is outside `[0, 1]`.
pub fn generate_batch<R: Rng>(
    modules: usize,
    extent: ModuleExtent,
    pattern: Pattern,
    max_probability: f64,
    rng: &mut R,
) -> Result<ModuleBatch<Cell>> {
    check_probability("max probability", max_probability)?;
    let mut batch = ModuleBatch::with_capacity(modules, 0);
    for _ in 0..modules {
        let probability = rng.random_range(0.0..=max_probability);
        batch.push_module(generate(extent, pattern, probability, rng)?);
    }
    Ok(batch)
}
