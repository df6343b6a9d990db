//! Labeling results.
//!
//! Cluster ids are 1-based and contiguous: a module with `k` clusters labels
//! every cell with an id in `1..=k`.

use crate::batch::ModuleDescriptor;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Checks that `labels` uses exactly the ids `1..=cluster_count`.
fn check_table(labels: &[u32], cluster_count: u32) -> Result<()> {
    let mut seen = vec![false; cluster_count as usize];
    for (i, &label) in labels.iter().enumerate() {
        let id = label
            .checked_sub(1)
            .map(|id| id as usize)
            .filter(|&id| id < seen.len());
        match id {
            Some(id) => seen[id] = true,
            None => {
                return Err(Error::InvalidLabels(format!(
                    "cell {i} has id {label}, expected 1..={cluster_count}"
                )))
            }
        }
    }
    if let Some(missing) = seen.iter().position(|&used| !used) {
        return Err(Error::InvalidLabels(format!(
            "cluster {} of {cluster_count} has no cells",
            missing + 1
        )));
    }
    Ok(())
}

/// Cluster assignment for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawModuleLabels"))]
pub struct ModuleLabels {
    labels: Vec<u32>,
    cluster_count: u32,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawModuleLabels {
    labels: Vec<u32>,
    cluster_count: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawModuleLabels> for ModuleLabels {
    type Error = Error;

    fn try_from(raw: RawModuleLabels) -> Result<Self> {
        Self::from_table(raw.labels, raw.cluster_count)
    }
}

impl ModuleLabels {
    /// Wraps a compacted label table.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabels`] unless every label lies in
    /// `1..=cluster_count` and every id in that range is used.
    pub fn from_table(labels: Vec<u32>, cluster_count: u32) -> Result<Self> {
        check_table(&labels, cluster_count)?;
        Ok(Self {
            labels,
            cluster_count,
        })
    }

    /// Cluster id of every cell, indexed like the module's cells.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Number of clusters.
    #[must_use]
    pub fn cluster_count(&self) -> u32 {
        self.cluster_count
    }

    /// Number of labeled cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the module had no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cell count of every cluster; entry `id - 1` belongs to cluster `id`.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.cluster_count as usize];
        for &label in &self.labels {
            sizes[label as usize - 1] += 1;
        }
        sizes
    }

    /// Indices of the cells in cluster `id`.
    pub fn members(&self, id: u32) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |&(_, &label)| label == id)
            .map(|(i, _)| i)
    }

    /// Cell indices grouped by cluster, in id order.
    #[must_use]
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.cluster_count as usize];
        for (i, &label) in self.labels.iter().enumerate() {
            clusters[label as usize - 1].push(i);
        }
        clusters
    }

    /// Returns true if both assignments describe the same partition,
    /// regardless of how the clusters are numbered.
    #[must_use]
    pub fn same_partition(&self, other: &Self) -> bool {
        if self.labels.len() != other.labels.len() || self.cluster_count != other.cluster_count {
            return false;
        }
        let k = self.cluster_count as usize;
        let mut forward = vec![0u32; k + 1];
        let mut backward = vec![0u32; k + 1];
        for (&a, &b) in self.labels.iter().zip(&other.labels) {
            let (ai, bi) = (a as usize, b as usize);
            if forward[ai] == 0 && backward[bi] == 0 {
                forward[ai] = b;
                backward[bi] = a;
            } else if forward[ai] != b || backward[bi] != a {
                return false;
            }
        }
        true
    }

    /// Consumes the result, returning the raw label table.
    #[must_use]
    pub fn into_labels(self) -> Vec<u32> {
        self.labels
    }
}

/// Cluster assignment for a flattened batch of modules.
///
/// `labels` mirrors the batch's cell buffer; `cluster_counts` has one slot per
/// module descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBatchLabels"))]
pub struct BatchLabels {
    labels: Vec<u32>,
    cluster_counts: Vec<u32>,
    descriptors: Vec<ModuleDescriptor>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawBatchLabels {
    labels: Vec<u32>,
    cluster_counts: Vec<u32>,
    descriptors: Vec<ModuleDescriptor>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBatchLabels> for BatchLabels {
    type Error = Error;

    fn try_from(raw: RawBatchLabels) -> Result<Self> {
        Self::new(raw.labels, raw.cluster_counts, raw.descriptors)
    }
}

impl BatchLabels {
    /// Assembles a batch result from its flattened parts.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabels`] if the counts and descriptors differ
    /// in length, a descriptor reaches past the label buffer, or a module's
    /// labels are not contiguous ids `1..=count`.
    pub fn new(
        labels: Vec<u32>,
        cluster_counts: Vec<u32>,
        descriptors: Vec<ModuleDescriptor>,
    ) -> Result<Self> {
        if cluster_counts.len() != descriptors.len() {
            return Err(Error::InvalidLabels(format!(
                "{} cluster counts for {} modules",
                cluster_counts.len(),
                descriptors.len()
            )));
        }
        for (module, (descriptor, &count)) in descriptors.iter().zip(&cluster_counts).enumerate()
        {
            let slice = descriptor
                .offset
                .checked_add(descriptor.count)
                .and_then(|end| labels.get(descriptor.offset..end))
                .ok_or_else(|| {
                    Error::InvalidLabels(format!(
                        "module {module} reaches past {} labels",
                        labels.len()
                    ))
                })?;
            check_table(slice, count)
                .map_err(|e| Error::InvalidLabels(format!("module {module}: {e}")))?;
        }
        Ok(Self {
            labels,
            cluster_counts,
            descriptors,
        })
    }

    /// Flattened per-cell cluster ids (module-local numbering).
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Cluster count of every module.
    #[must_use]
    pub fn cluster_counts(&self) -> &[u32] {
        &self.cluster_counts
    }

    /// Descriptors the labels are laid out by.
    #[must_use]
    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    /// Number of modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Sum of cluster counts over all modules.
    #[must_use]
    pub fn total_clusters(&self) -> u64 {
        self.cluster_counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Labels of one module.
    #[must_use]
    pub fn module_labels(&self, index: usize) -> Option<&[u32]> {
        self.descriptors
            .get(index)
            .map(|descriptor| &self.labels[descriptor.range()])
    }

    /// Copies out the result of one module.
    #[must_use]
    pub fn module(&self, index: usize) -> Option<ModuleLabels> {
        let labels = self.module_labels(index)?;
        Some(ModuleLabels {
            labels: labels.to_vec(),
            cluster_count: self.cluster_counts[index],
        })
    }

    /// De-flattens into one result per module, in module order.
    #[must_use]
    pub fn into_modules(self) -> Vec<ModuleLabels> {
        self.descriptors
            .iter()
            .zip(&self.cluster_counts)
            .map(|(descriptor, &count)| ModuleLabels {
                labels: self.labels[descriptor.range()].to_vec(),
                cluster_count: count,
            })
            .collect()
    }
}
