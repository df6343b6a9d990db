#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sparseccl_algorithms::synth::{generate_area, generate_full_random};
use sparseccl_algorithms::sweep::default_probabilities;
use sparseccl_algorithms::{
    CclConfig, Cell, ModuleExtent, ModuleLabels, OrderCheck, ReferenceValidator, SparseCcl,
    ValidationSession,
};
use sparseccl_core::sort_column_major;

const TRIALS: usize = 100;

fn checked() -> SparseCcl {
    SparseCcl::new(CclConfig::new().with_order_check(OrderCheck::Always))
}

fn cells(positions: &[(u32, u32)]) -> Vec<Cell> {
    positions.iter().map(|&(c0, c1)| Cell::at(c0, c1)).collect()
}

/// Ids first appear in ascending order when walking the cells.
fn ids_ascend_by_first_member(labels: &ModuleLabels) -> bool {
    let mut highest = 0;
    for &label in labels.labels() {
        if label > highest + 1 {
            return false;
        }
        highest = highest.max(label);
    }
    highest == labels.cluster_count()
}

#[test]
fn test_random_density_sweep_matches_flood_fill() {
    let extent = ModuleExtent::new(48, 40);
    let validator = ReferenceValidator::with_extent(extent).unwrap();
    let ccl = checked();
    let mut session = ValidationSession::new();
    let mut rng = StdRng::seed_from_u64(42);

    for probability in default_probabilities() {
        for trial in 0..TRIALS {
            let module = generate_full_random(extent, probability, &mut rng).unwrap();
            let labels = ccl.label_module(&module).unwrap();
            let outcome = validator
                .validate(&module, labels.cluster_count(), &mut session)
                .unwrap();
            assert!(
                outcome.is_match(),
                "p={} trial {}: {:?}",
                probability,
                trial,
                outcome
            );
        }
    }
    assert_eq!(session.checked(), TRIALS * default_probabilities().len());
    assert_eq!(session.mismatches(), 0);
}

#[test]
fn test_clustered_density_sweep_matches_flood_fill() {
    let extent = ModuleExtent::new(64, 64);
    let validator = ReferenceValidator::with_extent(extent).unwrap();
    let ccl = checked();
    let mut rng = StdRng::seed_from_u64(7);

    for cluster_probability in [1e-4, 1e-3, 1e-2, 5e-2] {
        for cell_probability in [0.3, 0.7, 1.0] {
            for _ in 0..TRIALS {
                let module =
                    generate_area(extent, cluster_probability, cell_probability, 4, 6, &mut rng)
                        .unwrap();
                let labels = ccl.label_module(&module).unwrap();
                let reference = validator.reference_labels(&module).unwrap();
                assert_eq!(labels.cluster_count(), reference.cluster_count());
                assert!(labels.same_partition(&reference));
            }
        }
    }
}

#[test]
fn test_labels_equal_flood_fill_labels_exactly() {
    let extent = ModuleExtent::new(32, 32);
    let validator = ReferenceValidator::with_extent(extent).unwrap();
    let ccl = checked();
    let mut rng = StdRng::seed_from_u64(2024);

    for probability in [0.05, 0.2, 0.4, 0.6] {
        for _ in 0..TRIALS {
            let module = generate_full_random(extent, probability, &mut rng).unwrap();
            let labels = ccl.label_module(&module).unwrap();
            // Both number components by their first cell in column-major order.
            assert_eq!(labels, validator.reference_labels(&module).unwrap());
            assert!(ids_ascend_by_first_member(&labels));
        }
    }
}

#[test]
fn test_sort_restores_shuffled_module() {
    let extent = ModuleExtent::new(40, 40);
    let mut rng = StdRng::seed_from_u64(98);

    for _ in 0..20 {
        let module = generate_full_random(extent, 0.3, &mut rng).unwrap();
        let mut shuffled = module.clone();
        shuffled.shuffle(&mut rng);
        sort_column_major(&mut shuffled);
        assert_eq!(shuffled, module);
    }
}

#[test]
fn test_labeling_depends_only_on_relative_positions() {
    let extent = ModuleExtent::new(40, 40);
    let ccl = checked();
    let mut rng = StdRng::seed_from_u64(99);

    for trial in 0..20u32 {
        let module = generate_full_random(extent, 0.3, &mut rng).unwrap();
        let first = ccl.label_module(&module).unwrap();
        assert_eq!(first, ccl.label_module(&module).unwrap());

        // Shift the whole module and give every cell a new payload.
        let (dx, dy) = (1000 + 7 * trial, 3 + trial);
        let moved: Vec<Cell> = module
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                Cell::new(
                    cell.channel0 + dx,
                    cell.channel1 + dy,
                    i as f32 * 0.5,
                    -(i as f32),
                )
            })
            .collect();
        let second = ccl.label_module(&moved).unwrap();
        assert!(first.same_partition(&second));
        assert_eq!(first, second);
    }
}

#[test]
fn test_boundary_cases() {
    let ccl = checked();

    let empty = ccl.label_module::<Cell>(&[]).unwrap();
    assert_eq!(empty.cluster_count(), 0);

    let single = ccl.label_module(&cells(&[(0, 0)])).unwrap();
    assert_eq!(single.cluster_count(), 1);
    assert_eq!(single.labels(), &[1]);

    let touching = ccl.label_module(&cells(&[(0, 0), (1, 1)])).unwrap();
    assert_eq!(touching.cluster_count(), 1);

    let apart = ccl.label_module(&cells(&[(0, 0), (5, 5)])).unwrap();
    assert_eq!(apart.cluster_count(), 2);
}

#[test]
fn test_mixed_module_scenario() {
    let labels = checked()
        .label_module(&cells(&[(0, 0), (0, 1), (1, 0), (5, 5)]))
        .unwrap();
    assert_eq!(labels.cluster_count(), 2);
    assert_eq!(labels.labels(), &[1, 1, 1, 2]);
    assert_eq!(labels.cluster_sizes(), vec![3, 1]);
}

#[test]
fn test_long_module_scans_locally() {
    // Two rows across 100k columns: a quadratic scan would not finish.
    let columns = 100_000u32;
    let mut module = Vec::with_capacity(2 * columns as usize);
    for c0 in 0..columns {
        module.push(Cell::at(c0, 0));
        if c0 % 3 != 2 {
            module.push(Cell::at(c0, 2));
        }
    }
    let labels = checked().label_module(&module).unwrap();

    // Row 0 is one cluster; row 2 breaks every third column.
    let row2_runs = columns.div_ceil(3);
    assert_eq!(labels.cluster_count(), 1 + row2_runs);
}
