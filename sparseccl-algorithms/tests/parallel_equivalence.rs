#![allow(clippy::uninlined_format_args)]
use rand::rngs::StdRng;
use rand::SeedableRng;
use sparseccl_algorithms::synth::generate_batch;
use sparseccl_algorithms::{
    CclConfig, Cell, Error, ModuleBatch, ModuleDescriptor, ModuleExtent, OrderCheck,
    ParallelCcl, ParallelConfig, Pattern, PixelCell, ScratchPolicy, SparseCcl,
};
use sparseccl_core::ChannelPos;

fn sequential_reference(batch: &ModuleBatch<Cell>) -> Vec<(Vec<u32>, u32)> {
    let ccl = SparseCcl::default();
    batch
        .modules()
        .map(|cells| {
            let labels = ccl.label_module(cells).unwrap();
            (labels.labels().to_vec(), labels.cluster_count())
        })
        .collect()
}

fn assert_matches_sequential(batch: &ModuleBatch<Cell>, ccl: &ParallelCcl) {
    let result = ccl.label_batch(batch).unwrap();
    assert_eq!(result.module_count(), batch.module_count());

    for (module, (labels, count)) in sequential_reference(batch).into_iter().enumerate() {
        assert_eq!(result.cluster_counts()[module], count, "module {}", module);
        assert_eq!(
            result.module_labels(module).unwrap(),
            labels.as_slice(),
            "module {}",
            module
        );
    }
}

#[test]
fn test_parallel_matches_sequential_random() {
    let mut rng = StdRng::seed_from_u64(5);
    let batch = generate_batch(
        200,
        ModuleExtent::new(40, 60),
        Pattern::FullRandom,
        0.6,
        &mut rng,
    )
    .unwrap();

    assert_matches_sequential(&batch, &ParallelCcl::default());
}

#[test]
fn test_parallel_matches_sequential_clustered_dedicated_pool() {
    let mut rng = StdRng::seed_from_u64(17);
    let pattern = Pattern::Clustered {
        cluster_width: 3,
        cluster_height: 5,
        cell_probability: 0.6,
    };
    let batch = generate_batch(150, ModuleExtent::new(64, 64), pattern, 0.02, &mut rng).unwrap();

    for threads in [1, 3, 8] {
        let ccl = ParallelCcl::new(ParallelConfig::new().with_num_threads(threads)).unwrap();
        assert_matches_sequential(&batch, &ccl);
    }
}

#[test]
fn test_bounded_scratch_large_enough() {
    let mut rng = StdRng::seed_from_u64(23);
    let batch = generate_batch(
        64,
        ModuleExtent::new(32, 32),
        Pattern::FullRandom,
        0.5,
        &mut rng,
    )
    .unwrap();
    let bound = batch.max_module_len().max(1);
    let ccl = ParallelCcl::new(ParallelConfig::new().with_scratch(ScratchPolicy::Bounded(bound)))
        .unwrap();

    assert_matches_sequential(&batch, &ccl);
}

#[test]
fn test_bounded_scratch_too_small_aborts_batch() {
    let mut rng = StdRng::seed_from_u64(29);
    let batch = generate_batch(
        16,
        ModuleExtent::new(32, 32),
        Pattern::FullRandom,
        0.5,
        &mut rng,
    )
    .unwrap();
    let bound = batch.max_module_len() - 1;
    let ccl = ParallelCcl::new(ParallelConfig::new().with_scratch(ScratchPolicy::Bounded(bound)))
        .unwrap();

    match ccl.label_batch(&batch) {
        Err(Error::CapacityExceeded {
            cell_count,
            capacity,
            ..
        }) => {
            assert_eq!(capacity, bound);
            assert!(cell_count > bound);
        }
        other => panic!("expected capacity error, got {:?}", other),
    }
}

#[test]
fn test_externally_flattened_layout() {
    // Modules stored back to front in the buffer.
    let cells = vec![
        Cell::at(9, 9),
        Cell::at(0, 0),
        Cell::at(0, 1),
        Cell::at(4, 4),
    ];
    let descriptors = vec![ModuleDescriptor::new(1, 3), ModuleDescriptor::new(0, 1)];
    let batch = ModuleBatch::from_parts(cells, descriptors).unwrap();

    let result = ParallelCcl::default().label_batch(&batch).unwrap();
    assert_eq!(result.cluster_counts(), &[2, 1]);
    assert_eq!(result.labels(), &[1, 1, 1, 2]);
    assert_eq!(result.module_labels(0).unwrap(), &[1, 1, 2]);

    let modules = result.into_modules();
    assert_eq!(modules[1].labels(), &[1]);
}

#[test]
fn test_unsorted_module_aborts_batch() {
    let batch = ModuleBatch::from_modules(vec![
        vec![Cell::at(0, 0), Cell::at(0, 1)],
        vec![Cell::at(2, 2)],
        vec![Cell::at(3, 0), Cell::at(1, 0)],
    ]);
    let config = ParallelConfig::new()
        .with_ccl(CclConfig::new().with_order_check(OrderCheck::Always));
    let ccl = ParallelCcl::new(config).unwrap();

    let err = ccl.label_batch(&batch).unwrap_err();
    assert_eq!(
        err,
        Error::InputOrderViolation {
            module: Some(2),
            index: 1,
            previous: ChannelPos::new(3, 0),
            current: ChannelPos::new(1, 0),
        }
    );
    assert!(err.to_string().contains("in module 2"));
}

/// Cell whose channel reads fail, standing in for a task fault.
#[derive(Debug, Clone, Copy)]
struct FaultyCell {
    pos: ChannelPos,
    corrupted: bool,
}

impl PixelCell for FaultyCell {
    fn channel0(&self) -> u32 {
        assert!(!self.corrupted, "corrupted cell record");
        self.pos.channel0
    }

    fn channel1(&self) -> u32 {
        assert!(!self.corrupted, "corrupted cell record");
        self.pos.channel1
    }
}

#[test]
fn test_task_fault_aborts_whole_batch() {
    let good = |c0, c1| FaultyCell {
        pos: ChannelPos::new(c0, c1),
        corrupted: false,
    };
    let mut bad = good(2, 2);
    bad.corrupted = true;

    let batch = ModuleBatch::from_modules(vec![
        vec![good(0, 0), good(0, 1)],
        vec![good(1, 1), bad],
        vec![good(5, 5)],
    ]);

    match ParallelCcl::default().label_batch(&batch) {
        Err(Error::DeviceExecutionFault {
            module,
            offset,
            count,
            message,
        }) => {
            assert_eq!(module, 1);
            assert_eq!(offset, 2);
            assert_eq!(count, 2);
            assert!(message.contains("corrupted cell record"));
        }
        other => panic!("expected execution fault, got {:?}", other.map(|r| r.labels().to_vec())),
    }
}
