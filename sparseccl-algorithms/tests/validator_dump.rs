use sparseccl_algorithms::{
    Cell, ModuleExtent, ReferenceValidator, ValidationOutcome, ValidationSession,
    ValidatorConfig,
};
use std::fs;
use tempfile::tempdir;

fn cells(positions: &[(u32, u32)]) -> Vec<Cell> {
    positions.iter().map(|&(c0, c1)| Cell::at(c0, c1)).collect()
}

#[test]
fn test_mismatch_dump_written_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mismatches.txt");
    let config = ValidatorConfig::new()
        .with_extent(ModuleExtent::new(16, 16))
        .with_dump_cells(true);
    let validator = ReferenceValidator::new(config).unwrap();
    let module = cells(&[(2, 3), (2, 4), (9, 9)]);

    let mut session = ValidationSession::create(&path).unwrap();
    let good = validator.validate(&module, 2, &mut session).unwrap();
    let bad = validator.validate(&module, 3, &mut session).unwrap();
    assert!(good.is_match());
    assert_eq!(
        bad,
        ValidationOutcome::CountMismatch {
            claimed: 3,
            found: 2
        }
    );
    assert_eq!(session.checked(), 2);
    assert_eq!(session.mismatches(), 1);
    session.finish().unwrap();

    let dump = fs::read_to_string(&path).unwrap();
    assert_eq!(dump.matches("BEGIN").count(), 1);
    assert!(dump.contains("ERROR labeling found 3 clusters, flood fill found 2. Cell count = 3"));
    assert!(dump.contains("(2, 3) (2, 4) (9, 9)"));
    assert!(dump.contains("END"));
}

#[test]
fn test_matching_run_leaves_empty_dump() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clean.txt");
    let validator = ReferenceValidator::with_extent(ModuleExtent::new(8, 8)).unwrap();

    let mut session = ValidationSession::create(&path).unwrap();
    for claimed in [0, 1] {
        let module = if claimed == 0 {
            Vec::new()
        } else {
            cells(&[(0, 0), (1, 1)])
        };
        let outcome = validator.validate(&module, claimed, &mut session).unwrap();
        assert!(outcome.is_match());
    }
    session.finish().unwrap();

    assert!(fs::read_to_string(&path).unwrap().is_empty());
}

#[test]
fn test_session_without_sink_still_counts() {
    let validator = ReferenceValidator::with_extent(ModuleExtent::new(8, 8)).unwrap();
    let mut session = ValidationSession::new();

    let outcome = validator.validate::<Cell>(&[], 4, &mut session).unwrap();
    assert_eq!(outcome, ValidationOutcome::TrivialInputError { claimed: 4 });
    assert!(!session.has_sink());
    assert_eq!(session.mismatches(), 1);
}
