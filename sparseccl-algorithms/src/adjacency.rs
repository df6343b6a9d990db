//! Geometric predicates on pairs of cells.

use sparseccl_core::PixelCell;

/// Checks if two cells touch under 8-connectivity.
#[inline]
pub fn is_adjacent<C: PixelCell>(a: &C, b: &C) -> bool {
    a.pos().is_adjacent(&b.pos())
}

/// Checks if `candidate` is out of reach of `current` and every later cell.
///
/// With cells in column-major order, a candidate more than one column behind
/// the current cell can never be adjacent to anything still to be scanned.
#[inline]
pub fn is_far_enough<C: PixelCell>(current: &C, candidate: &C) -> bool {
    current.channel0().saturating_sub(candidate.channel0()) > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparseccl_core::Cell;

    #[test]
    fn test_adjacent_diagonal() {
        assert!(is_adjacent(&Cell::at(0, 0), &Cell::at(1, 1)));
        assert!(is_adjacent(&Cell::at(1, 1), &Cell::at(0, 0)));
        assert!(!is_adjacent(&Cell::at(0, 0), &Cell::at(5, 5)));
        assert!(!is_adjacent(&Cell::at(2, 2), &Cell::at(2, 2)));
    }

    #[test]
    fn test_far_enough() {
        let current = Cell::at(5, 0);
        assert!(is_far_enough(&current, &Cell::at(3, 100)));
        assert!(!is_far_enough(&current, &Cell::at(4, 100)));
        assert!(!is_far_enough(&current, &Cell::at(5, 0)));
        // A candidate ahead of the scan position is never stale.
        assert!(!is_far_enough(&Cell::at(0, 0), &Cell::at(9, 0)));
    }
}
