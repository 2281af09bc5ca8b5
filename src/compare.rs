// src/compare.rs
//
// Position-wise comparison of dot-bracket structures and of sequences.
// Both functions require equal lengths; length-changing variants (deletions,
// tail truncation) use the clamped variant, which makes the undercount
// policy explicit instead of relying on implicit iteration bounds.

use crate::error::{Result, ScreenError};

/// Fraction of positions where the two structures agree, in [0,1].
/// Fails with `LengthMismatch` when the structures differ in length.
pub fn match_ratio(reference: &str, predicted: &str) -> Result<f64> {
    if reference.len() != predicted.len() {
        return Err(ScreenError::LengthMismatch {
            expected: reference.len(),
            actual: predicted.len(),
        });
    }
    if reference.is_empty() {
        return Ok(1.0);
    }
    let matches = reference
        .bytes()
        .zip(predicted.bytes())
        .filter(|(a, b)| a == b)
        .count();
    Ok(matches as f64 / reference.len() as f64)
}

/// Match ratio for structures of different lengths: positions are compared
/// over the common prefix and the count is divided by the reference length,
/// so a shorter prediction can never score above its coverage.
pub fn match_ratio_clamped(reference: &str, predicted: &str) -> f64 {
    if reference.is_empty() {
        return if predicted.is_empty() { 1.0 } else { 0.0 };
    }
    let matches = reference
        .bytes()
        .zip(predicted.bytes())
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / reference.len() as f64
}

/// Count of positions where two equal-length sequences differ.
pub fn mutation_count(a: &str, b: &str) -> Result<usize> {
    if a.len() != b.len() {
        return Err(ScreenError::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_structures_match_fully() {
        assert_eq!(match_ratio("....", "....").unwrap(), 1.0);
        assert_eq!(match_ratio("((..))", "((..))").unwrap(), 1.0);
    }

    #[test]
    fn partial_match_counts_equal_positions() {
        // positions 1 and 2 agree, 0 and 3 do not
        assert_eq!(match_ratio("....", "(..)").unwrap(), 0.5);
    }

    #[test]
    fn match_ratio_is_symmetric() {
        let pairs = [("....", "(..)"), ("((()))", "((..))"), (".", "(")];
        for (a, b) in pairs {
            assert_eq!(match_ratio(a, b).unwrap(), match_ratio(b, a).unwrap());
        }
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(matches!(
            match_ratio("...", "...."),
            Err(ScreenError::LengthMismatch {
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn clamped_ratio_divides_by_reference_length() {
        // two matching positions over a four-base reference
        assert_eq!(match_ratio_clamped("....", ".."), 0.5);
        // extra predicted positions beyond the reference are ignored
        assert_eq!(match_ratio_clamped("..", "...."), 1.0);
        assert_eq!(match_ratio_clamped("", ""), 1.0);
    }

    #[test]
    fn mutation_count_properties() {
        assert_eq!(mutation_count("ATGC", "ATGC").unwrap(), 0);
        assert_eq!(mutation_count("ATGC", "ATTC").unwrap(), 1);
        assert_eq!(
            mutation_count("ATGC", "TTGA").unwrap(),
            mutation_count("TTGA", "ATGC").unwrap()
        );
        assert!(mutation_count("AT", "ATG").is_err());
    }
}
