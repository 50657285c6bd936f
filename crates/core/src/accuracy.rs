//! Edit-distance scoring of OCR output against a reference transcript.
//!
//! This is a similarity metric, not a probability: correct OCR of a
//! differently laid-out page can legitimately score low. It is a diagnostic
//! signal only and never gates the pipeline.

/// Similarity percentage in `[0, 100]` between a predicted string and a
/// reference, derived from their Levenshtein distance. Both strings empty
/// is defined as 0.
pub fn levenshtein_accuracy(predicted: &str, reference: &str) -> f64 {
    let predicted_len = predicted.chars().count();
    let reference_len = reference.chars().count();
    let max_len = predicted_len.max(reference_len);
    if max_len == 0 {
        return 0.0;
    }

    let distance = levenshtein(predicted, reference);
    (max_len - distance) as f64 / max_len as f64 * 100.0
}

/// Character-level Levenshtein distance, two-row dynamic programming.
pub fn levenshtein(left: &str, right: &str) -> usize {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0usize; right.len() + 1];

    for (row, left_char) in left.iter().enumerate() {
        current[0] = row + 1;
        for (column, right_char) in right.iter().enumerate() {
            let substitution = previous[column] + usize::from(left_char != right_char);
            let deletion = previous[column + 1] + 1;
            let insertion = current[column] + 1;
            current[column + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

#[cfg(test)]
mod tests {
    use super::{levenshtein, levenshtein_accuracy};

    #[test]
    fn identical_strings_score_one_hundred() {
        assert_eq!(levenshtein_accuracy("scanned page", "scanned page"), 100.0);
    }

    #[test]
    fn both_empty_is_defined_as_zero() {
        assert_eq!(levenshtein_accuracy("", ""), 0.0);
    }

    #[test]
    fn score_is_symmetric() {
        let forward = levenshtein_accuracy("kitten", "sitting");
        let backward = levenshtein_accuracy("sitting", "kitten");
        assert_eq!(forward, backward);
    }

    #[test]
    fn known_distance_maps_to_expected_percentage() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        let accuracy = levenshtein_accuracy("kitten", "sitting");
        let expected = (7.0 - 3.0) / 7.0 * 100.0;
        assert!((accuracy - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_against_nonempty_scores_zero() {
        assert_eq!(levenshtein_accuracy("", "anything"), 0.0);
    }

    #[test]
    fn distance_counts_unicode_chars_not_bytes() {
        assert_eq!(levenshtein("naïve", "naive"), 1);
    }
}
