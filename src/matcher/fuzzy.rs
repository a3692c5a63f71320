//! String similarity for the fuzzy signal.
//!
//! `similarity(a, b) = normalized_levenshtein(token_sort(a), token_sort(b))`, i.e.
//! `1 - lev / max(len_a, len_b)` over Unicode scalar values after sorting whitespace
//! tokens. Word order therefore never matters ("learning machine" == "machine learning").

/// Sort whitespace-separated tokens and rejoin them with single spaces
pub fn token_sort(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity in [0, 1] between two phrases
pub fn similarity(a: &str, b: &str) -> f32 {
    sorted_similarity(&token_sort(a), &token_sort(b))
}

/// Similarity of two strings that are already token-sorted
pub(crate) fn sorted_similarity(a: &str, b: &str) -> f32 {
    strsim::normalized_levenshtein(a, b) as f32
}

/// Highest similarity two strings of these lengths could reach.
///
/// The edit distance is at least the length difference, so this never rejects a
/// pair that would pass the threshold.
pub(crate) fn similarity_upper_bound(len_a: usize, len_b: usize) -> f32 {
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    len_a.min(len_b) as f32 / longest as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sort() {
        assert_eq!(token_sort("machine  learning"), "learning machine");
        assert_eq!(token_sort("sql"), "sql");
    }

    #[test]
    fn test_pytorch_vs_torch() {
        // lev("pytorch", "torch") = 2, max len = 7
        let score = similarity("pytorch", "torch");
        assert!((score - 5.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_word_order_ignored() {
        assert_eq!(similarity("learning machine", "machine learning"), 1.0);
    }

    #[test]
    fn test_upper_bound_holds() {
        for (a, b) in [("pytorch", "torch"), ("kubernetes", "kubernete"), ("go", "golang")] {
            let bound = similarity_upper_bound(a.chars().count(), b.chars().count());
            assert!(similarity(a, b) <= bound + 1e-6);
        }
    }
}
