/// Best indel ratio `2 * lcs / (len_a + len_b)` of the shorter input against any equally long
/// window of the longer one, 0-100. An empty input scores 0.
pub fn partial_ratio(left: &str, right: &str) -> u8 {
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let (shorter, longer) = if left.chars().count() <= right.chars().count() {
        (left, right)
    } else {
        (right, left)
    };

    if longer.contains(shorter) {
        return 100;
    }

    let shorter = shorter.chars().collect::<Vec<_>>();
    let longer = longer.chars().collect::<Vec<_>>();

    let mut best = 0.0f64;
    let mut row = vec![0usize; shorter.len() + 1];
    for window in longer.windows(shorter.len()) {
        let score = indel_ratio(&shorter, window, &mut row);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }

    to_percent(best)
}

fn to_percent(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

fn indel_ratio(left: &[char], right: &[char], row: &mut Vec<usize>) -> f64 {
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(left, right, row) as f64 / total as f64
}

fn lcs_len(left: &[char], right: &[char], row: &mut Vec<usize>) -> usize {
    row.clear();
    row.resize(left.len() + 1, 0);

    for &r in right {
        let mut diagonal = 0;
        for (index, &l) in left.iter().enumerate() {
            let above = row[index + 1];
            row[index + 1] = if l == r {
                diagonal + 1
            } else {
                above.max(row[index])
            };
            diagonal = above;
        }
    }

    row[left.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_scores_full_marks() {
        assert_eq!(partial_ratio("router", "how to reset the router quickly"), 100);
        assert_eq!(partial_ratio("how to reset the router quickly", "router"), 100);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("anything", ""), 0);
    }

    #[test]
    fn typos_score_high_but_not_perfect() {
        let score = partial_ratio("refnud", "our refund policy");
        assert!((65..100).contains(&score), "score was {score}");
    }

    #[test]
    fn unrelated_words_score_low() {
        assert!(partial_ratio("warranty", "zzzz qqqq jjjj") < 30);
    }

    #[test]
    fn equal_length_inputs_use_lcs_ratio() {
        // 13 of 20 characters in common
        assert_eq!(partial_ratio("abcdefghijklmnopqrst", "abcdefghijklmzzzzzzz"), 65);
        // 16 of 25 characters in common
        assert_eq!(partial_ratio("abcdefghijklmnopqrstuvwxy", "abcdefghijklmnopzzzzzzzzz"), 64);
    }
}
