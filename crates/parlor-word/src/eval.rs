//! Guess evaluation.

use parlor_protocol::Verdict;

/// Scores `guess` against `target`, one verdict per guess letter.
///
/// Two passes, so duplicate letters behave correctly: exact matches
/// claim their target letters first, then the remaining guess letters
/// are checked left to right against the unclaimed pool. Each target
/// letter backs at most one non-wrong verdict.
///
/// Both strings are expected to be uppercase and the same char length;
/// the round layer enforces that before calling in.
pub fn evaluate(guess: &str, target: &str) -> Vec<Verdict> {
    let guess: Vec<char> = guess.chars().collect();
    let target: Vec<char> = target.chars().collect();
    debug_assert_eq!(guess.len(), target.len());

    let mut verdicts = vec![Verdict::Wrong; guess.len()];
    let mut claimed = vec![false; target.len()];

    for (i, &g) in guess.iter().enumerate() {
        if target.get(i) == Some(&g) {
            verdicts[i] = Verdict::Correct;
            claimed[i] = true;
        }
    }

    for (i, &g) in guess.iter().enumerate() {
        if verdicts[i] == Verdict::Correct {
            continue;
        }
        if let Some(j) = target
            .iter()
            .enumerate()
            .position(|(j, &t)| !claimed[j] && t == g)
        {
            verdicts[i] = Verdict::Misplaced;
            claimed[j] = true;
        }
    }

    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use Verdict::{Correct, Misplaced, Wrong};

    #[test]
    fn test_evaluate_all_correct() {
        assert_eq!(
            evaluate("CRANE", "CRANE"),
            vec![Correct, Correct, Correct, Correct, Correct]
        );
    }

    #[test]
    fn test_evaluate_all_wrong() {
        assert_eq!(
            evaluate("MMMMM", "CRANE"),
            vec![Wrong, Wrong, Wrong, Wrong, Wrong]
        );
    }

    #[test]
    fn test_evaluate_duplicates_exact_match_claims_first() {
        // Second B of ABBEY lands exactly; the first must settle for
        // misplaced against BABEL's remaining B.
        assert_eq!(
            evaluate("ABBEY", "BABEL"),
            vec![Misplaced, Misplaced, Correct, Correct, Wrong]
        );
    }

    #[test]
    fn test_evaluate_guess_has_more_copies_than_target() {
        // One E in the target, three in the guess: the exact match at
        // the end claims it, so the leading Es are plain wrong.
        assert_eq!(
            evaluate("EERIE", "CRANE"),
            vec![Wrong, Wrong, Misplaced, Wrong, Correct]
        );
    }

    #[test]
    fn test_evaluate_misplaced_consumes_target_letter() {
        assert_eq!(
            evaluate("LLAMA", "SALAD"),
            vec![Misplaced, Wrong, Misplaced, Wrong, Misplaced]
        );
    }
}
