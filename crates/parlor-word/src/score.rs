//! Round scoring tables.

/// Points by attempt count in attempts mode; seventh attempt onward
/// scores the same as the sixth.
const ATTEMPT_SCORES: [u32; 6] = [100, 80, 60, 40, 20, 10];

/// Bonus for the player who finished first (attempts mode).
pub const FIRST_FINISHER_BONUS: u32 = 25;

/// Points by finish rank in timed mode; sixth place onward scores the
/// same as fifth.
const TIMED_RANK_SCORES: [u32; 5] = [100, 75, 50, 25, 10];

/// Score for finishing on the given 1-based attempt.
pub fn attempt_score(attempts: u32) -> u32 {
    let idx = (attempts.max(1) as usize - 1).min(ATTEMPT_SCORES.len() - 1);
    ATTEMPT_SCORES[idx]
}

/// Score for the given 0-based finish rank in timed mode.
pub fn timed_rank_score(rank: usize) -> u32 {
    TIMED_RANK_SCORES[rank.min(TIMED_RANK_SCORES.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_score_table() {
        assert_eq!(attempt_score(1), 100);
        assert_eq!(attempt_score(2), 80);
        assert_eq!(attempt_score(6), 10);
        // Past the table, the floor holds.
        assert_eq!(attempt_score(7), 10);
        assert_eq!(attempt_score(40), 10);
    }

    #[test]
    fn test_timed_rank_score_table() {
        assert_eq!(timed_rank_score(0), 100);
        assert_eq!(timed_rank_score(1), 75);
        assert_eq!(timed_rank_score(4), 10);
        assert_eq!(timed_rank_score(5), 10);
    }
}
