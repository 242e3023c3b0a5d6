//! Standardized scoring for quiz levels.
//!
//! Raw correct-answer counts are mapped linearly onto a fixed per-level
//! point budget, so a level served with an unusual question count still
//! produces a score on the same scale as every other level.

use std::collections::BTreeMap;

use crate::model::LevelRecord;

/// Fixed shape of the quiz: how many levels exist and how many points each
/// level is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizRules {
    number_of_levels: u32,
    points_per_level: u32,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            number_of_levels: 5,
            points_per_level: 10,
        }
    }
}

impl QuizRules {
    /// Creates rules with the given level count and per-level budget.
    #[must_use]
    pub fn new(number_of_levels: u32, points_per_level: u32) -> Self {
        Self {
            number_of_levels,
            points_per_level,
        }
    }

    #[must_use]
    pub fn number_of_levels(&self) -> u32 {
        self.number_of_levels
    }

    #[must_use]
    pub fn points_per_level(&self) -> u32 {
        self.points_per_level
    }

    /// Upper bound for any profile's total score.
    #[must_use]
    pub fn max_total_score(&self) -> u32 {
        self.number_of_levels * self.points_per_level
    }

    /// Whether `level` is a playable level number under these rules.
    #[must_use]
    pub fn level_in_range(&self, level: u32) -> bool {
        (1..=self.number_of_levels).contains(&level)
    }

    /// Whether completing `level` finishes the whole quiz.
    #[must_use]
    pub fn is_final_level(&self, level: u32) -> bool {
        level == self.number_of_levels
    }
}

/// Maps a raw correct-answer count onto the per-level point budget.
///
/// Total over all inputs: out-of-range counts are clamped into
/// `[0, total_questions]` rather than rejected, absorbing upstream
/// inconsistencies such as a level served with fewer questions than
/// expected. A level with zero questions scores zero.
#[must_use]
pub fn standardize(raw_correct: u32, total_questions: u32, rules: &QuizRules) -> u32 {
    if total_questions == 0 {
        return 0;
    }
    let correct = raw_correct.min(total_questions);
    // Round-to-nearest integer scaling.
    (correct * rules.points_per_level() + total_questions / 2) / total_questions
}

/// Recomputes a profile's total score from its per-level records.
///
/// Only records with `completed = true` contribute; in-progress levels are
/// ignored. The sum is clamped to [`QuizRules::max_total_score`].
#[must_use]
pub fn total_score(completed_levels: &BTreeMap<u32, LevelRecord>, rules: &QuizRules) -> u32 {
    let sum: u32 = completed_levels
        .values()
        .filter(|record| record.is_completed())
        .map(LevelRecord::score)
        .sum();
    sum.min(rules.max_total_score())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardize_is_linear_on_the_point_budget() {
        let rules = QuizRules::default();
        assert_eq!(standardize(0, 10, &rules), 0);
        assert_eq!(standardize(7, 10, &rules), 7);
        assert_eq!(standardize(10, 10, &rules), 10);
    }

    #[test]
    fn standardize_scales_odd_question_counts() {
        let rules = QuizRules::default();
        // 4 of 8 correct is half the budget.
        assert_eq!(standardize(4, 8, &rules), 5);
        // 2 of 3 rounds to nearest.
        assert_eq!(standardize(2, 3, &rules), 7);
    }

    #[test]
    fn standardize_clamps_out_of_range_counts() {
        let rules = QuizRules::default();
        assert_eq!(standardize(12, 10, &rules), 10);
        assert_eq!(standardize(3, 0, &rules), 0);
    }

    #[test]
    fn total_score_ignores_in_progress_levels() {
        let rules = QuizRules::default();
        let mut levels = BTreeMap::new();
        levels.insert(1, LevelRecord::completed(7));
        levels.insert(2, LevelRecord::in_progress(4, 6));

        assert_eq!(total_score(&levels, &rules), 7);
    }

    #[test]
    fn total_score_is_capped() {
        let rules = QuizRules::new(2, 10);
        let mut levels = BTreeMap::new();
        levels.insert(1, LevelRecord::completed(15));
        levels.insert(2, LevelRecord::completed(15));

        assert_eq!(total_score(&levels, &rules), rules.max_total_score());
    }
}
