//! Quiz grading.

use chrono::Utc;

use crate::entities::{QuizQuestion, QuizResult};

/// Marks an unanswered question.
pub const UNANSWERED: i32 = -1;

/// Grade `answers` against `questions`.
///
/// Answers are matched by position; missing answers count as unanswered and
/// surplus answers are dropped.  `perfect` requires at least one question.
pub fn grade(level_id: &str, questions: &[QuizQuestion], answers: &[i32]) -> (QuizResult, bool) {
    let answers: Vec<i32> = (0..questions.len())
        .map(|i| answers.get(i).copied().unwrap_or(UNANSWERED))
        .collect();
    let score = questions
        .iter()
        .zip(&answers)
        .filter(|(q, a)| **a != UNANSWERED && **a == q.correct_index)
        .count() as u32;
    let total = questions.len() as u32;

    let result = QuizResult {
        level_id: level_id.to_owned(),
        score,
        total,
        answers,
        submitted_at: Utc::now().to_rfc3339(),
    };
    (result, total > 0 && score == total)
}

#[cfg(test)]
mod test {
    use super::*;

    fn questions(correct: &[i32]) -> Vec<QuizQuestion> {
        correct
            .iter()
            .enumerate()
            .map(|(i, c)| QuizQuestion {
                id: format!("level-1-q{i}"),
                question: format!("Q{i}"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: *c,
                explanation: String::new(),
            })
            .collect()
    }

    #[test]
    fn all_correct_is_perfect() {
        let (result, perfect) = grade("level-1", &questions(&[0, 3, 1, 2, 0]), &[0, 3, 1, 2, 0]);
        assert_eq!(result.score, result.total);
        assert_eq!(result.total, 5);
        assert!(perfect);
    }

    #[test]
    fn unanswered_and_missing_answers() {
        let (result, perfect) = grade("level-1", &questions(&[0, 1, 2]), &[0, UNANSWERED]);
        assert_eq!(result.score, 1);
        assert_eq!(result.answers, vec![0, UNANSWERED, UNANSWERED]);
        assert!(!perfect);
    }

    #[test]
    fn malformed_question_with_negative_index_never_matches_unanswered() {
        let (result, _) = grade("level-1", &questions(&[UNANSWERED]), &[UNANSWERED]);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn surplus_answers_are_dropped() {
        let (result, perfect) = grade("level-1", &questions(&[2]), &[2, 1, 0]);
        assert_eq!(result.answers, vec![2]);
        assert!(perfect);
    }

    #[test]
    fn empty_quiz_is_not_perfect() {
        let (result, perfect) = grade("level-1", &[], &[]);
        assert_eq!((result.score, result.total), (0, 0));
        assert!(!perfect);
    }
}
