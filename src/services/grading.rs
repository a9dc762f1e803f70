use std::collections::HashMap;

use crate::db::models::QuizQuestion;

pub(crate) const PASS_PERCENTAGE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradeOutcome {
    pub(crate) score: i32,
    pub(crate) total: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: &'static str,
}

/// A ≥ 90, B ≥ 80, C ≥ 70, D ≥ 60, otherwise F.
pub(crate) fn letter_grade(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A"
    } else if percentage >= 80.0 {
        "B"
    } else if percentage >= 70.0 {
        "C"
    } else if percentage >= PASS_PERCENTAGE {
        "D"
    } else {
        "F"
    }
}

pub(crate) fn status_label(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "Excellent"
    } else if percentage >= 80.0 {
        "Very Good"
    } else if percentage >= 70.0 {
        "Good"
    } else if percentage >= PASS_PERCENTAGE {
        "Satisfactory"
    } else {
        "Needs Support"
    }
}

/// Rounded to two decimals; zero when there is nothing to score against.
pub(crate) fn percentage(score: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    (score / max_score * 10_000.0).round() / 100.0
}

fn normalize_option(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Answers are keyed by question id; missing or unknown answers count as wrong.
pub(crate) fn grade_answers(
    questions: &[QuizQuestion],
    answers: &HashMap<String, String>,
) -> GradeOutcome {
    let total = questions.len() as i32;
    let score = questions
        .iter()
        .filter(|question| {
            answers.get(&question.question_id.to_string()).is_some_and(|answer| {
                normalize_option(answer) == normalize_option(&question.correct_option)
            })
        })
        .count() as i32;

    let percentage = percentage(f64::from(score), f64::from(total));
    GradeOutcome { score, total, percentage, grade: letter_grade(percentage) }
}

/// Keeps only answers to questions of this quiz, normalized to upper-case letters.
pub(crate) fn sanitize_answers(
    questions: &[QuizQuestion],
    answers: &HashMap<String, String>,
) -> HashMap<String, String> {
    questions
        .iter()
        .filter_map(|question| {
            let key = question.question_id.to_string();
            answers.get(&key).map(|answer| (key, normalize_option(answer)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(question_id: i64, correct: &str) -> QuizQuestion {
        QuizQuestion {
            question_id,
            quiz_id: 1,
            position: question_id as i32,
            question_text: format!("Question {question_id}"),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: Some("c".to_string()),
            option_d: None,
            correct_option: correct.to_string(),
        }
    }

    fn answers(pairs: &[(i64, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(id, value)| (id.to_string(), value.to_string())).collect()
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(letter_grade(100.0), "A");
        assert_eq!(letter_grade(90.0), "A");
        assert_eq!(letter_grade(89.99), "B");
        assert_eq!(letter_grade(80.0), "B");
        assert_eq!(letter_grade(70.0), "C");
        assert_eq!(letter_grade(60.0), "D");
        assert_eq!(letter_grade(59.9), "F");
        assert_eq!(letter_grade(0.0), "F");
    }

    #[test]
    fn grades_matching_letters_case_insensitively() {
        let questions = vec![question(1, "A"), question(2, "C"), question(3, "B")];
        let outcome = grade_answers(&questions, &answers(&[(1, "a"), (2, " C "), (3, "D")]));

        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.percentage, 66.67);
        assert_eq!(outcome.grade, "D");
    }

    #[test]
    fn unanswered_and_foreign_keys_score_nothing() {
        let questions = vec![question(1, "A"), question(2, "B")];
        let outcome = grade_answers(&questions, &answers(&[(99, "A")]));

        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.grade, "F");
        assert!(sanitize_answers(&questions, &answers(&[(99, "A")])).is_empty());
    }

    #[test]
    fn empty_quiz_scores_zero_percent() {
        let outcome = grade_answers(&[], &HashMap::new());
        assert_eq!(outcome, GradeOutcome { score: 0, total: 0, percentage: 0.0, grade: "F" });
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1.0, 3.0), 33.33);
        assert_eq!(percentage(45.0, 50.0), 90.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(status_label(72.0), "Good");
        assert_eq!(status_label(12.0), "Needs Support");
    }
}
