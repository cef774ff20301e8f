//! Guide walkthrough tests
//!
//! Tests cover:
//! - Quiz grading by exact answer set
//! - Walking the built-in course end to end, including a wrong answer
//! - `previous` at the start and across a section boundary

use std::collections::BTreeSet;

use iris_client::guide::{Course, GuideProgress};

const BUILTIN_ANSWERS: [usize; 12] = [1, 2, 3, 2, 3, 1, 2, 3, 2, 2, 2, 2];

#[test]
fn test_quiz_requires_exact_answer_set() {
    let course = Course::builtin().unwrap();
    let quiz = course.sections[0].units[0].quiz.clone().unwrap();

    assert!(quiz.grade(&BTreeSet::from([1])));
    assert!(!quiz.grade(&BTreeSet::from([1, 2])));
    assert!(!quiz.grade(&BTreeSet::new()));
    assert!(!quiz.grade(&BTreeSet::from([3])));
}

#[test]
fn test_walk_the_builtin_course() {
    let mut progress = GuideProgress::new(Course::builtin().unwrap());
    assert_eq!(progress.position(), (0, 0));

    // Wrong answer first: unit stays incomplete
    progress.start_quiz();
    progress.toggle_option(4);
    assert_eq!(progress.submit_quiz(), Some(false));
    assert!(!progress.is_unit_completed(0, 0));
    progress.toggle_option(4);

    for (step, answer) in BUILTIN_ANSWERS.iter().enumerate() {
        if step > 0 {
            progress.start_quiz();
        }
        assert!(progress.is_quiz_shown());
        assert!(progress.toggle_option(*answer));
        assert_eq!(progress.submit_quiz(), Some(true), "unit {}", step);
        assert_eq!(progress.last_grade(), Some(true));

        if step + 1 < BUILTIN_ANSWERS.len() {
            assert!(progress.continue_next());
            assert!(!progress.is_quiz_shown());
            assert!(progress.selected().is_empty());
        }
    }

    assert!(progress.is_last_unit());
    assert!(!progress.continue_next());
    assert_eq!(progress.position(), (5, 1));
    assert_eq!(progress.completion_percent(), 100);

    // Back across a section boundary lands on its last unit
    for _ in 0..2 {
        assert!(progress.previous());
    }
    assert_eq!(progress.position(), (4, 1));
}

#[test]
fn test_previous_stops_at_start() {
    let mut progress = GuideProgress::new(Course::builtin().unwrap());
    assert!(!progress.previous());
    assert!(progress.continue_next());
    assert_eq!(progress.position(), (0, 1));
    // Leaving a quiz unit unanswered does not complete it
    assert!(!progress.is_unit_completed(0, 0));
    assert_eq!(progress.completion_percent(), 0);
}
