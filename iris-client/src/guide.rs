//! Guide learning module
//!
//! A course is a list of sections, each a list of units; a unit may end
//! with a multiple-choice quiz. The built-in course ships as TOML inside
//! the crate, and another course can be loaded from a file with the same
//! layout.

use std::collections::BTreeSet;
use std::path::Path;

use iris_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const BUILTIN_COURSE: &str = include_str!("../assets/guide.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub topic: String,
    pub content: String,
    #[serde(default)]
    pub quiz: Option<Quiz>,
}

/// Options are numbered from 1 in the order listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub question: String,
    pub options: Vec<String>,
    /// Every option id that must be selected, and nothing else
    pub correct: Vec<usize>,
}

impl Quiz {
    pub fn option_ids(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.options.len()
    }

    /// Correct iff the selection is exactly the set of correct options
    pub fn grade(&self, selected: &BTreeSet<usize>) -> bool {
        let correct: BTreeSet<usize> = self.correct.iter().copied().collect();
        *selected == correct
    }
}

impl Course {
    /// The course embedded in the crate
    pub fn builtin() -> Result<Course> {
        Course::from_toml_str(BUILTIN_COURSE)
    }

    pub fn load(path: &Path) -> Result<Course> {
        let raw = std::fs::read_to_string(path)?;
        Course::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Course> {
        let course: Course = toml::from_str(raw)?;
        course.validate()?;
        Ok(course)
    }

    fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(Error::Config("Course has no sections".to_string()));
        }
        for section in &self.sections {
            if section.units.is_empty() {
                return Err(Error::Config(format!("Section '{}' has no units", section.title)));
            }
            for unit in &section.units {
                let Some(quiz) = &unit.quiz else { continue };
                if quiz.correct.is_empty() {
                    return Err(Error::Config(format!("Quiz for '{}' has no correct answer", unit.topic)));
                }
                if let Some(bad) = quiz.correct.iter().find(|id| !quiz.option_ids().contains(*id)) {
                    return Err(Error::Config(format!(
                        "Quiz for '{}' marks option {} correct but has {} options",
                        unit.topic,
                        bad,
                        quiz.options.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn unit_count(&self) -> usize {
        self.sections.iter().map(|s| s.units.len()).sum()
    }
}

/// Where the learner is and what they have finished
#[derive(Debug, Clone)]
pub struct GuideProgress {
    course: Course,
    section: usize,
    unit: usize,
    quiz_shown: bool,
    selected: BTreeSet<usize>,
    last_grade: Option<bool>,
    completed: BTreeSet<(usize, usize)>,
}

impl GuideProgress {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            section: 0,
            unit: 0,
            quiz_shown: false,
            selected: BTreeSet::new(),
            last_grade: None,
            completed: BTreeSet::new(),
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Zero-based (section, unit)
    pub fn position(&self) -> (usize, usize) {
        (self.section, self.unit)
    }

    pub fn current_section(&self) -> &Section {
        &self.course.sections[self.section]
    }

    pub fn current_unit(&self) -> &Unit {
        &self.current_section().units[self.unit]
    }

    pub fn is_quiz_shown(&self) -> bool {
        self.quiz_shown
    }

    /// Show the current unit's quiz; `false` when it has none
    pub fn start_quiz(&mut self) -> bool {
        if self.current_unit().quiz.is_none() {
            return false;
        }
        self.quiz_shown = true;
        true
    }

    /// Select or unselect an option; unknown ids are ignored
    pub fn toggle_option(&mut self, id: usize) -> bool {
        let valid = match (&self.current_unit().quiz, self.quiz_shown) {
            (Some(quiz), true) => quiz.option_ids().contains(&id),
            _ => false,
        };
        if !valid {
            return false;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.last_grade = None;
        true
    }

    pub fn is_selected(&self, id: usize) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    /// Grade the current selection; a correct answer completes the unit
    pub fn submit_quiz(&mut self) -> Option<bool> {
        if !self.quiz_shown {
            return None;
        }
        let correct = self.current_unit().quiz.as_ref()?.grade(&self.selected);
        if correct {
            self.completed.insert((self.section, self.unit));
        }
        debug!(section = self.section, unit = self.unit, correct, "Quiz graded");
        self.last_grade = Some(correct);
        Some(correct)
    }

    pub fn last_grade(&self) -> Option<bool> {
        self.last_grade
    }

    fn reset_unit_view(&mut self) {
        self.quiz_shown = false;
        self.selected.clear();
        self.last_grade = None;
    }

    /// Next unit, crossing into the next section; `false` at the very end.
    /// Leaving a unit without a quiz completes it.
    pub fn continue_next(&mut self) -> bool {
        if self.current_unit().quiz.is_none() {
            self.completed.insert((self.section, self.unit));
        }
        if self.unit + 1 < self.current_section().units.len() {
            self.unit += 1;
        } else if self.section + 1 < self.course.sections.len() {
            self.section += 1;
            self.unit = 0;
        } else {
            return false;
        }
        self.reset_unit_view();
        true
    }

    /// Previous unit, landing on the last unit of the previous section
    /// when crossing back; `false` at the very start
    pub fn previous(&mut self) -> bool {
        if self.unit > 0 {
            self.unit -= 1;
        } else if self.section > 0 {
            self.section -= 1;
            self.unit = self.current_section().units.len() - 1;
        } else {
            return false;
        }
        self.reset_unit_view();
        true
    }

    pub fn is_last_unit(&self) -> bool {
        self.section + 1 == self.course.sections.len() && self.unit + 1 == self.current_section().units.len()
    }

    pub fn is_unit_completed(&self, section: usize, unit: usize) -> bool {
        self.completed.contains(&(section, unit))
    }

    /// Completed units as a whole percentage of the course
    pub fn completion_percent(&self) -> u8 {
        let total = self.course.unit_count();
        if total == 0 {
            return 0;
        }
        ((self.completed.len() * 100) / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_course_parses() {
        let course = Course::builtin().unwrap();
        assert_eq!(course.sections.len(), 6);
        assert_eq!(course.unit_count(), 12);
        assert!(course
            .sections
            .iter()
            .flat_map(|s| &s.units)
            .all(|u| u.quiz.as_ref().is_some_and(|q| q.options.len() == 4)));
    }

    #[test]
    fn test_out_of_range_answer_is_rejected() {
        let raw = r#"
            title = "t"
            [[sections]]
            title = "s"
            [[sections.units]]
            topic = "u"
            content = "c"
            [sections.units.quiz]
            question = "q"
            options = ["a", "b"]
            correct = [3]
        "#;
        assert!(matches!(Course::from_toml_str(raw), Err(Error::Config(_))));
    }

    #[test]
    fn test_unit_without_quiz() {
        let raw = r#"
            title = "t"
            [[sections]]
            title = "s"
            [[sections.units]]
            topic = "intro"
            content = "c"
            [[sections.units]]
            topic = "more"
            content = "c"
        "#;
        let mut progress = GuideProgress::new(Course::from_toml_str(raw).unwrap());
        assert!(!progress.start_quiz());
        assert!(progress.continue_next());
        assert_eq!(progress.completion_percent(), 50);
        assert!(progress.is_last_unit());
        assert!(!progress.continue_next());
        assert_eq!(progress.completion_percent(), 100);
    }

    #[test]
    fn test_toggle_requires_visible_quiz() {
        let mut progress = GuideProgress::new(Course::builtin().unwrap());
        assert!(!progress.toggle_option(1));
        progress.start_quiz();
        assert!(progress.toggle_option(1));
        assert!(progress.is_selected(1));
        assert!(progress.toggle_option(1));
        assert!(!progress.is_selected(1));
        assert!(!progress.toggle_option(9));
    }
}
