//! Joins decoded lessons and notes into display-ready lessons (spec §4.F).
//!
//! `SkemaNote2` is the wire's only carrier for both plain notes and homework;
//! the sole signal distinguishing them is whether the text contains
//! "Lektier" ([`super::Note::is_homework`]). Notes are matched to lessons by
//! `(date, class_name)` rather than lesson id, since a note's own id has no
//! relation to the lesson(s) it was written against.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::{Lesson, Note};

pub fn join(mut lessons: Vec<Lesson>, notes: Vec<Note>) -> Vec<Lesson> {
    let mut by_key: HashMap<(NaiveDate, String), Vec<&Note>> = HashMap::new();
    for note in &notes {
        if let Some(date) = note.date {
            by_key.entry((date.date(), note.class_name.clone())).or_default().push(note);
        }
    }

    for lesson in lessons.iter_mut() {
        let Some(start) = lesson.start_time else { continue };
        let key = (start.date(), lesson.class_name.clone());
        let Some(matches) = by_key.get(&key) else { continue };

        for note in matches {
            if note.is_homework() {
                lesson.has_homework = true;
                lesson.homework = note.plain_text.clone();
            } else {
                lesson.has_note = true;
                if lesson.note.is_empty() || lesson.note == lesson.subject {
                    lesson.note =
                        if !note.plain_text.is_empty() { note.plain_text.clone() } else { note.html.chars().take(200).collect() };
                }
            }
        }
    }

    lessons.sort_by_key(|l| l.start_time);
    suppress_repeated_flags(&mut lessons);
    lessons
}

/// A double lesson decodes as two (or more) consecutive `SkemaBegivenhed`
/// entries that share the same note — flagging every one of them would show
/// the same homework badge three times in a row in a day view. Only the
/// first lesson of a same-subject, same-note run keeps the flag.
fn suppress_repeated_flags(lessons: &mut [Lesson]) {
    for i in 1..lessons.len() {
        let (before, after) = lessons.split_at_mut(i);
        let prev = &before[i - 1];
        let current = &mut after[0];
        let same_block = prev.start_time.map(|t| t.date()) == current.start_time.map(|t| t.date())
            && prev.subject == current.subject
            && prev.class_name == current.class_name
            && prev.note == current.note
            && prev.homework == current.homework;
        if same_block {
            current.has_note = false;
            current.has_homework = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lesson_at(subject: &str, class_name: &str, hour: u32) -> Lesson {
        Lesson {
            subject: subject.into(),
            class_name: class_name.into(),
            start_time: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap().and_hms_opt(8 + hour, 0, 0),
            ..Default::default()
        }
    }

    fn note_at(class_name: &str, text: &str) -> Note {
        Note {
            class_name: class_name.into(),
            plain_text: text.into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap().and_hms_opt(0, 0, 0),
            ..Default::default()
        }
    }

    #[test]
    fn homework_note_sets_has_homework_not_has_note() {
        let lessons = vec![lesson_at("Matematik", "htxr24", 0)];
        let notes = vec![note_at("htxr24", "Lektier: side 42")];
        let joined = join(lessons, notes);
        assert!(joined[0].has_homework);
        assert!(!joined[0].has_note);
        assert_eq!(joined[0].homework, "Lektier: side 42");
    }

    #[test]
    fn plain_note_sets_has_note() {
        let lessons = vec![lesson_at("Matematik", "htxr24", 0)];
        let notes = vec![note_at("htxr24", "Husk lommeregner")];
        let joined = join(lessons, notes);
        assert!(joined[0].has_note);
        assert!(!joined[0].has_homework);
    }

    #[test]
    fn flag_only_shows_on_first_of_consecutive_identical_lessons() {
        let lessons = vec![lesson_at("Matematik", "htxr24", 0), lesson_at("Matematik", "htxr24", 1)];
        let notes = vec![note_at("htxr24", "Lektier: side 42")];
        let joined = join(lessons, notes);
        assert!(joined[0].has_homework);
        assert!(!joined[1].has_homework);
    }

    #[test]
    fn notes_for_other_class_are_not_attached() {
        let lessons = vec![lesson_at("Matematik", "htxr24", 0)];
        let notes = vec![note_at("stxa24", "Lektier: side 42")];
        let joined = join(lessons, notes);
        assert!(!joined[0].has_homework);
        assert!(!joined[0].has_note);
    }
}
