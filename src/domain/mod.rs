//! Domain entities produced by the decode and join stages (spec §3).

pub mod api;
pub mod joiner;

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Lesson {
    pub lesson_id: i64,
    pub subject: String,
    pub class_name: String,
    pub teachers: Vec<String>,
    pub rooms: Vec<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub note: String,
    pub homework: String,
    pub has_note: bool,
    pub has_homework: bool,
    pub has_files: bool,
}

/// A `SkemaNote2` record, joined onto a [`Lesson`] by `(date, class_name)` and then
/// discarded — nothing downstream holds onto a bare note.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Note {
    pub class_name: String,
    pub plain_text: String,
    pub html: String,
    pub date: Option<NaiveDateTime>,
}

impl Note {
    /// `SkemaNote2` carries homework and plain notes in the same shape; the only
    /// client-visible signal distinguishing them is this substring (§4.F).
    pub fn is_homework(&self) -> bool {
        self.plain_text.contains("Lektier") || self.html.contains("Lektier")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub date: Option<NaiveDateTime>,
    pub grade: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Assignment {
    pub opgave_id: i64,
    pub container_id: i64,
    pub subject: String,
    pub title: String,
    pub description: String,
    pub class_name: String,
    pub week: i64,
    pub budget_hours: f64,
    pub spent_hours: f64,
    pub deadline: Option<NaiveDateTime>,
    pub start_date: Option<NaiveDateTime>,
    pub submitted: bool,
    pub submission_date: Option<NaiveDateTime>,
    pub status_ordinal: i64,
    pub evaluation: Option<EvaluationRecord>,
    /// Position in the most recently decoded assignment list; `getAssignmentDetail`
    /// addresses assignments this way since the wire format exposes no stable
    /// cross-request id for `Aflevering` itself (only for its nested `OpgaveElev`).
    pub row_index: usize,
}

impl Assignment {
    pub fn status(&self) -> AssignmentStatus {
        AssignmentStatus::from_ordinal(self.status_ordinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Lesson,
    Assignment,
}

/// Names for `Assignment::status_ordinal`, the way `ClassKind` names a
/// `PjatkClass`'s `kind` string — the wire only ever sends the ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr, Serialize)]
pub enum AssignmentStatus {
    Open,
    Submitted,
    Evaluated,
    Unknown,
}

impl AssignmentStatus {
    pub fn from_ordinal(ordinal: i64) -> AssignmentStatus {
        match ordinal {
            0 => AssignmentStatus::Open,
            1 => AssignmentStatus::Submitted,
            2 => AssignmentStatus::Evaluated,
            _ => AssignmentStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileDescriptor {
    pub container_id: i64,
    pub resource_id: i64,
    pub file_id: i64,
    pub uuid: String,
    pub name: String,
    pub url: Option<String>,
}
