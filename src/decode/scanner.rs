//! The marker scanner (spec §4.E): the primary extraction strategy for
//! schedule and assignment responses. Rather than trust the top-level wrapper
//! object's own field layout (fragile across small protocol revisions), this
//! walks the data stack for every occurrence of a class marker and
//! deserializes independently from each occurrence, clearing the object cache
//! between attempts so one malformed instance can't poison the next.

use std::collections::HashSet;

use slog::Logger;

use super::readers::{self, DecodedValue};
use super::{ClassRegistry, Dispatcher};
use crate::domain::{Assignment, FileDescriptor, Lesson, Note};
use crate::error::DecodeError;
use crate::wire::Envelope;
use crate::wire::stack::StackReader;

fn marker_value(strings: &[String], predicate: impl Fn(&str) -> bool) -> Option<i64> {
    strings.iter().position(|s| predicate(s)).map(|idx| (idx + 1) as i64)
}

fn positions_of(data: &[serde_json::Value], marker: i64) -> Vec<usize> {
    data.iter()
        .enumerate()
        .filter_map(|(i, v)| (crate::wire::stack::value_as_i64(v) == marker).then_some(i))
        .collect()
}

/// Runs a reader at every occurrence of `marker` in `envelope.stack`, in
/// ascending stack-index order, with a fresh object cache per attempt.
fn scan_with<T>(
    envelope: &Envelope,
    registry: &ClassRegistry,
    logger: &Logger,
    marker: i64,
    reader_fn: fn(&mut Dispatcher) -> Result<DecodedValue, DecodeError>,
    extract: impl Fn(DecodedValue) -> Option<T>,
) -> Vec<T> {
    let mut out = Vec::new();
    for pos in positions_of(&envelope.stack, marker) {
        let reader = StackReader::at(&envelope.stack, &envelope.strings, pos);
        let mut dispatcher = Dispatcher::new(reader, registry, logger.clone());
        match reader_fn(&mut dispatcher) {
            Ok(value) => {
                if let Some(item) = extract(value) {
                    out.push(item);
                }
            }
            Err(err) => {
                slog::warn!(logger, "scan attempt failed"; "pos" => pos, "error" => %err);
            }
        }
    }
    out
}

pub fn scan_lessons(envelope: &Envelope, registry: &ClassRegistry, logger: &Logger) -> Vec<Lesson> {
    let Some(marker) = marker_value(&envelope.strings, |s| s.starts_with("dk.uddata.model.skema.SkemaBegivenhed/"))
    else {
        return Vec::new();
    };

    let found = scan_with(envelope, registry, logger, marker, readers::read_lesson, |v| match v {
        DecodedValue::Lesson(lesson) => Some(*lesson),
        _ => None,
    });

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|lesson| !lesson.subject.is_empty() || !lesson.rooms.is_empty() || !lesson.teachers.is_empty())
        .filter(|lesson| seen.insert((lesson.start_time, lesson.subject.clone(), lesson.class_name.clone())))
        .collect()
}

pub fn scan_notes(envelope: &Envelope, registry: &ClassRegistry, logger: &Logger) -> Vec<Note> {
    let Some(marker) = marker_value(&envelope.strings, |s| s.contains("SkemaNote2")) else {
        return Vec::new();
    };

    let found = scan_with(envelope, registry, logger, marker, readers::read_skema_note, |v| match v {
        DecodedValue::Note(note) if !note.plain_text.is_empty() || !note.html.is_empty() => Some(*note),
        _ => None,
    });

    let mut seen = HashSet::new();
    found.into_iter().filter(|note| seen.insert((note.date, note.class_name.clone(), note.plain_text.clone()))).collect()
}

pub fn scan_assignments(envelope: &Envelope, registry: &ClassRegistry, logger: &Logger) -> Vec<Assignment> {
    let Some(marker) = marker_value(&envelope.strings, |s| s.starts_with("dk.uddata.model.opgave.Aflevering/"))
    else {
        return Vec::new();
    };

    let found = scan_with(envelope, registry, logger, marker, readers::read_aflevering, |v| match v {
        DecodedValue::Assignment(assignment) => Some(*assignment),
        _ => None,
    });

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|a| !a.subject.is_empty() || !a.title.is_empty())
        .filter(|a| seen.insert((a.subject.clone(), a.title.clone())))
        .enumerate()
        .map(|(row_index, mut a)| {
            a.row_index = row_index;
            a
        })
        .collect()
}

/// Mirrors `_parse_ressource_response`'s own dedup-by-file-id and
/// truthy-name filter over `Ressource` occurrences.
pub fn scan_files(envelope: &Envelope, registry: &ClassRegistry, logger: &Logger, container_id: i64) -> Vec<FileDescriptor> {
    let Some(marker) = marker_value(&envelope.strings, |s| s.starts_with("dk.uddata.model.ressourcer.Ressource/")) else {
        return Vec::new();
    };

    let found = scan_with(envelope, registry, logger, marker, readers::read_ressource, |v| match v {
        DecodedValue::Ressource { container_id: resource_id, file_id, name, uuid } => Some((resource_id, file_id, name, uuid)),
        _ => None,
    });

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, file_id, name, _)| !name.is_empty() && *file_id > 0)
        .filter(|(_, file_id, _, _)| seen.insert(*file_id))
        .map(|(resource_id, file_id, name, uuid)| FileDescriptor { container_id, resource_id, file_id, uuid, name, url: None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn scan_lessons_returns_nothing_when_marker_absent() {
        let envelope = Envelope { stack: vec![], strings: vec!["java.util.ArrayList/123".into()] };
        let registry = ClassRegistry::standard();
        let logger = test_logger();
        assert!(scan_lessons(&envelope, &registry, &logger).is_empty());
    }
}
