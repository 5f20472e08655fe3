//! Cached, filtered views over the decoded schedule and assignment streams
//! (spec §4.H). This is the surface the collaborator tool layer calls.

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, Utc};
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::channels;
use crate::decode::{ClassRegistry, scanner};
use crate::domain::joiner;
use crate::domain::{Assignment, ContainerKind, FileDescriptor, Lesson};
use crate::error::DomainError;
use crate::transport::Transport;
use crate::wire::Envelope;

/// Filter options for [`DomainApi::get_assignments`] (spec §4.H "Dynamic named parameters").
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(default, setter(strip_option))]
pub struct AssignmentFilter {
    pub include_submitted: bool,
    pub days_ahead: Option<i64>,
    pub subject: Option<String>,
}

impl Default for AssignmentFilter {
    fn default() -> Self {
        AssignmentFilter { include_submitted: false, days_ahead: None, subject: None }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScheduleResult {
    pub lessons: Vec<Lesson>,
    pub week_number: u32,
    pub year: i32,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub weekday: String,
    pub lessons: Vec<Lesson>,
    pub homework: Vec<String>,
    pub notes: Vec<String>,
    pub assignments_due: Vec<Assignment>,
    pub first_lesson: Option<NaiveDateTime>,
    pub last_lesson: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WeekOverview {
    pub week_number: u32,
    pub days: Vec<DayOverview>,
    pub homework_count: usize,
    pub notes_count: usize,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AssignmentDetail {
    pub assignment: Assignment,
    pub files: Vec<FileDescriptor>,
}

pub struct DomainApi {
    transport: Arc<Transport>,
    registry: ClassRegistry,
    schedule_cache: TtlCache<i64, ScheduleResult>,
    assignments_cache: TtlCache<(), Vec<Assignment>>,
    lesson_files_cache: TtlCache<i64, Vec<FileDescriptor>>,
    clock: SystemClock,
    logger: Logger,
}

impl DomainApi {
    pub fn new(transport: Transport, logger: Logger) -> Self {
        DomainApi {
            transport: Arc::new(transport),
            registry: ClassRegistry::standard(),
            schedule_cache: TtlCache::new(Duration::from_secs(300)),
            assignments_cache: TtlCache::new(Duration::from_secs(600)),
            lesson_files_cache: TtlCache::new(Duration::from_secs(300)),
            clock: SystemClock,
            logger: logger.new(slog::o!("subsystem" => "domain_api")),
        }
    }

    pub async fn parse_schedule(&self, week_offset: i64) -> Result<ScheduleResult, DomainError> {
        if let Some(cached) = self.schedule_cache.get(&week_offset, &self.clock).await {
            return Ok(cached);
        }

        let today = Local::now().date_naive();
        let monday = today - ChronoDuration::days(today.weekday().num_days_from_monday() as i64);
        let target_monday = monday + ChronoDuration::weeks(week_offset);
        let dates: Vec<NaiveDate> = (0..7).map(|d| target_monday + ChronoDuration::days(d)).collect();

        let start = target_monday.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = (target_monday + ChronoDuration::days(6)).and_hms_opt(23, 59, 59).unwrap().and_utc();

        let raw = self.transport.fetch_schedule(start, end).await?;
        let envelope = Envelope::parse(&raw)?;
        let lessons = scanner::scan_lessons(&envelope, &self.registry, &self.logger);
        let notes = scanner::scan_notes(&envelope, &self.registry, &self.logger);
        let lessons = joiner::join(lessons, notes);
        let lessons = self.attach_has_files(lessons).await;

        let result = ScheduleResult { lessons, week_number: target_monday.iso_week().week(), year: target_monday.year(), dates };
        self.schedule_cache.put(week_offset, result.clone(), &self.clock).await;
        Ok(result)
    }

    pub async fn get_day_overview(&self, day_offset: i64) -> Result<DayOverview, DomainError> {
        let today = Local::now().date_naive();
        let target = today + ChronoDuration::days(day_offset);
        let today_monday = today - ChronoDuration::days(today.weekday().num_days_from_monday() as i64);
        let target_monday = target - ChronoDuration::days(target.weekday().num_days_from_monday() as i64);
        let week_offset = (target_monday - today_monday).num_weeks();

        let schedule = self.parse_schedule(week_offset).await?;
        let lessons: Vec<Lesson> = schedule.lessons.into_iter().filter(|l| l.start_time.map(|t| t.date()) == Some(target)).collect();

        let assignments = self.get_assignments(AssignmentFilter::default()).await?;
        let assignments_due: Vec<Assignment> = assignments.into_iter().filter(|a| a.deadline.map(|d| d.date()) == Some(target)).collect();

        let homework: Vec<String> = lessons.iter().filter(|l| l.has_homework).map(|l| l.homework.clone()).collect();
        let notes: Vec<String> = lessons.iter().filter(|l| l.has_note).map(|l| l.note.clone()).collect();
        let first_lesson = lessons.iter().filter_map(|l| l.start_time).min();
        let last_lesson = lessons.iter().filter_map(|l| l.end_time).max();

        Ok(DayOverview {
            date: target,
            weekday: target.weekday().to_string(),
            lessons,
            homework,
            notes,
            assignments_due,
            first_lesson,
            last_lesson,
        })
    }

    pub async fn get_week_overview(&self, week_offset: i64) -> Result<WeekOverview, DomainError> {
        let schedule = self.parse_schedule(week_offset).await?;
        let assignments = self.get_assignments(AssignmentFilter::default()).await?;

        let min_date = *schedule.dates.first().unwrap();
        let max_date = *schedule.dates.last().unwrap();
        let week_assignments: Vec<Assignment> =
            assignments.into_iter().filter(|a| a.deadline.map(|d| d.date() >= min_date && d.date() <= max_date).unwrap_or(false)).collect();

        let mut days = Vec::with_capacity(schedule.dates.len());
        let mut homework_count = 0usize;
        let mut notes_count = 0usize;

        for date in &schedule.dates {
            let lessons: Vec<Lesson> = schedule.lessons.iter().filter(|l| l.start_time.map(|t| t.date()) == Some(*date)).cloned().collect();
            homework_count += lessons.iter().filter(|l| l.has_homework).count();
            notes_count += lessons.iter().filter(|l| l.has_note).count();

            let assignments_due: Vec<Assignment> = week_assignments.iter().filter(|a| a.deadline.map(|d| d.date()) == Some(*date)).cloned().collect();
            let homework: Vec<String> = lessons.iter().filter(|l| l.has_homework).map(|l| l.homework.clone()).collect();
            let notes: Vec<String> = lessons.iter().filter(|l| l.has_note).map(|l| l.note.clone()).collect();
            let first_lesson = lessons.iter().filter_map(|l| l.start_time).min();
            let last_lesson = lessons.iter().filter_map(|l| l.end_time).max();

            days.push(DayOverview {
                date: *date,
                weekday: date.weekday().to_string(),
                lessons,
                homework,
                notes,
                assignments_due,
                first_lesson,
                last_lesson,
            });
        }

        Ok(WeekOverview { week_number: schedule.week_number, days, homework_count, notes_count, assignments: week_assignments })
    }

    pub async fn get_assignments(&self, filter: AssignmentFilter) -> Result<Vec<Assignment>, DomainError> {
        let all = match self.assignments_cache.get(&(), &self.clock).await {
            Some(cached) => cached,
            None => {
                let raw = self.transport.fetch_assignments().await?;
                let envelope = Envelope::parse(&raw)?;
                let assignments = scanner::scan_assignments(&envelope, &self.registry, &self.logger);
                self.assignments_cache.put((), assignments.clone(), &self.clock).await;
                assignments
            }
        };

        let now = Utc::now().naive_utc();
        let horizon = filter.days_ahead.map(|days| now + ChronoDuration::days(days));

        Ok(all
            .into_iter()
            .filter(|a| filter.include_submitted || is_open(a))
            .filter(|a| horizon.map(|h| a.deadline.map(|d| d <= h).unwrap_or(true)).unwrap_or(true))
            .filter(|a| filter.subject.as_deref().map(|s| a.subject.to_lowercase().contains(&s.to_lowercase())).unwrap_or(true))
            .collect())
    }

    pub async fn get_assignment_detail(&self, row_index: usize) -> Result<AssignmentDetail, DomainError> {
        let assignments = self.get_assignments(AssignmentFilter { include_submitted: true, ..Default::default() }).await?;
        let assignment = assignments.into_iter().find(|a| a.row_index == row_index).ok_or(DomainError::AssignmentNotFound { row_index })?;

        let raw = self.transport.list_files(assignment.container_id, ContainerKind::Assignment).await?;
        let files = parse_file_listing(&raw, &self.registry, &self.logger, assignment.container_id);
        let files = self.resolve_file_urls(files).await;

        Ok(AssignmentDetail { assignment, files })
    }

    pub async fn get_lesson_files(&self, lesson_id: i64) -> Result<Vec<FileDescriptor>, DomainError> {
        if let Some(cached) = self.lesson_files_cache.get(&lesson_id, &self.clock).await {
            return Ok(cached);
        }

        let raw = self.transport.list_files(lesson_id, ContainerKind::Lesson).await?;
        let files = parse_file_listing(&raw, &self.registry, &self.logger, lesson_id);
        let files = self.resolve_file_urls(files).await;

        self.lesson_files_cache.put(lesson_id, files.clone(), &self.clock).await;
        Ok(files)
    }

    /// A failed signed-URL lookup degrades to an empty `url` rather than
    /// failing the whole listing (§4.H) — one missing link shouldn't hide
    /// every other file on the lesson or assignment. Lookups for different
    /// files run concurrently over a small worker pool (§9 "Coroutines").
    async fn resolve_file_urls(&self, files: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        let transport = Arc::clone(&self.transport);
        let logger = self.logger.clone();
        let indexed: Vec<(usize, FileDescriptor)> = files.into_iter().enumerate().collect();

        let mut resolved = channels::map_bounded(indexed, channels::DEFAULT_WORKERS, move |(index, mut file)| {
            let transport = Arc::clone(&transport);
            let logger = logger.clone();
            async move {
                file.url = match transport.fetch_file_url(file.file_id).await {
                    Ok(raw) => extract_signed_url(&raw),
                    Err(err) => {
                        slog::warn!(logger, "file url lookup failed"; "file_id" => file.file_id, "error" => %err);
                        None
                    }
                };
                (index, file)
            }
        })
        .await;

        resolved.sort_by_key(|(index, _)| *index);
        resolved.into_iter().map(|(_, file)| file).collect()
    }

    /// `hasFiles` isn't carried on `SkemaBegivenhed` itself (SPEC_FULL.md
    /// §B.5); it comes from a lighter per-lesson probe run concurrently
    /// across the week's lessons, same pool as the file-url resolution.
    async fn attach_has_files(&self, lessons: Vec<Lesson>) -> Vec<Lesson> {
        let transport = Arc::clone(&self.transport);
        let logger = self.logger.clone();
        let indexed: Vec<(usize, Lesson)> = lessons.into_iter().enumerate().collect();

        let mut resolved = channels::map_bounded(indexed, channels::DEFAULT_WORKERS, move |(index, mut lesson)| {
            let transport = Arc::clone(&transport);
            let logger = logger.clone();
            async move {
                lesson.has_files = match transport.probe_lesson_note(lesson.lesson_id).await {
                    Ok(raw) => parse_has_files(&raw),
                    Err(err) => {
                        slog::warn!(logger, "lesson note probe failed"; "lesson_id" => lesson.lesson_id, "error" => %err);
                        false
                    }
                };
                (index, lesson)
            }
        })
        .await;

        resolved.sort_by_key(|(index, _)| *index);
        resolved.into_iter().map(|(_, lesson)| lesson).collect()
    }
}

/// `hentNoteForSkema`'s response is a lightweight envelope carrying a single
/// flag; its exact class shape is unconfirmed, so this reads it structurally
/// rather than through a registered reader — any nonzero stack value is
/// treated as "has files".
fn parse_has_files(raw: &str) -> bool {
    Envelope::parse(raw).map(|envelope| envelope.stack.iter().any(|v| crate::wire::stack::value_as_i64(v) != 0)).unwrap_or(false)
}

fn is_open(assignment: &Assignment) -> bool {
    !assignment.submitted && matches!(assignment.status_ordinal, 0) && assignment.evaluation.is_none()
}

fn parse_file_listing(raw: &str, registry: &ClassRegistry, logger: &Logger, container_id: i64) -> Vec<FileDescriptor> {
    let Ok(envelope) = Envelope::parse(raw) else { return Vec::new() };
    scanner::scan_files(&envelope, registry, logger, container_id)
}

fn extract_signed_url(raw: &str) -> Option<String> {
    let envelope = Envelope::parse(raw).ok()?;
    envelope.strings.iter().find(|s| s.starts_with("http")).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EvaluationRecord;

    fn assignment(submitted: bool, status_ordinal: i64, evaluation: Option<EvaluationRecord>) -> Assignment {
        Assignment { submitted, status_ordinal, evaluation, ..Default::default() }
    }

    #[test]
    fn open_filter_matches_only_unsubmitted_unevaluated_pending() {
        let a = assignment(false, 0, None);
        let b = assignment(true, 2, None);
        let c = assignment(false, 0, Some(EvaluationRecord { id: 1, date: None, grade: "10".into() }));
        assert!(is_open(&a));
        assert!(!is_open(&b));
        assert!(!is_open(&c));
    }
}
