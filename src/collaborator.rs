//! The collaborator adapter (spec §4.I / §6 "Voice-assistant collaborator
//! interface"): a stable `listTools` / `callTool` surface. Tool-call errors
//! are always captured as a structured result, never raised to the caller —
//! mirrors the way `bot.rs`'s handler tree turns every branch's error into a
//! logged event rather than letting it unwind across the dispatcher.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::domain::api::{AssignmentFilter, DomainApi};
use crate::runtime::Runtime;

#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_hint: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolParameters {
    pub properties: BTreeMap<&'static str, PropertySchema>,
    pub required: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: ToolParameters,
}

fn int_prop(description: &'static str) -> PropertySchema {
    PropertySchema { kind: "integer", description: Some(description), enum_hint: None }
}

fn string_prop(description: &'static str) -> PropertySchema {
    PropertySchema { kind: "string", description: Some(description), enum_hint: None }
}

fn bool_prop(description: &'static str) -> PropertySchema {
    PropertySchema { kind: "boolean", description: Some(description), enum_hint: None }
}

/// The tool-schema dialect on the other side of this interface has no native
/// enum constraint, so allowed values are folded into the description text
/// instead (spec §6 `enumHint`).
pub fn list_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "parseSchedule",
            description: "Decode the raw schedule for a given week offset from the current week.",
            parameters: ToolParameters {
                properties: BTreeMap::from([("weekOffset", int_prop("Weeks from the current week; 0 is this week."))]),
                required: vec!["weekOffset"],
            },
        },
        ToolDescriptor {
            name: "getDayOverview",
            description: "Lessons, homework, notes, and assignments due on a single day.",
            parameters: ToolParameters {
                properties: BTreeMap::from([("dayOffset", int_prop("Days from today; 0 is today."))]),
                required: vec!["dayOffset"],
            },
        },
        ToolDescriptor {
            name: "getWeekOverview",
            description: "Per-day lesson groups, flag counts, and assignments due within a week.",
            parameters: ToolParameters {
                properties: BTreeMap::from([("weekOffset", int_prop("Weeks from the current week; 0 is this week."))]),
                required: vec!["weekOffset"],
            },
        },
        ToolDescriptor {
            name: "getAssignments",
            description: "Filtered assignment list.",
            parameters: ToolParameters {
                properties: BTreeMap::from([
                    ("includeSubmitted", bool_prop("Include assignments that are already submitted or evaluated.")),
                    ("daysAhead", int_prop("Only include assignments due within this many days from now.")),
                    ("subject", string_prop("Case-insensitive substring match on the subject name.")),
                ]),
                required: vec![],
            },
        },
        ToolDescriptor {
            name: "getAssignmentDetail",
            description: "A single assignment plus its attached files.",
            parameters: ToolParameters {
                properties: BTreeMap::from([("rowIndex", int_prop("Position of the assignment in the most recently fetched list."))]),
                required: vec!["rowIndex"],
            },
        },
        ToolDescriptor {
            name: "getLessonFiles",
            description: "Files attached to a lesson, each with a short-lived signed download URL.",
            parameters: ToolParameters {
                properties: BTreeMap::from([("lessonId", int_prop("The lesson's id as returned by parseSchedule."))]),
                required: vec!["lessonId"],
            },
        },
    ]
}

pub async fn call_tool(runtime: &Runtime, name: &str, args: Value) -> Value {
    match dispatch(&runtime.domain, name, args).await {
        Ok(result) => json!({ "success": true, "result": result }),
        Err(message) => json!({ "success": false, "error": message }),
    }
}

async fn dispatch(domain: &DomainApi, name: &str, args: Value) -> Result<Value, String> {
    match name {
        "parseSchedule" => {
            let week_offset = required_i64(&args, "weekOffset")?;
            let result = domain.parse_schedule(week_offset).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "getDayOverview" => {
            let day_offset = required_i64(&args, "dayOffset")?;
            let result = domain.get_day_overview(day_offset).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "getWeekOverview" => {
            let week_offset = required_i64(&args, "weekOffset")?;
            let result = domain.get_week_overview(week_offset).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "getAssignments" => {
            let filter = AssignmentFilter {
                include_submitted: args.get("includeSubmitted").and_then(Value::as_bool).unwrap_or(false),
                days_ahead: args.get("daysAhead").and_then(Value::as_i64),
                subject: args.get("subject").and_then(Value::as_str).map(str::to_owned),
            };
            let result = domain.get_assignments(filter).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "getAssignmentDetail" => {
            let row_index = required_i64(&args, "rowIndex")? as usize;
            let result = domain.get_assignment_detail(row_index).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "getLessonFiles" => {
            let lesson_id = required_i64(&args, "lessonId")?;
            let result = domain.get_lesson_files(lesson_id).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        other => Err(format!("unknown tool '{other}'")),
    }
}

fn required_i64(args: &Value, field: &str) -> Result<i64, String> {
    args.get(field).and_then(Value::as_i64).ok_or_else(|| format!("missing required integer argument '{field}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_tools_names_match_dispatch_arms() {
        let names: Vec<&str> = list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["parseSchedule", "getDayOverview", "getWeekOverview", "getAssignments", "getAssignmentDetail", "getLessonFiles"]);
    }
}
