// ============================================================================
// Template Boundary Parsing
// ============================================================================
//
// The generic record store hands templates around as loosely-typed JSON
// payloads. These functions convert them into the typed `ClassTemplate`
// at the boundary so the core never propagates dynamic payloads.

use crate::api::{ClassTemplate, ClientId, TemplateId, DEFAULT_DURATION_MINUTES};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Weekday};
use std::str::FromStr;

#[derive(serde::Deserialize)]
struct TemplateInput {
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub client_id: Option<i64>,
    pub time_of_day: String,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    pub weekdays: Vec<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

fn validate_input_template(template_json: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(template_json).context("Invalid template JSON")?;
    let obj = value
        .as_object()
        .context("Template payload must be a JSON object")?;
    if obj.get("weekdays").is_none() {
        anyhow::bail!("Missing required 'weekdays' field");
    }
    if obj.get("start_date").is_none() {
        anyhow::bail!("Missing required 'start_date' field");
    }
    Ok(())
}

/// Parse a class template from a JSON payload.
///
/// Accepts weekday names in either short ("mon") or long ("monday") form
/// and a `HH:MM` or `HH:MM:SS` time of day. The resulting template is
/// validated (date range, weekday set, duration) before being returned,
/// so a rejected payload never reaches expansion.
pub fn parse_template_json_str(template_json: &str) -> Result<ClassTemplate> {
    validate_input_template(template_json)?;

    let input: TemplateInput = serde_json::from_str(template_json)
        .context("Failed to deserialize template JSON using Serde")?;

    let time_of_day = parse_time_of_day(&input.time_of_day)
        .with_context(|| format!("Invalid time_of_day '{}'", input.time_of_day))?;

    let mut weekdays = Vec::with_capacity(input.weekdays.len());
    for name in &input.weekdays {
        let day = Weekday::from_str(name)
            .map_err(|_| anyhow::anyhow!("Unknown weekday '{}'", name))?;
        if !weekdays.contains(&day) {
            weekdays.push(day);
        }
    }

    let template = ClassTemplate {
        id: input.id.map(TemplateId::new),
        title: input.title,
        client_id: input.client_id.map(ClientId::new),
        time_of_day,
        duration_minutes: input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
        weekdays,
        start_date: input.start_date,
        end_date: input.end_date,
        notes: input.notes,
    };

    template
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid template: {}", e))?;

    Ok(template)
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .context("Expected HH:MM or HH:MM:SS")
}

// ============================================================================
// Tests
// ============================================================================
