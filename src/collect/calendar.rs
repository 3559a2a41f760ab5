use crate::activity::ActivityEntry;
use crate::devops::az;
use crate::error::{ReportError, Result};
use crate::range::DateRange;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CalendarView {
    #[serde(default)]
    value: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    is_cancelled: bool,
    #[serde(default)]
    is_all_day: bool,
    #[serde(default)]
    show_as: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
    #[serde(default)]
    organizer: Option<Organizer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organizer {
    #[serde(default)]
    email_address: EmailAddress,
}

#[derive(Debug, Default, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    name: String,
}

/// Collect MS365 calendar events via the Microsoft Graph calendarView
/// endpoint, using the ambient az session. Requires Calendars.Read
/// consent; cancelled and free-marked events are skipped.
pub async fn collect(range: DateRange) -> Result<Vec<(NaiveDate, ActivityEntry)>> {
    let url = format!(
        "https://graph.microsoft.com/v1.0/me/calendarView\
         ?startDateTime={}T00:00:00Z&endDateTime={}T23:59:59Z\
         &$select=subject,start,end,isAllDay,organizer,showAs,isCancelled\
         &$orderby=start/dateTime&$top=200",
        range.from, range.to
    );
    let output = az::run_az(&[
        "rest",
        "--method",
        "GET",
        "--url",
        &url,
        "--headers",
        "Content-Type=application/json",
    ])
    .await?;

    let view: CalendarView = serde_json::from_str(&output)
        .map_err(|e| ReportError::parse(format!("unexpected calendarView shape: {}", e)))?;

    Ok(to_entries(view))
}

fn to_entries(view: CalendarView) -> Vec<(NaiveDate, ActivityEntry)> {
    let mut entries = Vec::new();
    for event in view.value {
        if event.is_cancelled {
            continue;
        }
        if event.show_as.as_deref() == Some("free") {
            continue;
        }
        let start = &event.start.date_time;
        let Ok(date) = NaiveDate::parse_from_str(start.get(..10).unwrap_or(""), "%Y-%m-%d") else {
            continue;
        };

        let (start_time, end_time) = if event.is_all_day {
            ("all-day".to_string(), String::new())
        } else {
            (
                start.get(11..16).unwrap_or("").to_string(),
                event.end.date_time.get(11..16).unwrap_or("").to_string(),
            )
        };

        entries.push((
            date,
            ActivityEntry::Calendar {
                subject: event.subject.unwrap_or_else(|| "(no subject)".to_string()),
                start: start_time,
                end: end_time,
                organizer: event
                    .organizer
                    .map(|o| o.email_address.name)
                    .unwrap_or_default(),
            },
        ));
    }
    entries
}
