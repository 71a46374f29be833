//! Wire types for the Google Calendar v3 events API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

/// Either a timed (`dateTime`) or all-day (`date`) boundary.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventDateTime {
    pub fn timed(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self { date_time: Some(date_time.into()), time_zone: Some(time_zone.into()), date: None }
    }

    /// The raw timestamp, whichever representation is present.
    pub fn raw(&self) -> &str {
        self.date_time.as_deref().or(self.date.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventResource {
    pub id: String,
    pub html_link: String,
    pub status: String,
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventListResponse {
    pub items: Vec<EventResource>,
}
