//! HTTP adapter for the Google Calendar gateway.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, SecondsFormat, TimeZone, Utc};
use quickcal_core::CalendarGateway;
use quickcal_domain::constants::{
    DEFAULT_CALENDAR_ID, DUPLICATE_SEARCH_MAX_RESULTS, DUPLICATE_WINDOW_MINUTES,
};
use quickcal_domain::utils::datetime::{coerce_datetime, format_local};
use quickcal_domain::utils::title::normalize_title;
use quickcal_domain::{
    CreatedEvent, DuplicateCandidate, EventDraft, QuickCalError, Result, SchedulerSettings,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::http::HttpClient;

use super::types::{EventDateTime, EventListResponse, EventPayload, EventResource};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Source of a valid OAuth access token for each request.
///
/// Token refresh and persistence live behind this trait, outside the
/// gateway itself.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token provider for service contexts and tests.
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Google Calendar client implementing the [`CalendarGateway`] port.
pub struct GoogleCalendarClient {
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>, http: HttpClient) -> Self {
        Self { http, tokens, base_url: CALENDAR_API_BASE.to_string() }
    }

    /// Point the client at a custom endpoint (for testing).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn events_url(&self, settings: &SchedulerSettings) -> String {
        let calendar_id = if settings.calendar_id.is_empty() {
            DEFAULT_CALENDAR_ID
        } else {
            settings.calendar_id.as_str()
        };
        format!("{}/calendars/{}/events", self.base_url, calendar_id)
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {token}"))
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarClient {
    async fn insert_event(
        &self,
        draft: &EventDraft,
        settings: &SchedulerSettings,
    ) -> Result<CreatedEvent> {
        let payload = EventPayload {
            summary: draft.title.clone(),
            location: non_empty(&draft.location),
            description: non_empty(&draft.description),
            start: EventDateTime::timed(&draft.start, &settings.timezone),
            end: EventDateTime::timed(&draft.end, &settings.timezone),
        };

        info!(
            calendar_id = %settings.calendar_id,
            summary = %payload.summary,
            start = %draft.start,
            end = %draft.end,
            time_zone = %settings.timezone,
            "inserting event"
        );

        let builder = self
            .http
            .request(Method::POST, self.events_url(settings))
            .header("Authorization", self.bearer().await?)
            .json(&payload);
        let response = self.http.send(builder).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status.as_u16(), body));
        }

        let resource: EventResource = response.json().await.map_err(|err| {
            QuickCalError::Calendar(format!("作成結果の解析に失敗しました: {err}"))
        })?;

        info!(event_id = %resource.id, status = %resource.status, "event inserted");
        Ok(CreatedEvent {
            id: resource.id,
            html_link: resource.html_link,
            title: resource.summary,
            start: resource.start.raw().to_string(),
            end: resource.end.raw().to_string(),
        })
    }

    async fn find_duplicates(
        &self,
        draft: &EventDraft,
        settings: &SchedulerSettings,
    ) -> Result<Vec<DuplicateCandidate>> {
        let Some(start) = coerce_datetime(&draft.start) else {
            return Ok(Vec::new());
        };
        let Some(start_local) = Local.from_local_datetime(&start).earliest() else {
            return Ok(Vec::new());
        };

        let window = Duration::minutes(DUPLICATE_WINDOW_MINUTES);
        let time_min =
            (start_local - window).with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max =
            (start_local + window).with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true);

        debug!(%time_min, %time_max, "listing events around the draft start");

        let max_results = DUPLICATE_SEARCH_MAX_RESULTS.to_string();
        let builder = self
            .http
            .request(Method::GET, self.events_url(settings))
            .header("Authorization", self.bearer().await?)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.as_str()),
            ]);
        let response = self.http.send(builder).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status.as_u16(), body));
        }

        let listing: EventListResponse = response.json().await.map_err(|err| {
            QuickCalError::Calendar(format!("イベント一覧の解析に失敗しました: {err}"))
        })?;

        let target_title = normalize_title(&draft.title);
        let window_seconds = DUPLICATE_WINDOW_MINUTES * 60;
        let candidates: Vec<DuplicateCandidate> = listing
            .items
            .into_iter()
            .filter_map(|item| {
                let item_title = normalize_title(&item.summary);
                if item_title.is_empty() || item_title != target_title {
                    return None;
                }

                let item_start = coerce_datetime(item.start.raw())?;
                if (item_start - start).num_seconds().abs() > window_seconds {
                    return None;
                }

                let end = coerce_datetime(item.end.raw())
                    .map(format_local)
                    .unwrap_or_else(|| item.end.raw().to_string());
                Some(DuplicateCandidate {
                    summary: item.summary,
                    start: format_local(item_start),
                    end,
                })
            })
            .collect();

        info!(count = candidates.len(), "duplicate scan complete");
        Ok(candidates)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn map_api_error(status: u16, body: String) -> QuickCalError {
    match status {
        401 | 403 => QuickCalError::Auth(format!(
            "Google連携の認証に失敗しました（{status}）。再接続してください。"
        )),
        _ => QuickCalError::Calendar(format!("Calendar API error: {status} {body}")),
    }
}
