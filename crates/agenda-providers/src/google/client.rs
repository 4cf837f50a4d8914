//! Google Calendar API client.
//!
//! Low-level HTTP access to the events collection of one calendar: request
//! building, status mapping and response parsing. The access token is passed
//! to every call because one client serves many users.

use agenda_core::civil::{EventTime, render_datetime};
use agenda_core::event::{
    CalendarEventRef, EventDraft, EventPatch, InsertedEvent, PatchedEvent, SearchQuery,
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;

/// Upper bound on events per listing page.
const PAGE_SIZE: usize = 250;

/// Google Calendar API client bound to one calendar.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
    calendar_id: String,
    time_zone: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the calendar named in `config`.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            time_zone: config.time_zone.clone(),
        })
    }

    /// `…/calendars/{calendarId}/events`
    pub fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// `…/calendars/{calendarId}/events/{eventId}`
    pub fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Lists every event of the query window, following `nextPageToken`.
    pub async fn list_events(
        &self,
        access_token: &str,
        query: &SearchQuery,
    ) -> ProviderResult<Vec<CalendarEventRef>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(access_token, query, page_token.as_deref())
                .await?;

            all_events.extend(page.items.into_iter().filter_map(convert_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar = %self.calendar_id,
            count = all_events.len(),
            "listed events"
        );
        Ok(all_events)
    }

    async fn list_events_page(
        &self,
        access_token: &str,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let request = self
            .http_client
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&list_params(query, page_token));

        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        parse_body(response).await
    }

    /// Inserts a new event.
    pub async fn insert_event(
        &self,
        access_token: &str,
        draft: &EventDraft,
    ) -> ProviderResult<InsertedEvent> {
        let body = insert_body(draft, &self.time_zone);
        let request = self
            .http_client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&body);

        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        let event: ApiEvent = parse_body(response).await?;
        let id = event
            .id
            .ok_or_else(|| ProviderError::invalid_response("inserted event has no id"))?;

        Ok(InsertedEvent {
            id,
            html_link: event.html_link,
        })
    }

    /// Patches the time range and any supplied metadata of an event.
    pub async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> ProviderResult<PatchedEvent> {
        let body = patch_body(patch, &self.time_zone);
        let request = self
            .http_client
            .patch(self.event_url(event_id))
            .bearer_auth(access_token)
            .json(&body);

        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        let event: ApiEvent = parse_body(response).await?;

        Ok(PatchedEvent {
            id: event.id.unwrap_or_else(|| event_id.to_string()),
            summary: event.summary.unwrap_or_default(),
            html_link: event.html_link,
        })
    }

    /// Deletes an event.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> ProviderResult<()> {
        let request = self
            .http_client
            .delete(self.event_url(event_id))
            .bearer_auth(access_token);

        check_status(request.send().await.map_err(transport_error)?).await?;
        Ok(())
    }
}

/// Query parameters of one events.list page.
fn list_params(query: &SearchQuery, page_token: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("timeMin", query.window.time_min()),
        ("timeMax", query.window.time_max()),
        ("singleEvents", "true".to_string()),
        ("orderBy", "startTime".to_string()),
        ("maxResults", PAGE_SIZE.to_string()),
    ];

    if let Some(q) = query.free_text_query.as_deref().filter(|q| !q.trim().is_empty()) {
        params.push(("q", q.to_string()));
    }

    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }

    params
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Maps a non-success status to the matching provider error.
async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &body))
}

fn status_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::authentication("access token expired or invalid"),
        403 => ProviderError::authorization("access denied to calendar"),
        404 | 410 => ProviderError::not_found(format!("event not found ({})", status)),
        400 => ProviderError::bad_request(format!("request rejected: {}", body)),
        429 => ProviderError::rate_limited("rate limit exceeded"),
        _ => ProviderError::server(format!("API error ({}): {}", status, body)),
    }
}

async fn parse_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

fn insert_body(draft: &EventDraft, time_zone: &str) -> EventBody {
    EventBody {
        summary: Some(draft.title.clone()),
        description: Some(draft.description.clone()),
        location: draft.location.clone(),
        start: ApiTimeBody::at(&draft.start, time_zone),
        end: ApiTimeBody::at(&draft.end, time_zone),
        attendees: (!draft.attendees.is_empty()).then(|| attendee_bodies(&draft.attendees)),
    }
}

fn patch_body(patch: &EventPatch, time_zone: &str) -> EventBody {
    EventBody {
        summary: None,
        description: patch.metadata.description.clone(),
        location: patch.metadata.location.clone(),
        start: ApiTimeBody::at(&patch.start, time_zone),
        end: ApiTimeBody::at(&patch.end, time_zone),
        attendees: patch.metadata.attendees.as_deref().map(attendee_bodies),
    }
}

fn attendee_bodies(emails: &[String]) -> Vec<AttendeeBody> {
    emails
        .iter()
        .map(|email| AttendeeBody {
            email: email.clone(),
        })
        .collect()
}

/// Converts a listed API event; cancelled or malformed events are dropped.
fn convert_event(event: ApiEvent) -> Option<CalendarEventRef> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_time(&event.start).or_else(|| {
        warn!(event_id = %id, "event has no usable start time");
        None
    })?;
    let end = parse_time(&event.end).or_else(|| {
        warn!(event_id = %id, "event has no usable end time");
        None
    })?;

    let converted = CalendarEventRef::new(id, event.summary.unwrap_or_default(), start, end);
    Some(match event.html_link {
        Some(link) => converted.with_html_link(link),
        None => converted,
    })
}

fn parse_time(time: &ApiEventTime) -> Option<EventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map_err(|e| warn!("failed to parse event time '{}': {}", dt, e))
            .ok()
            .map(EventTime::from_datetime),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| warn!("failed to parse event date '{}': {}", date, e))
            .ok()
            .map(EventTime::from_date),
        (None, None) => None,
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Request body for events.insert and events.patch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: ApiTimeBody,
    end: ApiTimeBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<AttendeeBody>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTimeBody {
    date_time: String,
    time_zone: String,
}

impl ApiTimeBody {
    fn at(dt: &DateTime<FixedOffset>, time_zone: &str) -> Self {
        Self {
            date_time: render_datetime(dt),
            time_zone: time_zone.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AttendeeBody {
    email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::civil::{CivilOffset, TimeWindow};
    use agenda_core::event::EventMetadata;
    use serde_json::json;

    fn at(d: u32, h: u32) -> DateTime<FixedOffset> {
        CivilOffset::default().localize(
            NaiveDate::from_ymd_opt(2024, 6, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    fn window() -> TimeWindow {
        TimeWindow::new(at(1, 0), at(8, 0))
    }

    #[test]
    fn urls_encode_ids() {
        let config = GoogleConfig::new()
            .with_calendar_id("team@example.com")
            .with_api_base("https://calendar.test/v3/");
        let client = GoogleCalendarClient::new(&config).unwrap();

        assert_eq!(
            client.events_url(),
            "https://calendar.test/v3/calendars/team%40example.com/events"
        );
        assert_eq!(
            client.event_url("abc/1"),
            "https://calendar.test/v3/calendars/team%40example.com/events/abc%2F1"
        );
    }

    #[test]
    fn list_params_with_text_query() {
        let query = SearchQuery::by_title("Gym", window());
        let params = list_params(&query, Some("page-2"));

        assert!(params.contains(&("timeMin", "2024-06-01T00:00:00-06:00".to_string())));
        assert!(params.contains(&("timeMax", "2024-06-08T00:00:00-06:00".to_string())));
        assert!(params.contains(&("singleEvents", "true".to_string())));
        assert!(params.contains(&("orderBy", "startTime".to_string())));
        assert!(params.contains(&("q", "Gym".to_string())));
        assert!(params.contains(&("pageToken", "page-2".to_string())));
    }

    #[test]
    fn list_params_scan_has_no_q() {
        let params = list_params(&SearchQuery::scan("Gym", window()), None);
        assert!(params.iter().all(|(k, _)| *k != "q" && *k != "pageToken"));
    }

    #[test]
    fn insert_body_carries_time_zone() {
        let draft = EventDraft::new("Cena", at(1, 18), at(1, 19))
            .unwrap()
            .with_description("Creado desde Telegram")
            .with_attendees(vec!["ana@example.com".to_string()]);

        let value = serde_json::to_value(insert_body(&draft, "America/Mexico_City")).unwrap();
        assert_eq!(
            value,
            json!({
                "summary": "Cena",
                "description": "Creado desde Telegram",
                "start": {"dateTime": "2024-06-01T18:00:00-06:00", "timeZone": "America/Mexico_City"},
                "end": {"dateTime": "2024-06-01T19:00:00-06:00", "timeZone": "America/Mexico_City"},
                "attendees": [{"email": "ana@example.com"}]
            })
        );
    }

    #[test]
    fn patch_body_only_sends_supplied_fields() {
        let patch = EventPatch::new(at(2, 9), at(2, 10)).unwrap();
        let value = serde_json::to_value(patch_body(&patch, "America/Mexico_City")).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["end", "start"]);

        let patch = patch.with_metadata(EventMetadata {
            location: Some("Centro".to_string()),
            ..Default::default()
        });
        let value = serde_json::to_value(patch_body(&patch, "UTC")).unwrap();
        assert_eq!(value["location"], "Centro");
        assert_eq!(value["start"]["timeZone"], "UTC");
        assert!(value.get("summary").is_none());
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Gym",
                    "start": {"dateTime": "2024-06-01T18:00:00-06:00"},
                    "end": {"dateTime": "2024-06-01T19:00:00-06:00"},
                    "htmlLink": "https://calendar.google.com/event?eid=1",
                    "status": "confirmed"
                },
                {
                    "id": "event2",
                    "start": {"date": "2024-06-02"},
                    "end": {"date": "2024-06-03"}
                },
                {
                    "id": "event3",
                    "summary": "Gone",
                    "status": "cancelled",
                    "start": {"dateTime": "2024-06-01T18:00:00-06:00"},
                    "end": {"dateTime": "2024-06-01T19:00:00-06:00"}
                }
            ],
            "nextPageToken": "abc"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));

        let events: Vec<_> = response.items.into_iter().filter_map(convert_event).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "Gym");
        assert_eq!(events[0].start, EventTime::from_datetime(at(1, 18)));
        assert_eq!(
            events[0].html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=1")
        );
        assert_eq!(events[1].summary, "");
        assert!(events[1].start.is_all_day());
    }

    #[test]
    fn event_without_times_is_dropped() {
        let event: ApiEvent = serde_json::from_str(r#"{"id": "x", "summary": "Broken"}"#).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn status_mapping() {
        use crate::error::ProviderErrorCode;

        assert_eq!(status_error(401, "").code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(status_error(403, "").code(), ProviderErrorCode::AuthorizationFailed);
        assert_eq!(status_error(404, "").code(), ProviderErrorCode::NotFound);
        assert_eq!(status_error(410, "").code(), ProviderErrorCode::NotFound);
        assert_eq!(status_error(400, "bad").code(), ProviderErrorCode::BadRequest);
        assert_eq!(status_error(503, "").code(), ProviderErrorCode::ServerError);
    }
}
