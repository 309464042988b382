//! Calendar backend client.
//!
//! [`CalendarApi`] is the capability the calendar tools depend on;
//! [`GoogleCalendarClient`] implements it against the Google Calendar v3
//! REST surface. Credential acquisition is out of scope here: the client
//! takes an opaque [`AccessTokenProvider`] and simply attaches whatever
//! token it hands out.

use crate::error::CalendarError;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Supplies a bearer token for calendar requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a currently-valid access token.
    async fn access_token(&self) -> Result<String, CalendarError>;
}

/// Token provider backed by a fixed, externally-managed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Creates a provider; `None` means no calendar credential is configured
    /// and every calendar call will fail with a missing-credential error.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CalendarError> {
        self.token.clone().ok_or(CalendarError::MissingCredential)
    }
}

/// Request to create an event.
#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    /// Event title.
    pub summary: String,
    /// Start time, ISO 8601.
    pub start_time: String,
    /// End time, ISO 8601.
    pub end_time: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Optional location.
    pub location: Option<String>,
}

/// A created event, as confirmed by the calendar service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedEvent {
    /// Event identifier assigned by the service.
    pub id: String,
    /// Event title.
    #[serde(default)]
    pub summary: String,
    /// Link to the event in the calendar UI, when the service provides one.
    #[serde(rename = "htmlLink")]
    pub html_link: Option<String>,
}

/// Query for listing events.
#[derive(Debug, Clone, Default)]
pub struct ListEventsQuery {
    /// Maximum number of events to return; defaults to 10.
    pub max_results: Option<u32>,
    /// Earliest event start, ISO 8601; defaults to now.
    pub time_min: Option<String>,
    /// Latest event start, ISO 8601.
    pub time_max: Option<String>,
    /// Case-insensitive keyword filter on the event title.
    pub summary_keyword: Option<String>,
}

/// One event in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Event identifier, usable with delete.
    pub id: String,
    /// Event title.
    pub summary: String,
    /// Start time as reported by the service (dateTime or all-day date).
    pub start: String,
    /// End time as reported by the service.
    pub end: String,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The event existed and was deleted.
    Deleted,
    /// No such event (or it was already deleted).
    NotFound,
}

/// The calendar operations the tools depend on.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Creates an event.
    async fn create_event(&self, request: &CreateEventRequest)
    -> Result<CreatedEvent, CalendarError>;

    /// Lists upcoming events matching the query.
    async fn list_events(&self, query: &ListEventsQuery)
    -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Deletes an event by identifier.
    async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome, CalendarError>;
}

/// Google Calendar v3 REST client, scoped to the `primary` calendar.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    tokens: std::sync::Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendarClient {
    /// Creates a client against the production Google Calendar endpoint.
    #[must_use]
    pub fn new(http: reqwest::Client, tokens: std::sync::Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(http, tokens, GOOGLE_CALENDAR_BASE_URL)
    }

    /// Creates a client against an alternate endpoint (tests).
    #[must_use]
    pub fn with_base_url(
        http: reqwest::Client,
        tokens: std::sync::Arc<dyn AccessTokenProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    async fn bearer(&self) -> Result<String, CalendarError> {
        self.tokens.access_token().await
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn create_event(
        &self,
        request: &CreateEventRequest,
    ) -> Result<CreatedEvent, CalendarError> {
        let body = json!({
            "summary": request.summary,
            "description": request.description,
            "location": request.location,
            "start": { "dateTime": request.start_time },
            "end": { "dateTime": request.end_time },
        });

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedEvent =
            response.json().await.map_err(|e| CalendarError::Decode {
                reason: e.to_string(),
            })?;
        info!(event_id = %created.id, "calendar event created");
        Ok(created)
    }

    async fn list_events(
        &self,
        query: &ListEventsQuery,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let time_min = query
            .time_min
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let max_results = query.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        let mut request = self
            .http
            .get(self.events_url())
            .bearer_auth(self.bearer().await?)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .query(&[("maxResults", max_results)]);
        if let Some(time_max) = &query.time_max {
            request = request.query(&[("timeMax", time_max.as_str())]);
        }

        let response = request.send().await.map_err(|e| CalendarError::Network {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let listing: EventListing =
            response.json().await.map_err(|e| CalendarError::Decode {
                reason: e.to_string(),
            })?;

        // Keyword filtering happens here; the service has no title-contains
        // query parameter.
        let keyword = query.summary_keyword.as_deref().map(str::to_lowercase);
        let events = listing
            .items
            .into_iter()
            .filter(|item| match &keyword {
                Some(keyword) => item.summary.to_lowercase().contains(keyword),
                None => true,
            })
            .map(|item| CalendarEvent {
                id: item.id,
                summary: item.summary,
                start: item.start.into_display(),
                end: item.end.into_display(),
            })
            .collect();
        Ok(events)
    }

    async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome, CalendarError> {
        let url = format!("{}/{}", self.events_url(), event_id);
        let response = self
            .http
            .delete(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| CalendarError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        // 410 means the event was already deleted.
        if status.as_u16() == 404 || status.as_u16() == 410 {
            warn!(event_id, "delete requested for a missing event");
            return Ok(DeleteOutcome::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(event_id, "calendar event deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

#[derive(Debug, Deserialize)]
struct EventListing {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
}

/// Event boundary: timed events carry `dateTime`, all-day events `date`.
#[derive(Debug, Default, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn into_display(self) -> String {
        self.date_time.or(self.date).unwrap_or_default()
    }
}
