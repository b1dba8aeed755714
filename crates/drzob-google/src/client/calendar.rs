//! Google Calendar v3 client.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use drzob_core::{Calendar, CalendarEvent, EventId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_http_client, read_json, request_failed};
use crate::api::{BoxFuture, CalendarApi};
use crate::authorize::AuthorizedSession;
use crate::error::GoogleResult;

/// [`CalendarApi`] backed by the Calendar v3 REST API.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GoogleResult<Self> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_calendars(&self, session: &AuthorizedSession) -> GoogleResult<Vec<Calendar>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(session.access_token());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| request_failed("calendarList.list", e))?;
            let page: CalendarListResponse = read_json("calendarList.list", response).await?;

            calendars.extend(
                page.items
                    .into_iter()
                    .map(|entry| Calendar::new(entry.id, entry.summary.unwrap_or_default())),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("listed {} calendars", calendars.len());
        Ok(calendars)
    }

    async fn post_event(
        &self,
        session: &AuthorizedSession,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> GoogleResult<EventId> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(session.access_token())
            .json(&EventBody::from(event))
            .send()
            .await
            .map_err(|e| request_failed("events.insert", e))?;
        let created: InsertedEvent = read_json("events.insert", response).await?;

        debug!("inserted event {} into {}", created.id, calendar_id);
        Ok(EventId::new(created.id))
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_calendars<'a>(
        &'a self,
        session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Calendar>>> {
        Box::pin(self.fetch_calendars(session))
    }

    fn insert_event<'a>(
        &'a self,
        session: &'a AuthorizedSession,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, GoogleResult<EventId>> {
        Box::pin(self.post_event(session, calendar_id, event))
    }
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
}

/// Request body for events.insert.
#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
}

impl EventTime {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            date_time: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl<'a> From<&'a CalendarEvent> for EventBody<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        Self {
            summary: &event.summary,
            description: &event.description,
            start: EventTime::new(event.start),
            end: EventTime::new(event.end),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}
