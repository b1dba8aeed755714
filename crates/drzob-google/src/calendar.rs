//! Calendar Operation: insert an event into a calendar found by name.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use drzob_core::{CalendarEvent, EventId};
use tracing::{debug, info};

use crate::api::CalendarApi;
use crate::authorize::AuthorizedSession;
use crate::config::CALENDAR_SCOPE;
use crate::error::{GoogleError, GoogleResult};

/// Description given to events created by `drzob add-event`.
pub const DEFAULT_EVENT_DESCRIPTION: &str = "Test event for DrZob";

/// Inserts `event` into the one calendar whose display name is
/// `calendar_display_name` and returns the id the service assigned.
///
/// The event range is checked before any remote call. No insert is attempted
/// unless exactly one calendar matches.
pub async fn insert_event(
    api: &dyn CalendarApi,
    session: &AuthorizedSession,
    calendar_display_name: &str,
    event: &CalendarEvent,
) -> GoogleResult<EventId> {
    session.require_scope(CALENDAR_SCOPE)?;

    if !event.has_valid_range() {
        return Err(GoogleError::invalid_input(format!(
            "The event must end after it starts ({} is not before {})",
            event.start, event.end
        )));
    }

    let calendars = api.list_calendars(session).await?;
    let mut matches = calendars
        .iter()
        .filter(|c| c.display_name == calendar_display_name);

    let calendar = match (matches.next(), matches.next()) {
        (None, _) => return Err(GoogleError::calendar_not_found(calendar_display_name)),
        (Some(calendar), None) => calendar,
        (Some(_), Some(_)) => {
            return Err(GoogleError::operation(format!(
                "{} calendars are named '{}', refusing to pick one",
                calendars
                    .iter()
                    .filter(|c| c.display_name == calendar_display_name)
                    .count(),
                calendar_display_name
            )));
        }
    };
    debug!("resolved calendar '{}' to {}", calendar_display_name, calendar.id);

    let id = api.insert_event(session, &calendar.id, event).await?;
    info!("created event {} in '{}'", id, calendar_display_name);
    Ok(id)
}

/// Returns today's `from_hour:00` to `to_hour:00` in local time, as UTC.
pub fn todays_window(from_hour: u32, to_hour: u32) -> GoogleResult<(DateTime<Utc>, DateTime<Utc>)> {
    window_on(Local::now().date_naive(), from_hour, to_hour)
}

fn window_on(
    day: chrono::NaiveDate,
    from_hour: u32,
    to_hour: u32,
) -> GoogleResult<(DateTime<Utc>, DateTime<Utc>)> {
    let at = |hour: u32| -> GoogleResult<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| GoogleError::invalid_input(format!("{} is not an hour of the day", hour)))?;
        Local
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| {
                GoogleError::invalid_input(format!("{}:00 does not exist on {}", hour, day))
            })
    };
    Ok((at(from_hour)?, at(to_hour)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::RecordingCalendarApi;
    use chrono::NaiveDate;
    use drzob_core::{Calendar, ScopeSet};

    fn session() -> AuthorizedSession {
        AuthorizedSession::new("K", "t", ScopeSet::new([CALENDAR_SCOPE]))
    }

    fn event() -> CalendarEvent {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = window_on(day, 4, 6).unwrap();
        CalendarEvent::new(DEFAULT_EVENT_DESCRIPTION, start, end)
    }

    #[test]
    fn window_spans_two_hours() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = window_on(day, 4, 6).unwrap();
        assert_eq!(end - start, chrono::Duration::hours(2));
        assert_eq!(start.with_timezone(&Local).date_naive(), day);
    }

    #[test]
    fn window_rejects_bad_hour() {
        let err = todays_window(4, 24).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn session_without_calendar_scope_is_rejected() {
        let api = RecordingCalendarApi::new(vec![Calendar::new("c1", "DrZob")]);
        let session = AuthorizedSession::new("K", "t", ScopeSet::new(["other"]));

        let err = insert_event(&api, &session, "DrZob", &event()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(api.list_calls(), 0);
    }

    #[tokio::test]
    async fn inserts_into_the_matching_calendar() {
        let api = RecordingCalendarApi::new(vec![
            Calendar::new("primary", "me@example.com"),
            Calendar::new("c-drzob", "DrZob"),
        ]);

        let id = insert_event(&api, &session(), "DrZob", &event()).await.unwrap();
        assert_eq!(id, api.event_id());
        let inserted = api.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, "c-drzob");
    }

    #[tokio::test]
    async fn name_match_is_exact() {
        let api = RecordingCalendarApi::new(vec![Calendar::new("c1", "drzob"), Calendar::new("c2", "DrZob ")]);
        let err = insert_event(&api, &session(), "DrZob", &event()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CalendarNotFound);
        assert!(api.inserted().is_empty());
    }
}
