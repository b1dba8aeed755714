//! `drzob add-event`.

use drzob_google::calendar::{insert_event, todays_window};
use drzob_google::{
    CALENDAR_SCOPE, CalendarEvent, EventId, GoogleCalendarClient, GoogleError, ScopeSet,
};
use tracing::info;

use crate::cli::AddEventArgs;
use crate::context::AppContext;
use crate::error::ClientResult;

/// Authorizes for the calendar scope and inserts today's test event.
///
/// The event range is checked first so a bad `--from-hour`/`--to-hour` never
/// triggers a consent prompt.
pub async fn add_event(ctx: &AppContext, args: AddEventArgs) -> ClientResult<EventId> {
    let (start, end) = todays_window(args.from_hour, args.to_hour)?;
    let event = CalendarEvent::new(args.description, start, end);
    if !event.has_valid_range() {
        return Err(GoogleError::invalid_input(format!(
            "--to-hour ({}) must be after --from-hour ({})",
            args.to_hour, args.from_hour
        ))
        .into());
    }

    let credentials = ctx.credentials()?;
    credentials.validate()?;
    let calendar_name = args
        .calendar
        .unwrap_or_else(|| ctx.google().calendar_name.clone());

    let session = ctx
        .authorizer()?
        .authorize(
            &credentials,
            &ScopeSet::new([CALENDAR_SCOPE]),
            &ctx.google().store_key,
        )
        .await?;

    let api = GoogleCalendarClient::new(&ctx.google().calendar_api_base, ctx.google().timeout)?;
    let id = insert_event(&api, &session, &calendar_name, &event).await?;

    info!("event {} added to '{}'", id, calendar_name);
    println!("Event created in '{}': {}", calendar_name, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use drzob_google::ErrorKind;

    use crate::cli::{Cli, Command};
    use crate::config::{ClientConfig, GoogleSettings};

    #[tokio::test]
    async fn inverted_hours_fail_before_authorization() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "drzob",
            "add-event",
            "--from-hour",
            "6",
            "--to-hour",
            "4",
            "--client-id",
            "id.apps.googleusercontent.com",
            "--client-secret",
            "secret",
        ])
        .unwrap();
        let config = ClientConfig {
            debug: false,
            google: GoogleSettings {
                token_dir: Some(tmp.path().to_path_buf()),
                ..Default::default()
            },
        };
        let ctx = AppContext::new(&cli, &config).unwrap();
        let Command::AddEvent(args) = cli.command else {
            panic!("expected add-event");
        };

        let err = add_event(&ctx, args).await.unwrap_err();
        assert_eq!(
            err.as_google().map(GoogleError::kind),
            Some(ErrorKind::InvalidInput)
        );
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
