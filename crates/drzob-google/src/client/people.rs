//! Google People v1 client.

use std::time::Duration;

use drzob_core::Contact;
use serde::Deserialize;
use tracing::debug;

use super::{build_http_client, read_json, request_failed};
use crate::api::{BoxFuture, ContactsApi};
use crate::authorize::AuthorizedSession;
use crate::error::GoogleResult;

/// Largest page the connections endpoint accepts.
const PAGE_SIZE: &str = "1000";

/// [`ContactsApi`] backed by `people/me/connections`.
#[derive(Debug)]
pub struct GooglePeopleClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GooglePeopleClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GoogleResult<Self> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_connections(&self, session: &AuthorizedSession) -> GoogleResult<Vec<Contact>> {
        let url = format!("{}/people/me/connections", self.base_url);
        let mut contacts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(session.access_token())
                .query(&[("personFields", "names"), ("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| request_failed("people.connections.list", e))?;
            let page: ConnectionsResponse = read_json("people.connections.list", response).await?;

            contacts.extend(page.connections.into_iter().map(Person::into_contact));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("fetched {} contacts", contacts.len());
        Ok(contacts)
    }
}

impl ContactsApi for GooglePeopleClient {
    fn list_contacts<'a>(
        &'a self,
        session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Contact>>> {
        Box::pin(self.fetch_connections(session))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsResponse {
    #[serde(default)]
    connections: Vec<Person>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    names: Vec<PersonName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    display_name: Option<String>,
    #[serde(default)]
    metadata: NameMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NameMetadata {
    #[serde(default)]
    primary: bool,
}

impl Person {
    /// Picks the primary name, falling back to the first one listed.
    fn into_contact(self) -> Contact {
        let primary = self.names.iter().position(|n| n.metadata.primary).unwrap_or(0);
        Contact {
            full_name: self
                .names
                .into_iter()
                .nth(primary)
                .and_then(|n| n.display_name),
        }
    }
}
