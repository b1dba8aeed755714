//! Contacts Operation: the display names of the user's contacts.

use std::vec;

use drzob_core::Contact;
use tracing::debug;

use crate::api::ContactsApi;
use crate::authorize::AuthorizedSession;
use crate::config::CONTACTS_SCOPE;
use crate::error::GoogleResult;

/// Contact display names in the order the service returned them.
///
/// Unnamed contacts yield an empty string.
#[derive(Debug)]
pub struct ContactNames {
    inner: vec::IntoIter<Contact>,
}

impl Iterator for ContactNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next().map(|c| c.full_name.unwrap_or_default())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ContactNames {}

/// Fetches every contact of the session's account.
pub async fn list_contact_names(
    api: &dyn ContactsApi,
    session: &AuthorizedSession,
) -> GoogleResult<ContactNames> {
    session.require_scope(CONTACTS_SCOPE)?;

    let contacts = api.list_contacts(session).await?;
    debug!("{} contacts for '{}'", contacts.len(), session.store_key());

    Ok(ContactNames {
        inner: contacts.into_iter(),
    })
}
