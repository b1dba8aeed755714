//! `drzob contacts`.

use std::io::{self, Write};

use drzob_google::contacts::list_contact_names;
use drzob_google::{CONTACTS_SCOPE, GooglePeopleClient, ScopeSet};

use crate::context::AppContext;
use crate::error::ClientResult;

/// Authorizes for the contacts scope and prints one name per line.
pub async fn list(ctx: &AppContext) -> ClientResult<()> {
    let credentials = ctx.credentials()?;
    credentials.validate()?;

    let session = ctx
        .authorizer()?
        .authorize(
            &credentials,
            &ScopeSet::new([CONTACTS_SCOPE]),
            &ctx.google().store_key,
        )
        .await?;

    let api = GooglePeopleClient::new(&ctx.google().people_api_base, ctx.google().timeout)?;
    let names = list_contact_names(&api, &session).await?;

    let mut stdout = io::stdout().lock();
    for name in names {
        writeln!(stdout, "{}", name)?;
    }
    Ok(())
}
