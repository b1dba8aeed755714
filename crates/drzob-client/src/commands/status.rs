//! `drzob status` and `drzob logout`.

use drzob_google::{DEFAULT_PROBE_WAIT, has_stored_token};

use crate::context::AppContext;
use crate::error::ClientResult;

/// Reports whether a token is cached for the configured store key.
pub async fn status(ctx: &AppContext) -> ClientResult<bool> {
    let key = &ctx.google().store_key;
    let present = has_stored_token(ctx.store(), key, DEFAULT_PROBE_WAIT).await;

    println!("store key: {}", key);
    println!("token:     {}", ctx.token_location());
    if present {
        println!("status:    authorized (cached token found)");
    } else {
        println!("status:    not authorized (consent will be requested on next use)");
    }
    Ok(present)
}

/// Removes the cached token.
pub fn logout(ctx: &AppContext) -> ClientResult<()> {
    let key = &ctx.google().store_key;
    if ctx.store().delete(key)? {
        println!("Removed cached token {}", ctx.token_location());
    } else {
        println!("No cached token for '{}'", key);
    }
    Ok(())
}
