//! API key management for the current project (managers and admins only).

use super::CliContext;
use crate::api::types::ApiKeyId;
use crate::error::Result;
use crate::output::{print_info, print_keys, print_new_key, print_success};
use crate::pages::settings;
use crate::prompt;
use tracing::info;

pub async fn keys_list_command(ctx: &CliContext, reveal: bool) -> Result<()> {
    settings::ensure_can_manage(ctx.session.user.as_ref())?;
    let api = ctx.authed_api()?;
    let project = ctx.current_project(&api).await?;
    let keys = settings::list(&api, ctx.session.user.as_ref(), project.id).await?;
    println!("API keys for {}:", project.name);
    println!();
    print_keys(&keys, reveal);
    Ok(())
}

pub async fn keys_generate_command(ctx: &CliContext, name: &str) -> Result<()> {
    // Checked before any request goes out.
    settings::ensure_can_manage(ctx.session.user.as_ref())?;
    let name = settings::validate_key_name(name)?;
    let api = ctx.authed_api()?;
    let project = ctx.current_project(&api).await?;

    let (key, keys) = settings::generate(&api, ctx.session.user.as_ref(), project.id, &name).await?;
    info!(project = project.id, key = key.id, "api key generated");
    print_new_key(&key);
    print_info(&format!("{} key(s) now active for {}.", keys.len(), project.name));
    Ok(())
}

pub async fn keys_revoke_command(ctx: &CliContext, id: ApiKeyId, yes: bool) -> Result<()> {
    settings::ensure_can_manage(ctx.session.user.as_ref())?;
    let api = ctx.authed_api()?;
    let project = ctx.current_project(&api).await?;

    if !yes && !prompt::confirm(&format!("Revoke API key {}? CI jobs using it will fail.", id), false) {
        print_info("Nothing revoked.");
        return Ok(());
    }

    let keys = settings::revoke(&api, ctx.session.user.as_ref(), project.id, id).await?;
    info!(project = project.id, key = id, "api key revoked");
    print_success(&format!("Revoked API key {}", id));
    print_keys(&keys, false);
    Ok(())
}
