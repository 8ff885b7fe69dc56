//! Account commands: login, register, logout, whoami, users.

use super::CliContext;
use crate::error::{QaHubError, Result};
use crate::output::{print_success, print_users, print_whoami};
use crate::prompt;
use std::io::{self, BufRead};
use tracing::info;

/// Credentials from flags, stdin, or interactive prompts.
fn read_credentials(username: Option<String>, password_stdin: bool) -> Result<(String, String)> {
    let username = match username {
        Some(name) => name,
        None => prompt::read_line("Username:")?,
    };
    let password = if password_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        prompt::read_password("Password:")?
    };
    validate_credentials(&username, &password)?;
    Ok((username.trim().to_string(), password))
}

fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(QaHubError::Validation("Username must not be empty".to_string()));
    }
    if password.is_empty() {
        return Err(QaHubError::Validation("Password must not be empty".to_string()));
    }
    Ok(())
}

pub fn greeting(username: &str) -> String {
    format!("Welcome back, {}! Happy testing!!!", username)
}

pub async fn login_command(
    ctx: &CliContext,
    username: Option<String>,
    password_stdin: bool,
) -> Result<()> {
    let (username, password) = read_credentials(username, password_stdin)?;
    let api = ctx.api()?;
    let response = api.login(&username, &password).await?;
    let session = ctx.store.login(&response)?;
    info!(user = %response.username, "logged in");

    let name = session
        .user
        .as_ref()
        .map(|u| u.username.as_str())
        .unwrap_or(&username);
    print_success(&greeting(name));
    Ok(())
}

pub async fn register_command(
    ctx: &CliContext,
    username: Option<String>,
    password_stdin: bool,
) -> Result<()> {
    let (username, password) = read_credentials(username, password_stdin)?;
    let api = ctx.api()?;
    let message = api.register(&username, &password).await?;
    info!(user = %username, "registered");
    if message.trim().is_empty() {
        print_success(&format!("Registered {}. Run 'qahub login' to sign in.", username));
    } else {
        print_success(message.trim());
    }
    Ok(())
}

pub fn logout_command(ctx: &CliContext) -> Result<()> {
    if !ctx.session.is_authenticated() {
        print_success("Already logged out.");
        return Ok(());
    }
    ctx.store.logout()?;
    print_success("Logged out.");
    Ok(())
}

pub fn whoami_command(ctx: &CliContext) -> Result<()> {
    print_whoami(&ctx.session, &ctx.config.api_url);
    Ok(())
}

pub async fn users_command(ctx: &CliContext) -> Result<()> {
    let api = ctx.authed_api()?;
    let users = api.list_users().await?;
    print_users(&users);
    Ok(())
}
