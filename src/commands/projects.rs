//! Project listing and selection.

use super::CliContext;
use crate::error::{QaHubError, Result};
use crate::output::{print_projects, print_success};
use crate::session::project_load_error_message;

/// List projects, marking the one commands currently act on.
pub async fn projects_command(ctx: &CliContext) -> Result<()> {
    let api = ctx.authed_api()?;
    let scope = ctx
        .project_scope(&api)
        .await
        .map_err(|e| load_error(&e))?;
    print_projects(scope.projects(), scope.current_id());
    Ok(())
}

/// Select a project by id or name and remember it for later commands.
pub async fn projects_use_command(ctx: &CliContext, id_or_name: &str) -> Result<()> {
    let api = ctx.authed_api()?;
    let mut scope = ctx
        .project_scope(&api)
        .await
        .map_err(|e| load_error(&e))?;
    let id = scope
        .find(id_or_name)
        .map(|p| p.id)
        .ok_or_else(|| QaHubError::ProjectNotFound(id_or_name.to_string()))?;
    let project = scope.select(id, &ctx.store)?;
    print_success(&format!("Switched to {}", project.name));
    Ok(())
}

fn load_error(err: &QaHubError) -> QaHubError {
    match err {
        QaHubError::Forbidden(_) | QaHubError::Unauthorized => {
            QaHubError::Forbidden(project_load_error_message(err).to_string())
        }
        _ => QaHubError::Network(project_load_error_message(err).to_string()),
    }
}
