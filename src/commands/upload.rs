//! Upload JUnit XML reports to the current project.

use super::CliContext;
use crate::api::upload::processed_message;
use crate::api::stage_reports;
use crate::error::{QaHubError, Result};
use crate::output::{print_staged_upload, print_success, print_warning, Spinner};
use std::path::PathBuf;
use tracing::info;

pub async fn upload_command(ctx: &CliContext, paths: &[PathBuf]) -> Result<()> {
    let staged = stage_reports(paths)?;
    if staged.is_empty() {
        if let Some(message) = staged.skipped_message() {
            print_warning(&message);
        }
        return Err(QaHubError::Validation(
            "No XML report files to upload".to_string(),
        ));
    }

    let api = ctx.authed_api()?;
    let project = ctx.current_project(&api).await?;

    println!("Uploading to {}:", project.name);
    print_staged_upload(&staged);

    let spinner = Spinner::start(format!("Uploading {} report(s)...", staged.staged.len()));
    let result = api.upload_reports(&staged.staged, project.id).await;
    spinner.finish();

    let run_ids = result?;
    info!(project = project.id, runs = ?run_ids, "reports uploaded");
    print_success(&processed_message(&run_ids));
    Ok(())
}
