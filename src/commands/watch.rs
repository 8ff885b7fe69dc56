//! Stream run events for the current project until Ctrl-C.

use super::CliContext;
use crate::api::types::TestRunEvent;
use crate::error::Result;
use crate::output::{format_run_event, print_info, GRAY, RESET};
use crate::realtime::{BrokerSettings, ConnectionState, RealtimeListener, StompBroker};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

pub async fn watch_command(ctx: &CliContext) -> Result<()> {
    let api = ctx.authed_api()?;
    let project = ctx.current_project(&api).await?;

    let broker = StompBroker::new(BrokerSettings::from_config(&ctx.config)?, Handle::current());
    let (tx, mut events) = mpsc::unbounded_channel::<TestRunEvent>();
    let mut listener = RealtimeListener::new(broker, tx);
    let mut state = listener.state();
    listener.set_project(Some(project.id))?;

    print_info(&format!(
        "Watching {} for new runs. Press Ctrl-C to stop.",
        project.name
    ));

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("{}", format_run_event(&event));
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                print_connection(current);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    info!(project = project.id, "stopped watching");
    drop(listener);
    Ok(())
}

fn print_connection(state: ConnectionState) {
    println!("{GRAY}[{}]{RESET}", state.label());
}
