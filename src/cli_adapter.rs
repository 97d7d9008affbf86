use anyhow::Result;

use crate::app::{AppContext, execute_command_with_context};
use crate::cli::parse_cli_args;

/// Run the app by parsing CLI-style args and dispatching the command.
pub async fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let context = AppContext::from_env();
    run_with_context(args, &context).await
}

/// Run the app with an explicit context (settings, scanner and output hook).
pub async fn run_with_context<I, S>(args: I, context: &AppContext) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command = parse_cli_args(args)?;
    execute_command_with_context(command, context).await
}

/// Run the app with Ctrl+C cancellation wired into the provided context.
///
/// Only commands that poll the cancel flag get a Ctrl+C handler; the monitor
/// stops at its next tick. Screens and one-shot commands are left to the
/// default SIGINT action so Ctrl+C ends them immediately.
pub async fn run_with_ctrl_c<I, S>(args: I, context: &AppContext) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command = parse_cli_args(args)?;
    if !command.handles_ctrl_c() {
        return execute_command_with_context(command, context).await;
    }

    let cancel_context = context.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_context.cancel();
            crate::log_info!("Cancellation requested (Ctrl+C). Stopping monitor...");
        }
    });

    let run_result = execute_command_with_context(command, context).await;
    signal_task.abort();
    run_result
}
