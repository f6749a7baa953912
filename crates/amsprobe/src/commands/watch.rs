//! `amsprobe watch`: run the monitor until Ctrl-C / SIGTERM.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use amsprobe_core::Monitor;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load(global)?;
    for (key, value) in amsprobe_config::flatten(&cfg) {
        debug!("{key} = {value}");
    }
    let config = super::monitor_config(&cfg)?;

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let outcome = Monitor::new(config).run(&cancel, std::io::stdout()).await;
    signals.abort();

    let summary = outcome?;
    debug!(reads = summary.reads, last_state = ?summary.last_state, "monitor finished");
    Ok(())
}

/// Cancel `token` on the first Ctrl-C or (unix) SIGTERM.
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("interrupt received, stopping"),
        () = terminate => info!("termination requested, stopping"),
    }
    token.cancel();
}
