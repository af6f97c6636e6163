//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into cancellation of the run context
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT forces the process to exit

use tokio_util::sync::CancellationToken;

/// Exit code used when a second signal forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Create a token that is cancelled on the first SIGTERM or SIGINT.
///
/// Must be called from within a Tokio runtime.
pub fn shutdown_token() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let trigger = token.clone();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            for round in 0.. {
                let name = tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                };
                if round == 0 {
                    tracing::info!(signal = name, "Shutdown signal received");
                    trigger.cancel();
                } else {
                    tracing::warn!(signal = name, "Second shutdown signal, forcing exit");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(signal = "ctrl-c", "Shutdown signal received");
                trigger.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(signal = "ctrl-c", "Second shutdown signal, forcing exit");
                std::process::exit(FORCED_EXIT_CODE);
            }
        });
    }

    Ok(token)
}
