// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relational_relay_server::{
    api::router,
    config::{LogFormat, RelayConfig, DEFAULT_LOG_FILTER},
    exchange::ExchangeSweeper,
    push::{ApnsClient, PushDispatcher},
    state::AppState,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
fn spawn_signal_handlers(token: CancellationToken) {
    let t = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            t.cancel();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
                info!("SIGTERM received, shutting down");
                token.cancel();
            }
        });
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Relay server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    let mut workers = Vec::new();
    let push = match &config.apns {
        Some(apns) => {
            let client = ApnsClient::new(apns)?;
            let (dispatcher, handles) = PushDispatcher::start(
                Arc::new(client),
                config.push_workers,
                config.push_queue_capacity,
                shutdown.clone(),
            );
            workers = handles;
            info!(gateway = %apns.base_url, topic = %apns.topic, "APNs push enabled");
            Some(dispatcher)
        }
        None => {
            warn!("APNs not configured, push notifications disabled");
            None
        }
    };
    if config.api_key.is_none() {
        warn!("No service key configured, publish and push endpoints will refuse requests");
    }

    let state = AppState::new(&config, push, shutdown.clone());
    let sweeper = tokio::spawn(
        ExchangeSweeper::new(state.exchanges.clone(), config.sweep_interval).run(shutdown.clone()),
    );
    let app = router(state);

    let addr = config.bind_addr();

    let handle: Handle<SocketAddr> = Handle::new();
    let server_handle = handle.clone();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        server_shutdown.cancelled().await;
        server_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls before loading certificates.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("rustls crypto provider already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

            info!(%addr, "Relay listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "Relay listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    // Stop background tasks even if the server exited on its own.
    shutdown.cancel();
    for worker in workers {
        let _ = worker.await;
    }
    let _ = sweeper.await;
    info!("Relay stopped");
    Ok(())
}
