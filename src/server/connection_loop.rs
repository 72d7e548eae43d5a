// src/server/connection_loop.rs

//! The main accept loop and graceful shutdown sequence.

use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[cfg(windows)]
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::connection::ConnectionHandler;

use super::context::ServerContext;

async fn await_shutdown_signal() {
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

    #[cfg(windows)]
    let mut ctrl_c = signal::ctrl_c().expect("failed to register Ctrl+C handler");

    tokio::select! {
        _ = async { #[cfg(unix)] { sigint.recv().await; info!("SIGINT received, shutting down"); } } => {},
        _ = async { #[cfg(unix)] { sigterm.recv().await; info!("SIGTERM received, shutting down"); } } => {},
        _ = async { #[cfg(windows)] { ctrl_c.await; info!("Ctrl-C received, shutting down"); } } => {},
    }
}

pub async fn run(mut ctx: ServerContext) {
    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = await_shutdown_signal() => {
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => info!("a background task exited"),
                    Ok(Err(e)) => { error!("background task failed: {e}, shutting down"); break; }
                    Err(e) => { error!("background task panicked: {e:?}, shutting down"); break; }
                }
            }

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                            warn!(%addr, "rejecting connection: client capacity reached");
                            continue;
                        };

                        session_id_counter = session_id_counter.wrapping_add(1);
                        let session_id = session_id_counter;
                        let registry = ctx.registry.clone();
                        let default_match_id = ctx.default_match_id;
                        let global_shutdown_rx = ctx.shutdown_tx.subscribe();

                        info!(%addr, session_id, "accepted connection");
                        client_tasks.spawn(async move {
                            let _permit = permit;
                            let mut handler = ConnectionHandler::new(
                                socket,
                                addr,
                                session_id,
                                registry,
                                default_match_id,
                                global_shutdown_rx,
                            );
                            if let Err(e) = handler.run().await {
                                warn!(session_id, %addr, %e, "connection terminated");
                            }
                        });
                    }
                    Err(e) => error!("failed to accept connection: {e}"),
                }
            }

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res {
                    if e.is_panic() {
                        error!("a connection handler panicked: {e:?}");
                    }
                }
            }
        }
    }

    info!("shutting down: signaling all tasks");
    let _ = ctx.shutdown_tx.send(());

    client_tasks.shutdown().await;
    info!("all client connections closed");

    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("timed out waiting for background tasks to finish");
    }

    info!("persisting all matches before exit");
    ctx.registry.shutdown_all().await;

    info!("server shutdown complete");
}
