use std::{fs, io::ErrorKind, os::unix::fs::FileTypeExt, path::Path};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    capacity::CheckInLedger,
    config::Config,
    core_loop::ShieldHandle,
    protocol::{ClientRequest, ServerResponse, parse_client_request},
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

/// NDJSON surface over a unix socket. Clients ingest text, record the daily
/// check-in, drive the explicit queue operations, and read pipeline state.
pub async fn run(config: &Config, handle: ShieldHandle, ledger: CheckInLedger) -> Result<()> {
    prepare_socket_path(&config.socket_path)?;
    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("unable to bind socket {}", config.socket_path.display()))?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<()>();
    let shutdown = CancellationToken::new();

    eprintln!(
        "shield listening on unix socket (NDJSON): {}",
        config.socket_path.display()
    );

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = exit_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let handle = handle.clone();
                        let ledger = ledger.clone();
                        let exit_tx = exit_tx.clone();
                        let client_shutdown = shutdown.child_token();
                        tokio::spawn(async move {
                            if let Err(err) =
                                handle_client(stream, handle, ledger, exit_tx, client_shutdown).await
                            {
                                tracing::warn!(
                                    target: "server",
                                    error = %format!("{err:#}"),
                                    "client handling failed"
                                );
                            }
                        });
                    }
                    Err(err) => tracing::warn!(target: "server", error = %err, "accept failed"),
                }
            }
        }
    };

    shutdown.cancel();
    cleanup_socket_path(&config.socket_path)?;
    match exit_reason {
        ExitReason::SocketMessage => eprintln!("shield stopped: received exit message"),
        ExitReason::Signal(signal_name) => eprintln!("shield stopped: received {signal_name}"),
    }

    Ok(())
}

async fn handle_client(
    stream: UnixStream,
    handle: ShieldHandle,
    ledger: CheckInLedger,
    exit_tx: mpsc::UnboundedSender<()>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { return Ok(()) };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match parse_client_request(line) {
            Ok(ClientRequest::Exit) => {
                let _ = exit_tx.send(());
                write_response(&mut write_half, &ServerResponse::Ok).await?;
                return Ok(());
            }
            Ok(request) => execute(request, &handle, &ledger).await,
            Err(err) => ServerResponse::Error {
                message: format!("invalid protocol message: {err}"),
            },
        };
        write_response(&mut write_half, &response).await?;
    }
}

async fn execute(
    request: ClientRequest,
    handle: &ShieldHandle,
    ledger: &CheckInLedger,
) -> ServerResponse {
    let result = match request {
        ClientRequest::Ingest { text, source } => {
            handle.ingest(text, source).await.map(|()| ServerResponse::Ok)
        }
        ClientRequest::CheckIn { percentage } => {
            ledger.record(percentage);
            Ok(ServerResponse::Ok)
        }
        ClientRequest::Promote { id } => handle
            .promote(id)
            .await
            .map(|promoted| ServerResponse::Promoted { promoted }),
        ClientRequest::ClearDeferred => handle
            .clear_deferred()
            .await
            .map(|cleared| ServerResponse::Cleared { cleared }),
        ClientRequest::Dismiss { id } => handle
            .dismiss(id)
            .await
            .map(|dismissed| ServerResponse::Dismissed { dismissed }),
        ClientRequest::State => Ok(ServerResponse::State {
            state: handle.view(),
        }),
        ClientRequest::SetProvider { provider } => {
            handle.set_provider(provider).await.map(|()| ServerResponse::Ok)
        }
        ClientRequest::SetProfile { profile } => {
            handle.set_profile(profile).await.map(|()| ServerResponse::Ok)
        }
        ClientRequest::Reset => handle.reset().await.map(|()| ServerResponse::Ok),
        ClientRequest::Exit => Ok(ServerResponse::Ok),
    };

    result.unwrap_or_else(|err| ServerResponse::Error {
        message: err.to_string(),
    })
}

async fn write_response(
    write_half: &mut tokio::net::unix::OwnedWriteHalf,
    response: &ServerResponse,
) -> Result<()> {
    let mut payload =
        serde_json::to_vec(response).context("failed to serialize server response")?;
    payload.push(b'\n');
    write_half
        .write_all(&payload)
        .await
        .context("failed to write server response")?;
    Ok(())
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}
