//! Signal handling
//!
//! Signals only set pending flags on [`Control`]; the runner acts on them
//! between chunks and between tracks.
//!
//! | Signal | Effect |
//! |---|---|
//! | SIGHUP | reread the playlist after the current track |
//! | SIGUSR1 | skip the current track |
//! | SIGINT, SIGTERM | stop streaming |

use relaycast_stream::Control;
use std::io;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

pub fn install(control: Arc<Control>) -> io::Result<JoinHandle<()>> {
    let mut hup = signal(SignalKind::hangup())?;
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = hup.recv() => {
                    tracing::info!("SIGHUP received, will reread playlist after this track");
                    control.request_reread();
                }
                Some(()) = usr1.recv() => {
                    tracing::info!("SIGUSR1 received, skipping current track");
                    control.request_skip();
                }
                Some(()) = int.recv() => {
                    tracing::info!("SIGINT received, shutting down");
                    control.request_quit();
                }
                Some(()) = term.recv() => {
                    tracing::info!("SIGTERM received, shutting down");
                    control.request_quit();
                }
                else => break,
            }
        }
    }))
}
