//! The line loop: read a command, dispatch it, write its output.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{error, info, warn};

use crate::service::ControlService;

/// Serve control lines from `input` until end of input or `shutdown`
/// resolves.
///
/// `shutdown` is raced against both reading and dispatching, so a control
/// program that never returns cannot hold the loop. Unparseable lines and
/// failed commands are logged and the loop continues.
///
/// # Errors
///
/// Returns an error if `input` cannot be read or `output` written.
pub async fn serve<R, W, F>(
    control: &ControlService,
    input: R,
    mut output: W,
    shutdown: F,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = input.lines();

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("Shutdown requested, leaving control loop");
                return Ok(());
            }
            more = step(control, &mut lines, &mut output) => {
                if !more? {
                    return Ok(());
                }
            }
        }
    }
}

/// Handle one line. Returns false at end of input.
async fn step<R, W>(
    control: &ControlService,
    lines: &mut Lines<R>,
    output: &mut W,
) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let line = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            info!("End of input, initiating shutdown");
            return Ok(false);
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!(error = %e, "Skipping unreadable line");
            return Ok(true);
        }
        Err(e) => return Err(e),
    };

    match control.dispatch(&line).await {
        Ok(lines) => {
            for out in lines {
                output.write_all(out.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            output.flush().await?;
        }
        Err(e) if e.is_syntax() => {
            warn!(line = %line.trim(), error = %e, "Ignoring line");
        }
        Err(e) => {
            error!(line = %line.trim(), error = %e, "Command failed");
        }
    }
    Ok(true)
}
