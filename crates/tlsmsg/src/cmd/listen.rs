use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tlsmsg_channel::{IoChannel, SecureChannel};
use tlsmsg_io::{
    write_full_message, AbortReason, Backoff, Message, MessageReader, ReadOutcome, ThreadSleep,
};

use crate::cmd::ListenArgs;
use crate::exit::{io_error, message_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.read.read_config()?;
    let record_timeout = args.read.record_timeout()?;

    let listener = TcpListener::bind(&args.addr)
        .map_err(|err| io_error(&format!("bind {} failed", args.addr), err))?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!(addr = %local, "listening");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let (stream, peer) = listener
            .accept()
            .map_err(|err| io_error("accept failed", err))?;
        stream
            .set_read_timeout(Some(record_timeout))
            .map_err(|err| io_error("configuring socket failed", err))?;
        let peer = peer.to_string();
        tracing::debug!(%peer, "accepted connection");

        let mut session = Session {
            reader: MessageReader::with_config(IoChannel::new(stream), config.clone()),
            peer,
            echo: args.echo,
        };

        while running.load(Ordering::SeqCst) {
            match session.next_event()? {
                SessionEvent::Message(message) => {
                    print_message(&message, &session.peer, format);
                    printed = printed.saturating_add(1);

                    if let Some(count) = args.count {
                        if printed >= count {
                            return Ok(SUCCESS);
                        }
                    }
                }
                SessionEvent::Idle => continue,
                SessionEvent::Closed => break,
            }
        }
    }

    Ok(SUCCESS)
}

enum SessionEvent {
    Message(Message),
    Idle,
    Closed,
}

/// One accepted connection, read a message at a time.
struct Session<C, B = ThreadSleep> {
    reader: MessageReader<C, B>,
    peer: String,
    echo: bool,
}

impl<C: SecureChannel, B: Backoff> Session<C, B> {
    fn next_event(&mut self) -> CliResult<SessionEvent> {
        let message = self
            .reader
            .read_message()
            .map_err(|err| message_error("receive failed", err))?;

        if message.end_of_connection() {
            tracing::debug!(peer = %self.peer, "peer closed connection");
            return Ok(SessionEvent::Closed);
        }

        match message.outcome() {
            ReadOutcome::Aborted(AbortReason::FirstMessageTimeout { .. }) => {
                return Ok(SessionEvent::Idle)
            }
            ReadOutcome::Aborted(reason) if message.is_empty() => {
                tracing::warn!(peer = %self.peer, %reason, "dropping connection");
                return Ok(SessionEvent::Closed);
            }
            _ => {}
        }

        if self.echo {
            if let Err(err) = write_full_message(self.reader.get_mut(), message.as_bytes()) {
                tracing::warn!(
                    peer = %self.peer,
                    error = %err,
                    "echo failed, dropping connection"
                );
                return Ok(SessionEvent::Closed);
            }
        }

        Ok(SessionEvent::Message(message))
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
