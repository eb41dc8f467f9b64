use std::fs;
use std::net::TcpStream;

use tlsmsg_channel::{IoChannel, SecureChannel};
use tlsmsg_io::{write_full_message, Backoff, Message, MessageReader, ReadOutcome};

use crate::cmd::SendArgs;
use crate::exit::{abort_error, io_error, message_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.read.read_config()?;
    let record_timeout = args.read.record_timeout()?;

    let stream = TcpStream::connect(&args.addr)
        .map_err(|err| io_error(&format!("connect to {} failed", args.addr), err))?;
    stream
        .set_read_timeout(Some(record_timeout))
        .map_err(|err| io_error("configuring socket failed", err))?;
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| args.addr.clone());

    let mut channel = IoChannel::new(stream);
    let payload = resolve_payload(&args)?;
    let written = write_full_message(&mut channel, &payload)
        .map_err(|err| message_error("send failed", err))?;
    tracing::info!(bytes = written, %peer, "message sent");

    if args.wait {
        let mut reader = MessageReader::with_config(channel, config);
        let reply = await_reply(&mut reader)?;
        print_message(&reply, &peer, format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Read one reply, turning anything but a delivered message into an error.
fn await_reply<C: SecureChannel, B: Backoff>(
    reader: &mut MessageReader<C, B>,
) -> CliResult<Message> {
    let reply = reader
        .read_message()
        .map_err(|err| message_error("receive failed", err))?;

    if reply.end_of_connection() {
        return Err(CliError::new(
            FAILURE,
            "receive failed: connection closed before reply",
        ));
    }
    match reply.outcome() {
        ReadOutcome::Aborted(reason) if reply.is_empty() => {
            Err(abort_error("receive failed", reason))
        }
        ReadOutcome::Aborted(reason) => {
            tracing::warn!(%reason, bytes = reply.len(), "reply truncated");
            Ok(reply)
        }
        ReadOutcome::Complete => Ok(reply),
    }
}
