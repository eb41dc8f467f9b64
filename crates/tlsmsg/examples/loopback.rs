//! Loopback demo: a writer thread sends a message in several small pieces
//! with pauses in between, and the reader still gets it as one message.
//!
//! Run with:
//!   cargo run --example loopback
//!
//! In real use the stream would be a `rustls::StreamOwned` after the
//! handshake; any blocking `Read + Write` works through `IoChannel`.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use tlsmsg::{IoChannel, MessageReader, ReadConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let writer = thread::spawn(move || -> std::io::Result<()> {
        let mut stream = TcpStream::connect(addr)?;
        for piece in ["GET /index.html ", "HTTP/1.1\r\n", "Host: localhost\r\n\r\n"] {
            stream.write_all(piece.as_bytes())?;
            thread::sleep(Duration::from_millis(15));
        }
        Ok(())
    });

    let (stream, peer) = listener.accept()?;
    stream.set_read_timeout(Some(Duration::from_millis(20)))?;
    eprintln!("accepted {peer}");

    let mut reader = MessageReader::with_config(IoChannel::new(stream), ReadConfig::default());
    let message = reader.read_message()?;

    println!(
        "received {} bytes ({:?}):\n{}",
        message.len(),
        message.outcome(),
        String::from_utf8_lossy(message.as_bytes())
    );

    writer
        .join()
        .map_err(|_| "writer thread panicked")??;
    Ok(())
}
