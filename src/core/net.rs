//! TCP connection to the session server
//!
//! Frames are JSON texts, one per line. A reader thread forwards incoming
//! lines over a channel so the main loop can drain them in arrival order
//! without blocking.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::transport::Channel;

/// What the reader thread delivered
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming {
    Frame(String),
    /// Nothing waiting right now
    Empty,
    /// The server closed the connection
    Closed,
}

/// Sending half, handed to the transport
pub struct TcpChannel {
    stream: TcpStream,
}

impl Channel for TcpChannel {
    fn send(&mut self, frame: &str) -> io::Result<()> {
        self.stream.write_all(frame.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()
    }
}

/// Receiving half
pub struct FrameReader {
    rx: Receiver<String>,
    running: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
    stream: TcpStream,
}

impl FrameReader {
    /// Next frame if one has arrived
    pub fn poll(&self) -> Incoming {
        match self.rx.try_recv() {
            Ok(frame) => Incoming::Frame(frame),
            Err(TryRecvError::Empty) => Incoming::Empty,
            Err(TryRecvError::Disconnected) => Incoming::Closed,
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Connect to `addr` and start the reader thread
pub fn connect(addr: &str) -> io::Result<(TcpChannel, FrameReader)> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    let read_stream = stream.try_clone()?;
    let shutdown_stream = stream.try_clone()?;

    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::channel::<String>();

    let thread_running = running.clone();
    let reader_thread = thread::spawn(move || {
        let reader = BufReader::new(read_stream);
        for line in reader.lines() {
            if !thread_running.load(Ordering::SeqCst) {
                break;
            }
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "read failed");
                    break;
                }
            }
        }
        debug!("reader thread exiting");
        thread_running.store(false, Ordering::SeqCst);
    });

    Ok((
        TcpChannel { stream },
        FrameReader {
            rx,
            running,
            reader_thread: Some(reader_thread),
            stream: shutdown_stream,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    fn wait_for(reader: &FrameReader) -> Incoming {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match reader.poll() {
                Incoming::Empty if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
                other => return other,
            }
        }
    }

    #[test]
    fn test_line_framing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(socket.try_clone().unwrap()).read_line(&mut line).unwrap();
            socket.write_all(b"{\"response\": [\"o\"]}\n\n").unwrap();
            line
        });

        let (mut channel, reader) = connect(&addr).unwrap();
        channel.send("{\"id\": 0, \"request\": [\"s\"]}").unwrap();

        assert_eq!(
            wait_for(&reader),
            Incoming::Frame("{\"response\": [\"o\"]}".to_string())
        );
        assert_eq!(server.join().unwrap(), "{\"id\": 0, \"request\": [\"s\"]}\n");
        assert_eq!(wait_for(&reader), Incoming::Closed);
    }
}
