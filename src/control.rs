//! Remote control via Unix socket
//!
//! Accepts line-oriented commands that drive the sky from another
//! process: `scroll <progress>`, `resize <W>x<H>` and `quit`.

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{debug, info, warn};

const SOCKET_PATH: &str = "/tmp/skyfacer.sock";

/// Commands that can be sent over the socket
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Absolute scroll progress in [0, 1]
    Scroll(f32),
    Resize(u32, u32),
    Quit,
}

/// Controller that listens for commands on a Unix socket
pub struct Controller {
    receiver: Receiver<Command>,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Create a new controller listening on the Unix socket
    pub fn new() -> Result<Self, String> {
        // Stale socket from a previous run
        let _ = std::fs::remove_file(SOCKET_PATH);

        let listener = UnixListener::bind(SOCKET_PATH)
            .map_err(|e| format!("Failed to bind socket: {}", e))?;

        listener
            .set_nonblocking(true)
            .map_err(|e| format!("Failed to set non-blocking: {}", e))?;

        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("control-socket".into())
            .spawn(move || Self::listener_loop(listener, sender))
            .map_err(|e| format!("Failed to spawn listener: {}", e))?;

        info!("Control socket listening on {}", SOCKET_PATH);

        Ok(Self {
            receiver,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: UnixListener, sender: Sender<Command>) {
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        Self::handle_client(stream, sender);
                    });
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(std::time::Duration::from_millis(50));
                },
                Err(e) => {
                    warn!("Control socket closed: {}", e);
                    break;
                },
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: Sender<Command>) {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            match Self::parse_command(&line) {
                Some(cmd) => {
                    if sender.send(cmd).is_err() {
                        break;
                    }
                },
                None => debug!("Ignoring control command {:?}", line.trim()),
            }
        }
    }

    fn parse_command(line: &str) -> Option<Command> {
        let line = line.trim().to_lowercase();
        let mut parts = line.split_whitespace();
        match (parts.next()?, parts.next(), parts.next()) {
            ("q" | "quit" | "exit", None, None) => Some(Command::Quit),
            ("scroll", Some(value), None) => {
                let p: f32 = value.parse().ok()?;
                if p.is_finite() {
                    Some(Command::Scroll(p.clamp(0.0, 1.0)))
                } else {
                    None
                }
            },
            ("resize", Some(size), None) => {
                let (w, h) = size.split_once('x')?;
                let (w, h): (u32, u32) = (w.parse().ok()?, h.parse().ok()?);
                if w > 0 && h > 0 {
                    Some(Command::Resize(w, h))
                } else {
                    None
                }
            },
            _ => None,
        }
    }

    /// Get any pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(cmd) = self.receiver.try_recv() {
            commands.push(cmd);
        }
        commands
    }

    pub fn socket_path() -> &'static str {
        SOCKET_PATH
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(SOCKET_PATH);
    }
}
