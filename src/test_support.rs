use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Respond(u16, String),
    DelayRespond(Duration, u16, String),
}

/// Local HTTP server answering each accepted connection with the next queued
/// behavior, recording the request target it was asked for.
#[derive(Debug)]
pub(crate) struct TestServer {
    pub(crate) base_url: String,
    targets: Arc<Mutex<Vec<String>>>,
    shutdown_tx: mpsc::Sender<()>,
    join_handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
        listener.set_nonblocking(true).expect("set nonblocking");
        let addr = listener.local_addr().expect("local addr");

        let targets = Arc::new(Mutex::new(Vec::new()));
        let targets_clone = Arc::clone(&targets);
        let queue = Arc::new(Mutex::new(VecDeque::from(behaviors)));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join_handle = std::thread::spawn(move || {
            while shutdown_rx.try_recv().is_err() {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let behavior = queue
                            .lock()
                            .expect("lock behaviors")
                            .pop_front()
                            .unwrap_or_else(|| Behavior::Respond(200, "[]".to_string()));
                        let targets = Arc::clone(&targets_clone);
                        std::thread::spawn(move || {
                            let _ = stream.set_nonblocking(false);
                            let target = read_request_target(&mut stream).unwrap_or_default();
                            targets.lock().expect("lock targets").push(target);
                            serve_behavior(&mut stream, behavior);
                        });
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            targets,
            shutdown_tx,
            join_handle: Some(join_handle),
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.targets.lock().expect("lock targets").len()
    }

    pub(crate) fn targets(&self) -> Vec<String> {
        self.targets.lock().expect("lock targets").clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    stream.set_read_timeout(Some(Duration::from_millis(200)))?;
    let mut buf = [0_u8; 1024];
    let mut data = Vec::new();
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => {
                data.extend_from_slice(&buf[..read]);
                if data.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(err) => return Err(err),
        }
    }
    let head = String::from_utf8_lossy(&data);
    let target = head
        .lines()
        .next()
        .and_then(|request_line| request_line.split_whitespace().nth(1))
        .unwrap_or_default();
    Ok(target.to_string())
}

fn serve_behavior(stream: &mut TcpStream, behavior: Behavior) {
    let (delay, status, body) = match behavior {
        Behavior::Respond(status, body) => (None, status, body),
        Behavior::DelayRespond(delay, status, body) => (Some(delay), status, body),
    };
    if let Some(delay) = delay {
        std::thread::sleep(delay);
    }
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let payload = body.as_bytes();
    let _ = write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    let _ = stream.write_all(payload);
    let _ = stream.flush();
}
