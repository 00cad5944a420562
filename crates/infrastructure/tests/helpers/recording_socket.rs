#![allow(dead_code)]
use async_trait::async_trait;
use natc_application::ports::DatagramSocket;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};

/// In-memory datagram socket: tests push inbound datagrams and read back
/// whatever the listener wrote.
pub struct RecordingSocket {
    local: SocketAddr,
    inbound_tx: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>,
    writes: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    written: Notify,
}

impl RecordingSocket {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            local: "100.64.1.1:53".parse().unwrap(),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            writes: Mutex::new(Vec::new()),
            written: Notify::new(),
        }
    }

    pub fn push(&self, datagram: Vec<u8>, from: SocketAddr) {
        self.inbound_tx.send((datagram, from)).unwrap();
    }

    pub fn writes(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.writes.lock().unwrap().clone()
    }

    /// Waits until at least `count` datagrams were written.
    pub async fn wait_for_writes(&self, count: usize) -> Vec<(Vec<u8>, SocketAddr)> {
        loop {
            let notified = self.written.notified();
            let writes = self.writes();
            if writes.len() >= count {
                return writes;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DatagramSocket for RecordingSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some((datagram, from)) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok((len, from))
            }
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "socket closed")),
        }
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.writes.lock().unwrap().push((buf.to_vec(), target));
        self.written.notify_waiters();
        Ok(buf.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}
