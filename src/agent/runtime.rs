//! Agent serving loop: UDP receive plus a small worker pool.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::SnmpAgent;
use crate::engine::transport::bind_udp_socket;
use crate::error::{Error, Result};

/// Request handlers per agent.
pub const WORKER_POOL_SIZE: usize = 3;

/// Largest datagram an agent will accept.
const MAX_DATAGRAM: usize = 65_535;

/// Queue depth between the receive loop and the workers.
const QUEUE_DEPTH: usize = 64;

impl SnmpAgent {
    /// Bind the agent's UDP endpoint.
    pub async fn bind(&self) -> Result<UdpSocket> {
        bind_udp_socket(self.address()).await.map_err(|e| Error::Bind {
            agent: self.name().to_string(),
            address: self.address(),
            source: e,
        })
    }

    /// Bind and serve until `shutdown` flips.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Result<()> {
        let socket = self.bind().await?;
        self.serve(socket, shutdown).await
    }

    /// Serve an already-bound socket until `shutdown` flips.
    pub async fn serve(
        self: Arc<Self>,
        socket: UdpSocket,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let socket = Arc::new(socket);
        info!(agent = %self.name(), address = %self.address(), "agent listening");

        let (tx, rx) = mpsc::channel::<(Vec<u8>, SocketAddr)>(QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(WORKER_POOL_SIZE);
        for worker in 0..WORKER_POOL_SIZE {
            workers.push(tokio::spawn(worker_loop(
                self.clone(),
                socket.clone(),
                rx.clone(),
                worker,
            )));
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(agent = %self.name(), "shutdown requested");
                    break;
                }
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            if tx.send((buf[..len].to_vec(), peer)).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(agent = %self.name(), %err, "receive error");
                        }
                    }
                }
            }
        }

        // Dropping the sender drains and stops the workers.
        drop(tx);
        for worker in workers {
            let _ = worker.await;
        }
        info!(agent = %self.name(), "agent stopped");
        Ok(())
    }
}

async fn worker_loop(
    agent: Arc<SnmpAgent>,
    socket: Arc<UdpSocket>,
    rx: Arc<Mutex<mpsc::Receiver<(Vec<u8>, SocketAddr)>>>,
    worker: usize,
) {
    loop {
        let job = rx.lock().await.recv().await;
        let Some((datagram, peer)) = job else {
            break;
        };
        trace!(agent = %agent.name(), worker, %peer, bytes = datagram.len(), "handling datagram");
        if let Some(reply) = agent.processor().process(&datagram, peer)
            && let Err(err) = socket.send_to(&reply, peer).await
        {
            warn!(agent = %agent.name(), %peer, %err, "could not send response");
        }
    }
}
