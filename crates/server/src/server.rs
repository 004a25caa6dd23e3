//! The DynamicKV server: store bootstrap and the accept loop.
//!
//! One tokio task per connection, one request per connection. The request
//! timeout covers reading the request off the wire; once a mutation
//! reaches the store it runs to completion, so a timed-out request is
//! either fully committed or never started - never half-applied.

use crate::config::ServerConfig;
use crate::http::{read_request, ReadError, Response};
use crate::router::Gateway;
use dynamickv_core::{Result, TimeRandomIds};
use dynamickv_engine::Store;
use dynamickv_storage::FileBackend;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// How long a client may take to deliver a complete request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A running DynamicKV instance: configuration, store, gateway.
pub struct Server {
    config: ServerConfig,
    store: Arc<Store>,
    gateway: Arc<Gateway>,
}

impl Server {
    /// Open the store behind `config` and build the gateway.
    ///
    /// Creates the data directory (and a default `dynamickv.toml`) on
    /// first run, then replays every collection log.
    pub fn open(config: ServerConfig) -> Result<Self> {
        let mode = config.durability_mode()?;
        std::fs::create_dir_all(&config.data_dir)?;
        ServerConfig::write_default_if_missing(&config.data_dir)?;

        let backend = Arc::new(FileBackend::new(&config.data_dir, mode));
        let store = Arc::new(Store::open(backend, Arc::new(TimeRandomIds))?);
        info!(
            data_dir = %config.data_dir.display(),
            durability = %mode.description(),
            collections = store.collection_names().len(),
            "store opened"
        );

        let gateway = Arc::new(Gateway::new(store.clone(), config.search_collection.clone()));
        Ok(Server {
            config,
            store,
            gateway,
        })
    }

    /// Handle to the underlying store
    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    /// Handle to the request router
    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    /// Bind the configured address and serve until the task is cancelled.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!(addr = %listener.local_addr()?, "listening for HTTP connections");
        Self::serve(listener, self.gateway.clone()).await
    }

    /// Accept loop over an already-bound listener.
    ///
    /// Split out from [`Server::run`] so tests can bind an ephemeral port
    /// themselves.
    pub async fn serve(listener: TcpListener, gateway: Arc<Gateway>) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let gateway = gateway.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, gateway).await;
            });
        }
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, gateway: Arc<Gateway>) {
    let request = match tokio::time::timeout(REQUEST_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(request)) => request,
        Ok(Err(ReadError::Closed)) => return,
        Ok(Err(ReadError::Io(e))) => {
            debug!(%peer, error = %e, "transport error while reading request");
            return;
        }
        Ok(Err(ReadError::Malformed(msg))) => {
            debug!(%peer, %msg, "malformed request");
            respond(&mut stream, Response::message(400, &msg)).await;
            return;
        }
        Ok(Err(ReadError::TooLarge(msg))) => {
            warn!(%peer, %msg, "oversized request");
            respond(&mut stream, Response::message(400, &msg)).await;
            return;
        }
        Err(_) => {
            debug!(%peer, "client too slow delivering request");
            respond(&mut stream, Response::message(408, "request timed out")).await;
            return;
        }
    };

    let response = gateway.handle(&request);
    respond(&mut stream, response).await;
}

async fn respond(stream: &mut TcpStream, response: Response) {
    if let Err(e) = response.write(stream).await {
        debug!(error = %e, "failed to write response");
    }
    let _ = tokio::io::AsyncWriteExt::shutdown(stream).await;
}
