use crate::dashboard::model::StatusModel;
use anyhow::{anyhow, Context, Result};
use std::{
    net::SocketAddr,
    sync::{mpsc, Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

pub fn status_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

/// Shares the latest [`StatusModel`] with an optional read-only HTTP endpoint.
pub struct StatusBridge {
    state: Arc<RwLock<StatusModel>>,
}

impl StatusBridge {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StatusModel::default())),
        }
    }

    /// Serves `GET /status` on a background thread; returns the bound address.
    pub fn spawn(&self, addr: SocketAddr) -> Result<SocketAddr> {
        let state = self.state.clone();
        let (bound_tx, bound_rx) = mpsc::channel();

        thread::spawn(move || {
            let state_filter = warp::any().map(move || state.clone());
            let route = warp::path("status")
                .and(warp::get())
                .and(state_filter)
                .map(|state: Arc<RwLock<StatusModel>>| {
                    let model = match state.read() {
                        Ok(guard) => guard.clone(),
                        Err(poisoned) => poisoned.into_inner().clone(),
                    };
                    warp::reply::json(&model)
                });

            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = bound_tx.send(Err(anyhow!(err).context("building status runtime")));
                    return;
                }
            };
            runtime.block_on(async move {
                match warp::serve(route).try_bind_ephemeral(addr) {
                    Ok((bound, server)) => {
                        let _ = bound_tx.send(Ok(bound));
                        server.await;
                    }
                    Err(err) => {
                        let _ = bound_tx.send(Err(anyhow!(err).context("binding status endpoint")));
                    }
                }
            });
        });

        let bound = bound_rx
            .recv()
            .context("status server thread exited before binding")??;
        log::info!("[status] serving http://{}/status", bound);
        Ok(bound)
    }

    pub fn publish(&self, model: StatusModel) {
        match self.state.write() {
            Ok(mut guard) => *guard = model,
            Err(poisoned) => *poisoned.into_inner() = model,
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> StatusModel {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for StatusBridge {
    fn default() -> Self {
        Self::new()
    }
}
