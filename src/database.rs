//! `ChartDatabase`: the public handle wrapping shared state, the
//! background loader task, and the collaborators (provider, PDF bridge,
//! HTTP client) it drives.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ChartCacheConfig;
use crate::disk_layout;
use crate::loader;
use crate::pdf_bridge::PdfBridge;
use crate::provider::ChartProvider;
use crate::state::State;

pub(crate) struct Inner {
    pub(crate) state: Mutex<State>,
    pub(crate) notify: Notify,
    pub(crate) provider: Arc<dyn ChartProvider>,
    pub(crate) pdf: PdfBridge,
    pub(crate) http: reqwest::Client,
    pub(crate) config: ChartCacheConfig,
}

/// A running chart cache: one naming index, one LRU-bounded surface cache,
/// and one background loader task, all sharing a single coarse mutex.
pub struct ChartDatabase {
    pub(crate) inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChartDatabase {
    /// Bring up a database against `provider`: runs the obsolete-AIRAC
    /// sweep, calls the provider's `init`, and spawns the background
    /// loader task. Propagates provider init failure; the sweep itself is
    /// best-effort and never fails this call.
    pub async fn open(
        config: ChartCacheConfig,
        provider: Arc<dyn ChartProvider>,
    ) -> anyhow::Result<Self> {
        disk_layout::sweep_obsolete_airac(&config.cache_dir, provider.name(), config.airac_cycle);

        let mut http_builder = reqwest::Client::builder();
        if let Some(proxy) = &config.proxy {
            http_builder = http_builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let http = http_builder.build()?;

        let pdf = PdfBridge::new(config.pdf_tools.clone());
        let state = State::new(config.load_limit_bytes);

        let inner = Arc::new(Inner {
            state: Mutex::new(state),
            notify: Notify::new(),
            provider,
            pdf,
            http,
            config,
        });

        let db = Self {
            inner: inner.clone(),
            worker: Mutex::new(None),
        };

        // `init` gets a handle back so eager providers can call
        // `add_airport`/`add_chart` directly; its failure aborts database
        // creation before the worker ever starts.
        db.inner.provider.init(&db).await?;

        let worker = tokio::spawn(loader::run(inner.clone()));
        *db.worker.lock().unwrap() = Some(worker);
        info!(provider = db.inner.provider.name(), "chart database opened");

        Ok(db)
    }

    /// Signal the loader task to stop, wait for it to drain its current
    /// item, and release the provider.
    pub async fn close(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.closing = true;
        }
        self.inner.notify.notify_waiters();

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.provider.fini().await;
        info!(provider = self.inner.provider.name(), "chart database closed");
    }
}
