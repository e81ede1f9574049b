// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Object-store gateway contract and reference implementations.
//!
//! The remote store is an external collaborator. The orchestrator only
//! talks to it through [`ObjectStoreGateway`], and every call is bounded by
//! [`call_with_timeout`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{Compression, ConvertError, Result};
use crate::io::cancel::CancellationToken;
use crate::io::formats::gcb;
use crate::io::write_atomic;
use crate::model::CanonicalModel;

/// Identifier of an object in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteObjectId(String);

impl RemoteObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote object store holding canonical models.
///
/// Implementations report failures as [`ConvertError::Gateway`]. Transport,
/// authentication and retry belong to the implementation.
pub trait ObjectStoreGateway: Send + Sync {
    /// Store `model` under `destination` and return its id.
    ///
    /// An upload that outlives the caller's timeout may still complete; see
    /// [`ConvertError::GatewayTimeout`].
    fn upload(&self, model: &CanonicalModel, destination: &str) -> Result<RemoteObjectId>;

    /// Retrieve a stored model.
    fn fetch(&self, id: &RemoteObjectId) -> Result<CanonicalModel>;
}

/// Run `call` on a helper thread and wait at most `timeout` for it.
///
/// On expiry the call keeps running detached and its result is discarded.
pub fn call_with_timeout<T, F>(operation: &str, timeout: Duration, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (sender, receiver) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name(format!("gateway-{operation}"))
        .spawn(move || {
            // The receiver is gone when the caller already timed out
            let _ = sender.send(call());
        })
        .map_err(|e| ConvertError::gateway(operation, format!("failed to spawn call: {e}")))?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "Gateway call timed out");
            Err(ConvertError::GatewayTimeout {
                operation: operation.to_string(),
                timeout,
            })
        }
        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(ConvertError::gateway(
            operation,
            "call ended without a result",
        )),
    }
}

/// In-process object store.
///
/// Useful for tests and local pipelines. An optional latency is slept before
/// every call.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    objects: Mutex<BTreeMap<RemoteObjectId, CanonicalModel>>,
    latency: Option<Duration>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a model directly, bypassing latency.
    pub fn insert(&self, id: RemoteObjectId, model: CanonicalModel) -> Result<()> {
        self.lock("insert")?.insert(id, model);
        Ok(())
    }

    fn lock(
        &self,
        operation: &str,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<RemoteObjectId, CanonicalModel>>> {
        self.objects
            .lock()
            .map_err(|_| ConvertError::gateway(operation, "object map lock poisoned"))
    }

    fn delay(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }
}

impl ObjectStoreGateway for InMemoryGateway {
    fn upload(&self, model: &CanonicalModel, destination: &str) -> Result<RemoteObjectId> {
        self.delay();
        let id = RemoteObjectId::new(format!("{destination}/{}", Uuid::new_v4()));
        self.lock("upload")?.insert(id.clone(), model.clone());
        debug!(id = %id, "Stored object in memory");
        Ok(id)
    }

    fn fetch(&self, id: &RemoteObjectId) -> Result<CanonicalModel> {
        self.delay();
        self.lock("fetch")?
            .get(id)
            .cloned()
            .ok_or_else(|| ConvertError::gateway("fetch", format!("object '{id}' not found")))
    }
}

/// Object store backed by a local directory of `geocodec-binary` files.
#[derive(Debug, Clone)]
pub struct LocalDirectoryGateway {
    root: PathBuf,
    compression: Compression,
}

impl LocalDirectoryGateway {
    /// Store objects under `root`, which must exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::Zstd,
        }
    }

    /// Payload compression of stored objects.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, operation: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(ConvertError::gateway(
                operation,
                format!("invalid object key '{key}'"),
            ));
        }
        Ok(self.root.join(format!("{key}.gcb")))
    }
}

impl ObjectStoreGateway for LocalDirectoryGateway {
    fn upload(&self, model: &CanonicalModel, destination: &str) -> Result<RemoteObjectId> {
        let path = self.object_path("upload", destination)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConvertError::gateway("upload", e.to_string()))?;
        }
        let bytes = gcb::encode(model, self.compression, &CancellationToken::new())?;
        write_atomic(&path, |f| {
            std::io::Write::write_all(f, &bytes)?;
            Ok(())
        })
        .map_err(|e| ConvertError::gateway("upload", e.to_string()))?;
        debug!(path = %path.display(), "Stored object on disk");
        Ok(RemoteObjectId::new(destination))
    }

    fn fetch(&self, id: &RemoteObjectId) -> Result<CanonicalModel> {
        let path = self.object_path("fetch", id.as_str())?;
        let bytes = std::fs::read(&path)
            .map_err(|e| ConvertError::gateway("fetch", format!("{}: {e}", path.display())))?;
        gcb::decode(&bytes, &CancellationToken::new())
    }
}
