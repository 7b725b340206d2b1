//! Client credential store, rotation cursors, and the blocked-proxy set
//!
//! All shared mutable state lives here behind sharded locks. Mutations of
//! one client's record (proxy list, cursor) go through the entry's
//! exclusive guard, so they are strictly serialized per client while
//! different clients proceed in parallel.

mod persist;

use std::collections::HashSet;
use std::path::PathBuf;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use crate::error::{CarouselError, Result};
use crate::models::{ClientRecord, ProxyEndpoint, StoreDocument};

/// Runtime state for one client. The cursor is process state only;
/// it is never persisted and starts at 0 after every load.
#[derive(Debug)]
pub struct ClientEntry {
    pub secret: String,
    pub proxies: Vec<ProxyEndpoint>,
    pub cursor: usize,
}

/// Single source of truth for client identity and proxy membership.
#[derive(Debug)]
pub struct ClientStore {
    clients: DashMap<String, ClientEntry>,
    path: PathBuf,
    flush_lock: tokio::sync::Mutex<()>,
}

impl ClientStore {
    /// Create an empty store that will persist to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            clients: DashMap::new(),
            path,
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a store from a loaded document. Cursors start at 0.
    pub fn from_document(doc: StoreDocument, path: PathBuf) -> Self {
        let store = Self::new(path);
        for (name, record) in doc.clients {
            store.clients.insert(
                name,
                ClientEntry {
                    secret: record.password,
                    proxies: record.proxies,
                    cursor: 0,
                },
            );
        }
        store
    }

    /// Register a new client with an initial proxy batch.
    ///
    /// The batch is validated atomically: if any entry is malformed, or
    /// duplicates another entry's canonical form, the whole operation
    /// fails and nothing is stored. Returns the number of proxies stored.
    pub fn create_client(&self, name: &str, secret: &str, raw_proxies: &[String]) -> Result<usize> {
        let mut proxies = Vec::with_capacity(raw_proxies.len());
        let mut seen = HashSet::new();
        let mut rejected = Vec::new();

        for raw in raw_proxies {
            match ProxyEndpoint::parse(raw) {
                Ok(proxy) => {
                    if seen.insert(proxy.canonical()) {
                        proxies.push(proxy);
                    } else {
                        rejected.push(format!("{}: duplicate entry", raw.trim()));
                    }
                }
                Err(e) => rejected.push(e.to_string()),
            }
        }

        if !rejected.is_empty() {
            return Err(CarouselError::ProxyBatchRejected {
                rejected: rejected.len(),
                entries: rejected,
            });
        }

        match self.clients.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CarouselError::ClientExists(name.to_string())),
            Entry::Vacant(vacant) => {
                let count = proxies.len();
                vacant.insert(ClientEntry {
                    secret: secret.to_string(),
                    proxies,
                    cursor: 0,
                });
                Ok(count)
            }
        }
    }

    /// Remove a client. The cursor dies with the entry. Returns the
    /// number of proxies that were in the pool.
    pub fn delete_client(&self, name: &str) -> Result<usize> {
        self.clients
            .remove(name)
            .map(|(_, entry)| entry.proxies.len())
            .ok_or_else(|| CarouselError::ClientNotFound(name.to_string()))
    }

    /// Append one proxy to a client's pool. De-dup is exact equality of
    /// the canonical form. Returns the new pool size.
    pub fn add_proxy(&self, name: &str, spec: &str) -> Result<usize> {
        let proxy = ProxyEndpoint::parse(spec)?;

        let mut entry = self
            .clients
            .get_mut(name)
            .ok_or_else(|| CarouselError::ClientNotFound(name.to_string()))?;

        if entry.proxies.contains(&proxy) {
            return Err(CarouselError::DuplicateProxy);
        }

        entry.proxies.push(proxy);
        Ok(entry.proxies.len())
    }

    /// Remove one proxy by canonical-form match. The cursor is adjusted
    /// so it stays a valid index: removals before it shift it back by
    /// one, removing the current entry leaves it on the successor
    /// (wrapping to 0 past the end), and an emptied pool resets it to 0.
    /// Returns the removed proxy and the new pool size.
    pub fn remove_proxy(&self, name: &str, spec: &str) -> Result<(ProxyEndpoint, usize)> {
        let proxy = ProxyEndpoint::parse(spec)?;

        let mut entry = self
            .clients
            .get_mut(name)
            .ok_or_else(|| CarouselError::ClientNotFound(name.to_string()))?;

        let idx = entry
            .proxies
            .iter()
            .position(|p| *p == proxy)
            .ok_or(CarouselError::ProxyNotFound)?;

        let removed = entry.proxies.remove(idx);

        if entry.proxies.is_empty() {
            entry.cursor = 0;
        } else if idx < entry.cursor {
            entry.cursor -= 1;
        } else if entry.cursor >= entry.proxies.len() {
            entry.cursor = 0;
        }

        let total = entry.proxies.len();
        Ok((removed, total))
    }

    /// Read the proxy at the cursor without mutating it.
    pub fn current(&self, name: &str) -> Result<(ProxyEndpoint, usize, usize)> {
        let entry = self
            .clients
            .get(name)
            .ok_or_else(|| CarouselError::ClientNotFound(name.to_string()))?;

        if entry.proxies.is_empty() {
            return Err(CarouselError::NoProxies);
        }

        let index = entry.cursor;
        Ok((entry.proxies[index].clone(), index, entry.proxies.len()))
    }

    /// Advance the cursor to the next proxy, wrapping at the end of the
    /// pool. The exclusive entry guard serializes concurrent rotations
    /// of the same client.
    pub fn rotate(&self, name: &str) -> Result<(ProxyEndpoint, usize, usize)> {
        let mut entry = self
            .clients
            .get_mut(name)
            .ok_or_else(|| CarouselError::ClientNotFound(name.to_string()))?;

        if entry.proxies.is_empty() {
            return Err(CarouselError::NoProxies);
        }

        entry.cursor = (entry.cursor + 1) % entry.proxies.len();
        let index = entry.cursor;
        Ok((entry.proxies[index].clone(), index, entry.proxies.len()))
    }

    /// Validate an end-client secret. Comparison work is constant-time
    /// in the provided secret, and unknown names burn the same work so
    /// they are indistinguishable from a wrong password.
    pub fn verify_secret(&self, name: &str, password: &str) -> bool {
        match self.clients.get(name) {
            Some(entry) => secrets_match(password, &entry.secret),
            None => {
                let _ = secrets_match(password, "carousel-no-such-client");
                false
            }
        }
    }

    /// Ordered listing for the management surface: (name, pool size,
    /// cursor), sorted by name. Secrets are not included.
    pub fn list(&self) -> Vec<(String, usize, usize)> {
        let mut rows: Vec<_> = self
            .clients
            .iter()
            .map(|entry| (entry.key().clone(), entry.proxies.len(), entry.cursor))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// (client count, total proxy count across all pools)
    pub fn totals(&self) -> (usize, usize) {
        let clients = self.clients.len();
        let proxies = self.clients.iter().map(|e| e.proxies.len()).sum();
        (clients, proxies)
    }

    /// Number of proxy entries shared between clients. Diagnostic only:
    /// overlapping pools make concurrent rotation observable across
    /// tenants.
    pub fn overlapping_count(&self) -> usize {
        let mut total = 0;
        let mut unique = HashSet::new();
        for entry in self.clients.iter() {
            for proxy in &entry.proxies {
                total += 1;
                unique.insert(proxy.canonical());
            }
        }
        total - unique.len()
    }

    /// Snapshot the whole store for persistence. Cursors are excluded.
    pub fn snapshot(&self) -> StoreDocument {
        let mut doc = StoreDocument::empty();
        for entry in self.clients.iter() {
            doc.clients.insert(
                entry.key().clone(),
                ClientRecord {
                    password: entry.secret.clone(),
                    proxies: entry.proxies.clone(),
                },
            );
        }
        doc
    }
}

/// Constant-time secret comparison. Runtime depends only on the length
/// of the provided secret, not on where the first mismatch occurs.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = provided.as_bytes();
    let b = expected.as_bytes();

    let mut diff = a.len() ^ b.len();
    for (x, y) in a.iter().zip(b.iter().cycle()) {
        diff |= (x ^ y) as usize;
    }
    diff == 0
}

/// Proxies that failed an egress check. Advisory data for operators:
/// rotation never consults this set.
#[derive(Default)]
pub struct BlockedProxies {
    inner: DashSet<String>,
}

impl BlockedProxies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, canonical: String) {
        self.inner.insert(canonical);
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.inner.contains(canonical)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
