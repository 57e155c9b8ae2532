//! Bounded in-process cache with LRU eviction and optional TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use super::RequestCache;

const NIL: usize = usize::MAX;

/// LRU + TTL cache over an arena of doubly-linked nodes plus a key index.
///
/// Recency updates and evictions are O(1): a successful `get` or any `set`
/// relinks the entry to the most-recently-used position instead of
/// reinserting it into an ordered map. Recency reflects the last successful
/// `get` or `set`, not insertion time.
pub struct BoundedMemoryCache {
    inner: Mutex<LruInner>,
}

struct LruInner {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    /// Most-recently-used node, or `NIL` when empty.
    head: usize,
    /// Least-recently-used node, or `NIL` when empty.
    tail: usize,
    max_entries: usize,
    ttl: Option<Duration>,
}

struct Node {
    key: String,
    value: Value,
    expires_at: Option<Instant>,
    prev: usize,
    next: usize,
}

impl BoundedMemoryCache {
    /// Create a cache holding at most `max_entries` live entries (coerced to
    /// at least 1), each expiring `ttl` after its last `set` when a TTL is
    /// given.
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                nodes: Vec::new(),
                free: Vec::new(),
                index: HashMap::new(),
                head: NIL,
                tail: NIL,
                max_entries: max_entries.max(1),
                ttl,
            }),
        }
    }

    /// Current number of entries, expired ones included until they are
    /// touched.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RequestCache for BoundedMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        let idx = *inner.index.get(key)?;

        let expired = inner.node(idx).expires_at.is_some_and(|at| Instant::now() > at);
        if expired {
            inner.remove(idx);
            return None;
        }

        inner.unlink(idx);
        inner.push_front(idx);
        Some(inner.node(idx).value.clone())
    }

    async fn set(&self, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(&idx) = inner.index.get(key) {
            inner.remove(idx);
        }

        let expires_at = inner.ttl.map(|ttl| Instant::now() + ttl);
        inner.insert(key.to_string(), value, expires_at);

        while inner.index.len() > inner.max_entries {
            inner.evict_lru();
        }
    }

    async fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.clear();
        inner.free.clear();
        inner.index.clear();
        inner.head = NIL;
        inner.tail = NIL;
    }
}

impl LruInner {
    fn node(&self, idx: usize) -> &Node {
        self.nodes[idx].as_ref().expect("live node")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.nodes[idx].as_mut().expect("live node")
    }

    /// Detach a node from the recency list without freeing it.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }
    }

    /// Attach a detached node as most-recently-used.
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    /// Allocate a node for `key` and link it as most-recently-used.
    fn insert(&mut self, key: String, value: Value, expires_at: Option<Instant>) {
        let node = Node {
            key: key.clone(),
            value,
            expires_at,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    /// Unlink and free a node, removing it from the index.
    fn remove(&mut self, idx: usize) {
        self.unlink(idx);
        let node = self.nodes[idx].take().expect("live node");
        self.index.remove(&node.key);
        self.free.push(idx);
    }

    fn evict_lru(&mut self) {
        if self.tail != NIL {
            self.remove(self.tail);
        }
    }
}
