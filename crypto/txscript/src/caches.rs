use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Bounded cache with random eviction. Clones share the same storage.
#[derive(Clone)]
pub struct Cache<K, V> {
    capacity: usize,
    inner: Arc<RwLock<Inner<K, V>>>,
}

struct Inner<K, V> {
    map: HashMap<K, (V, usize)>,
    // keys by slot, so a random victim can be picked in O(1)
    keys: Vec<K>,
}

impl<K: Hash + Eq + Clone, V: Clone> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Arc::new(RwLock::new(Inner { map: HashMap::with_capacity(capacity), keys: Vec::with_capacity(capacity) })),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().map.get(key).map(|(value, _)| value.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.read().map.contains_key(key)
    }

    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.write();
        if let Some(slot) = inner.map.get_mut(&key) {
            slot.0 = value;
            return;
        }
        if inner.keys.len() >= self.capacity {
            let victim = rand::thread_rng().gen_range(0..inner.keys.len());
            inner.evict(victim);
        }
        let index = inner.keys.len();
        inner.keys.push(key.clone());
        inner.map.insert(key, (value, index));
    }

    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K: Hash + Eq + Clone, V> Inner<K, V> {
    fn evict(&mut self, index: usize) {
        let removed = self.keys.swap_remove(index);
        self.map.remove(&removed);
        if let Some(moved) = self.keys.get(index) {
            if let Some(slot) = self.map.get_mut(moved) {
                slot.1 = index;
            }
        }
    }
}
