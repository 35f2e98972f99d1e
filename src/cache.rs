//! Subset node cache
//!
//! Deduplicates equivalent subproblems reached through different split
//! orders: two paths that arrive at the same active sample subset resolve
//! to the same decision-point node, turning the search tree into a shared
//! AND/OR graph. The matching strategy lives behind the [`NodeCache`]
//! trait so it can be swapped without touching the search engine.
use crate::node::OrNodeId;
use hashbrown::HashMap;

/// Lookup table from a subset identity to its decision-point node.
pub trait NodeCache {
    /// Find the node previously registered for this subset identity.
    fn get(&self, key: &[u64]) -> Option<OrNodeId>;
    /// Register a node under a subset identity.
    fn put(&mut self, key: &[u64], node: OrNodeId);
}

/// Exact cache keyed on the full active-sample bitset. Two subsets map to
/// the same node only when they contain exactly the same samples.
pub struct BitsetCache {
    map: HashMap<Box<[u64]>, OrNodeId>,
}

impl BitsetCache {
    /// Create a cache sized for a dataset with `num_samples` samples.
    pub fn with_capacity(num_samples: usize) -> Self {
        BitsetCache {
            map: HashMap::with_capacity(num_samples),
        }
    }

    /// Number of distinct subsets registered.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl NodeCache for BitsetCache {
    fn get(&self, key: &[u64]) -> Option<OrNodeId> {
        self.map.get(key).copied()
    }

    fn put(&mut self, key: &[u64], node: OrNodeId) {
        self.map.insert(key.into(), node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_put() {
        let mut cache = BitsetCache::with_capacity(8);
        let key = [0b1010u64];
        assert!(cache.get(&key).is_none());
        cache.put(&key, OrNodeId(3));
        assert_eq!(cache.get(&key), Some(OrNodeId(3)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let mut cache = BitsetCache::with_capacity(8);
        cache.put(&[0b1010u64], OrNodeId(0));
        cache.put(&[0b0101u64], OrNodeId(1));
        assert_eq!(cache.get(&[0b1010u64]), Some(OrNodeId(0)));
        assert_eq!(cache.get(&[0b0101u64]), Some(OrNodeId(1)));
    }
}
