//! Hashing aliases.
//!
//! Maps and sets keyed by ids or predicate names use `ahash` through
//! `hashbrown`, which is noticeably faster than SipHash for short keys.

/// Fast hash map.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// Fast hash set.
pub type FxHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;
