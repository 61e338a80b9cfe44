//! Keyed store port: create-if-absent lookup.

/// A concurrent store that creates its values lazily.
pub trait Registry<K, V> {
    /// Return the value stored under `key`, creating it with `create` first
    /// if absent.
    ///
    /// Concurrent calls with the same key run `create` at most once and
    /// all observe the same stored value.
    fn get_or_create(&self, key: &K, create: impl FnOnce(&K) -> V) -> V;
}
