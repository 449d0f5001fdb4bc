use crate::entities::mob::MobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Bool(bool),
    Str(String),
    /// Milliseconds since the unix epoch.
    Time(u64),
    Mob(MobId),
}

/// Key-value bag with typed reads. A read of the wrong kind yields the
/// caller's default, like a missing key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStore {
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set_var(&mut self, key: &str, value: AttributeValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn unset_var(&mut self, key: &str) -> Option<AttributeValue> {
        self.values.remove(key)
    }

    pub fn var_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(AttributeValue::Int(value)) => *value,
            _ => default,
        }
    }

    pub fn var_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(AttributeValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn var_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(AttributeValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn var_time(&self, key: &str) -> Option<u64> {
        match self.values.get(key) {
            Some(AttributeValue::Time(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn var_mob(&self, key: &str) -> Option<MobId> {
        match self.values.get(key) {
            Some(AttributeValue::Mob(value)) => Some(*value),
            _ => None,
        }
    }

    /// Adds `delta` to an integer attribute, treating a missing key as zero.
    pub fn inc_var(&mut self, key: &str, delta: i64) -> i64 {
        let next = self.var_int(key, 0).saturating_add(delta);
        self.set_var(key, AttributeValue::Int(next));
        next
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yaml::to_string(self).map_err(|err| format!("attribute encode failed: {}", err))
    }

    pub fn from_yaml(text: &str) -> Result<Self, String> {
        serde_yaml::from_str(text).map_err(|err| format!("attribute decode failed: {}", err))
    }
}

/// An attribute store shared between the tick and a connection worker.
/// Lock poisoning is recovered from, since the data is plain values.
#[derive(Debug, Clone, Default)]
pub struct SharedAttributes(Arc<Mutex<AttributeStore>>);

impl SharedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: AttributeStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, AttributeStore> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> AttributeStore {
        self.lock().clone()
    }

    pub fn var_int(&self, key: &str, default: i64) -> i64 {
        self.lock().var_int(key, default)
    }

    pub fn var_bool(&self, key: &str, default: bool) -> bool {
        self.lock().var_bool(key, default)
    }

    pub fn var_str(&self, key: &str) -> Option<String> {
        self.lock().var_str(key).map(str::to_string)
    }

    pub fn var_time(&self, key: &str) -> Option<u64> {
        self.lock().var_time(key)
    }

    pub fn var_mob(&self, key: &str) -> Option<MobId> {
        self.lock().var_mob(key)
    }

    pub fn set_var(&self, key: &str, value: AttributeValue) {
        self.lock().set_var(key, value);
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.set_var(key, AttributeValue::Int(value));
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.set_var(key, AttributeValue::Bool(value));
    }

    pub fn set_mob(&self, key: &str, value: MobId) {
        self.set_var(key, AttributeValue::Mob(value));
    }

    pub fn unset_var(&self, key: &str) {
        self.lock().unset_var(key);
    }

    pub fn inc_var(&self, key: &str, delta: i64) -> i64 {
        self.lock().inc_var(key, delta)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::mob::PlayerId;

    #[test]
    fn typed_reads_fall_back_on_kind_mismatch() {
        let mut store = AttributeStore::new();
        store.set_var("fight_mode", AttributeValue::Int(2));
        store.set_var("muted", AttributeValue::Bool(true));
        assert_eq!(store.var_int("fight_mode", 0), 2);
        assert_eq!(store.var_int("muted", 7), 7);
        assert!(store.var_bool("muted", false));
        assert_eq!(store.var_str("fight_mode"), None);
    }

    #[test]
    fn inc_var_starts_from_zero() {
        let mut store = AttributeStore::new();
        assert_eq!(store.inc_var("tried_reach", 1), 1);
        assert_eq!(store.inc_var("tried_reach", 1), 2);
        store.unset_var("tried_reach");
        assert!(!store.contains("tried_reach"));
    }

    #[test]
    fn shared_handles_see_each_others_writes() {
        let tick_side = SharedAttributes::new();
        let worker_side = tick_side.clone();
        worker_side.set_mob("duel_target", MobId::Player(PlayerId(4)));
        assert_eq!(
            tick_side.var_mob("duel_target"),
            Some(MobId::Player(PlayerId(4)))
        );
        tick_side.clear();
        assert!(worker_side.snapshot().is_empty());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let attributes = SharedAttributes::new();
        let poisoner = attributes.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();
        attributes.set_int("skull_ticks", 5);
        assert_eq!(attributes.var_int("skull_ticks", 0), 5);
    }

    #[test]
    fn yaml_snapshot_restores_values() {
        let mut store = AttributeStore::new();
        store.set_var("username", AttributeValue::Str("zezima".to_string()));
        store.set_var("login_time", AttributeValue::Time(1_600_000_000_000));
        let text = store.to_yaml().expect("encode");
        let restored = AttributeStore::from_yaml(&text).expect("decode");
        assert_eq!(restored, store);
        assert_eq!(restored.var_time("login_time"), Some(1_600_000_000_000));
    }
}
