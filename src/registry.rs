//! Component Registry (C1): a process-wide name service for polymorphic
//! components. Each family (algorithms, rescorers, dedupers, falcons,
//! mergers) gets its own `Registry<dyn Trait>` instance rather than a single
//! dynamically-typed map — the Rust-idiomatic reading of "every family has
//! its own namespace" from spec §4.1/§9.

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Factory<T> = Arc<dyn Fn(&Value) -> Result<Arc<T>> + Send + Sync>;

struct Entry<T: ?Sized> {
    default_config: Value,
    factory: Factory<T>,
}

/// An instance slot keyed by `(name, effective_config)`. The outer map lock
/// is held only long enough to find-or-insert the slot; construction runs
/// with that lock released and is serialised per-slot instead, matching
/// spec §5's "guarded by a process-wide mutex held only for lookup/insert".
type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

pub struct Registry<T: ?Sized> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    aliases: Mutex<HashMap<String, String>>,
    instances: Mutex<HashMap<(String, String), Slot<T>>>,
    pins: Mutex<HashMap<(String, String), usize>>,
}

impl<T: ?Sized + Send + Sync + 'static> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            aliases: Mutex::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            pins: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a factory under `name`. Binding the same name twice in this
    /// family is an error, matching the startup-time failure in spec §4.1.
    pub fn bind(
        &self,
        name: impl Into<String>,
        default_config: Value,
        factory: impl Fn(&Value) -> Result<Arc<T>> + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&name) {
            return Err(anyhow!("component '{name}' already bound in this family"));
        }
        entries.insert(
            name,
            Entry {
                default_config,
                factory: Arc::new(factory),
            },
        );
        Ok(())
    }

    /// Resolves `new_name` to the same entry as `existing_name`.
    pub fn alias(&self, new_name: impl Into<String>, existing_name: impl Into<String>) {
        self.aliases
            .lock()
            .unwrap()
            .insert(new_name.into(), existing_name.into());
    }

    fn resolve_name(&self, name: &str) -> String {
        self.aliases
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Returns a refcounted handle to the instance for `(name, overrides)`.
    /// Reuses a live instance if one already exists for the effective
    /// config; otherwise invokes the factory exactly once, serialised
    /// against concurrent callers resolving the same key.
    pub fn make_shared(&self, name: &str, overrides: Option<&Value>) -> Result<Arc<T>> {
        let resolved = self.resolve_name(name);

        let (default_config, factory) = {
            let entries = self.entries.lock().unwrap();
            let entry = entries
                .get(&resolved)
                .ok_or_else(|| anyhow!("no component bound under name '{resolved}'"))?;
            (entry.default_config.clone(), Arc::clone(&entry.factory))
        };

        let effective_config = merge_configs(&default_config, overrides);
        let key = (resolved, canonical_json(&effective_config));

        let slot = {
            let mut instances = self.instances.lock().unwrap();
            Arc::clone(
                instances
                    .entry(key)
                    .or_insert_with(|| Arc::new(Mutex::new(None))),
            )
        };

        let mut guard = slot.lock().unwrap();
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let instance = (factory)(&effective_config)?;
        *guard = Some(Arc::clone(&instance));
        Ok(instance)
    }

    /// Increments the pin-count for `(name, overrides)`'s effective key.
    /// Instances here are already held for the process lifetime by the
    /// `instances` map itself, so this is bookkeeping kept for API fidelity
    /// with spec §4.1 rather than something the lifetime depends on.
    pub fn pin(&self, name: &str, overrides: Option<&Value>) {
        let resolved = self.resolve_name(name);
        let default_config = self
            .entries
            .lock()
            .unwrap()
            .get(&resolved)
            .map(|e| e.default_config.clone())
            .unwrap_or(Value::Null);
        let key = (resolved, canonical_json(&merge_configs(&default_config, overrides)));
        *self.pins.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    pub fn unpin(&self, name: &str, overrides: Option<&Value>) {
        let resolved = self.resolve_name(name);
        let default_config = self
            .entries
            .lock()
            .unwrap()
            .get(&resolved)
            .map(|e| e.default_config.clone())
            .unwrap_or(Value::Null);
        let key = (resolved, canonical_json(&merge_configs(&default_config, overrides)));
        if let Some(count) = self.pins.lock().unwrap().get_mut(&key) {
            *count = count.saturating_sub(1);
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow merge: `overrides` keys win over `default_config` keys; both must
/// be JSON objects (or absent) for merging to apply, otherwise `overrides`
/// replaces the default wholesale.
fn merge_configs(default_config: &Value, overrides: Option<&Value>) -> Value {
    let Some(overrides) = overrides else {
        return default_config.clone();
    };
    match (default_config, overrides) {
        (Value::Object(base), Value::Object(extra)) => {
            let mut merged = base.clone();
            for (k, v) in extra {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => overrides.clone(),
    }
}

/// `serde_json::Value` does not implement `Hash`; BTreeMap-backed
/// `to_string()` on an object with sorted keys (which `serde_json` produces
/// by default for maps built from `Value::Object`, a `BTreeMap` in the
/// `preserve_order`-less configuration used here) gives a stable cache key.
fn canonical_json(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(u32);

    #[test]
    fn make_shared_reuses_instance_for_identical_params() {
        let registry: Registry<Dummy> = Registry::new();
        let counter = Arc::new(Mutex::new(0u32));
        let counter_clone = Arc::clone(&counter);
        registry
            .bind("echo", Value::Null, move |_cfg| {
                let mut c = counter_clone.lock().unwrap();
                *c += 1;
                Ok(Arc::new(Dummy(*c)))
            })
            .unwrap();

        let a = registry.make_shared("echo", None).unwrap();
        let b = registry.make_shared("echo", None).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(*counter.lock().unwrap(), 1);
    }

    #[test]
    fn make_shared_creates_distinct_instances_for_distinct_overrides() {
        let registry: Registry<Dummy> = Registry::new();
        registry
            .bind("echo", serde_json::json!({"n": 1}), |cfg| {
                Ok(Arc::new(Dummy(cfg["n"].as_u64().unwrap() as u32)))
            })
            .unwrap();

        let a = registry
            .make_shared("echo", Some(&serde_json::json!({"n": 2})))
            .unwrap();
        let b = registry
            .make_shared("echo", Some(&serde_json::json!({"n": 3})))
            .unwrap();
        assert_eq!(a.0, 2);
        assert_eq!(b.0, 3);
    }

    #[test]
    fn double_bind_is_an_error() {
        let registry: Registry<Dummy> = Registry::new();
        registry.bind("x", Value::Null, |_| Ok(Arc::new(Dummy(0)))).unwrap();
        assert!(registry.bind("x", Value::Null, |_| Ok(Arc::new(Dummy(0)))).is_err());
    }

    #[test]
    fn alias_resolves_to_the_same_instance() {
        let registry: Registry<Dummy> = Registry::new();
        registry.bind("primary", Value::Null, |_| Ok(Arc::new(Dummy(7)))).unwrap();
        registry.alias("p", "primary");
        let direct = registry.make_shared("primary", None).unwrap();
        let aliased = registry.make_shared("p", None).unwrap();
        assert_eq!(direct.0, aliased.0);
    }

    #[test]
    fn unresolved_name_is_an_error() {
        let registry: Registry<Dummy> = Registry::new();
        assert!(registry.make_shared("missing", None).is_err());
    }
}
