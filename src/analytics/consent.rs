//! The persisted analytics opt-out flag.

use std::cell::RefCell;
use std::collections::HashMap;

use web_sys::{Storage, Window};

use crate::dom;

pub trait FlagStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// `window.localStorage`; behaves as an empty store when storage is blocked.
pub struct LocalStorageFlags {
    storage: Option<Storage>,
}

impl LocalStorageFlags {
    pub fn new(window: &Window) -> Self {
        let storage = match window.local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                dom::report_error("localStorage", &err);
                None
            }
        };
        Self { storage }
    }
}

impl FlagStore for LocalStorageFlags {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.set_item(key, value) {
                dom::report_error("localStorage.setItem", &err);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.remove_item(key) {
                dom::report_error("localStorage.removeItem", &err);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryFlags {
    values: RefCell<HashMap<String, String>>,
}

impl FlagStore for MemoryFlags {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

pub struct Consent<S: FlagStore> {
    store: S,
    key: String,
}

impl<S: FlagStore> Consent<S> {
    pub fn new(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// Any stored value counts as opted out.
    pub fn is_opted_out(&self) -> bool {
        self.store.get(&self.key).is_some()
    }

    pub fn opt_out(&self) {
        self.store.set(&self.key, "true");
    }

    pub fn opt_in(&self) {
        self.store.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_of_any_value_opts_out() {
        let consent = Consent::new(MemoryFlags::default(), "analytics_disabled");
        assert!(!consent.is_opted_out());

        consent.store.set("analytics_disabled", "");
        assert!(consent.is_opted_out());
    }

    #[test]
    fn opt_out_then_in() {
        let consent = Consent::new(MemoryFlags::default(), "analytics_disabled");
        consent.opt_out();
        assert!(consent.is_opted_out());
        assert_eq!(consent.store.get("analytics_disabled").as_deref(), Some("true"));
        consent.opt_in();
        assert!(!consent.is_opted_out());
    }
}
