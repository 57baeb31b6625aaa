//! The configuration store.
//!
//! [`ConfigStore`] is the single mutable state of a configure run: an
//! insertion-ordered map of keys to non-empty string values. Every probe and
//! every transform rule reads and writes through it.
//!
//! A key is either absent or holds a non-empty value. Setting an empty value
//! removes the key.

use indexmap::IndexMap;

use crate::target::TargetOs;
use crate::transform::Override;

/// Ordered key/value configuration store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: IndexMap<String, String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key. An empty value removes the key instead.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.unset(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Set a key only when a value is given.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Remove a key, keeping the relative order of the remaining keys.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.values.shift_remove(key)
    }

    /// Append text to an existing value, or set it if absent.
    pub fn append(&mut self, key: &str, value: &str) {
        let combined = match self.values.get(key) {
            Some(existing) => format!("{existing}{value}"),
            None => value.to_string(),
        };
        self.set(key, combined);
    }

    /// Prepend a path to a `PATH`-like value using the delimiter of `os`.
    /// An empty path is ignored.
    pub fn prepend_path(&mut self, key: &str, path: &str, os: TargetOs) {
        if path.is_empty() {
            return;
        }
        let combined = match self.values.get(key) {
            Some(existing) => format!("{path}{}{existing}", os.path_delimiter()),
            None => path.to_string(),
        };
        self.set(key, combined);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with one of `prefixes`, in insertion order.
    pub fn with_prefixes<'a>(
        &'a self,
        prefixes: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter()
            .filter(move |(k, _)| prefixes.iter().any(|p| k.starts_with(p)))
    }

    /// Apply a batch of overrides in order.
    pub fn apply(&mut self, overrides: &[Override]) {
        for o in overrides {
            match o {
                Override::Set(key, value) => self.set(key.clone(), value.clone()),
                Override::Unset(key) => {
                    self.unset(key);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut store = ConfigStore::new();
        store.set("KBUILD_TARGET", "linux");
        assert_eq!(store.get("KBUILD_TARGET"), Some("linux"));
        assert!(store.is_set("KBUILD_TARGET"));
    }

    #[test]
    fn empty_value_removes_key() {
        let mut store = ConfigStore::new();
        store.set("VBOX_WITH_DOCS", "1");
        store.set("VBOX_WITH_DOCS", "");
        assert!(!store.is_set("VBOX_WITH_DOCS"));
        assert!(store.is_empty());
    }

    #[test]
    fn set_opt_none_is_noop() {
        let mut store = ConfigStore::new();
        store.set("VCPKG_ROOT", "/vcpkg");
        store.set_opt("VCPKG_ROOT", None::<String>);
        assert_eq!(store.get("VCPKG_ROOT"), Some("/vcpkg"));
        store.set_opt("VCPKG_ROOT", Some("/other"));
        assert_eq!(store.get("VCPKG_ROOT"), Some("/other"));
    }

    #[test]
    fn unset_preserves_order() {
        let mut store = ConfigStore::new();
        store.set("A", "1");
        store.set("B", "2");
        store.set("C", "3");
        assert_eq!(store.unset("B"), Some("2".to_string()));
        let keys: Vec<_> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "C"]);
    }

    #[test]
    fn append_concatenates() {
        let mut store = ConfigStore::new();
        store.append("VBOX_GSOAP_CXX_LIBS", "gsoapssl++");
        store.append("VBOX_GSOAP_CXX_LIBS", " ssl");
        assert_eq!(store.get("VBOX_GSOAP_CXX_LIBS"), Some("gsoapssl++ ssl"));
    }

    #[test]
    fn prepend_path_uses_target_delimiter() {
        let mut store = ConfigStore::new();
        store.set("PATH", "/usr/bin");
        store.prepend_path("PATH", "/opt/kbuild/bin", TargetOs::Linux);
        assert_eq!(store.get("PATH"), Some("/opt/kbuild/bin:/usr/bin"));

        let mut store = ConfigStore::new();
        store.set("PATH", "C:/Windows");
        store.prepend_path("PATH", "C:/tools", TargetOs::Windows);
        assert_eq!(store.get("PATH"), Some("C:/tools;C:/Windows"));
    }

    #[test]
    fn prepend_path_ignores_empty_and_sets_absent() {
        let mut store = ConfigStore::new();
        store.prepend_path("PATH", "", TargetOs::Linux);
        assert!(!store.is_set("PATH"));
        store.prepend_path("PATH", "/bin", TargetOs::Linux);
        assert_eq!(store.get("PATH"), Some("/bin"));
    }

    #[test]
    fn with_prefixes_filters_in_order() {
        let mut store = ConfigStore::new();
        store.set("VBOX_WITH_ZLIB", "1");
        store.set("KBUILD_TYPE", "release");
        store.set("SDK_ZLIB_INCS", "/usr/include");
        let keys: Vec<_> = store
            .with_prefixes(&["VBOX_", "SDK_"])
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["VBOX_WITH_ZLIB", "SDK_ZLIB_INCS"]);
    }

    #[test]
    fn apply_runs_overrides_in_order() {
        let mut store = ConfigStore::new();
        store.apply(&[
            Override::Set("VBOX_WITH_QTGUI".into(), "1".into()),
            Override::Unset("VBOX_WITH_QTGUI".into()),
            Override::Set("VBOX_WITH_HEADLESS".into(), "1".into()),
        ]);
        assert!(!store.is_set("VBOX_WITH_QTGUI"));
        assert_eq!(store.get("VBOX_WITH_HEADLESS"), Some("1"));
    }
}
