//! Derivation of secondary configuration flags.
//!
//! A [`TransformEngine`] holds an ordered list of [`TransformRule`]s. Each
//! rule looks at the store and answers with a list of [`Override`]s, which
//! are applied before the next rule runs. Later rules therefore see the
//! effects of earlier ones, and may override them. Rule order is part of
//! the contract.

use tracing::debug;

use crate::store::ConfigStore;

/// A single change requested by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    Set(String, String),
    Unset(String),
}

impl Override {
    pub fn set(key: &str, value: &str) -> Self {
        Override::Set(key.to_string(), value.to_string())
    }

    pub fn unset(key: &str) -> Self {
        Override::Unset(key.to_string())
    }

    pub fn key(&self) -> &str {
        match self {
            Override::Set(key, _) | Override::Unset(key) => key,
        }
    }
}

/// A pure function from store state to overrides.
#[derive(Debug, Clone, Copy)]
pub struct TransformRule {
    pub name: &'static str,
    pub apply: fn(&ConfigStore) -> Vec<Override>,
}

impl TransformRule {
    pub const fn new(name: &'static str, apply: fn(&ConfigStore) -> Vec<Override>) -> Self {
        Self { name, apply }
    }
}

/// Ordered rule pipeline.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    rules: Vec<TransformRule>,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules, in their required order.
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES.to_vec(),
        }
    }

    /// Append a rule; it runs after all rules added before it.
    pub fn register(&mut self, rule: TransformRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    /// Run every rule against the live store, in order.
    pub fn apply(&self, store: &mut ConfigStore) {
        for rule in &self.rules {
            let overrides = (rule.apply)(store);
            if !overrides.is_empty() {
                debug!(
                    "transform '{}': {}",
                    rule.name,
                    overrides
                        .iter()
                        .map(Override::key)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            store.apply(&overrides);
        }
    }
}

fn unset_all(keys: &[&str]) -> Vec<Override> {
    keys.iter().map(|k| Override::unset(k)).collect()
}

fn when(condition: bool, overrides: impl FnOnce() -> Vec<Override>) -> Vec<Override> {
    if condition {
        overrides()
    } else {
        Vec::new()
    }
}

fn only_additions(store: &ConfigStore) -> bool {
    store.is_set("VBOX_ONLY_ADDITIONS")
}

fn ose(store: &ConfigStore) -> bool {
    store.is_set("VBOX_OSE")
}

const STANDARD_RULES: &[TransformRule] = &[
    TransformRule::new("docs", |s| {
        when(only_additions(s) || s.is_set("config_disable_docs"), || {
            unset_all(&["VBOX_WITH_DOCS", "VBOX_WITH_DOCS_PACKING"])
        })
    }),
    TransformRule::new("extpack-vnc", |s| {
        when(only_additions(s) || ose(s), || unset_all(&["VBOX_WITH_EXTPACK_VNC"]))
    }),
    TransformRule::new("webservices-additions", |s| {
        when(only_additions(s), || unset_all(&["VBOX_WITH_WEBSERVICES"]))
    }),
    TransformRule::new("ose", |s| {
        when(ose(s), || {
            unset_all(&["VBOX_WITH_VALIDATIONKIT", "VBOX_WITH_WIN32_ADDITIONS"])
        })
    }),
    TransformRule::new("extpack-puel", |s| {
        when(only_additions(s), || unset_all(&["VBOX_WITH_EXTPACK_PUEL_BUILD"]))
    }),
    TransformRule::new("qt", |s| {
        when(s.is_set("config_libs_disable_qt6"), || unset_all(&["VBOX_WITH_QTGUI"]))
    }),
    TransformRule::new("headless", |s| {
        when(s.is_set("config_build_headless"), || {
            let mut overrides = vec![Override::set("VBOX_WITH_HEADLESS", "1")];
            overrides.extend(unset_all(&[
                "VBOX_WITH_QTGUI",
                "VBOX_WITH_SECURELABEL",
                "VBOX_WITH_VMSVGA3D",
                "VBOX_WITH_3D_ACCELERATION",
                "VBOX_GUI_USE_QGL",
            ]));
            overrides
        })
    }),
    TransformRule::new("recording", |s| {
        when(s.is_set("config_libs_disable_libvpx"), || {
            unset_all(&["VBOX_WITH_LIBVPX", "VBOX_WITH_RECORDING"])
        })
    }),
    TransformRule::new("audio-recording", |s| {
        when(
            s.is_set("config_libs_disable_libogg") && s.is_set("config_libs_disable_libvorbis"),
            || {
                unset_all(&[
                    "VBOX_WITH_LIBOGG",
                    "VBOX_WITH_LIBVORBIS",
                    "VBOX_WITH_AUDIO_RECORDING",
                ])
            },
        )
    }),
    TransformRule::new("gsoap", |s| {
        when(s.is_set("config_tools_disable_gsoap"), || {
            unset_all(&["VBOX_WITH_GSOAP", "VBOX_WITH_WEBSERVICES"])
        })
    }),
    TransformRule::new("com", |s| {
        when(s.is_set("config_disable_com"), || {
            unset_all(&[
                "VBOX_WITH_MAIN",
                "VBOX_WITH_QTGUI",
                "VBOX_WITH_VBOXSDL",
                "VBOX_WITH_DEBUGGER_GUI",
            ])
        })
    }),
    TransformRule::new("python", |s| {
        when(s.is_set("config_disable_python"), || unset_all(&["VBOX_WITH_PYTHON"]))
    }),
    TransformRule::new("pylint", |s| {
        when(s.is_set("config_disable_pylint"), || unset_all(&["VBOX_WITH_PYLINT"]))
    }),
    TransformRule::new("sdl", |s| {
        when(s.is_set("config_disable_sdl"), || {
            unset_all(&["VBOX_WITH_SDL", "VBOX_WITH_VBOXSDL"])
        })
    }),
    TransformRule::new("udptunnel", |s| {
        when(s.is_set("config_disable_udptunnel"), || unset_all(&["VBOX_WITH_UDPTUNNEL"]))
    }),
    TransformRule::new("hardening", |s| {
        when(s.is_set("config_without_hardening"), || unset_all(&["VBOX_WITH_HARDENING"]))
    }),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, &str)]) -> ConfigStore {
        let mut store = ConfigStore::new();
        for (k, v) in entries {
            store.set(*k, *v);
        }
        store
    }

    #[test]
    fn standard_rules_are_ordered() {
        let names: Vec<&str> = TransformEngine::standard().rules().iter().map(|r| r.name).collect();
        assert_eq!(names.len(), 16);
        assert_eq!(names.first(), Some(&"docs"));
        assert_eq!(names.last(), Some(&"hardening"));
        let headless = names.iter().position(|n| *n == "headless").unwrap();
        let qt = names.iter().position(|n| *n == "qt").unwrap();
        assert!(qt < headless);
    }

    #[test]
    fn disabled_libvpx_drops_recording() {
        let mut s = store(&[
            ("config_libs_disable_libvpx", "1"),
            ("VBOX_WITH_LIBVPX", "1"),
            ("VBOX_WITH_RECORDING", "1"),
            ("VBOX_WITH_ZLIB", "1"),
        ]);

        TransformEngine::standard().apply(&mut s);

        assert!(!s.is_set("VBOX_WITH_RECORDING"));
        assert!(!s.is_set("VBOX_WITH_LIBVPX"));
        assert_eq!(s.get("VBOX_WITH_ZLIB"), Some("1"));
    }

    #[test]
    fn headless_sets_and_unsets() {
        let mut s = store(&[("config_build_headless", "1"), ("VBOX_WITH_QTGUI", "1")]);

        TransformEngine::standard().apply(&mut s);

        assert_eq!(s.get("VBOX_WITH_HEADLESS"), Some("1"));
        assert!(!s.is_set("VBOX_WITH_QTGUI"));
    }

    #[test]
    fn audio_recording_needs_both_codecs_disabled() {
        let mut s = store(&[
            ("config_libs_disable_libogg", "1"),
            ("VBOX_WITH_AUDIO_RECORDING", "1"),
        ]);
        TransformEngine::standard().apply(&mut s);
        assert!(s.is_set("VBOX_WITH_AUDIO_RECORDING"));

        s.set("config_libs_disable_libvorbis", "1");
        TransformEngine::standard().apply(&mut s);
        assert!(!s.is_set("VBOX_WITH_AUDIO_RECORDING"));
    }

    #[test]
    fn later_rules_see_earlier_results() {
        let mut engine = TransformEngine::new();
        engine.register(TransformRule::new("first", |_| vec![Override::set("A", "1")]));
        engine.register(TransformRule::new("second", |s| {
            when(s.is_set("A"), || vec![Override::set("B", "from-a")])
        }));
        engine.register(TransformRule::new("third", |_| vec![Override::unset("A")]));
        let mut s = ConfigStore::new();

        engine.apply(&mut s);

        assert_eq!(s.get("B"), Some("from-a"));
        assert!(!s.is_set("A"));
    }

    #[test]
    fn applying_twice_is_stable() {
        let mut s = store(&[
            ("VBOX_OSE", "1"),
            ("VBOX_ONLY_ADDITIONS", "1"),
            ("config_disable_com", "1"),
            ("config_without_hardening", "1"),
            ("VBOX_WITH_HARDENING", "1"),
            ("VBOX_WITH_MAIN", "1"),
            ("VBOX_WITH_DOCS", "1"),
        ]);
        let engine = TransformEngine::standard();

        engine.apply(&mut s);
        let once = s.clone();
        engine.apply(&mut s);

        assert_eq!(s, once);
        assert!(!s.is_set("VBOX_WITH_HARDENING"));
        assert!(!s.is_set("VBOX_WITH_DOCS"));
    }
}
