//! Deep merge of TOML values with per-field source tracking.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never overrides the layer
//! beneath it.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/warrant/config.toml`).
    System,
    /// User-level configuration (`~/.warrant/config.toml`).
    User,
    /// A file passed explicitly by the caller.
    File,
    /// Environment variable fallback.
    Environment,
}

impl ConfigLayer {
    /// Whether the value came from a config file rather than defaults or
    /// the environment.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::System | Self::User | Self::File)
    }
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/warrant/config.toml)"),
            Self::User => write!(f, "user (~/.warrant/config.toml)"),
            Self::File => write!(f, "explicit file"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field. `prefix` is the dotted path prefix (e.g. `"auth"`).
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);

                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_all_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Walk a value tree and record all leaf paths with their source layer.
pub(crate) fn record_all_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_all_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_deep_merge_scalars() {
        let mut base = parse("[auth]\nsession_ttl_secs = 3600\nagent_token_ttl_secs = 300\n");
        let overlay = parse("[auth]\nsession_ttl_secs = 600\n");
        deep_merge(&mut base, &overlay);

        assert_eq!(base["auth"]["session_ttl_secs"].as_integer(), Some(600));
        assert_eq!(base["auth"]["agent_token_ttl_secs"].as_integer(), Some(300));
    }

    #[test]
    fn test_deep_merge_arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=warn\"]\n");
        let overlay = parse("[logging]\ndirectives = [\"c=trace\"]\n");
        deep_merge(&mut base, &overlay);

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("c=trace"));
    }

    #[test]
    fn test_deep_merge_tracking() {
        let mut base = parse("[auth]\nsession_ttl_secs = 3600\n");
        let overlay = parse(
            "[auth]\nsession_ttl_secs = 600\n[roles.viewer]\ngrants = []\n",
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::File, &mut sources);

        assert_eq!(sources.get("auth.session_ttl_secs"), Some(&ConfigLayer::File));
        assert_eq!(sources.get("roles.viewer.grants"), Some(&ConfigLayer::File));
        assert!(base["roles"]["viewer"]["grants"].is_array());
    }

    #[test]
    fn test_layer_is_file() {
        assert!(ConfigLayer::System.is_file());
        assert!(ConfigLayer::File.is_file());
        assert!(!ConfigLayer::Defaults.is_file());
        assert!(!ConfigLayer::Environment.is_file());
    }
}
