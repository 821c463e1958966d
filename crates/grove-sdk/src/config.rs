use serde::{Deserialize, Serialize};

/// Options for opening a [`Repository`](crate::Repository).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Maximum symbolic ref hops (and annotated tag peels) per resolution.
    pub max_ref_depth: usize,
    /// `None` keeps every parsed commit for the handle's lifetime. `Some(n)`
    /// bounds the cache to about `n` commits with approximate-LRU eviction.
    pub commit_cache_capacity: Option<usize>,
    /// Log and skip packs that fail to open instead of failing the open.
    pub skip_corrupt_packs: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_ref_depth: grove_refs::DEFAULT_MAX_DEPTH,
            commit_cache_capacity: None,
            skip_corrupt_packs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.max_ref_depth, 10);
        assert_eq!(config.commit_cache_capacity, None);
        assert!(!config.skip_corrupt_packs);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RepositoryConfig =
            serde_json::from_str(r#"{"commit_cache_capacity": 512}"#).unwrap();
        assert_eq!(config.commit_cache_capacity, Some(512));
        assert_eq!(config.max_ref_depth, 10);
    }
}
