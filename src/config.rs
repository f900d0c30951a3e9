//! Cluster parameters shared by every node of one run.

use crate::error::{ElectionError, ElectionResult};

/// Size of the cluster and the base timeout `T` every node is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ElectionConfig {
    /// Number of nodes; identities are `0..nodes_count`.
    pub nodes_count: u32,
    /// Base timeout `T` in milliseconds.
    pub timeout_unit: u64,
}

impl ElectionConfig {
    pub fn new(nodes_count: u32, timeout_unit: u64) -> Self {
        ElectionConfig {
            nodes_count,
            timeout_unit,
        }
    }

    /// Reject configurations that cannot run an election.
    pub fn validate(&self) -> ElectionResult<()> {
        if self.nodes_count == 0 {
            return Err(ElectionError::InvalidConfig(
                "cluster needs at least one node".into(),
            ));
        }
        if self.timeout_unit == 0 {
            return Err(ElectionError::InvalidConfig(
                "timeout unit must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        ElectionConfig::new(4, 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ElectionConfig::default();
        assert_eq!(config.nodes_count, 4);
        assert_eq!(config.timeout_unit, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_cluster() {
        let err = ElectionConfig::new(0, 500).validate().unwrap_err();
        assert!(matches!(err, ElectionError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = ElectionConfig::new(3, 0).validate().unwrap_err();
        assert!(matches!(err, ElectionError::InvalidConfig(_)));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_round_trip() {
        let config = ElectionConfig::new(5, 250);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"nodes_count\":5"));
        let back: ElectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
