//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for the data-access core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound on `page_size` accepted by paged reads
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl StoreConfig {
    /// Validates the configuration.
    ///
    /// # Validation Rules
    /// - Max page size must be greater than 0
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_page_size == 0 {
            return Err(StoreError::invalid_argument(
                "store.max_page_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_max_page_size() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_max_page_size_rejected() {
        let config = StoreConfig { max_page_size: 0 };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_page_size, 100);
    }
}
