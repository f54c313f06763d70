use serde::Deserialize;

///
/// TransformConfig
///
/// Host-supplied knobs for the transformation layer. Every field has a
/// default, so a partial (or empty) config deserializes cleanly.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct TransformConfig {
    /// Recursion bound for nested REST and native values.
    pub max_depth: usize,

    /// Classes whose `objectId` is stored as an integer.
    pub numeric_id_classes: Vec<String>,
}

impl TransformConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    #[must_use]
    pub fn has_numeric_ids(&self, class_name: &str) -> bool {
        self.numeric_id_classes
            .iter()
            .any(|class| class == class_name)
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            numeric_id_classes: vec!["_GlobalConfig".to_string(), "_GraphQLConfig".to_string()],
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: TransformConfig =
            serde_json::from_value(json!({ "max_depth": 8 })).expect("config should deserialize");

        assert_eq!(config.max_depth, 8);
        assert!(config.has_numeric_ids("_GlobalConfig"));
        assert!(!config.has_numeric_ids("Post"));
    }
}
