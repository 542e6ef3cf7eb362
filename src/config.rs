use std::collections::HashMap;

/// channel layout of a known I/O card
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelInfo {
    pub(crate) channel_count: usize,
    pub(crate) prefix: String,
}

/// How the base offset of a state RAM module is chosen from its input and output offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum OffsetSelection {
    /// compare the attribute strings as text: "9" is larger than "10"
    #[default]
    Lexicographic,
    /// compare as integers if both offsets are numeric, otherwise fall back to text
    Numeric,
}

#[derive(Debug, Clone)]
pub(crate) struct HardwareConfig {
    pub(crate) models: HashMap<String, ModelInfo>,
    pub(crate) exception_prefixes: Vec<String>,
    pub(crate) offset_selection: OffsetSelection,
}

// part number, channel count, address prefix
const DEFAULT_MODELS: [(&str, usize, &str); 14] = [
    ("140ACI03000", 8, "%IW"),
    ("140AVI03000", 8, "%IW"),
    ("140ACO02000", 4, "%MW"),
    ("140ACO13000", 8, "%MW"),
    ("140ARI03010", 8, "%IW"),
    ("140DDI84100", 32, "%I"),
    ("140DAI54000", 16, "%I"),
    ("140DAI55300", 32, "%I"),
    ("140DAO84210", 16, "%M"),
    ("140DAI74000", 16, "%M"),
    ("140DDI35300", 32, "%I"),
    ("140DDO35300", 32, "%M"),
    ("BMXDDI3202K", 32, "%I"),
    ("BMXDDO3202K", 32, "%M"),
];

// power supplies, CPUs, remote I/O adapters and network cards have no channels of their own
const DEFAULT_EXCEPTION_PREFIXES: [&str; 4] = ["140CPS", "140CRA", "140NRP", "140NOE"];

impl HardwareConfig {
    pub(crate) fn new(
        models: HashMap<String, ModelInfo>,
        exception_prefixes: Vec<String>,
        offset_selection: OffsetSelection,
    ) -> Self {
        Self {
            models,
            exception_prefixes,
            offset_selection,
        }
    }

    pub(crate) fn with_offset_selection(mut self, offset_selection: OffsetSelection) -> Self {
        self.offset_selection = offset_selection;
        self
    }

    /// check if the model belongs to a family of modules without addressable channels
    pub(crate) fn is_exception(&self, model: &str) -> bool {
        self.exception_prefixes
            .iter()
            .any(|prefix| model.starts_with(prefix.as_str()))
    }

    /// Get the channel layout for a model.
    ///
    /// Exception models never have a layout, even if the model table lists them.
    pub(crate) fn model_info(&self, model: &str) -> Option<&ModelInfo> {
        if self.is_exception(model) {
            None
        } else {
            self.models.get(model)
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        let models = DEFAULT_MODELS
            .iter()
            .map(|(part_number, channel_count, prefix)| {
                (
                    (*part_number).to_string(),
                    ModelInfo {
                        channel_count: *channel_count,
                        prefix: (*prefix).to_string(),
                    },
                )
            })
            .collect();
        let exception_prefixes = DEFAULT_EXCEPTION_PREFIXES
            .iter()
            .map(|prefix| (*prefix).to_string())
            .collect();

        Self::new(models, exception_prefixes, OffsetSelection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let config = HardwareConfig::default();
        assert_eq!(config.models.len(), 14);
        let ddi = config.model_info("140DDI84100").unwrap();
        assert_eq!(ddi.channel_count, 32);
        assert_eq!(ddi.prefix, "%I");
        let aco = config.model_info("140ACO02000").unwrap();
        assert_eq!(aco.channel_count, 4);
        assert_eq!(aco.prefix, "%MW");
        assert!(config.model_info("140XYZ00000").is_none());
        assert_eq!(config.offset_selection, OffsetSelection::Lexicographic);
    }

    #[test]
    fn test_exception_overrides_table() {
        let mut config = HardwareConfig::default();
        config.models.insert(
            "140NOE05100".to_string(),
            ModelInfo {
                channel_count: 8,
                prefix: "%I".to_string(),
            },
        );
        assert!(config.is_exception("140NOE05100"));
        assert!(config.is_exception("140CPS11420"));
        assert!(!config.is_exception("140DDI84100"));
        assert!(config.model_info("140NOE05100").is_none());
    }
}
