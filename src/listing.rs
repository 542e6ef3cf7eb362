use crate::catalog::build_catalog;
use crate::config::HardwareConfig;
use crate::reconcile::{NameSummary, backfill_comments, resolve_channel_names};
use crate::title::resolve_title;
use crate::topology::{ModuleOutcome, Topology, build_topology};
use crate::xef::parse_document;

/// everything the report needs, plus what happened while it was assembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IoListing {
    pub(crate) title: String,
    pub(crate) plc_model: String,
    pub(crate) topology: Topology,
    pub(crate) module_outcomes: Vec<ModuleOutcome>,
    pub(crate) variable_count: usize,
    pub(crate) names: NameSummary,
    pub(crate) comments_filled: usize,
    pub(crate) log_msgs: Vec<String>,
}

impl IoListing {
    pub(crate) fn skipped_modules(&self) -> impl Iterator<Item = (usize, &str)> {
        self.module_outcomes.iter().filter_map(|outcome| match outcome {
            ModuleOutcome::Skipped { position, reason } => Some((*position, reason.as_str())),
            ModuleOutcome::Placed { .. } => None,
        })
    }
}

// Turn the content of an .xef export into an I/O listing:
//  1) parse the document
//  2) collect the variables
//  3) build the rack / slot / channel structure
//  4) name the channels by address or DDT alias
//  5) fill in comments by name
//  6) determine title and PLC model
// An unparseable document produces an empty listing with placeholder title and model.
pub(crate) fn process_export(xml_text: &str, config: &HardwareConfig) -> IoListing {
    let mut log_msgs = Vec::new();

    let document = match parse_document(xml_text) {
        Ok(document) => Some(document),
        Err(errmsg) => {
            log_msgs.push(errmsg);
            None
        }
    };

    let mut listing = match &document {
        Some(document) => {
            let catalog = build_catalog(document, &mut log_msgs);
            let (mut topology, module_outcomes) = build_topology(document, config, &mut log_msgs);
            let names = resolve_channel_names(&mut topology, document, &catalog);
            let comments_filled = backfill_comments(&mut topology, &catalog);
            log_msgs.push(format!("{comments_filled} comments filled in by name"));
            let (title, plc_model) = resolve_title(Some(document), &catalog, &mut log_msgs);

            IoListing {
                title,
                plc_model,
                topology,
                module_outcomes,
                variable_count: catalog.len(),
                names,
                comments_filled,
                log_msgs: Vec::new(),
            }
        }
        None => {
            let (title, plc_model) = resolve_title(None, &Default::default(), &mut log_msgs);
            IoListing {
                title,
                plc_model,
                topology: Topology::new(),
                module_outcomes: Vec::new(),
                variable_count: 0,
                names: NameSummary::default(),
                comments_filled: 0,
                log_msgs: Vec::new(),
            }
        }
    };

    listing.log_msgs = log_msgs;
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::UNSET;

    static EXPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<FEFExchangeFile>
  <contentHeader name="Project" version="0.0.001"/>
  <PLC>
    <partItem partNumber="140CPU67160" family="Quantum"/>
  </PLC>
  <IOConf>
    <moduleQuantum IOVision="state ram full">
      <partItem partNumber="140NOE77101"/>
      <moduleInfo inputRefOffset="0" outputRefOffset="0"/>
      <equipInfo topoAddress="\2.1\1.3"/>
    </moduleQuantum>
    <moduleQuantum IOVision="state ram full">
      <partItem partNumber="140DDI84100"/>
      <moduleInfo inputRefOffset="33" outputRefOffset="0"/>
      <equipInfo topoAddress="\2.1\1.4"/>
    </moduleQuantum>
    <moduleQuantum IOVision="state ram full">
      <partItem partNumber="140DDI84100"/>
      <equipInfo topoAddress="broken"/>
    </moduleQuantum>
  </IOConf>
  <dataBlock>
    <variables name="PUMP01_DCOM" typeName="WORD" topologicalAddress="%I00033">
      <comment>Pump start</comment>
    </variables>
    <variables name="TANKLVL_DCOM" typeName="WORD">
      <comment>Communication status</comment>
    </variables>
  </dataBlock>
</FEFExchangeFile>"#;

    #[test]
    fn test_process_export() {
        let listing = process_export(EXPORT_XML, &HardwareConfig::default());

        // PUMP01_DCOM is declared first, so it provides the title
        assert_eq!(listing.title, "PUMP01");
        assert_eq!(listing.plc_model, "Quantum");
        assert_eq!(listing.variable_count, 2);
        assert_eq!(listing.names.address_matches, 1);
        assert_eq!(listing.comments_filled, 1);

        let noe = listing.topology.get_slot(1, 3).unwrap();
        assert!(noe.channels.is_empty());

        let ddi = listing.topology.get_slot(1, 4).unwrap();
        assert_eq!(ddi.channels.len(), 32);
        assert_eq!(ddi.channels[0].name, "PUMP01_DCOM");
        assert_eq!(ddi.channels[0].comment, "Pump start");
        assert_eq!(ddi.channels[1].name, UNSET);
        assert_eq!(ddi.channels[1].comment, UNSET);

        let skipped: Vec<_> = listing.skipped_modules().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, 3);
    }

    #[test]
    fn test_process_export_is_repeatable() {
        let config = HardwareConfig::default();
        let first = process_export(EXPORT_XML, &config);
        let second = process_export(EXPORT_XML, &config);
        assert_eq!(first, second);
        assert_eq!(format!("{:?}", first.topology), format!("{:?}", second.topology));
    }

    #[test]
    fn test_process_invalid_export() {
        let listing = process_export("<FEFExchangeFile><IOConf>", &HardwareConfig::default());
        assert_eq!(listing.title, crate::title::TITLE_INVALID);
        assert_eq!(listing.plc_model, crate::title::MODEL_DEFAULT);
        assert!(listing.topology.racks.is_empty());
        assert_eq!(listing.variable_count, 0);
        assert!(listing.log_msgs[0].starts_with("XML parse error"));
    }
}
