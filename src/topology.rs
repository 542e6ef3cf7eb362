use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::LazyLock;

use crate::address::is_numeric_token;
use crate::config::{HardwareConfig, OffsetSelection};
use crate::xef::{self, MODULE_QUANTUM};

/// placeholder for channel names and comments that could not be resolved
pub(crate) const UNSET: &str = "-";

// the topological address of a module looks like "\2.5\1.7" -> drop 5, slot 7
static TOPO_ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[0-9]+\.([0-9]+)\\1\.([0-9]+)").unwrap());

const DEVICE_DDT_VISION: &str = "device DDT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Channel {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) comment: String,
    pub(crate) address: Option<String>,
}

/// The base address of a module, which decides how its channels are named
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BaseAddress {
    /// state RAM offset; the channels have consecutive addresses starting here
    Numeric(u64),
    /// name of a device DDT instance that describes the channels
    Symbolic(String),
    /// the module carries neither kind of address information
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) index: u32,
    pub(crate) model: String,
    pub(crate) base: BaseAddress,
    pub(crate) channels: Vec<Channel>,
}

/// a rack, usually called "drop" in remote I/O installations
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rack {
    pub(crate) index: u32,
    pub(crate) slots: BTreeMap<u32, Slot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Topology {
    pub(crate) racks: BTreeMap<u32, Rack>,
}

/// result of processing one <moduleQuantum> element
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ModuleOutcome {
    Placed {
        rack: u32,
        slot: u32,
        model: String,
        base: BaseAddress,
        channel_count: usize,
    },
    Skipped {
        // 1-based position of the module in the file
        position: usize,
        reason: String,
    },
}

impl Channel {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            name: UNSET.to_string(),
            comment: UNSET.to_string(),
            address: None,
        }
    }

    pub(crate) fn is_named(&self) -> bool {
        !self.name.is_empty() && self.name != UNSET
    }
}

impl BaseAddress {
    /// classify the address token of a module
    pub(crate) fn from_token(token: &str) -> Self {
        if is_numeric_token(token) {
            // more digits than fit into a u64 can't be a real offset; keep the text
            token
                .parse::<u64>()
                .map_or_else(|_| Self::Symbolic(token.to_string()), Self::Numeric)
        } else {
            Self::Symbolic(token.to_string())
        }
    }
}

impl Display for BaseAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(offset) => write!(f, "{offset}"),
            Self::Symbolic(name) => f.write_str(name),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Display for ModuleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed {
                rack,
                slot,
                model,
                base,
                channel_count,
            } => write!(
                f,
                "drop {rack}, slot {slot} -> model {model} | address: {base} | {channel_count} channels"
            ),
            Self::Skipped { reason, .. } => write!(f, "skipped, {reason}"),
        }
    }
}

impl Slot {
    /// Create a slot and all of its channels.
    ///
    /// The channel count and address prefix come from the model table. Modules in the
    /// exception list and models missing from the table get no channels at all.
    pub(crate) fn new(index: u32, model: &str, base: BaseAddress, config: &HardwareConfig) -> Self {
        let channels: Vec<Channel> = match config.model_info(model) {
            Some(model_info) => (0..model_info.channel_count)
                .map(|offset| {
                    let mut channel = Channel::new(offset + 1);
                    // channels past the end of the u64 range have no address
                    if let BaseAddress::Numeric(base_offset) = &base {
                        channel.address = base_offset
                            .checked_add(offset as u64)
                            .map(|address| format!("{}{address}", model_info.prefix));
                    }
                    channel
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            index,
            model: model.to_string(),
            base,
            channels,
        }
    }
}

impl Rack {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            slots: BTreeMap::new(),
        }
    }
}

impl Topology {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Put a slot into a rack. The rack is created if needed; an existing slot at the same position is replaced.
    pub(crate) fn insert_slot(&mut self, rack_index: u32, slot: Slot) -> Option<Slot> {
        self.racks
            .entry(rack_index)
            .or_insert_with(|| Rack::new(rack_index))
            .slots
            .insert(slot.index, slot)
    }

    #[cfg(test)]
    pub(crate) fn get_slot(&self, rack_index: u32, slot_index: u32) -> Option<&Slot> {
        self.racks.get(&rack_index)?.slots.get(&slot_index)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.racks.values().flat_map(|rack| rack.slots.values())
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.racks.values_mut().flat_map(|rack| rack.slots.values_mut())
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.racks.values().map(|rack| rack.slots.len()).sum()
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.slots().map(|slot| slot.channels.len()).sum()
    }
}

// Build the rack / slot / channel structure from all <moduleQuantum> elements.
// Modules that can't be interpreted are skipped; the reason is recorded in the returned outcome list.
pub(crate) fn build_topology(
    document: &Document,
    config: &HardwareConfig,
    log_msgs: &mut Vec<String>,
) -> (Topology, Vec<ModuleOutcome>) {
    let mut topology = Topology::new();
    let mut outcomes = Vec::new();

    for (idx, module_node) in
        xef::descendant_elements(document.root_element(), MODULE_QUANTUM).enumerate()
    {
        let position = idx + 1;
        match parse_module(module_node, config, log_msgs) {
            Ok((rack_index, slot)) => {
                let outcome = ModuleOutcome::Placed {
                    rack: rack_index,
                    slot: slot.index,
                    model: slot.model.clone(),
                    base: slot.base.clone(),
                    channel_count: slot.channels.len(),
                };
                log_msgs.push(format!("Module {position}: {outcome}"));
                if let Some(replaced) = topology.insert_slot(rack_index, slot) {
                    log_msgs.push(format!(
                        "Module {position} replaces {} in drop {rack_index}, slot {}",
                        replaced.model, replaced.index
                    ));
                }
                outcomes.push(outcome);
            }
            Err(reason) => {
                let outcome = ModuleOutcome::Skipped { position, reason };
                log_msgs.push(format!("Module {position}: {outcome}"));
                outcomes.push(outcome);
            }
        }
    }

    (topology, outcomes)
}

// interpret a single <moduleQuantum> element
fn parse_module(
    module_node: Node,
    config: &HardwareConfig,
    log_msgs: &mut Vec<String>,
) -> Result<(u32, Slot), String> {
    let model = xef::child_element(module_node, "partItem")
        .and_then(|part_item| part_item.attribute("partNumber"))
        .ok_or_else(|| "missing partItem/@partNumber".to_string())?;

    let base = if module_node.attribute("IOVision") == Some(DEVICE_DDT_VISION) {
        match xef::child_element(module_node, "deviceDDT") {
            Some(device_ddt) => device_ddt
                .attribute("implInstName")
                .map_or(BaseAddress::Unknown, BaseAddress::from_token),
            None => BaseAddress::Unknown,
        }
    } else {
        match xef::child_element(module_node, "moduleInfo") {
            Some(module_info) => {
                let input_offset = module_info
                    .attribute("inputRefOffset")
                    .ok_or_else(|| format!("{model}: missing moduleInfo/@inputRefOffset"))?;
                let output_offset = module_info
                    .attribute("outputRefOffset")
                    .ok_or_else(|| format!("{model}: missing moduleInfo/@outputRefOffset"))?;
                let selected = select_offset(input_offset, output_offset, config.offset_selection);
                let alternative = select_offset(
                    input_offset,
                    output_offset,
                    match config.offset_selection {
                        OffsetSelection::Lexicographic => OffsetSelection::Numeric,
                        OffsetSelection::Numeric => OffsetSelection::Lexicographic,
                    },
                );
                if selected != alternative {
                    log_msgs.push(format!(
                        "{model}: offsets \"{input_offset}\" and \"{output_offset}\" order differently as text and as numbers; using \"{selected}\""
                    ));
                }
                BaseAddress::from_token(selected)
            }
            None => BaseAddress::Unknown,
        }
    };

    let topo_address = xef::child_element(module_node, "equipInfo")
        .and_then(|equip_info| equip_info.attribute("topoAddress"))
        .ok_or_else(|| format!("{model}: missing equipInfo/@topoAddress"))?;
    let (rack_index, slot_index) = parse_topo_address(topo_address)
        .map_err(|reason| format!("{model}: {reason} \"{topo_address}\""))?;

    Ok((rack_index, Slot::new(slot_index, model, base, config)))
}

/// extract (drop, slot) from a topological address such as "\2.1\1.4"
pub(crate) fn parse_topo_address(topo_address: &str) -> Result<(u32, u32), &'static str> {
    let captures = TOPO_ADDRESS_REGEX
        .captures(topo_address)
        .ok_or("unrecognized topological address")?;
    let rack = captures[1]
        .parse()
        .map_err(|_| "drop number out of range in topological address")?;
    let slot = captures[2]
        .parse()
        .map_err(|_| "slot number out of range in topological address")?;
    Ok((rack, slot))
}

/// choose the larger of the input and output offsets of a state RAM module
pub(crate) fn select_offset<'a>(
    input_offset: &'a str,
    output_offset: &'a str,
    selection: OffsetSelection,
) -> &'a str {
    let numeric_order = match selection {
        OffsetSelection::Numeric => input_offset
            .parse::<u64>()
            .ok()
            .zip(output_offset.parse::<u64>().ok())
            .map(|(input, output)| input.cmp(&output)),
        OffsetSelection::Lexicographic => None,
    };
    let order = numeric_order.unwrap_or_else(|| input_offset.cmp(output_offset));

    if order.is_lt() {
        output_offset
    } else {
        input_offset
    }
}
