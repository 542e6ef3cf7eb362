use fnv::FnvHashMap;
use roxmltree::{Document, Node};
use std::collections::HashMap;

use crate::address::{NormalizedAddress, normalize_address};
use crate::catalog::Catalog;
use crate::topology::{BaseAddress, Topology};
use crate::xef::{self, INSTANCE_ELEMENT_DESC, VARIABLES};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NameSummary {
    pub(crate) address_matches: u32,
    pub(crate) alias_matches: u32,
    pub(crate) missing_instances: u32,
}

/// Build the reverse lookup from a normalized address to the name of the variable located there.
///
/// If several variables share an address, the one declared last wins.
pub(crate) fn build_address_index(catalog: &Catalog) -> FnvHashMap<NormalizedAddress, &str> {
    let mut index = FnvHashMap::default();
    for (name, variable) in catalog {
        if let Some(normalized) = variable.address.as_deref().and_then(normalize_address) {
            index.insert(normalized, name.as_str());
        }
    }
    index
}

// First pass: give every channel a name.
// State RAM modules are matched by address against the catalog, which also provides the comment.
// Device DDT modules are matched through the Alias attributes of their DDT instance in the document.
pub(crate) fn resolve_channel_names(
    topology: &mut Topology,
    document: &Document,
    catalog: &Catalog,
) -> NameSummary {
    let mut summary = NameSummary::default();
    let address_index = build_address_index(catalog);
    let declarations = collect_declarations(document);

    for slot in topology.slots_mut() {
        if slot.channels.is_empty() {
            continue;
        }

        match &slot.base {
            BaseAddress::Numeric(_) => {
                for channel in &mut slot.channels {
                    let Some(normalized) = channel.address.as_deref().and_then(normalize_address)
                    else {
                        continue;
                    };
                    if let Some(variable) = address_index
                        .get(&normalized)
                        .and_then(|name| catalog.get(*name))
                    {
                        channel.name = variable.name.clone();
                        channel.comment = variable.comment.clone();
                        summary.address_matches += 1;
                    }
                }
            }
            BaseAddress::Symbolic(instance_name) => {
                let Some(instance_node) = declarations.get(instance_name.as_str()) else {
                    summary.missing_instances += 1;
                    continue;
                };
                for (channel_pos, alias) in ddt_channel_aliases(*instance_node) {
                    if let Some(channel) = slot.channels.get_mut(channel_pos) {
                        channel.name = alias.to_string();
                        summary.alias_matches += 1;
                    }
                }
            }
            BaseAddress::Unknown => {}
        }
    }

    summary
}

// Second pass: look up every named channel in the catalog and take the comment from there.
// This runs after all names are known and overrides comments set by the address match.
pub(crate) fn backfill_comments(topology: &mut Topology, catalog: &Catalog) -> usize {
    let mut count = 0;
    for slot in topology.slots_mut() {
        for channel in &mut slot.channels {
            if !channel.is_named() {
                continue;
            }
            if let Some(variable) = catalog.get(channel.name.trim()) {
                channel.comment = variable.comment.clone();
                count += 1;
            }
        }
    }
    count
}

// map the names of all declared variables to their first declaration, regardless of type
fn collect_declarations<'a, 'input>(document: &'a Document<'input>) -> HashMap<&'a str, Node<'a, 'input>> {
    let mut declarations = HashMap::new();
    for var_node in xef::descendant_elements(document.root_element(), VARIABLES) {
        if let Some(name) = var_node.attribute("name") {
            declarations.entry(name).or_insert(var_node);
        }
    }
    declarations
}

/// Get the aliases of the elements of a device DDT instance.
///
/// Each element is an <instanceElementDesc name="[k]"> with a nested "VALUE" element carrying
/// an <attribute name="Alias" value="..."/>. The result pairs the zero-based channel
/// position k with the alias.
pub(crate) fn ddt_channel_aliases<'a>(instance_node: Node<'a, '_>) -> Vec<(usize, &'a str)> {
    let mut aliases = Vec::new();

    for element_desc in xef::descendant_elements(instance_node, INSTANCE_ELEMENT_DESC) {
        let Some(channel_pos) = element_desc.attribute("name").and_then(parse_element_index) else {
            continue;
        };
        let value_node = element_desc.descendants().skip(1).find(|desc| {
            desc.is_element()
                && desc.has_tag_name(INSTANCE_ELEMENT_DESC)
                && desc.attribute("name") == Some("VALUE")
        });
        let alias = value_node.and_then(|value_node| {
            value_node
                .children()
                .find(|child| {
                    child.is_element()
                        && child.has_tag_name("attribute")
                        && child.attribute("name") == Some("Alias")
                })
                .and_then(|alias_node| alias_node.attribute("value"))
        });
        if let Some(alias) = alias {
            aliases.push((channel_pos, alias));
        }
    }

    aliases
}

// "[3]" -> 3
fn parse_element_index(name: &str) -> Option<usize> {
    name.strip_prefix('[')?.strip_suffix(']')?.trim().parse().ok()
}
