use roxmltree::{Document, Node, ParsingOptions};

// element and attribute names used by the XEF export schema
pub(crate) const VARIABLES: &str = "variables";
pub(crate) const MODULE_QUANTUM: &str = "moduleQuantum";
pub(crate) const INSTANCE_ELEMENT_DESC: &str = "instanceElementDesc";

/// parse the content of an .xef file
pub(crate) fn parse_document(text: &str) -> Result<Document<'_>, String> {
    // some exports carry a DOCTYPE declaration; it is not needed for anything here
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|err| format!("XML parse error: {err}"))
}

/// get the first direct child element with the given tag name
pub(crate) fn child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag_name: &str,
) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.has_tag_name(tag_name))
}

/// get the first element with the given tag name below node, in document order
pub(crate) fn descendant_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag_name: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|desc| desc.is_element() && desc.has_tag_name(tag_name))
}

/// iterate over all elements below node with the given tag name, excluding node itself
pub(crate) fn descendant_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag_name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants()
        .skip(1)
        .filter(move |desc| desc.is_element() && desc.has_tag_name(tag_name))
}
