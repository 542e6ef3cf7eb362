use indexmap::IndexMap;
use roxmltree::Document;
use std::fmt::Display;

use crate::xef::{self, VARIABLES};

/// the variable types that can be attached to a physical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum VariableType {
    Word,
    Bool,
    Ebool,
    Int,
    Uint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Variable {
    pub(crate) name: String,
    pub(crate) vartype: VariableType,
    // kept exactly as written in the file, e.g. "%I00033"
    pub(crate) address: Option<String>,
    pub(crate) comment: String,
}

/// all usable variables, by name, in declaration order
pub(crate) type Catalog = IndexMap<String, Variable>;

impl VariableType {
    pub(crate) fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "WORD" => Some(Self::Word),
            "BOOL" => Some(Self::Bool),
            "EBOOL" => Some(Self::Ebool),
            "INT" => Some(Self::Int),
            "UINT" => Some(Self::Uint),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Word => "WORD",
            Self::Bool => "BOOL",
            Self::Ebool => "EBOOL",
            Self::Int => "INT",
            Self::Uint => "UINT",
        }
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Collect the variables from all <variables> elements.
// Variables without a name or with a type that can't describe an I/O point are ignored.
// If a name is declared twice, the later declaration replaces the earlier one but keeps its position.
pub(crate) fn build_catalog(document: &Document, log_msgs: &mut Vec<String>) -> Catalog {
    let mut catalog = Catalog::new();
    let mut unnamed = 0;

    for var_node in xef::descendant_elements(document.root_element(), VARIABLES) {
        let Some(name) = var_node.attribute("name").filter(|name| !name.is_empty()) else {
            unnamed += 1;
            continue;
        };
        let Some(vartype) = var_node.attribute("typeName").and_then(VariableType::parse) else {
            continue;
        };

        let comment = xef::child_element(var_node, "comment")
            .and_then(|comment_node| comment_node.text())
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        catalog.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                vartype,
                address: var_node.attribute("topologicalAddress").map(str::to_string),
                comment,
            },
        );
    }

    if unnamed > 0 {
        log_msgs.push(format!("Ignored {unnamed} variable declarations without a name"));
    }
    log_msgs.push(format!("Variable catalog: {} usable variables", catalog.len()));

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xef::parse_document;

    static CATALOG_XML: &str = r#"<FEFExchangeFile>
  <dataBlock>
    <variables name="PUMP01_DCOM" typeName="WORD" topologicalAddress="%I00033">
      <comment>  Pump start  </comment>
    </variables>
    <variables name="VALVE_OPEN" typeName="EBOOL" topologicalAddress="%M12"/>
    <variables name="SETPOINT" typeName="REAL" topologicalAddress="%MW100">
      <comment>not an I/O type</comment>
    </variables>
    <variables typeName="BOOL"><comment>no name</comment></variables>
    <variables name="" typeName="BOOL"/>
    <variables name="EMPTY_COMMENT" typeName="INT"><comment/></variables>
    <variables name="VALVE_OPEN" typeName="BOOL"><comment>redeclared</comment></variables>
  </dataBlock>
</FEFExchangeFile>"#;

    #[test]
    fn test_build_catalog() {
        let doc = parse_document(CATALOG_XML).unwrap();
        let mut log_msgs = Vec::new();
        let catalog = build_catalog(&doc, &mut log_msgs);

        assert_eq!(catalog.len(), 3);
        assert!(!catalog.contains_key("SETPOINT"));

        let pump = &catalog["PUMP01_DCOM"];
        assert_eq!(pump.vartype, VariableType::Word);
        assert_eq!(pump.address.as_deref(), Some("%I00033"));
        assert_eq!(pump.comment, "Pump start");

        let empty = &catalog["EMPTY_COMMENT"];
        assert_eq!(empty.comment, "");
        assert!(empty.address.is_none());

        assert!(log_msgs.iter().any(|msg| msg.contains("2 variable declarations without a name")));
    }

    #[test]
    fn test_catalog_last_declaration_wins() {
        let doc = parse_document(CATALOG_XML).unwrap();
        let catalog = build_catalog(&doc, &mut Vec::new());

        let valve = &catalog["VALVE_OPEN"];
        assert_eq!(valve.vartype, VariableType::Bool);
        assert_eq!(valve.comment, "redeclared");
        assert!(valve.address.is_none());
        // the replaced entry keeps the position of the first declaration
        let names: Vec<&str> = catalog.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["PUMP01_DCOM", "VALVE_OPEN", "EMPTY_COMMENT"]);
    }

    #[test]
    fn test_variable_type() {
        for name in ["WORD", "BOOL", "EBOOL", "INT", "UINT"] {
            assert_eq!(VariableType::parse(name).unwrap().to_string(), name);
        }
        assert!(VariableType::parse("DINT").is_none());
        assert!(VariableType::parse("word").is_none());
    }
}
