use roxmltree::Document;

use crate::catalog::{Catalog, VariableType};
use crate::xef;

/// the name Control Expert gives to projects that were never renamed
pub(crate) const GENERIC_TITLE: &str = "Project";
pub(crate) const TITLE_WITHOUT_NAME: &str = "Project_Without_Name";
pub(crate) const TITLE_WITHOUT_HEADER: &str = "Project_Without_Header";
pub(crate) const TITLE_INVALID: &str = "Invalid_Project";

pub(crate) const MODEL_UNKNOWN: &str = "Unknown Model";
pub(crate) const MODEL_DEFAULT: &str = "PLC";

// by convention each PLC has a communication status word named <PLC name>_DCOM
const TITLE_VARIABLE_SUFFIX: &str = "_DCOM";

/// Determine the project title and the PLC family label.
///
/// If the declared project name is the generic default, the title is taken from the first
/// WORD variable named "<title>_DCOM". A document that could not be parsed yields placeholders.
pub(crate) fn resolve_title(
    document: Option<&Document>,
    catalog: &Catalog,
    log_msgs: &mut Vec<String>,
) -> (String, String) {
    let Some(document) = document else {
        return (TITLE_INVALID.to_string(), MODEL_DEFAULT.to_string());
    };

    let model = read_plc_model(document);
    let declared_title = read_declared_title(document);
    if declared_title != GENERIC_TITLE {
        return (declared_title, model);
    }

    log_msgs.push(format!(
        "Project title is \"{GENERIC_TITLE}\"; looking for a {} variable named *{TITLE_VARIABLE_SUFFIX}",
        VariableType::Word
    ));
    let title = match title_from_catalog(catalog) {
        Some(title) => {
            log_msgs.push(format!("Using \"{title}\" as the project title"));
            title.to_string()
        }
        None => {
            log_msgs.push(format!(
                "No {} variable named *{TITLE_VARIABLE_SUFFIX} found; keeping \"{declared_title}\"",
                VariableType::Word
            ));
            declared_title
        }
    };

    (title, model)
}

// <contentHeader name="..."> directly below the root element
fn read_declared_title(document: &Document) -> String {
    match xef::child_element(document.root_element(), "contentHeader") {
        Some(header) => header
            .attribute("name")
            .unwrap_or(TITLE_WITHOUT_NAME)
            .to_string(),
        None => TITLE_WITHOUT_HEADER.to_string(),
    }
}

// <PLC><partItem family="..."/></PLC>
fn read_plc_model(document: &Document) -> String {
    let part_item = xef::descendant_elements(document.root_element(), "PLC")
        .find_map(|plc_node| xef::child_element(plc_node, "partItem"));

    match part_item {
        Some(part_item) => part_item
            .attribute("family")
            .unwrap_or(MODEL_UNKNOWN)
            .to_string(),
        None => MODEL_DEFAULT.to_string(),
    }
}

/// find the first WORD variable with the title suffix and strip the suffix from its name
pub(crate) fn title_from_catalog(catalog: &Catalog) -> Option<&str> {
    catalog
        .values()
        .filter(|variable| variable.vartype == VariableType::Word)
        .find_map(|variable| variable.name.strip_suffix(TITLE_VARIABLE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use crate::xef::parse_document;

    fn resolve(xml: &str) -> (String, String) {
        let doc = parse_document(xml).unwrap();
        let mut log_msgs = Vec::new();
        let catalog = build_catalog(&doc, &mut log_msgs);
        resolve_title(Some(&doc), &catalog, &mut log_msgs)
    }

    #[test]
    fn test_declared_title() {
        let (title, model) = resolve(
            r#"<FEFExchangeFile>
  <contentHeader name="UC1000CC21"/>
  <PLC><partItem partNumber="140CPU67160" family="Quantum"/></PLC>
  <variables name="TANKLVL_DCOM" typeName="WORD"/>
</FEFExchangeFile>"#,
        );
        assert_eq!(title, "UC1000CC21");
        assert_eq!(model, "Quantum");
    }

    #[test]
    fn test_generic_title_fallback() {
        let (title, _) = resolve(
            r#"<FEFExchangeFile>
  <contentHeader name="Project"/>
  <variables name="OTHER_DCOM" typeName="INT"/>
  <variables name="TANKLVL_DCOM" typeName="WORD"/>
  <variables name="SECOND_DCOM" typeName="WORD"/>
</FEFExchangeFile>"#,
        );
        assert_eq!(title, "TANKLVL");
    }

    #[test]
    fn test_generic_title_without_match() {
        let (title, model) = resolve(
            r#"<FEFExchangeFile>
  <contentHeader name="Project"/>
  <variables name="TANKLVL_DCOM" typeName="BOOL"/>
  <variables name="TANKLVL" typeName="WORD"/>
</FEFExchangeFile>"#,
        );
        assert_eq!(title, "Project");
        assert_eq!(model, MODEL_DEFAULT);
    }

    #[test]
    fn test_placeholders() {
        let (title, model) = resolve(
            r#"<FEFExchangeFile><contentHeader/><PLC><partItem/></PLC></FEFExchangeFile>"#,
        );
        assert_eq!(title, TITLE_WITHOUT_NAME);
        assert_eq!(model, MODEL_UNKNOWN);

        let (title, _) = resolve("<FEFExchangeFile><body><contentHeader name=\"Nested\"/></body></FEFExchangeFile>");
        assert_eq!(title, TITLE_WITHOUT_HEADER);

        // the root element itself is not a <PLC> element below the root
        let (_, model) = resolve("<PLC><partItem family=\"Quantum\"/></PLC>");
        assert_eq!(model, MODEL_DEFAULT);
        let (_, model) = resolve(
            "<FEFExchangeFile><PLC/><PLC><partItem family=\"M580\"/></PLC></FEFExchangeFile>",
        );
        assert_eq!(model, "M580");

        let (title, model) = resolve_title(None, &Catalog::new(), &mut Vec::new());
        assert_eq!(title, TITLE_INVALID);
        assert_eq!(model, MODEL_DEFAULT);
    }
}
