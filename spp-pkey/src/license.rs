//! Product key configuration as shipped inside an XrML license.
//!
//! The license carries a base64 `pkeyConfigData` blob holding a
//! `ProductKeyConfiguration` document:
//!
//! ```text
//! licenseGroup/license/otherInfo/infoTables/infoList/infoBin[@name="pkeyConfigData"]
//!   ProductKeyConfiguration
//!     Configurations/Configuration   ActConfigId, RefGroupId, EditionId, ...
//!     KeyRanges/KeyRange             RefActConfigId, Start, End, ...
//!     PublicKeys/PublicKey           GroupId, AlgorithmId
//! ```

use crate::config::{KeyRange, ProductConfig};
use crate::error::{PKeyError, PKeyResult};
use crate::key::PKeyAlgorithm;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use roxmltree::{Document, Node};
use spp_types::Guid;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

const REL_NS: &str = "urn:mpeg:mpeg21:2003:01-REL-R-NS";
const TM_NS: &str = "http://www.microsoft.com/DRM/XrML2/TM/v2";
const PKEY_NS: &str = "http://www.microsoft.com/DRM/PKEY/Configuration/2.0";

const CONFIG_DATA_NAME: &str = "pkeyConfigData";

/// Extracts the product configurations from license contents, in document
/// order. Configurations without key ranges are skipped.
pub(crate) fn parse_license(contents: &str) -> PKeyResult<Vec<ProductConfig>> {
    let config_xml = config_data(contents)?;
    parse_config_data(&config_xml)
}

/// Decodes the `pkeyConfigData` blob of an XrML license.
fn config_data(contents: &str) -> PKeyResult<String> {
    let doc = Document::parse(contents.trim_start_matches('\u{feff}'))?;
    let root = doc.root_element();
    if !root.has_tag_name((REL_NS, "licenseGroup")) {
        return Err(PKeyError::License(format!(
            "root element is {}, not licenseGroup",
            root.tag_name().name()
        )));
    }

    let info_bin = root
        .children()
        .filter(|n| n.has_tag_name((REL_NS, "license")))
        .filter_map(|n| child(n, REL_NS, "otherInfo"))
        .filter_map(|n| child(n, TM_NS, "infoTables"))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name((TM_NS, "infoList"))))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name((TM_NS, "infoBin"))))
        .find(|n| n.attribute("name") == Some(CONFIG_DATA_NAME))
        .ok_or_else(|| PKeyError::License(format!("no {CONFIG_DATA_NAME} infoBin")))?;

    let encoded: String = info_bin
        .text()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| PKeyError::License(format!("invalid {CONFIG_DATA_NAME} base64: {e}")))?;
    let xml = String::from_utf8(raw)
        .map_err(|e| PKeyError::License(format!("{CONFIG_DATA_NAME} is not UTF-8: {e}")))?;
    Ok(xml.trim_start_matches('\u{feff}').to_string())
}

/// Parses a `ProductKeyConfiguration` document.
fn parse_config_data(xml: &str) -> PKeyResult<Vec<ProductConfig>> {
    let doc = Document::parse(xml)?;
    let root = doc
        .descendants()
        .find(|n| n.has_tag_name((PKEY_NS, "ProductKeyConfiguration")))
        .ok_or_else(|| PKeyError::License("no ProductKeyConfiguration element".to_string()))?;

    let mut algorithms: HashMap<u32, PKeyAlgorithm> = HashMap::new();
    for key in sections(root, "PublicKeys", "PublicKey") {
        let group = number(key, "GroupId")?;
        let algorithm = PKeyAlgorithm::from_str(text(key, "AlgorithmId")?)?;
        algorithms.insert(group, algorithm);
    }

    let mut ranges: HashMap<&str, Vec<KeyRange>> = HashMap::new();
    for node in sections(root, "KeyRanges", "KeyRange") {
        let range = KeyRange {
            start: number(node, "Start")?,
            end: number(node, "End")?,
            eula_type: text(node, "EulaType")?.to_string(),
            part_number: text(node, "PartNumber")?.to_string(),
            valid: flag(node, "IsValid"),
        };
        ranges
            .entry(text(node, "RefActConfigId")?)
            .or_default()
            .push(range);
    }

    let mut products = Vec::new();
    for node in sections(root, "Configurations", "Configuration") {
        let act_config_id = text(node, "ActConfigId")?;
        let Some(product_ranges) = ranges.remove(act_config_id) else {
            debug!(act_config_id, "configuration without key ranges skipped");
            continue;
        };
        let group_id = number(node, "RefGroupId")?;
        let Some(&algorithm) = algorithms.get(&group_id) else {
            warn!(act_config_id, group_id, "configuration references unknown group");
            return Err(PKeyError::License(format!(
                "no public key for group {group_id}"
            )));
        };
        products.push(ProductConfig {
            group_id,
            edition: text(node, "EditionId")?.to_string(),
            description: optional_text(node, "ProductDescription").to_string(),
            channel: text(node, "ProductKeyType")?.to_string(),
            randomized: flag(node, "IsRandomized"),
            algorithm,
            ranges: product_ranges,
            activation_id: Guid::parse(act_config_id)?,
        });
    }

    debug!(
        products = products.len(),
        groups = algorithms.len(),
        "product key configuration parsed"
    );
    Ok(products)
}

fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name((ns, name)))
}

/// Every `item` element under every `section` element of the configuration.
fn sections<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    section: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    root.children()
        .filter(move |n| n.has_tag_name((PKEY_NS, section)))
        .flat_map(move |n| n.children().filter(move |c| c.has_tag_name((PKEY_NS, item))))
}

fn optional_text<'a>(node: Node<'a, '_>, name: &str) -> &'a str {
    child(node, PKEY_NS, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .unwrap_or_default()
}

fn text<'a>(node: Node<'a, '_>, name: &str) -> PKeyResult<&'a str> {
    child(node, PKEY_NS, name)
        .map(|c| c.text().unwrap_or_default().trim())
        .ok_or_else(|| {
            PKeyError::License(format!("{} is missing {name}", node.tag_name().name()))
        })
}

fn number(node: Node<'_, '_>, name: &str) -> PKeyResult<u32> {
    let value = text(node, name)?;
    value
        .parse()
        .map_err(|_| PKeyError::License(format!("{name} is not a number: {value}")))
}

fn flag(node: Node<'_, '_>, name: &str) -> bool {
    optional_text(node, name).eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_xml(body: &str) -> String {
        format!(r#"<ProductKeyConfiguration xmlns="{PKEY_NS}">{body}</ProductKeyConfiguration>"#)
    }

    #[test]
    fn flags_are_case_insensitive() {
        let xml = config_xml("<KeyRanges><KeyRange><IsValid>TRUE</IsValid></KeyRange></KeyRanges>");
        let doc = Document::parse(&xml).unwrap();
        let node = sections(doc.root_element(), "KeyRanges", "KeyRange").next().unwrap();
        assert!(flag(node, "IsValid"));
        assert!(!flag(node, "Absent"));
    }

    #[test]
    fn foreign_namespace_is_ignored() {
        let xml = r#"<ProductKeyConfiguration xmlns="urn:other"><Configurations/></ProductKeyConfiguration>"#;
        assert!(matches!(parse_config_data(xml), Err(PKeyError::License(_))));
    }

    #[test]
    fn range_without_bounds_is_rejected() {
        let xml = config_xml(
            "<KeyRanges><KeyRange><RefActConfigId>x</RefActConfigId><End>1</End></KeyRange></KeyRanges>",
        );
        assert!(matches!(parse_config_data(&xml), Err(PKeyError::License(_))));
    }

    #[test]
    fn configuration_without_ranges_is_skipped() {
        let xml = config_xml(
            "<Configurations><Configuration>\
               <ActConfigId>{73111121-5638-40f6-bc11-f1d7b0d64300}</ActConfigId>\
               <RefGroupId>206</RefGroupId>\
             </Configuration></Configurations>",
        );
        assert!(parse_config_data(&xml).unwrap().is_empty());
    }
}
