mod common;

use common::{ACTIVATION_ID, product, range};
use pretty_assertions::assert_eq;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::SeedableRng;
use rand::rngs::StdRng;
use spp_pkey::{PKeyAlgorithm, PKeyConfig, PKeyError, ProductKey};
use spp_types::Guid;
use std::fs;

// ── Key ranges ──────────────────────────────────────────────────

#[test]
fn range_bounds_are_inclusive() {
    let r = range(100, 200, "Retail");
    assert!(r.contains(100));
    assert!(r.contains(150));
    assert!(r.contains(200));
    assert!(!r.contains(99));
    assert!(!r.contains(201));
}

#[test]
fn primary_part_number_stops_at_separator() {
    let mut r = range(0, 1, "Retail");
    assert_eq!(r.primary_part_number(), "X15-12345");
    r.part_number = "X16-1;X16-2".to_string();
    assert_eq!(r.primary_part_number(), "X16-1");
    r.part_number = "X17".to_string();
    assert_eq!(r.primary_part_number(), "X17");
}

// ── Random keys ─────────────────────────────────────────────────

#[test]
fn random_key_draws_from_range() {
    let config = product(PKeyAlgorithm::Pkey2009, vec![range(1000, 2000, "Retail")]);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..32 {
        let key = config.random_key_with(&mut rng).unwrap();
        assert!((1000..2000).contains(&key.serial()));
        assert_eq!(key.group(), 4096);
        assert_eq!(key.security(), 0);
        assert!(!key.upgrade());

        let parsed = ProductKey::parse(key.as_str()).unwrap();
        assert_eq!(parsed.params(), key.params());
    }
}

#[test]
fn random_key_carries_product_details() {
    let config = product(PKeyAlgorithm::Pkey2009, vec![range(5, 5, "Volume")]);
    let key = config.random_key().unwrap();
    assert_eq!(key.serial(), 5);

    let details = key.details();
    assert_eq!(details.eula_type, "Volume");
    assert_eq!(details.part_number, "X15-12345");
    assert_eq!(details.edition, "Professional");
    assert_eq!(details.channel, "Retail");
    assert_eq!(details.activation_id, Guid::parse(ACTIVATION_ID).unwrap());
}

#[test]
fn modern_keys_skip_upgrade_ranges() {
    let config = product(
        PKeyAlgorithm::Pkey2009,
        vec![range(0, 10, "WAU"), range(500, 510, "Retail")],
    );
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..16 {
        let key = config.random_key_with(&mut rng).unwrap();
        assert_eq!(key.details().eula_type, "Retail");
    }
}

#[test]
fn legacy_keys_keep_upgrade_ranges() {
    let config = product(PKeyAlgorithm::Pkey2005, vec![range(0, 10, "WAU")]);
    assert_eq!(config.usable_ranges().unwrap().len(), 1);
    assert!(config.random_key().is_ok());
}

#[test]
fn upgrade_only_product_is_rejected() {
    let config = product(PKeyAlgorithm::Pkey2009, vec![range(0, 10, "WAUOEM")]);
    assert!(matches!(config.random_key(), Err(PKeyError::UpgradeOnly(_))));
}

#[test]
fn product_without_ranges_is_rejected() {
    let config = product(PKeyAlgorithm::Pkey2005, Vec::new());
    assert!(matches!(config.random_key(), Err(PKeyError::NoRanges(_))));
}

// ── Product lookup ──────────────────────────────────────────────

fn two_products() -> PKeyConfig {
    let mut config = PKeyConfig::new();
    let mut first = product(PKeyAlgorithm::Pkey2009, vec![range(0, 999, "Retail")]);
    first.activation_id = Guid::parse("00000000-0000-0000-0000-000000000001").unwrap();
    let second = product(PKeyAlgorithm::Pkey2009, vec![range(1000, 1999, "OEM")]);
    assert!(config.insert(first));
    assert!(config.insert(second));
    config
}

#[test]
fn match_params_finds_owning_product() {
    let config = two_products();
    let found = config.match_params(4096, 1500).unwrap();
    assert_eq!(found.activation_id, Guid::parse(ACTIVATION_ID).unwrap());
    let found = config.match_params(4096, 999).unwrap();
    assert_eq!(found.ranges[0].eula_type, "Retail");
}

#[test]
fn match_params_misses() {
    let config = two_products();
    assert!(matches!(
        config.match_params(4096, 2000),
        Err(PKeyError::ProductNotFound {
            group: 4096,
            serial: 2000
        })
    ));
    assert!(config.match_params(4097, 10).is_err());
}

#[test]
fn insert_skips_duplicates_and_empty_products() {
    let mut config = two_products();
    let duplicate = product(PKeyAlgorithm::Pkey2005, vec![range(0, 1, "Retail")]);
    assert!(!config.insert(duplicate));

    let mut empty = product(PKeyAlgorithm::Pkey2005, Vec::new());
    empty.activation_id = Guid::parse("00000000-0000-0000-0000-000000000002").unwrap();
    assert!(!config.insert(empty));

    assert_eq!(config.len(), 2);
    assert_eq!(
        config
            .get(&Guid::parse(ACTIVATION_ID).unwrap())
            .unwrap()
            .algorithm,
        PKeyAlgorithm::Pkey2009
    );
}

// ── XrML license ────────────────────────────────────────────────

const PKEY_CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ProductKeyConfiguration xmlns="http://www.microsoft.com/DRM/PKEY/Configuration/2.0">
  <Configurations>
    <Configuration>
      <ActConfigId>{73111121-5638-40f6-bc11-f1d7b0d64300}</ActConfigId>
      <RefGroupId>206</RefGroupId>
      <EditionId>Enterprise</EditionId>
      <ProductDescription>Win 10 RTM Enterprise Volume:GVLK</ProductDescription>
      <ProductKeyType>Volume:GVLK</ProductKeyType>
      <IsRandomized>false</IsRandomized>
    </Configuration>
    <Configuration>
      <ActConfigId>{00000000-0000-0000-0000-0000000000aa}</ActConfigId>
      <RefGroupId>206</RefGroupId>
      <EditionId>Unranged</EditionId>
      <ProductDescription></ProductDescription>
      <ProductKeyType>Retail</ProductKeyType>
      <IsRandomized>false</IsRandomized>
    </Configuration>
    <Configuration>
      <ActConfigId>{1e0d5e71-0f4a-4b37-a3dd-8b0f1b1cbd4c}</ActConfigId>
      <RefGroupId>4</RefGroupId>
      <EditionId>Professional</EditionId>
      <ProductDescription>Win 7 RTM Professional OEM:SLP</ProductDescription>
      <ProductKeyType>OEM:SLP</ProductKeyType>
      <IsRandomized>True</IsRandomized>
    </Configuration>
  </Configurations>
  <KeyRanges>
    <KeyRange>
      <RefActConfigId>{73111121-5638-40f6-bc11-f1d7b0d64300}</RefActConfigId>
      <PartNumber>[TH]X19-98698</PartNumber>
      <EulaType>Volume</EulaType>
      <IsValid>true</IsValid>
      <Start>0</Start>
      <End>999999</End>
    </KeyRange>
    <KeyRange>
      <RefActConfigId>{1e0d5e71-0f4a-4b37-a3dd-8b0f1b1cbd4c}</RefActConfigId>
      <PartNumber>X15-39025</PartNumber>
      <EulaType>OEM</EulaType>
      <IsValid>false</IsValid>
      <Start>100</Start>
      <End>200</End>
    </KeyRange>
  </KeyRanges>
  <PublicKeys>
    <PublicKey>
      <GroupId>206</GroupId>
      <AlgorithmId>msft:rm/algorithm/pkey/2009</AlgorithmId>
    </PublicKey>
    <PublicKey>
      <GroupId>4</GroupId>
      <AlgorithmId>msft:rm/algorithm/pkey/2005</AlgorithmId>
    </PublicKey>
  </PublicKeys>
</ProductKeyConfiguration>"#;

fn license_with(name: &str, data: &str) -> String {
    format!(
        r##"<?xml version="1.0" encoding="utf-8"?>
<rg:licenseGroup xmlns:rg="urn:mpeg:mpeg21:2003:01-REL-R-NS">
  <r:license xmlns:r="urn:mpeg:mpeg21:2003:01-REL-R-NS" licenseId="{{0}}">
    <r:title>Product Key Configuration</r:title>
    <r:otherInfo xmlns:r="urn:mpeg:mpeg21:2003:01-REL-R-NS">
      <tm:infoTables xmlns:tm="http://www.microsoft.com/DRM/XrML2/TM/v2">
        <tm:infoList tag="#global">
          <tm:infoStr name="licenseType">msft:sl/PKEYCONFIG/SIGNED</tm:infoStr>
          <tm:infoBin name="{name}">{data}</tm:infoBin>
        </tm:infoList>
      </tm:infoTables>
    </r:otherInfo>
  </r:license>
</rg:licenseGroup>"##
    )
}

fn license() -> String {
    let encoded = BASE64.encode(PKEY_CONFIG);
    // licenses wrap the blob across lines
    let wrapped: Vec<&str> = encoded
        .as_bytes()
        .chunks(76)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();
    license_with("pkeyConfigData", &wrapped.join("\n"))
}

#[test]
fn loads_license_configuration() {
    let config = PKeyConfig::from_license(&license()).unwrap();
    assert_eq!(config.len(), 2);

    let product = config.match_params(206, 42).unwrap();
    assert_eq!(
        product.activation_id,
        Guid::parse("73111121-5638-40f6-bc11-f1d7b0d64300").unwrap()
    );
    assert_eq!(product.edition, "Enterprise");
    assert_eq!(product.description, "Win 10 RTM Enterprise Volume:GVLK");
    assert_eq!(product.channel, "Volume:GVLK");
    assert_eq!(product.algorithm, PKeyAlgorithm::Pkey2009);
    assert!(!product.randomized);
    assert_eq!(
        product.ranges,
        vec![spp_pkey::KeyRange {
            start: 0,
            end: 999_999,
            eula_type: "Volume".to_string(),
            part_number: "[TH]X19-98698".to_string(),
            valid: true,
        }]
    );

    let legacy = config.match_params(4, 150).unwrap();
    assert_eq!(legacy.algorithm, PKeyAlgorithm::Pkey2005);
    assert!(legacy.randomized);
    assert!(!legacy.ranges[0].valid);
}

#[test]
fn license_configuration_without_ranges_is_skipped() {
    let config = PKeyConfig::from_license(&license()).unwrap();
    let unranged = Guid::parse("00000000-0000-0000-0000-0000000000aa").unwrap();
    assert!(config.get(&unranged).is_none());
}

#[test]
fn load_license_adds_only_new_products() {
    let mut config = two_products();
    assert_eq!(config.load_license(&license()).unwrap(), 2);
    assert_eq!(config.len(), 4);
    assert_eq!(config.load_license(&license()).unwrap(), 0);
}

#[test]
fn license_keys_validate() {
    let config = PKeyConfig::from_license(&license()).unwrap();
    let product = config.match_params(206, 0).unwrap();
    let key = product.random_key().unwrap();
    let parsed = ProductKey::parse(key.as_str()).unwrap();
    assert_eq!(parsed.group(), 206);
    assert!(config.match_params(parsed.group(), parsed.serial()).is_ok());
}

#[test]
fn load_detects_license_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkeyconfig.xrm-ms");
    fs::write(&path, format!("\u{feff}{}", license())).unwrap();
    assert_eq!(PKeyConfig::load(&path).unwrap().len(), 2);
}

#[test]
fn license_without_config_blob_is_rejected() {
    let contents = license_with("productName", &BASE64.encode(PKEY_CONFIG));
    assert!(matches!(
        PKeyConfig::from_license(&contents),
        Err(PKeyError::License(_))
    ));
}

#[test]
fn license_with_bad_base64_is_rejected() {
    let contents = license_with("pkeyConfigData", "not*base64");
    assert!(matches!(
        PKeyConfig::from_license(&contents),
        Err(PKeyError::License(_))
    ));
}

#[test]
fn malformed_license_is_xml_error() {
    assert!(matches!(
        PKeyConfig::from_license("<rg:licenseGroup"),
        Err(PKeyError::Xml(_))
    ));
}

#[test]
fn license_with_unknown_algorithm_is_rejected() {
    let inner = PKEY_CONFIG.replace("pkey/2005", "pkey/2012");
    let contents = license_with("pkeyConfigData", &BASE64.encode(inner));
    assert!(matches!(
        PKeyConfig::from_license(&contents),
        Err(PKeyError::UnknownAlgorithm(_))
    ));
}

#[test]
fn license_with_missing_group_key_is_rejected() {
    let inner = PKEY_CONFIG.replace("<GroupId>4</GroupId>", "<GroupId>5</GroupId>");
    let contents = license_with("pkeyConfigData", &BASE64.encode(inner));
    assert!(matches!(
        PKeyConfig::from_license(&contents),
        Err(PKeyError::License(_))
    ));
}

// ── JSON ────────────────────────────────────────────────────────

const CONFIG_JSON: &str = r#"[
  {
    "groupId": 206,
    "edition": "Enterprise",
    "description": "Volume:GVLK",
    "channel": "Volume:GVLK",
    "algorithm": "msft:rm/algorithm/pkey/2009",
    "activationId": "73111121-5638-40f6-bc11-f1d7b0d64300",
    "ranges": [
      { "start": 0, "end": 999999, "eulaType": "Volume", "partNumber": "[TH]X19-98698", "valid": true }
    ]
  }
]"#;

#[test]
fn loads_json_configuration() {
    let config = PKeyConfig::from_json(CONFIG_JSON).unwrap();
    assert_eq!(config.len(), 1);

    let product = config.match_params(206, 42).unwrap();
    assert_eq!(product.edition, "Enterprise");
    assert_eq!(product.algorithm, PKeyAlgorithm::Pkey2009);
    assert!(!product.randomized);
    assert!(product.ranges[0].valid);
}

#[test]
fn loads_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkeyconfig.json");
    fs::write(&path, CONFIG_JSON).unwrap();

    let config = PKeyConfig::load(&path).unwrap();
    assert_eq!(config.products().count(), 1);
}

#[test]
fn rejects_unknown_algorithm() {
    let json = CONFIG_JSON.replace("pkey/2009", "pkey/2012");
    assert!(matches!(
        PKeyConfig::from_json(&json),
        Err(PKeyError::Config(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        PKeyConfig::load(&dir.path().join("absent.json")),
        Err(PKeyError::Io(_))
    ));
}
