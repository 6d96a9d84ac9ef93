use std::fs::write;

use tempfile::NamedTempFile;

use tabreport::config::{load_report_config, Language, ReportConfig};

#[test]
fn builtin_config_has_five_pages_and_six_portfolios_per_language() {
    let config = ReportConfig::builtin();

    for language in [Language::En, Language::Fr] {
        assert_eq!(config.page_numbers(language), vec![1, 2, 3, 4, 5]);
        assert_eq!(config.portfolios(language).len(), 6);
    }
    assert_eq!(config.merged_dir, "merged");
    assert_eq!(config.page_ext, "pdf");

    // Page selection keeps page order and drops unknown numbers.
    let views = config.views_for(Language::En, &[3, 1, 99]);
    let pages: Vec<u8> = views.iter().map(|v| v.page_number).collect();
    assert_eq!(pages, vec![1, 3]);
}

#[test]
fn loads_override_config_from_yaml() {
    let yaml = r#"
merged_dir: bundles
languages:
  EN:
    portfolios: [AAA, BBB]
    views:
      - page: 2
        view_id: en-two
      - page: 1
        view_id: en-one
  FR:
    portfolios: [CCC]
    views:
      - page: 1
        view_id: fr-one
"#;
    let file = NamedTempFile::new().unwrap();
    write(file.path(), yaml).unwrap();

    let config = load_report_config(file.path()).expect("config should load");
    assert_eq!(config.merged_dir, "bundles");
    assert_eq!(config.page_ext, "pdf");
    assert_eq!(config.portfolios(Language::En), ["AAA", "BBB"]);
    assert_eq!(config.portfolios(Language::Fr), ["CCC"]);

    // View tables are sorted by page number on load.
    let en = config.views_for(Language::En, &[1, 2]);
    assert_eq!(en[0].view_id, "en-one");
    assert_eq!(en[1].view_id, "en-two");
}

#[test]
fn missing_language_section_is_an_error() {
    let yaml = r#"
languages:
  EN:
    portfolios: [AAA]
    views:
      - page: 1
        view_id: en-one
"#;
    let file = NamedTempFile::new().unwrap();
    write(file.path(), yaml).unwrap();

    let err = load_report_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("FR"), "got: {err:#}");
}

#[test]
fn duplicate_page_number_is_an_error() {
    let yaml = r#"
languages:
  EN:
    portfolios: [AAA]
    views:
      - page: 1
        view_id: en-one
      - page: 1
        view_id: en-dup
  FR:
    portfolios: [CCC]
    views:
      - page: 1
        view_id: fr-one
"#;
    let file = NamedTempFile::new().unwrap();
    write(file.path(), yaml).unwrap();

    let err = load_report_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("repeats page number 1"), "got: {err:#}");
}

#[test]
fn invalid_yaml_is_an_error() {
    let file = NamedTempFile::new().unwrap();
    write(file.path(), b"not-yaml: [:::").unwrap();

    let err = load_report_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("YAML"), "got: {err:#}");
}
