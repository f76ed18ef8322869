use bibxml_tools::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../bibxml-tools.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.http.timeout_seconds, 30);
    assert_eq!(cfg.http.requested_with, "xml2rfcResolver");
    assert_eq!(cfg.report.report_suffix, "-report.html");
    assert_eq!(
        cfg.aliases_for("bibxml4"),
        Some(["bibxml-w3c".to_string()].as_slice())
    );
    assert_eq!(cfg.aliases_for("bibxml-nist"), Some([].as_slice()));
    assert_eq!(cfg.aliases_for("nonsense"), None);
}

#[test]
fn defaults_match_example() {
    let raw = include_str!("../bibxml-tools.example.toml");
    let from_file: Config = toml::from_str(raw).expect("parse TOML");
    let built_in = Config::default();
    assert_eq!(from_file.aliases, built_in.aliases);
    assert_eq!(from_file.http.max_error_body_chars, built_in.http.max_error_body_chars);
}

#[test]
fn empty_config_is_all_defaults() {
    let cfg: Config = toml::from_str("").expect("parse TOML");
    assert_eq!(cfg.http.timeout_seconds, 30);
    assert!(cfg.aliases_for("bibxml9").is_some());
    assert!(!cfg.logging.write_to_file);
}
