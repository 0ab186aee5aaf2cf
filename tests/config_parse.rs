use vlm_harness::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../vlm-harness.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.output.delimiter, ";");
    assert!(!cfg.paths.answers_dir.is_empty());
    assert!(!cfg.run.task.is_empty());
}

#[test]
fn defaults_are_usable() {
    let cfg = Config::default();
    assert_eq!(cfg.run.task, "vqa");
    assert_eq!(cfg.run.start, 0);
    assert_eq!(cfg.postprocess.strip_separators, ",");
    assert!(!cfg.postprocess.trim_answers);
    assert_eq!(cfg.output_delimiter().expect("delimiter"), b';');
}

#[test]
fn class_filter_requires_both_halves() {
    let mut cfg = Config::default();
    assert!(cfg.run.class_filter().is_none());

    cfg.run.filter_doc_class = "passport".into();
    assert!(cfg.run.class_filter().is_none());

    cfg.run.filter_question_type = "number".into();
    assert_eq!(cfg.run.class_filter(), Some(("passport", "number")));
}

#[test]
fn multi_character_delimiter_is_rejected() {
    let mut cfg = Config::default();
    cfg.output.delimiter = " ;".into();
    let err = cfg.output_delimiter().expect_err("two characters");
    assert!(err.to_string().contains("single character"));
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let raw = r#"
[run]
task = "rpo-classification"
dataset_name = "court-filings"
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.run.task, "rpo-classification");
    assert_eq!(cfg.run.dataset_name, "court-filings");
    assert_eq!(cfg.paths.dataset_dir, "data");
    assert_eq!(cfg.output.delimiter, ";");
}
