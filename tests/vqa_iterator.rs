use std::fs;
use tempfile::TempDir;
use vlm_harness::config::Config;
use vlm_harness::dataset::{SampleSource, VqaIterator};
use vlm_harness::tasks::TaskKind;

fn annotation_config(dir: &TempDir, rows: &[&str]) -> Config {
    let mut contents = String::from("image_path;question;answer;doc_class;question_type\n");
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::create_dir_all(dir.path().join("data")).expect("mkdir");
    fs::write(dir.path().join("data/annotation.csv"), contents).expect("annotation");

    let mut cfg = Config::default();
    cfg.run.dataset_name = "demo".into();
    cfg.paths.dataset_dir = dir.path().join("data").display().to_string();
    cfg
}

#[test]
fn yields_every_row_then_stays_exhausted() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = annotation_config(
        &dir,
        &[
            "a.jpg;Q1?;A1;passport;number",
            "b.jpg;Q2?;A2;invoice;total",
            "c.jpg;Q3?;A3;invoice;date",
        ],
    );

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");
    assert_eq!(it.task(), TaskKind::Vqa);
    assert_eq!(it.dataset_name(), "demo");
    assert_eq!(it.remaining(), 3);

    let first = it.next_sample().expect("first sample");
    assert_eq!(first.id, 0);
    assert_eq!(first.question, "Q1?");
    assert_eq!(first.answer, "A1");
    assert_eq!(first.doc_class, "passport");
    assert_eq!(first.question_type, "number");
    assert!(first.image_path.ends_with("a.jpg"));
    assert!(first.image_path.starts_with(dir.path()));

    assert!(it.next_sample().is_some());
    assert!(it.next_sample().is_some());
    assert!(it.next_sample().is_none());
    assert!(it.next_sample().is_none());
    assert_eq!(it.remaining(), 0);
}

#[test]
fn offset_skips_rows_but_keeps_absolute_ids() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = annotation_config(
        &dir,
        &[
            "a.jpg;Q1?;A1;passport;number",
            "b.jpg;Q2?;A2;invoice;total",
            "c.jpg;Q3?;A3;invoice;date",
        ],
    );
    cfg.run.start = 2;

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");
    assert_eq!(it.remaining(), 1);
    let sample = it.next_sample().expect("sample");
    assert_eq!(sample.id, 2);
    assert_eq!(sample.question, "Q3?");
}

#[test]
fn offset_past_the_end_yields_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = annotation_config(&dir, &["a.jpg;Q1?;A1;passport;number"]);
    cfg.run.start = 10;

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");
    assert_eq!(it.remaining(), 0);
    assert!(it.next_sample().is_none());
}

#[test]
fn joint_filter_keeps_only_full_matches() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = annotation_config(
        &dir,
        &[
            "a.jpg;Q1?;A1;passport;number",
            "b.jpg;Q2?;A2;invoice;number",
            "c.jpg;Q3?;A3;passport;date",
        ],
    );
    cfg.run.filter_doc_class = "passport".into();
    cfg.run.filter_question_type = "number".into();

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");
    assert_eq!(it.remaining(), 1);
    let sample = it.next_sample().expect("sample");
    assert_eq!(sample.id, 0);
    assert_eq!(sample.doc_class, "passport");
    assert_eq!(sample.question_type, "number");
}

#[test]
fn half_a_filter_filters_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = annotation_config(
        &dir,
        &[
            "a.jpg;Q1?;A1;passport;number",
            "b.jpg;Q2?;A2;invoice;number",
        ],
    );
    cfg.run.filter_doc_class = "passport".into();

    let it = VqaIterator::from_config(&cfg).expect("iterator");
    assert_eq!(it.remaining(), 2);
}

#[test]
fn prompt_collection_rewrites_matching_questions() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = annotation_config(
        &dir,
        &[
            "a.jpg;Q1?;A1;passport;number",
            "b.jpg;Q2?;A2;invoice;total",
        ],
    );
    let collection = dir.path().join("prompts.json");
    fs::write(
        &collection,
        r#"{"passport": {"number": "Read the passport number."}}"#,
    )
    .expect("collection");
    cfg.prompts.collection_file = collection.display().to_string();

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");

    let first = it.next_sample().expect("first");
    assert_eq!(first.question, "Read the passport number.");
    assert_eq!(first.answer, "A1");

    // No (invoice, total) prompt registered: the annotation question stays.
    let second = it.next_sample().expect("second");
    assert_eq!(second.question, "Q2?");
}

#[test]
fn quoted_fields_keep_the_separator() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = annotation_config(&dir, &[r#"a.jpg;"Which total; gross or net?";A1;invoice;total"#]);

    let mut it = VqaIterator::from_config(&cfg).expect("iterator");
    let sample = it.next_sample().expect("sample");
    assert_eq!(sample.question, "Which total; gross or net?");
}

#[test]
fn missing_annotation_file_fails_up_front() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = Config::default();
    cfg.paths.dataset_dir = dir.path().join("data").display().to_string();

    let err = VqaIterator::from_config(&cfg).expect_err("no annotation file");
    assert!(format!("{err:#}").contains("annotation"));
}
