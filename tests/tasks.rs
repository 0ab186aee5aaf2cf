use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vlm_harness::config::Config;
use vlm_harness::model::VisionModel;
use vlm_harness::tasks::{self, TaskKind};

struct NullModel;

impl VisionModel for NullModel {
    fn model_name(&self) -> &str {
        "null"
    }
    fn framework(&self) -> &str {
        "test"
    }
    fn predict_on_image(&self, _image: &Path, _prompt: &str) -> anyhow::Result<String> {
        Ok("ok".into())
    }
    fn predict_on_images(&self, _images: &[PathBuf], _prompt: &str) -> anyhow::Result<String> {
        Ok("ok".into())
    }
}

fn fixture_config(dir: &TempDir) -> Config {
    let root = dir.path();
    fs::create_dir_all(root.join("data/images/7")).expect("mkdir images");
    fs::create_dir_all(root.join("data/jsons")).expect("mkdir jsons");
    fs::write(root.join("data/images/7/page_0.jpg"), b"jpg").expect("page");
    fs::write(root.join("data/jsons/7.json"), r#"{"order": [1]}"#).expect("json");
    fs::write(
        root.join("data/annotation.csv"),
        "image_path;question;answer;doc_class;question_type\nimg/0.jpg;What?;cat;passport;number\n",
    )
    .expect("annotation");
    fs::write(root.join("template.txt"), "pages follow; restore their order.").expect("template");
    fs::write(root.join("cls.csv"), "sample_id;model_answer\n7;11\n").expect("cls map");

    let mut cfg = Config::default();
    cfg.run.dataset_name = "demo".into();
    cfg.paths.dataset_dir = root.join("data").display().to_string();
    cfg.paths.answers_dir = root.join("answers").display().to_string();
    cfg.prompts.bundle_template_file = root.join("template.txt").display().to_string();
    cfg.sorting.classification_answers = root.join("cls.csv").display().to_string();
    cfg
}

#[test]
fn parse_accepts_every_registered_task() {
    for kind in TaskKind::ALL {
        let parsed = TaskKind::parse(kind.name()).expect("known task parses");
        assert_eq!(parsed, kind);
    }
}

#[test]
fn parse_is_case_insensitive() {
    assert_eq!(TaskKind::parse("VQA").expect("parse"), TaskKind::Vqa);
    assert_eq!(
        TaskKind::parse(" Rpo-Sorting ").expect("parse"),
        TaskKind::RpoSorting
    );
}

#[test]
fn unknown_task_is_rejected() {
    let err = TaskKind::parse("segmentation").expect_err("unknown task");
    let msg = err.to_string();
    assert!(msg.contains("unknown task 'segmentation'"));
    assert!(msg.contains("vqa"));
    assert!(msg.contains("rpo-sorting"));
}

#[test]
fn labels_and_stages() {
    assert_eq!(TaskKind::Vqa.task_label(), "VQA");
    assert_eq!(TaskKind::Vqa.stage(), None);
    assert_eq!(TaskKind::RpoClassification.task_label(), "RPO");
    assert_eq!(TaskKind::RpoClassification.stage(), Some("classification"));
    assert_eq!(TaskKind::RpoSorting.task_label(), "RPO");
    assert_eq!(TaskKind::RpoSorting.stage(), Some("sorting"));
}

#[test]
fn factory_pairs_runner_with_requested_task() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = fixture_config(&dir);
    for kind in TaskKind::ALL {
        let runner = tasks::build_runner(&cfg, kind, NullModel).expect("factory builds runner");
        assert_eq!(runner.task(), kind);
        assert_eq!(runner.dataset_name(), "demo");
        assert_eq!(runner.answer_count(), 0);
    }
}

#[test]
fn sorting_without_classification_answers_fails() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = fixture_config(&dir);
    cfg.sorting.classification_answers = "".into();
    let err = tasks::build_runner(&cfg, TaskKind::RpoSorting, NullModel).expect_err("no map");
    assert!(err.to_string().contains("classification_answers"));
}

#[test]
fn bundle_tasks_require_a_prompt_template() {
    let dir = TempDir::new().expect("tempdir");
    let mut cfg = fixture_config(&dir);
    cfg.prompts.bundle_template_file = "".into();
    let err =
        tasks::build_runner(&cfg, TaskKind::RpoClassification, NullModel).expect_err("no template");
    assert!(err.to_string().contains("bundle_template_file"));
}

#[test]
fn inspect_reports_index_size_without_a_model() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = fixture_config(&dir);

    let vqa = tasks::inspect(&cfg, TaskKind::Vqa).expect("vqa summary");
    assert_eq!(vqa.task, "vqa");
    assert_eq!(vqa.samples, 1);

    let rpo = tasks::inspect(&cfg, TaskKind::RpoClassification).expect("rpo summary");
    assert_eq!(rpo.stage, Some("classification"));
    assert_eq!(rpo.samples, 1);
}
