use landmarkit::validation::{validate_corpus, IssueKind, ValidateOptions};
use serde_json::json;

mod common;

use common::{label_value, Corpus};

#[test]
fn synthetic_corpus_reports_exactly_the_planted_issues() {
    let corpus = Corpus::new();
    corpus.pair("clean", 100, 80);

    // Pairing gap: image without a label.
    corpus.image("unlabeled.bmp", 100, 80);

    // Malformed label.
    corpus.image("broken.bmp", 100, 80);
    corpus.raw_label("broken.json", "{\"image\": \"broken.bmp\", \"width\": 100,");

    // One out-of-bounds coordinate.
    corpus.image("outside.bmp", 100, 80);
    let mut outside = label_value("outside.bmp", 100, 80);
    outside["landmarks"][2] = json!({"id": 3, "x": 150.0, "y": 10.0});
    corpus.label("outside.json", &outside);

    // Declared size differs from the actual image.
    corpus.image("resized.bmp", 100, 80);
    let mut resized = label_value("resized.bmp", 100, 80);
    resized["width"] = json!(120);
    corpus.label("resized.json", &resized);

    let outcome = validate_corpus(&corpus.images, &corpus.labels, &ValidateOptions::default())
        .expect("validate corpus");

    let rows: Vec<(IssueKind, &str)> = outcome
        .report
        .issues
        .iter()
        .map(|issue| (issue.kind, issue.subject.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (IssueKind::MissingLabel, "unlabeled.bmp"),
            (IssueKind::BadJson, "broken.json"),
            (IssueKind::SizeMismatch, "resized.bmp"),
            (IssueKind::OutOfBounds, "outside.bmp"),
        ]
    );

    assert_eq!(outcome.manifest.len(), 1);
    assert_eq!(
        outcome.manifest.entries[0].label,
        corpus.labels.join("clean.json")
    );
}

#[test]
fn label_missing_width_yields_one_missing_field() {
    let corpus = Corpus::new();
    corpus.image("a.bmp", 64, 48);
    let mut label = label_value("a.bmp", 64, 48);
    label
        .as_object_mut()
        .expect("object")
        .remove("width");
    corpus.label("a.json", &label);

    let outcome = validate_corpus(&corpus.images, &corpus.labels, &ValidateOptions::default())
        .expect("validate corpus");

    assert_eq!(outcome.report.len(), 1);
    assert_eq!(outcome.report.issues[0].kind, IssueKind::MissingField);
    assert_eq!(outcome.report.issues[0].subject, "a.json");
    assert!(outcome.manifest.is_empty());
}

#[test]
fn report_is_reproducible_across_runs() {
    let corpus = Corpus::new();
    for i in 0..12 {
        corpus.image(&format!("img{i}.bmp"), 32, 32);
        let mut label = label_value(&format!("img{i}.bmp"), 32, 32);
        label["landmarks"][0] = json!({"id": 1, "x": -1.0, "y": 0.0});
        corpus.label(&format!("img{i}.json"), &label);
    }

    let first = validate_corpus(&corpus.images, &corpus.labels, &ValidateOptions::default())
        .expect("first run");
    let second = validate_corpus(&corpus.images, &corpus.labels, &ValidateOptions::default())
        .expect("second run");

    assert_eq!(first.report.len(), 12);
    assert_eq!(first.report, second.report);
}

#[test]
fn csv_report_matches_cleaning_table() {
    let corpus = Corpus::new();
    corpus.image("lonely.bmp", 10, 10);

    let outcome = validate_corpus(&corpus.images, &corpus.labels, &ValidateOptions::default())
        .expect("validate corpus");
    let csv_path = corpus.path("report.csv");
    outcome.report.write_csv_file(&csv_path).expect("write csv");

    let text = std::fs::read_to_string(csv_path).expect("read csv");
    assert_eq!(
        text,
        "issue_type,file_or_image,details\nMissingLabel,lonely.bmp,expected lonely.json\n"
    );
}
