use predicates::prelude::*;

const NO_PANDOC: &str = "/nonexistent/bookmagic/pandoc";

fn bookmagic(root: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookmagic");
    cmd.env_remove("BOOKMAGIC_ROOT")
        .env_remove("BOOKMAGIC_TEMPLATES")
        .arg("--root")
        .arg(root)
        .args(["--pandoc", NO_PANDOC]);
    cmd
}

#[test]
fn templates_lists_builtins_as_json() {
    let temp = tempfile::TempDir::new().unwrap();
    bookmagic(temp.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"serif-classic\""))
        .stdout(predicate::str::contains("\"id\": \"novella-a5\""));
}

#[test]
fn templates_file_extends_registry() {
    let temp = tempfile::TempDir::new().unwrap();
    let registry = temp.path().join("templates.yaml");
    std::fs::write(
        &registry,
        r#"templates:
  - id: letter-wide
    name: Letter Wide
    trim_size: "8.5 x 11"
    font_family: Lora
    font_size_pt: 12
    description: Workbook layout.
    page:
      size: { kind: named, format: Letter }
      margins: { top_in: 1, bottom_in: 1, left_in: 1, right_in: 1 }
"#,
    )
    .unwrap();

    bookmagic(temp.path())
        .arg("--templates")
        .arg(&registry)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"letter-wide\""));
}

#[test]
fn upload_then_preview() {
    let temp = tempfile::TempDir::new().unwrap();
    let manuscript = temp.path().join("Chapter.md");
    std::fs::write(&manuscript, "# Chapter\n\nIt was a dark night.").unwrap();

    bookmagic(temp.path())
        .args(["upload", "--project", "demo"])
        .arg(&manuscript)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fileExtension\": \".md\""));
    assert!(temp.path().join("uploads/demo.md").is_file());

    bookmagic(temp.path())
        .args(["generatePreview", "demo", "trade-clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("\"inputFile\": \"demo.md\""));

    let html =
        std::fs::read_to_string(temp.path().join("output/demo.preview.final.html")).unwrap();
    assert!(html.contains("<h1>Chapter</h1>\n<p>It was a dark night.</p>"));
    assert!(html.contains("<title>Preview - demo</title>"));
}

#[test]
fn preview_without_upload_fails() {
    let temp = tempfile::TempDir::new().unwrap();
    bookmagic(temp.path())
        .args(["generate-preview", "missing", "serif-classic"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("no uploaded file found for project missing"));
}

#[test]
fn upload_rejects_unsupported_extension() {
    let temp = tempfile::TempDir::new().unwrap();
    let cover = temp.path().join("cover.png");
    std::fs::write(&cover, b"\x89PNG").unwrap();

    bookmagic(temp.path())
        .args(["upload", "--project", "demo"])
        .arg(&cover)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Supported formats: .docx, .md, .rtf"));
    assert!(!temp.path().join("uploads/demo.png").exists());
}

#[test]
fn invalid_project_id_is_rejected() {
    let temp = tempfile::TempDir::new().unwrap();
    bookmagic(temp.path())
        .args(["worker", "../escape", "serif-classic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid project id"));
}

#[test]
fn rust_log_debug_emits_parsed_cli_to_stderr() {
    let temp = tempfile::TempDir::new().unwrap();
    bookmagic(temp.path())
        .env("RUST_LOG", "debug")
        .arg("templates")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
