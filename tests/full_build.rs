//! End-to-end builds against a temporary project tree, using real shell
//! commands as stand-ins for external transformation tools.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use sitepipe::build_project;
use sitepipe::config::model::Manifest;

type TestResult = Result<(), Box<dyn Error>>;

fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

fn file_set(dir: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    if dir.is_dir() {
        walk(dir, dir, &mut out);
    }
    out.sort();
    out
}

fn parse(toml_src: &str) -> Manifest {
    toml::from_str(toml_src).expect("manifest should deserialize")
}

const SITE_MANIFEST: &str = r#"
    [task.html]
    cmd = "printf '<html><body>hi</body></html>' > dist/index.html"

    [task.stamp]
    cmd = "printf done > dist/stamp.txt"
    after = ["html"]

    [task.assets]
    copy = { src = ["assets/**"] }
"#;

#[tokio::test]
async fn full_build_produces_expected_outputs() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_file(&root.join("src/assets/a.txt"), "a")?;

    let manifest = parse(SITE_MANIFEST);
    build_project(&manifest, root, None).await?;

    let out = root.join("dist");
    assert_eq!(
        fs::read_to_string(out.join("index.html"))?,
        "<html><body>hi</body></html>"
    );
    assert_eq!(fs::read_to_string(out.join("stamp.txt"))?, "done");
    assert_eq!(fs::read_to_string(out.join("assets/a.txt"))?, "a");
    Ok(())
}

#[tokio::test]
async fn rebuilding_reproduces_the_same_file_set() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_file(&root.join("src/assets/a.txt"), "a")?;

    let manifest = parse(SITE_MANIFEST);

    build_project(&manifest, root, None).await?;
    let first = file_set(&root.join("dist"));

    // A full rebuild deletes and regenerates the output directory.
    build_project(&manifest, root, None).await?;
    let second = file_set(&root.join("dist"));

    assert_eq!(first, second);
    assert!(!first.is_empty());
    Ok(())
}

#[tokio::test]
async fn failing_task_exits_nonzero_and_spares_unrelated_output() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    fs::create_dir_all(root.join("src"))?;

    let manifest = parse(
        r#"
        [task.ok]
        cmd = "printf fine > dist/ok.txt"

        [task.bad]
        cmd = "echo 'render error' >&2; exit 3"

        [task.child]
        cmd = "printf never > dist/child.txt"
        after = ["bad"]
        "#,
    );

    let result = build_project(&manifest, root, None).await;
    assert!(result.is_err());

    // The unrelated task's output survives; the dependent never ran.
    assert_eq!(fs::read_to_string(root.join("dist/ok.txt"))?, "fine");
    assert!(!root.join("dist/child.txt").exists());
    Ok(())
}

#[tokio::test]
async fn lint_style_task_failure_does_not_fail_the_build() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    fs::create_dir_all(root.join("src"))?;

    let manifest = parse(
        r#"
        [task.lint]
        cmd = "echo 'src/js/app.js:1 unexpected token' >&2; exit 1"
        fail_after_error = false

        [task.scripts]
        cmd = "printf bundled > dist/app.js"
        after = ["lint"]
        "#,
    );

    build_project(&manifest, root, None).await?;
    assert_eq!(fs::read_to_string(root.join("dist/app.js"))?, "bundled");
    Ok(())
}

#[tokio::test]
async fn run_single_task_pulls_in_predecessors_only() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_file(&root.join("src/assets/a.txt"), "a")?;

    let manifest = parse(SITE_MANIFEST);
    build_project(&manifest, root, Some("stamp")).await?;

    let out = root.join("dist");
    assert!(out.join("index.html").is_file());
    assert!(out.join("stamp.txt").is_file());
    // assets is not upstream of stamp and must not run.
    assert!(!out.join("assets").exists());
    Ok(())
}

#[tokio::test]
async fn run_unknown_task_is_an_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    fs::create_dir_all(root.join("src"))?;

    let manifest = parse(SITE_MANIFEST);
    let result = build_project(&manifest, root, Some("nope")).await;
    assert!(result.is_err());
    Ok(())
}
