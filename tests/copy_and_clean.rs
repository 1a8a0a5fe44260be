use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use sitepipe::config::model::CopySpec;
use sitepipe::steps::clean::{remove_out_dir, reset_out_dir};
use sitepipe::steps::copy::{copy_tree, run_copy};

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

#[test]
fn copy_preserves_relative_paths() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("src");
    let out = tmp.path().join("dist");

    write_file(&src.join("assets/img/logo.png"), "png-bytes")?;
    write_file(&src.join("assets/fonts/body.woff2"), "font-bytes")?;
    write_file(&src.join("scss/index.scss"), "$x: 1;")?;

    let spec = CopySpec {
        src: vec!["assets/**".to_string()],
        dest: "assets".to_string(),
        flatten: false,
    };
    let copied = run_copy(&src, &out, &spec)?;

    assert_eq!(copied, 2);
    assert_eq!(
        fs::read_to_string(out.join("assets/assets/img/logo.png"))?,
        "png-bytes"
    );
    assert!(!out.join("scss").exists());
    Ok(())
}

#[test]
fn flatten_strips_directories() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("src");
    let out = tmp.path().join("dist");

    write_file(&src.join("js/app.js"), "app")?;
    write_file(&src.join("components/nav/nav.js"), "nav")?;

    let spec = CopySpec {
        src: vec!["js/**/*.js".to_string(), "components/**/*.js".to_string()],
        dest: "js".to_string(),
        flatten: true,
    };
    run_copy(&src, &out, &spec)?;

    assert_eq!(fs::read_to_string(out.join("js/app.js"))?, "app");
    assert_eq!(fs::read_to_string(out.join("js/nav.js"))?, "nav");
    assert!(!out.join("js/components").exists());
    Ok(())
}

#[test]
fn copy_with_empty_dest_targets_out_dir_root() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("src");
    let out = tmp.path().join("dist");

    write_file(&src.join("favicon.ico"), "icon")?;
    write_file(&src.join("favicon-32x32.png"), "icon32")?;

    let spec = CopySpec {
        src: vec!["favicon*".to_string()],
        dest: String::new(),
        flatten: false,
    };
    let copied = run_copy(&src, &out, &spec)?;

    assert_eq!(copied, 2);
    assert!(out.join("favicon.ico").is_file());
    assert!(out.join("favicon-32x32.png").is_file());
    Ok(())
}

#[test]
fn rerunning_copy_reproduces_the_same_file_set() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("src");
    let out = tmp.path().join("dist");

    write_file(&src.join("assets/a.txt"), "a")?;
    write_file(&src.join("assets/sub/b.txt"), "b")?;

    let spec = CopySpec {
        src: vec!["assets/**".to_string()],
        dest: String::new(),
        flatten: false,
    };

    run_copy(&src, &out, &spec)?;
    let first = file_set(&out);

    run_copy(&src, &out, &spec)?;
    let second = file_set(&out);

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(out.join("assets/a.txt"))?, "a");
    Ok(())
}

#[test]
fn reset_out_dir_discards_stale_output() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("dist");

    write_file(&out.join("stale.html"), "old")?;
    reset_out_dir(&out)?;

    assert!(out.is_dir());
    assert!(file_set(&out).is_empty());
    Ok(())
}

#[test]
fn remove_out_dir_tolerates_missing_directory() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("never-built");

    remove_out_dir(&out)?;
    assert!(!out.exists());
    Ok(())
}

#[test]
fn copy_tree_mirrors_the_whole_output() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let out = tmp.path().join("dist");
    let publish = tmp.path().join("publish");

    write_file(&out.join("index.html"), "<html></html>")?;
    write_file(&out.join("css/index.min.css"), "body{}")?;

    let copied = copy_tree(&out, &publish)?;

    assert_eq!(copied, 2);
    assert_eq!(file_set(&out), file_set(&publish));
    Ok(())
}
