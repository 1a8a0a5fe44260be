// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level project manifest as read from a TOML file.
///
/// ```toml
/// [build]
/// source_dir = "src"
/// out_dir = "dist"
///
/// [serve]
/// port = 3000
///
/// [task.styles]
/// cmd = "sass src/scss/index.scss dist/css/index.min.css"
/// watch = ["src/scss/**/*.scss"]
///
/// [task.html]
/// cmd = "haml-render src dist"
/// after = ["partials"]
///
/// [task.assets]
/// copy = { src = ["assets/**"] }
/// watch = ["src/assets/**"]
/// ```
///
/// All sections except `[task.*]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Directory layout from `[build]`.
    #[serde(default)]
    pub build: BuildSection,

    /// Dev-server settings from `[serve]`.
    #[serde(default)]
    pub serve: ServeSection,

    /// Publishing target from `[deploy]`.
    #[serde(default)]
    pub deploy: DeploySection,

    /// Global watch settings from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,

    /// All tasks from `[task.<name>]`.
    ///
    /// Keys are the task names (e.g. `"styles"`, `"html"`, `"assets"`).
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[build]` section: where sources live and where output goes.
///
/// The output directory is deleted and regenerated on every full build.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_out_dir() -> String {
    "dist".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            out_dir: default_out_dir(),
        }
    }
}

/// `[serve]` section: local dev server used by `sitepipe watch`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Quiet window (milliseconds) before a burst of file events is flushed
    /// into task triggers.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_debounce_ms() -> u64 {
    150
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[deploy]` section.
///
/// Either `dir` (recursive copy of the output directory into a publishing
/// directory) or `cmd` (an external publish command run from the project
/// root). If both are set, `cmd` wins.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeploySection {
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[watch]` section: excludes applied to every task's watch profile.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchSection {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[task.<name>]` section.
///
/// A task is either an external command (`cmd`) or a built-in copy step
/// (`copy`); exactly one of the two must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// External transformation command, run via the platform shell from the
    /// project root.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Built-in glob copy from the source tree into the output tree.
    #[serde(default)]
    pub copy: Option<CopySpec>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Glob patterns (relative to the project root) that re-trigger this task
    /// in watch mode. A task with no patterns is never watch-triggered.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Task-local exclude patterns; `[watch].exclude` is always appended.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// If false, a non-zero exit is reported as a warning and the task still
    /// counts as succeeded. Used for lint-style steps.
    #[serde(default = "default_true")]
    pub fail_after_error: bool,

    /// Whether a successful watch-mode run involving this task should push a
    /// browser reload.
    #[serde(default = "default_true")]
    pub reload: bool,
}

fn default_true() -> bool {
    true
}

/// Copy step parameters.
///
/// `src` globs are evaluated relative to `[build].source_dir`; matched files
/// land under `[build].out_dir/<dest>` keeping their relative paths, or with
/// paths stripped when `flatten = true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopySpec {
    pub src: Vec<String>,

    #[serde(default)]
    pub dest: String,

    #[serde(default)]
    pub flatten: bool,
}
