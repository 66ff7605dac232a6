//! Project configuration (`tsconfig.json`) and member file selection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::discovery::{has_source_extension, is_denied_dir, is_ignored_path};
use super::router::normalize_path;
use crate::types::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub allow_js: bool,
    pub root_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub declaration_dir: Option<PathBuf>,
    /// Every option after `extends` merging. Path options are absolute.
    pub raw: Map<String, Value>,
}

/// Options holding a directory, relative to the config that sets them.
const PATH_OPTIONS: &[&str] = &["rootDir", "outDir", "declarationDir"];

impl CompilerOptions {
    fn from_raw(raw: Map<String, Value>) -> Self {
        let dir = |key: &str| raw.get(key).and_then(Value::as_str).map(PathBuf::from);
        Self {
            allow_js: raw.get("allowJs").and_then(Value::as_bool).unwrap_or(false),
            root_dir: dir("rootDir"),
            out_dir: dir("outDir"),
            declaration_dir: dir("declarationDir"),
            raw,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    #[serde(default)]
    extends: Option<Value>,
    #[serde(default)]
    compiler_options: Option<Map<String, Value>>,
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

/// Patterns keep the directory of the config that declared them.
#[derive(Debug, Clone)]
struct PatternList {
    base: PathBuf,
    patterns: Vec<String>,
}

#[derive(Debug, Default)]
struct ResolvedConfig {
    options: Map<String, Value>,
    files: Option<PatternList>,
    include: Option<PatternList>,
    exclude: Option<PatternList>,
}

/// Decides whether a path belongs to a project.
#[derive(Debug, Clone)]
pub struct MemberFilter {
    root: PathBuf,
    allow_js: bool,
    explicit: HashSet<PathBuf>,
    include: Option<GlobSet>,
    exclude: GlobSet,
    output_dirs: Vec<PathBuf>,
}

impl MemberFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        if !path.starts_with(&self.root) || is_ignored_path(&self.root, path) {
            return false;
        }
        if self.explicit.contains(path) {
            return has_source_extension(path, true);
        }
        if is_hidden_below(&self.root, path) {
            return false;
        }
        let Some(include) = &self.include else {
            return false;
        };
        if !has_source_extension(path, self.allow_js) {
            return false;
        }
        if self.output_dirs.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }
        let key = glob_key(path);
        include.is_match(&key) && !self.exclude.is_match(&key)
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub options: CompilerOptions,
    filter: MemberFilter,
}

impl Project {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = normalize_path(config_path);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::InvalidPath(config_path.display().to_string()))?;

        let mut visiting = HashSet::new();
        let resolved = resolve_config(&config_path, &mut visiting)?;

        let options = CompilerOptions::from_raw(resolved.options);

        let explicit: HashSet<PathBuf> = resolved
            .files
            .as_ref()
            .map(|list| {
                list.patterns
                    .iter()
                    .map(|p| normalize_path(&list.base.join(p)))
                    .collect()
            })
            .unwrap_or_default();

        let include = match (&resolved.include, &resolved.files) {
            (Some(list), _) => Some(build_globs(list, &config_path, false)?),
            (None, Some(_)) => None,
            (None, None) => Some(build_globs(
                &PatternList {
                    base: root.clone(),
                    patterns: vec!["**/*".to_string()],
                },
                &config_path,
                false,
            )?),
        };

        let exclude = match &resolved.exclude {
            Some(list) => build_globs(list, &config_path, true)?,
            None => GlobSet::empty(),
        };

        let output_dirs = [&options.out_dir, &options.declaration_dir]
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        let filter = MemberFilter {
            root: root.clone(),
            allow_js: options.allow_js,
            explicit,
            include,
            exclude,
            output_dirs,
        };

        Ok(Self {
            root,
            config_path,
            options,
            filter,
        })
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.filter.accepts(path)
    }

    /// Walks the project directory and returns every member file, sorted.
    pub fn member_files(&self) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.file_type().is_some_and(|t| t.is_dir())
                        && is_denied_dir(entry.file_name()))
            })
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
            .map(|e| e.into_path())
            .filter(|p| self.accepts(p))
            .collect();

        for path in &self.filter.explicit {
            if path.is_file() && self.accepts(path) {
                files.push(path.clone());
            } else if !path.is_file() {
                warn!(file = %path.display(), project = %self.root.display(), "Listed file does not exist");
            }
        }

        files.sort();
        files.dedup();
        files
    }
}

fn resolve_config(path: &Path, visiting: &mut HashSet<PathBuf>) -> Result<ResolvedConfig> {
    let parse_error = |message: String| AppError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    if !visiting.insert(path.to_path_buf()) {
        return Err(parse_error("circular `extends` chain".to_string()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
    let raw: RawTsConfig =
        serde_json::from_str(&strip_jsonc(&text)).map_err(|e| parse_error(e.to_string()))?;
    let dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();

    let mut resolved = ResolvedConfig::default();
    for parent in extends_targets(raw.extends.as_ref()) {
        let Some(parent_path) = resolve_extends(&dir, &parent) else {
            warn!(config = %path.display(), extends = %parent, "Skipping unresolvable `extends`");
            continue;
        };
        let base = resolve_config(&parent_path, visiting)?;
        for (key, value) in base.options {
            resolved.options.insert(key, value);
        }
        resolved.files = base.files.or(resolved.files);
        resolved.include = base.include.or(resolved.include);
        resolved.exclude = base.exclude.or(resolved.exclude);
    }

    if let Some(mut options) = raw.compiler_options {
        absolutize_path_options(&mut options, &dir);
        for (key, value) in options {
            resolved.options.insert(key, value);
        }
    }
    let list = |patterns: Vec<String>| PatternList {
        base: dir.clone(),
        patterns,
    };
    if let Some(files) = raw.files {
        resolved.files = Some(list(files));
    }
    if let Some(include) = raw.include {
        resolved.include = Some(list(include));
    }
    if let Some(exclude) = raw.exclude {
        resolved.exclude = Some(list(exclude));
    }

    visiting.remove(path);
    Ok(resolved)
}

fn absolutize_path_options(options: &mut Map<String, Value>, dir: &Path) {
    for key in PATH_OPTIONS {
        if let Some(Value::String(value)) = options.get_mut(*key) {
            *value = normalize_path(&dir.join(&*value)).display().to_string();
        }
    }
}

/// Dot-prefixed files and directories below the root are never members,
/// the same as the walk in `member_files` skips them.
fn is_hidden_below(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|relative| {
        relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    })
}

fn extends_targets(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Only relative and absolute paths are followed; package specifiers are not.
fn resolve_extends(dir: &Path, target: &str) -> Option<PathBuf> {
    if !(target.starts_with('.') || Path::new(target).is_absolute()) {
        debug!(extends = %target, "Package `extends` is not resolved");
        return None;
    }
    let candidate = normalize_path(&dir.join(target));
    if candidate.is_file() {
        return Some(candidate);
    }
    let with_json = PathBuf::from(format!("{}.json", candidate.display()));
    with_json.is_file().then_some(with_json)
}

fn build_globs(list: &PatternList, config: &Path, expand_dirs: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &list.patterns {
        let full = glob_key(&normalize_path(&list.base.join(pattern)));
        let is_literal = !pattern.contains(['*', '?', '[']);
        let names_dir = is_literal && Path::new(pattern).extension().is_none();

        let mut variants = vec![full.clone()];
        if names_dir {
            variants.push(format!("{}/**/*", full.trim_end_matches('/')));
        } else if expand_dirs && is_literal {
            variants.push(format!("{}/**", full.trim_end_matches('/')));
        }

        for variant in variants {
            let glob = GlobBuilder::new(&variant)
                .literal_separator(true)
                .build()
                .map_err(|e| AppError::ConfigParse {
                    path: config.to_path_buf(),
                    message: format!("invalid pattern {pattern:?}: {e}"),
                })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|e| AppError::ConfigParse {
        path: config.to_path_buf(),
        message: e.to_string(),
    })
}

fn glob_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Strips `//` and `/* */` comments and trailing commas so the text parses as JSON.
pub fn strip_jsonc(text: &str) -> String {
    let mut without_comments = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            without_comments.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        without_comments.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                without_comments.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                without_comments.push(' ');
            }
            _ => without_comments.push(c),
        }
    }

    let mut out = String::with_capacity(without_comments.len());
    let chars: Vec<char> = without_comments.chars().collect();
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_strip_jsonc() {
        let text = r#"{
            // line comment
            "a": "http://x/*not a comment*/", /* block */
            "b": [1, 2,],
        }"#;
        let value: Value = serde_json::from_str(&strip_jsonc(text)).unwrap();
        assert_eq!(value["a"], "http://x/*not a comment*/");
        assert_eq!(value["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_default_include_takes_typescript_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("tsconfig.json"), "{}");
        write(&root.join("src/a.ts"), "");
        write(&root.join("src/b.js"), "");
        write(&root.join("node_modules/dep/index.ts"), "");

        let project = Project::load(&root.join("tsconfig.json")).unwrap();
        assert_eq!(project.member_files(), vec![root.join("src/a.ts")]);
    }

    #[test]
    fn test_allow_js_and_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("tsconfig.json"),
            r#"{ "compilerOptions": { "allowJs": true, "outDir": "./out" } }"#,
        );
        write(&root.join("a.js"), "");
        write(&root.join("out/a.js"), "");

        let project = Project::load(&root.join("tsconfig.json")).unwrap();
        assert!(project.options.allow_js);
        assert_eq!(project.member_files(), vec![root.join("a.js")]);
    }

    #[test]
    fn test_include_directory_and_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("tsconfig.json"),
            r#"{ "include": ["src"], "exclude": ["src/**/*.test.ts"] }"#,
        );
        write(&root.join("src/a.ts"), "");
        write(&root.join("src/a.test.ts"), "");
        write(&root.join("scripts/b.ts"), "");

        let project = Project::load(&root.join("tsconfig.json")).unwrap();
        assert_eq!(project.member_files(), vec![root.join("src/a.ts")]);
        assert!(project.accepts(&root.join("src/new/file.ts")));
        assert!(!project.accepts(&root.join("scripts/c.ts")));
    }

    #[test]
    fn test_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("tsconfig.json"), r#"{ "files": ["main.ts"] }"#);
        write(&root.join("main.ts"), "");
        write(&root.join("other.ts"), "");

        let project = Project::load(&root.join("tsconfig.json")).unwrap();
        assert_eq!(project.member_files(), vec![root.join("main.ts")]);
        assert!(!project.accepts(&root.join("other.ts")));
    }

    #[test]
    fn test_extends_merges_options() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("base.json"),
            r#"{ "compilerOptions": { "strict": true, "allowJs": true } }"#,
        );
        write(
            &root.join("app/tsconfig.json"),
            r#"{ "extends": "../base", "compilerOptions": { "strict": false } }"#,
        );

        let project = Project::load(&root.join("app/tsconfig.json")).unwrap();
        assert!(project.options.allow_js);
        assert_eq!(project.options.raw["strict"], Value::Bool(false));
    }

    #[test]
    fn test_base_path_options_stay_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("base.json"),
            r#"{ "compilerOptions": { "outDir": "./lib", "rootDir": "src" } }"#,
        );
        write(
            &root.join("app/tsconfig.json"),
            r#"{ "extends": "../base.json", "compilerOptions": { "strict": true, "declarationDir": "types" } }"#,
        );
        write(&root.join("app/lib/a.ts"), "");
        write(&root.join("app/types/b.ts"), "");

        let project = Project::load(&root.join("app/tsconfig.json")).unwrap();
        assert_eq!(project.options.out_dir, Some(root.join("lib")));
        assert_eq!(project.options.root_dir, Some(root.join("src")));
        assert_eq!(project.options.declaration_dir, Some(root.join("app/types")));
        assert_eq!(project.member_files(), vec![root.join("app/lib/a.ts")]);
    }

    #[test]
    fn test_hidden_paths_are_not_members() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("tsconfig.json"), "{}");
        write(&root.join(".storybook/main.ts"), "");
        write(&root.join("src/.eslintrc.ts"), "");
        write(&root.join("src/a.ts"), "");

        let project = Project::load(&root.join("tsconfig.json")).unwrap();
        assert_eq!(project.member_files(), vec![root.join("src/a.ts")]);
        assert!(!project.accepts(&root.join(".storybook/main.ts")));
        assert!(!project.accepts(&root.join("src/.eslintrc.ts")));
        assert!(project.accepts(&root.join("src/b.ts")));
    }

    #[test]
    fn test_extends_cycle_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("a.json"), r#"{ "extends": "./b.json" }"#);
        write(&root.join("b.json"), r#"{ "extends": "./a.json" }"#);
        write(&root.join("tsconfig.json"), r#"{ "extends": "./a.json" }"#);

        let err = Project::load(&root.join("tsconfig.json")).unwrap_err();
        assert_eq!(err.code(), "config_parse_error");
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("tsconfig.json"), "{ not json");

        let err = Project::load(&dir.path().join("tsconfig.json")).unwrap_err();
        assert!(matches!(err, AppError::ConfigParse { .. }));
    }
}
