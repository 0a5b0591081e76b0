// src/substitute.rs

//! `${...}` variable substitution for command templates and messages.
//!
//! Supported tokens, resolved in this order:
//!
//! | token                  | value                                          |
//! |------------------------|------------------------------------------------|
//! | `${file}`              | absolute path of the saved file                |
//! | `${workspaceRoot}`     | deprecated alias of `${workspaceFolder}`       |
//! | `${workspaceFolder}`   | owning workspace folder, else the file's dir   |
//! | `${fileBasename}`      | file name with extension                       |
//! | `${fileDirname}`       | containing directory                           |
//! | `${fileExtname}`       | extension with leading dot, or empty           |
//! | `${fileBasenameNoExt}` | file name without extension                    |
//! | `${relativeFile}`      | path relative to the workspace folder          |
//! | `${cwd}`               | process working directory                      |
//! | `${env.NAME}`          | environment variable `NAME`, empty when unset  |
//!
//! Substitution is a single pass over the template: values are inserted
//! literally and never re-expanded. Unknown tokens are left as written.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("token pattern is a valid literal"));

const ENV_PREFIX: &str = "env.";

/// Ordered token values for one saved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacements {
    values: Vec<(&'static str, String)>,
}

impl Replacements {
    /// Compute token values for `file`, owned by `workspace_folder`, with the
    /// process working directory `cwd`.
    pub fn for_file(file: &Path, workspace_folder: &Path, cwd: &Path) -> Self {
        let folder = display(workspace_folder);
        let ext = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let relative = file
            .strip_prefix(workspace_folder)
            .map(display)
            .unwrap_or_else(|_| display(file));

        let values = vec![
            ("file", display(file)),
            ("workspaceRoot", folder.clone()),
            ("workspaceFolder", folder),
            ("fileBasename", lossy_name(file.file_name())),
            ("fileDirname", file.parent().map(display).unwrap_or_default()),
            ("fileExtname", ext),
            ("fileBasenameNoExt", lossy_name(file.file_stem())),
            ("relativeFile", relative),
            ("cwd", display(cwd)),
        ];

        Self { values }
    }

    /// Value for a plain (non-`env.`) token.
    pub fn value_of(&self, token: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| value.as_str())
    }

    /// Substitute every token in `template`, reading `${env.NAME}` from the
    /// process environment.
    pub fn apply(&self, template: &str) -> String {
        self.apply_with_env(template, |name| std::env::var(name).ok())
    }

    /// `apply` for optional fields; `None` stays `None`.
    pub fn apply_opt(&self, template: Option<&str>) -> Option<String> {
        template.map(|t| self.apply(t))
    }

    /// Substitute every token in `template` using `env` for `${env.NAME}`.
    pub fn apply_with_env<F>(&self, template: &str, env: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        TOKEN_RE
            .replace_all(template, |caps: &Captures<'_>| {
                let token = &caps[1];
                match token.strip_prefix(ENV_PREFIX) {
                    Some(name) if !name.is_empty() => env(name).unwrap_or_default(),
                    Some(_) => caps[0].to_string(),
                    None => self
                        .value_of(token)
                        .map(str::to_string)
                        .unwrap_or_else(|| caps[0].to_string()),
                }
            })
            .into_owned()
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn lossy_name(name: Option<&std::ffi::OsStr>) -> String {
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Replacements {
        Replacements::for_file(
            Path::new("/workspace/src/file.ts"),
            Path::new("/workspace"),
            Path::new("/cwd"),
        )
    }

    fn env(name: &str) -> Option<String> {
        match name {
            "TEST_VAR" => Some("test_value".to_string()),
            "OTHER" => Some("other".to_string()),
            _ => None,
        }
    }

    #[test]
    fn expands_all_file_tokens() {
        let out = sample().apply_with_env(
            "${file} ${fileBasename} ${fileExtname} ${fileBasenameNoExt} ${relativeFile}",
            env,
        );
        assert_eq!(out, "/workspace/src/file.ts file.ts .ts file src/file.ts");
    }

    #[test]
    fn expands_folder_cwd_and_env_tokens() {
        let out = sample().apply_with_env(
            "${workspaceRoot} ${workspaceFolder} ${fileDirname} ${cwd} ${env.TEST_VAR}",
            env,
        );
        assert_eq!(out, "/workspace /workspace /workspace/src /cwd test_value");
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let out = sample().apply_with_env("${fileBasename}-${fileBasename}", env);
        assert_eq!(out, "file.ts-file.ts");
    }

    #[test]
    fn distinct_env_tokens_resolve_independently() {
        let out = sample().apply_with_env("${env.TEST_VAR}:${env.OTHER}", env);
        assert_eq!(out, "test_value:other");
    }

    #[test]
    fn unset_env_var_becomes_empty() {
        let out = sample().apply_with_env("[${env.NOT_SET_ANYWHERE}]", env);
        assert_eq!(out, "[]");
    }

    #[test]
    fn env_token_without_a_name_is_kept() {
        let out = sample().apply_with_env("a${env.}b", |_| Some("x".to_string()));
        assert_eq!(out, "a${env.}b");
    }

    #[test]
    fn values_are_not_re_expanded() {
        let r = Replacements::for_file(
            Path::new("/w/${fileBasename}.sh"),
            Path::new("/w"),
            Path::new("/"),
        );
        assert_eq!(r.apply_with_env("${file}", env), "/w/${fileBasename}.sh");
    }

    #[test]
    fn dollar_signs_in_values_are_literal() {
        let r = Replacements::for_file(Path::new("/w/$1.txt"), Path::new("/w"), Path::new("/"));
        assert_eq!(r.apply_with_env("${fileBasename}", env), "$1.txt");
    }

    #[test]
    fn plain_text_and_unknown_tokens_pass_through() {
        assert_eq!(sample().apply_with_env("cargo fmt", env), "cargo fmt");
        assert_eq!(sample().apply_with_env("${nope} $file", env), "${nope} $file");
    }

    #[test]
    fn file_without_extension_has_empty_extname() {
        let r = Replacements::for_file(Path::new("/w/Makefile"), Path::new("/w"), Path::new("/"));
        assert_eq!(r.value_of("fileExtname"), Some(""));
        assert_eq!(r.value_of("fileBasenameNoExt"), Some("Makefile"));
    }

    #[test]
    fn file_outside_folder_keeps_full_relative_path() {
        let r = Replacements::for_file(Path::new("/other/a.rs"), Path::new("/w"), Path::new("/"));
        assert_eq!(r.value_of("relativeFile"), Some("/other/a.rs"));
    }

    #[test]
    fn optional_fields_stay_absent() {
        assert_eq!(sample().apply_opt(None), None);
    }
}
