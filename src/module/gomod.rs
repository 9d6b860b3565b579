//! Parsing of `go.mod` and `vendor/modules.txt`.
//!
//! Only the directives that affect where a package's source lives are
//! retained: `module`, `require` and `replace`. Block forms
//! (`require ( ... )`) and trailing `//` comments are supported.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// A `require` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    pub path: String,
    pub version: String,
}

/// Right-hand side of a `replace` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTarget {
    /// Local directory, relative to the `go.mod` that declares it or absolute.
    Dir(PathBuf),
    /// Another module version.
    Module { path: String, version: String },
}

/// A `replace` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub path: String,
    /// Only this version is replaced when set.
    pub version: Option<String>,
    pub target: ReplaceTarget,
}

/// Parsed `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoMod {
    pub module: String,
    pub requires: Vec<Require>,
    pub replaces: Vec<Replace>,
}

impl GoMod {
    /// Read and parse the `go.mod` at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        Self::parse(path, &content)
    }

    /// Parse `content`; `path` is used for error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut module = None;
        let mut requires = Vec::new();
        let mut replaces = Vec::new();
        let mut block: Option<String> = None;

        for (index, raw_line) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if block.is_some() && line == ")" {
                block = None;
                continue;
            }
            let (verb, args) = if let Some(verb) = block.clone() {
                (verb, line.to_string())
            } else {
                let mut parts = line.splitn(2, char::is_whitespace);
                let verb = parts.next().unwrap_or_default().to_string();
                let rest = parts.next().unwrap_or_default().trim().to_string();
                if rest == "(" {
                    block = Some(verb);
                    continue;
                }
                (verb, rest)
            };

            let err = |message: String| Error::GoMod {
                path: path.to_path_buf(),
                line: line_no,
                message,
            };

            match verb.as_str() {
                "module" => module = Some(unquote_token(&args).to_string()),
                "require" => {
                    let fields = fields(&args);
                    if fields.len() != 2 {
                        return Err(err(format!("usage: require module/path v1.2.3, got {:?}", args)));
                    }
                    check_version(fields[1]).map_err(|m| err(m))?;
                    requires.push(Require {
                        path: fields[0].to_string(),
                        version: fields[1].to_string(),
                    });
                }
                "replace" => replaces.push(parse_replace(&args).map_err(|m| err(m))?),
                _ => {}
            }
        }

        let module = module.filter(|m| !m.is_empty()).ok_or_else(|| Error::GoMod {
            path: path.to_path_buf(),
            line: 0,
            message: "missing module directive".to_string(),
        })?;

        Ok(Self {
            module,
            requires,
            replaces,
        })
    }

    /// The replacement for `path`@`version`, if any. A version-specific
    /// replacement wins over a wildcard one.
    pub fn replacement(&self, path: &str, version: &str) -> Option<&ReplaceTarget> {
        self.replaces
            .iter()
            .filter(|r| r.path == path)
            .find(|r| r.version.as_deref() == Some(version))
            .or_else(|| {
                self.replaces
                    .iter()
                    .find(|r| r.path == path && r.version.is_none())
            })
            .map(|r| &r.target)
    }
}

fn parse_replace(args: &str) -> std::result::Result<Replace, String> {
    let (lhs, rhs) = args
        .split_once("=>")
        .ok_or_else(|| format!("usage: replace module/path [v1.2.3] => other/module v1.4 or ./dir, got {:?}", args))?;
    let lhs = fields(lhs);
    let rhs = fields(rhs);

    let (path, version) = match lhs.as_slice() {
        [path] => (path.to_string(), None),
        [path, version] => {
            check_version(version)?;
            (path.to_string(), Some(version.to_string()))
        }
        _ => return Err(format!("invalid replace source {:?}", args)),
    };

    let target = match rhs.as_slice() {
        [dir] if is_local_path(dir) => ReplaceTarget::Dir(PathBuf::from(dir)),
        [module, version] => {
            check_version(version)?;
            ReplaceTarget::Module {
                path: module.to_string(),
                version: version.to_string(),
            }
        }
        _ => return Err(format!("invalid replace target {:?}", args)),
    };

    Ok(Replace {
        path,
        version,
        target,
    })
}

fn is_local_path(s: &str) -> bool {
    s.starts_with("./") || s.starts_with("../") || s == "." || s == ".." || Path::new(s).is_absolute()
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |i| &line[..i])
}

fn fields(s: &str) -> Vec<&str> {
    s.split_whitespace().map(unquote_token).collect()
}

fn unquote_token(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(s)
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v(\d+\.\d+\.\d+)([-+][0-9A-Za-z.+-]*)?$").expect("valid version regex")
    })
}

/// Module versions are `v` followed by a semantic version. Only the release
/// triple is checked by `semver`: pseudo-version suffixes such as
/// `-00010101000000-000000000000` carry leading zeros that strict semver
/// pre-release rules reject.
fn check_version(version: &str) -> std::result::Result<(), String> {
    let core = version_pattern()
        .captures(version)
        .and_then(|c| c.get(1))
        .ok_or_else(|| format!("invalid module version {:?}", version))?;
    semver::Version::parse(core.as_str())
        .map(|_| ())
        .map_err(|e| format!("invalid module version {:?}: {}", version, e))
}

/// A module listed in `vendor/modules.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendoredModule {
    pub path: String,
    pub version: Option<String>,
}

/// Parse the module lines (`# path version [=> replacement]`) of a
/// `vendor/modules.txt` file.
pub fn parse_modules_txt(path: &Path, content: &str) -> Result<Vec<VendoredModule>> {
    let mut modules = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let Some(rest) = line.strip_prefix("# ") else {
            continue;
        };
        let lhs = rest.split("=>").next().unwrap_or_default();
        let parts = fields(lhs);
        match parts.as_slice() {
            [module] => modules.push(VendoredModule {
                path: module.to_string(),
                version: None,
            }),
            [module, version] => modules.push(VendoredModule {
                path: module.to_string(),
                version: Some(version.to_string()),
            }),
            _ => {
                return Err(Error::GoMod {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("unexpected module line {:?}", line),
                })
            }
        }
    }
    Ok(modules)
}

/// Escape a module path or version for use in the module cache: every
/// upper-case letter becomes `!` followed by its lower-case form.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverse of [`escape_path`].
pub fn unescape_path(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '!' {
            if let Some(next) = chars.next() {
                out.push(next.to_ascii_uppercase());
            }
        } else {
            out.push(c);
        }
    }
    out
}
