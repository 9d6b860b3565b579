//! # Go Source Files
//!
//! A [`SourceFile`] is an immutable, span-annotated view of one Go file: its
//! package clause, import specs, top-level function declarations and
//! comments. Transformations never mutate it. Instead they produce [`Edit`]s,
//! and [`SourceFile::apply`] builds the new file text from the original text
//! plus the edits. Untouched bytes are preserved exactly, so formatting and
//! comments survive relocation.

pub mod scanner;

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use scanner::{Token, TokenKind};

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Range<usize>,
}

/// One import spec: `[name] "path"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit package name (`.`, `_` or an identifier), if any.
    pub name: Option<String>,
    /// Unquoted import path.
    pub path: String,
    /// Span of the path literal, including its quotes.
    pub path_span: Range<usize>,
}

/// A top-level function declaration without a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: Ident,
}

/// A comment and its text, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentText {
    pub text: String,
    pub span: Range<usize>,
}

/// Replacement of a byte range of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn delete(span: Range<usize>) -> Self {
        Self::replace(span, "")
    }
}

/// Parsed view of a Go source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    source: String,
    package: Ident,
    imports: Vec<ImportSpec>,
    functions: Vec<FuncDecl>,
    comments: Vec<CommentText>,
}

impl SourceFile {
    /// Read and parse the file at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read file {}", path.display()), e))?;
        Self::parse(path, source)
    }

    /// Parse `source`; `path` is only used for error messages.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let source = source.into();
        let scanned = scanner::scan(&source).map_err(|e| Error::Syntax {
            path: path.clone(),
            message: format!("{} at byte {}", e.message, e.offset),
        })?;

        let comments = scanned
            .comments
            .iter()
            .map(|c| CommentText {
                text: source[c.span.clone()].to_string(),
                span: c.span.clone(),
            })
            .collect();

        let mut parser = Parser {
            src: &source,
            tokens: &scanned.tokens,
            pos: 0,
            path: &path,
        };
        let package = parser.package_clause()?;
        let imports = parser.import_decls()?;
        let functions = parser.top_level_functions();

        Ok(Self {
            path,
            source,
            package,
            imports,
            functions,
            comments,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn package(&self) -> &Ident {
        &self.package
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    pub fn functions(&self) -> &[FuncDecl] {
        &self.functions
    }

    pub fn comments(&self) -> &[CommentText] {
        &self.comments
    }

    /// Find a top-level function by name.
    pub fn find_function(&self, name: &str) -> Option<&FuncDecl> {
        self.functions.iter().find(|f| f.name.name == name)
    }

    /// Edit that removes a comment. A comment alone on its line takes the
    /// whole line with it; a trailing comment takes the whitespace before it.
    pub fn remove_comment(&self, comment: &CommentText) -> Edit {
        let bytes = self.source.as_bytes();
        let line_start = self.source[..comment.span.start]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        let before = &self.source[line_start..comment.span.start];
        let line_end = self.source[comment.span.end..]
            .find('\n')
            .map_or(self.source.len(), |i| comment.span.end + i);
        let after = &self.source[comment.span.end..line_end];

        if before.trim().is_empty() && after.trim().is_empty() {
            let end = if line_end < bytes.len() { line_end + 1 } else { line_end };
            return Edit::delete(line_start..end);
        }

        let mut start = comment.span.start;
        while start > line_start && matches!(bytes[start - 1], b' ' | b'\t') {
            start -= 1;
        }
        Edit::delete(start..comment.span.end)
    }

    /// Build the new file text from the original text and `edits`.
    ///
    /// Edits may be given in any order but must not overlap.
    pub fn apply(&self, edits: &[Edit]) -> Result<String> {
        let mut sorted: Vec<&Edit> = edits.iter().collect();
        sorted.sort_by_key(|e| (e.span.start, e.span.end));

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for edit in sorted {
            if edit.span.start < cursor || edit.span.end > self.source.len() {
                return Err(Error::Syntax {
                    path: self.path.clone(),
                    message: format!("overlapping edit at byte {}", edit.span.start),
                });
            }
            out.push_str(&self.source[cursor..edit.span.start]);
            out.push_str(&edit.replacement);
            cursor = edit.span.end;
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
    path: &'a Path,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn text(&self, token: &Token) -> &'a str {
        &self.src[token.span.clone()]
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn is_keyword(&self, token: &Token, keyword: &str) -> bool {
        token.kind == TokenKind::Ident && self.text(token) == keyword
    }

    fn skip_semicolons(&mut self) {
        while self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Punct(';'))
        {
            self.pos += 1;
        }
    }

    fn package_clause(&mut self) -> Result<Ident> {
        match self.peek() {
            Some(t) if self.is_keyword(t, "package") => self.pos += 1,
            _ => return Err(self.error("expected 'package' clause")),
        }
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                self.pos += 1;
                Ok(Ident {
                    name: self.text(t).to_string(),
                    span: t.span.clone(),
                })
            }
            _ => Err(self.error("expected package name")),
        }
    }

    fn import_decls(&mut self) -> Result<Vec<ImportSpec>> {
        let mut imports = Vec::new();
        loop {
            self.skip_semicolons();
            match self.peek() {
                Some(t) if self.is_keyword(t, "import") => self.pos += 1,
                _ => return Ok(imports),
            }
            if self.peek().is_some_and(|t| t.kind == TokenKind::Punct('(')) {
                self.pos += 1;
                loop {
                    self.skip_semicolons();
                    match self.peek() {
                        Some(t) if t.kind == TokenKind::Punct(')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => imports.push(self.import_spec()?),
                        None => return Err(self.error("import group not terminated")),
                    }
                }
            } else {
                imports.push(self.import_spec()?);
            }
        }
    }

    fn import_spec(&mut self) -> Result<ImportSpec> {
        let name = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident || t.kind == TokenKind::Punct('.') => {
                self.pos += 1;
                Some(self.text(t).to_string())
            }
            _ => None,
        };
        match self.peek() {
            Some(t) if t.kind == TokenKind::String => {
                self.pos += 1;
                let literal = self.text(t);
                let path = scanner::unquote(literal)
                    .ok_or_else(|| self.error(format!("invalid import path {}", literal)))?;
                Ok(ImportSpec {
                    name,
                    path,
                    path_span: t.span.clone(),
                })
            }
            _ => Err(self.error("expected import path")),
        }
    }

    /// Collect `func Name` declarations at nesting depth zero. Methods
    /// (`func (r T) Name`) and function types or literals are skipped.
    fn top_level_functions(&mut self) -> Vec<FuncDecl> {
        let mut functions = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            self.pos += 1;
            match token.kind {
                TokenKind::Punct('(' | '{' | '[') => depth += 1,
                TokenKind::Punct(')' | '}' | ']') => depth = depth.saturating_sub(1),
                TokenKind::Ident if depth == 0 && self.text(token) == "func" => {
                    if let Some(next) = self.peek() {
                        if next.kind == TokenKind::Ident {
                            functions.push(FuncDecl {
                                name: Ident {
                                    name: self.text(next).to_string(),
                                    span: next.span.clone(),
                                },
                            });
                            self.pos += 1;
                        }
                    }
                }
                _ => {}
            }
        }
        functions
    }
}
