//! Dispatch Synthesizer
//!
//! Builds the table that maps each command name to the promoted entry point
//! of its relocated main package, and renders it as a Go source file.
//!
//! When several commands resolve to the same package, the command whose name
//! sorts first owns the package's import alias and the others reuse it, so
//! each package is imported exactly once.

use std::collections::{BTreeMap, BTreeSet};

use crate::defaults::{MAIN_PACKAGE, MERGED_MAIN};
use crate::error::{Error, Result};
use crate::syntax::scanner;

/// Go keywords; never valid as identifiers.
const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

/// Names an import alias must not shadow in the generated file.
const RESERVED: &[&str] = &[
    "fmt", "os", "Programs", "Run", "main", "any", "append", "bool", "byte", "cap", "clear",
    "close", "comparable", "complex", "complex64", "complex128", "copy", "delete", "error",
    "false", "float32", "float64", "imag", "int", "int8", "int16", "int32", "int64", "iota",
    "len", "make", "max", "min", "new", "nil", "panic", "print", "println", "real", "recover",
    "rune", "string", "true", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
];

/// One import of the dispatch unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchImport {
    pub alias: String,
    pub import_path: String,
}

/// One command of the dispatch unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub command: String,
    pub alias: String,
}

/// The dispatch unit: package name, imports sorted by path, entries sorted by
/// command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    pub package: String,
    pub imports: Vec<DispatchImport>,
    pub entries: Vec<DispatchEntry>,
}

/// Build the dispatch table for `commands`, a map from command name to the
/// relocated import path of the command's main package.
pub fn build_dispatch(namespace: &str, commands: &BTreeMap<String, String>) -> Result<DispatchTable> {
    if !is_identifier(namespace) {
        return Err(Error::Config {
            message: format!("{:?} is not a valid Go package name", namespace),
        });
    }

    let mut aliases: BTreeMap<&str, String> = BTreeMap::new();
    let mut taken = BTreeSet::new();
    let mut entries = Vec::with_capacity(commands.len());

    for (command, import_path) in commands {
        let alias = aliases
            .entry(import_path.as_str())
            .or_insert_with(|| unique_alias(&sanitize_alias(command), &mut taken))
            .clone();
        entries.push(DispatchEntry {
            command: command.clone(),
            alias,
        });
    }

    let imports = aliases
        .into_iter()
        .map(|(import_path, alias)| DispatchImport {
            alias,
            import_path: import_path.to_string(),
        })
        .collect();

    Ok(DispatchTable {
        package: namespace.to_string(),
        imports,
        entries,
    })
}

impl DispatchTable {
    /// Whether the table renders a `main` function.
    pub fn is_executable(&self) -> bool {
        self.package == MAIN_PACKAGE
    }

    /// Render the table as Go source.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let executable = self.is_executable();

        out.push_str("// Code generated by gomerge. DO NOT EDIT.\n\n");
        out.push_str(&format!("package {}\n\n", self.package));

        out.push_str("import (\n");
        if executable {
            out.push_str("\t\"fmt\"\n");
        }
        out.push_str("\t\"os\"\n");
        if !self.imports.is_empty() {
            out.push('\n');
        }
        for import in &self.imports {
            out.push_str(&format!(
                "\t{} {}\n",
                import.alias,
                scanner::quote(&import.import_path)
            ));
        }
        out.push_str(")\n\n");

        out.push_str("// Programs maps each command name to the entry point of its program.\n");
        out.push_str("var Programs = map[string]func(){\n");
        let keys: Vec<String> = self.entries.iter().map(|e| scanner::quote(&e.command)).collect();
        let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0);
        for (key, entry) in keys.iter().zip(&self.entries) {
            let padding = width - key.chars().count();
            out.push_str(&format!(
                "\t{}:{} func() {{ {}.{}() }},\n",
                key,
                " ".repeat(padding + 1),
                entry.alias,
                MERGED_MAIN
            ));
        }
        out.push_str("}\n\n");

        out.push_str(RUN_FUNC);
        if executable {
            out.push('\n');
            out.push_str(MAIN_FUNC);
        }
        out
    }
}

const RUN_FUNC: &str = r#"// Run invokes the program registered as name with args, as if it had been
// started as a process named name. It reports whether name is registered.
func Run(name string, args []string) bool {
	program, ok := Programs[name]
	if !ok {
		return false
	}
	os.Args = append([]string{name}, args...)
	program()
	return true
}
"#;

const MAIN_FUNC: &str = r#"func main() {
	if len(os.Args) < 2 {
		fmt.Fprintf(os.Stderr, "usage: %s <command> [arguments]\n", os.Args[0])
		os.Exit(2)
	}
	if !Run(os.Args[1], os.Args[2:]) {
		fmt.Fprintf(os.Stderr, "unknown command %q\n", os.Args[1])
		os.Exit(2)
	}
}
"#;

/// Whether `name` is a Go identifier that is not a keyword or blank.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && name != "_"
        && !KEYWORDS.contains(&name)
}

/// Turn a command name into an identifier usable as an import alias.
pub fn sanitize_alias(command: &str) -> String {
    let mut alias: String = command
        .chars()
        .map(|c| if c == '_' || c.is_alphanumeric() { c } else { '_' })
        .collect();
    let starts_with_digit = alias.chars().next().is_some_and(|c| !c.is_alphabetic() && c != '_');
    if alias.is_empty()
        || alias == "_"
        || starts_with_digit
        || KEYWORDS.contains(&alias.as_str())
        || RESERVED.contains(&alias.as_str())
    {
        alias.insert_str(0, "cmd_");
    }
    alias
}

fn unique_alias(base: &str, taken: &mut BTreeSet<String>) -> String {
    let mut alias = base.to_string();
    let mut suffix = 2;
    while taken.contains(&alias) {
        alias = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    taken.insert(alias.clone());
    alias
}
