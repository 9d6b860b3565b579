//! Orchestrator for a complete repackaging run
//!
//! This module coordinates the phases for every configured program:
//!
//! 1. Validate the namespace and the output directory.
//! 2. Delete and recreate the relocation root `<output_dir>/internal`.
//! 3. Derive the relocation import prefix from the project module.
//! 4. For each program, in sorted command order:
//!    locate → copy (once per module) → rewrite the whole relocation root →
//!    materialize the private `flag` copy (once) → check the entry point.
//! 5. Write the dispatch unit.
//!
//! The first failure aborts the run. Nothing already written is rolled back;
//! the next run starts by deleting the relocation root.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::copy::{copy_module, create_dir, prune_empty_dirs};
use super::dispatch::{build_dispatch, is_identifier};
use super::locate::locate_program;
use super::rewrite::{rewrite_tree, RewriteOptions};
use crate::checksum::{Backup, ChecksumDiff, Checksums};
use crate::config::{Config, ProgramSpec};
use crate::defaults::{DISPATCH_FILE, RELOCATION_ROOT, SINGLETON_COPY_DIR, SINGLETON_PACKAGE};
use crate::error::{Error, Result, ResultExt};
use crate::module::{ModuleInfo, ModuleOracle, ModulePath};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Directory the relocated modules were written to.
    pub relocation_root: PathBuf,
    /// Import path of the relocation root.
    pub import_prefix: String,
    /// Relocated modules, in the order they were copied.
    pub modules: Vec<ModuleInfo>,
    /// Command name to relocated import path of its main package.
    pub commands: BTreeMap<String, String>,
    /// Whether the private `flag` copy was written.
    pub singleton_copied: bool,
    pub dispatch_file: PathBuf,
}

/// Per-run state shared by the program passes.
struct RunState {
    relocation_root: PathBuf,
    prefix: String,
    project: ModuleInfo,
    copied: BTreeSet<ModulePath>,
    modules: Vec<ModuleInfo>,
    entry_points: BTreeSet<PathBuf>,
    /// `flag` policy of every relocated module tree.
    rewrite: RewriteOptions,
    singleton_copied: bool,
}

/// Repackage every program of `config` into `output_dir`.
pub fn run<O: ModuleOracle + ?Sized>(
    config: &Config,
    output_dir: &Path,
    namespace: &str,
    oracle: &O,
) -> Result<RunReport> {
    if !is_identifier(namespace) {
        return Err(Error::Config {
            message: format!("{:?} is not a valid Go package name", namespace),
        });
    }
    if !output_dir.is_dir() {
        return Err(Error::io(
            format!("output directory {} is not a directory", output_dir.display()),
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    let output_dir = fs::canonicalize(output_dir).map_err(|e| {
        Error::io(format!("failed to resolve {}", output_dir.display()), e)
    })?;

    let relocation_root = output_dir.join(RELOCATION_ROOT);
    if relocation_root.exists() {
        fs::remove_dir_all(&relocation_root).map_err(|e| {
            Error::io(format!("failed to remove {}", relocation_root.display()), e)
        })?;
    }
    create_dir(&relocation_root)?;

    let project = oracle
        .main_module(&output_dir)
        .context(|| format!("failed to determine project module of {}", output_dir.display()))?;
    let prefix = import_prefix(&project, &relocation_root)?;
    log::debug!("relocating into {} as {}", relocation_root.display(), prefix);

    let mut state = RunState {
        relocation_root,
        prefix,
        project,
        copied: BTreeSet::new(),
        modules: Vec::new(),
        entry_points: BTreeSet::new(),
        rewrite: RewriteOptions::default(),
        singleton_copied: false,
    };

    let mut commands = BTreeMap::new();
    for program in config.programs() {
        let import_path = repackage(&mut state, program, &output_dir, oracle)
            .context(|| format!("repackaging failed for command {}", program.name))?;
        commands.insert(program.name.clone(), import_path);
    }

    prune_empty_dirs(&state.relocation_root)?;

    let table = build_dispatch(namespace, &commands)?;
    let dispatch_file = output_dir.join(DISPATCH_FILE);
    fs::write(&dispatch_file, table.render()).map_err(|e| {
        Error::io(format!("failed to write file {}", dispatch_file.display()), e)
    })?;
    log::debug!("wrote {} with {} commands", dispatch_file.display(), commands.len());

    Ok(RunReport {
        relocation_root: state.relocation_root,
        import_prefix: state.prefix,
        modules: state.modules,
        commands,
        singleton_copied: state.singleton_copied,
        dispatch_file,
    })
}

/// One program pass. Returns the relocated import path of its main package.
fn repackage<O: ModuleOracle + ?Sized>(
    state: &mut RunState,
    program: &ProgramSpec,
    output_dir: &Path,
    oracle: &O,
) -> Result<String> {
    let located = locate_program(oracle, &program.package_ref, output_dir)
        .context(|| format!("failed to locate module for {}", program.package_ref))?;
    let module = located.module;

    if module.path == state.project.path {
        return Err(Error::NotAModule {
            package: program.package_ref.clone(),
            module: module.path.to_string(),
        });
    }

    if state.copied.insert(module.path.clone()) {
        copy_module(oracle, &module.path, &module.dir, &state.relocation_root)
            .context(|| format!("failed to copy module {}", module.path))?;
        state.modules.push(module.clone());
    } else {
        log::debug!("module {} already relocated", module.path);
    }

    let module_dir = state.relocation_root.join(module.path.to_rel_path());
    match state.rewrite.flag_policy.get(&module_dir) {
        Some(keep) if *keep != program.keep_flag_import => {
            return Err(Error::Config {
                message: format!(
                    "programs of module {} disagree on keep-flag-import",
                    module.path
                ),
            });
        }
        Some(_) => {}
        None => {
            state
                .rewrite
                .flag_policy
                .insert(module_dir, program.keep_flag_import);
        }
    }

    let report = rewrite_tree(
        oracle,
        &state.relocation_root,
        &module.path,
        &state.prefix,
        &state.rewrite,
    )?;
    state.entry_points.extend(report.entry_points);

    if report.singleton_referenced && !state.singleton_copied {
        copy_singleton(oracle, &state.relocation_root)?;
        state.singleton_copied = true;
    }

    let import_path = located.package.import_path;
    let package_dir = import_path
        .split('/')
        .fold(state.relocation_root.clone(), |dir, part| dir.join(part));
    let relocated = format!("{}/{}", state.prefix, import_path);
    if !state.entry_points.contains(&package_dir) {
        return Err(Error::MissingEntryPoint { location: relocated });
    }
    Ok(relocated)
}

/// Import path of `relocation_root` inside the project module.
fn import_prefix(project: &ModuleInfo, relocation_root: &Path) -> Result<String> {
    let rel = relocation_root.strip_prefix(&project.dir).map_err(|_| Error::Context {
        context: format!(
            "output directory {} is not inside project module {} at {}",
            relocation_root.display(),
            project.path,
            project.dir.display()
        ),
        source: Box::new(Error::NoModule {
            dir: relocation_root.to_path_buf(),
        }),
    })?;
    let mut prefix = project.path.to_string();
    for component in rel.components() {
        prefix.push('/');
        prefix.push_str(&component.as_os_str().to_string_lossy());
    }
    Ok(prefix)
}

/// Copy the non-test source of the standard library `flag` package to
/// `<relocation_root>/merged_flag`.
fn copy_singleton<O: ModuleOracle + ?Sized>(oracle: &O, relocation_root: &Path) -> Result<()> {
    let source = oracle
        .standard_package_dir(SINGLETON_PACKAGE)
        .context(|| format!("failed to locate package {}", SINGLETON_PACKAGE))?;
    let dest = relocation_root.join(SINGLETON_COPY_DIR);
    create_dir(&dest)?;

    let entries = fs::read_dir(&source)
        .map_err(|e| Error::io(format!("failed to read directory {}", source.display()), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::io(format!("failed to read directory {}", source.display()), e))?;
        let name = entry.file_name();
        let is_source = name
            .to_str()
            .is_some_and(|n| n.ends_with(".go") && !n.ends_with("_test.go"));
        if is_source && entry.file_type().is_ok_and(|t| t.is_file()) {
            files.push(entry.path());
        }
    }
    files.sort();

    for file in &files {
        let Some(name) = file.file_name() else { continue };
        let target = dest.join(name);
        fs::copy(file, &target).map_err(|e| {
            Error::io(format!("failed to copy {} to {}", file.display(), target.display()), e)
        })?;
    }
    log::debug!("copied {} files of {} to {}", files.len(), SINGLETON_PACKAGE, dest.display());
    Ok(())
}

/// Outcome of a verify run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub diff: ChecksumDiff,
}

impl VerifyReport {
    /// Whether regenerating would leave the output directory unchanged.
    pub fn is_up_to_date(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Run the repackaging against `output_dir` and report what it would change.
/// The directory is restored to its previous contents whether or not the run
/// succeeds.
pub fn verify<O: ModuleOracle + ?Sized>(
    config: &Config,
    output_dir: &Path,
    namespace: &str,
    oracle: &O,
) -> Result<VerifyReport> {
    let before = Checksums::for_dir(output_dir)?;
    let backup = Backup::create(output_dir)?;

    let outcome = run(config, output_dir, namespace, oracle)
        .and_then(|_| Checksums::for_dir(output_dir));
    let restored = backup
        .restore()
        .context(|| format!("failed to restore {}", output_dir.display()));

    let after = outcome?;
    restored?;
    Ok(VerifyReport {
        diff: before.diff(&after),
    })
}
