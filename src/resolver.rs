//! Import resolution for glang (extends C4).
//!
//! `import("path")` pulls in another source file's public names as externs
//! rather than merging its code into this translation unit. Grounded on the
//! teacher's include `Resolver`: a canonical-path cache both memoizes a
//! file's extern surface and breaks import cycles — an already-in-progress
//! path resolves to an empty, harmless no-op instead of recursing forever.
//! This is the chosen resolution of the import-cycle open question in
//! `spec.md` §9: cycles need not form a DAG, they just degrade gracefully.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::ExternFnSig;
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::types::TypeIdentifier;

/// The externs one imported file contributes to its importer.
#[derive(Debug, Clone, Default)]
pub struct ImportedNames {
    pub functions: Vec<(String, ExternFnSig)>,
    pub vars: Vec<(String, TypeIdentifier)>,
}

impl ImportedNames {
    pub fn empty() -> Self {
        ImportedNames::default()
    }
}

pub struct Resolver {
    /// `None` while a path is mid-resolution (marks an in-progress import,
    /// used to detect and no-op cycles); `Some` once its externs are known.
    cache: HashMap<PathBuf, Option<ImportedNames>>,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver { cache: HashMap::new() }
    }

    /// Resolve `import("import_text")` written in `importer_dir`, returning
    /// the names it contributes. Looks first relative to the importing
    /// file's own directory, then relative to `stdlib_dir` if given.
    pub fn resolve_import(
        &mut self,
        importer_dir: &Path,
        import_text: &str,
        stdlib_dir: Option<&Path>,
        importer_path: &Path,
        line: usize,
        col: usize,
    ) -> Result<ImportedNames, CompileError> {
        let target = locate_import(importer_dir, import_text, stdlib_dir).ok_or_else(|| {
            CompileError::parse(
                importer_path,
                line,
                col,
                format!("cannot find imported module '{import_text}'"),
            )
        })?;

        let canonical = target.canonicalize().unwrap_or(target.clone());

        match self.cache.get(&canonical) {
            Some(Some(names)) => return Ok(names.clone()),
            Some(None) => return Ok(ImportedNames::empty()), // cycle: harmless no-op
            None => {}
        }

        self.cache.insert(canonical.clone(), None);

        let source = fs::read_to_string(&target)
            .map_err(|e| CompileError::io(target.clone(), e.to_string()))?;

        let program = crate::parser::parse_tokens_into_program(
            &target,
            &source,
            self,
            stdlib_dir,
            false, // nested imports never pre-import core themselves
        )?;

        let mut names = ImportedNames::empty();
        for func in &program.functions {
            names.functions.push((
                func.name.clone(),
                ExternFnSig {
                    params: func.params.iter().map(|p| p.ty).collect(),
                    return_type: func.return_type,
                },
            ));
        }
        for global in &program.globals {
            if let Some((name, ty)) = global_name_and_type(global) {
                names.vars.push((name, ty));
            }
        }

        self.cache.insert(canonical, Some(names.clone()));
        Ok(names)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

fn global_name_and_type(stmt: &crate::ast::Stmt) -> Option<(String, TypeIdentifier)> {
    match &stmt.kind {
        crate::ast::StmtKind::VarDeclaration { name, ty, .. } => Some((name.clone(), *ty)),
        crate::ast::StmtKind::VarDeclAssign { name, ty, .. } => Some((name.clone(), *ty)),
        _ => None,
    }
}

/// Locate the file an `import(...)` text refers to: try the importer's own
/// directory first (with and without a `.glang` suffix), then the stdlib
/// directory if one was found.
fn locate_import(importer_dir: &Path, import_text: &str, stdlib_dir: Option<&Path>) -> Option<PathBuf> {
    let candidates = |base: &Path| -> [PathBuf; 2] {
        [base.join(import_text), base.join(format!("{import_text}.glang"))]
    };

    for cand in candidates(importer_dir) {
        if cand.is_file() {
            return Some(cand);
        }
    }
    if let Some(dir) = stdlib_dir {
        for cand in candidates(dir) {
            if cand.is_file() {
                return Some(cand);
            }
        }
    }
    None
}

/// Find the stdlib directory used for the implicit `stdlib/core.glang`
/// import and for `import("stdlib/...")` paths, checking in order:
/// an explicit override in [`CompilerConfig`], a `stdlib/` directory next
/// to the current working directory, and a `stdlib/` directory next to the
/// main source file.
pub fn find_stdlib(source_path: &Path, config: &CompilerConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.extra_stdlib_dir {
        if dir.is_dir() {
            return Some(dir.clone());
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("stdlib");
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    if let Some(parent) = source_path.parent() {
        let candidate = parent.join("stdlib");
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn resolves_direct_sibling_import() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "util.glang",
            "fn helper(x: i64) -> i64 { return x; }",
        );
        let main = write_file(dir.path(), "main.glang", "import(\"util\");");

        let mut resolver = Resolver::new();
        let names = resolver
            .resolve_import(dir.path(), "util", None, &main, 0, 0)
            .unwrap();
        assert_eq!(names.functions.len(), 1);
        assert_eq!(names.functions[0].0, "helper");
    }

    #[test]
    fn cyclic_imports_resolve_without_infinite_recursion() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.glang", "import(\"b\");\nfn a_fn() -> i64 { return 1; }");
        write_file(dir.path(), "b.glang", "import(\"a\");\nfn b_fn() -> i64 { return 2; }");
        let main = dir.path().join("a.glang");

        let mut resolver = Resolver::new();
        let names = resolver.resolve_import(dir.path(), "a", None, &main, 0, 0).unwrap();
        assert_eq!(names.functions.iter().any(|(n, _)| n == "a_fn"), true);
    }

    #[test]
    fn missing_import_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.glang");
        let mut resolver = Resolver::new();
        let err = resolver
            .resolve_import(dir.path(), "nope", None, &main, 3, 1)
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
