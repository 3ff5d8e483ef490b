// src/core/files.rs

//! # File properties
//!
//! Workspace-derived paths (`current.file`, `open.files`, ...) and the `file.*`
//! operations. Every `file.*` operation accepts a list of paths in `file`, separated
//! by `sep`, and maps over it element-wise, keeping the order.

use crate::constants::PATH_SEPARATOR;
use crate::core::{
    attributes::{AttributeSpec, Attributes},
    kinds::{ComputedKind, FileKind, FileListKind},
    operators::split_list,
    property::{Property, PropertyError, PropertyRef, error_detail, error_value},
};
use crate::models::SharedWorkspace;
use std::{
    fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
    rc::Rc,
};
use tempfile::TempPath;
use walkdir::WalkDir;

// --- PATH HELPERS ---

/// Expands a leading `~` to the home directory.
pub fn expand_user(text: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(text).into_owned())
}

/// Makes a path absolute against the process working directory, without touching the
/// file system.
pub fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The path that leads from `base` to `path`. Both should be absolute.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component<'_>> = path.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();
    let common = path
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in base.iter().skip(common) {
        relative.push("..");
    }
    for component in path.iter().skip(common) {
        relative.push(component);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

fn is_enabled(flag: &str) -> bool {
    flag.eq_ignore_ascii_case("true")
}

/// Formats a path for output.
///
/// A non-empty `rel` makes the path relative to that directory. `squote`/`dquote`
/// set to `true` wrap the result in single/double quotes.
pub fn format_path(path: &Path, rel: &str, squote: &str, dquote: &str) -> String {
    let path = if rel.is_empty() {
        path.to_path_buf()
    } else {
        relative_path(&absolutize(path), &absolutize(&expand_user(rel)))
    };
    let mut text = dunce::simplified(&path).display().to_string();
    if is_enabled(squote) {
        text = format!("'{}'", text);
    }
    if is_enabled(dquote) {
        text = format!("\"{}\"", text);
    }
    text
}

fn resolve_against(path: &Path, base: &str) -> PathBuf {
    if base.is_empty() || path.is_absolute() {
        absolutize(path)
    } else {
        absolutize(&expand_user(base).join(path))
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

// --- WORKSPACE ---

fn workspace_properties(workspace: &SharedWorkspace) -> Result<Vec<PropertyRef>, PropertyError> {
    let current = Rc::clone(workspace);
    let working = Rc::clone(workspace);
    let build = Rc::clone(workspace);
    let root = Rc::clone(workspace);
    let open = Rc::clone(workspace);
    let project = Rc::clone(workspace);
    let main = Rc::clone(workspace);

    Ok(vec![
        Property::new(
            "current.file",
            "The document being edited.",
            FileKind::new(move || current.borrow().current_file.clone()),
        )?,
        Property::new(
            "working.dir",
            "The working directory of launched processes.",
            FileKind::new(move || {
                working
                    .borrow()
                    .working_dir
                    .clone()
                    .or_else(|| std::env::current_dir().ok())
            }),
        )?,
        Property::new(
            "build.dir",
            "The build output directory.",
            FileKind::new(move || build.borrow().build_dir.clone()),
        )?,
        Property::new(
            "project.root",
            "The root directory of the project.",
            FileKind::new(move || root.borrow().project_root.clone()),
        )?,
        Property::new(
            "open.files",
            "Every open document, separated by sep.",
            FileListKind::new(move || open.borrow().open_files.clone()),
        )?,
        Property::new(
            "project.files",
            "Every file of the project, separated by sep.",
            FileListKind::new(move || project.borrow().project_files.clone()),
        )?,
        Property::new(
            "main.class",
            "The main class of the project.",
            ComputedKind::eager(Vec::new(), move |_, _| {
                Ok(main.borrow().main_class.clone().unwrap_or_default())
            }),
        )?,
    ])
}

// --- FILE OPERATIONS ---

type FileOp = fn(&Path, &Attributes) -> Result<String, String>;

fn file_op(
    name: &str,
    help: &str,
    extra: Vec<AttributeSpec>,
    op: FileOp,
) -> Result<PropertyRef, PropertyError> {
    let mut specs = vec![
        AttributeSpec::required("file"),
        AttributeSpec::optional("sep", PATH_SEPARATOR),
    ];
    specs.extend(extra);

    let kind = ComputedKind::eager(specs, move |property, _| {
        let attrs = property.attributes();
        let (Some(files), Some(sep)) = (attrs.value("file"), attrs.value("sep")) else {
            return Ok(error_value(property.name()));
        };
        let results: Result<Vec<String>, String> = split_list(files, sep)
            .iter()
            .map(|file| op(&expand_user(file), &attrs))
            .collect();
        Ok(match results {
            Ok(results) => results.join(sep),
            Err(detail) => {
                log::debug!("'{}' failed: {}", property.name(), detail);
                error_detail(property.name(), detail)
            }
        })
    });
    Property::new(name, help, kind)
}

fn parent(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    Ok(path
        .parent()
        .map(|parent| parent.display().to_string())
        .unwrap_or_default())
}

fn abs(path: &Path, attrs: &Attributes) -> Result<String, String> {
    let base = attrs.value("base").unwrap_or_default();
    Ok(dunce::simplified(&resolve_against(path, base))
        .display()
        .to_string())
}

fn rel(path: &Path, attrs: &Attributes) -> Result<String, String> {
    let base = attrs
        .value("base")
        .ok_or_else(|| "base is required".to_string())?;
    let base = absolutize(&expand_user(base));
    Ok(relative_path(&absolutize(path), &base).display().to_string())
}

fn exists(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    Ok(flag(path.exists()))
}

fn is_dir(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    Ok(flag(path.is_dir()))
}

fn is_file(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    Ok(flag(path.is_file()))
}

fn mkdir(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    Ok(flag(fs::create_dir_all(path).is_ok()))
}

fn rm(path: &Path, _attrs: &Attributes) -> Result<String, String> {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    Ok(flag(removed.is_ok()))
}

fn mv(path: &Path, attrs: &Attributes) -> Result<String, String> {
    let new = attrs
        .value("new")
        .ok_or_else(|| "new is required".to_string())?;
    let mut target = expand_user(new);
    if target.is_dir() {
        if let Some(file_name) = path.file_name() {
            target.push(file_name);
        }
    }
    Ok(flag(fs::rename(path, &target).is_ok()))
}

fn find() -> Result<PropertyRef, PropertyError> {
    let specs = vec![
        AttributeSpec::optional("dir", "."),
        AttributeSpec::optional("filter", "*"),
        AttributeSpec::optional("sep", PATH_SEPARATOR),
        AttributeSpec::optional("rel", ""),
    ];
    let kind = ComputedKind::uncached(specs, |property, _| {
        let attrs = property.attributes();
        let (Some(dir), Some(filter), Some(sep), Some(rel)) = (
            attrs.value("dir"),
            attrs.value("filter"),
            attrs.value("sep"),
            attrs.value("rel"),
        ) else {
            return Ok(error_value(property.name()));
        };
        let pattern = match glob::Pattern::new(filter) {
            Ok(pattern) => pattern,
            Err(e) => return Ok(error_detail(property.name(), e)),
        };

        let found: Vec<String> = WalkDir::new(expand_user(dir))
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
            .map(|entry| format_path(entry.path(), rel, "", ""))
            .collect();
        Ok(found.join(sep))
    });
    Property::new(
        "file.find",
        "Lists the files below dir whose names match filter, separated by sep.",
        kind,
    )
}

/// Every property of the `File` category.
pub fn properties(workspace: &SharedWorkspace) -> Result<Vec<PropertyRef>, PropertyError> {
    let mut properties = workspace_properties(workspace)?;
    properties.extend([
        file_op(
            "file.parent",
            "Returns the parent directory of each file.",
            Vec::new(),
            parent,
        )?,
        file_op(
            "file.abs",
            "Returns the absolute path of each file, resolved against base.",
            vec![AttributeSpec::optional("base", "")],
            abs,
        )?,
        file_op(
            "file.rel",
            "Returns the path of each file relative to base.",
            vec![AttributeSpec::required("base")],
            rel,
        )?,
        file_op("file.exists", "Returns true if each file exists.", Vec::new(), exists)?,
        file_op("file.isdir", "Returns true if each file is a directory.", Vec::new(), is_dir)?,
        file_op("file.isfile", "Returns true if each file is a regular file.", Vec::new(), is_file)?,
        file_op(
            "file.mkdir",
            "Creates each directory, with its parents. Returns true on success.",
            Vec::new(),
            mkdir,
        )?,
        file_op(
            "file.rm",
            "Deletes each file or directory, recursively. Returns true on success.",
            Vec::new(),
            rm,
        )?,
        file_op(
            "file.mv",
            "Moves each file to new, or into new if it is a directory. Returns true on success.",
            vec![AttributeSpec::required("new")],
            mv,
        )?,
        find()?,
    ]);
    Ok(properties)
}

// --- TEMPORARY FILES ---

/// A single normal path component: no separators, no `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(std::path::is_separator)
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
}

/// Creates the file. Returns its path, and the handle that deletes it unless kept.
fn create_temp_file(attrs: &Attributes) -> io::Result<(PathBuf, Option<TempPath>)> {
    let name = attrs.value("name").unwrap_or_default();
    if !name.is_empty() && !is_plain_file_name(name) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a plain file name", name),
        ));
    }
    let dir = attrs
        .value("dir")
        .filter(|dir| !dir.is_empty())
        .map(expand_user)
        .unwrap_or_else(std::env::temp_dir);

    let mut builder = tempfile::Builder::new();
    if name.is_empty() {
        builder.prefix("propmaps").suffix(".tmp");
    } else {
        builder.prefix(name).rand_bytes(0);
    }
    let mut file = builder.tempfile_in(&dir)?;
    file.write_all(attrs.value("content").unwrap_or_default().as_bytes())?;
    file.flush()?;

    if attrs.value("keep").is_some_and(is_enabled) {
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok((path, None))
    } else {
        let temp_path = file.into_temp_path();
        Ok((temp_path.to_path_buf(), Some(temp_path)))
    }
}

/// `tmpfile`: creates a temporary file and returns its path.
///
/// Files not kept are deleted when the context that evaluated the property is dropped.
pub fn tmpfile() -> Result<PropertyRef, PropertyError> {
    let kind = ComputedKind::eager(
        vec![
            AttributeSpec::optional("name", ""),
            AttributeSpec::optional("dir", ""),
            AttributeSpec::optional("keep", "false"),
            AttributeSpec::optional("content", ""),
        ],
        |property, context| {
            let attrs = property.attributes();
            Ok(match create_temp_file(&attrs) {
                Ok((path, temp_path)) => {
                    if let Some(temp_path) = temp_path {
                        context.keep_temp_file(temp_path);
                    }
                    path.display().to_string()
                }
                Err(e) => error_detail(property.name(), e),
            })
        },
    );
    Property::new(
        "tmpfile",
        "Creates a temporary file with the given content and returns its path.",
        kind,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::property_maps::PropertyMaps;
    use crate::models::WorkspaceState;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn eval_in(property: &PropertyRef, context: &mut PropertyMaps, attrs: &[(&str, &str)]) -> String {
        property.reset_attributes();
        for (key, value) in attrs {
            property.set_attribute(key, *value).unwrap();
        }
        property.get_current(context).unwrap()
    }

    fn eval(property: &PropertyRef, attrs: &[(&str, &str)]) -> String {
        eval_in(property, &mut PropertyMaps::new(), attrs)
    }

    fn named(name: &str) -> PropertyRef {
        let workspace = SharedWorkspace::default();
        properties(&workspace)
            .unwrap()
            .into_iter()
            .find(|p| p.name() == name)
            .unwrap()
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/a/b/c"), Path::new("/a/d")),
            PathBuf::from("../b/c")
        );
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/a/b")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_format_path_quotes() {
        assert_eq!(format_path(Path::new("x y"), "", "TRUE", ""), "'x y'");
        assert_eq!(format_path(Path::new("x"), "", "", "true"), "\"x\"");
        assert_eq!(format_path(Path::new("x"), "", "no", ""), "x");
    }

    #[test]
    fn test_existence_checks_map_element_wise() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        let missing = dir.path().join("missing");
        let list = format!("{};{};{}", file.display(), dir.path().display(), missing.display());

        assert_eq!(eval(&named("file.exists"), &[("file", list.as_str()), ("sep", ";")]), "true;true;false");
        assert_eq!(eval(&named("file.isdir"), &[("file", list.as_str()), ("sep", ";")]), "false;true;false");
        assert_eq!(eval(&named("file.isfile"), &[("file", list.as_str()), ("sep", ";")]), "true;false;false");
    }

    #[test]
    fn test_parent_and_rel() {
        assert_eq!(eval(&named("file.parent"), &[("file", "/a/b/c.txt")]), "/a/b");
        assert_eq!(
            eval(&named("file.rel"), &[("file", "/a/b/c.txt"), ("base", "/a")]),
            Path::new("b").join("c.txt").display().to_string()
        );
        assert_eq!(
            eval(&named("file.rel"), &[("file", "/a/b/c.txt")]),
            "(file.rel Error: base is required...)"
        );
        assert_eq!(
            eval(&named("file.abs"), &[("file", "c.txt"), ("base", "/a/b")]),
            "/a/b/c.txt"
        );
    }

    #[test]
    fn test_mkdir_mv_rm() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub").join("deeper");
        let sub_text = sub.display().to_string();
        assert_eq!(eval(&named("file.mkdir"), &[("file", sub_text.as_str())]), "true");
        assert!(sub.is_dir());

        let file = dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        let file_text = file.display().to_string();
        assert_eq!(eval(&named("file.mv"), &[("file", file_text.as_str()), ("new", sub_text.as_str())]), "true");
        assert!(sub.join("f.txt").is_file());

        let top = dir.path().join("sub").display().to_string();
        assert_eq!(eval(&named("file.rm"), &[("file", top.as_str())]), "true");
        assert!(!dir.path().join("sub").exists());
        assert_eq!(eval(&named("file.rm"), &[("file", top.as_str())]), "false");
    }

    #[test]
    fn test_find_filters_by_glob() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("B.java"), "").unwrap();
        fs::write(dir.path().join("A.java"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let root = dir.path().display().to_string();

        let found = eval(
            &named("file.find"),
            &[("dir", root.as_str()), ("filter", "*.java"), ("rel", root.as_str()), ("sep", ",")],
        );
        let expected = format!("A.java,{}", Path::new("src").join("B.java").display());
        assert_eq!(found, expected);

        assert!(eval(&named("file.find"), &[("dir", root.as_str()), ("filter", "[")]).starts_with("(file.find Error: "));
    }

    #[test]
    fn test_workspace_properties_follow_state() {
        let workspace = SharedWorkspace::default();
        let props = properties(&workspace).unwrap();
        let find = |name: &str| props.iter().find(|p| p.name() == name).cloned().unwrap();

        assert_eq!(eval(&find("current.file"), &[]), "");
        assert_eq!(eval(&find("main.class"), &[]), "");

        *workspace.borrow_mut() = WorkspaceState {
            current_file: Some(PathBuf::from("/p/src/Main.java")),
            open_files: vec![PathBuf::from("/p/a"), PathBuf::from("/p/b")],
            main_class: Some("app.Main".to_string()),
            ..WorkspaceState::default()
        };
        assert_eq!(eval(&find("current.file"), &[]), "/p/src/Main.java");
        assert_eq!(eval(&find("open.files"), &[("sep", " "), ("rel", "/p")]), "a b");
        assert_eq!(eval(&find("main.class"), &[]), "app.Main");
    }

    #[test]
    fn test_tmpfile_is_deleted_with_its_context() {
        let dir = tempdir().unwrap();
        let dir_text = dir.path().display().to_string();
        let property = tmpfile().unwrap();
        let mut template = PropertyMaps::new();
        let mut context = template.clone();

        let path = PathBuf::from(eval_in(
            &property,
            &mut context,
            &[("dir", dir_text.as_str()), ("content", "hello")],
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        let kept = PathBuf::from(eval_in(
            &property,
            &mut context,
            &[("dir", dir_text.as_str()), ("name", "kept.txt"), ("keep", "true")],
        ));
        assert_eq!(kept, dir.path().join("kept.txt"));

        let long_lived = PathBuf::from(eval_in(&property, &mut template, &[("dir", dir_text.as_str())]));

        drop(context);
        assert!(!path.exists());
        assert!(kept.exists());
        assert!(long_lived.exists());
    }

    #[test]
    fn test_tmpfile_name_must_stay_in_dir() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("inner");
        fs::create_dir(&inner).unwrap();
        let inner_text = inner.display().to_string();
        let property = tmpfile().unwrap();

        for name in ["../escape.txt", "sub/x.txt", "..", "."] {
            let out = eval(&property, &[("dir", inner_text.as_str()), ("name", name)]);
            assert!(out.starts_with("(tmpfile Error: "), "{} gave {}", name, out);
        }
        assert!(!dir.path().join("escape.txt").exists());

        let out = eval(&property, &[("dir", inner_text.as_str()), ("name", "plain.txt")]);
        assert_eq!(PathBuf::from(out), inner.join("plain.txt"));
    }
}
