//! Lexical path algorithms.
//!
//! Every function here works on the path string alone. Only
//! [`resolve_symlink`] and [`absolute`] consult the filesystem or the
//! process environment, and both report failure through `io::Result` so
//! callers can decide whether to degrade or abort.
//!
//! The separator is always `/`. A two-byte drive prefix such as `C:` is
//! recognised as a volume name and preserved by the cleaning functions.

use std::{env, fs, io};

use crate::error::{PipelineError, Result};

/// Path component separator.
pub const SEPARATOR: char = '/';

/// Return the leading volume name (`C:`), or an empty string.
///
/// ```
/// use pathpipe::path::volume_name;
///
/// assert_eq!(volume_name("C:/Windows"), "C:");
/// assert_eq!(volume_name("/usr/bin"), "");
/// ```
pub fn volume_name(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[..2]
    } else {
        ""
    }
}

/// Return the shortest path lexically equivalent to `path`.
///
/// Repeated separators collapse, `.` elements are dropped and `..`
/// elements consume the preceding element. A `..` that cannot be consumed
/// is kept on relative paths and dropped on rooted ones. An empty result
/// becomes `.`.
///
/// ```
/// use pathpipe::path::clean;
///
/// assert_eq!(clean("a//b/./c/.."), "a/b");
/// assert_eq!(clean("/../x/"), "/x");
/// assert_eq!(clean("../../a"), "../../a");
/// assert_eq!(clean(""), ".");
/// ```
pub fn clean(path: &str) -> String {
    let volume = volume_name(path);
    let rest = &path[volume.len()..];
    let rooted = rest.starts_with(SEPARATOR);

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }

    let body = parts.join("/");
    if rooted {
        format!("{volume}/{body}")
    } else if body.is_empty() {
        format!("{volume}.")
    } else if volume.is_empty() && !volume_name(&body).is_empty() {
        // "a/../C:x" must not turn into a volume-qualified path
        format!("./{body}")
    } else {
        format!("{volume}{body}")
    }
}

/// Return all but the last element of `path`, cleaned.
///
/// A path without a separator yields `.`.
pub fn dir_name(path: &str) -> String {
    let volume = volume_name(path);
    let rest = &path[volume.len()..];
    let head = match rest.rfind(SEPARATOR) {
        Some(idx) => &rest[..=idx],
        None => "",
    };
    format!("{volume}{}", clean(head))
}

/// Keep the first `depth` elements of `path` when `depth` is positive, or
/// the last `|depth|` elements when it is negative.
///
/// A depth of zero, or one covering every element, returns the path
/// unchanged.
///
/// ```
/// use pathpipe::path::dir_name_n;
///
/// assert_eq!(dir_name_n("/a/b/c/d", 2), "/a/b");
/// assert_eq!(dir_name_n("/a/b/c/d", -1), "d");
/// ```
pub fn dir_name_n(path: &str, depth: isize) -> String {
    let parts: Vec<&str> = path.split(SEPARATOR).filter(|p| !p.is_empty()).collect();
    let count = depth.unsigned_abs();
    if depth == 0 || count >= parts.len() {
        return path.to_string();
    }

    if depth > 0 {
        let head = parts[..count].join("/");
        if path.starts_with(SEPARATOR) {
            format!("/{head}")
        } else {
            head
        }
    } else {
        parts[parts.len() - count..].join("/")
    }
}

/// Return the last element of `path`.
///
/// Trailing separators are ignored. An empty path yields `.` and a path of
/// only separators yields `/`.
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches(SEPARATOR);
    let trimmed = &trimmed[volume_name(trimmed).len()..];
    let name = match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    if name.is_empty() { "/" } else { name }
}

/// Return the extension of the last element, including its dot.
///
/// Dotfiles without a further dot (`.bashrc`) have no extension.
pub fn extension(path: &str) -> &str {
    let name = match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    };
    if name == ".." {
        return "";
    }
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx..],
    }
}

/// Return `path` without its [`extension`].
pub fn strip_extension(path: &str) -> &str {
    &path[..path.len() - extension(path).len()]
}

/// Shorten every element except the last to its first character.
///
/// `..` is kept whole, a hidden element keeps its dot plus one character
/// and a volume name is left alone. Trailing separators are dropped.
///
/// ```
/// use pathpipe::path::compact;
///
/// assert_eq!(compact("/very/long/path/to/some/file.txt"), "/v/l/p/t/s/file.txt");
/// ```
pub fn compact(path: &str) -> String {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return if path.is_empty() { String::new() } else { "/".to_string() };
    }

    let parts: Vec<&str> = trimmed.split(SEPARATOR).collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            if idx == last || (idx == 0 && volume_name(part) == *part) {
                (*part).to_string()
            } else {
                shorten(part)
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn shorten(part: &str) -> String {
    if part == ".." {
        return part.to_string();
    }
    let mut chars = part.chars();
    match chars.next() {
        Some('.') => match chars.next() {
            Some(c) => format!(".{c}"),
            None => ".".to_string(),
        },
        Some(c) => c.to_string(),
        None => String::new(),
    }
}

/// Report whether `path` is rooted, either at `/` or at a volume root.
pub fn is_absolute(path: &str) -> bool {
    if path.starts_with(SEPARATOR) {
        return true;
    }
    let volume = volume_name(path);
    !volume.is_empty() && path[volume.len()..].starts_with([SEPARATOR, '\\'])
}

/// Report whether `path` is relative, non-empty, carries no volume and
/// stays inside its own subtree once cleaned.
pub fn is_local(path: &str) -> bool {
    if path.is_empty() || is_absolute(path) || !volume_name(path).is_empty() {
        return false;
    }
    let cleaned = clean(path);
    cleaned != ".." && !cleaned.starts_with("../")
}

/// Report whether `path` is safe to hand to a join.
///
/// On top of [`is_local`], the path must not be blank, must not carry
/// control characters, and walking its elements left to right must never
/// climb above the starting directory.
///
/// ```
/// use pathpipe::path::is_safe;
///
/// assert!(is_safe("a/b/../c"));
/// assert!(!is_safe("a/../../b"));
/// assert!(!is_safe("/etc/passwd"));
/// ```
pub fn is_safe(path: &str) -> bool {
    if !is_local(path) || path.trim().is_empty() || path.chars().any(char::is_control) {
        return false;
    }

    let mut depth = 0usize;
    for part in path.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => depth += 1,
        }
    }
    true
}

/// Join `parts` onto `root` one at a time, refusing any step that
/// resolves outside `root`.
///
/// Containment is checked on the cleaned path after each part. A part is
/// resolved as a whole before that check, so a single part such as
/// `../root/x` that lands back inside `root` is accepted, while splitting
/// it into `..` and `root/x` is refused at the first step. Leading
/// separators on a part do not re-root it. A volume on `root` must be
/// carried unchanged by the result.
///
/// ```
/// use pathpipe::path::join_secure;
///
/// assert_eq!(join_secure("root", &["sub/dir"]).unwrap(), "root/sub/dir");
/// assert!(join_secure("root", &["../escape"]).is_err());
/// ```
pub fn join_secure<S: AsRef<str>>(root: &str, parts: &[S]) -> Result<String> {
    let base = clean(root);
    let mut joined = base.clone();

    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        joined = clean(&format!("{joined}/{part}"));
        if !is_within(&base, &joined) {
            return Err(PipelineError::PathEscape {
                root: root.to_string(),
                path: joined,
            });
        }
    }

    Ok(joined)
}

/// Both arguments must already be clean.
fn is_within(base: &str, path: &str) -> bool {
    let volume = volume_name(base);
    if volume_name(path) != volume {
        return false;
    }
    let (base, path) = (&base[volume.len()..], &path[volume.len()..]);
    if base.starts_with(SEPARATOR) != path.starts_with(SEPARATOR) {
        return false;
    }
    let base_parts = elements(base);
    let path_parts = elements(path);
    path_parts.starts_with(&base_parts) && !path_parts[base_parts.len()..].contains(&"..")
}

fn elements(path: &str) -> Vec<&str> {
    path.split(SEPARATOR)
        .filter(|p| !p.is_empty() && *p != ".")
        .collect()
}

/// Resolve symbolic links in `path` and return the canonical target.
pub fn resolve_symlink(path: &str) -> io::Result<String> {
    let target = fs::canonicalize(path)?;
    Ok(target.to_string_lossy().into_owned())
}

/// Resolve `path` against the current working directory and clean it.
pub fn absolute(path: &str) -> io::Result<String> {
    if is_absolute(path) {
        return Ok(clean(path));
    }
    let cwd = env::current_dir()?;
    Ok(clean(&format!("{}/{path}", cwd.to_string_lossy())))
}
