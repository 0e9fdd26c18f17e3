//! Path text helpers for engine-reported paths.
//!
//! Build engines report item includes as text in the host platform's
//! convention, which is not necessarily the platform this crate runs on.
//! These helpers treat both `/` and `\` as separators and drive-letter or UNC
//! prefixes as rooted, regardless of the current target.

/// Returns true when `path` is rooted: a leading separator or a drive letter.
pub(crate) fn is_rooted(path: &str) -> bool {
	let bytes = path.as_bytes();
	match bytes {
		[b'/' | b'\\', ..] => true,
		[drive, b':', ..] => drive.is_ascii_alphabetic(),
		_ => false,
	}
}

/// Joins `relative` onto `base` unless `relative` is already rooted.
pub(crate) fn make_absolute(base: &str, relative: &str) -> String {
	if is_rooted(relative) || base.is_empty() {
		return relative.to_string();
	}
	let separator = if base.contains('\\') && !base.contains('/') { '\\' } else { '/' };
	if base.ends_with(['/', '\\']) {
		format!("{base}{relative}")
	} else {
		format!("{base}{separator}{relative}")
	}
}

/// Returns the final component of `path`.
pub(crate) fn file_name(path: &str) -> &str {
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Returns the final component of `path` without its extension.
pub(crate) fn file_stem(path: &str) -> &str {
	let name = file_name(path);
	match name.rfind('.') {
		Some(0) | None => name,
		Some(dot) => &name[..dot],
	}
}

/// Expresses `path` relative to `base` when it lies beneath it.
pub(crate) fn relative_to(base: &str, path: &str) -> String {
	let trimmed = base.trim_end_matches(['/', '\\']);
	if trimmed.is_empty() {
		return path.to_string();
	}
	match path.strip_prefix(trimmed) {
		Some(rest) if rest.starts_with(['/', '\\']) => rest[1..].to_string(),
		_ => path.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rooted_forms() {
		assert!(is_rooted("C:\\libs\\foo.dll"));
		assert!(is_rooted("/usr/lib/foo.so"));
		assert!(is_rooted("\\\\server\\share\\foo.dll"));
		assert!(!is_rooted("obj\\Interop.Foo.dll"));
		assert!(!is_rooted(""));
	}

	#[test]
	fn absolute_joins_with_base_separator() {
		assert_eq!(make_absolute("C:\\proj", "obj\\Interop.Foo.dll"), "C:\\proj\\obj\\Interop.Foo.dll");
		assert_eq!(make_absolute("/work/proj/", "obj/foo.dll"), "/work/proj/obj/foo.dll");
		assert_eq!(make_absolute("/work/proj", "C:\\libs\\foo.dll"), "C:\\libs\\foo.dll");
	}

	#[test]
	fn stems_ignore_separator_style() {
		assert_eq!(file_stem("C:\\libs\\foo.dll"), "foo");
		assert_eq!(file_stem("obj/Interop.Foo.dll"), "Interop.Foo");
		assert_eq!(file_stem(".hidden"), ".hidden");
		assert_eq!(file_name("a/b\\c.txt"), "c.txt");
	}

	#[test]
	fn relative_only_below_base() {
		assert_eq!(relative_to("C:\\proj", "C:\\proj\\lib\\a.dll"), "lib\\a.dll");
		assert_eq!(relative_to("/proj/", "/proj/lib/a.dll"), "lib/a.dll");
		assert_eq!(relative_to("/proj", "/other/a.dll"), "/other/a.dll");
		assert_eq!(relative_to("/proj", "/projector/a.dll"), "/projector/a.dll");
	}
}
