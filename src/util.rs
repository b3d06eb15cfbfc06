//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Sanitize a client-supplied filename for storage on the local filesystem.
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are stripped so the result can never be a hidden/relative path.
pub fn secure_filename(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let cleaned: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  let trimmed = cleaned.trim_start_matches('.').to_string();
  if trimmed.is_empty() { "upload".into() } else { trimmed }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
/// The cut point backs up to a char boundary so multi-byte text never panics.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let cut = (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "1 and 2 and 1");
  }

  #[test]
  fn secure_filename_drops_path_components_and_odd_chars() {
    assert_eq!(secure_filename("../../etc/passwd"), "passwd");
    assert_eq!(secure_filename("notes final (v2).pdf"), "notes_final__v2_.pdf");
    assert_eq!(secure_filename(".hidden"), "hidden");
    assert_eq!(secure_filename("..."), "upload");
    assert_eq!(secure_filename("C:\\docs\\notes.txt"), "notes.txt");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "résumé notes";
    let out = trunc_for_log(s, 2); // index 2 falls inside 'é'
    assert!(out.starts_with('r'));
    assert!(out.contains("bytes total"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
