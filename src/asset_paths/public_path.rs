use std::path::{Component, Path};

/// Split a reference into its path and any query or fragment suffix.
///
/// `fonts/icons.eot?#iefix` becomes `("fonts/icons.eot", "?#iefix")`; the suffix is
/// carried over verbatim to the rewritten reference.
pub fn split_reference_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(index) => reference.split_at(index),
        None => (reference, ""),
    }
}

/// Produce the root-absolute public path a stylesheet reference points to.
///
/// `/`-prefixed references are taken relative to the public root, everything else
/// relative to the directory of the stylesheet. The generated path always uses forward
/// slashes regardless of the native separator. Returns `None` when the reference climbs
/// above the root or the stylesheet lives outside it.
pub fn resolve_public_path(root: &Path, source_dir: &Path, reference: &str) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    let reference = reference.replace('\\', "/");

    if !reference.starts_with('/') {
        let relative_dir = source_dir.strip_prefix(root).ok()?;
        for component in relative_dir.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
    }

    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other.to_string()),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_and_fragment_suffixes() {
        assert_eq!(
            split_reference_suffix("fonts/icons.eot?#iefix"),
            ("fonts/icons.eot", "?#iefix")
        );
        assert_eq!(
            split_reference_suffix("sprite.svg#logo"),
            ("sprite.svg", "#logo")
        );
        assert_eq!(split_reference_suffix("one.png"), ("one.png", ""));
    }

    #[test]
    fn resolves_relative_to_stylesheet_directory() {
        let root = Path::new("public");
        let source_dir = root.join("stylesheets").join("admin");
        assert_eq!(
            resolve_public_path(root, &source_dir, "../../images/logo.png").as_deref(),
            Some("/images/logo.png")
        );
        assert_eq!(
            resolve_public_path(root, &source_dir, "./icons/a.png").as_deref(),
            Some("/stylesheets/admin/icons/a.png")
        );
    }

    #[test]
    fn resolves_rooted_references_against_root() {
        let root = Path::new("public");
        let source_dir = root.join("stylesheets");
        assert_eq!(
            resolve_public_path(root, &source_dir, "/images/one.png").as_deref(),
            Some("/images/one.png")
        );
    }

    #[test]
    fn normalises_backslashes_from_windows_inputs() {
        let root = Path::new("public");
        let result = resolve_public_path(root, &root.join("stylesheets"), "..\\images\\two.png");
        assert_eq!(result.as_deref(), Some("/images/two.png"));
    }

    #[test]
    fn rejects_references_escaping_the_root() {
        let root = Path::new("public");
        assert_eq!(
            resolve_public_path(root, &root.join("stylesheets"), "../../secret.png"),
            None
        );
        assert_eq!(resolve_public_path(root, Path::new("elsewhere"), "a.png"), None);
    }
}
