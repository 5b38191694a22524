use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

/// Top-level directory all courses are mirrored into.
pub(crate) const VENDOR_DIR: &str = "KodeKloud";

/// Map a lesson to the stem of its output files.
///
/// Indices are 1-based sequence positions, never remote IDs, so the layout
/// survives the remote reordering or re-keying its content. The returned path
/// is the lesson's file stem: downloads add their own extension, and the
/// parent (module) directory is created on first write.
pub(crate) fn plan_path(
    output_dir: &Path,
    course_title: &str,
    module_index: usize,
    module_title: &str,
    lesson_index: usize,
    lesson_title: &str,
) -> PathBuf {
    output_dir
        .join(VENDOR_DIR)
        .join(safe_path(course_title))
        .join(format!("{module_index} - {}", safe_path(module_title)))
        .join(format!("{lesson_index} - {}", safe_path(lesson_title)))
}

/// Replace some non path-safe characters for wider file-system compatibility (e.g. with ExFAT).
/// Truncate the path segment if necessary.
///
/// Applying it to its own output changes nothing.
pub(crate) fn safe_path(s: impl AsRef<str> + Debug) -> String {
    let path = s
        .as_ref()
        .replace(": ", " - ")
        .replace(" / ", " - ")
        .replace(['/', '\\'], " - ")
        .replace(['*', '|'], "-")
        .replace(['?', '"', ':', '<', '>'], "")
        .replace(char::is_control, " ");

    let path = path.split_whitespace().collect::<Vec<_>>().join(" ");

    if path.is_empty() {
        return "_".to_owned();
    }

    // Ellipsis if more than 200 bytes, cut at a char boundary. Keeps multi-byte
    // titles below the usual 255 byte file name limit.
    if path.len() <= 200 {
        return path;
    }
    let end = (0..=197)
        .rev()
        .find(|&idx| path.is_char_boundary(idx))
        .unwrap_or(0);
    format!("{}...", &path[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_positions_and_titles() {
        let path = plan_path(
            Path::new("/tmp/out"),
            "Docker: The Basics",
            2,
            "Images / Containers",
            10,
            "What is a *container*?",
        );

        assert_eq!(
            path,
            Path::new("/tmp/out/KodeKloud/Docker - The Basics/2 - Images - Containers/10 - What is a -container-")
        );
    }

    #[test]
    fn planning_is_deterministic() {
        let plan = || plan_path(Path::new("out"), "Course", 1, "Module", 1, "Lesson");
        assert_eq!(plan(), plan());
    }

    #[test]
    fn illegal_characters_are_removed() {
        let name = safe_path("a<b>c\"d|e?f\\g\th\n");
        assert!(!name.contains(['<', '>', '"', '|', '?', '\\', '\t', '\n', '/', ':']));
        assert_eq!(name, "abcd-ef - g h");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(safe_path("  Intro    to\u{a0} K8s  "), "Intro to K8s");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let long = "x".repeat(150) + " / " + &"y: ".repeat(40);
        for name in [
            "Docker: The Basics",
            "a/b",
            " / ",
            "",
            "What is a *container*?",
            long.as_str(),
        ] {
            let once = safe_path(name);
            assert_eq!(safe_path(&once), once, "{name:?}");
        }
    }

    #[test]
    fn long_names_are_truncated() {
        let name = safe_path("z".repeat(300));
        assert_eq!(name.len(), 200);
        assert!(name.ends_with("..."));
    }

    #[test]
    fn multi_byte_names_are_truncated_by_bytes() {
        let name = safe_path("漢".repeat(100));
        assert!(name.len() <= 200, "{} bytes", name.len());
        assert_eq!(name, "漢".repeat(65) + "...");
        assert_eq!(safe_path(&name), name);

        let mixed = safe_path("a".to_owned() + &"ü".repeat(150));
        assert!(mixed.len() <= 200);
        assert!(mixed.ends_with("..."));
        assert_eq!(safe_path(&mixed), mixed);
    }

    #[test]
    fn empty_names_get_a_placeholder() {
        assert_eq!(safe_path("???"), "_");
    }
}
