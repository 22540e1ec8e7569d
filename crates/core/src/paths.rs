//! Output path resolution for rendered pages.
//!
//! Three naming conventions are supported:
//! - numbered: `out.png` for a single page, `out_page1.png`, `out_page2.png`, ... otherwise
//! - named: `{dir}/{name}{ext}` using the output path's extension
//! - named with subdirectory: `{dir}/{page path}/{name}.png`

use crate::config::{ConversionRequest, PageTask};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Characters that may not appear in a file name on any supported platform.
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace every reserved character (and ASCII control character) with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Resolve the output file for one page.
pub fn resolve(
    output_path: &Path,
    page_index: usize,
    page_count: usize,
    page_name: Option<&str>,
    page_path: Option<&str>,
) -> PathBuf {
    let dir = output_path.parent().unwrap_or_else(|| Path::new(""));

    match (page_name, page_path) {
        (Some(name), Some(sub)) => dir
            .join(sub)
            .join(format!("{}.png", sanitize_file_name(name))),
        (Some(name), None) => dir.join(format!(
            "{}{}",
            sanitize_file_name(name),
            dotted_extension(output_path)
        )),
        (None, _) if page_count == 1 => output_path.to_path_buf(),
        (None, _) => {
            let stem = output_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            dir.join(format!(
                "{}_page{}{}",
                stem,
                page_index + 1,
                dotted_extension(output_path)
            ))
        }
    }
}

/// Build one task per page. Arrays must already be validated against `page_count`.
pub fn plan_tasks(request: &ConversionRequest, page_count: usize) -> Vec<PageTask> {
    let names = request.page_names.as_deref();
    // Subdirectories only apply together with names.
    let subdirs = names.and(request.page_paths.as_deref());

    (0..page_count)
        .map(|index| PageTask {
            index,
            output_path: resolve(
                &request.output_path,
                index,
                page_count,
                names.and_then(|n| n.get(index)).map(String::as_str),
                subdirs.and_then(|p| p.get(index)).map(String::as_str),
            ),
        })
        .collect()
}

/// Distinct parent directories of all task outputs, shallowest first.
pub fn output_directories(tasks: &[PageTask]) -> BTreeSet<PathBuf> {
    tasks
        .iter()
        .filter_map(|t| t.output_path.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect()
}

/// Output paths claimed by more than one page, with the page indices claiming them.
pub fn find_collisions(tasks: &[PageTask]) -> Vec<(PathBuf, Vec<usize>)> {
    let mut by_path: BTreeMap<&Path, Vec<usize>> = BTreeMap::new();
    for task in tasks {
        by_path
            .entry(task.output_path.as_path())
            .or_default()
            .push(task.index);
    }
    by_path
        .into_iter()
        .filter(|(_, pages)| pages.len() > 1)
        .map(|(path, pages)| (path.to_path_buf(), pages))
        .collect()
}

fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_keeps_output_path() {
        let out = Path::new("/data/out/report.png");
        assert_eq!(resolve(out, 0, 1, None, None), PathBuf::from("/data/out/report.png"));
    }

    #[test]
    fn test_multi_page_numbering() {
        let out = Path::new("/data/out/report.png");
        let paths: Vec<_> = (0..3).map(|i| resolve(out, i, 3, None, None)).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/data/out/report_page1.png"),
                PathBuf::from("/data/out/report_page2.png"),
                PathBuf::from("/data/out/report_page3.png"),
            ]
        );
    }

    #[test]
    fn test_multi_page_without_extension() {
        let out = Path::new("out/scan");
        assert_eq!(resolve(out, 1, 2, None, None), PathBuf::from("out/scan_page2"));
    }

    #[test]
    fn test_relative_output_without_directory() {
        let out = Path::new("scan.png");
        assert_eq!(resolve(out, 0, 2, None, None), PathBuf::from("scan_page1.png"));
    }

    #[test]
    fn test_named_uses_output_extension() {
        let out = Path::new("/data/out/ignored.jpeg");
        assert_eq!(
            resolve(out, 0, 2, Some("Apple"), None),
            PathBuf::from("/data/out/Apple.jpeg")
        );
    }

    #[test]
    fn test_named_single_page_still_uses_name() {
        let out = Path::new("/data/out/ignored.png");
        assert_eq!(
            resolve(out, 0, 1, Some("Cover"), None),
            PathBuf::from("/data/out/Cover.png")
        );
    }

    #[test]
    fn test_named_with_subdirectory_forces_png() {
        let out = Path::new("/data/out/ignored.jpeg");
        assert_eq!(
            resolve(out, 1, 2, Some("Banana"), Some("beta")),
            PathBuf::from("/data/out/beta/Banana.png")
        );
    }

    #[test]
    fn test_named_sanitizes() {
        let out = Path::new("/data/out/x.png");
        assert_eq!(
            resolve(out, 0, 1, Some("a/b:c"), None),
            PathBuf::from("/data/out/a_b_c.png")
        );
    }

    #[test]
    fn test_sanitize_maps_every_reserved_char() {
        for &c in RESERVED_CHARS {
            assert_eq!(sanitize_file_name(&format!("x{}y", c)), "x_y");
        }
        assert_eq!(sanitize_file_name("tab\there\n"), "tab_here_");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "plain",
            "a<b>c",
            "quote\"pipe|star*",
            "dir/sub\\file?.png",
            "ünïcödé: ok",
            "",
        ];
        for input in inputs {
            let once = sanitize_file_name(input);
            assert_eq!(sanitize_file_name(&once), once);
        }
    }

    #[test]
    fn test_sanitize_leaves_safe_names_alone() {
        assert_eq!(sanitize_file_name("Invoice 2024-01 (copy)"), "Invoice 2024-01 (copy)");
    }

    #[test]
    fn test_plan_tasks_numbered() {
        let request = ConversionRequest::new("in.pdf", "out/doc.png");
        let tasks = plan_tasks(&request, 2);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].index, 0);
        assert_eq!(tasks[1].output_path, PathBuf::from("out/doc_page2.png"));
    }

    #[test]
    fn test_plan_tasks_named_with_paths() {
        let request = ConversionRequest::new("in.pdf", "out/doc.png")
            .with_page_names(["Apple", "Banana"])
            .with_page_paths(["alpha", "beta"]);
        let tasks = plan_tasks(&request, 2);
        assert_eq!(tasks[0].output_path, PathBuf::from("out/alpha/Apple.png"));
        assert_eq!(tasks[1].output_path, PathBuf::from("out/beta/Banana.png"));
    }

    #[test]
    fn test_output_directories_dedup() {
        let request = ConversionRequest::new("in.pdf", "out/doc.png")
            .with_page_names(["a", "b", "c"])
            .with_page_paths(["x", "x", "y/z"]);
        let dirs: Vec<_> = output_directories(&plan_tasks(&request, 3)).into_iter().collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from("out/x"), PathBuf::from("out/y/z")]
        );
    }

    #[test]
    fn test_output_directories_skips_bare_file_names() {
        let request = ConversionRequest::new("in.pdf", "doc.png");
        assert!(output_directories(&plan_tasks(&request, 2)).is_empty());
    }

    #[test]
    fn test_find_collisions() {
        let request = ConversionRequest::new("in.pdf", "out/doc.png")
            .with_page_names(["same", "other", "same"]);
        let collisions = find_collisions(&plan_tasks(&request, 3));
        assert_eq!(collisions, vec![(PathBuf::from("out/same.png"), vec![0, 2])]);

        let request = ConversionRequest::new("in.pdf", "out/doc.png");
        assert!(find_collisions(&plan_tasks(&request, 5)).is_empty());
    }
}
