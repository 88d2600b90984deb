// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Plain-text console output for `list` and `integrity`.

use crate::model::FileModel;
use crate::storage::engine::IntegrityReport;

/// Width of the file size column.
const SIZE_COL: usize = 10;

/// Table of stored files: size, name, chunk count (nominal chunk size).
pub fn render_listing(files: &[FileModel]) -> String {
    if files.is_empty() {
        return "No files found.\n".to_string();
    }

    let name_col = files
        .iter()
        .map(|f| f.filename.chars().count())
        .max()
        .unwrap_or(0)
        .max("File Name".len());

    let mut out = String::new();
    out.push_str(&format!("{:<SIZE_COL$} {:<name_col$} {}\n", "File Size", "File Name", "Num Chunks"));
    out.push_str(&format!("{} {} {}\n", "-".repeat(SIZE_COL), "-".repeat(name_col), "-".repeat(10)));
    for f in files {
        out.push_str(&format!(
            "{:>SIZE_COL$} {:<name_col$} {} ({})\n",
            f.filesize,
            f.filename,
            f.chunk_count(),
            f.chunk_size
        ));
    }
    out
}

/// One line per file, then orphan and duplicate summaries.
pub fn render_integrity(report: &IntegrityReport) -> String {
    let mut out = String::new();
    for f in &report.files {
        if f.passed {
            out.push_str(&format!("PASS {} ({} chunks, {} bytes)\n", f.filename, f.chunk_count, f.expected_size));
        } else {
            out.push_str(&format!(
                "FAIL {}: missing={} mismatched={} size={}/{}\n",
                f.filename, f.missing, f.mismatched, f.actual_size, f.expected_size
            ));
        }
    }

    if !report.orphan_chunks.is_empty() {
        out.push_str(&format!("Orphan chunks: {}\n", report.orphan_chunks.len()));
        for id in &report.orphan_chunks {
            out.push_str(&format!("  {id}\n"));
        }
    }
    if !report.duplicate_names.is_empty() {
        out.push_str(&format!("Duplicate names: {}\n", report.duplicate_names.join(", ")));
    }

    let failed = report.failed_files().count();
    out.push_str(&format!(
        "{} files checked, {} failed, {} orphan chunks\n",
        report.files.len(),
        failed,
        report.orphan_chunks.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::engine::FileIntegrity;

    #[test]
    fn test_listing_empty() {
        assert_eq!(render_listing(&[]), "No files found.\n");
    }

    #[test]
    fn test_listing_columns() {
        let files = vec![
            FileModel::new("a", 5000, 2048, vec!["1".into(), "2".into(), "3".into()]),
            FileModel::new("longer-name.bin", 7, 4096, vec!["4".into()]),
        ];
        let out = render_listing(&files);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "File Size  File Name       Num Chunks");
        assert_eq!(lines[2], "      5000 a               3 (2048)");
        assert_eq!(lines[3], "         7 longer-name.bin 1 (4096)");
    }

    #[test]
    fn test_integrity_render() {
        let report = IntegrityReport {
            files: vec![
                FileIntegrity {
                    file_id: "1".into(),
                    filename: "ok".into(),
                    chunk_count: 2,
                    missing: 0,
                    mismatched: 0,
                    expected_size: 10,
                    actual_size: 10,
                    passed: true,
                },
                FileIntegrity {
                    file_id: "2".into(),
                    filename: "broken".into(),
                    chunk_count: 3,
                    missing: 1,
                    mismatched: 0,
                    expected_size: 30,
                    actual_size: 20,
                    passed: false,
                },
            ],
            orphan_chunks: vec!["c9".into()],
            duplicate_names: vec![],
        };
        let out = render_integrity(&report);
        assert!(out.contains("PASS ok (2 chunks, 10 bytes)"));
        assert!(out.contains("FAIL broken: missing=1 mismatched=0 size=20/30"));
        assert!(out.contains("Orphan chunks: 1\n  c9\n"));
        assert!(out.ends_with("2 files checked, 1 failed, 1 orphan chunks\n"));
    }
}
