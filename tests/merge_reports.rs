use std::fs;
use std::path::Path;

use tempfile::tempdir;

use tabreport::config::{Language, ReportConfig};
use tabreport::merge::merge_reports;

fn write_pages(root: &Path, portfolio: &str, client: &str, pages: &[(u8, &[u8])]) {
    let dir = root.join("EN").join(portfolio).join(client);
    fs::create_dir_all(&dir).unwrap();
    for (number, content) in pages {
        fs::write(dir.join(format!("PAGE_{number}.pdf")), content).unwrap();
    }
}

#[test]
fn concatenates_pages_in_numeric_order() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    write_pages(
        out.path(),
        "JUS",
        "Acme",
        &[(2, b"two "), (1, b"one "), (3, b"three")],
    );

    let report = merge_reports(&config, out.path(), Language::En);
    assert_eq!(report.succeeded, vec!["EN/JUS/Acme".to_string()]);
    assert!(report.failed.is_empty());

    let merged = fs::read(out.path().join("merged/EN/JUS/Acme.pdf")).unwrap();
    assert_eq!(merged, b"one two three");
}

#[test]
fn ten_or_more_pages_keep_numeric_order() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let pages: Vec<(u8, Vec<u8>)> = (1..=10)
        .map(|n| (n, format!("<{n}>").into_bytes()))
        .collect();
    let refs: Vec<(u8, &[u8])> = pages.iter().map(|(n, c)| (*n, c.as_slice())).collect();
    write_pages(out.path(), "JUS", "Acme", &refs);

    merge_reports(&config, out.path(), Language::En);

    let merged = fs::read(out.path().join("merged/EN/JUS/Acme.pdf")).unwrap();
    // PAGE_10 must come after PAGE_9, not after PAGE_1.
    assert_eq!(merged, b"<1><2><3><4><5><6><7><8><9><10>");
}

#[test]
fn client_folder_without_pages_is_skipped_without_output() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    let empty = out.path().join("EN/JUS/Empty");
    fs::create_dir_all(&empty).unwrap();
    // A non-page file must not count either.
    fs::write(empty.join("notes.txt"), b"not a page").unwrap();

    let report = merge_reports(&config, out.path(), Language::En);
    assert!(report.succeeded.is_empty());
    assert!(report.failed.is_empty());
    assert!(!out.path().join("merged/EN/JUS/Empty.pdf").exists());
}

#[test]
fn stray_files_in_the_portfolio_directory_are_ignored() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    write_pages(out.path(), "JUS", "Acme", &[(1, b"page")]);
    fs::write(out.path().join("EN/JUS/readme.txt"), b"stray").unwrap();

    let report = merge_reports(&config, out.path(), Language::En);
    assert_eq!(report.succeeded, vec!["EN/JUS/Acme".to_string()]);
}

#[test]
fn one_failing_client_does_not_stop_the_rest() {
    let out = tempdir().unwrap();
    let config = ReportConfig::builtin();
    // An empty page file is treated as malformed and fails that client only.
    write_pages(out.path(), "JUS", "Broken", &[(1, b"")]);
    write_pages(out.path(), "JUS", "Fine", &[(1, b"page one")]);

    let report = merge_reports(&config, out.path(), Language::En);
    assert_eq!(report.succeeded, vec!["EN/JUS/Fine".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item, "EN/JUS/Broken");

    assert!(out.path().join("merged/EN/JUS/Fine.pdf").exists());
    assert!(!out.path().join("merged/EN/JUS/Broken.pdf").exists());
}

#[test]
fn merging_the_same_page_set_twice_is_idempotent() {
    let config = ReportConfig::builtin();
    let pages: &[(u8, &[u8])] = &[(1, b"alpha "), (2, b"beta")];

    let first = tempdir().unwrap();
    write_pages(first.path(), "JUS", "Acme", pages);
    merge_reports(&config, first.path(), Language::En);

    let second = tempdir().unwrap();
    write_pages(second.path(), "JUS", "Acme", pages);
    merge_reports(&config, second.path(), Language::En);

    let a = fs::read(first.path().join("merged/EN/JUS/Acme.pdf")).unwrap();
    let b = fs::read(second.path().join("merged/EN/JUS/Acme.pdf")).unwrap();
    assert_eq!(a, b);
}
