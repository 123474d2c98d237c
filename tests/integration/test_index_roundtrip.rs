use std::io::{BufReader, Cursor};
use std::path::Path;

use dvg::index::{
    self, IndexState, IndexedMtimes, build_index, file_status, index_file_path, mtime_seconds,
    query_weights,
};
use dvg::paths::FileMatcher;
use dvg::{DvgError, SearchOverrides, TextScanner};

use crate::common::{Workspace, pool};

fn overrides(over_pruning: f32) -> SearchOverrides {
    SearchOverrides {
        top_k: Some(1),
        window: Some(3),
        min_length: Some(0),
        over_pruning: Some(over_pruning),
        ..Default::default()
    }
}

/// Builds the index of `docs` and returns its path.
fn build(ws: &Workspace, docs: &[&Path]) -> std::path::PathBuf {
    let (spec, model, tokenizer) = ws.open_model();
    let index_path = index_file_path(&ws.settings.index_dir, &spec.file_name(), 3);
    let summary = build_index(
        model,
        tokenizer.as_ref(),
        &TextScanner,
        docs.iter().map(|d| Ok(d.to_path_buf())),
        3,
        &index_path,
        &pool(2),
        |_| {},
    )
    .unwrap();
    assert_eq!(summary.documents, docs.len());
    assert!(!summary.cancelled);
    index_path
}

fn index_search(ws: &Workspace, index_path: &Path, files: &[&str]) -> Vec<String> {
    let (_, model, tokenizer) = ws.open_model();
    let weights = query_weights(&model, tokenizer.as_ref(), "alpha");
    let session = ws.session("alpha", overrides(0.3));
    let matcher = FileMatcher::new(files).unwrap();
    let outcome = index::search(
        &session,
        &weights,
        index_path,
        &matcher,
        &TextScanner,
        &pool(2),
        |_| {},
    )
    .unwrap();
    outcome
        .results
        .iter()
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect()
}

/// Replaces the stored mtime of every record with `mtime`.
fn rewrite_mtimes(index_path: &Path, mtime: i64) {
    let text = std::fs::read_to_string(index_path).unwrap();
    let rewritten: String = text
        .lines()
        .map(|line| {
            let mut fields: Vec<String> = line.split('\t').map(str::to_string).collect();
            fields[1] = mtime.to_string();
            fields.join("\t") + "\n"
        })
        .collect();
    std::fs::write(index_path, rewritten).unwrap();
}

#[test]
fn index_search_finds_the_indexed_paragraph() {
    let ws = Workspace::new();
    let a = ws.write("a.txt", "stone\nriver stone\nalpha\nriver\nstone\n");
    let b = ws.write("b.txt", "stone\nriver\ngamma\nriver stone\ngamma\n");
    let index_path = build(&ws, &[&a, &b]);

    assert_eq!(
        index_path.file_name().unwrap().to_string_lossy(),
        "topics.dvgm.w3.clu"
    );

    let a_key = a.to_str().unwrap();
    let b_key = b.to_str().unwrap();
    assert_eq!(index_search(&ws, &index_path, &[a_key, b_key]), vec![a_key]);
    assert!(index_search(&ws, &index_path, &[b_key]).is_empty());
}

#[test]
fn staleness_tolerates_small_clock_skew() {
    let ws = Workspace::new();
    let a = ws.write("a.txt", "river\nalpha\nstone\n");
    let index_path = build(&ws, &[&a]);
    let current = mtime_seconds(&a).unwrap();
    let key = a.to_str().unwrap();

    rewrite_mtimes(&index_path, current - 2);
    assert_eq!(index_search(&ws, &index_path, &[key]), vec![key]);

    rewrite_mtimes(&index_path, current - 5);
    assert!(index_search(&ws, &index_path, &[key]).is_empty());
}

#[test]
fn ls_reports_index_state() {
    let ws = Workspace::new();
    let fresh = ws.write("fresh.txt", "alpha\n");
    let stale = ws.write("stale.txt", "river\n");
    let never = ws.write("never.txt", "gamma\n");
    let index_path = build(&ws, &[&fresh, &stale]);

    // touch by rewriting the stored mtime of stale.txt only
    let stale_key = stale.to_str().unwrap();
    let text = std::fs::read_to_string(&index_path).unwrap();
    let text = text.replace(
        &format!("{stale_key}\t{}", mtime_seconds(&stale).unwrap()),
        &format!("{stale_key}\t1"),
    );
    std::fs::write(&index_path, text).unwrap();

    let file = std::fs::File::open(&index_path).unwrap();
    let table = IndexedMtimes::load(BufReader::new(file)).unwrap();
    assert_eq!(file_status(&table, &fresh).unwrap().state, IndexState::UpToDate);
    assert_eq!(file_status(&table, &stale).unwrap().state, IndexState::Stale);
    assert_eq!(file_status(&table, &never).unwrap().state, IndexState::NeverIndexed);
}

#[test]
fn corrupted_index_is_reported_with_line_number() {
    let text = "a.txt\t1\t0-3\t9\na.txt\tnot-a-time\t3-6\t9\n";
    let err = IndexedMtimes::load(Cursor::new(text)).unwrap_err();
    assert!(matches!(err, DvgError::IndexCorrupted { line: 2, .. }));
}

#[test]
fn missing_index_is_fatal() {
    let ws = Workspace::new();
    let session = ws.session("alpha", overrides(0.3));
    let result = index::search(
        &session,
        &[1.0, 0.0, 0.0],
        &ws.dir.path().join(".dvg/none.clu"),
        &FileMatcher::default(),
        &TextScanner,
        &pool(1),
        |_| {},
    );
    assert!(matches!(result, Err(DvgError::IndexMissing { .. })));
}
