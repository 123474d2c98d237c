use dvg::SearchOverrides;
use dvg::TextScanner;
use dvg::paths::expand_inputs;
use dvg::search::direct;

use crate::common::{Workspace, pool};

fn overrides(top_k: usize, window: usize) -> SearchOverrides {
    SearchOverrides {
        top_k: Some(top_k),
        window: Some(window),
        min_length: Some(0),
        ..Default::default()
    }
}

#[test]
fn query_term_in_one_document_finds_only_that_document() {
    let ws = Workspace::new();
    let a = ws.write("a.txt", "stone\nriver stone\nalpha\nriver\nstone\n");
    let b = ws.write("b.txt", "stone\nriver\ngamma\nriver stone\nbeta gamma\n");

    let session = ws.session("alpha", overrides(1, 3));
    let outcome = direct::search(
        &session,
        &TextScanner,
        vec![Ok(a.clone()), Ok(b)].into_iter(),
        &pool(2),
        |_| {},
    )
    .unwrap();

    assert_eq!(outcome.documents, 2);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.results.len(), 1);
    let best = &outcome.results[0];
    assert_eq!(&*best.path, a.as_path());
    assert!(best.range.start <= 2 && 2 < best.range.end);
    assert!(best.paragraph().iter().any(|l| l == "alpha"));
}

#[test]
fn paragraph_search_reports_non_overlapping_paragraphs() {
    let ws = Workspace::new();
    let doc = ws.write(
        "long.txt",
        "alpha\ngamma\ngamma\ngamma\ngamma\ngamma\nalpha beta\ngamma\n",
    );

    let mut options = overrides(5, 2);
    options.paragraph_search = true;
    let session = ws.session("alpha", options);
    let outcome = direct::search(
        &session,
        &TextScanner,
        vec![Ok(doc)].into_iter(),
        &pool(1),
        |_| {},
    )
    .unwrap();

    assert!(outcome.results.len() >= 2);
    for pair in outcome.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for (i, r) in outcome.results.iter().enumerate() {
        for other in &outcome.results[i + 1..] {
            assert!(!r.range.overlaps(&other.range));
        }
    }
}

#[test]
fn filters_and_unreadable_documents() {
    let ws = Workspace::new();
    let plain = ws.write("docs/plain.txt", "alpha\n");
    let tagged = ws.write("docs/tagged.txt", "alpha TODO\n");
    let binary = ws.dir.path().join("docs/blob.bin");
    std::fs::write(&binary, [0u8, 159, 146, 150]).unwrap();

    let mut options = overrides(5, 1);
    options.excludes = vec!["TODO".to_string()];
    let session = ws.session("alpha", options);
    let outcome = direct::search(
        &session,
        &TextScanner,
        vec![Ok(plain.clone()), Ok(tagged), Ok(binary), Ok(ws.dir.path().join("docs"))]
            .into_iter(),
        &pool(2),
        |_| {},
    )
    .unwrap();

    assert_eq!(outcome.documents, 4);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(&*outcome.results[0].path, plain.as_path());
}

#[test]
fn pattern_arguments_expand_to_regular_files() {
    let ws = Workspace::new();
    ws.write("corpus/a.txt", "alpha\n");
    ws.write("corpus/sub/b.txt", "alpha beta\n");
    ws.write("corpus/sub/c.md", "alpha\n");
    ws.write("corpus/.hidden/d.txt", "alpha\n");

    let pattern = format!("{}/corpus/**/*.txt", ws.dir.path().display());
    let mut found: Vec<String> = expand_inputs(vec![pattern])
        .map(|p| p.unwrap().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    found.sort();
    assert_eq!(found, vec!["a.txt", "b.txt"]);
}
