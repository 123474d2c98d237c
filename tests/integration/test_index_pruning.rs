use std::collections::BTreeSet;
use std::io::BufReader;
use std::path::PathBuf;

use dvg::TextScanner;
use dvg::index::{IndexScanner, build_index, index_file_path, query_weights};
use dvg::paths::FileMatcher;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::common::{Workspace, pool, vocabulary};

/// Candidate paragraphs `(path, start)` surviving the index at `ratio`.
fn candidates(
    index_path: &std::path::Path,
    matcher: &FileMatcher,
    weights: &[f32],
    ratio: f32,
) -> BTreeSet<(String, usize)> {
    let file = std::fs::File::open(index_path).unwrap();
    IndexScanner::new(BufReader::new(file), matcher, weights, ratio)
        .map(Result::unwrap)
        .flat_map(|g| {
            let path = g.path;
            g.ranges.into_iter().map(move |r| (path.clone(), r.start))
        })
        .collect()
}

#[test]
fn raising_the_ratio_only_removes_candidates() {
    let ws = Workspace::new();
    let words = vocabulary();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let docs: Vec<PathBuf> = (0..12)
        .map(|i| {
            let lines: Vec<String> = (0..rng.random_range(1..10))
                .map(|_| {
                    (0..rng.random_range(0..4))
                        .map(|_| *words.choose(&mut rng).unwrap())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            ws.write(&format!("doc{i}.txt"), &lines.join("\n"))
        })
        .collect();

    let (spec, model, tokenizer) = ws.open_model();
    let weights = query_weights(&model, tokenizer.as_ref(), "alpha river");
    let index_path = index_file_path(&ws.settings.index_dir, &spec.file_name(), 2);
    build_index(
        model,
        tokenizer.as_ref(),
        &TextScanner,
        docs.iter().map(|d| Ok(d.clone())),
        2,
        &index_path,
        &pool(3),
        |_| {},
    )
    .unwrap();

    let keys: Vec<&str> = docs.iter().map(|d| d.to_str().unwrap()).collect();
    let matcher = FileMatcher::new(&keys).unwrap();

    let ratios = [0.0, 0.05, 0.1, 0.2, 0.4, 0.6, 0.9, 1.5];
    let sets: Vec<_> = ratios
        .iter()
        .map(|&r| candidates(&index_path, &matcher, &weights, r))
        .collect();

    assert!(!sets[0].is_empty());
    for pair in sets.windows(2) {
        assert!(pair[1].is_subset(&pair[0]));
    }
    // no decoded weight exceeds 0.99 and query weights sum to one
    assert!(sets.last().unwrap().is_empty());
}
