use dvg::search::{LineRange, windows};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn windows_cover_every_line_and_end_at_the_last() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let n = rng.random_range(0..200);
        let w = rng.random_range(1..40);
        let ranges: Vec<LineRange> = windows(n, w).collect();

        let mut covered = vec![false; n];
        for r in &ranges {
            assert!(r.start <= r.end && r.end <= n, "n={n} w={w} {r}");
            assert!(r.len() <= w);
            covered[r.start..r.end].iter_mut().for_each(|c| *c = true);
        }
        assert!(covered.iter().all(|&c| c), "n={n} w={w}");

        if n > 0 {
            assert_eq!(ranges.last().map(|r| r.end), Some(n), "n={n} w={w}");
        }
    }
}

#[test]
fn consecutive_windows_overlap_by_the_same_amount() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let n = rng.random_range(1..200);
        let w = rng.random_range(2..40);
        let ranges: Vec<LineRange> = windows(n, w).collect();
        if ranges.len() < 2 {
            assert!(n <= w);
            continue;
        }
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, w - w / 2, "n={n} w={w}");
            assert!(pair[0].start < pair[1].start);
        }
    }
}

#[test]
fn single_line_windows_do_not_overlap() {
    let ranges: Vec<LineRange> = windows(4, 1).collect();
    assert_eq!(
        ranges,
        vec![
            LineRange::new(0, 1),
            LineRange::new(1, 2),
            LineRange::new(2, 3),
            LineRange::new(3, 4)
        ]
    );
    assert_eq!(windows(0, 1).count(), 0);
}
