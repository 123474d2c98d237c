//! Excerpts of matching paragraphs.

/// Separator placed between the joined lines of an excerpt.
pub const EXCERPT_SEPARATOR: &str = "|";

/// Picks the most query-similar run of lines that fills `budget` characters.
///
/// Every non-empty line starts a candidate run that grows until it holds at
/// least `budget` characters or reaches the last line. The best run is joined
/// with `|` and cut to `budget` characters. Lengths are counted in characters,
/// not bytes.
pub fn excerpt<F>(lines: &[String], budget: usize, similarity: F) -> String
where
    F: Fn(&[String]) -> f32,
{
    match lines {
        [] => String::new(),
        [only] => truncate_chars(only, budget),
        _ => {
            let lens: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
            let mut best: Option<(f32, usize, usize)> = None;

            for p in 0..lines.len() {
                if lens[p] == 0 {
                    continue;
                }
                let mut chars = lens[p];
                let mut q = p + 1;
                while q < lines.len() && chars < budget {
                    chars += lens[q];
                    q += 1;
                }
                let sim = similarity(&lines[p..q]);
                if best.is_none_or(|(s, _, _)| sim > s) {
                    best = Some((sim, p, q));
                }
                if q == lines.len() {
                    break;
                }
            }

            best.map_or_else(String::new, |(_, b, e)| {
                truncate_chars(&lines[b..e].join(EXCERPT_SEPARATOR), budget)
            })
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((at, _)) => text[..at].to_string(),
        None => text.to_string(),
    }
}
