//! Gestalt pattern-matching similarity.
//!
//! `ratio(a, b) = 2·M / (|a| + |b|)` where `M` is the number of characters
//! covered by the longest common block of `a` and `b` plus, recursively, the
//! matching blocks to its left and right. Ties between equally long blocks go
//! to the one that starts earliest in `a`, then earliest in `b`.

/// Similarity of two strings in `[0, 1]`, compared by Unicode scalar value.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_characters(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// Total size of all matching blocks.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j] = length of the common run ending at a[i - 1], b[j - 1]
    let mut run = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        let mut next = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let k = run[j - blo] + 1;
            next[j - blo + 1] = k;
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        run = next;
    }

    (best_i, best_j, best_size)
}
