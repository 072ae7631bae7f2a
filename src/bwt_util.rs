
/// This function computes the BWT of `text` the naive way, by sorting every
/// rotation and reading off the last column. Quadratic-ish, so this is really
/// only useful for small datasets and verifying correctness.
/// # Arguments
/// * `text` - the full byte text, separators included
/// # Examples
/// ```rust
/// use orlbwt::bwt_util::naive_bwt_bytes;
/// let bwt = naive_bwt_bytes(b"BANANA\x01");
/// assert_eq!(bwt, b"ANNB\x01AA".to_vec());
/// ```
pub fn naive_bwt_bytes(text: &[u8]) -> Vec<u8> {
    let n = text.len();
    let mut rotations: Vec<usize> = (0..n).collect();
    rotations.sort_by(|&a, &b| {
        for k in 0..n {
            let ca = text[(a + k) % n];
            let cb = text[(b + k) % n];
            if ca != cb {
                return ca.cmp(&cb);
            }
        }
        std::cmp::Ordering::Equal
    });
    rotations.iter().map(|&r| text[(r + n - 1) % n]).collect()
}

/// Naive multi-string BWT: each sequence is terminated with the byte 1 and
/// the rotations of the whole concatenation are sorted.
/// # Examples
/// ```rust
/// use orlbwt::bwt_util::naive_bwt;
/// let bwt = naive_bwt(&["AC", "AC"]);
/// assert_eq!(bwt.len(), 6);
/// ```
pub fn naive_bwt(inputs: &[&str]) -> Vec<u8> {
    let mut text: Vec<u8> = vec![];
    for s in inputs.iter() {
        text.extend_from_slice(s.as_bytes());
        text.push(1);
    }
    naive_bwt_bytes(&text)
}
