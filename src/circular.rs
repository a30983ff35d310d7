//! Coordinate arithmetic on circular molecules.

/// Canonical index in `0..length`. A zero length maps everything to 0.
#[inline(always)]
pub fn wrap(length: usize, index: isize) -> usize {
    if length == 0 {
        return 0;
    }
    index.rem_euclid(length as isize) as usize
}

/// `seq[start..end]`, joining tail and head when `end < start`. `start` is
/// wrapped; `end == len` is the exclusive end of the sequence, larger values
/// wrap.
pub fn subsequence_circular(seq: &[u8], start: usize, end: usize) -> Vec<u8> {
    let len = seq.len();
    if len == 0 {
        return vec![];
    }
    let start = start % len;
    let end = if end == len { len } else { end % len };
    if start <= end {
        seq[start..end].to_vec()
    } else {
        seq[start..].iter().chain(seq[..end].iter()).copied().collect()
    }
}

/// `length` bases starting at `start`, walking around the origin as often as
/// needed.
pub fn window_circular(seq: &[u8], start: isize, length: usize) -> Vec<u8> {
    if seq.is_empty() {
        return vec![];
    }
    let start = wrap(seq.len(), start);
    seq.iter().cycle().skip(start).take(length).copied().collect()
}

/// Left rotation: the base at `offset` becomes position 0.
pub fn rotate(seq: &[u8], offset: usize) -> Vec<u8> {
    if seq.is_empty() {
        return vec![];
    }
    let offset = offset % seq.len();
    let mut ret = Vec::with_capacity(seq.len());
    ret.extend_from_slice(&seq[offset..]);
    ret.extend_from_slice(&seq[..offset]);
    ret
}
