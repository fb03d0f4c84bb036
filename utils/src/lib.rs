//! Leverage common functionality across the engine's crates.

/// Converts bytes to a hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::new();
    for byte in bytes.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Converts a hexadecimal string to bytes.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| match u8::from_str_radix(&hex[i..i + 2], 16) {
            Ok(byte) => Some(byte),
            Err(_) => None,
        })
        .collect()
}

/// Compute the maximum value of `f` (faults) that can be tolerated given `n = 3f + 1`.
pub fn max_faults(n: u32) -> Option<u32> {
    let f = n.checked_sub(1)? / 3;
    if f == 0 {
        return None;
    }
    Some(f)
}

/// Assuming that `n = 3f + 1`, compute the minimum size of `q` such that `q >= 2f + 1`.
///
/// If the value of `n` is too small to tolerate any faults, this function returns `None`.
pub fn quorum(n: u32) -> Option<u32> {
    let f = max_faults(n)?;
    Some((2 * f) + 1)
}

/// Smallest number of votes out of `n` active validators that forms a majority.
///
/// Computed as `floor(2n / 3) + 1`. Unlike [quorum], this is defined for every `n`
/// (including networks too small to tolerate a fault) so that vote counting never fails.
pub fn majority_threshold(n: u32) -> u64 {
    (2 * n as u64) / 3 + 1
}

/// Smallest number of votes out of `n` active validators that cannot be entirely Byzantine.
///
/// Computed as `floor(n / 3) + 1`.
pub fn minority_threshold(n: u32) -> u64 {
    n as u64 / 3 + 1
}

/// Returns true if `count` votes out of `n` active validators reach a majority (`>= 2f + 1`).
///
/// `n == 0` is a disabled network: any single vote is a majority.
pub fn is_majority(count: u32, n: u32) -> bool {
    count as u64 >= majority_threshold(n)
}

/// Returns true if `count` votes out of `n` active validators reach a minority (`>= f + 1`).
pub fn is_minority(count: u32, n: u32) -> bool {
    count as u64 >= minority_threshold(n)
}
