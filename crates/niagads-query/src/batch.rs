// SPDX-License-Identifier: Apache-2.0

/// Splits track ids into consecutive batches of at most `limit`, preserving order.
#[must_use]
pub fn chunk_tracks(tracks: &[String], limit: usize) -> Vec<Vec<String>> {
    tracks
        .chunks(limit.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_preserve_order_and_bound_size() {
        let tracks: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        let chunks = chunk_tracks(&tracks, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], vec!["t6".to_string()]);
        assert_eq!(chunks.concat(), tracks);
        assert!(chunk_tracks(&[], 3).is_empty());
    }
}
