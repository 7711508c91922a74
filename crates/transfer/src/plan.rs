use crate::TransferError;
use crate::types::Chunk;

/// Number of chunks a payload of `size` bytes splits into.
///
/// Returns 0 for an empty payload; `chunk_size` must be non-zero.
pub fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    size.div_ceil(chunk_size)
}

/// Splits `size` bytes into ordered, contiguous ranges of `chunk_size`.
///
/// The last range may be shorter. An empty payload yields no chunks.
pub fn plan_chunks(size: u64, chunk_size: u64) -> Result<Vec<Chunk>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::Planning("chunk size must be > 0".into()));
    }

    let count = chunk_count(size, chunk_size);
    let chunks = (0..count)
        .map(|index| {
            let offset = index * chunk_size;
            let len = chunk_size.min(size - offset);
            Chunk::new(index, offset, len)
        })
        .collect();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn assert_covers(chunks: &[Chunk], size: u64) {
        let mut expected_offset = 0;
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as u64);
            assert_eq!(c.offset, expected_offset, "gap or overlap at chunk {i}");
            assert!(c.len > 0);
            expected_offset = c.end();
        }
        assert_eq!(expected_offset, size);
        assert_eq!(chunks.iter().map(|c| c.len).sum::<u64>(), size);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = plan_chunks(10, 0).unwrap_err();
        assert!(matches!(err, TransferError::Planning(_)));
    }

    #[test]
    fn empty_payload_has_no_chunks() {
        assert!(plan_chunks(0, 4).unwrap().is_empty());
        assert_eq!(chunk_count(0, 4), 0);
    }

    #[test]
    fn exact_multiple() {
        let chunks = plan_chunks(12, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len == 4));
        assert_covers(&chunks, 12);
    }

    #[test]
    fn short_last_chunk() {
        let chunks = plan_chunks(10, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].offset, 8);
        assert_eq!(chunks[2].len, 2);
        assert_covers(&chunks, 10);
    }

    #[test]
    fn chunk_larger_than_payload() {
        let chunks = plan_chunks(3, 100).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len, 3);
    }

    #[test]
    fn twenty_five_mib_in_two_mib_chunks() {
        let chunks = plan_chunks(25 * MIB, 2 * MIB).unwrap();
        assert_eq!(chunks.len(), 13);
        assert!(chunks[..12].iter().all(|c| c.len == 2 * MIB));
        assert_eq!(chunks[12].len, MIB);
        assert_covers(&chunks, 25 * MIB);
    }

    #[test]
    fn count_is_ceiling_for_many_sizes() {
        for size in 0..200u64 {
            for chunk_size in 1..17u64 {
                let chunks = plan_chunks(size, chunk_size).unwrap();
                assert_eq!(chunks.len() as u64, size.div_ceil(chunk_size));
                assert_covers(&chunks, size);
            }
        }
    }
}
