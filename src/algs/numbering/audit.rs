//! Local hash-uniqueness audit, run in debug mode before numbering.

use hashbrown::{HashMap, HashSet};

use crate::mesh_error::MeshNumberingError;

/// Fail on the first local index whose hash was already seen.
///
/// Read-only; O(n) expected.
pub fn audit_hashes(hashes: &[u64]) -> Result<(), MeshNumberingError> {
    let mut seen = HashSet::with_capacity(hashes.len());
    for (index, &hash) in hashes.iter().enumerate() {
        if !seen.insert(hash) {
            return Err(MeshNumberingError::DuplicateEntity { index, hash });
        }
    }
    Ok(())
}

/// Every `(duplicate, first)` pair of local indices sharing a hash.
pub fn duplicate_pairs(hashes: &[u64]) -> Vec<(usize, usize)> {
    let mut first: HashMap<u64, usize> = HashMap::with_capacity(hashes.len());
    let mut out = Vec::new();
    for (index, &hash) in hashes.iter().enumerate() {
        match first.get(&hash) {
            Some(&earlier) => out.push((index, earlier)),
            None => {
                first.insert(hash, index);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::numbering::hash::hash_coordinates;

    #[test]
    fn unique_hashes_pass() {
        assert!(audit_hashes(&[3, 1, 4, 5, 9]).is_ok());
        assert!(audit_hashes(&[]).is_ok());
    }

    #[test]
    fn coincident_points_are_reported() {
        let hashes: Vec<u64> = [[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]
            .iter()
            .map(|p| hash_coordinates(p))
            .collect();
        match audit_hashes(&hashes) {
            Err(MeshNumberingError::DuplicateEntity { index, hash }) => {
                assert_eq!(index, 2);
                assert_eq!(hash, hashes[0]);
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(duplicate_pairs(&hashes), vec![(2, 0)]);
    }

    #[test]
    fn all_pairs_point_at_first_occurrence() {
        assert_eq!(duplicate_pairs(&[7, 7, 8, 7, 8]), vec![(1, 0), (3, 0), (4, 2)]);
    }
}
