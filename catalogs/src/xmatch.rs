//! Catalog cross-matching
//!
//! Joins are keyed either on the KIC identifier or on the 2MASS/APOGEE
//! designation. Results preserve left-side row order; when the right side
//! contains duplicate keys the first occurrence wins.

use std::collections::HashMap;

/// Inner join on an integer identifier. Returns matched pairs in left order.
pub fn join_by_kic<'a, L, R, FL, FR>(
    left: &'a [L],
    right: &'a [R],
    left_key: FL,
    right_key: FR,
) -> Vec<(&'a L, &'a R)>
where
    FL: Fn(&L) -> u64,
    FR: Fn(&R) -> u64,
{
    let mut index: HashMap<u64, &R> = HashMap::with_capacity(right.len());
    for row in right.iter().rev() {
        // Reverse insertion so the first occurrence of a duplicate key wins.
        index.insert(right_key(row), row);
    }
    left.iter()
        .filter_map(|l| index.get(&left_key(l)).map(|r| (l, *r)))
        .collect()
}

/// Left join on a string designation. Unmatched left rows pair with `None`.
pub fn join_by_designation<'a, L, R, FL, FR>(
    left: &'a [L],
    right: &'a [R],
    left_key: FL,
    right_key: FR,
) -> Vec<(&'a L, Option<&'a R>)>
where
    FL: Fn(&L) -> Option<&str>,
    FR: Fn(&R) -> &str,
{
    let mut index: HashMap<&str, &R> = HashMap::with_capacity(right.len());
    for row in right.iter().rev() {
        index.insert(right_key(row), row);
    }
    left.iter()
        .map(|l| {
            let matched = left_key(l).and_then(|key| index.get(key).copied());
            (l, matched)
        })
        .collect()
}

/// Rows of `left` whose key does not appear in `exclude`.
pub fn filter_out_ids<'a, L, F>(left: &'a [L], exclude: &[u64], key: F) -> Vec<&'a L>
where
    F: Fn(&L) -> u64,
{
    let excluded: std::collections::HashSet<u64> = exclude.iter().copied().collect();
    left.iter().filter(|l| !excluded.contains(&key(l))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct IdRow {
        id: u64,
        value: f64,
    }

    #[derive(Debug)]
    struct NameRow {
        id: u64,
        name: Option<String>,
    }

    fn ids(rows: &[(u64, f64)]) -> Vec<IdRow> {
        rows.iter().map(|&(id, value)| IdRow { id, value }).collect()
    }

    #[test]
    fn test_inner_join_preserves_left_order() {
        let left = ids(&[(3, 0.3), (1, 0.1), (2, 0.2)]);
        let right = ids(&[(1, 10.0), (3, 30.0)]);
        let joined = join_by_kic(&left, &right, |l| l.id, |r| r.id);
        let keys: Vec<u64> = joined.iter().map(|(l, _)| l.id).collect();
        assert_eq!(keys, vec![3, 1]);
        assert!((joined[0].1.value - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_inner_join_first_duplicate_wins() {
        let left = ids(&[(1, 0.1)]);
        let right = ids(&[(1, 10.0), (1, 99.0)]);
        let joined = join_by_kic(&left, &right, |l| l.id, |r| r.id);
        assert_eq!(joined.len(), 1);
        assert!((joined[0].1.value - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_join_is_empty() {
        let left = ids(&[(1, 0.1)]);
        let right = ids(&[(2, 0.2)]);
        assert!(join_by_kic(&left, &right, |l| l.id, |r| r.id).is_empty());
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let left = vec![
            NameRow {
                id: 1,
                name: Some("2M1".to_string()),
            },
            NameRow { id: 2, name: None },
            NameRow {
                id: 3,
                name: Some("2M3".to_string()),
            },
        ];
        let right = vec![
            NameRow {
                id: 10,
                name: Some("2M3".to_string()),
            },
        ];
        let joined = join_by_designation(
            &left,
            &right,
            |l| l.name.as_deref(),
            |r| r.name.as_deref().unwrap_or(""),
        );
        assert_eq!(joined.len(), 3);
        assert!(joined[0].1.is_none());
        assert!(joined[1].1.is_none());
        assert_eq!(joined[2].1.map(|r| r.id), Some(10));
    }

    #[test]
    fn test_filter_out_ids() {
        let left = ids(&[(1, 0.1), (2, 0.2), (3, 0.3)]);
        let kept = filter_out_ids(&left, &[2], |l| l.id);
        let keys: Vec<u64> = kept.iter().map(|l| l.id).collect();
        assert_eq!(keys, vec![1, 3]);
    }
}
