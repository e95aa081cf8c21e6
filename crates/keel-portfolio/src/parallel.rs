//! Conditional parallel iteration.
//!
//! Sweeps run on the rayon pool when the `parallel` feature is enabled and the
//! item count reaches the caller's threshold. Results are always returned in
//! input order.

/// Maps over items, in parallel when `items.len() >= threshold`, stopping
/// at the first error.
///
/// When several items fail in parallel, which error is returned is not
/// specified.
pub fn try_maybe_parallel_map<T, U, E, F>(items: &[T], threshold: usize, f: F) -> Result<Vec<U>, E>
where
    T: Sync,
    U: Send,
    E: Send,
    F: Fn(&T) -> Result<U, E> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if items.len() >= threshold {
            return items.par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = threshold;

    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let items: Vec<u32> = (0..100).collect();
        let double = |x: &u32| -> Result<u32, String> { Ok(x * 2) };
        let sequential = try_maybe_parallel_map(&items, usize::MAX, double).unwrap();
        let parallel = try_maybe_parallel_map(&items, 1, double).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[99], 198);
    }

    #[test]
    fn test_try_map_short_circuits() {
        let items: Vec<u32> = (0..10).collect();
        let result: Result<Vec<u32>, String> = try_maybe_parallel_map(&items, 1, |x| {
            if *x == 7 {
                Err(format!("bad {x}"))
            } else {
                Ok(*x)
            }
        });
        assert_eq!(result.unwrap_err(), "bad 7");

        let ok: Result<Vec<u32>, String> = try_maybe_parallel_map(&items, 1, |x| Ok(x + 1));
        assert_eq!(ok.unwrap().len(), 10);
    }
}
