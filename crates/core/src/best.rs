//! Best-element selection by projected key.

use std::cmp::Ordering;

/// Pick the best element of `items` by a projected key.
///
/// Reduces left to right, keeping a running `(key, item)` seeded from the first
/// element. Each later element is projected once and ranked with
/// `compare(&best_key, &candidate_key)`; it replaces the current best only when
/// the result is [`Ordering::Less`], so ties keep the earlier element.
///
/// `Ord::cmp` selects the maximum; a reversed comparator (`|a, b| b.cmp(a)`)
/// selects the minimum. Returns `None` for an empty input. With a single
/// element, `compare` is never called.
///
/// Passing a slice yields a reference to the original element:
///
/// ```
/// let xs = [3, 1, 4, 1, 5, 9, 2, 6];
/// assert_eq!(lux_core::best_by(&xs, |x| **x, |a, b| a.cmp(b)), Some(&9));
/// ```
pub fn best_by<I, U, B, C>(items: I, mut by: B, mut compare: C) -> Option<I::Item>
where
    I: IntoIterator,
    B: FnMut(&I::Item) -> U,
    C: FnMut(&U, &U) -> Ordering,
{
    let mut iter = items.into_iter();
    let first = iter.next()?;
    let mut best_key = by(&first);
    let mut best = first;
    for item in iter {
        let key = by(&item);
        if compare(&best_key, &key) == Ordering::Less {
            best_key = key;
            best = item;
        }
    }
    Some(best)
}

/// Same reduction as [`best_by`], with a comparator that returns the winning key
/// instead of an ordering.
///
/// `compare(&best_key, &candidate_key)` must hand back one of its two arguments.
/// The candidate is rejected when the returned key equals the current best key by
/// value, which also keeps the earlier element on ties. Comparators that are not
/// a total preorder give results that depend on input order.
pub fn best_by_winner<I, U, B, C>(items: I, mut by: B, mut compare: C) -> Option<I::Item>
where
    I: IntoIterator,
    U: PartialEq,
    B: FnMut(&I::Item) -> U,
    C: for<'k> FnMut(&'k U, &'k U) -> &'k U,
{
    let mut iter = items.into_iter();
    let first = iter.next()?;
    let mut best_key = by(&first);
    let mut best = first;
    for item in iter {
        let key = by(&item);
        let keep = compare(&best_key, &key) == &best_key;
        if !keep {
            best_key = key;
            best = item;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGITS: [i32; 8] = [3, 1, 4, 1, 5, 9, 2, 6];

    #[derive(Debug, PartialEq)]
    struct Keyed { k: i32, id: &'static str }

    fn max_of<'k>(a: &'k i32, b: &'k i32) -> &'k i32 { if a > b { a } else { b } }
    fn min_of<'k>(a: &'k i32, b: &'k i32) -> &'k i32 { if a < b { a } else { b } }

    #[test]
    fn empty_input_is_none() {
        let empty: [i32; 0] = [];
        assert_eq!(best_by(&empty, |x| **x, |a, b| a.cmp(b)), None);
        assert_eq!(best_by_winner(&empty, |x| **x, max_of), None);
    }

    #[test]
    fn single_element_skips_comparator() {
        let mut calls = 0;
        let got = best_by(&[42], |x| **x, |a: &i32, b: &i32| { calls += 1; a.cmp(b) });
        assert_eq!(got, Some(&42));
        assert_eq!(calls, 0);
    }

    #[test]
    fn max_and_min() {
        assert_eq!(best_by(&DIGITS, |x| **x, |a, b| a.cmp(b)), Some(&9));
        assert_eq!(best_by(&DIGITS, |x| **x, |a, b| b.cmp(a)), Some(&1));
        assert_eq!(best_by_winner(&DIGITS, |x| **x, max_of), Some(&9));
        assert_eq!(best_by_winner(&DIGITS, |x| **x, min_of), Some(&1));
    }

    #[test]
    fn min_returns_first_occurrence() {
        // the two 1s sit at positions 1 and 3
        let got = best_by(DIGITS.iter().enumerate(), |(_, x)| **x, |a, b| b.cmp(a));
        assert_eq!(got, Some((1, &1)));
    }

    #[test]
    fn ties_keep_earlier_element() {
        let items = [Keyed { k: 1, id: "a" }, Keyed { k: 1, id: "b" }];
        assert_eq!(best_by(&items, |x| x.k, |a, b| b.cmp(a)).map(|x| x.id), Some("a"));
        assert_eq!(best_by(&items, |x| x.k, |a, b| a.cmp(b)).map(|x| x.id), Some("a"));
        assert_eq!(best_by_winner(&items, |x| x.k, min_of).map(|x| x.id), Some("a"));
        // returning the candidate on a tie still compares equal to the best key
        assert_eq!(best_by_winner(&items, |x| x.k, |_a, b| b).map(|x| x.id), Some("a"));
    }

    #[test]
    fn calls_are_counted() {
        let mut projections = 0;
        let mut comparisons = 0;
        let got = best_by(
            &DIGITS,
            |x| { projections += 1; **x },
            |a: &i32, b: &i32| { comparisons += 1; a.cmp(b) },
        );
        assert_eq!(got, Some(&9));
        assert_eq!(projections, DIGITS.len());
        assert_eq!(comparisons, DIGITS.len() - 1);
    }

    #[test]
    fn owned_items_are_moved_out() {
        let names = vec!["luxon.js".to_string(), "luxon.min.js".to_string(), "x.js".to_string()];
        let longest = best_by(names, |s| s.len(), |a, b| a.cmp(b));
        assert_eq!(longest.as_deref(), Some("luxon.min.js"));
    }

    #[test]
    fn inconsistent_comparator_depends_on_order() {
        // always prefers the second argument: the last element wins
        let last = |_a: &i32, _b: &i32| Ordering::Less;
        assert_eq!(best_by(&[1, 2, 3], |x| **x, last), Some(&3));
        assert_eq!(best_by(&[3, 2, 1], |x| **x, last), Some(&1));
    }

    #[test]
    fn winner_calls_are_counted() {
        let mut projections = 0;
        let mut comparisons = 0;
        let got = best_by_winner(
            &DIGITS,
            |x| { projections += 1; **x },
            |a, b| { comparisons += 1; max_of(a, b) },
        );
        assert_eq!(got, Some(&9));
        assert_eq!(projections, DIGITS.len());
        assert_eq!(comparisons, DIGITS.len() - 1);

        let mut comparisons = 0;
        let got = best_by_winner(&[42], |x| **x, |a, b| { comparisons += 1; max_of(a, b) });
        assert_eq!(got, Some(&42));
        assert_eq!(comparisons, 0);
    }

    #[test]
    fn winner_with_cyclic_comparator_depends_on_order() {
        // 1 beats 0, 2 beats 1, 0 beats 2
        fn beats<'k>(a: &'k i32, b: &'k i32) -> &'k i32 { if (a + 1) % 3 == *b { b } else { a } }
        assert_eq!(best_by_winner(&[0, 1, 2], |x| **x, beats), Some(&2));
        assert_eq!(best_by_winner(&[2, 1, 0], |x| **x, beats), Some(&0));
        assert_eq!(best_by_winner(&[1, 2, 0], |x| **x, beats), Some(&0));

        // always hands back the candidate: with distinct keys the last element wins
        assert_eq!(best_by_winner(&[1, 2, 3], |x| **x, |_a, b| b), Some(&3));
        assert_eq!(best_by_winner(&[3, 2, 1], |x| **x, |_a, b| b), Some(&1));
    }
}
