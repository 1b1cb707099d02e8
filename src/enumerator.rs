//! Query space enumeration.
//!
//! Produces the ordered sequence of query strings for a [`QuerySpec`]: every
//! length-1 string in alphabet order, then every length-2 string as the
//! row-major Cartesian product of the alphabet with itself. The sequence is a
//! pure function of the spec: re-enumerating yields the same queries in the
//! same order, which is what makes checkpoint reconciliation possible.

use crate::spec::QuerySpec;

/// Returns the full enumerated query sequence for a spec, lazily.
///
/// All tuples of the Cartesian product are distinct, so no deduplication is
/// needed beyond the spec's guarantee that the alphabet has no repeats.
pub fn enumerate(spec: &QuerySpec) -> impl Iterator<Item = String> + '_ {
    let alphabet = spec.alphabet();
    let singles = alphabet.iter().map(char::to_string);

    let pair_count = if spec.max_length() >= 2 {
        alphabet.len() * alphabet.len()
    } else {
        0
    };
    let pairs = alphabet
        .iter()
        .flat_map(move |first| {
            alphabet.iter().map(move |second| {
                let mut query = String::with_capacity(2);
                query.push(*first);
                query.push(*second);
                query
            })
        })
        .take(pair_count);

    singles.chain(pairs)
}

/// Returns the total number of queries [`enumerate`] will yield.
#[must_use]
pub fn space_size(spec: &QuerySpec) -> usize {
    let n = spec.alphabet().len();
    if spec.max_length() >= 2 { n + n * n } else { n }
}
