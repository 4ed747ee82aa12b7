use candle_core::{DType, Tensor};
use std::cmp::Ordering;

use crate::{Error, Result};

/// Axis of the activations tensor along which the values are ranked.
pub const TOKEN_AXIS: usize = 1;

/// Selects the `k` largest (or smallest) values along the token axis of a `[outer, token, inner]`
/// activations tensor, independently for every `(outer, inner)` pair.
///
/// The largest values are returned in descending order. The smallest values are ranked in
/// ascending order and then reversed, so they read from the `k`-th smallest value towards the
/// minimum. Equal values keep their token order: the earliest position is ranked first (before
/// the reversal of the smallest values).
///
/// # Arguments
///
/// * `activations` - A tensor with shape `[outer, token, inner]`.
/// * `k` - The number of values to select. Must be between 1 and the number of tokens.
/// * `largest` - Whether to select the largest values (`true`) or the smallest ones (`false`).
///
/// # Returns
///
/// A tuple containing the selected values, with the dtype of `activations`, and their token
/// positions as a `u32` tensor. Both have shape `[outer, k, inner]`.
///
/// # Errors
///
/// Returns [`Error::Shape`] if `activations` does not have 3 dimensions and [`Error::Range`] if
/// `k` is not between 1 and the number of tokens.
pub fn select(activations: &Tensor, k: usize, largest: bool) -> Result<(Tensor, Tensor)> {
    if activations.rank() != 3 {
        return Err(Error::Shape(activations.dims().to_vec()));
    }
    let (n_outer, n_tokens, n_inner) = activations.dims3()?;
    if k < 1 || k > n_tokens {
        return Err(Error::Range {
            k,
            token_count: n_tokens,
        });
    }

    // `i64` does not fit in `f64` exactly, so it is ranked with its own comparison.
    let flat = activations.flatten_all()?;
    let indices = match activations.dtype() {
        DType::I64 => rank_columns(
            &flat.to_vec1::<i64>()?,
            (n_outer, n_tokens, n_inner),
            k,
            largest,
            |a, b| a.cmp(&b),
        ),
        _ => rank_columns(
            &flat.to_dtype(DType::F64)?.to_vec1::<f64>()?,
            (n_outer, n_tokens, n_inner),
            k,
            largest,
            compare_values,
        ),
    };

    let indices = Tensor::from_vec(indices, (n_outer, k, n_inner), activations.device())?;
    let values = activations.contiguous()?.gather(&indices, TOKEN_AXIS)?;
    Ok((values, indices))
}

/// Ranks every `(outer, inner)` column of the flattened `[outer, token, inner]` values and returns
/// the token positions of the `k` best ranked values as flattened `[outer, k, inner]` indices.
fn rank_columns<T: Copy>(
    flat: &[T],
    (n_outer, n_tokens, n_inner): (usize, usize, usize),
    k: usize,
    largest: bool,
    compare: fn(T, T) -> Ordering,
) -> Vec<u32> {
    let mut indices = vec![0u32; n_outer * k * n_inner];
    let mut column = Vec::with_capacity(n_tokens);
    for outer in 0..n_outer {
        for inner in 0..n_inner {
            column.clear();
            column.extend((0..n_tokens).map(|token| {
                (token, flat[(outer * n_tokens + token) * n_inner + inner])
            }));
            rank_column(&mut column, k, largest, compare);
            for (rank, &(token, _)) in column.iter().enumerate() {
                indices[(outer * k + rank) * n_inner + inner] = token as u32;
            }
        }
    }
    indices
}

/// Leaves in `column` only the `k` best ranked `(position, value)` pairs, in output order.
fn rank_column<T: Copy>(
    column: &mut Vec<(usize, T)>,
    k: usize,
    largest: bool,
    compare: fn(T, T) -> Ordering,
) {
    let order = |a: &(usize, T), b: &(usize, T)| {
        let by_value = if largest {
            compare(b.1, a.1)
        } else {
            compare(a.1, b.1)
        };
        by_value.then(a.0.cmp(&b.0))
    };

    // The comparator is a total order (position breaks ties), so the partition is deterministic.
    if k < column.len() {
        column.select_nth_unstable_by(k - 1, order);
        column.truncate(k);
    }
    column.sort_by(order);

    if !largest {
        column.reverse();
    }
}

/// Numeric comparison where NaN is greater than any number and equal to any other NaN.
fn compare_values(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}
