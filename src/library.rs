//! Standard functions written in the language itself.
//!
//! These are ordinary expression builders: each call constructs a fresh
//! named `SeqOp` over the given sequence. Several of them rely on the
//! "compute an index, then select" pattern: one aggregation counts or
//! locates something, and a second aggregation uses the result as a key to
//! move tokens around.

use crate::selector::{key, query};
use crate::seq::{indices, where_, SeqOp};
use crate::value::Value;

/// The input length, at every position.
pub fn length() -> SeqOp {
    key(1).eq(&query(1)).value(1).name("length")
}

/// The sequence reversed.
pub fn flip(seq: &SeqOp) -> SeqOp {
    let opposite = length() - indices() - 1;
    key(opposite).eq(&query(indices())).value(seq).name("flip")
}

/// Running sum: position q holds the sum of positions `0..=q`.
pub fn cumsum(seq: &SeqOp) -> SeqOp {
    let before = key(indices()).lt(&query(indices()));
    let here = key(indices()).eq(&query(indices()));
    (before | here).value(seq).name("cumsum")
}

/// Character to number, as the offset from `'0'`.
pub fn atoi(seq: &SeqOp) -> SeqOp {
    seq.map_named("atoi", |v| {
        let c = v.to_char()?;
        Ok(Value::Int(c as i64 - '0' as i64))
    })
}

/// The element at position `i`, at every position.
pub fn index(i: i64, seq: &SeqOp) -> SeqOp {
    key(indices()).eq(&query(i)).value(seq).name("index")
}

/// Shift right by `i` positions (left for negative `i`), filling with `default`.
pub fn shift(i: i64, default: impl Into<Value>, seq: &SeqOp) -> SeqOp {
    key(indices())
        .eq(&query(indices() - i))
        .value_or(seq, default)
        .name("shift")
}

/// Move trailing `_` padding to the front, filling it with `default`.
///
/// `"xyz___"` becomes `"000xyz"`.
pub fn ralign(default: impl Into<Value>, seq: &SeqOp) -> SeqOp {
    let padding = key(seq).eq(&query('_')).value(1);
    key(indices() + padding)
        .eq(&query(indices()))
        .value_or(seq, default)
        .name("ralign")
}

/// Split on the first occurrence of `v`, keeping one side.
///
/// The first part is right-aligned and zero-filled; the second part keeps
/// its positions with everything up to and including `v` replaced by `'0'`.
pub fn split(v: impl Into<Value>, first_part: bool, seq: &SeqOp) -> SeqOp {
    let v: Value = v.into();
    let split_point = key(seq).eq(&query(v)).value(indices());
    if first_part {
        ralign('0', &where_(indices().lt(&split_point), seq, '_')).name("split")
    } else {
        where_(indices().gt(&split_point), seq, '0').name("split")
    }
}

/// The smallest element, at every position. Two attention layers.
pub fn minimum(seq: &SeqOp) -> SeqOp {
    let before = key(indices()).lt(&query(indices()));
    let ties = before & key(seq).eq(&query(seq));
    let smaller = key(seq).lt(&query(seq));
    let rank = (ties | smaller).value(1);
    key(rank).eq(&query(0)).value(seq).name("min")
}

/// The first position holding `token`, at every position.
pub fn first(token: impl Into<Value>, seq: &SeqOp) -> SeqOp {
    let token: Value = token.into();
    minimum(&where_(seq.eq(token), indices(), 99)).name("first")
}

/// Replace each `matching` token with the nearest non-matching token to its right.
pub fn slide(matching: impl Into<Value>, seq: &SeqOp) -> SeqOp {
    let matching: Value = matching.into();
    let keep = seq.ne(matching);
    let rank = cumsum(&keep);
    let next = key(&rank).eq(&query(&rank + 1)) & key(&keep).eq(&query(true));
    let filled = next.value(seq);
    where_(&keep, seq, filled).name("slide")
}

/// Decimal addition of `"a+b"`, right-aligned and zero-padded to the input width.
pub fn add(seq: &SeqOp) -> SeqOp {
    let sum = atoi(&split('+', true, seq)) + atoi(&split('+', false, seq));
    let carry_flags = where_(sum.gt(9), '1', where_(sum.eq(9), '<', '0'));
    let carries = atoi(&slide('<', &shift(-1, '0', &carry_flags)));
    ((sum + carries) % 10).name("add")
}
