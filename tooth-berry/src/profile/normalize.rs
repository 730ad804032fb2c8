//! 剖面差分与 L1 规范化.

use itertools::Itertools;
use ndarray::{Array1, ArrayView1};

/// 一阶差分 `v[j + 1] - v[j]`. 输出比输入少一个元素.
pub fn difference(raw: &[f64]) -> Array1<f64> {
    raw.iter().tuple_windows().map(|(a, b)| b - a).collect()
}

/// L1 范数 (元素绝对值之和).
#[inline]
pub fn l1_norm(g: ArrayView1<f64>) -> f64 {
    g.iter().map(|v| v.abs()).sum()
}

/// 以 L1 范数规范化. 范数恰好为 0 (全平坦剖面) 时原样返回.
pub fn normalize_l1(mut g: Array1<f64>) -> Array1<f64> {
    let norm = l1_norm(g.view());
    if norm != 0.0 {
        g.mapv_inplace(|v| v / norm);
    }
    g
}
