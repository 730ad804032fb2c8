//! Moore–Penrose 伪逆.
//!
//! 默认借助 `nalgebra` 的 SVD; 开启 `lapack` feature 后改用 `ndarray-linalg`.

use crate::{FitError, FitResult};
use ndarray::{Array1, Array2, ArrayView2};

/// 对方阵 `m` 做奇异值分解, 得到 `(U, s, Vᵀ)`.
type Decomposition = (Array2<f64>, Array1<f64>, Array2<f64>);

cfg_if::cfg_if! {
    if #[cfg(feature = "lapack")] {
        fn decompose(m: ArrayView2<f64>) -> FitResult<Decomposition> {
            use ndarray_linalg::SVD;

            let (u, s, vt) = m.svd(true, true).map_err(|e| FitError::Linalg(e.to_string()))?;
            let u = u.ok_or_else(|| FitError::Linalg("SVD did not return U".to_owned()))?;
            let vt = vt.ok_or_else(|| FitError::Linalg("SVD did not return Vt".to_owned()))?;
            Ok((u, s, vt))
        }
    } else {
        fn decompose(m: ArrayView2<f64>) -> FitResult<Decomposition> {
            use nalgebra::DMatrix;

            let (h, w) = m.dim();
            let svd = DMatrix::<f64>::from_fn(h, w, |r, c| m[(r, c)]).svd(true, true);
            let u = svd.u.ok_or_else(|| FitError::Linalg("SVD did not return U".to_owned()))?;
            let vt = svd
                .v_t
                .ok_or_else(|| FitError::Linalg("SVD did not return Vt".to_owned()))?;
            let s = Array1::from_iter(svd.singular_values.iter().copied());
            Ok((
                Array2::from_shape_fn(u.shape(), |(r, c)| u[(r, c)]),
                s,
                Array2::from_shape_fn(vt.shape(), |(r, c)| vt[(r, c)]),
            ))
        }
    }
}

/// 方阵 `m` 的 Moore–Penrose 伪逆, 同时返回数值秩.
///
/// 小于等于 `rcond × 最大奇异值` 的奇异值视为零. 因此零矩阵的伪逆是零矩阵, 秩为 0.
///
/// # 错误
///
/// - `m` 不是方阵: [`FitError::ShapeMismatch`];
/// - `m` 为 0 × 0: [`FitError::EmptyProfile`];
/// - `m` 含 inf 或 NaN, 或分解失败: [`FitError::Linalg`].
pub fn pseudo_inverse(m: ArrayView2<f64>, rcond: f64) -> FitResult<(Array2<f64>, usize)> {
    let (h, w) = m.dim();
    if h != w {
        return Err(FitError::ShapeMismatch {
            expected: h,
            found: w,
        });
    }
    if h == 0 {
        return Err(FitError::EmptyProfile);
    }
    if !m.iter().all(|v| v.is_finite()) {
        return Err(FitError::Linalg("matrix contains inf or NaN".to_owned()));
    }

    let mut pinv = Array2::<f64>::zeros((w, h));
    let (u, s, vt) = decompose(m)?;
    let s_max = s.iter().copied().fold(0.0, f64::max);
    if s_max <= 0.0 {
        return Ok((pinv, 0));
    }

    // pinv = V · diag(1 / s) · Uᵀ, 只保留显著的奇异值.
    let cutoff = rcond * s_max;
    let mut rank = 0;
    for (k, &sk) in s.iter().enumerate() {
        if sk <= cutoff {
            continue;
        }
        rank += 1;
        let inv = 1.0 / sk;
        for ((i, j), p) in pinv.indexed_iter_mut() {
            *p += vt[(k, i)] * inv * u[(j, k)];
        }
    }
    Ok((pinv, rank))
}
