//! 沿边界法线的灰度剖面采样.
//!
//! 训练与打分必须走同一条路径: 采样 `2k + 2` 个像素 -> 一阶差分 -> L1 规范化,
//! 否则 Mahalanobis 距离之间没有可比性. [`sample_profile`] 就是这条路径.

pub mod normalize;
mod sample;

use crate::consts::{PreprocessMethod, DEFAULT_HALF_WIDTH};
use crate::grey::GreyAccess;
use crate::{FitResult, Point2d, Shape};
use ndarray::{Array1, Array2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use normalize::{difference, l1_norm, normalize_l1};
pub use sample::{profile_normal, sample_along, sample_raw, RawProfile};

/// 剖面采样规则.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleSpec {
    /// 法线单侧采样像素个数 `k`.
    half_width: usize,

    /// 从 landmark 坐标系到图像像素坐标系需要减去的偏移 `(x, y)`.
    offset: Point2d,
}

impl SampleSpec {
    /// 单侧采 `half_width` 个像素, 无偏移.
    #[inline]
    pub const fn new(half_width: usize) -> Self {
        Self {
            half_width,
            offset: (0.0, 0.0),
        }
    }

    /// 单侧采 `half_width` 个像素, landmark 坐标需减去 `offset`.
    ///
    /// 如果 `offset` 含 inf 或 NaN, 则返回 `None`.
    pub fn with_offset(half_width: usize, offset: Point2d) -> Option<Self> {
        if offset.0.is_finite() && offset.1.is_finite() {
            Some(Self { half_width, offset })
        } else {
            None
        }
    }

    /// 按预处理方式自动选择偏移 (裁剪图像使用裁剪偏移).
    #[inline]
    pub const fn for_method(half_width: usize, method: PreprocessMethod) -> Self {
        Self {
            half_width,
            offset: method.offset(),
        }
    }

    /// 单侧采样像素个数 `k`.
    #[inline]
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// 坐标偏移.
    #[inline]
    pub fn offset(&self) -> Point2d {
        self.offset
    }

    /// 原始剖面长度 `2k + 2`.
    #[inline]
    pub fn raw_len(&self) -> usize {
        2 * self.half_width + 2
    }

    /// 差分 + 规范化后剖面长度 `2k + 1`.
    #[inline]
    pub fn profile_len(&self) -> usize {
        2 * self.half_width + 1
    }
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_WIDTH)
    }
}

/// 第 `i` 个 landmark 处经过差分和 L1 规范化的剖面, 长度 `2k + 1`.
pub fn sample_profile<I: GreyAccess + ?Sized>(
    img: &I,
    shape: &Shape,
    i: usize,
    spec: &SampleSpec,
) -> FitResult<Array1<f64>> {
    let raw = sample_raw(img, shape, i, spec)?;
    Ok(normalize_l1(raw.differenced()))
}

/// 对 `shape` 的每个 landmark 调用 [`sample_profile`], 得到 `[L, 2k + 1]` 矩阵.
pub fn sample_shape_profiles<I: GreyAccess + ?Sized>(
    img: &I,
    shape: &Shape,
    spec: &SampleSpec,
) -> FitResult<Array2<f64>> {
    let mut g = Array2::<f64>::zeros((shape.len(), spec.profile_len()));
    for (i, mut row) in g.rows_mut().into_iter().enumerate() {
        row.assign(&sample_profile(img, shape, i, spec)?);
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::{l1_norm, sample_profile, sample_shape_profiles, SampleSpec};
    use crate::consts::PreprocessMethod;
    use crate::{FitError, Shape};
    use ndarray::{Array2, Array3};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_spec_lengths() {
        let spec = SampleSpec::new(5);
        assert_eq!(spec.raw_len(), 12);
        assert_eq!(spec.profile_len(), 11);
        assert_eq!(SampleSpec::default().half_width(), 5);
        assert_eq!(
            SampleSpec::for_method(3, PreprocessMethod::Eh).offset(),
            (1234.0, 497.0)
        );
        assert!(SampleSpec::with_offset(2, (f64::NAN, 0.0)).is_none());
        assert!(SampleSpec::with_offset(2, (0.0, f64::INFINITY)).is_none());
        assert_eq!(
            SampleSpec::with_offset(2, (3.0, 4.0)).map(|s| s.offset()),
            Some((3.0, 4.0))
        );
    }

    #[test]
    fn test_vertical_ramp_profile() {
        let img = Array2::<u8>::from_shape_fn((8, 3), |(h, w)| if w == 1 { 10 * h as u8 } else { 0 });
        let shape = Shape::new(vec![(0.0, 5.0), (1.0, 4.0), (2.0, 5.0)]).unwrap();
        let g = sample_profile(&img, &shape, 1, &SampleSpec::new(2)).unwrap();
        assert_eq!(g.len(), 5);
        assert!(g.iter().all(|v| f64_eq(*v, 0.2)));

        assert_eq!(
            sample_profile(&img, &shape, 3, &SampleSpec::new(2)).unwrap_err(),
            FitError::NoSuchLandmark {
                landmark: 3,
                len: 3
            }
        );
    }

    #[test]
    fn test_shape_profiles_unit_norm() {
        // 径向渐变图像, 以 (20, 20) 为中心.
        let img = Array3::<u8>::from_shape_fn((40, 40, 3), |(h, w, c)| {
            let r = ((h as f64 - 20.0).powi(2) + (w as f64 - 20.0).powi(2)).sqrt();
            (r * 6.0) as u8 + c as u8
        });
        let shape = Shape::new(
            (0..12)
                .map(|i| {
                    let t = i as f64 / 12.0 * std::f64::consts::TAU;
                    (20.0 + 8.0 * t.cos(), 20.0 + 8.0 * t.sin())
                })
                .collect(),
        )
        .unwrap();

        let g = sample_shape_profiles(&img, &shape, &SampleSpec::new(4)).unwrap();
        assert_eq!(g.dim(), (12, 9));
        for row in g.rows() {
            let norm = l1_norm(row);
            assert!(f64_eq(norm, 1.0) || norm == 0.0);
        }
    }
}
