//! 单个 landmark 的外观模型.

use super::pinv::pseudo_inverse;
use crate::{FitError, FitResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 某 landmark 处训练剖面的均值 `μ` 与总体协方差 `Σ`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkStats {
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl LandmarkStats {
    /// 由 `[样本数, 维数]` 矩阵估计均值和协方差 (除以样本数 `n`, 而非 `n - 1`).
    ///
    /// 单个样本时协方差为零矩阵.
    pub fn from_samples(g: ArrayView2<f64>) -> FitResult<Self> {
        let mean = g.mean_axis(Axis(0)).ok_or(FitError::EmptyPopulation)?;
        let centered = &g - &mean;
        let covariance = centered.t().dot(&centered) / g.nrows() as f64;
        Ok(Self { mean, covariance })
    }

    /// 直接由均值和协方差构建. 二者维数必须一致且不为 0.
    pub fn from_parts(mean: Array1<f64>, covariance: Array2<f64>) -> FitResult<Self> {
        let d = mean.len();
        if d == 0 {
            return Err(FitError::EmptyProfile);
        }
        if covariance.dim() != (d, d) {
            return Err(FitError::ShapeMismatch {
                expected: d,
                found: covariance.nrows(),
            });
        }
        Ok(Self { mean, covariance })
    }

    /// 拆分为 `(均值, 协方差)`.
    #[inline]
    pub fn into_parts(self) -> (Array1<f64>, Array2<f64>) {
        (self.mean, self.covariance)
    }

    /// 剖面维数 `2k + 1`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// 均值 `μ`.
    #[inline]
    pub fn mean(&self) -> ArrayView1<f64> {
        self.mean.view()
    }

    /// 协方差 `Σ`.
    #[inline]
    pub fn covariance(&self) -> ArrayView2<f64> {
        self.covariance.view()
    }
}

/// 拟合函数背后的模型: 统计量加上预先算好的 `Σ⁺`.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkModel {
    stats: LandmarkStats,
    pinv: Array2<f64>,
    rank: usize,
}

impl LandmarkModel {
    /// 计算伪逆并构建模型. `rcond` 的含义见 [`pseudo_inverse`].
    pub fn new(stats: LandmarkStats, rcond: f64) -> FitResult<Self> {
        let (pinv, rank) = pseudo_inverse(stats.covariance(), rcond)?;
        Ok(Self { stats, pinv, rank })
    }

    /// 由训练剖面 `[样本数, 维数]` 直接构建.
    #[inline]
    pub fn from_samples(g: ArrayView2<f64>, rcond: f64) -> FitResult<Self> {
        Self::new(LandmarkStats::from_samples(g)?, rcond)
    }

    /// 候选剖面 `g` 到模型的 Mahalanobis 距离 `sqrt((g - μ)ᵀ Σ⁺ (g - μ))`.
    ///
    /// 舍入误差导致的负二次型按 0 处理. `g` 长度不符时返回 [`FitError::ShapeMismatch`].
    pub fn score(&self, g: ArrayView1<f64>) -> FitResult<f64> {
        if g.len() != self.dim() {
            return Err(FitError::ShapeMismatch {
                expected: self.dim(),
                found: g.len(),
            });
        }
        let d = &g - &self.stats.mean;
        let q = d.dot(&self.pinv.dot(&d));
        Ok(if q < 0.0 { 0.0 } else { q.sqrt() })
    }

    /// 剖面维数 `2k + 1`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.stats.dim()
    }

    /// 协方差的数值秩.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// 协方差是否奇异 (秩小于维数).
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.rank < self.dim()
    }

    /// 均值 `μ`.
    #[inline]
    pub fn mean(&self) -> ArrayView1<f64> {
        self.stats.mean()
    }

    /// 协方差 `Σ`.
    #[inline]
    pub fn covariance(&self) -> ArrayView2<f64> {
        self.stats.covariance()
    }

    /// 伪逆 `Σ⁺`.
    #[inline]
    pub fn pseudo_inverse(&self) -> ArrayView2<f64> {
        self.pinv.view()
    }

    /// 统计量.
    #[inline]
    pub fn stats(&self) -> &LandmarkStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::{LandmarkModel, LandmarkStats};
    use crate::consts::DEFAULT_RCOND;
    use crate::FitError;
    use ndarray::{arr1, arr2, Array1, Array2};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_population_statistics() {
        let g = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let stats = LandmarkStats::from_samples(g.view()).unwrap();
        assert_eq!(stats.mean(), arr1(&[2.0, 3.0]));
        assert_eq!(stats.covariance(), arr2(&[[1.0, 1.0], [1.0, 1.0]]));

        assert_eq!(
            LandmarkStats::from_samples(Array2::zeros((0, 3)).view()).unwrap_err(),
            FitError::EmptyPopulation
        );
    }

    #[test]
    fn test_identical_samples() {
        let g = arr2(&[[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]]);
        let model = LandmarkModel::from_samples(g.view(), DEFAULT_RCOND).unwrap();
        assert!(model.covariance().iter().all(|v| *v == 0.0));
        assert!(model.pseudo_inverse().iter().all(|v| *v == 0.0));
        assert_eq!(model.rank(), 0);
        assert!(model.is_singular());
        assert_eq!(model.score(arr1(&[1.0, 2.0, 3.0]).view()).unwrap(), 0.0);
        assert_eq!(model.score(arr1(&[9.0, -2.0, 0.5]).view()).unwrap(), 0.0);
    }

    #[test]
    fn test_isotropic_distance() {
        // 协方差为 0.5 I, 距离即欧氏距离乘以 sqrt(2).
        let g = arr2(&[[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]]);
        let model = LandmarkModel::from_samples(g.view(), DEFAULT_RCOND).unwrap();
        assert_eq!(model.rank(), 2);
        assert!(!model.is_singular());
        assert!(f64_eq(model.score(arr1(&[0.0, 0.0]).view()).unwrap(), 0.0));
        assert!(f64_eq(model.score(arr1(&[1.0, 1.0]).view()).unwrap(), 2.0));
        assert!(f64_eq(model.score(arr1(&[0.0, -3.0]).view()).unwrap(), 18f64.sqrt()));
    }

    #[test]
    fn test_rank_deficient_population() {
        // 所有样本位于一条直线上.
        let g = arr2(&[[0.0, 0.0, 1.0], [1.0, 1.0, 1.0], [2.0, 2.0, 1.0]]);
        let model = LandmarkModel::from_samples(g.view(), 1e-10).unwrap();
        assert_eq!(model.rank(), 1);
        assert!(f64_eq(model.score(model.mean()).unwrap(), 0.0));
        // 与数据子空间正交的偏移不计入距离.
        let off = &model.mean() + &arr1(&[1.0, -1.0, 5.0]);
        assert!(f64_eq(model.score(off.view()).unwrap(), 0.0));
        let along = &model.mean() + &arr1(&[1.0, 1.0, 0.0]);
        assert!(model.score(along.view()).unwrap() > 0.0);
    }

    #[test]
    fn test_wrong_length() {
        let g = arr2(&[[1.0, 2.0], [3.0, 5.0]]);
        let model = LandmarkModel::from_samples(g.view(), DEFAULT_RCOND).unwrap();
        assert_eq!(
            model.score(arr1(&[1.0, 2.0, 3.0]).view()).unwrap_err(),
            FitError::ShapeMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_ill_conditioned_population() {
        // 协方差 diag(0.5, 5e-13): 条件数 1e12 但满秩.
        let g = arr2(&[[1.0, 0.0], [-1.0, 0.0], [0.0, 1e-6], [0.0, -1e-6]]);
        let model = LandmarkModel::from_samples(g.view(), DEFAULT_RCOND).unwrap();
        assert_eq!(model.rank(), 2);
        assert!(!model.is_singular());
        let s = model.score(arr1(&[0.0, 1e-6]).view()).unwrap();
        assert!((s - 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            LandmarkStats::from_parts(Array1::zeros(0), Array2::zeros((0, 0))).unwrap_err(),
            FitError::EmptyProfile
        );
        assert_eq!(
            LandmarkModel::from_samples(Array2::zeros((3, 0)).view(), DEFAULT_RCOND).unwrap_err(),
            FitError::EmptyProfile
        );
        assert!(LandmarkStats::from_parts(arr1(&[0.0, 1.0]), Array2::eye(3)).is_err());
        let stats = LandmarkStats::from_parts(arr1(&[0.0, 1.0]), Array2::eye(2)).unwrap();
        let model = LandmarkModel::new(stats, DEFAULT_RCOND).unwrap();
        assert!(f64_eq(model.score(arr1(&[3.0, 5.0]).view()).unwrap(), 5.0));
    }
}
