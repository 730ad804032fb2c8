//! 牙齿轮廓形状.
//!
//! 一个形状是 `L` 个首尾相连的 landmark. 外部数据通常以交错坐标
//! `x0, y0, x1, y1, ...` 存储, 这里同时提供到 `(xs, ys)` 的双向转换.

pub mod align;

use crate::{FitError, FitResult, Point2d};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use align::{mean_shape, ShapeAligner, SimilarityAligner, SimilarityTransform};

/// 闭合 landmark 多边形. 最后一个点的后继是第一个点.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    points: Vec<Point2d>,
}

impl Shape {
    /// 从有序点集构建. 少于 3 个点时返回 [`FitError::TooFewLandmarks`].
    pub fn new(points: Vec<Point2d>) -> FitResult<Self> {
        if points.len() < 3 {
            return Err(FitError::TooFewLandmarks(points.len()));
        }
        Ok(Self { points })
    }

    /// 从交错坐标 `x0, y0, x1, y1, ...` 构建.
    pub fn from_flat(flat: &[f64]) -> FitResult<Self> {
        if flat.len() % 2 != 0 {
            return Err(FitError::OddCoordinates(flat.len()));
        }
        Self::new(flat.chunks_exact(2).map(|c| (c[0], c[1])).collect())
    }

    /// 从分开存储的 `xs`, `ys` 构建. 两者长度不一致时返回 [`FitError::ShapeMismatch`].
    pub fn from_xy(xs: &[f64], ys: &[f64]) -> FitResult<Self> {
        if xs.len() != ys.len() {
            return Err(FitError::ShapeMismatch {
                expected: xs.len(),
                found: ys.len(),
            });
        }
        Self::new(xs.iter().copied().zip(ys.iter().copied()).collect())
    }

    /// landmark 个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 永远为 `false`; 合法形状至少有 3 个点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 所有点.
    #[inline]
    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    /// 第 `i` 个点的循环前驱索引.
    #[inline]
    pub fn prev_index(&self, i: usize) -> usize {
        (i + self.len() - 1) % self.len()
    }

    /// 第 `i` 个点的循环后继索引.
    #[inline]
    pub fn next_index(&self, i: usize) -> usize {
        (i + 1) % self.len()
    }

    /// 第 `i` 个点的 (前驱, 后继). `i` 越界时返回 [`FitError::NoSuchLandmark`].
    #[inline]
    pub fn neighbours(&self, i: usize) -> FitResult<(Point2d, Point2d)> {
        if i >= self.len() {
            return Err(FitError::NoSuchLandmark {
                landmark: i,
                len: self.len(),
            });
        }
        Ok((
            self.points[self.prev_index(i)],
            self.points[self.next_index(i)],
        ))
    }

    /// 转换为交错坐标.
    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flat_map(|&(x, y)| [x, y]).collect()
    }

    /// 转换为 `(xs, ys)`.
    pub fn to_xy(&self) -> (Vec<f64>, Vec<f64>) {
        self.points.iter().copied().unzip()
    }

    /// 质心.
    pub fn centroid(&self) -> Point2d {
        let n = self.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
        (sx / n, sy / n)
    }

    /// 平移 `(-dx, -dy)`. 用于把原图坐标变换到裁剪后图像的坐标.
    pub fn shifted_by(&self, (dx, dy): Point2d) -> Self {
        Self {
            points: self.points.iter().map(|&(x, y)| (x - dx, y - dy)).collect(),
        }
    }

    /// 对每个点应用 `f`.
    pub(crate) fn map<F: FnMut(Point2d) -> Point2d>(&self, f: F) -> Self {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }
}

impl Index<usize> for Shape {
    type Output = Point2d;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

/// 将交错坐标 `x0, y0, x1, y1, ...` 拆成 `(xs, ys)`.
///
/// 长度为奇数时, 最后一个孤立值被忽略.
pub fn extract_coordinates(flat: &[f64]) -> (Vec<f64>, Vec<f64>) {
    flat.chunks_exact(2).map(|c| (c[0], c[1])).unzip()
}

/// [`extract_coordinates`] 的逆操作. 以较短者为准.
pub fn interleave(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    xs.iter().zip(ys).flat_map(|(&x, &y)| [x, y]).collect()
}
