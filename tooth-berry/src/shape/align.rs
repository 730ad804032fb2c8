//! 相似变换对齐 (平移 + 旋转 + 缩放).
//!
//! 参考: Cootes & Taylor, "Statistical Models of Appearance for Computer Vision",
//! 附录 B. 最小二乘意义下的闭式解, 无需 SVD.

use super::Shape;
use crate::{FitError, FitResult, Point2d};

/// 形状对齐协作者: 把模型形状变换到某个训练样本的图像坐标系.
pub trait ShapeAligner {
    /// 求 `model` 经相似变换后最接近 `target` 的形状.
    fn align(&self, model: &Shape, target: &Shape) -> FitResult<Shape>;
}

/// 二维相似变换 `p' = [a -b; b a] p + t`.
///
/// `a = s·cosθ`, `b = s·sinθ`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimilarityTransform {
    a: f64,
    b: f64,
    tx: f64,
    ty: f64,
}

impl SimilarityTransform {
    /// 恒等变换.
    pub const IDENTITY: SimilarityTransform = SimilarityTransform {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// 由缩放 `scale`, 旋转角 `theta` (弧度) 和平移 `(tx, ty)` 构建.
    pub fn new(scale: f64, theta: f64, (tx, ty): Point2d) -> Self {
        Self {
            a: scale * theta.cos(),
            b: scale * theta.sin(),
            tx,
            ty,
        }
    }

    /// 以最小二乘估计把 `from` 映射到 `to` 的相似变换.
    ///
    /// 两者点数必须一致; `from` 所有点重合时返回 [`FitError::DegenerateShape`].
    pub fn estimate(from: &Shape, to: &Shape) -> FitResult<Self> {
        if from.len() != to.len() {
            return Err(FitError::ShapeMismatch {
                expected: from.len(),
                found: to.len(),
            });
        }
        let (fcx, fcy) = from.centroid();
        let (tcx, tcy) = to.centroid();

        let (mut norm, mut dot, mut cross) = (0.0, 0.0, 0.0);
        for (&(fx, fy), &(tx, ty)) in from.points().iter().zip(to.points()) {
            let (fx, fy) = (fx - fcx, fy - fcy);
            let (tx, ty) = (tx - tcx, ty - tcy);
            norm += fx * fx + fy * fy;
            dot += fx * tx + fy * ty;
            cross += fx * ty - fy * tx;
        }
        if norm <= f64::EPSILON {
            return Err(FitError::DegenerateShape);
        }

        let (a, b) = (dot / norm, cross / norm);
        Ok(Self {
            a,
            b,
            tx: tcx - (a * fcx - b * fcy),
            ty: tcy - (b * fcx + a * fcy),
        })
    }

    /// 缩放系数.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// 旋转角 (弧度).
    #[inline]
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    /// 平移量.
    #[inline]
    pub fn translation(&self) -> Point2d {
        (self.tx, self.ty)
    }

    /// 变换一个点.
    #[inline]
    pub fn apply_point(&self, (x, y): Point2d) -> Point2d {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// 变换整个形状.
    pub fn apply(&self, shape: &Shape) -> Shape {
        shape.map(|p| self.apply_point(p))
    }
}

/// 默认对齐器: 闭式最小二乘相似变换.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimilarityAligner;

impl ShapeAligner for SimilarityAligner {
    fn align(&self, model: &Shape, target: &Shape) -> FitResult<Shape> {
        Ok(SimilarityTransform::estimate(model, target)?.apply(model))
    }
}

/// 把形状平移到原点并缩放到单位范数.
fn normalized(shape: &Shape) -> FitResult<Shape> {
    let (cx, cy) = shape.centroid();
    let centered = shape.shifted_by((cx, cy));
    let norm = centered
        .points()
        .iter()
        .map(|&(x, y)| x * x + y * y)
        .sum::<f64>()
        .sqrt();
    if norm <= f64::EPSILON {
        return Err(FitError::DegenerateShape);
    }
    Ok(centered.map(|(x, y)| (x / norm, y / norm)))
}

/// 广义 Procrustes 平均形状.
///
/// 结果位于模型坐标系: 质心在原点, 范数为 1, 朝向与 `shapes[0]` 一致.
/// 至多迭代 `max_iter` 次, 平均形状变化小于 `1e-10` 时提前结束.
pub fn mean_shape(shapes: &[Shape], max_iter: usize) -> FitResult<Shape> {
    let first = shapes.first().ok_or(FitError::EmptyPopulation)?;
    let reference = normalized(first)?;
    let n = reference.len();
    let mut mean = reference.clone();

    for round in 0..max_iter.max(1) {
        let mut acc = vec![(0.0, 0.0); n];
        for shape in shapes {
            let aligned = SimilarityAligner.align(shape, &mean)?;
            for (a, &(x, y)) in acc.iter_mut().zip(aligned.points()) {
                a.0 += x;
                a.1 += y;
            }
        }
        let count = shapes.len() as f64;
        let raw = Shape::new(acc.into_iter().map(|(x, y)| (x / count, y / count)).collect())?;

        // 固定朝向, 避免平均形状随迭代漂移.
        let next = normalized(&SimilarityAligner.align(&normalized(&raw)?, &reference)?)?;
        let change: f64 = next
            .points()
            .iter()
            .zip(mean.points())
            .map(|(&(x0, y0), &(x1, y1))| (x0 - x1).powi(2) + (y0 - y1).powi(2))
            .sum();
        mean = next;
        if change < 1e-10 {
            log::debug!("Procrustes mean converged after {} rounds", round + 1);
            break;
        }
    }
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::{mean_shape, ShapeAligner, SimilarityAligner, SimilarityTransform};
    use crate::{FitError, Shape};
    use std::f64::consts::FRAC_PI_6;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn shape_eq(a: &Shape, b: &Shape) -> bool {
        a.len() == b.len()
            && a.points()
                .iter()
                .zip(b.points())
                .all(|(p, q)| f64_eq(p.0, q.0) && f64_eq(p.1, q.1))
    }

    fn tooth_like() -> Shape {
        Shape::new(vec![
            (0.0, 0.0),
            (2.0, -1.0),
            (4.0, 0.5),
            (4.5, 3.0),
            (2.5, 5.0),
            (0.5, 3.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_estimate_recovers_transform() {
        let model = tooth_like();
        let t = SimilarityTransform::new(2.5, FRAC_PI_6, (100.0, -40.0));
        let target = t.apply(&model);

        let est = SimilarityTransform::estimate(&model, &target).unwrap();
        assert!(f64_eq(est.scale(), 2.5));
        assert!(f64_eq(est.rotation(), FRAC_PI_6));
        assert!(f64_eq(est.translation().0, 100.0));
        assert!(f64_eq(est.translation().1, -40.0));

        let aligned = SimilarityAligner.align(&model, &target).unwrap();
        assert!(shape_eq(&aligned, &target));
    }

    #[test]
    fn test_estimate_errors() {
        let model = tooth_like();
        let point = Shape::new(vec![(1.0, 1.0); 6]).unwrap();
        assert_eq!(
            SimilarityTransform::estimate(&point, &model).unwrap_err(),
            FitError::DegenerateShape
        );

        let short = Shape::new(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert!(SimilarityTransform::estimate(&short, &model).is_err());
    }

    #[test]
    fn test_mean_shape_of_similar_copies() {
        let base = tooth_like();
        let copies: Vec<Shape> = [
            SimilarityTransform::IDENTITY,
            SimilarityTransform::new(3.0, 0.4, (10.0, 20.0)),
            SimilarityTransform::new(0.5, -1.1, (-7.0, 3.0)),
        ]
        .iter()
        .map(|t| t.apply(&base))
        .collect();

        let mean = mean_shape(&copies, 20).unwrap();
        assert!(f64_eq(mean.centroid().0, 0.0));
        assert!(f64_eq(mean.centroid().1, 0.0));

        // 平均形状与原形状只差一个相似变换.
        let back = SimilarityAligner.align(&mean, &base).unwrap();
        assert!(shape_eq(&back, &base));

        assert_eq!(mean_shape(&[], 10).unwrap_err(), FitError::EmptyPopulation);
    }
}
