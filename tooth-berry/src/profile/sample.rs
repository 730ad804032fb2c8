use super::SampleSpec;
use crate::grey::GreyAccess;
use crate::profile::normalize::difference;
use crate::{FitError, FitResult, Pixel2d, Point2d, Shape};
use ndarray::Array1;

/// 沿法线采集的原始 (未差分) 灰度剖面, 长度为 `2k + 2`.
///
/// 顺序: 负法线方向最远点, ..., landmark 本身, ..., 正法线方向最远点.
/// 负方向比正方向多一个点, 差分后两侧对称.
#[derive(Clone, Debug, PartialEq)]
pub struct RawProfile {
    values: Vec<f64>,
    coords: Vec<Pixel2d>,
}

impl RawProfile {
    /// 灰度值.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 每个采样点的像素坐标 `(x, y)`, 与 [`Self::values`] 一一对应. 仅供调试/可视化.
    #[inline]
    pub fn coords(&self) -> &[Pixel2d] {
        &self.coords
    }

    /// 采样点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有采样点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 一阶差分, 长度 `2k + 1`.
    #[inline]
    pub fn differenced(&self) -> Array1<f64> {
        difference(&self.values)
    }
}

/// 第 `i` 个 landmark 处的边界法线.
///
/// 以循环前驱指向循环后继的向量 `(dx, dy)` 估计切线, 法线为 `(-dy, dx) / |d|`.
/// 前驱与后继重合时返回 [`FitError::CoincidentNeighbours`], `i` 越界时返回
/// [`FitError::NoSuchLandmark`].
pub fn profile_normal(shape: &Shape, i: usize) -> FitResult<Point2d> {
    let ((x_min, y_min), (x_max, y_max)) = shape.neighbours(i)?;
    let (dx, dy) = (x_max - x_min, y_max - y_min);
    let len = dx.hypot(dy);
    if len == 0.0 || !len.is_finite() {
        return Err(FitError::CoincidentNeighbours { landmark: i });
    }
    Ok((-dy / len, dx / len))
}

/// 以 `centre` 为中心, 沿 `normal` 方向每侧采 `k` 个像素 (负方向多一个).
///
/// 坐标向零截断, 不做插值. 任一采样点越界都会返回 [`FitError::OutOfBounds`].
pub fn sample_along<I: GreyAccess + ?Sized>(
    img: &I,
    (x, y): Point2d,
    (nx, ny): Point2d,
    k: usize,
) -> FitResult<RawProfile> {
    let positions = (1..=k + 1)
        .rev()
        .map(|j| -(j as f64))
        .chain(std::iter::once(0.0))
        .chain((1..=k).map(|j| j as f64));

    let mut values = Vec::with_capacity(2 * k + 2);
    let mut coords = Vec::with_capacity(2 * k + 2);
    for t in positions {
        let pixel = ((x + t * nx) as i64, (y + t * ny) as i64);
        values.push(img.grey_at(pixel)?);
        coords.push(pixel);
    }
    debug_assert_eq!(values.len(), 2 * k + 2);

    Ok(RawProfile { values, coords })
}

/// 在 `img` 上沿 `shape` 第 `i` 个 landmark 的法线采集原始剖面.
///
/// landmark 坐标先减去 `spec` 的偏移, 以对应 (可能被裁剪的) 图像像素坐标.
pub fn sample_raw<I: GreyAccess + ?Sized>(
    img: &I,
    shape: &Shape,
    i: usize,
    spec: &SampleSpec,
) -> FitResult<RawProfile> {
    let normal = profile_normal(shape, i)?;
    let (ox, oy) = spec.offset();
    let (x, y) = shape[i];
    sample_along(img, (x - ox, y - oy), normal, spec.half_width())
}

#[cfg(test)]
mod tests {
    use super::{profile_normal, sample_along, sample_raw};
    use crate::profile::SampleSpec;
    use crate::shape::SimilarityTransform;
    use crate::{FitError, Shape};
    use ndarray::{array, Array2};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_normal_of_horizontal_tangent() {
        let shape = Shape::new(vec![(0.0, 0.0), (1.0, -1.0), (2.0, 0.0)]).unwrap();
        let (nx, ny) = profile_normal(&shape, 1).unwrap();
        assert!(f64_eq(nx, 0.0));
        assert!(f64_eq(ny, 1.0));
    }

    #[test]
    fn test_normal_wraps_at_ends() {
        let square = Shape::new(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        // landmark 0: 前驱 (0, 2), 后继 (2, 0). d = (2, -2).
        let (nx, ny) = profile_normal(&square, 0).unwrap();
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert!(f64_eq(nx, r) && f64_eq(ny, r));

        // landmark 3: 前驱 (2, 2), 后继 (0, 0). d = (-2, -2).
        let (nx, ny) = profile_normal(&square, 3).unwrap();
        assert!(f64_eq(nx, r) && f64_eq(ny, -r));
    }

    #[test]
    fn test_coincident_neighbours() {
        let shape = Shape::new(vec![(1.0, 1.0), (5.0, 5.0), (1.0, 1.0)]).unwrap();
        assert_eq!(
            profile_normal(&shape, 1).unwrap_err(),
            FitError::CoincidentNeighbours { landmark: 1 }
        );
    }

    #[test]
    fn test_normal_similarity_invariance() {
        let shape = Shape::new(vec![
            (3.0, 1.0),
            (7.0, 2.0),
            (9.0, 6.0),
            (5.0, 9.0),
            (1.0, 5.0),
        ])
        .unwrap();
        let t = SimilarityTransform::new(3.7, 0.0, (-12.0, 40.0));
        let moved = t.apply(&shape);
        for i in 0..shape.len() {
            let a = profile_normal(&shape, i).unwrap();
            let b = profile_normal(&moved, i).unwrap();
            assert!(f64_eq(a.0, b.0) && f64_eq(a.1, b.1));
        }

        // 旋转时法线随之旋转.
        let theta = 0.9_f64;
        let rotated = SimilarityTransform::new(0.3, theta, (5.0, 5.0)).apply(&shape);
        for i in 0..shape.len() {
            let (ax, ay) = profile_normal(&shape, i).unwrap();
            let (bx, by) = profile_normal(&rotated, i).unwrap();
            assert!(f64_eq(bx, ax * theta.cos() - ay * theta.sin()));
            assert!(f64_eq(by, ax * theta.sin() + ay * theta.cos()));
        }
    }

    #[test]
    fn test_sample_vertical_profile() {
        // 第 1 列的灰度值为 10 * 行号.
        let img = Array2::<u8>::from_shape_fn((8, 3), |(h, w)| if w == 1 { 10 * h as u8 } else { 0 });
        let shape = Shape::new(vec![(0.0, 5.0), (1.0, 4.0), (2.0, 5.0)]).unwrap();

        let raw = sample_raw(&img, &shape, 1, &SampleSpec::new(2)).unwrap();
        assert_eq!(raw.values(), &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(
            raw.coords(),
            &[(1, 1), (1, 2), (1, 3), (1, 4), (1, 5), (1, 6)]
        );
        assert_eq!(raw.differenced(), array![10.0, 10.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_sample_with_offset() {
        let img = Array2::<u8>::from_shape_fn((8, 3), |(h, w)| if w == 1 { 10 * h as u8 } else { 0 });
        // 原图坐标系下整体平移 (100, 200).
        let shape = Shape::new(vec![(100.0, 205.0), (101.0, 204.0), (102.0, 205.0)]).unwrap();
        let spec = SampleSpec::with_offset(2, (100.0, 200.0)).unwrap();

        let raw = sample_raw(&img, &shape, 1, &spec).unwrap();
        assert_eq!(raw.values(), &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_sample_truncates_coordinates() {
        let img = Array2::<f32>::from_shape_fn((4, 4), |(h, w)| (h * 4 + w) as f32);
        // 法线 (0.6, 0.8), 中心 (1.5, 1.5).
        let raw = sample_along(&img, (1.5, 1.5), (0.6, 0.8), 0).unwrap();
        // -1 步: (0.9, 0.7) -> (0, 0); 中心: (1, 1).
        assert_eq!(raw.coords(), &[(0, 0), (1, 1)]);
        assert_eq!(raw.values(), &[0.0, 5.0]);
    }

    #[test]
    fn test_sample_out_of_bounds() {
        let img = Array2::<u8>::zeros((5, 5));
        let shape = Shape::new(vec![(0.0, 1.0), (1.0, 0.0), (2.0, 1.0)]).unwrap();
        // 法线 (0, 1), 负方向第 3 个点 y = -3.
        let err = sample_raw(&img, &shape, 1, &SampleSpec::new(2)).unwrap_err();
        assert!(matches!(err, FitError::OutOfBounds { y: -3, .. }));
    }
}
