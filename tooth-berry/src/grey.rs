//! 只读灰度图像访问.
//!
//! 采样器只需要读取某个像素第 0 通道的值. 对于灰度图就是灰度,
//! 对于以 BGR 顺序加载的彩色图则是蓝色通道.

use crate::{FitError, FitResult, Pixel2d};
use image::{ImageBuffer, Pixel};
use ndarray::{ArrayBase, Data, Ix2, Ix3};
use num::ToPrimitive;
use std::ops::Deref;

/// 表明一个可以按 `(行, 列)` 读取第 0 通道值的图像.
pub trait GreyAccess {
    /// 图像的分辨率 (高, 宽).
    fn dims(&self) -> (usize, usize);

    /// 读取 `(row, col)` 处第 0 通道的值.
    ///
    /// 调用方保证不越界, 否则程序 panic.
    fn grey(&self, row: usize, col: usize) -> f64;

    /// 读取像素坐标 `(x, y)` 处第 0 通道的值. 越界时返回 [`FitError::OutOfBounds`].
    fn grey_at(&self, (x, y): Pixel2d) -> FitResult<f64> {
        let (height, width) = self.dims();
        if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
            return Err(FitError::OutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        Ok(self.grey(y as usize, x as usize))
    }
}

/// 单通道 `(高, 宽)` 数组.
impl<S> GreyAccess for ArrayBase<S, Ix2>
where
    S: Data,
    S::Elem: ToPrimitive,
{
    #[inline]
    fn dims(&self) -> (usize, usize) {
        self.dim()
    }

    #[inline]
    fn grey(&self, row: usize, col: usize) -> f64 {
        self[(row, col)].to_f64().unwrap_or(0.0)
    }
}

/// 多通道 `(高, 宽, 通道)` 数组, 只读第 0 通道. 没有通道的数组视为空图像.
impl<S> GreyAccess for ArrayBase<S, Ix3>
where
    S: Data,
    S::Elem: ToPrimitive,
{
    #[inline]
    fn dims(&self) -> (usize, usize) {
        match self.dim() {
            (_, _, 0) => (0, 0),
            (h, w, _) => (h, w),
        }
    }

    #[inline]
    fn grey(&self, row: usize, col: usize) -> f64 {
        self[(row, col, 0)].to_f64().unwrap_or(0.0)
    }
}

/// `image` crate 的图像缓冲, 只读第 0 通道.
impl<P, C> GreyAccess for ImageBuffer<P, C>
where
    P: Pixel,
    P::Subpixel: ToPrimitive,
    C: Deref<Target = [P::Subpixel]>,
{
    #[inline]
    fn dims(&self) -> (usize, usize) {
        (self.height() as usize, self.width() as usize)
    }

    #[inline]
    fn grey(&self, row: usize, col: usize) -> f64 {
        self.get_pixel(col as u32, row as u32).channels()[0]
            .to_f64()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::GreyAccess;
    use crate::FitError;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_array2_access() {
        let img = Array2::<u8>::from_shape_fn((3, 4), |(h, w)| (h * 10 + w) as u8);
        assert_eq!(img.dims(), (3, 4));
        assert_eq!(img.grey_at((3, 2)).unwrap(), 23.0);
        assert_eq!(
            img.grey_at((4, 0)).unwrap_err(),
            FitError::OutOfBounds {
                x: 4,
                y: 0,
                width: 4,
                height: 3
            }
        );
        assert!(img.grey_at((0, -1)).is_err());
    }

    #[test]
    fn test_array3_reads_channel_zero() {
        let img = Array3::<u8>::from_shape_fn((2, 2, 3), |(_, _, c)| [7, 100, 200][c]);
        assert_eq!(img.dims(), (2, 2));
        assert_eq!(img.grey_at((1, 1)).unwrap(), 7.0);

        let empty = Array3::<u8>::zeros((2, 2, 0));
        assert!(empty.grey_at((0, 0)).is_err());
    }

    #[test]
    fn test_image_buffer_access() {
        let img = image::GrayImage::from_fn(5, 2, |x, y| image::Luma([(x + 10 * y) as u8]));
        assert_eq!(img.dims(), (2, 5));
        assert_eq!(img.grey_at((4, 1)).unwrap(), 14.0);
    }
}
