//! X 光片 (及其预处理版本) 加载器.

use super::ImageSource;
use crate::consts::PreprocessMethod;
use crate::DatasetError;
use image::{DynamicImage, GenericImageView};
use ndarray::Array3;
use std::path::{Path, PathBuf};

/// 磁盘上的 X 光片目录.
///
/// 目录布局:
///
/// - 原始图像: `{root}/radiographs/{编号:02}.tif`;
/// - 预处理图像: `{root}/preprocessed/{标签}/{编号:02}.png`, 标签见
///   [`PreprocessMethod::tag`].
#[derive(Clone, Debug)]
pub struct Radiographs {
    root: PathBuf,
}

impl Radiographs {
    /// 初始化. `root` 必须是目录, 否则程序 panic.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_owned();
        assert!(root.is_dir(), "数据集目录 {root:?} 不存在");
        Self { root }
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 第 `sample` 张 X 光片经 `method` 预处理后的文件路径.
    pub fn image_path(&self, sample: u32, method: PreprocessMethod) -> PathBuf {
        image_path(&self.root, sample, method)
    }
}

fn image_path(root: &Path, sample: u32, method: PreprocessMethod) -> PathBuf {
    let mut p = root.to_owned();
    match method {
        PreprocessMethod::Original => {
            p.push("radiographs");
            p.push(format!("{sample:02}.tif"));
        }
        cropped => {
            p.push("preprocessed");
            p.push(cropped.tag());
            p.push(format!("{sample:02}.png"));
        }
    }
    p
}

impl ImageSource for Radiographs {
    type Image = Array3<u8>;

    fn load(&self, sample: u32, method: PreprocessMethod) -> Result<Array3<u8>, DatasetError> {
        let path = self.image_path(sample, method);
        log::debug!("Loading {path:?}");
        Ok(to_bgr_array(image::open(path)?))
    }
}

/// 把图像转换为 `(高, 宽, 通道)` 数组.
///
/// 灰度图只有一个通道; 彩色图按 BGR 顺序排列, 第 0 通道为蓝色.
pub fn to_bgr_array(img: DynamicImage) -> Array3<u8> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    if img.color().has_color() {
        let rgb = img.to_rgb8();
        Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
            rgb.get_pixel(c as u32, r as u32)[2 - ch]
        })
    } else {
        let grey = img.to_luma8();
        Array3::from_shape_fn((h, w, 1), |(r, c, _)| {
            grey.get_pixel(c as u32, r as u32)[0]
        })
    }
}
