//! 数据集操作.

use crate::consts::PreprocessMethod;
use crate::grey::GreyAccess;
use crate::DatasetError;
use std::path::{Path, PathBuf};

pub mod landmarks;
mod radiograph;

pub use radiograph::{to_bgr_array, Radiographs};

/// 预处理图像的来源.
///
/// 对给定训练样本编号和预处理方式, 返回一张可按 `(行, 列)` 读取灰度的图像.
pub trait ImageSource {
    /// 图像类型.
    type Image: GreyAccess;

    /// 加载第 `sample` 张 X 光片经 `method` 预处理后的图像.
    fn load(&self, sample: u32, method: PreprocessMethod) -> Result<Self::Image, DatasetError>;
}

/// 获取 `{用户主目录}/dataset/incisors` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    home_dataset_dir_with::<&str, _>([])
}

/// 获取 `{用户主目录}/dataset/incisors` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.push("incisors");
    ans.extend(it);
    Some(ans)
}
