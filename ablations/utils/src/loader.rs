//! 对 `tooth-berry::dataset` 的更一层封装. 从环境变量读取实验配置.

use std::env;
use std::path::{Path, PathBuf};
use tooth_berry::consts::{PreprocessMethod, DEFAULT_HALF_WIDTH};
use tooth_berry::dataset::landmarks::{self, LandmarkLoader};
use tooth_berry::dataset::{self, Radiographs};

/// 获取数据集根目录.
///
/// 1. 若环境变量 `$TOOTH_DATASET_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/incisors`.
pub fn dataset_dir_from_env_or_home() -> PathBuf {
    match env::var("TOOTH_DATASET_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => dataset::home_dataset_dir().expect("Cannot locate home directory"),
    }
}

/// 获取预处理方式.
///
/// 读取 `$TOOTH_METHOD` (`SC`, `SCD`, `EH`, `EHD`, 或空串表示原始图像);
/// 未设置时使用 `SCD`. 无法识别的值会使程序 panic.
pub fn method_from_env() -> PreprocessMethod {
    match env::var("TOOTH_METHOD") {
        Ok(tag) => PreprocessMethod::from_tag(&tag)
            .unwrap_or_else(|| panic!("Unknown preprocessing method `{tag}`")),
        Err(_) => PreprocessMethod::Scd,
    }
}

/// 获取剖面单侧采样像素个数 `k`. 读取 `$TOOTH_K`, 未设置时使用默认值.
pub fn half_width_from_env() -> usize {
    match env::var("TOOTH_K") {
        Ok(k) => k
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("`$TOOTH_K` must be a non-negative integer, got `{k}`")),
        Err(_) => DEFAULT_HALF_WIDTH,
    }
}

/// 获取全部训练 X 光片的标注加载器.
#[inline]
pub fn landmark_loader<P: AsRef<Path>>(root: P) -> LandmarkLoader {
    landmarks::full_landmark_loader(root)
}

/// 获取 X 光片图像源.
#[inline]
pub fn radiographs<P: AsRef<Path>>(root: P) -> Radiographs {
    Radiographs::new(root)
}
