//! landmark 标注加载器.
//!
//! 标注文件为纯文本, 每行一个坐标值, x 与 y 交替出现. 提供迭代器风格的数据集获取模式.

use crate::consts::{NB_TEETH, TRAINING_SET_LEN};
use crate::{DatasetError, FitError, Shape};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// 第 `sample` 张 X 光片第 `tooth` 颗牙齿 (均从 1 开始) 的标注文件路径:
/// `{root}/landmarks/original/landmarks{sample}-{tooth}.txt`.
pub fn landmark_path<P: AsRef<Path>>(root: P, sample: u32, tooth: usize) -> PathBuf {
    let mut p = root.as_ref().to_owned();
    p.push("landmarks");
    p.push("original");
    p.push(format!("landmarks{sample}-{tooth}.txt"));
    p
}

/// 从 `r` 解析一个形状. `path` 仅用于错误信息.
pub fn parse_landmarks<R: BufRead>(r: R, path: &Path) -> Result<Shape, DatasetError> {
    let mut flat = Vec::with_capacity(2 * crate::consts::NB_LANDMARKS);
    for (idx, line) in r.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let v: f64 = text.parse().map_err(|_| DatasetError::Landmark {
            path: path.to_owned(),
            line: idx + 1,
        })?;
        flat.push(v);
    }
    Ok(Shape::from_flat(&flat)?)
}

/// 读取一个标注文件.
pub fn read_landmarks<P: AsRef<Path>>(path: P) -> Result<Shape, DatasetError> {
    let path = path.as_ref();
    parse_landmarks(BufReader::new(File::open(path)?), path)
}

/// 从指定样本编号和路径创建标注加载器. 每次迭代给出一张 X 光片上全部 `n_teeth`
/// 颗牙齿的形状.
///
/// # 注意
///
/// 1. `root` 必须是目录, 否则程序 panic.
/// 2. 缺失的标注文件会在迭代时以 `Result::Err` 返回.
pub fn landmark_loader<I, P>(samples: I, root: P, n_teeth: usize) -> LandmarkLoader
where
    I: IntoIterator<Item = u32>,
    P: AsRef<Path>,
{
    let root = root.as_ref().to_owned();
    assert!(root.is_dir());

    let mut data: Vec<u32> = samples.into_iter().collect();
    data.reverse();

    LandmarkLoader {
        root,
        n_teeth,
        data_rev: data,
    }
}

/// 按编号顺序加载全部训练 X 光片 (`1..=TRAINING_SET_LEN`) 上 8 颗门牙的标注.
#[inline]
pub fn full_landmark_loader<P: AsRef<Path>>(root: P) -> LandmarkLoader {
    landmark_loader(1..=TRAINING_SET_LEN, root, NB_TEETH)
}

/// landmark 标注加载器.
#[derive(Debug)]
pub struct LandmarkLoader {
    root: PathBuf,
    n_teeth: usize,
    data_rev: Vec<u32>,
}

impl Iterator for LandmarkLoader {
    type Item = (u32, Result<Vec<Shape>, DatasetError>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;
        let shapes = (1..=self.n_teeth)
            .map(|tooth| read_landmarks(landmark_path(&self.root, idx, tooth)))
            .collect();
        Some((idx, shapes))
    }
}

impl ExactSizeIterator for LandmarkLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

/// 把按样本组织的形状 `per_sample[样本位置][牙齿]` 组装成 `XS[牙齿, 样本位置, 2L]`.
///
/// 所有形状的 landmark 个数、每个样本的牙齿个数必须一致.
pub fn ground_truth_tensor(per_sample: &[Vec<Shape>]) -> Result<Array3<f64>, FitError> {
    let first = per_sample
        .first()
        .and_then(|teeth| teeth.first())
        .ok_or(FitError::EmptyPopulation)?;
    let (n_teeth, coords) = (per_sample[0].len(), 2 * first.len());

    let mut xs = Array3::<f64>::zeros((n_teeth, per_sample.len(), coords));
    for (pos, teeth) in per_sample.iter().enumerate() {
        if teeth.len() != n_teeth {
            return Err(FitError::ShapeMismatch {
                expected: n_teeth,
                found: teeth.len(),
            });
        }
        for (tooth, shape) in teeth.iter().enumerate() {
            let flat = shape.to_flat();
            if flat.len() != coords {
                return Err(FitError::ShapeMismatch {
                    expected: coords,
                    found: flat.len(),
                });
            }
            for (dst, v) in xs.slice_mut(ndarray::s![tooth, pos, ..]).iter_mut().zip(flat) {
                *dst = v;
            }
        }
    }
    Ok(xs)
}
