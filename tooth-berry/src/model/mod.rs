//! 逐 (牙齿, landmark) 的拟合函数.
//!
//! 每个模型由训练张量 `GS[t, .., i, ..]` 估计得到, 伪逆在建模时只算一次,
//! 之后对候选剖面的打分只是一次矩阵乘法.

mod landmark;
pub mod pinv;

pub use landmark::{LandmarkModel, LandmarkStats};
pub use pinv::pseudo_inverse;

use crate::consts::DEFAULT_RCOND;
use crate::train::TrainingTensor;
use crate::{FitError, FitResult};
use ndarray::ArrayView1;

/// 全部牙齿、全部 landmark 的模型集合, 按 `牙齿 × L + landmark` 平铺存储.
#[derive(Clone, Debug, PartialEq)]
pub struct FittingModels {
    models: Vec<LandmarkModel>,
    n_teeth: usize,
    n_landmarks: usize,
    rcond: f64,
}

impl FittingModels {
    /// 由训练张量构建全部模型, 使用默认截断阈值 [`DEFAULT_RCOND`].
    #[inline]
    pub fn from_tensor(gs: &TrainingTensor) -> FitResult<Self> {
        Self::build(gs, DEFAULT_RCOND)
    }

    /// 由训练张量构建全部模型. 伪逆中小于等于 `rcond × 最大奇异值` 的奇异值视为零.
    pub fn build(gs: &TrainingTensor, rcond: f64) -> FitResult<Self> {
        let (t, l) = (gs.n_teeth(), gs.n_landmarks());
        log::info!("Building {} fitting models ({t} teeth x {l} landmarks)...", t * l);
        let models = (0..t * l)
            .map(|idx| LandmarkModel::from_samples(gs.landmark_population(idx / l, idx % l), rcond))
            .collect::<FitResult<Vec<_>>>()?;
        Ok(Self::assemble(models, t, l, rcond))
    }

    fn assemble(models: Vec<LandmarkModel>, n_teeth: usize, n_landmarks: usize, rcond: f64) -> Self {
        let ans = Self {
            models,
            n_teeth,
            n_landmarks,
            rcond,
        };
        for ((tooth, landmark), m) in ans.iter() {
            if m.rank() == 0 {
                log::warn!("tooth {tooth}, landmark {landmark}: covariance vanishes, every profile scores 0");
            } else if m.is_singular() {
                log::debug!(
                    "tooth {tooth}, landmark {landmark}: singular covariance (rank {} < {})",
                    m.rank(),
                    m.dim()
                );
            }
        }
        log::info!(
            "Fitting models ready, {} of {} have a singular covariance",
            ans.singular_count(),
            ans.models.len()
        );
        ans
    }

    /// 牙齿个数.
    #[inline]
    pub fn n_teeth(&self) -> usize {
        self.n_teeth
    }

    /// 每颗牙齿的 landmark 个数.
    #[inline]
    pub fn n_landmarks(&self) -> usize {
        self.n_landmarks
    }

    /// 建模时使用的截断阈值.
    #[inline]
    pub fn rcond(&self) -> f64 {
        self.rcond
    }

    /// 剖面长度 `2k + 1`. 没有任何模型时为 `None`.
    pub fn profile_len(&self) -> Option<usize> {
        self.models.first().map(LandmarkModel::dim)
    }

    /// 获取第 `tooth` 颗牙齿第 `landmark` 个 landmark 的模型.
    pub fn get(&self, tooth: usize, landmark: usize) -> Option<&LandmarkModel> {
        if tooth >= self.n_teeth || landmark >= self.n_landmarks {
            return None;
        }
        self.models.get(tooth * self.n_landmarks + landmark)
    }

    fn get_or_err(&self, tooth: usize, landmark: usize) -> FitResult<&LandmarkModel> {
        self.get(tooth, landmark)
            .ok_or(FitError::NoSuchModel { tooth, landmark })
    }

    /// 候选剖面 `g` 在 `(tooth, landmark)` 处的 Mahalanobis 距离. 越小越好.
    pub fn score(&self, tooth: usize, landmark: usize, g: ArrayView1<f64>) -> FitResult<f64> {
        self.get_or_err(tooth, landmark)?.score(g)
    }

    /// `(tooth, landmark)` 处的拟合函数 `f(g)`.
    ///
    /// 返回的闭包借用 `self`, 可以反复调用而不重复任何矩阵分解.
    pub fn fitting_function(
        &self,
        tooth: usize,
        landmark: usize,
    ) -> FitResult<impl Fn(ArrayView1<f64>) -> FitResult<f64> + '_> {
        let model = self.get_or_err(tooth, landmark)?;
        Ok(move |g: ArrayView1<f64>| model.score(g))
    }

    /// 协方差奇异的模型个数.
    pub fn singular_count(&self) -> usize {
        self.models.iter().filter(|m| m.is_singular()).count()
    }

    /// 按 `((牙齿, landmark), 模型)` 迭代全部模型.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &LandmarkModel)> + '_ {
        let l = self.n_landmarks;
        self.models
            .iter()
            .enumerate()
            .map(move |(idx, m)| ((idx / l, idx % l), m))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        impl FittingModels {
            /// 借助 `rayon`, 并行地构建全部模型. 结果与 [`FittingModels::build`] 一致.
            pub fn par_build(gs: &TrainingTensor, rcond: f64) -> FitResult<Self> {
                let (t, l) = (gs.n_teeth(), gs.n_landmarks());
                log::info!("Building {} fitting models in parallel...", t * l);
                let models = (0..t * l)
                    .into_par_iter()
                    .map(|idx| {
                        LandmarkModel::from_samples(gs.landmark_population(idx / l, idx % l), rcond)
                    })
                    .collect::<FitResult<Vec<_>>>()?;
                Ok(Self::assemble(models, t, l, rcond))
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        use crate::DatasetError;
        use flate2::read::ZlibDecoder;
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use serde::{Deserialize, Serialize};
        use std::fs::File;
        use std::io::{BufReader, BufWriter, Read, Write};
        use std::path::Path;

        /// 持久化格式. 只保存统计量, 伪逆在加载时重新计算.
        #[derive(Serialize, Deserialize)]
        struct Persisted {
            n_teeth: usize,
            n_landmarks: usize,
            rcond: f64,
            stats: Vec<LandmarkStats>,
        }

        impl FittingModels {
            /// 以 zlib 压缩的 bincode 格式写入 `w`.
            pub fn write_to<W: Write>(&self, w: W) -> Result<(), DatasetError> {
                let p = Persisted {
                    n_teeth: self.n_teeth,
                    n_landmarks: self.n_landmarks,
                    rcond: self.rcond,
                    stats: self.models.iter().map(|m| m.stats().clone()).collect(),
                };
                let mut e = ZlibEncoder::new(w, Compression::best());
                bincode::serialize_into(&mut e, &p)?;
                e.finish()?.flush()?;
                Ok(())
            }

            /// 读取 [`FittingModels::write_to`] 写入的模型.
            ///
            /// 模型个数与 `牙齿数 × L` 不符、乘积溢出或统计量维数不合法时返回 [`FitError`].
            pub fn read_from<R: Read>(r: R) -> Result<Self, DatasetError> {
                let p: Persisted = bincode::deserialize_from(ZlibDecoder::new(r))?;
                let expected = p.n_teeth.checked_mul(p.n_landmarks).ok_or(FitError::ShapeMismatch {
                    expected: p.n_teeth,
                    found: p.n_landmarks,
                })?;
                if p.stats.len() != expected {
                    return Err(FitError::ShapeMismatch {
                        expected,
                        found: p.stats.len(),
                    }
                    .into());
                }
                let models = p
                    .stats
                    .into_iter()
                    .map(|s| {
                        let (mean, covariance) = s.into_parts();
                        LandmarkModel::new(LandmarkStats::from_parts(mean, covariance)?, p.rcond)
                    })
                    .collect::<FitResult<Vec<_>>>()?;
                Ok(Self::assemble(models, p.n_teeth, p.n_landmarks, p.rcond))
            }

            /// 保存到路径 `path`.
            pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
                self.write_to(BufWriter::new(File::create(path)?))
            }

            /// 从路径 `path` 加载.
            pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
                Self::read_from(BufReader::new(File::open(path)?))
            }
        }
    }
}
