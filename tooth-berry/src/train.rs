//! 训练张量 `GS` 的构建与持久化.
//!
//! `GS[牙齿][训练样本][landmark][剖面偏移]` 保存了每颗牙齿、每个训练样本、每个
//! landmark 处规范化后的剖面. 它是逐 landmark 建模的全部输入.

use crate::consts::PreprocessMethod;
use crate::dataset::ImageSource;
use crate::profile::{sample_shape_profiles, SampleSpec};
use crate::shape::ShapeAligner;
use crate::{DatasetError, FitError, FitResult, Shape, TrainError};
use ndarray::{
    s, Array4, ArrayView2, ArrayView3, ArrayView4, ArrayViewMut3, Axis, Ix4, OwnedRepr,
};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// npz 归档中保存 `GS` 的数组名.
const GS_NPY: &str = "gs.npy";

/// 训练张量 `GS`, 形状为 `[T, 样本数, L, 2k + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingTensor {
    data: Array4<f64>,
}

impl TrainingTensor {
    /// 直接由四维数组构建. 最后一维长度必须为奇数 `2k + 1`.
    pub fn from_array(data: Array4<f64>) -> FitResult<Self> {
        let len = data.dim().3;
        if len % 2 == 0 {
            return Err(FitError::ShapeMismatch {
                expected: len + 1,
                found: len,
            });
        }
        Ok(Self { data })
    }

    /// 牙齿个数 `T`.
    #[inline]
    pub fn n_teeth(&self) -> usize {
        self.data.dim().0
    }

    /// 训练样本个数.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.dim().1
    }

    /// 每颗牙齿的 landmark 个数 `L`.
    #[inline]
    pub fn n_landmarks(&self) -> usize {
        self.data.dim().2
    }

    /// 剖面长度 `2k + 1`.
    #[inline]
    pub fn profile_len(&self) -> usize {
        self.data.dim().3
    }

    /// 单侧采样像素个数 `k`.
    #[inline]
    pub fn half_width(&self) -> usize {
        self.profile_len() / 2
    }

    /// 某颗牙齿某个 landmark 在所有训练样本上的剖面, 形状 `[样本数, 2k + 1]`.
    ///
    /// 索引越界时程序 panic.
    #[inline]
    pub fn landmark_population(&self, tooth: usize, landmark: usize) -> ArrayView2<f64> {
        self.data.slice(s![tooth, .., landmark, ..])
    }

    /// 底层数据的不可变视图.
    #[inline]
    pub fn array_view(&self) -> ArrayView4<f64> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array4<f64> {
        self.data
    }

    /// 以 npz 格式写入 `w`, 返回写完的 `w`.
    pub fn write_npz<W: Write + Seek>(&self, w: W) -> Result<W, DatasetError> {
        let mut npz = NpzWriter::new(w);
        npz.add_array(GS_NPY, &self.data)?;
        Ok(npz.finish()?)
    }

    /// 从 npz 格式读取.
    pub fn read_npz<R: Read + Seek>(r: R) -> Result<Self, DatasetError> {
        let mut npz = NpzReader::new(r)?;
        let data = npz.by_name::<OwnedRepr<f64>, Ix4>(GS_NPY)?;
        Ok(Self::from_array(data)?)
    }

    /// 保存到路径 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        self.write_npz(File::create(path)?)?;
        Ok(())
    }

    /// 从路径 `path` 加载.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        Self::read_npz(File::open(path)?)
    }
}

/// 构建 `GS` 所需的标注输入.
///
/// - `samples`: 训练样本编号 (X 光片编号), 决定 `GS` 第二维的顺序;
/// - `ground_truth`: `XS[牙齿, 样本位置, 2L]`, 图像坐标系下的交错 landmark 坐标;
/// - `models`: `MS[牙齿, 2L]`, 模型坐标系下的牙齿模型.
#[derive(Clone, Debug)]
pub struct TrainingSet<'a> {
    samples: &'a [u32],
    ground_truth: ArrayView3<'a, f64>,
    models: ArrayView2<'a, f64>,
}

impl<'a> TrainingSet<'a> {
    /// 初始化并检查各输入形状是否一致.
    pub fn new(
        samples: &'a [u32],
        ground_truth: ArrayView3<'a, f64>,
        models: ArrayView2<'a, f64>,
    ) -> FitResult<Self> {
        let (t, n, coords) = ground_truth.dim();
        let mismatch = |expected, found| Err(FitError::ShapeMismatch { expected, found });
        if samples.is_empty() {
            return Err(FitError::EmptyPopulation);
        }
        if n != samples.len() {
            return mismatch(samples.len(), n);
        }
        if models.dim().0 != t {
            return mismatch(t, models.dim().0);
        }
        if models.dim().1 != coords {
            return mismatch(coords, models.dim().1);
        }
        if coords % 2 != 0 {
            return Err(FitError::OddCoordinates(coords));
        }
        if coords < 6 {
            return Err(FitError::TooFewLandmarks(coords / 2));
        }
        Ok(Self {
            samples,
            ground_truth,
            models,
        })
    }

    /// 牙齿个数.
    #[inline]
    pub fn n_teeth(&self) -> usize {
        self.models.dim().0
    }

    /// 每颗牙齿的 landmark 个数.
    #[inline]
    pub fn n_landmarks(&self) -> usize {
        self.models.dim().1 / 2
    }

    /// 训练样本编号.
    #[inline]
    pub fn samples(&self) -> &'a [u32] {
        self.samples
    }

    fn model_shape(&self, tooth: usize) -> FitResult<Shape> {
        Shape::from_flat(&self.models.row(tooth).to_vec())
    }

    fn truth_shape(&self, tooth: usize, pos: usize) -> FitResult<Shape> {
        Shape::from_flat(&self.ground_truth.slice(s![tooth, pos, ..]).to_vec())
    }
}

/// 构建训练张量 `GS`.
///
/// 对每个训练样本加载一次 `method` 预处理后的图像; 对每颗牙齿把模型形状对齐到
/// 该样本的真值标注上, 然后在每个 landmark 处采样并规范化剖面.
/// 结果只取决于图像和坐标, 完全可复现.
pub fn build_training_tensor<S, A>(
    source: &S,
    aligner: &A,
    set: &TrainingSet,
    method: PreprocessMethod,
    spec: &SampleSpec,
) -> Result<TrainingTensor, TrainError>
where
    S: ImageSource + ?Sized,
    A: ShapeAligner + ?Sized,
{
    let mut gs = empty_tensor(set, spec);
    for (pos, view) in gs.axis_iter_mut(Axis(1)).enumerate() {
        fill_sample(source, aligner, set, pos, method, spec, view)?;
    }
    Ok(TrainingTensor { data: gs })
}

fn empty_tensor(set: &TrainingSet, spec: &SampleSpec) -> Array4<f64> {
    let sh = (
        set.n_teeth(),
        set.samples().len(),
        set.n_landmarks(),
        spec.profile_len(),
    );
    log::info!(
        "Building training tensor {sh:?} (k = {}, {} training samples)",
        spec.half_width(),
        sh.1
    );
    Array4::zeros(sh)
}

/// 填充 `GS[.., pos, .., ..]`.
fn fill_sample<S, A>(
    source: &S,
    aligner: &A,
    set: &TrainingSet,
    pos: usize,
    method: PreprocessMethod,
    spec: &SampleSpec,
    mut out: ArrayViewMut3<f64>,
) -> Result<(), TrainError>
where
    S: ImageSource + ?Sized,
    A: ShapeAligner + ?Sized,
{
    let sample = set.samples()[pos];
    let img = source.load(sample, method)?;
    log::debug!("Sampling profiles of training sample {sample}...");

    for (tooth, mut g) in out.axis_iter_mut(Axis(0)).enumerate() {
        let tag = |source| TrainError::Sample {
            tooth,
            sample,
            source,
        };
        let model = set.model_shape(tooth).map_err(tag)?;
        let truth = set.truth_shape(tooth, pos).map_err(tag)?;
        let aligned = aligner.align(&model, &truth).map_err(tag)?;
        g.assign(&sample_shape_profiles(&img, &aligned, spec).map_err(tag)?);
    }
    Ok(())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

        /// 借助 `rayon`, 并行地构建训练张量 `GS`.
        ///
        /// 每个训练样本由一个任务独占填充, 结果与 [`build_training_tensor`] 逐位一致.
        pub fn par_build_training_tensor<S, A>(
            source: &S,
            aligner: &A,
            set: &TrainingSet,
            method: PreprocessMethod,
            spec: &SampleSpec,
        ) -> Result<TrainingTensor, TrainError>
        where
            S: ImageSource + Sync + ?Sized,
            A: ShapeAligner + Sync + ?Sized,
        {
            let mut gs = empty_tensor(set, spec);
            gs.axis_iter_mut(Axis(1))
                .into_par_iter()
                .enumerate()
                .try_for_each(|(pos, view)| {
                    fill_sample(source, aligner, set, pos, method, spec, view)
                })?;
            Ok(TrainingTensor { data: gs })
        }
    }
}
