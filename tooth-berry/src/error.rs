//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 采样、建模或打分的运行时错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// landmark 的两个相邻点重合, 法线无定义.
    #[error("landmark {landmark}: neighbouring points coincide, profile normal is undefined")]
    CoincidentNeighbours {
        /// 出错的 landmark 索引.
        landmark: usize,
    },

    /// 采样点 (截断后) 落在图像之外.
    #[error("profile pixel ({x}, {y}) out of bounds for {width}x{height} image")]
    OutOfBounds {
        /// 像素 x 坐标 (列).
        x: i64,
        /// 像素 y 坐标 (行).
        y: i64,
        /// 图像宽.
        width: usize,
        /// 图像高.
        height: usize,
    },

    /// landmark 索引超出形状范围.
    #[error("landmark index {landmark} out of range for a shape of {len} landmarks")]
    NoSuchLandmark {
        /// 出错的 landmark 索引.
        landmark: usize,
        /// 形状的 landmark 个数.
        len: usize,
    },

    /// 剖面维数为 0.
    #[error("profiles must have at least one element")]
    EmptyProfile,

    /// 闭合轮廓至少需要 3 个 landmark.
    #[error("a closed shape needs at least 3 landmarks, got {0}")]
    TooFewLandmarks(usize),

    /// 交错坐标序列长度为奇数.
    #[error("interleaved coordinates must have even length, got {0}")]
    OddCoordinates(usize),

    /// 向量长度与期望不符.
    #[error("expected a vector of length {expected}, got {found}")]
    ShapeMismatch {
        /// 期望长度.
        expected: usize,
        /// 实际长度.
        found: usize,
    },

    /// 没有任何训练样本.
    #[error("no training samples to build a model from")]
    EmptyPopulation,

    /// 形状退化 (所有点重合), 无法估计相似变换.
    #[error("degenerate shape: all points coincide")]
    DegenerateShape,

    /// 不存在该 (牙齿, landmark) 的模型.
    #[error("no fitting model for tooth {tooth}, landmark {landmark}")]
    NoSuchModel {
        /// 牙齿索引.
        tooth: usize,
        /// landmark 索引.
        landmark: usize,
    },

    /// 线性代数后端错误.
    #[error("linear algebra failure: {0}")]
    Linalg(String),
}

/// 采样 / 建模 / 打分运行时错误.
pub type FitResult<T> = Result<T, FitError>;

/// 数据集读写错误.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 图像解码错误.
    #[error("image error: {0}")]
    Image(#[from] ::image::ImageError),

    /// landmark 文件格式错误.
    #[error("malformed landmark file {path:?} at line {line}")]
    Landmark {
        /// 文件路径.
        path: PathBuf,
        /// 行号 (从 1 开始).
        line: usize,
    },

    /// 读取 npz 错误.
    #[error("npz read error: {0}")]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    /// 写入 npz 错误.
    #[error("npz write error: {0}")]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    /// 模型 (反) 序列化错误.
    #[error("model serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 持久化数据内容不合法.
    #[error(transparent)]
    Fit(#[from] FitError),
}

/// 构建训练张量的错误.
#[derive(Debug, Error)]
pub enum TrainError {
    /// 加载图像或标注失败.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// 在某颗牙齿、某个训练样本上采样失败.
    #[error("tooth {tooth}, training sample {sample}: {source}")]
    Sample {
        /// 牙齿索引.
        tooth: usize,
        /// 训练样本编号.
        sample: u32,
        /// 底层错误.
        #[source]
        source: FitError,
    },

    /// 输入形状等其它错误.
    #[error(transparent)]
    Fit(#[from] FitError),
}
