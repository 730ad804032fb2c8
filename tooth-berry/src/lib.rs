#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为牙科 X 光片上的门牙主动形状模型 (ASM) 提供逐 landmark 的灰度剖面拟合函数.
//!
//! 该 crate 只回答一个问题: "在给定牙齿的给定 landmark 处, 这一段候选灰度剖面与学到的
//! 外观模型有多接近?" 迭代搜索、形状模型 (PCA) 和图像预处理都不在本 crate 之内,
//! 它们通过 trait 以外部协作者的形式接入.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要面向 8 颗门牙 × 40 个 landmark 的经典数据集布局,
//!   但所有数量均以参数形式传入, 对其它布局同样适用.
//! 2. 畸形输入 (重合的相邻 landmark, 长度不符的剖面, 越界采样) 会以 `Err` 返回,
//!   而不是 panic.
//!
//! # 开发计划
//!
//! ### 沿边界法线的剖面采样 ✅
//!
//! 由相邻两个 landmark 的中心差分估计切线, 旋转 90 度得到法线,
//! 再沿法线两侧各取 `k` 个像素 (负方向多取一个, 供差分使用).
//!
//! 实现位于 `tooth-berry/src/profile`.
//!
//! ### 剖面差分与 L1 规范化 ✅
//!
//! 使剖面对整体亮度缩放不敏感. 全平坦剖面保持原样, 以避免除零.
//!
//! 实现位于 `tooth-berry/src/profile/normalize.rs`.
//!
//! ### 训练张量 `GS` 的构建 ✅
//!
//! `[牙齿, 训练样本, landmark, 剖面偏移]` 四维张量. 提供串行与 `rayon` 并行两种实现,
//! 结果逐位一致. 可以 npz 格式持久化.
//!
//! 实现位于 `tooth-berry/src/train.rs`.
//!
//! ### 逐 landmark 统计模型与 Mahalanobis 距离 ✅
//!
//! 均值 + 总体协方差, 协方差奇异时使用 Moore–Penrose 伪逆. 伪逆在建模时只计算一次.
//!
//! 实现位于 `tooth-berry/src/model`.
//!
//! ### 形状对齐 ✅
//!
//! 闭式最小二乘相似变换, 以及用于消融实验的 Procrustes 平均形状.
//!
//! 实现位于 `tooth-berry/src/shape/align.rs`.
//!
//! ### 数据集加载 ✅
//!
//! landmark 文本文件与 (预处理后的) X 光片图像.
//!
//! 实现位于 `tooth-berry/src/dataset`.
//!
//! # 坐标约定
//!
//! landmark 以 `(x, y)` 表示, 图像以 `(行, 列)` 即 `(y, x)` 索引.
//! 采样时坐标向零截断, 不做插值.

/// 高精度平面点 / 向量, 形如 `(x, y)`.
pub type Point2d = (f64, f64);

/// 像素坐标, 形如 `(x, y)`. 允许为负, 以便描述越界位置.
pub type Pixel2d = (i64, i64);

pub mod consts;

mod error;

pub use error::{DatasetError, FitError, FitResult, TrainError};

pub mod grey;

pub mod shape;

pub use shape::{extract_coordinates, interleave, Shape};

pub mod profile;

pub mod train;

pub mod model;

pub mod dataset;

pub mod prelude;
