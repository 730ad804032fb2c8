//! 通用常量.

/// 数据集中的牙齿 (门牙) 个数.
pub const NB_TEETH: usize = 8;

/// 每颗牙齿轮廓的 landmark 个数.
pub const NB_LANDMARKS: usize = 40;

/// 带标注的训练 X 光片个数. 编号为 `1..=TRAINING_SET_LEN`.
pub const TRAINING_SET_LEN: u32 = 14;

/// 剖面单侧默认采样像素个数 `k`.
pub const DEFAULT_HALF_WIDTH: usize = 5;

/// 伪逆的默认相对截断阈值.
///
/// 小于等于 `rcond * 最大奇异值` 的奇异值视为零. 与 NumPy `pinv` 的默认值一致.
pub const DEFAULT_RCOND: f64 = 1e-15;

/// 预处理 (裁剪) 后的图像相对原始 X 光片的偏移.
pub mod crop {
    /// 裁剪区域左边界在原图中的 x 坐标.
    pub const OFFSET_X: f64 = 1234.0;

    /// 裁剪区域上边界在原图中的 y 坐标.
    pub const OFFSET_Y: f64 = 497.0;
}

/// 预处理方式. 对应预处理图像文件的标签.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PreprocessMethod {
    /// 原始 X 光片, 未裁剪.
    Original,

    /// 裁剪 + 对比度拉伸 (stretch contrast).
    Sc,

    /// 裁剪 + 对比度拉伸 + 降噪.
    Scd,

    /// 裁剪 + 直方图均衡化 (equalize histogram).
    Eh,

    /// 裁剪 + 直方图均衡化 + 降噪.
    Ehd,
}

impl PreprocessMethod {
    /// 所有预处理方式.
    pub const ALL: [PreprocessMethod; 5] = [
        PreprocessMethod::Original,
        PreprocessMethod::Sc,
        PreprocessMethod::Scd,
        PreprocessMethod::Eh,
        PreprocessMethod::Ehd,
    ];

    /// 文件名标签. 原始图像没有标签.
    #[inline]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Original => "",
            Self::Sc => "SC",
            Self::Scd => "SCD",
            Self::Eh => "EH",
            Self::Ehd => "EHD",
        }
    }

    /// 从标签解析. 大小写不敏感, 空串表示原始图像.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.tag().eq_ignore_ascii_case(tag.trim()))
    }

    /// 是否为裁剪后的图像?
    #[inline]
    pub const fn is_cropped(&self) -> bool {
        !matches!(self, Self::Original)
    }

    /// 该预处理图像相对 landmark 坐标系的偏移 `(x, y)`.
    #[inline]
    pub const fn offset(&self) -> (f64, f64) {
        if self.is_cropped() {
            (crop::OFFSET_X, crop::OFFSET_Y)
        } else {
            (0.0, 0.0)
        }
    }
}
