//! 🦷欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{DatasetError, FitError, FitResult, TrainError};
pub use crate::{Pixel2d, Point2d, Shape};

pub use crate::consts::{
    PreprocessMethod, DEFAULT_HALF_WIDTH, DEFAULT_RCOND, NB_LANDMARKS, NB_TEETH,
    TRAINING_SET_LEN,
};

pub use crate::grey::GreyAccess;

pub use crate::shape::{mean_shape, ShapeAligner, SimilarityAligner, SimilarityTransform};

pub use crate::profile::{sample_profile, sample_shape_profiles, SampleSpec};

pub use crate::train::{build_training_tensor, TrainingSet, TrainingTensor};

#[cfg(feature = "rayon")]
pub use crate::train::par_build_training_tensor;

pub use crate::model::{FittingModels, LandmarkModel, LandmarkStats};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, ImageSource, Radiographs};
