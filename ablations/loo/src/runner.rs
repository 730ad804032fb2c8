//! 程序运行函数.

use crate::result::{AccTimer, FoldResult, LooResult};
use ndarray::{Array1, Array2, ArrayView1};
use std::thread;
use tooth_berry::dataset::landmarks::ground_truth_tensor;
use tooth_berry::prelude::*;
use tooth_berry::profile::{normalize_l1, profile_normal, sample_along};
use utils::loader;

/// 候选位置沿法线两侧的最大偏移 (像素).
pub const MAX_SHIFT: i64 = 4;

/// Procrustes 平均形状的最大迭代次数.
const MEAN_SHAPE_ITER: usize = 30;

/// 每张 X 光片上全部牙齿的标注.
type Annotated = (u32, Vec<Shape>);

/// 实际运行.
pub fn run() -> LooResult {
    let real_time = AccTimer::new();

    let root = loader::dataset_dir_from_env_or_home();
    assert!(root.is_dir(), "Dataset directory {root:?} not found");
    let method = loader::method_from_env();
    let spec = SampleSpec::for_method(loader::half_width_from_env(), method);
    log::info!(
        "Leave-one-out on {root:?}, method `{}`, k = {}",
        method.tag(),
        spec.half_width()
    );

    let annotated: Vec<Annotated> = loader::landmark_loader(&root)
        .map(|(id, r)| {
            let shapes =
                r.unwrap_or_else(|e| panic!("Loading landmarks of radiograph {id} error: {e}"));
            (id, shapes)
        })
        .collect();
    assert!(annotated.len() >= 2, "Leave-one-out needs at least 2 radiographs");
    let source = loader::radiographs(&root);

    let workers = utils::cpus().clamp(1, annotated.len());
    println!("Running leave-one-out on {} radiographs with {workers} threads...", annotated.len());
    let mut folds: Vec<FoldResult> = thread::scope(|s| {
        let (annotated, source, spec) = (&annotated, &source, &spec);
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                s.spawn(move || {
                    (w..annotated.len())
                        .step_by(workers)
                        .map(|held| run_fold(source, annotated, held, method, spec))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|th| th.join().expect("Thread joining error"))
            .collect()
    });
    folds.sort_by_key(|f| f.sample());

    LooResult::new(folds, real_time.elapsed())
}

/// 每颗牙齿训练形状的 Procrustes 平均, 即 `MS[牙齿, 2L]`.
fn model_shapes(per_sample: &[Vec<Shape>]) -> Array2<f64> {
    let n_teeth = per_sample[0].len();
    let n_landmarks = per_sample[0][0].len();
    let mut ms = Array2::<f64>::zeros((n_teeth, 2 * n_landmarks));
    for (tooth, mut row) in ms.rows_mut().into_iter().enumerate() {
        let shapes: Vec<Shape> = per_sample.iter().map(|t| t[tooth].clone()).collect();
        let mean = mean_shape(&shapes, MEAN_SHAPE_ITER)
            .unwrap_or_else(|e| panic!("Mean shape of tooth {tooth} error: {e}"));
        row.assign(&Array1::from(mean.to_flat()));
    }
    ms
}

/// 留出第 `held` 张 X 光片, 训练并测试.
fn run_fold(
    source: &Radiographs,
    annotated: &[Annotated],
    held: usize,
    method: PreprocessMethod,
    spec: &SampleSpec,
) -> FoldResult {
    let mut timer = AccTimer::new();
    let (sample, truth) = &annotated[held];

    let (ids, per_sample): (Vec<u32>, Vec<Vec<Shape>>) = annotated
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != held)
        .map(|(_, (id, shapes))| (*id, shapes.clone()))
        .unzip();
    let xs = ground_truth_tensor(&per_sample).expect("Inconsistent landmark files");
    let ms = model_shapes(&per_sample);
    let set = TrainingSet::new(&ids, xs.view(), ms.view()).expect("Inconsistent training set");
    let gs = build_training_tensor(source, &SimilarityAligner, &set, method, spec)
        .unwrap_or_else(|e| panic!("Training without radiograph {sample} error: {e}"));
    let models = FittingModels::from_tensor(&gs).expect("Building fitting models error");
    let train_time = timer.elapsed();

    timer.start();
    let img = source
        .load(*sample, method)
        .unwrap_or_else(|e| panic!("Loading radiograph {sample} error: {e}"));
    let mut fold = FoldResult::new(*sample, models.singular_count());
    for (tooth, truth) in truth.iter().enumerate() {
        let model_shape = Shape::from_flat(&ms.row(tooth).to_vec()).expect("Bad model shape");
        let aligned = SimilarityAligner
            .align(&model_shape, truth)
            .expect("Degenerate model shape");
        for landmark in 0..aligned.len() {
            let f = models
                .fitting_function(tooth, landmark)
                .expect("Missing fitting model");
            match score_candidates(&img, &aligned, landmark, spec, f) {
                Ok(scores) => fold.record(&scores),
                Err(e) => {
                    log::debug!("radiograph {sample}, tooth {tooth}, landmark {landmark}: {e}");
                    fold.count_skipped();
                }
            }
        }
    }
    fold.finish(train_time, timer.elapsed())
}

/// 沿法线偏移 `-MAX_SHIFT..=MAX_SHIFT` 个像素, 对每个候选位置的剖面打分.
///
/// 第 `MAX_SHIFT` 个分数对应真实位置.
fn score_candidates<I, F>(
    img: &I,
    shape: &Shape,
    landmark: usize,
    spec: &SampleSpec,
    f: F,
) -> FitResult<Vec<f64>>
where
    I: GreyAccess + ?Sized,
    F: Fn(ArrayView1<f64>) -> FitResult<f64>,
{
    let (nx, ny) = profile_normal(shape, landmark)?;
    let (ox, oy) = spec.offset();
    let (x, y) = shape[landmark];
    (-MAX_SHIFT..=MAX_SHIFT)
        .map(|d| {
            let d = d as f64;
            let centre = (x - ox + d * nx, y - oy + d * ny);
            let raw = sample_along(img, centre, (nx, ny), spec.half_width())?;
            f(normalize_l1(raw.differenced()).view())
        })
        .collect()
}
