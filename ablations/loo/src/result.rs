//! 实验结果.

use crate::runner::MAX_SHIFT;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
pub struct AccTimer {
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()` 或 `Self::new()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 留出一张 X 光片的实验统计.
#[derive(Clone, Debug)]
pub struct FoldResult {
    /// 留出的 X 光片编号.
    sample: u32,

    /// 协方差奇异的模型个数.
    singular: usize,

    /// 成功打分的 landmark 个数.
    scored: u64,

    /// 真实位置得分不高于所有偏移位置的 landmark 个数.
    hits: u64,

    /// 因采样越界等原因跳过的 landmark 个数.
    skipped: u64,

    /// 真实位置距离之和.
    true_sum: f64,

    /// 偏移位置距离之和.
    displaced_sum: f64,

    /// 偏移位置个数.
    displaced: u64,

    /// 建模耗时.
    train_time: Duration,

    /// 打分耗时.
    score_time: Duration,
}

impl FoldResult {
    /// 初始化.
    pub fn new(sample: u32, singular: usize) -> Self {
        Self {
            sample,
            singular,
            scored: 0,
            hits: 0,
            skipped: 0,
            true_sum: 0.0,
            displaced_sum: 0.0,
            displaced: 0,
            train_time: Duration::ZERO,
            score_time: Duration::ZERO,
        }
    }

    /// 留出的 X 光片编号.
    #[inline]
    pub fn sample(&self) -> u32 {
        self.sample
    }

    /// 记录一个 landmark 的全部候选分数, 中间一个对应真实位置.
    pub fn record(&mut self, scores: &[f64]) {
        debug_assert_eq!(scores.len(), 2 * MAX_SHIFT as usize + 1);
        let truth = scores[MAX_SHIFT as usize];
        self.scored += 1;
        self.true_sum += truth;
        for (i, s) in scores.iter().enumerate() {
            if i != MAX_SHIFT as usize {
                self.displaced_sum += s;
                self.displaced += 1;
            }
        }
        if scores.iter().all(|s| truth <= *s) {
            self.hits += 1;
        }
    }

    /// 记录一个被跳过的 landmark.
    #[inline]
    pub fn count_skipped(&mut self) {
        self.skipped += 1;
    }

    /// 结束统计.
    #[inline]
    pub fn finish(mut self, train_time: Duration, score_time: Duration) -> Self {
        self.train_time = train_time;
        self.score_time = score_time;
        self
    }
}

#[inline]
fn ratio(a: f64, b: u64) -> Option<f64> {
    (b != 0).then(|| a / b as f64)
}

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

/// 将 `fold` 的结果写进 `w` 中.
fn describe_into<W: Write>(fold: &FoldResult, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Held-out radiograph {:02}:", fold.sample)?;
    writeln!(w, "{S4}Scored landmarks: {}", fold.scored)?;
    writeln!(w, "{S4}Skipped landmarks: {}", fold.skipped)?;
    writeln!(w, "{S4}Singular models: {}", fold.singular)?;
    writeln!(
        w,
        "{S4}Hit rate: {}",
        f64_to_display(ratio(fold.hits as f64, fold.scored))
    )?;
    writeln!(
        w,
        "{S4}Mean true distance: {}",
        f64_to_display(ratio(fold.true_sum, fold.scored))
    )?;
    writeln!(
        w,
        "{S4}Mean displaced distance: {}",
        f64_to_display(ratio(fold.displaced_sum, fold.displaced))
    )?;
    writeln!(w, "{S4}Training time: {} ms", fold.train_time.as_millis())?;
    write!(w, "{S4}Scoring time: {} us", fold.score_time.as_micros())?;
    Ok(())
}

/// 留一法实验最终结果.
pub struct LooResult {
    folds: Vec<FoldResult>,
    real_time: Duration,
}

impl LooResult {
    /// 初始化.
    pub fn new(folds: Vec<FoldResult>, real_time: Duration) -> Self {
        Self { folds, real_time }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for fold in self.folds.iter() {
            describe_into(fold, &mut buf).unwrap();
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }

        let scored: u64 = self.folds.iter().map(|f| f.scored).sum();
        let hits: u64 = self.folds.iter().map(|f| f.hits).sum();
        let true_sum: f64 = self.folds.iter().map(|f| f.true_sum).sum();
        let displaced_sum: f64 = self.folds.iter().map(|f| f.displaced_sum).sum();
        let displaced: u64 = self.folds.iter().map(|f| f.displaced).sum();
        println!("Overall:");
        println!("    Hit rate: {}", f64_to_display(ratio(hits as f64, scored)));
        println!(
            "    Mean true distance: {}",
            f64_to_display(ratio(true_sum, scored))
        );
        println!(
            "    Mean displaced distance: {}",
            f64_to_display(ratio(displaced_sum, displaced))
        );
        println!("    Total machine time: {} ms", self.real_time.as_millis());
        utils::sep();
    }
}
