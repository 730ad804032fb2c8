//! 留一法 (leave-one-out) 消融实验.
//!
//! 依次留出每张训练 X 光片, 用其余 X 光片建立拟合函数, 然后在留出的 X 光片上比较
//! 真实位置与沿法线偏移后位置的剖面距离.
//!
//! 环境变量: `$TOOTH_DATASET_DIR`, `$TOOTH_METHOD`, `$TOOTH_K`, `$RUST_LOG`.

mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .expect("Logger initialization error");

    runner::run().analyze();
}
