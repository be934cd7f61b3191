//! 视频抽帧采样 - 按时间间隔取帧并做模糊/稳定性/重复三道过滤
//!
//! 核心策略：
//! 1. 模糊过滤 - 拉普拉斯方差，最便宜的拒绝路径
//! 2. 稳定性过滤 - 前视帧指纹比对，跳过转场/动画中的帧
//! 3. 帧去重 - 与上一保留帧的感知哈希比对

pub mod error;
pub mod frame;
pub mod hash;
pub mod sampler;
pub mod sharpness;
pub mod sink;
pub mod source;

pub use error::SampleError;
pub use frame::Frame;
pub use hash::{DctHashProvider, Fingerprint, HashProvider};
pub use sampler::{FrameRecord, FrameSampler, SampleOutcome, SampleStats, SamplerConfig};
pub use sharpness::{LaplacianSharpness, SharpnessProbe};
pub use sink::{DirectorySink, ImageSink};
pub use source::{FrameSource, ImageSequenceSource};
