//! 抽帧采样管线
//!
//! 按固定时间间隔在时间轴上取帧，依次过三道过滤：
//! 1. 模糊过滤 - 拉普拉斯方差低于阈值的帧直接丢弃（最便宜，先做，丢弃帧不算指纹）
//! 2. 稳定性过滤 - 与 lookahead 帧的指纹距离过大说明处于转场/动画中，丢弃
//! 3. 去重过滤 - 与上一张**保留帧**（而非上一张检查帧）的指纹距离过小则丢弃
//!
//! 稳定性在去重之前判定，转场中的帧即使碰巧与上一保留帧相似，
//! 也不会成为新的去重参照。

use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::error::SampleError;
use super::hash::{Fingerprint, HashProvider};
use super::sharpness::SharpnessProbe;
use super::sink::ImageSink;
use super::source::FrameSource;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// 采样间隔（毫秒）
    pub interval_ms: u64,
    pub deduplicate: bool,
    /// 去重的最大汉明距离，距离 <= 阈值视为重复
    pub dedupe_threshold: u32,
    pub filter_blurry: bool,
    /// 拉普拉斯方差阈值，低于即判模糊
    pub blur_threshold: f64,
    pub check_stability: bool,
    /// 稳定判定的最大汉明距离，距离 > 阈值视为不稳定
    pub stability_threshold: u32,
    /// 稳定性探测的前视偏移（毫秒）
    pub stability_lookahead_ms: u64,
    /// 只处理前多少毫秒，None 为整个视频
    pub max_duration_ms: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            deduplicate: true,
            dedupe_threshold: 5,
            filter_blurry: false,
            blur_threshold: 100.0,
            check_stability: false,
            stability_threshold: 5,
            stability_lookahead_ms: 200,
            max_duration_ms: None,
        }
    }
}

/// 一张保留帧的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub path: PathBuf,
    pub timestamp_ms: u64,
}

/// 采样统计，恒有 processed = saved + blurry + duplicates + unstable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    pub processed: u64,
    pub saved: u64,
    pub blurry: u64,
    pub duplicates: u64,
    pub unstable: u64,
}

#[derive(Debug)]
pub struct SampleOutcome {
    pub records: Vec<FrameRecord>,
    pub stats: SampleStats,
}

pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::with_config(SamplerConfig::default())
    }

    pub fn with_config(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// 驱动帧源走完时间栅格，返回保留帧序列与统计。
    ///
    /// 流中途读帧失败与流结束同等对待：终止循环，已收集的记录照常返回。
    pub fn sample(
        &self,
        source: &mut dyn FrameSource,
        hasher: &dyn HashProvider,
        sharpness: &dyn SharpnessProbe,
        sink: &mut dyn ImageSink,
    ) -> Result<SampleOutcome, SampleError> {
        let cfg = &self.config;
        if cfg.interval_ms == 0 {
            return Err(SampleError::BadFormat("sample interval must be > 0".into()));
        }

        let duration = source.duration_ms();
        if duration == 0 {
            return Err(SampleError::BadFormat(
                "source reports zero duration".into(),
            ));
        }
        let end_ms = cfg
            .max_duration_ms
            .map_or(duration, |max| duration.min(max));

        let mut records = Vec::new();
        let mut stats = SampleStats::default();
        let mut last_saved: Option<Fingerprint> = None;

        let mut ts = 0u64;
        while ts <= end_ms {
            let Some(frame) = source.read_at(ts) else {
                break;
            };
            stats.processed += 1;

            if cfg.filter_blurry {
                let score = sharpness.score(&frame);
                if score < cfg.blur_threshold {
                    // 模糊帧不再计算指纹
                    debug!("{}ms: blurry (score {:.1})", ts, score);
                    stats.blurry += 1;
                    ts += cfg.interval_ms;
                    continue;
                }
            }

            // 指纹只算一次，稳定性与去重共用
            let fingerprint = hasher.fingerprint(&frame);

            if cfg.check_stability {
                // 前视帧不存在（片尾）时按稳定处理
                if let Some(lookahead) = source.read_at(ts + cfg.stability_lookahead_ms) {
                    let dist = fingerprint.distance(&hasher.fingerprint(&lookahead));
                    if dist > cfg.stability_threshold {
                        debug!("{}ms: unstable (distance {})", ts, dist);
                        stats.unstable += 1;
                        ts += cfg.interval_ms;
                        continue;
                    }
                }
            }

            if cfg.deduplicate {
                if let Some(prev) = &last_saved {
                    let dist = fingerprint.distance(prev);
                    if dist <= cfg.dedupe_threshold {
                        debug!("{}ms: duplicate (distance {})", ts, dist);
                        stats.duplicates += 1;
                        ts += cfg.interval_ms;
                        continue;
                    }
                }
            }

            let path = sink.store(&frame, ts)?;
            records.push(FrameRecord {
                path,
                timestamp_ms: ts,
            });
            stats.saved += 1;
            last_saved = Some(fingerprint);

            ts += cfg.interval_ms;
        }

        info!(
            "sampling done: {} processed, {} saved, {} blurry, {} duplicates, {} unstable",
            stats.processed, stats.saved, stats.blurry, stats.duplicates, stats.unstable
        );
        Ok(SampleOutcome { records, stats })
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按脚本造帧的测试帧源：fill(ts) 给出整帧灰度值
    struct ScriptedSource {
        duration_ms: u64,
        end_of_data_ms: u64,
        fill: Box<dyn Fn(u64) -> u8>,
    }

    impl ScriptedSource {
        fn uniform(duration_ms: u64, value: u8) -> Self {
            Self {
                duration_ms,
                end_of_data_ms: duration_ms,
                fill: Box::new(move |_| value),
            }
        }

        fn with_fill<F: Fn(u64) -> u8 + 'static>(duration_ms: u64, fill: F) -> Self {
            Self {
                duration_ms,
                end_of_data_ms: duration_ms,
                fill: Box::new(fill),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn duration_ms(&self) -> u64 {
            self.duration_ms
        }

        fn read_at(&mut self, timestamp_ms: u64) -> Option<Frame> {
            if timestamp_ms > self.end_of_data_ms {
                return None;
            }
            let v = (self.fill)(timestamp_ms);
            let data: Vec<u8> = (0..16 * 16).flat_map(|_| [v, v, v, 255]).collect();
            Some(Frame::new(16, 16, data, timestamp_ms))
        }
    }

    /// 指纹 = 帧首字节，距离即可由填充值直接控制
    struct FillHasher {
        calls: AtomicUsize,
    }

    impl FillHasher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl HashProvider for FillHasher {
        fn fingerprint(&self, frame: &Frame) -> Fingerprint {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Fingerprint(frame.data[0] as u64)
        }
    }

    /// 指定时间戳返回低清晰度，其余高清晰度
    struct ScriptedSharpness {
        blurry_at: Vec<u64>,
    }

    impl SharpnessProbe for ScriptedSharpness {
        fn score(&self, frame: &Frame) -> f64 {
            if self.blurry_at.contains(&frame.timestamp_ms()) {
                0.0
            } else {
                1000.0
            }
        }
    }

    fn sharp() -> ScriptedSharpness {
        ScriptedSharpness { blurry_at: vec![] }
    }

    /// 只记时间戳、不落盘的 sink
    #[derive(Default)]
    struct MemorySink {
        stored: Vec<u64>,
    }

    impl ImageSink for MemorySink {
        fn store(&mut self, _frame: &Frame, timestamp_ms: u64) -> Result<PathBuf, SampleError> {
            self.stored.push(timestamp_ms);
            Ok(PathBuf::from(format!("{:07}.png", timestamp_ms)))
        }
    }

    struct FailingSink;

    impl ImageSink for FailingSink {
        fn store(&mut self, _frame: &Frame, _ts: u64) -> Result<PathBuf, SampleError> {
            Err(SampleError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "disk full",
            )))
        }
    }

    fn assert_stats_balance(stats: &SampleStats) {
        assert_eq!(
            stats.processed,
            stats.saved + stats.blurry + stats.duplicates + stats.unstable
        );
    }

    #[test]
    fn test_all_filters_disabled_saves_every_frame() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            filter_blurry: false,
            check_stability: false,
            ..Default::default()
        });
        let mut source = ScriptedSource::uniform(2000, 128);
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap();

        // t = 0, 500, 1000, 1500, 2000
        assert_eq!(outcome.stats.processed, 5);
        assert_eq!(outcome.stats.saved, 5);
        assert_eq!(sink.stored, vec![0, 500, 1000, 1500, 2000]);
        let timestamps: Vec<u64> = outcome.records.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(timestamps, vec![0, 500, 1000, 1500, 2000]);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_zero_duration_is_bad_format() {
        let sampler = FrameSampler::new();
        let mut source = ScriptedSource::uniform(0, 128);
        let mut sink = MemorySink::default();

        let err = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, SampleError::BadFormat(_)));
        assert!(sink.stored.is_empty());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            interval_ms: 0,
            ..Default::default()
        });
        let mut source = ScriptedSource::uniform(1000, 128);

        let err = sampler
            .sample(
                &mut source,
                &FillHasher::new(),
                &sharp(),
                &mut MemorySink::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SampleError::BadFormat(_)));
    }

    #[test]
    fn test_blurry_frames_skip_fingerprint() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            filter_blurry: true,
            blur_threshold: 100.0,
            ..Default::default()
        });
        let mut source = ScriptedSource::uniform(1000, 128);
        let probe = ScriptedSharpness {
            blurry_at: vec![500],
        };
        let hasher = FillHasher::new();
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &hasher, &probe, &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(outcome.stats.blurry, 1);
        assert_eq!(outcome.stats.saved, 2);
        // 丢弃的模糊帧不应计算指纹
        assert_eq!(hasher.calls.load(Ordering::Relaxed), 2);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_duplicate_reference_is_last_accepted() {
        // A(0ms) 保留，B(500ms) 因模糊被拒，C(1000ms) 与 A 相似
        // C 必须被判为 A 的重复，B 不能成为参照
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: true,
            dedupe_threshold: 5,
            filter_blurry: true,
            ..Default::default()
        });
        let mut source = ScriptedSource::with_fill(1000, |ts| match ts {
            0 => 0b0000_0000,
            500 => 0b1111_0000, // 与 A、C 都不相似
            _ => 0b0000_0001,   // 与 A 距离 1
        });
        let probe = ScriptedSharpness {
            blurry_at: vec![500],
        };
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &probe, &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(outcome.stats.saved, 1);
        assert_eq!(outcome.stats.blurry, 1);
        assert_eq!(outcome.stats.duplicates, 1);
        assert_eq!(sink.stored, vec![0]);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_unstable_frame_rejected_before_dedup() {
        // 500ms 的帧与上一保留帧相似，但处于转场中（与前视帧差异大）
        // 应计入 unstable 而非 duplicates，且不更新去重参照
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: true,
            dedupe_threshold: 5,
            check_stability: true,
            stability_threshold: 5,
            stability_lookahead_ms: 200,
            ..Default::default()
        });
        let mut source = ScriptedSource::with_fill(1000, |ts| match ts {
            0 | 200 => 0b0000_0000,
            500 => 0b0000_0001,  // 与 0ms 保留帧距离 1
            700 => 0b1111_1111,  // 前视差异大 -> 500ms 不稳定
            _ => 0b1100_0011,    // 1000ms 与 A 距离 4 -> 重复；前视越界视为稳定
        });
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(outcome.stats.saved, 1);
        assert_eq!(outcome.stats.unstable, 1);
        assert_eq!(outcome.stats.duplicates, 1);
        assert_eq!(sink.stored, vec![0]);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_lookahead_past_end_is_stable() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            check_stability: true,
            stability_lookahead_ms: 200,
            ..Default::default()
        });
        // 1000ms 处的前视（1200ms）越过流尾，该帧按稳定保留
        let mut source = ScriptedSource::with_fill(1000, |ts| (ts / 500) as u8 * 64);
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap();

        assert!(sink.stored.contains(&1000));
        assert_eq!(outcome.stats.unstable, 0);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_end_of_stream_mid_grid_returns_partial() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            ..Default::default()
        });
        // 源声称 2000ms，但 1000ms 后读不出帧
        let mut source = ScriptedSource::uniform(2000, 128);
        source.end_of_data_ms = 1000;
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(sink.stored, vec![0, 500, 1000]);
        assert_stats_balance(&outcome.stats);
    }

    #[test]
    fn test_max_duration_caps_grid() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            max_duration_ms: Some(1000),
            ..Default::default()
        });
        let mut source = ScriptedSource::uniform(5000, 128);
        let mut sink = MemorySink::default();

        let outcome = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(sink.stored, vec![0, 500, 1000]);
    }

    #[test]
    fn test_sink_failure_propagates() {
        let sampler = FrameSampler::with_config(SamplerConfig {
            deduplicate: false,
            ..Default::default()
        });
        let mut source = ScriptedSource::uniform(1000, 128);

        let err = sampler
            .sample(&mut source, &FillHasher::new(), &sharp(), &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, SampleError::Io(_)));
    }
}
