//! 清晰度评估 - 拉普拉斯方差
//!
//! 值越高越清晰，低于阈值判为模糊帧。

use super::frame::Frame;

pub trait SharpnessProbe: Send + Sync {
    /// 返回清晰度评分，higher = sharper
    fn score(&self, frame: &Frame) -> f64;
}

/// 3x3 拉普拉斯卷积响应的方差
///
/// 卷积核：
/// ```text
///   0  1  0
///   1 -4  1
///   0  1  0
/// ```
pub struct LaplacianSharpness;

impl LaplacianSharpness {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LaplacianSharpness {
    fn default() -> Self {
        Self::new()
    }
}

impl SharpnessProbe for LaplacianSharpness {
    fn score(&self, frame: &Frame) -> f64 {
        let gray = frame.to_grayscale();
        let w = frame.width as usize;
        let h = frame.height as usize;

        if w < 3 || h < 3 {
            return 0.0;
        }

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let count = ((h - 2) * (w - 2)) as f64;

        for y in 1..h - 1 {
            let row = y * w;
            for x in 1..w - 1 {
                let idx = row + x;
                let lap = -4.0 * gray[idx] as f64
                    + gray[idx - w] as f64
                    + gray[idx + w] as f64
                    + gray[idx - 1] as f64
                    + gray[idx + 1] as f64;
                sum += lap;
                sum_sq += lap * lap;
            }
        }

        let mean = sum / count;
        sum_sq / count - mean * mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frame(width: u32, height: u32, fill: u8) -> Frame {
        let data: Vec<u8> = (0..(width * height) as usize)
            .flat_map(|_| [fill, fill, fill, 255])
            .collect();
        Frame::new(width, height, data, 0)
    }

    fn checkerboard_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::new(width, height, data, 0)
    }

    #[test]
    fn test_uniform_frame_scores_zero() {
        let probe = LaplacianSharpness::new();
        let frame = uniform_frame(32, 32, 128);
        assert_eq!(probe.score(&frame), 0.0);
    }

    #[test]
    fn test_high_frequency_scores_higher() {
        let probe = LaplacianSharpness::new();
        let flat = uniform_frame(32, 32, 128);
        let sharp = checkerboard_frame(32, 32);

        assert!(probe.score(&sharp) > probe.score(&flat));
    }

    #[test]
    fn test_tiny_frame_scores_zero() {
        let probe = LaplacianSharpness::new();
        let frame = uniform_frame(2, 2, 50);
        assert_eq!(probe.score(&frame), 0.0);
    }
}
