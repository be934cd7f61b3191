pub mod extractor;

pub use extractor::{
    recognize_frames, ExtractOptions, ExtractionReport, FrameText, VideoTextExtractor,
};
