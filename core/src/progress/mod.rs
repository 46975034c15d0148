mod extractor;
mod tracker;

pub use extractor::{
    extractor_for, parse_signal, Extraction, LineCountFallback, ProgressExtractor,
    ProgressSignal, TextProgressExtractor, FALLBACK_CEILING,
};
pub use tracker::StageProgress;
