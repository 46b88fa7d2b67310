//! Audio processing stages

pub mod decoder;
pub mod encoder;
pub mod levels;
pub mod mixer;
pub mod normalizer;
pub mod resampler;
pub mod separator;
pub mod types;
pub mod voice;
pub mod wav;

pub use decoder::{DecodedAudio, SimpleDecoder};
pub use encoder::{AudioEncoder, FfmpegEncoder};
pub use mixer::Mixer;
pub use normalizer::FormatNormalizer;
pub use resampler::Resampler;
pub use separator::{SeparatorSettings, SourceSeparator};
pub use types::AudioBuffer;
pub use voice::VoiceLeveler;
