pub mod pcm;

pub use pcm::{decode_chunk, decode_pcm, encode_frame, encode_samples, EncodedChunk};
