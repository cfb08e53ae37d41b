use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use talkback::audio::CAPTURE_SAMPLE_RATE;
use talkback::wire::{decode_chunk, decode_pcm, encode_frame, EncodedChunk};
use talkback::TalkbackError;

#[test]
fn test_round_trip_within_quantization_error() {
    // Quantization-aligned values spread across the full range
    let samples: Vec<f32> = (0..1024)
        .map(|i| ((i * 53) % 60_001) as f32 - 30_000.0)
        .map(|k| k / 32_767.0)
        .collect();

    let chunk = encode_frame(&samples).unwrap();
    let decoded = decode_chunk(&chunk, CAPTURE_SAMPLE_RATE, 1).unwrap();

    assert_eq!(decoded.samples.len(), samples.len());
    for (original, restored) in samples.iter().zip(decoded.samples.iter()) {
        let err = (original - restored).abs();
        assert!(
            err <= 1.0 / 32768.0,
            "sample error {} exceeds one quantization step",
            err
        );
    }
}

#[test]
fn test_encode_clamps_out_of_range_samples() {
    let chunk = encode_frame(&[2.0, -3.5, 1.0, -1.0]).unwrap();
    let decoded = decode_chunk(&chunk, CAPTURE_SAMPLE_RATE, 1).unwrap();

    // 2.0 clamps to 1.0 and -3.5 clamps to -1.0 before scaling
    assert!((decoded.samples[0] - 32767.0 / 32768.0).abs() < 1e-6);
    assert!((decoded.samples[1] + 32767.0 / 32768.0).abs() < 1e-6);
    assert!((decoded.samples[2] - decoded.samples[0]).abs() < 1e-6);
}

#[test]
fn test_encode_rejects_empty_frame() {
    let result = encode_frame(&[]);
    assert!(matches!(result, Err(TalkbackError::EmptyFrame)));
}

#[test]
fn test_decode_truncates_odd_trailing_byte() {
    // Two full samples plus one dangling byte
    let bytes = vec![0x00, 0x40, 0x00, 0xC0, 0x7F];
    let frame = decode_pcm(&bytes, 24_000, 1);

    assert_eq!(frame.samples.len(), 2, "partial sample must be dropped");
    assert!((frame.samples[0] - 0.5).abs() < 1e-6);
    assert!((frame.samples[1] + 0.5).abs() < 1e-6);
}

#[test]
fn test_decode_uses_declared_rate_and_channels() {
    let chunk = encode_frame(&[0.1; 480]).unwrap();
    let frame = decode_chunk(&chunk, 24_000, 1).unwrap();

    assert_eq!(frame.sample_rate, 24_000);
    assert_eq!(frame.channels, 1);
    assert!((frame.duration_secs() - 0.02).abs() < 1e-9);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    let chunk = EncodedChunk {
        data: "not base64!!!".to_string(),
        mime_type: "audio/pcm;rate=24000".to_string(),
    };
    assert!(matches!(
        decode_chunk(&chunk, 24_000, 1),
        Err(TalkbackError::Codec { .. })
    ));
}

#[test]
fn test_envelope_wire_format() {
    let chunk = encode_frame(&[0.0; 4]).unwrap();
    assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
    assert_eq!(STANDARD.decode(&chunk.data).unwrap().len(), 8);

    // The transport envelope serializes camelCase
    let json = serde_json::to_string(&chunk).unwrap();
    assert!(json.contains("\"mimeType\""));
    let restored: EncodedChunk = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, chunk);
}
