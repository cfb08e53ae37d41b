use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use talkback::audio::chunker::FrameChunker;
use talkback::audio::{CAPTURE_SAMPLE_RATE, FRAME_SAMPLES};
use talkback::transport::ClientMessage;
use talkback::wire::decode_chunk;

#[tokio::test]
async fn test_emits_one_chunk_per_full_frame() {
    let rb = HeapRb::<f32>::new(FRAME_SAMPLES * 8);
    let (mut producer, consumer) = rb.split();
    let (tx, mut rx) = mpsc::channel(8);
    let mut chunker = FrameChunker::new(consumer, tx, CancellationToken::new());

    // Two and a half frames buffered
    producer.push_slice(&vec![0.25f32; FRAME_SAMPLES * 2 + FRAME_SAMPLES / 2]);

    assert!(chunker.poll_frame());
    assert!(chunker.poll_frame());
    assert!(
        !chunker.poll_frame(),
        "partial frame must wait for more samples"
    );

    for _ in 0..2 {
        let ClientMessage::RealtimeAudio { chunk } = rx.try_recv().unwrap();
        let frame = decode_chunk(&chunk, CAPTURE_SAMPLE_RATE, 1).unwrap();
        assert_eq!(frame.samples.len(), FRAME_SAMPLES);
        assert!((frame.samples[0] - 0.25).abs() <= 1.0 / 32768.0);
    }
    assert!(rx.try_recv().is_err(), "no third chunk");
}

#[tokio::test]
async fn test_waits_until_a_full_frame_is_buffered() {
    let rb = HeapRb::<f32>::new(FRAME_SAMPLES * 2);
    let (mut producer, consumer) = rb.split();
    let (tx, mut rx) = mpsc::channel(8);
    let mut chunker = FrameChunker::new(consumer, tx, CancellationToken::new());

    producer.push_slice(&vec![0.0f32; FRAME_SAMPLES - 1]);
    assert!(!chunker.poll_frame());
    assert!(rx.try_recv().is_err());

    producer.push_slice(&[0.0f32]);
    assert!(chunker.poll_frame());
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_full_outbound_channel_drops_newest_frame() {
    let rb = HeapRb::<f32>::new(FRAME_SAMPLES * 4);
    let (mut producer, consumer) = rb.split();
    // Capacity one: the second frame has nowhere to go
    let (tx, mut rx) = mpsc::channel(1);
    let mut chunker = FrameChunker::new(consumer, tx, CancellationToken::new());

    producer.push_slice(&vec![0.5f32; FRAME_SAMPLES]);
    producer.push_slice(&vec![-0.5f32; FRAME_SAMPLES]);

    assert!(chunker.poll_frame());
    assert!(chunker.poll_frame(), "capture is never stalled by overflow");
    assert_eq!(chunker.dropped(), 1);

    // The frame that survived is the OLDER one
    let ClientMessage::RealtimeAudio { chunk } = rx.try_recv().unwrap();
    let frame = decode_chunk(&chunk, CAPTURE_SAMPLE_RATE, 1).unwrap();
    assert!(frame.samples[0] > 0.0);
    assert!(rx.try_recv().is_err());
}
