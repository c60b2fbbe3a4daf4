use lokey_api::Source;
use lokey_queue::TrngQueue;
use lokey_trng::{MockBus, ProducerState, TrngProducer};
use std::sync::Arc;

async fn queue(max_len: usize) -> Arc<TrngQueue> {
    let pool = lokey_queue::open(":memory:", None).await.unwrap();
    Arc::new(TrngQueue::new(pool, max_len))
}

#[tokio::test]
async fn force_mock_mode_tags_every_record_software() {
    let q = queue(100).await;
    let mut producer = TrngProducer::init(Box::new(MockBus::new()), true, q.clone());
    assert_eq!(producer.state(), ProducerState::SoftwareMode);

    for _ in 0..5 {
        producer.tick().await.unwrap();
    }

    let records = q.fetch(10, 0, false).await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.source == Source::Software));
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    for w in records.windows(2) {
        assert!(w[0].timestamp <= w[1].timestamp);
    }
}

#[tokio::test]
async fn hardware_failure_mid_life_falls_back_permanently() {
    let q = queue(100).await;
    let bus = MockBus::new();
    let failure_switch = bus.failure_switch();
    let mut producer = TrngProducer::init(Box::new(bus), false, q.clone());
    assert_eq!(producer.state(), ProducerState::HardwareActive);

    for _ in 0..9 {
        producer.tick().await.unwrap();
    }
    failure_switch.store(true, std::sync::atomic::Ordering::SeqCst);
    producer.tick().await.unwrap();
    assert_eq!(producer.state(), ProducerState::HardwareFailed);

    // Hardware recovering does not matter: no per-call retry.
    failure_switch.store(false, std::sync::atomic::Ordering::SeqCst);
    for _ in 0..3 {
        producer.tick().await.unwrap();
    }

    let records = q.fetch(20, 0, false).await.unwrap();
    assert_eq!(records.len(), 13);
    for (i, rec) in records.iter().enumerate() {
        let expected = if i < 9 { Source::Hardware } else { Source::Software };
        assert_eq!(rec.source, expected, "record {} source mismatch", i + 1);
    }
}

#[tokio::test]
async fn health_check_revalidates_hardware_only() {
    let q = queue(100).await;
    let mut software = TrngProducer::init(Box::new(MockBus::new()), true, q.clone());
    assert!(software.health_check());

    let bus = MockBus::new();
    let failure_switch = bus.failure_switch();
    let mut hw = TrngProducer::init(Box::new(bus), false, q);
    assert!(hw.health_check());
    failure_switch.store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(!hw.health_check());
    // A failed health check does not itself change producer state.
    assert_eq!(hw.state(), ProducerState::HardwareActive);
}
