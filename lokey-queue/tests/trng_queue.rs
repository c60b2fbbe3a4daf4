use lokey_api::Source;
use lokey_queue::TrngQueue;

async fn queue(max_len: usize) -> TrngQueue {
    let pool = lokey_queue::open(":memory:", None).await.unwrap();
    TrngQueue::new(pool, max_len)
}

fn hash(byte: u8) -> Vec<u8> {
    vec![byte; 32]
}

#[tokio::test]
async fn append_respects_capacity_with_fifo_eviction() {
    let q = queue(3).await;
    for b in [1u8, 2, 3, 4] {
        q.append(hash(b), Source::Software, 32).await.unwrap();
    }
    let stats = q.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert!(stats.queue_full);

    let remaining = q.fetch(10, 0, false).await.unwrap();
    let bytes: Vec<u8> = remaining.iter().map(|r| r.hash[0]).collect();
    assert_eq!(bytes, vec![2, 3, 4]);
}

#[tokio::test]
async fn fetch_consume_once_is_exclusive() {
    let q = queue(10).await;
    q.append(hash(7), Source::Hardware, 32).await.unwrap();

    let a = q.fetch(10, 0, true).await.unwrap();
    let b = q.fetch(10, 0, true).await.unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 0);

    let stats = q.stats().await.unwrap();
    assert_eq!(stats.unconsumed, 0);
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn fetch_limit_zero_returns_empty_and_marks_nothing() {
    let q = queue(10).await;
    q.append(hash(1), Source::Software, 32).await.unwrap();

    let out = q.fetch(0, 0, true).await.unwrap();
    assert!(out.is_empty());

    let stats = q.stats().await.unwrap();
    assert_eq!(stats.unconsumed, 1);
}

#[tokio::test]
async fn resize_is_idempotent_when_under_capacity() {
    let q = queue(10).await;
    for b in [1u8, 2, 3] {
        q.append(hash(b), Source::Software, 32).await.unwrap();
    }
    q.resize(10).await.unwrap();
    let stats = q.stats().await.unwrap();
    assert_eq!(stats.total, 3);
}

#[tokio::test]
async fn resize_down_evicts_oldest() {
    let q = queue(10).await;
    for b in [1u8, 2, 3, 4] {
        q.append(hash(b), Source::Software, 32).await.unwrap();
    }
    q.resize(2).await.unwrap();
    let remaining = q.fetch(10, 0, false).await.unwrap();
    let bytes: Vec<u8> = remaining.iter().map(|r| r.hash[0]).collect();
    assert_eq!(bytes, vec![3, 4]);
}

#[tokio::test]
async fn hash_hex_round_trips() {
    let q = queue(10).await;
    let rec = q.append(hash(0xab), Source::Hardware, 32).await.unwrap();
    assert_eq!(rec.hash_hex(), hex::encode(&rec.hash));
}

#[tokio::test]
async fn concurrent_consume_has_no_duplicates() {
    let q = std::sync::Arc::new(queue(10).await);
    q.append(hash(1), Source::Software, 32).await.unwrap();

    let q1 = q.clone();
    let q2 = q.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { q1.fetch(10, 0, true).await.unwrap() }),
        tokio::spawn(async move { q2.fetch(10, 0, true).await.unwrap() }),
    );
    let total = a.unwrap().len() + b.unwrap().len();
    assert_eq!(total, 1);
}
