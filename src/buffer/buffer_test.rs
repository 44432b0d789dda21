use std::sync::Arc;
use std::time::Duration;

use super::*;

#[tokio::test]
async fn push_then_pop_should_return_the_record() {
    let buffer = RingBuffer::allocate(16, 4).unwrap();

    buffer.push(b"hello").await;

    assert_eq!(buffer.pop().await, b"hello");
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn records_should_come_out_in_fifo_order() {
    let buffer = RingBuffer::allocate(16, 4).unwrap();

    buffer.push(b"one").await;
    buffer.push(b"two").await;
    buffer.push(b"three").await;

    assert_eq!(buffer.pop().await, b"one");
    assert_eq!(buffer.pop().await, b"two");
    assert_eq!(buffer.pop().await, b"three");
}

#[tokio::test]
async fn pop_timeout_should_expire_on_empty_buffer() {
    let buffer = RingBuffer::allocate(16, 4).unwrap();

    assert!(buffer.pop_timeout(Duration::from_millis(10)).await.is_none());
}

#[tokio::test]
async fn push_timeout_should_expire_on_full_buffer() {
    let buffer = RingBuffer::allocate(4, 2).unwrap();
    buffer.push(b"a").await;
    buffer.push(b"b").await;

    assert!(!buffer.push_timeout(b"c", Duration::from_millis(10)).await);
}

#[tokio::test]
async fn full_buffer_push_should_resume_after_a_pop() {
    let buffer = RingBuffer::allocate(4, 2).unwrap();
    buffer.push(b"a").await;
    buffer.push(b"b").await;

    let producer = {
        let buffer = Arc::clone(&buffer);
        tokio::spawn(async move { buffer.push(b"c").await })
    };

    assert_eq!(buffer.pop().await, b"a");
    producer.await.unwrap();

    assert_eq!(buffer.pop().await, b"b");
    assert_eq!(buffer.pop().await, b"c");
}

#[tokio::test]
async fn pop_should_wake_up_when_a_record_arrives() {
    let buffer = RingBuffer::allocate(16, 4).unwrap();

    let consumer = {
        let buffer = Arc::clone(&buffer);
        tokio::spawn(async move { buffer.pop().await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    buffer.push(b"late").await;

    assert_eq!(consumer.await.unwrap(), b"late");
}

#[tokio::test]
async fn wrap_around_should_preserve_slot_contents() {
    let buffer = RingBuffer::allocate(8, 2).unwrap();

    for round in 0..5u8 {
        let record = [round, round];
        buffer.push(&record).await;
        assert_eq!(buffer.pop().await, record);
    }
}
