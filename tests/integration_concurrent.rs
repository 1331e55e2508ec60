#[macro_use]
mod common;

use anyhow::Result;
use std::time::Duration;
use sysv_mq::{
    AsyncMessageQueue, MqError, MsgFlags, QueueConfig, QueueSet, SharedMessageQueue,
    TypeSelector,
};

/// A blocking receive on one thread is satisfied by a send from another.
#[test]
fn blocking_receive_is_woken_by_send() -> Result<()> {
    let wired = "walrus tea party";
    let mq = queue_or_skip!(wired.len());
    let mut receiver = mq.attach(wired.len());
    let mut sender = mq.attach(wired.len());

    crossbeam::scope(|s| {
        let handle =
            s.spawn(move |_| receiver.receive_string(TypeSelector::Any, MsgFlags::empty()));

        std::thread::sleep(Duration::from_millis(50));
        sender.send_str(wired, 1, MsgFlags::empty()).expect("send");

        let (message, mtype) = handle.join().expect("receiver thread").expect("receive");
        assert_eq!(message, wired);
        assert_eq!(mtype, 1);
    })
    .expect("scoped threads");
    Ok(())
}

/// Two threads, separate handles, 50000 messages: nothing lost or corrupted.
#[test]
fn mass_send_and_receive_on_separate_handles() -> Result<()> {
    const N: usize = 50_000;
    let wired = "walrusser and unicorns";
    let mq = queue_or_skip!(wired.len());
    let mut receiver = mq.attach(wired.len());
    let mut sender = mq.attach(wired.len());

    crossbeam::scope(|s| {
        let consumer = s.spawn(move |_| -> sysv_mq::Result<usize> {
            let mut received = 0;
            for _ in 0..N {
                let (message, mtype) = receiver.receive(TypeSelector::Any, MsgFlags::empty())?;
                assert_eq!(message, wired.as_bytes());
                assert_eq!(mtype, 1);
                received += 1;
            }
            Ok(received)
        });

        let producer = s.spawn(move |_| -> sysv_mq::Result<()> {
            for _ in 0..N {
                sender.send(wired.as_bytes(), 1, MsgFlags::empty())?;
            }
            Ok(())
        });

        producer.join().expect("producer thread").expect("send");
        let received = consumer.join().expect("consumer thread").expect("receive");
        assert_eq!(received, N);
    })
    .expect("scoped threads");

    assert_eq!(mq.count()?, 0);
    Ok(())
}

/// Destroying the queue wakes a blocked receiver with an error.
#[test]
fn destroy_unblocks_waiting_receiver() -> Result<()> {
    let mut mq = queue_or_skip!(32);
    let mut receiver = mq.attach(32);

    crossbeam::scope(|s| {
        let handle = s.spawn(move |_| receiver.receive(TypeSelector::Any, MsgFlags::empty()));

        std::thread::sleep(Duration::from_millis(100));
        mq.destroy().expect("destroy");

        let err = handle.join().expect("receiver thread").unwrap_err();
        assert!(matches!(err, MqError::QueueRemoved), "unexpected error: {:?}", err);
    })
    .expect("scoped threads");
    Ok(())
}

/// Destroying a full queue wakes a blocked sender with an error.
#[test]
fn destroy_unblocks_waiting_sender() -> Result<()> {
    let mut mq = queue_or_skip!(32);
    let mut sender = mq.attach(32);

    let update = QueueSet {
        max_bytes: 16,
        ..QueueSet::from(&mq.stat()?)
    };
    mq.set(&update)?;
    mq.send(b"0123456789", 1, MsgFlags::NOWAIT)?;

    crossbeam::scope(|s| {
        let handle = s.spawn(move |_| sender.send(b"0123456789", 1, MsgFlags::empty()));

        std::thread::sleep(Duration::from_millis(100));
        mq.destroy().expect("destroy");

        let err = handle.join().expect("sender thread").unwrap_err();
        assert!(matches!(err, MqError::QueueRemoved), "unexpected error: {:?}", err);
    })
    .expect("scoped threads");
    Ok(())
}

/// Retry a non-blocking call until it stops reporting `WouldBlock`.
///
/// A shared handle holds its lock for the whole of a blocking call, so
/// threads sharing one handle poll instead of waiting in the kernel.
fn retry_nowait<T>(mut f: impl FnMut() -> sysv_mq::Result<T>) -> sysv_mq::Result<T> {
    loop {
        match f() {
            Err(MqError::WouldBlock) => std::thread::sleep(Duration::from_millis(1)),
            other => return other,
        }
    }
}

#[test]
fn shared_handle_across_threads() -> Result<()> {
    const PER_THREAD: usize = 100;
    let mq = queue_or_skip!(64);
    let shared = SharedMessageQueue::new(mq.attach(64));

    crossbeam::scope(|s| {
        for t in 1..=4 {
            let shared = shared.clone();
            s.spawn(move |_| {
                for i in 0..PER_THREAD {
                    let payload = format!("thread {} message {}", t, i);
                    retry_nowait(|| shared.send(payload.as_bytes(), t, MsgFlags::NOWAIT))
                        .expect("send");
                }
            });
        }

        let mut seen = [0usize; 5];
        for _ in 0..4 * PER_THREAD {
            let (message, mtype) =
                retry_nowait(|| shared.receive(TypeSelector::Any, MsgFlags::NOWAIT))
                    .expect("receive");
            assert!(message.starts_with(format!("thread {} ", mtype).as_bytes()));
            seen[mtype as usize] += 1;
        }
        assert_eq!(seen[1..], [PER_THREAD; 4]);
    })
    .expect("scoped threads");

    assert_eq!(shared.count()?, 0);
    assert_eq!(shared.with(|q| q.max_size()), 64);
    shared.close();
    assert!(!shared.is_connected());
    Ok(())
}

#[tokio::test]
async fn async_handle_round_trip() -> Result<()> {
    let mq = queue_or_skip!(128);
    let config = QueueConfig::with_key(mq.key()).max_size(128);

    let producer = AsyncMessageQueue::open(config.clone()).await?;
    let consumer = AsyncMessageQueue::open(config).await?;

    let receiving = tokio::spawn(async move {
        consumer
            .receive(TypeSelector::Exact(2), MsgFlags::empty())
            .await
    });

    producer.send(b"async walrus".to_vec(), 2, MsgFlags::empty()).await?;
    let (message, mtype) = receiving.await??;

    assert_eq!(message, b"async walrus");
    assert_eq!(mtype, 2);
    assert_eq!(producer.count().await?, 0);
    assert_eq!(producer.size().await?, 0);

    producer.close();
    Ok(())
}
