use strata::{CancelToken, ChunkReducer, Error, ScalarOps, WorkerPool};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_cancel_unblocks_waiting_caller() {
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let token = CancelToken::new();
    let release = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = mpsc::channel();

    let caller = {
        let pool = pool.clone();
        let token = token.clone();
        let release = release.clone();
        thread::spawn(move || {
            pool.map_cancellable(&token, vec![()], move |()| {
                started_tx.send(()).unwrap();
                while !release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                1
            })
        })
    };

    started_rx.recv().unwrap();
    let cancelled_at = Instant::now();
    token.cancel();

    let result = caller.join().unwrap();
    assert!(matches!(result, Err(Error::Interrupted)));
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));

    release.store(true, Ordering::SeqCst);

    // Only the cancelled call was affected.
    assert_eq!(pool.map(0..4, |x: i32| x * 3).unwrap(), vec![0, 3, 6, 9]);
}

#[test]
fn test_cancelled_token_fails_before_submitting() {
    let pool = WorkerPool::new(1).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let result = pool.map_cancellable(&token, 0..5, move |x: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    });

    assert!(matches!(result, Err(Error::Interrupted)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_map_cancellable_completes_without_cancel() {
    let pool = WorkerPool::new(3).unwrap();
    let token = CancelToken::new();

    let result = pool.map_cancellable(&token, 0..10u32, |x| x * 2).unwrap();

    assert_eq!(result, (0..10).map(|x| x * 2).collect::<Vec<u32>>());
    assert!(!token.is_cancelled());
}

#[test]
fn test_cancel_leaves_other_callers_alone() {
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let token = CancelToken::new();
    let (started_tx, started_rx) = mpsc::channel();

    let cancelled = {
        let pool = pool.clone();
        let token = token.clone();
        thread::spawn(move || {
            pool.try_map_cancellable(&token, vec![()], move |()| {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                Ok::<_, String>(())
            })
        })
    };

    let bystander = {
        let pool = pool.clone();
        thread::spawn(move || pool.map(0..50u32, |x| x + 1))
    };

    started_rx.recv().unwrap();
    token.cancel();

    assert!(matches!(cancelled.join().unwrap(), Err(Error::Interrupted)));
    assert_eq!(
        bystander.join().unwrap().unwrap(),
        (1..=50).collect::<Vec<u32>>()
    );
}

#[test]
fn test_cancel_self_managed_reduction_joins_all_chunks() {
    let token = CancelToken::new();
    let running = Arc::new(AtomicUsize::new(0));
    let items: Vec<u64> = (0..4).collect();

    let reducer = ChunkReducer::new().cancel_on(token.clone());
    let canceller = {
        let token = token.clone();
        let running = running.clone();
        thread::spawn(move || {
            while running.load(Ordering::SeqCst) < 4 {
                thread::yield_now();
            }
            token.cancel();
        })
    };

    let counter = running.clone();
    let result = reducer.reduce(
        4,
        &items,
        move |chunk| {
            counter.fetch_add(1, Ordering::SeqCst);
            while !chunk.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            counter.fetch_sub(1, Ordering::SeqCst);
            chunk.len()
        },
        |a, b| a + b,
    );

    canceller.join().unwrap();
    assert!(matches!(result, Err(Error::Interrupted)));
    // Every chunk thread exited before the call returned.
    assert_eq!(running.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_pool_backed_scalar_op() {
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let token = CancelToken::new();
    let ops = ScalarOps::with_pool(pool.clone()).cancel_on(token.clone());
    let items: Vec<u32> = (0..1_000).collect();

    let (started_tx, started_rx) = mpsc::channel();
    let caller = thread::spawn(move || {
        ops.count(2, &items, move |_| {
            let _ = started_tx.send(());
            thread::sleep(Duration::from_millis(2));
            true
        })
    });

    started_rx.recv().unwrap();
    token.cancel();

    assert!(matches!(caller.join().unwrap(), Err(Error::Interrupted)));
    assert!(ScalarOps::with_pool(pool).all(2, &[1, 2, 3], |x: &i32| *x > 0).unwrap());
}
