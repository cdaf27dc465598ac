//! Integration tests for emissions that cross threads: queued delivery on
//! the receiver's owning thread, receiver destruction racing with queued
//! work, and concurrent emitters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::{
    DispatchPolicy, Dispatcher, HandlerError, Object, ObjectBase, ObjectId, Signal,
    global_registry,
};
use tracing_subscriber::EnvFilter;

const TIMEOUT: Duration = Duration::from_secs(5);

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Master {
    base: ObjectBase,
    message: Signal<String>,
}

impl Master {
    fn new() -> Arc<Self> {
        let base = ObjectBase::new::<Self>();
        Arc::new(Self {
            message: Signal::with_owner(&base),
            base,
        })
    }

    fn broadcast(&self, msg: &str) {
        self.message.emit(msg.to_string()).unwrap();
    }
}

impl Object for Master {
    fn object_id(&self) -> ObjectId {
        self.base.id()
    }
}

struct Slave {
    base: ObjectBase,
    calls: Arc<AtomicUsize>,
}

impl Slave {
    fn new(calls: Arc<AtomicUsize>) -> Arc<Self> {
        Arc::new(Self {
            base: ObjectBase::new::<Self>(),
            calls,
        })
    }

    fn accept_message(&self, _msg: &String) {
        self.base.affinity().assert_same_thread();
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Object for Slave {
    fn object_id(&self) -> ObjectId {
        self.base.id()
    }
}

#[test]
fn emission_from_worker_runs_on_owner_thread() {
    setup();
    let master = Master::new();
    let receiver = ObjectBase::new::<ObjectBase>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    master
        .message
        .connect(&receiver, move |msg| {
            sink.lock().push((msg.clone(), thread::current().id()));
        })
        .unwrap();

    let emitter = master.clone();
    thread::spawn(move || emitter.broadcast("hello")).join().unwrap();

    // The worker returned without waiting for the handler.
    assert!(seen.lock().is_empty());
    assert_eq!(Dispatcher::current().pending_count(), 1);

    assert!(Dispatcher::current().process_until(TIMEOUT, || !seen.lock().is_empty()));
    assert_eq!(
        *seen.lock(),
        vec![("hello".to_string(), thread::current().id())]
    );
}

#[test]
fn queued_deliveries_keep_emission_order() {
    setup();
    let signal = Arc::new(Signal::<u32>::new());
    let receiver = ObjectBase::new::<ObjectBase>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    signal
        .connect(&receiver, move |n| sink.lock().push(*n))
        .unwrap();

    let emitter = signal.clone();
    thread::spawn(move || {
        for n in 0..100 {
            emitter.emit(n).unwrap();
        }
    })
    .join()
    .unwrap();

    assert_eq!(Dispatcher::current().process_messages(), 100);
    assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn receiver_removed_while_deliveries_are_queued() {
    setup();
    const ITERATIONS: usize = 100;
    const EMITS: usize = 10_000;
    const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

    let master = Master::new();
    let dispatcher = Dispatcher::current();

    let emit_from_worker = |master: &Arc<Master>| {
        let emitter = master.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let f = finished.clone();
        let worker = thread::spawn(move || {
            for _ in 0..EMITS {
                emitter.broadcast("hello");
            }
            f.store(true, Ordering::SeqCst);
        });
        (worker, finished)
    };

    for _ in 0..ITERATIONS {
        let calls = Arc::new(AtomicUsize::new(0));
        let slave = Slave::new(calls.clone());
        master
            .message
            .connect_method(&slave, Slave::accept_message)
            .unwrap();

        // Drain on this thread while the worker is still emitting.
        let (worker, finished) = emit_from_worker(&master);
        assert!(dispatcher.process_until(DRAIN_TIMEOUT, || finished.load(Ordering::SeqCst)));
        worker.join().unwrap();
        dispatcher.process_messages();
        assert_eq!(calls.load(Ordering::SeqCst), EMITS);

        let slave_id = slave.object_id();
        drop(slave);

        let (worker, _) = emit_from_worker(&master);
        worker.join().unwrap();
        dispatcher.process_messages();

        assert_eq!(calls.load(Ordering::SeqCst), EMITS);
        assert!(!global_registry().contains(slave_id));
        assert_eq!(master.message.connection_count(), 0);
        assert!(!dispatcher.has_pending());
    }
}

#[test]
fn receiver_removed_while_worker_keeps_emitting() {
    setup();
    let master = Master::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let slave = Slave::new(calls.clone());
    master
        .message
        .connect_method(&slave, Slave::accept_message)
        .unwrap();

    let emitter = master.clone();
    let worker = thread::spawn(move || {
        for _ in 0..5000 {
            emitter.broadcast("hello");
        }
    });

    let dispatcher = Dispatcher::current();
    assert!(dispatcher.process_until(TIMEOUT, || calls.load(Ordering::SeqCst) >= 10));
    drop(slave);
    let at_destroy = calls.load(Ordering::SeqCst);

    worker.join().unwrap();
    dispatcher.process_messages();

    assert_eq!(calls.load(Ordering::SeqCst), at_destroy);
    assert_eq!(master.message.connection_count(), 0);
}

#[test]
fn concurrent_emitters_reach_caller_thread_receivers() {
    setup();
    const THREADS: usize = 4;
    const EMITS: usize = 500;

    let signal = Arc::new(Signal::<usize>::new());
    let total = Arc::new(AtomicUsize::new(0));
    let receivers: Vec<ObjectBase> = (0..2)
        .map(|_| {
            ObjectBase::builder()
                .dispatch_policy(DispatchPolicy::AlwaysCallerThread)
                .build::<ObjectBase>()
        })
        .collect();
    for receiver in &receivers {
        let t = total.clone();
        signal
            .connect(receiver, move |n| {
                t.fetch_add(*n, Ordering::SeqCst);
            })
            .unwrap();
    }

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let emitter = signal.clone();
            thread::spawn(move || {
                for _ in 0..EMITS {
                    emitter.emit(1).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), THREADS * EMITS * receivers.len());
    assert_eq!(signal.connection_count(), 2);
    assert!(!Dispatcher::current().has_pending());
}

#[test]
fn disconnect_from_queued_handler_drops_remaining_deliveries() {
    setup();
    let signal = Arc::new(Signal::<()>::new());
    let receiver = ObjectBase::new::<ObjectBase>();
    let calls = Arc::new(AtomicUsize::new(0));

    let c = calls.clone();
    signal
        .connect(&receiver, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            tether_core::disconnect().unwrap();
        })
        .unwrap();

    let emitter = signal.clone();
    thread::spawn(move || {
        for _ in 0..3 {
            emitter.emit(()).unwrap();
        }
    })
    .join()
    .unwrap();

    assert_eq!(Dispatcher::current().process_messages(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(signal.connection_count(), 0);
}

#[test]
fn queued_panic_is_reported_to_the_dispatcher() {
    setup();
    let signal = Arc::new(Signal::<i32>::new());
    let receiver = ObjectBase::new::<ObjectBase>();

    signal
        .connect(&receiver, |n| {
            if *n < 0 {
                panic!("negative value");
            }
        })
        .unwrap();

    let emitter = signal.clone();
    thread::spawn(move || {
        emitter.emit(-1).unwrap();
        emitter.emit(1).unwrap();
    })
    .join()
    .unwrap();

    let dispatcher = Dispatcher::current();
    assert_eq!(dispatcher.process_messages(), 2);

    let errors = dispatcher.take_errors();
    assert_eq!(errors, vec![HandlerError::Panicked("negative value".into())]);
    assert_eq!(signal.connection_count(), 1);
}

#[test]
fn queued_failure_is_reported_to_the_dispatcher() {
    setup();
    let signal = Arc::new(Signal::<()>::new());
    let receiver = ObjectBase::new::<ObjectBase>();

    signal
        .connect_fallible(&receiver, |_| Err(HandlerError::new("rejected")))
        .unwrap();

    let emitter = signal.clone();
    thread::spawn(move || emitter.emit(()).unwrap()).join().unwrap();

    let dispatcher = Dispatcher::current();
    dispatcher.process_messages();
    assert_eq!(dispatcher.take_errors(), vec![HandlerError::new("rejected")]);
}

#[test]
fn emission_to_receiver_on_exited_thread_is_dropped() {
    setup();
    let receiver = thread::spawn(ObjectBase::new::<ObjectBase>).join().unwrap();
    let signal = Signal::<()>::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let c = calls.clone();
    signal
        .connect(&receiver, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    signal.emit(()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(signal.connection_count(), 1);
}

#[test]
fn emission_to_unattached_thread_does_not_accumulate() {
    setup();
    let unattached = thread::spawn(|| thread::current().id()).join().unwrap();
    let receiver = ObjectBase::builder().thread(unattached).build::<ObjectBase>();
    let signal = Signal::<Arc<Vec<u8>>>::new();
    signal.connect(&receiver, |_| {}).unwrap();

    let payload = Arc::new(vec![0u8; 64]);
    for _ in 0..1000 {
        signal.emit(payload.clone()).unwrap();
    }

    assert_eq!(Arc::strong_count(&payload), 1);
    assert_eq!(signal.connection_count(), 1);
}
