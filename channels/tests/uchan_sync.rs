mod common;
use common::*;

use fibre_uchan::{
  CancelSignal, ChannelBuilder, CloseError, RecvCancelError, RecvError, RecvTimeoutError,
  TryRecvError, UnboundedChannel,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn uchan_sync_smoke() {
  init_tracing();
  let chan = UnboundedChannel::new(4);
  chan.send(10).unwrap();
  assert_eq!(chan.recv(), Ok(10));
  assert_eq!(chan.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn uchan_sends_never_block_past_fast_path() {
  init_tracing();
  let chan = UnboundedChannel::new(1);
  let start = Instant::now();
  for i in 0..ITEMS_HIGH {
    chan.send(i).unwrap();
  }
  assert!(start.elapsed() < STRESS_TIMEOUT);
  assert_eq!(chan.len(), ITEMS_HIGH);

  for i in 0..ITEMS_HIGH {
    assert_eq!(chan.recv(), Ok(i));
  }
  assert!(chan.is_empty());
}

#[test]
fn uchan_close_drains_before_reporting_closed() {
  let chan = UnboundedChannel::new(2);
  for i in 0..ITEMS_LOW {
    chan.send(i).unwrap();
  }
  chan.close().unwrap();
  assert!(chan.is_closed());
  assert!(chan.send(999).is_err());

  for i in 0..ITEMS_LOW {
    assert_eq!(chan.recv(), Ok(i));
  }
  assert_eq!(chan.recv(), Err(RecvError::Closed));
  assert_eq!(chan.try_recv(), Err(TryRecvError::Closed));
  assert_eq!(chan.recv_timeout(SHORT_TIMEOUT), Err(RecvTimeoutError::Closed));
}

#[test]
fn uchan_send_after_close_returns_value() {
  let chan = UnboundedChannel::new(1);
  chan.close().unwrap();
  let err = chan.send(String::from("late")).unwrap_err();
  assert_eq!(err.into_inner(), "late");
}

#[test]
fn uchan_close_twice_reports_error() {
  let chan = UnboundedChannel::<u8>::new(1);
  assert_eq!(chan.close(), Ok(()));
  assert_eq!(chan.close(), Err(CloseError));
  assert!(chan.is_closed());
}

#[test]
fn uchan_send_and_close_delivers_final_value() {
  let chan = UnboundedChannel::new(1);
  chan.send(1).unwrap();
  chan.send(2).unwrap();
  chan.send_and_close(3).unwrap();
  assert!(chan.is_closed());
  assert!(chan.send(4).is_err());
  assert!(chan.send_and_close(5).is_err());

  assert_eq!(chan.recv(), Ok(1));
  assert_eq!(chan.recv(), Ok(2));
  assert_eq!(chan.recv(), Ok(3));
  assert_eq!(chan.recv(), Err(RecvError::Closed));
}

#[test]
fn uchan_close_wakes_blocked_receivers() {
  let chan = UnboundedChannel::<u32>::new(1);
  let receivers: Vec<_> = (0..4)
    .map(|_| {
      let chan = chan.clone();
      thread::spawn(move || chan.recv())
    })
    .collect();
  thread::sleep(SHORT_TIMEOUT);
  chan.close().unwrap();
  for receiver in receivers {
    assert_eq!(receiver.join().unwrap(), Err(RecvError::Closed));
  }
}

#[test]
fn uchan_recv_timeout_zero_returns_queued_value() {
  let chan = UnboundedChannel::new(0);
  chan.send(5).unwrap();
  assert_eq!(chan.recv_timeout(Duration::ZERO), Ok(5));
  assert_eq!(chan.recv_timeout(Duration::ZERO), Err(RecvTimeoutError::TimedOut));
}

#[test]
fn uchan_recv_timeout_waits_at_least_timeout() {
  let chan = UnboundedChannel::<u8>::new(1);
  let start = Instant::now();
  assert_eq!(chan.recv_timeout(SHORT_TIMEOUT), Err(RecvTimeoutError::TimedOut));
  assert!(start.elapsed() >= SHORT_TIMEOUT);
}

#[test]
fn uchan_recv_timeout_receives_late_send() {
  let chan = UnboundedChannel::new(1);
  let producer = {
    let chan = chan.clone();
    thread::spawn(move || {
      thread::sleep(SHORT_TIMEOUT);
      chan.send("late").unwrap();
    })
  };
  assert_eq!(chan.recv_timeout(LONG_TIMEOUT), Ok("late"));
  producer.join().unwrap();
}

#[test]
fn uchan_zero_capacity_hands_off_to_waiting_receiver() {
  let chan = UnboundedChannel::new(0);
  let receiver = {
    let chan = chan.clone();
    thread::spawn(move || chan.recv())
  };
  thread::sleep(SHORT_TIMEOUT);
  chan.send(42).unwrap();
  assert_eq!(receiver.join().unwrap(), Ok(42));
}

#[test]
fn uchan_zero_capacity_preserves_order() {
  let chan = UnboundedChannel::new(0);
  for i in 0..ITEMS_LOW {
    chan.send(i).unwrap();
  }
  for i in 0..ITEMS_LOW {
    assert_eq!(chan.recv(), Ok(i));
  }
}

#[test]
fn uchan_recv_cancel_returns_canceled() {
  let chan = UnboundedChannel::<u32>::new(1);
  let signal = CancelSignal::new();
  let canceller = {
    let signal = signal.clone();
    thread::spawn(move || {
      thread::sleep(SHORT_TIMEOUT);
      assert!(signal.fire());
    })
  };
  assert_eq!(chan.recv_cancel(&signal), Err(RecvCancelError::Canceled));
  canceller.join().unwrap();
  assert!(signal.is_fired());
  assert!(!signal.fire());
}

#[test]
fn uchan_recv_cancel_prefers_queued_value() {
  let chan = UnboundedChannel::new(1);
  let signal = CancelSignal::new();
  signal.fire();
  chan.send(7).unwrap();
  assert_eq!(chan.recv_cancel(&signal), Ok(7));
  assert_eq!(chan.recv_cancel(&signal), Err(RecvCancelError::Canceled));
}

#[test]
fn uchan_recv_cancel_reports_closed() {
  let chan = UnboundedChannel::<u32>::new(1);
  let signal = CancelSignal::new();
  chan.close().unwrap();
  assert_eq!(chan.recv_cancel(&signal), Err(RecvCancelError::Closed));
}

#[test]
fn uchan_event_handle_receives_value() {
  let chan = UnboundedChannel::new(1);
  let handle = chan.recv_as_event();
  chan.send(11).unwrap();
  assert_eq!(handle.recv_timeout(LONG_TIMEOUT), Ok(11));
  assert!(handle.is_canceled());
  assert!(!handle.cancel());
}

#[test]
fn uchan_event_handle_closed_on_empty_close() {
  let chan = UnboundedChannel::<u32>::new(1);
  let handle = chan.recv_as_event();
  chan.close().unwrap();
  assert_eq!(handle.recv(), Err(RecvError::Closed));
}

#[test]
fn uchan_event_handle_cancel_is_idempotent() {
  let chan = UnboundedChannel::<u32>::new(1);
  let handle = chan.recv_as_event();
  assert!(handle.cancel());
  assert!(!handle.cancel());
  assert_eq!(handle.recv(), Err(RecvError::Closed));
  assert_eq!(handle.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn uchan_event_handle_timeout_does_not_cancel() {
  let chan = UnboundedChannel::new(1);
  let handle = chan.recv_as_event();
  assert_eq!(handle.recv_timeout(SHORT_TIMEOUT), Err(RecvTimeoutError::TimedOut));
  assert!(!handle.is_canceled());
  chan.send(3).unwrap();
  assert_eq!(handle.recv_timeout(LONG_TIMEOUT), Ok(3));
}

#[test]
fn uchan_event_cancel_race_never_loses_value() {
  init_tracing();
  let chan = UnboundedChannel::new(1);
  for round in 0..ITEMS_LOW {
    let handle = chan.recv_as_event();
    chan.send(round).unwrap();
    if round % 2 == 0 {
      thread::yield_now();
    }
    if handle.cancel() {
      // A canceled handle never removes the value; the handle is still alive.
      assert_eq!(chan.recv_timeout(LONG_TIMEOUT), Ok(round));
    } else {
      assert_eq!(handle.recv_timeout(LONG_TIMEOUT), Ok(round));
    }
    assert!(chan.is_empty());
  }
}

#[test]
fn uchan_event_cancel_race_on_closed_channel_keeps_value_receivable() {
  init_tracing();
  for _ in 0..ITEMS_MEDIUM {
    let chan = UnboundedChannel::new(1);
    chan.send_and_close(7).unwrap();
    let handle = chan.recv_as_event();
    thread::yield_now();
    if handle.cancel() {
      // No drop or join: the background receive may still be running.
      assert_eq!(chan.recv(), Ok(7));
      assert_eq!(chan.recv(), Err(RecvError::Closed));
    } else {
      assert_eq!(handle.recv(), Ok(7));
      assert_eq!(chan.try_recv(), Err(TryRecvError::Closed));
    }
  }
}

#[test]
fn uchan_event_cancel_race_keeps_fifo_order() {
  for _ in 0..ITEMS_MEDIUM {
    let chan = UnboundedChannel::new(1);
    chan.send(1).unwrap();
    chan.send(2).unwrap();
    let handle = chan.recv_as_event();
    if handle.cancel() {
      assert_eq!(chan.recv(), Ok(1));
      assert_eq!(chan.recv(), Ok(2));
    } else {
      assert_eq!(handle.recv(), Ok(1));
      assert_eq!(chan.recv(), Ok(2));
    }
  }
}

#[test]
fn uchan_dropping_handle_keeps_value_in_channel() {
  let chan = UnboundedChannel::new(0);
  let handle = chan.recv_as_event();
  drop(handle);
  chan.send("kept").unwrap();
  assert_eq!(chan.try_recv(), Ok("kept"));
}

#[test]
fn uchan_builder_names_channel() {
  let chan = ChannelBuilder::<u32>::new()
    .fast_path_capacity(0)
    .name("jobs")
    .build()
    .unwrap();
  assert_eq!(chan.name(), Some("jobs"));
  assert_eq!(chan.capacity(), 0);
  chan.send(1).unwrap();
  assert_eq!(chan.recv(), Ok(1));
}

#[test]
fn uchan_multi_producer_keeps_per_producer_order() {
  init_tracing();
  let num_producers = 4;
  let chan = UnboundedChannel::new(2);
  let barrier = Arc::new(Barrier::new(num_producers));

  let producers: Vec<_> = (0..num_producers)
    .map(|p| {
      let chan = chan.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for i in 0..ITEMS_MEDIUM {
          chan.send((p, i)).unwrap();
        }
      })
    })
    .collect();

  let mut next = vec![0usize; num_producers];
  for _ in 0..num_producers * ITEMS_MEDIUM {
    let (p, i) = chan.recv_timeout(LONG_TIMEOUT).unwrap();
    assert_eq!(i, next[p], "producer {} out of order", p);
    next[p] += 1;
  }
  for producer in producers {
    producer.join().unwrap();
  }
  assert!(next.iter().all(|&n| n == ITEMS_MEDIUM));
}

#[test]
fn uchan_mpmc_stress_delivers_each_value_once() {
  init_tracing();
  let num_producers = 4;
  let num_consumers = 4;
  let chan = UnboundedChannel::new(1);
  let received = Arc::new(AtomicUsize::new(0));

  let consumers: Vec<_> = (0..num_consumers)
    .map(|_| {
      let chan = chan.clone();
      let received = received.clone();
      thread::spawn(move || {
        let mut seen = Vec::new();
        while let Ok(value) = chan.recv() {
          seen.push(value);
          received.fetch_add(1, Ordering::Relaxed);
        }
        seen
      })
    })
    .collect();

  let producers: Vec<_> = (0..num_producers)
    .map(|p| {
      let chan = chan.clone();
      thread::spawn(move || {
        for i in 0..ITEMS_MEDIUM {
          chan.send(p * ITEMS_MEDIUM + i).unwrap();
        }
      })
    })
    .collect();
  for producer in producers {
    producer.join().unwrap();
  }
  chan.close().unwrap();

  let mut all = HashSet::new();
  for consumer in consumers {
    for value in consumer.join().unwrap() {
      assert!(all.insert(value), "value {} received twice", value);
    }
  }
  assert_eq!(all.len(), num_producers * ITEMS_MEDIUM);
  assert_eq!(received.load(Ordering::Relaxed), num_producers * ITEMS_MEDIUM);
}

#[test]
fn uchan_send_and_close_races_with_send() {
  for _ in 0..ITEMS_LOW {
    let chan = UnboundedChannel::new(1);
    let sender = {
      let chan = chan.clone();
      thread::spawn(move || chan.send(1).is_ok())
    };
    chan.send_and_close(2).unwrap();
    let first_accepted = sender.join().unwrap();

    let mut values = Vec::new();
    while let Ok(value) = chan.recv() {
      values.push(value);
    }
    // The final value is always last; nothing is accepted after it.
    assert_eq!(values.last(), Some(&2));
    assert_eq!(values.len(), if first_accepted { 2 } else { 1 });
  }
}
