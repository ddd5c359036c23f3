// "Thinking..." indicator shown while the generation request is in flight.
//
// The driver and the indicator thread share one `AtomicBool`. Only the
// driver writes it; the indicator polls it between ticks and returns on its
// own once it sees `false`. `stop` waits for that instead of killing the
// thread.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Delay between two ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Where the indicator draws.
pub trait TickSink: Send {
    fn begin(&mut self) {}
    fn tick(&mut self);
    fn finish(&mut self) {}
}

/// Terminal sink: a green `Thinking` line that gains a dot per tick.
pub struct SpinnerSink {
    bar: ProgressBar,
    dots: String,
}

impl SpinnerSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{msg:.green}") {
            bar.set_style(style);
        }
        SpinnerSink { bar, dots: String::new() }
    }
}

impl Default for SpinnerSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSink for SpinnerSink {
    fn begin(&mut self) {
        self.bar.set_message("Thinking");
    }

    fn tick(&mut self) {
        self.dots.push('.');
        self.bar.set_message(format!("Thinking{}", self.dots));
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Sink that draws nothing.
#[derive(Debug, Default)]
pub struct QuietSink;

impl TickSink for QuietSink {
    fn tick(&mut self) {}
}

// Sleep for `interval`, returning early only once `busy` is cleared.
// `park_timeout` can wake spuriously, so keep parking until the deadline.
fn wait_interval(busy: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while busy.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Handle to a running indicator thread.
pub struct BusyIndicator {
    flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BusyIndicator {
    /// Raise `flag` and start ticking on a background thread.
    pub fn start(flag: Arc<AtomicBool>, sink: Box<dyn TickSink>) -> Self {
        Self::with_interval(flag, sink, TICK_INTERVAL)
    }

    pub fn with_interval(flag: Arc<AtomicBool>, mut sink: Box<dyn TickSink>, interval: Duration) -> Self {
        flag.store(true, Ordering::Release);
        let busy = Arc::clone(&flag);
        let handle = thread::spawn(move || {
            sink.begin();
            while busy.load(Ordering::Acquire) {
                sink.tick();
                wait_interval(&busy, interval);
            }
            sink.finish();
        });
        BusyIndicator { flag, handle: Some(handle) }
    }

    /// Lower the flag and wait for the thread to notice and exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.flag.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::warn!("busy indicator thread panicked");
            }
        }
    }
}

impl Drop for BusyIndicator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink(Arc<AtomicUsize>, Arc<AtomicBool>);

    impl TickSink for CountingSink {
        fn tick(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn finish(&mut self) {
            self.1.store(true, Ordering::SeqCst);
        }
    }

    fn counting() -> (Box<dyn TickSink>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let sink = CountingSink(Arc::clone(&ticks), Arc::clone(&finished));
        (Box::new(sink), ticks, finished)
    }

    #[test]
    fn start_then_stop_ticks_at_most_once() {
        let flag = Arc::new(AtomicBool::new(false));
        let (sink, ticks, finished) = counting();

        let indicator = BusyIndicator::start(Arc::clone(&flag), sink);
        assert!(flag.load(Ordering::SeqCst));
        indicator.stop();

        assert!(ticks.load(Ordering::SeqCst) <= 1);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn ticks_while_busy() {
        let flag = Arc::new(AtomicBool::new(false));
        let (sink, ticks, _) = counting();

        let indicator = BusyIndicator::with_interval(Arc::clone(&flag), sink, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(100));
        indicator.stop();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_interval_ignores_unpark_while_busy() {
        let busy = Arc::new(AtomicBool::new(true));
        let waiter = {
            let busy = Arc::clone(&busy);
            thread::spawn(move || {
                let started = Instant::now();
                wait_interval(&busy, Duration::from_millis(200));
                started.elapsed()
            })
        };
        // Wake-ups that are not paired with a cleared flag must not end the wait.
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(10));
            waiter.thread().unpark();
        }
        assert!(waiter.join().unwrap() >= Duration::from_millis(200));
    }

    #[test]
    fn wait_interval_returns_once_flag_clears() {
        let busy = Arc::new(AtomicBool::new(true));
        let waiter = {
            let busy = Arc::clone(&busy);
            thread::spawn(move || {
                let started = Instant::now();
                wait_interval(&busy, Duration::from_secs(10));
                started.elapsed()
            })
        };
        thread::sleep(Duration::from_millis(20));
        busy.store(false, Ordering::Release);
        waiter.thread().unpark();
        assert!(waiter.join().unwrap() < Duration::from_secs(10));
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let flag = Arc::new(AtomicBool::new(false));
        let (sink, _, finished) = counting();

        drop(BusyIndicator::start(Arc::clone(&flag), sink));

        assert!(!flag.load(Ordering::SeqCst));
        assert!(finished.load(Ordering::SeqCst));
    }
}
