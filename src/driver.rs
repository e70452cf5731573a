//! This module provides the `Driver`, which runs a [`TuringMachine`] on a background thread.
//!
//! The worker executes one cycle at a time. Before each cycle it waits on a pause gate
//! and checks the cancel flag; after each cycle it hands a [`Snapshot`] to the observer
//! and sleeps for the configured delay. Failures are reported to the observer as an
//! [`Status::Errored`] snapshot, they never cross the thread boundary as panics.

use crate::machine::TuringMachine;
use crate::snapshot::{Snapshot, Status};
use crate::types::{State, Step, Symbol, TuringMachineError};
use std::any::Any;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How fast the background worker executes cycles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    /// No delay between cycles.
    #[default]
    Unlimited,
    /// Sleep `1 / n` seconds after each cycle.
    StepsPerSecond(NonZeroU32),
}

impl Speed {
    /// Returns the pause inserted after each cycle.
    pub fn delay(self) -> Option<Duration> {
        match self {
            Speed::Unlimited => None,
            Speed::StepsPerSecond(n) => Some(Duration::from_secs(1) / n.get()),
        }
    }
}

/// Receives a snapshot after every cycle executed by a [`Driver`].
///
/// Called on the driver's worker thread. Consumers that must render on a specific
/// thread are responsible for forwarding the snapshot themselves.
pub trait Observer<S, Y>: Send {
    fn notify(&mut self, snapshot: Snapshot<S, Y>);
}

impl<S, Y, F> Observer<S, Y> for F
where
    F: FnMut(Snapshot<S, Y>) + Send,
{
    fn notify(&mut self, snapshot: Snapshot<S, Y>) {
        self(snapshot)
    }
}

/// State shared between the driver handle and its worker.
#[derive(Debug, Default)]
struct Control {
    paused: Mutex<bool>,
    gate: Condvar,
    cancelled: AtomicBool,
    // Zero means unthrottled.
    delay_nanos: AtomicU64,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_paused(&self, paused: bool) {
        *self.lock() = paused;
        self.gate.notify_all();
    }

    fn is_paused(&self) -> bool {
        *self.lock()
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.lock();
        self.gate.notify_all();
    }

    fn is_held(&self) -> bool {
        self.is_paused() && !self.is_cancelled()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_speed(&self, speed: Speed) {
        let nanos = speed
            .delay()
            .map_or(0, |delay| u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX));
        self.delay_nanos.store(nanos, Ordering::Relaxed);
    }

    /// Blocks while paused. Returns `false` once cancelled.
    fn wait_for_gate(&self) -> bool {
        let guard = self.lock();
        let _guard = self
            .gate
            .wait_while(guard, |paused| *paused && !self.is_cancelled())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_cancelled()
    }

    /// Sleeps for the configured delay, waking early on cancellation.
    fn throttle(&self) {
        let nanos = self.delay_nanos.load(Ordering::Relaxed);
        if nanos == 0 {
            return;
        }

        let guard = self.lock();
        let _ = self
            .gate
            .wait_timeout_while(guard, Duration::from_nanos(nanos), |_| {
                !self.is_cancelled()
            })
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Runs an initialized machine on a background thread.
///
/// The machine is moved into the worker while it runs, so it cannot be stepped or
/// inspected from elsewhere until the worker has finished and [`Driver::join`] reclaimed it.
pub struct Driver<S, Y>
where
    S: State + Send + 'static,
    Y: Symbol + Send + 'static,
{
    machine: Option<TuringMachine<S, Y>>,
    control: Arc<Control>,
    worker: Option<JoinHandle<TuringMachine<S, Y>>>,
    started: bool,
}

impl<S, Y> Driver<S, Y>
where
    S: State + Send + 'static,
    Y: Symbol + Send + 'static,
{
    /// Wraps a machine on which `init` has already succeeded.
    pub fn new(machine: TuringMachine<S, Y>, speed: Speed) -> Result<Self, TuringMachineError> {
        if !machine.is_initialized() {
            return Err(TuringMachineError::NotInitialized);
        }

        let control = Arc::new(Control::default());
        control.set_speed(speed);

        Ok(Self {
            machine: Some(machine),
            control,
            worker: None,
            started: false,
        })
    }

    /// Spawns the worker thread. No cycle runs on the calling thread.
    ///
    /// A driver can only be started once. When paused beforehand, the worker waits for
    /// [`Driver::resume`] before its first cycle.
    pub fn start<O>(&mut self, observer: O) -> Result<(), TuringMachineError>
    where
        O: Observer<S, Y> + 'static,
    {
        if self.started {
            return Err(TuringMachineError::AlreadyStarted);
        }
        let machine = self.machine.take().ok_or(TuringMachineError::Busy)?;
        let control = Arc::clone(&self.control);

        let handle = thread::Builder::new()
            .name("tapestack-driver".to_string())
            .spawn(move || work(machine, &control, observer))
            .map_err(|e| TuringMachineError::Worker(format!("Failed to spawn worker: {}", e)))?;

        self.worker = Some(handle);
        self.started = true;
        Ok(())
    }

    /// Stops the worker before its next cycle. A cycle already in flight completes.
    pub fn pause(&self) {
        self.control.set_paused(true);
    }

    pub fn resume(&self) {
        self.control.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Changes the delay between cycles, starting with the next one.
    pub fn set_speed(&self, speed: Speed) {
        self.control.set_speed(speed);
    }

    /// Asks the worker to stop before its next cycle.
    ///
    /// The worker reports a [`Status::Cancelled`] snapshot and exits. It may still be
    /// finishing a cycle when this returns.
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Returns `true` while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Waits for the worker to finish and takes the machine back.
    ///
    /// # Returns
    ///
    /// * `Err(TuringMachineError::Busy)` if the driver is paused while the worker is still
    ///   alive, since it would never finish. Resume or cancel first.
    /// * `Err(TuringMachineError::Worker)` if the worker panicked.
    pub fn join(&mut self) -> Result<(), TuringMachineError> {
        if self.is_running() && self.control.is_held() {
            return Err(TuringMachineError::Busy);
        }
        if let Some(worker) = self.worker.take() {
            let machine = worker
                .join()
                .map_err(|payload| TuringMachineError::Worker(panic_message(payload)))?;
            self.machine = Some(machine);
        }
        Ok(())
    }

    /// Executes one cycle on the calling thread.
    ///
    /// # Returns
    ///
    /// * `Err(TuringMachineError::Busy)` while the worker owns the machine.
    /// * The error of the cycle, if it failed.
    pub fn step(&mut self) -> Result<Snapshot<S, Y>, TuringMachineError> {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join()?;
        }

        let machine = self.machine.as_mut().ok_or(TuringMachineError::Busy)?;
        let step = machine.run_step()?;
        let status = match step {
            Step::Continue(_) => Status::Running,
            Step::Halt => Status::Halted,
        };
        Ok(machine.snapshot(step.action(), status))
    }

    /// Returns the machine unless the worker currently owns it.
    pub fn machine(&self) -> Option<&TuringMachine<S, Y>> {
        self.machine.as_ref()
    }

    /// Cancels the worker, waits for it and returns the machine.
    pub fn into_machine(mut self) -> Result<TuringMachine<S, Y>, TuringMachineError> {
        self.control.cancel();
        self.join()?;
        self.machine.take().ok_or(TuringMachineError::Busy)
    }
}

impl<S, Y> Drop for Driver<S, Y>
where
    S: State + Send + 'static,
    Y: Symbol + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.control.cancel();
            let _ = worker.join();
        }
    }
}

fn work<S, Y, O>(
    mut machine: TuringMachine<S, Y>,
    control: &Control,
    mut observer: O,
) -> TuringMachine<S, Y>
where
    S: State,
    Y: Symbol,
    O: Observer<S, Y>,
{
    tracing::info!(state = ?machine.state(), "driver started");

    loop {
        if !control.wait_for_gate() {
            tracing::info!(steps = machine.step_count(), "driver cancelled");
            observer.notify(machine.snapshot(None, Status::Cancelled));
            break;
        }

        match machine.run_step() {
            Ok(Step::Continue(id)) => {
                observer.notify(machine.snapshot(Some(id), Status::Running));
            }
            Ok(Step::Halt) => {
                tracing::info!(steps = machine.step_count(), "driver finished");
                observer.notify(machine.snapshot(None, Status::Halted));
                break;
            }
            Err(error) => {
                tracing::warn!(%error, "driver stopped on error");
                observer.notify(machine.snapshot(None, Status::Errored(error)));
                break;
            }
        }

        control.throttle();
    }

    machine
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::tests::{inversion, CharMachine};
    use crate::machine::MachineConfig;
    use crate::types::{ActionId, Direction};
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;

    type CharSnapshot = Snapshot<&'static str, char>;

    fn channel() -> (impl Observer<&'static str, char>, Receiver<CharSnapshot>) {
        let (tx, rx) = mpsc::channel();
        let observer = move |snapshot: CharSnapshot| {
            let _ = tx.send(snapshot);
        };
        (observer, rx)
    }

    fn steps_per_second(n: u32) -> Speed {
        Speed::StepsPerSecond(NonZeroU32::new(n).unwrap())
    }

    fn assert_consecutive(snapshots: &[CharSnapshot], first: usize) {
        for (offset, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.step, first + offset, "skipped or repeated cycle");
        }
    }

    #[test]
    fn test_speed_delay() {
        assert_eq!(Speed::Unlimited.delay(), None);
        assert_eq!(steps_per_second(4).delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_runs_to_completion() {
        let mut driver = Driver::new(inversion("0110"), Speed::Unlimited).unwrap();
        let (observer, rx) = channel();

        driver.start(observer).unwrap();
        driver.join().unwrap();

        let snapshots: Vec<_> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 5);
        assert_consecutive(&snapshots, 1);

        let last = snapshots.last().unwrap();
        assert_eq!(last.status, Status::Halted);
        assert_eq!(last.action, None);
        assert_eq!(last.tapes[0].cells, vec!['1', '0', '0', '1', '_']);

        assert_eq!(snapshots[0].status, Status::Running);
        assert_eq!(snapshots[0].action, Some(ActionId(0)));
        assert_eq!(snapshots[1].action, Some(ActionId(1)));

        let machine = driver.machine().unwrap();
        assert!(machine.is_halted());
        assert_eq!(machine.tapes()[0].cells(), last.tapes[0].cells.as_slice());
    }

    #[test]
    fn test_matches_synchronous_run() {
        let mut expected = inversion("1100101");
        expected.run().unwrap();

        let mut driver = Driver::new(inversion("1100101"), Speed::Unlimited).unwrap();
        let (observer, _rx) = channel();
        driver.start(observer).unwrap();
        driver.join().unwrap();
        let machine = driver.into_machine().unwrap();

        assert_eq!(
            machine.snapshot(None, Status::Halted),
            expected.snapshot(None, Status::Halted)
        );
    }

    #[test]
    fn test_start_on_halted_machine() {
        let mut machine = inversion("1");
        machine.run().unwrap();

        let mut driver = Driver::new(machine, Speed::Unlimited).unwrap();
        let (observer, rx) = channel();
        driver.start(observer).unwrap();
        driver.join().unwrap();

        let snapshots: Vec<_> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status, Status::Halted);
        assert_eq!(snapshots[0].step, 2);
    }

    #[test]
    fn test_paused_before_start_delivers_nothing_until_resumed() {
        let mut driver = Driver::new(inversion("01"), Speed::Unlimited).unwrap();
        let (observer, rx) = channel();

        driver.pause();
        driver.start(observer).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(rx.try_recv().is_err());
        assert!(driver.machine().is_none());
        assert!(driver.is_running());

        driver.resume();
        driver.join().unwrap();

        let snapshots: Vec<_> = rx.try_iter().collect();
        assert_consecutive(&snapshots, 1);
        assert_eq!(snapshots.last().unwrap().status, Status::Halted);
    }

    #[test]
    fn test_pause_and_resume_mid_run() {
        let input = "01".repeat(100);
        let mut driver = Driver::new(inversion(&input), steps_per_second(200)).unwrap();
        let (observer, rx) = channel();

        driver.start(observer).unwrap();
        let first = rx.recv().unwrap();
        driver.pause();
        assert!(driver.is_paused());
        driver.pause();

        // Let an in-flight cycle land
        thread::sleep(Duration::from_millis(30));
        let mut received = vec![first];
        received.extend(rx.try_iter());

        thread::sleep(Duration::from_millis(100));
        assert!(rx.try_recv().is_err(), "notification arrived while paused");

        driver.set_speed(Speed::Unlimited);
        driver.resume();
        driver.resume();
        driver.join().unwrap();
        received.extend(rx.try_iter());

        assert_consecutive(&received, 1);
        assert_eq!(received.len(), input.len() + 1);
        assert_eq!(received.last().unwrap().status, Status::Halted);
    }

    #[test]
    fn test_error_is_delivered_to_observer() {
        let mut machine: CharMachine =
            TuringMachine::new(MachineConfig::new("s0", "halt", '_', '*'));
        machine.add_tape(vec!['0', '1']).unwrap();
        machine
            .add_action("s0", vec!['0'], vec![], vec!['*'], vec![], vec![Direction::Right], "s0")
            .unwrap();
        machine.init().unwrap();

        let mut driver = Driver::new(machine, Speed::Unlimited).unwrap();
        let (observer, rx) = channel();
        driver.start(observer).unwrap();
        driver.join().unwrap();

        let snapshots: Vec<_> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].status, Status::Running);

        let last = &snapshots[1];
        assert!(matches!(
            last.status,
            Status::Errored(TuringMachineError::UndefinedTransition { .. })
        ));
        assert_eq!(last.action, None);
        assert_eq!(last.tapes[0].head, 1);
        assert_eq!(*driver.machine().unwrap().state(), "s0");
    }

    #[test]
    fn test_manual_step_after_error_repeats_it() {
        let mut machine: CharMachine =
            TuringMachine::new(MachineConfig::new("s0", "halt", '_', '*'));
        machine.add_tape(vec!['1']).unwrap();
        machine.add_stack(vec!['a', 'b']).unwrap();
        machine
            .add_action(
                "s0",
                vec!['1'],
                vec!['a'],
                vec!['*'],
                vec!['*'],
                vec![Direction::Stay],
                "halt",
            )
            .unwrap();
        machine.init().unwrap();

        let mut driver = Driver::new(machine, Speed::Unlimited).unwrap();
        let (observer, rx) = channel();
        driver.start(observer).unwrap();
        driver.join().unwrap();

        let Status::Errored(error) = rx.try_iter().last().unwrap().status else {
            panic!("Expected the worker to stop on an error");
        };
        assert_eq!(driver.step(), Err(error));
        assert_eq!(*driver.machine().unwrap().state(), "s0");
    }

    #[test]
    fn test_join_while_paused_is_busy() {
        let mut driver = Driver::new(inversion("0101"), Speed::Unlimited).unwrap();
        let (observer, rx) = channel();

        driver.pause();
        driver.start(observer).unwrap();
        assert_eq!(driver.join(), Err(TuringMachineError::Busy));
        assert!(driver.is_running());

        driver.resume();
        driver.join().unwrap();
        assert_eq!(rx.try_iter().last().unwrap().status, Status::Halted);
    }

    #[test]
    fn test_into_machine_while_paused_cancels() {
        let mut driver = Driver::new(inversion("0101"), Speed::Unlimited).unwrap();
        let (observer, rx) = channel();

        driver.pause();
        driver.start(observer).unwrap();
        let machine = driver.into_machine().unwrap();

        assert_eq!(machine.step_count(), 0);
        assert_eq!(rx.try_iter().last().unwrap().status, Status::Cancelled);
    }

    #[test]
    fn test_cancel_while_paused() {
        let mut driver = Driver::new(inversion("0101"), Speed::Unlimited).unwrap();
        let (observer, rx) = channel();

        driver.pause();
        driver.start(observer).unwrap();
        driver.cancel();
        driver.join().unwrap();

        let snapshots: Vec<_> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status, Status::Cancelled);
        assert_eq!(snapshots[0].step, 0);
        assert_eq!(driver.machine().unwrap().step_count(), 0);
    }

    #[test]
    fn test_cancel_interrupts_throttle() {
        let mut driver = Driver::new(inversion(&"0".repeat(50)), steps_per_second(1)).unwrap();
        let (observer, rx) = channel();

        driver.start(observer).unwrap();
        rx.recv().unwrap();
        let started = Instant::now();
        driver.cancel();
        driver.join().unwrap();

        assert!(started.elapsed() < Duration::from_millis(900));
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.status, Status::Cancelled);
        assert_eq!(driver.machine().unwrap().step_count(), 1);
    }

    #[test]
    fn test_throttled_run_takes_time() {
        let mut driver = Driver::new(inversion("000"), steps_per_second(50)).unwrap();
        let (observer, _rx) = channel();

        let started = Instant::now();
        driver.start(observer).unwrap();
        driver.join().unwrap();

        // Three delays of 20ms separate the four cycles
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_manual_step_is_rejected_while_running() {
        let mut driver = Driver::new(inversion("01"), Speed::Unlimited).unwrap();
        let (observer, _rx) = channel();

        driver.pause();
        driver.start(observer).unwrap();
        assert_eq!(driver.step().unwrap_err(), TuringMachineError::Busy);

        driver.cancel();
        driver.join().unwrap();

        let snapshot = driver.step().unwrap();
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.status, Status::Running);
        assert_eq!(snapshot.tapes[0].cells, vec!['1', '1']);
    }

    #[test]
    fn test_manual_steps_without_worker() {
        let mut driver = Driver::new(inversion("0"), Speed::Unlimited).unwrap();

        assert_eq!(driver.step().unwrap().action, Some(ActionId(0)));
        let last = driver.step().unwrap();
        assert_eq!(last.status, Status::Halted);
        assert_eq!(last.action, None);
    }

    #[test]
    fn test_requires_initialized_machine() {
        let machine: CharMachine = TuringMachine::new(MachineConfig::new("s0", "halt", '_', '*'));
        assert!(matches!(
            Driver::new(machine, Speed::Unlimited),
            Err(TuringMachineError::NotInitialized)
        ));
    }

    #[test]
    fn test_start_twice() {
        let mut driver = Driver::new(inversion("0"), Speed::Unlimited).unwrap();
        let (first, _rx1) = channel();
        let (second, _rx2) = channel();

        driver.start(first).unwrap();
        assert_eq!(driver.start(second), Err(TuringMachineError::AlreadyStarted));
        driver.join().unwrap();
    }

    #[test]
    fn test_drop_cancels_worker() {
        let mut driver = Driver::new(inversion(&"0".repeat(1000)), steps_per_second(10)).unwrap();
        let (observer, rx) = channel();
        driver.start(observer).unwrap();
        rx.recv().unwrap();

        let started = Instant::now();
        drop(driver);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(rx.try_iter().last().unwrap().status, Status::Cancelled);
    }
}
