//! Session control loop
//!
//! Idle → AwaitingDevice → Streaming, with ShuttingDown as the terminal
//! state. A lost controller sends the session back to discovery. The
//! shutdown token is checked once per iteration.

pub mod signals;

use log::{debug, info, warn};
use std::time::Duration;

use crate::input::normalizer::RawEventKind;
use crate::input::{DeviceFinder, EventStream, Normalizer, RawEvent};
use crate::output::{Flow, Outcome, Output, OutputError};

pub use signals::{ShutdownSignal, SignalShutdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingDevice,
    Streaming,
    ShuttingDown,
}

/// Loop timing and the two control buttons
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub confirm_code: u16,
    pub clear_code: u16,
    /// Sleep when no events are pending
    pub poll_interval: Duration,
    /// Sleep between discovery scans
    pub discovery_interval: Duration,
}

pub struct Session<F: DeviceFinder, O: Output, S: ShutdownSignal> {
    finder: F,
    output: O,
    shutdown: S,
    normalizer: Normalizer,
    config: SessionConfig,
    state: State,
    device: Option<F::Device>,
    events: Vec<RawEvent>,
}

impl<F: DeviceFinder, O: Output, S: ShutdownSignal> Session<F, O, S> {
    pub fn new(
        finder: F,
        output: O,
        shutdown: S,
        normalizer: Normalizer,
        config: SessionConfig,
    ) -> Self {
        Self {
            finder,
            output,
            shutdown,
            normalizer,
            config,
            state: State::Idle,
            device: None,
            events: Vec::with_capacity(64),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Run until shutdown or an output that finishes the session
    pub fn run(&mut self) -> Result<Outcome, OutputError> {
        loop {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    /// One loop iteration. Returns the outcome once the session is over.
    pub fn step(&mut self) -> Result<Option<Outcome>, OutputError> {
        if self.state != State::ShuttingDown && self.shutdown.requested() {
            self.finish();
            return Ok(Some(Outcome::Stopped));
        }

        match self.state {
            State::Idle => {
                let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);
                info!("Waiting for controller");
                self.state = State::AwaitingDevice;
            }
            State::AwaitingDevice => match self.finder.find() {
                Some(device) => {
                    self.device = Some(device);
                    self.state = State::Streaming;
                }
                None => sleep(self.config.discovery_interval),
            },
            State::Streaming => return self.stream(),
            State::ShuttingDown => return Ok(Some(Outcome::Stopped)),
        }
        Ok(None)
    }

    fn stream(&mut self) -> Result<Option<Outcome>, OutputError> {
        let Some(device) = self.device.as_mut() else {
            self.state = State::AwaitingDevice;
            return Ok(None);
        };

        self.events.clear();
        if let Err(e) = device.poll_events(&mut self.events) {
            warn!("{}", e);
            self.device = None;
            self.normalizer.release_all();
            self.state = State::AwaitingDevice;
            return Ok(None);
        }
        if self.events.is_empty() {
            sleep(self.config.poll_interval);
            return Ok(None);
        }

        let events = std::mem::take(&mut self.events);
        let mut result = Ok(None);
        for event in &events {
            match self.dispatch(event) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finish(outcome)) => {
                    self.finish();
                    result = Ok(Some(outcome));
                    break;
                }
                Err(e) => {
                    self.finish();
                    result = Err(e);
                    break;
                }
            }
        }
        self.events = events;
        result
    }

    /// Control buttons are consumed here and never reach the normalizer
    fn dispatch(&mut self, event: &RawEvent) -> Result<Flow, OutputError> {
        if event.kind == RawEventKind::Key {
            if event.code == self.config.confirm_code {
                return if event.is_key_release() {
                    self.output.confirm()
                } else {
                    Ok(Flow::Continue)
                };
            }
            if event.code == self.config.clear_code {
                return if event.is_key_release() {
                    self.output.clear()
                } else {
                    Ok(Flow::Continue)
                };
            }
        }
        match self.normalizer.handle(event) {
            Some(combo) => self.output.combination(&combo),
            None => Ok(Flow::Continue),
        }
    }

    fn finish(&mut self) {
        debug!("Session shutting down");
        let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
        self.device = None;
        self.state = State::ShuttingDown;
    }
}

fn sleep(interval: Duration) {
    if !interval.is_zero() {
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::constants::{BTN_BASE3, BTN_BASE4, BTN_THUMB, BTN_TRIGGER};
    use crate::input::device::DeviceError;
    use crate::input::{ButtonTable, Combination};
    use crate::keymap::CharMap;
    use crate::output::TypeOutput;
    use crate::typing::{KeySink, Typist, TypingError};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    type Batch = Result<Vec<RawEvent>, ()>;

    /// Replays scripted batches, then reports nothing pending
    struct FakeDevice {
        batches: VecDeque<Batch>,
        drops: Rc<Cell<usize>>,
    }

    impl EventStream for FakeDevice {
        fn poll_events(&mut self, out: &mut Vec<RawEvent>) -> Result<(), DeviceError> {
            match self.batches.pop_front() {
                Some(Ok(events)) => {
                    out.extend(events);
                    Ok(())
                }
                Some(Err(())) => Err(DeviceError::Lost(io::Error::from_raw_os_error(libc::ENODEV))),
                None => Ok(()),
            }
        }
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    /// Hands out one scripted device per entry; None entries are failed scans
    struct FakeFinder {
        devices: VecDeque<Option<FakeDevice>>,
        scans: Rc<Cell<usize>>,
    }

    impl DeviceFinder for FakeFinder {
        type Device = FakeDevice;

        fn find(&mut self) -> Option<FakeDevice> {
            self.scans.set(self.scans.get() + 1);
            self.devices.pop_front().flatten()
        }
    }

    /// Requests shutdown after a number of polls
    struct AfterPolls(usize);

    impl ShutdownSignal for AfterPolls {
        fn requested(&mut self) -> bool {
            if self.0 == 0 {
                return true;
            }
            self.0 -= 1;
            false
        }
    }

    /// Records actions; confirm/clear finish only when `finishing`
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        finishing: bool,
    }

    impl Output for Recorder {
        fn combination(&mut self, combo: &Combination) -> Result<Flow, OutputError> {
            self.log.borrow_mut().push(combo.to_string());
            Ok(Flow::Continue)
        }

        fn confirm(&mut self) -> Result<Flow, OutputError> {
            self.log.borrow_mut().push("<confirm>".to_string());
            Ok(if self.finishing {
                Flow::Finish(Outcome::Confirmed)
            } else {
                Flow::Continue
            })
        }

        fn clear(&mut self) -> Result<Flow, OutputError> {
            self.log.borrow_mut().push("<clear>".to_string());
            Ok(if self.finishing {
                Flow::Finish(Outcome::Aborted)
            } else {
                Flow::Continue
            })
        }
    }

    struct Harness {
        drops: Rc<Cell<usize>>,
        scans: Rc<Cell<usize>>,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                drops: Rc::new(Cell::new(0)),
                scans: Rc::new(Cell::new(0)),
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn device(&self, batches: Vec<Batch>) -> Option<FakeDevice> {
            Some(FakeDevice {
                batches: batches.into(),
                drops: self.drops.clone(),
            })
        }

        fn session(
            &self,
            devices: Vec<Option<FakeDevice>>,
            finishing: bool,
            polls: usize,
        ) -> Session<FakeFinder, Recorder, AfterPolls> {
            let table = ButtonTable::from_config(&InputConfig::default()).unwrap();
            Session::new(
                FakeFinder {
                    devices: devices.into(),
                    scans: self.scans.clone(),
                },
                Recorder {
                    log: self.log.clone(),
                    finishing,
                },
                AfterPolls(polls),
                Normalizer::new(table, 250),
                SessionConfig {
                    confirm_code: BTN_BASE4,
                    clear_code: BTN_BASE3,
                    poll_interval: Duration::ZERO,
                    discovery_interval: Duration::ZERO,
                },
            )
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    fn trig_thmb(t: i64) -> Vec<RawEvent> {
        vec![
            RawEvent::key(BTN_TRIGGER, 1, t),
            RawEvent::key(BTN_THUMB, 1, t + 400),
            RawEvent::key(BTN_THUMB, 0, t + 450),
            RawEvent::key(BTN_TRIGGER, 0, t + 600),
        ]
    }

    #[test]
    fn test_state_progression() {
        let h = Harness::new();
        let mut session = h.session(vec![None, h.device(vec![])], false, 100);
        assert_eq!(session.state(), State::Idle);
        session.step().unwrap();
        assert_eq!(session.state(), State::AwaitingDevice);
        session.step().unwrap();
        assert_eq!(session.state(), State::AwaitingDevice);
        session.step().unwrap();
        assert_eq!(session.state(), State::Streaming);
        assert_eq!(h.scans.get(), 2);
    }

    #[test]
    fn test_confirm_finishes_print_style_output() {
        let h = Harness::new();
        let mut events = trig_thmb(0);
        events.push(RawEvent::key(BTN_BASE4, 1, 1000));
        events.push(RawEvent::key(BTN_BASE4, 0, 1100));
        // Never reached
        events.push(RawEvent::key(BTN_TRIGGER, 1, 1200));
        events.push(RawEvent::key(BTN_TRIGGER, 0, 1250));
        let mut session = h.session(vec![h.device(vec![Ok(events)])], true, 100);

        assert_eq!(session.run().unwrap(), Outcome::Confirmed);
        assert_eq!(h.log(), ["TRIG+THMB;", "<confirm>"]);
        assert_eq!(session.state(), State::ShuttingDown);
        assert_eq!(h.drops.get(), 1);
    }

    #[test]
    fn test_clear_aborts_print_style_output() {
        let h = Harness::new();
        let events = vec![RawEvent::key(BTN_BASE3, 1, 10), RawEvent::key(BTN_BASE3, 0, 20)];
        let mut session = h.session(vec![h.device(vec![Ok(events)])], true, 100);
        assert_eq!(session.run().unwrap(), Outcome::Aborted);
        assert_eq!(h.log(), ["<clear>"]);
        assert_eq!(h.drops.get(), 1);
    }

    #[test]
    fn test_type_style_output_runs_until_shutdown() {
        let h = Harness::new();
        let events = vec![
            RawEvent::key(BTN_BASE4, 1, 10),
            RawEvent::key(BTN_BASE4, 0, 20),
            RawEvent::key(BTN_BASE3, 1, 30),
            RawEvent::key(BTN_BASE3, 0, 40),
        ];
        let mut session = h.session(vec![h.device(vec![Ok(events)])], false, 10);
        assert_eq!(session.run().unwrap(), Outcome::Stopped);
        assert_eq!(h.log(), ["<confirm>", "<clear>"]);
        assert_eq!(h.drops.get(), 1);
    }

    #[test]
    fn test_device_loss_rediscovers() {
        let h = Harness::new();
        let first = h.device(vec![Ok(trig_thmb(0)), Err(())]);
        let second = h.device(vec![Ok(trig_thmb(5000))]);
        let mut session = h.session(vec![first, None, second], false, 20);

        assert_eq!(session.run().unwrap(), Outcome::Stopped);
        assert_eq!(h.log(), ["TRIG+THMB;", "TRIG+THMB;"]);
        assert_eq!(h.scans.get(), 3);
        // Lost device dropped on loss, second on shutdown
        assert_eq!(h.drops.get(), 2);
    }

    #[test]
    fn test_device_loss_forgets_held_buttons() {
        let h = Harness::new();
        // TRIG still down when the controller goes away
        let first = h.device(vec![Ok(vec![RawEvent::key(BTN_TRIGGER, 1, 0)]), Err(())]);
        let second = h.device(vec![Ok(vec![
            RawEvent::key(BTN_THUMB, 1, 2000),
            RawEvent::key(BTN_THUMB, 0, 2050),
        ])]);
        let mut session = h.session(vec![first, second], false, 20);

        assert_eq!(session.run().unwrap(), Outcome::Stopped);
        assert_eq!(h.log(), ["THMB;"]);
    }

    /// Key sink counting its own drops; optionally failing every write
    struct CountingSink {
        drops: Rc<Cell<usize>>,
        broken: bool,
    }

    impl KeySink for CountingSink {
        fn write_key(&mut self, _: u16, _: bool) -> Result<(), TypingError> {
            if self.broken {
                return Err(TypingError::Write(io::Error::from_raw_os_error(libc::ENODEV)));
            }
            Ok(())
        }

        fn sync(&mut self) -> Result<(), TypingError> {
            Ok(())
        }
    }

    impl Drop for CountingSink {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn typing_session(
        h: &Harness,
        sink_drops: &Rc<Cell<usize>>,
        broken: bool,
        batches: Vec<Batch>,
    ) -> Session<FakeFinder, TypeOutput<CountingSink>, AfterPolls> {
        let table = ButtonTable::from_config(&InputConfig::default()).unwrap();
        let sink = CountingSink {
            drops: sink_drops.clone(),
            broken,
        };
        Session::new(
            FakeFinder {
                devices: vec![h.device(batches)].into(),
                scans: h.scans.clone(),
            },
            TypeOutput::new(Typist::new(sink, CharMap::us(), Duration::ZERO)),
            AfterPolls(10),
            Normalizer::new(table, 250),
            SessionConfig {
                confirm_code: BTN_BASE4,
                clear_code: BTN_BASE3,
                poll_interval: Duration::ZERO,
                discovery_interval: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_shutdown_releases_controller_and_keyboard_once() {
        let h = Harness::new();
        let sink_drops = Rc::new(Cell::new(0));
        let mut session = typing_session(&h, &sink_drops, false, vec![Ok(trig_thmb(0))]);

        assert_eq!(session.run().unwrap(), Outcome::Stopped);
        assert_eq!(h.drops.get(), 1);
        assert_eq!(session.step().unwrap(), Some(Outcome::Stopped));
        drop(session);
        assert_eq!(h.drops.get(), 1);
        assert_eq!(sink_drops.get(), 1);
    }

    #[test]
    fn test_keyboard_write_error_releases_once() {
        let h = Harness::new();
        let sink_drops = Rc::new(Cell::new(0));
        let mut session = typing_session(&h, &sink_drops, true, vec![Ok(trig_thmb(0))]);

        assert!(matches!(session.run(), Err(OutputError::Typing(_))));
        assert_eq!(h.drops.get(), 1);
        drop(session);
        assert_eq!(h.drops.get(), 1);
        assert_eq!(sink_drops.get(), 1);
    }

    #[test]
    fn test_shutdown_without_device() {
        let h = Harness::new();
        let mut session = h.session(vec![], false, 5);
        assert_eq!(session.run().unwrap(), Outcome::Stopped);
        assert_eq!(session.state(), State::ShuttingDown);
        assert_eq!(h.drops.get(), 0);
        // Further steps stay finished without touching the device
        assert_eq!(session.step().unwrap(), Some(Outcome::Stopped));
        assert_eq!(h.drops.get(), 0);
    }

    #[test]
    fn test_output_error_ends_session() {
        struct Failing;
        impl Output for Failing {
            fn combination(&mut self, _: &Combination) -> Result<Flow, OutputError> {
                Err(OutputError::Write(io::Error::from(io::ErrorKind::BrokenPipe)))
            }
            fn confirm(&mut self) -> Result<Flow, OutputError> {
                Ok(Flow::Continue)
            }
            fn clear(&mut self) -> Result<Flow, OutputError> {
                Ok(Flow::Continue)
            }
        }

        let h = Harness::new();
        let table = ButtonTable::from_config(&InputConfig::default()).unwrap();
        let mut session = Session::new(
            FakeFinder {
                devices: vec![h.device(vec![Ok(trig_thmb(0))])].into(),
                scans: h.scans.clone(),
            },
            Failing,
            AfterPolls(100),
            Normalizer::new(table, 250),
            SessionConfig {
                confirm_code: BTN_BASE4,
                clear_code: BTN_BASE3,
                poll_interval: Duration::ZERO,
                discovery_interval: Duration::ZERO,
            },
        );
        assert!(session.run().is_err());
        assert_eq!(h.drops.get(), 1);
    }
}
