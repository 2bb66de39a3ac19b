//! Recording output backend for tests.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::error::DeviceError;
use crate::output::{OutputBackend, OutputStream, StreamSpec};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Open(StreamSpec),
    Start,
    Write(Vec<i16>),
    Stop,
    Close,
    Release,
}

/// Shared call log.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Backend whose streams record every call.
///
/// With a gate installed, each `write` announces itself on `entered` and then
/// waits for one token on the gate before returning.
pub struct MockBackend {
    log: CallLog,
    fail_open: bool,
    fail_start: bool,
    fail_write: bool,
    fail_stop: bool,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            fail_open: false,
            fail_start: false,
            fail_write: false,
            fail_stop: false,
            gate: None,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// `start` is recorded, then fails.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// `stop` is recorded, then fails.
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn gated(mut self, entered: Sender<()>, gate: Receiver<()>) -> Self {
        self.gate = Some((entered, gate));
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

pub struct MockStream {
    log: CallLog,
    fail_start: bool,
    fail_write: bool,
    fail_stop: bool,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

impl OutputBackend for MockBackend {
    type Stream = MockStream;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Initialize);
        Ok(())
    }

    fn open_stream(&mut self, spec: &StreamSpec) -> Result<MockStream, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::Open("mock refused".to_string()));
        }
        self.log.push(Call::Open(*spec));
        Ok(MockStream {
            log: self.log.clone(),
            fail_start: self.fail_start,
            fail_write: self.fail_write,
            fail_stop: self.fail_stop,
            gate: self.gate.clone(),
        })
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Release);
        Ok(())
    }
}

impl OutputStream for MockStream {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Start);
        if self.fail_start {
            return Err(DeviceError::Start("mock start failure".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<(), DeviceError> {
        if self.fail_write {
            return Err(DeviceError::Write("mock write failure".to_string()));
        }
        if let Some((entered, gate)) = &self.gate {
            let _ = entered.send(());
            let _ = gate.recv();
        }
        self.log.push(Call::Write(samples.to_vec()));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Stop);
        if self.fail_stop {
            return Err(DeviceError::Stop("mock stop failure".to_string()));
        }
        Ok(())
    }

    fn close(self) -> Result<(), DeviceError> {
        self.log.push(Call::Close);
        Ok(())
    }
}
