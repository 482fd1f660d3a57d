//! Scripted transport for testing code that drives a master
//!
//! The [`Handle`] queues the reads the transport will deliver and the writes it expects,
//! in order. Unexpected or mismatched writes panic. A read with nothing scripted behaves
//! like a silent line and fails with [`RequestError::ResponseTimeout`].

use std::io::ErrorKind;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use crate::client::transport::{RawReadTimeouts, RtuTransport, StreamTransport, Transport};
use crate::error::RequestError;

/// create a transport and the handle that scripts it
pub fn mock() -> (MockTransport, Handle) {
    let (tx, rx) = channel();
    let (event_tx, event_rx) = channel();
    let transport = MockTransport {
        next: None,
        rx,
        tx: event_tx,
        interframe_delay: None,
    };
    let handle = Handle { tx, rx: event_rx };
    (transport, handle)
}

/// Transport that replays the actions queued on its [`Handle`]
#[derive(Debug)]
pub struct MockTransport {
    // the current action
    next: Option<Action>,
    // how additional actions can be received
    rx: Receiver<Action>,
    // how events get pushed back to the test
    tx: Sender<Event>,
    interframe_delay: Option<Duration>,
}

/// Scripts a [`MockTransport`] and observes what it did
#[derive(Debug)]
pub struct Handle {
    tx: Sender<Action>,
    rx: Receiver<Event>,
}

impl Handle {
    /// deliver `data` as one chunk on a following read
    pub fn read(&mut self, data: &[u8]) {
        self.tx.send(Action::read(data)).unwrap()
    }

    /// expect the next write to be exactly `data`
    pub fn write(&mut self, data: &[u8]) {
        self.tx.send(Action::write(data)).unwrap()
    }

    /// fail a following read with an I/O error
    pub fn read_error(&mut self, kind: ErrorKind) {
        self.tx.send(Action::read_error(kind)).unwrap()
    }

    /// fail the next write with an I/O error
    pub fn write_error(&mut self, kind: ErrorKind) {
        self.tx.send(Action::write_error(kind)).unwrap()
    }

    /// next thing the transport did, if any
    pub fn next_event(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

#[derive(Debug)]
enum ActionType {
    Data(Vec<u8>),
    Error(ErrorKind),
}

#[derive(Debug)]
struct Action {
    direction: Direction,
    action_type: ActionType,
}

/// Something a [`MockTransport`] did
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// bytes were written
    Write(usize),
    /// bytes were read
    Read(usize),
    /// a write failed
    WriteErr(ErrorKind),
    /// a read failed
    ReadErr(ErrorKind),
}

impl Action {
    fn read(data: &[u8]) -> Self {
        Self {
            direction: Direction::Read,
            action_type: ActionType::Data(data.to_vec()),
        }
    }

    fn write(data: &[u8]) -> Self {
        Self {
            direction: Direction::Write,
            action_type: ActionType::Data(data.to_vec()),
        }
    }

    fn read_error(kind: ErrorKind) -> Self {
        Self {
            direction: Direction::Read,
            action_type: ActionType::Error(kind),
        }
    }

    fn write_error(kind: ErrorKind) -> Self {
        Self {
            direction: Direction::Write,
            action_type: ActionType::Error(kind),
        }
    }
}

impl MockTransport {
    /// interframe delay last handed to the transport by an RTU link
    pub fn interframe_delay(&self) -> Option<Duration> {
        self.interframe_delay
    }

    fn pop(&mut self, dir: Direction) -> Option<ActionType> {
        let action = match self.next.take() {
            Some(x) => x,
            None => self.rx.try_recv().ok()?,
        };

        if action.direction == dir {
            Some(action.action_type)
        } else {
            // it's not the right direction so store it
            self.next = Some(action);
            None
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, RequestError> {
        match self.pop(Direction::Read) {
            None => Err(RequestError::ResponseTimeout),
            Some(ActionType::Data(mut bytes)) => {
                let count = std::cmp::min(buffer.len(), bytes.len());
                buffer[..count].copy_from_slice(&bytes[..count]);
                // whatever does not fit is delivered by the next read
                if count < bytes.len() {
                    self.next = Some(Action::read(&bytes.split_off(count)));
                }
                let _ = self.tx.send(Event::Read(count));
                Ok(count)
            }
            Some(ActionType::Error(kind)) => {
                let _ = self.tx.send(Event::ReadErr(kind));
                Err(RequestError::Io(kind))
            }
        }
    }
}

impl Transport for MockTransport {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), RequestError> {
        match self.pop(Direction::Write) {
            None => panic!("unexpected write: {data:02X?}"),
            Some(ActionType::Data(bytes)) => {
                assert_eq!(bytes.as_slice(), data);
                let _ = self.tx.send(Event::Write(data.len()));
                Ok(())
            }
            Some(ActionType::Error(kind)) => {
                let _ = self.tx.send(Event::WriteErr(kind));
                Err(RequestError::Io(kind))
            }
        }
    }
}

impl RtuTransport for MockTransport {
    fn read_raw(
        &mut self,
        buffer: &mut [u8],
        _timeouts: RawReadTimeouts,
    ) -> Result<usize, RequestError> {
        self.read(buffer)
    }

    fn set_interframe_delay(&mut self, delay: Duration) {
        self.interframe_delay = Some(delay);
    }
}

impl StreamTransport for MockTransport {
    fn read_some(&mut self, buffer: &mut [u8], _timeout: Duration) -> Result<usize, RequestError> {
        self.read(buffer)
    }
}
