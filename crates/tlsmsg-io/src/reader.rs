use tlsmsg_channel::{ChannelErrorKind, SecureChannel};
use tracing::{debug, trace};

use crate::backoff::{Backoff, ThreadSleep};
use crate::buffer::{BufferError, MessageBuffer};
use crate::classify::{
    classify_read_failure, wait_for_first_message, ReadDecision, ReadEvent, RetryState,
    WaitDecision,
};
use crate::config::ReadConfig;
use crate::error::{IoError, Result};
use crate::message::{AbortReason, Message, ReadOutcome};

/// Where a single read operation stands.
///
/// ```text
/// AwaitingFirstByte ──data──▶ Reading ──data──▶ Reading
///        │                       │
///        ├──closed──▶ Done ◀─────┤ closed / quiet boundary
///        └──give up / error──▶ Aborted ◀──error──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    AwaitingFirstByte,
    Reading,
    Done,
    Aborted(AbortReason),
}

impl ReadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadState::Done | ReadState::Aborted(_))
    }
}

/// Everything one call to [`MessageReader::read_message`] owns.
struct ReadOperation<'a> {
    config: &'a ReadConfig,
    buffer: MessageBuffer,
    retry: RetryState,
    state: ReadState,
    end_of_connection: bool,
}

impl<'a> ReadOperation<'a> {
    fn start(config: &'a ReadConfig) -> Result<Self> {
        let buffer = MessageBuffer::with_capacity(config.initial_capacity, config.max_message_size)
            .map_err(|err| buffer_error(err, empty_partial()))?;

        Ok(Self {
            config,
            buffer,
            retry: RetryState::new(),
            state: ReadState::AwaitingFirstByte,
            end_of_connection: false,
        })
    }

    fn on_data(&mut self, chunk: &[u8]) -> std::result::Result<(), BufferError> {
        self.buffer.append(chunk)?;
        self.retry.data_received();
        if self.state == ReadState::AwaitingFirstByte {
            debug!(bytes = chunk.len(), "first data received");
        }
        self.state = ReadState::Reading;
        Ok(())
    }

    fn on_no_data<B: Backoff>(&mut self, event: ReadEvent, backoff: &mut B) {
        if self.state == ReadState::AwaitingFirstByte
            && event == ReadEvent::Failed(ChannelErrorKind::WantRead)
        {
            if wait_for_first_message(&mut self.retry, self.config, backoff) == WaitDecision::GiveUp
            {
                self.state = ReadState::Aborted(AbortReason::FirstMessageTimeout {
                    attempts: self.retry.attempts_before_first_byte,
                });
            }
            return;
        }

        match classify_read_failure(
            event,
            &mut self.retry,
            self.buffer.len(),
            self.config,
            backoff,
        ) {
            ReadDecision::Retry => {}
            ReadDecision::Complete => self.state = ReadState::Done,
            ReadDecision::EndOfConnection => {
                self.end_of_connection = true;
                self.state = ReadState::Done;
            }
            ReadDecision::Abort(kind) => {
                self.state = ReadState::Aborted(AbortReason::Channel(kind));
            }
        }
    }

    fn finish(self) -> Message {
        let outcome = match self.state {
            ReadState::Aborted(reason) => ReadOutcome::Aborted(reason),
            _ => ReadOutcome::Complete,
        };
        debug!(
            total_bytes = self.buffer.len(),
            end_of_connection = self.end_of_connection,
            ?outcome,
            "message read finished"
        );
        Message::from_terminated(self.buffer.finalize(), self.end_of_connection, outcome)
    }

    /// Stop on a buffer failure, keeping everything read so far.
    fn fail(self, err: BufferError) -> IoError {
        let partial = Message::from_terminated(
            self.buffer.finalize(),
            false,
            ReadOutcome::Aborted(AbortReason::BufferExhausted),
        );
        buffer_error(err, partial)
    }
}

fn empty_partial() -> Message {
    Message::from_terminated(
        bytes::Bytes::from_static(b"\0"),
        false,
        ReadOutcome::Aborted(AbortReason::BufferExhausted),
    )
}

fn buffer_error(err: BufferError, partial: Message) -> IoError {
    match err {
        BufferError::LimitExceeded { required, limit } => IoError::MessageTooLarge {
            size: required,
            max: limit,
            partial,
        },
        BufferError::CapacityOverflow => IoError::OutOfMemory {
            requested: usize::MAX,
            partial,
        },
        BufferError::Alloc { requested, .. } => IoError::OutOfMemory { requested, partial },
    }
}

/// Reads complete messages from a [`SecureChannel`].
///
/// Masks record framing: callers get everything the peer sent for one
/// message, however many records it was split into.
pub struct MessageReader<C, B = ThreadSleep> {
    inner: C,
    config: ReadConfig,
    backoff: B,
    chunk: Vec<u8>,
}

impl<C: SecureChannel> MessageReader<C> {
    /// Create a message reader with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, ReadConfig::default())
    }

    /// Create a message reader with explicit configuration.
    pub fn with_config(inner: C, config: ReadConfig) -> Self {
        Self::with_backoff(inner, config, ThreadSleep)
    }
}

impl<C: SecureChannel, B: Backoff> MessageReader<C, B> {
    /// Create a message reader with a custom backoff strategy.
    pub fn with_backoff(inner: C, config: ReadConfig, backoff: B) -> Self {
        Self {
            inner,
            config,
            backoff,
            chunk: Vec::new(),
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Channel failures do not produce `Err`: they end the read with
    /// [`ReadOutcome::Aborted`] and the bytes received so far. `Err` is
    /// reserved for configuration and buffer-growth failures.
    pub fn read_message(&mut self) -> Result<Message> {
        self.config.validate()?;
        self.chunk.resize(self.config.chunk_size, 0);

        let mut op = ReadOperation::start(&self.config)?;

        while !op.state.is_terminal() {
            match self.inner.read_raw(&mut self.chunk) {
                Ok(0) => op.on_no_data(ReadEvent::Closed, &mut self.backoff),
                Ok(n) => {
                    let n = n.min(self.chunk.len());
                    trace!(bytes = n, "read chunk");
                    if let Err(err) = op.on_data(&self.chunk[..n]) {
                        return Err(op.fail(err));
                    }
                }
                Err(err) => op.on_no_data(ReadEvent::Failed(err.kind()), &mut self.backoff),
            }
        }

        Ok(op.finish())
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the reader and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Current read configuration.
    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    /// Replace the configuration used by subsequent reads.
    pub fn set_config(&mut self, config: ReadConfig) {
        self.config = config;
    }
}

/// Read one complete message from `channel` with default configuration.
pub fn read_full_message<C: SecureChannel + ?Sized>(channel: &mut C) -> Result<Message> {
    MessageReader::new(channel).read_message()
}

/// Read one complete message from `channel` with explicit configuration.
pub fn read_full_message_with_config<C: SecureChannel + ?Sized>(
    channel: &mut C,
    config: ReadConfig,
) -> Result<Message> {
    MessageReader::with_config(channel, config).read_message()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use tlsmsg_channel::ChannelError;

    use super::*;

    #[derive(Debug, Clone)]
    enum Step {
        Data(Vec<u8>),
        Zero,
        Fail(ChannelErrorKind),
    }

    /// Channel that replays a script, then reports "want read" forever.
    struct ScriptedChannel {
        steps: VecDeque<Step>,
        reads: usize,
    }

    impl ScriptedChannel {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                reads: 0,
            }
        }
    }

    impl SecureChannel for ScriptedChannel {
        fn read_raw(&mut self, buf: &mut [u8]) -> tlsmsg_channel::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::Zero) => Ok(0),
                Some(Step::Fail(kind)) => Err(ChannelError::new(kind)),
                None => Err(ChannelError::new(ChannelErrorKind::WantRead)),
            }
        }

        fn write_raw(&mut self, payload: &[u8]) -> tlsmsg_channel::Result<usize> {
            Ok(payload.len())
        }
    }

    #[derive(Default)]
    struct RecordingBackoff {
        pauses: usize,
    }

    impl Backoff for RecordingBackoff {
        fn pause(&mut self, _duration: Duration) {
            self.pauses += 1;
        }
    }

    fn reader(steps: Vec<Step>) -> MessageReader<ScriptedChannel, RecordingBackoff> {
        MessageReader::with_backoff(
            ScriptedChannel::new(steps),
            ReadConfig::default(),
            RecordingBackoff::default(),
        )
    }

    fn want_read() -> Step {
        Step::Fail(ChannelErrorKind::WantRead)
    }

    #[test]
    fn two_records_then_quiet_boundary() {
        let mut reader = reader(vec![
            Step::Data(vec![1u8; 100]),
            Step::Data(vec![2u8; 60]),
            want_read(),
            want_read(),
            want_read(),
        ]);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.len(), 160);
        assert_eq!(&msg.as_bytes()[..100], &[1u8; 100][..]);
        assert_eq!(&msg.as_bytes()[100..], &[2u8; 60][..]);
        assert!(!msg.end_of_connection());
        assert_eq!(msg.outcome(), ReadOutcome::Complete);
        assert_eq!(reader.backoff.pauses, 3);
        assert_eq!(reader.get_ref().reads, 5);
    }

    #[test]
    fn chunks_then_zero_bytes_concatenate() {
        let mut reader = reader(vec![
            Step::Data(b"GET / ".to_vec()),
            Step::Data(b"HTTP/1.1\r\n".to_vec()),
            Step::Data(b"\r\n".to_vec()),
            Step::Zero,
        ]);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(msg.as_bytes_with_nul().last(), Some(&0));
        assert!(!msg.end_of_connection());
        assert!(msg.outcome().is_complete());
        assert_eq!(reader.backoff.pauses, 0);
    }

    #[test]
    fn zero_bytes_first_is_end_of_connection() {
        let mut reader = reader(vec![Step::Zero]);

        let msg = reader.read_message().unwrap();

        assert!(msg.is_empty());
        assert!(msg.end_of_connection());
        assert_eq!(msg.outcome(), ReadOutcome::Complete);
    }

    #[test]
    fn nothing_arrives_aborts_after_ten_attempts() {
        let mut reader = reader(vec![]);

        let msg = reader.read_message().unwrap();

        assert!(msg.is_empty());
        assert!(!msg.end_of_connection());
        assert_eq!(
            msg.outcome(),
            ReadOutcome::Aborted(AbortReason::FirstMessageTimeout { attempts: 10 })
        );
        assert_eq!(reader.backoff.pauses, 10);
        assert_eq!(reader.get_ref().reads, 10);
    }

    #[test]
    fn slow_first_record_is_tolerated() {
        let mut steps = vec![want_read(); 9];
        steps.push(Step::Data(b"late".to_vec()));
        steps.push(Step::Zero);
        let mut reader = reader(steps);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), b"late");
        assert!(msg.outcome().is_complete());
        assert_eq!(reader.backoff.pauses, 9);
    }

    #[test]
    fn boundary_counter_resets_on_new_data() {
        let mut reader = reader(vec![
            Step::Data(b"a".to_vec()),
            want_read(),
            want_read(),
            Step::Data(b"b".to_vec()),
            want_read(),
            want_read(),
            Step::Data(b"c".to_vec()),
        ]);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), b"abc");
        assert!(msg.outcome().is_complete());
        assert_eq!(reader.backoff.pauses, 7);
    }

    #[test]
    fn syscall_error_keeps_partial_data() {
        let mut reader = reader(vec![
            Step::Data(b"partial".to_vec()),
            Step::Fail(ChannelErrorKind::Syscall),
        ]);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), b"partial");
        assert!(!msg.end_of_connection());
        assert_eq!(
            msg.outcome(),
            ReadOutcome::Aborted(AbortReason::Channel(ChannelErrorKind::Syscall))
        );
    }

    #[test]
    fn abnormal_error_before_data_aborts_immediately() {
        for kind in [ChannelErrorKind::Protocol, ChannelErrorKind::WantWrite] {
            let mut reader = reader(vec![Step::Fail(kind)]);

            let msg = reader.read_message().unwrap();

            assert!(msg.is_empty());
            assert!(!msg.end_of_connection());
            assert_eq!(msg.outcome(), ReadOutcome::Aborted(AbortReason::Channel(kind)));
            assert_eq!(reader.backoff.pauses, 0);
        }
    }

    #[test]
    fn large_message_grows_buffer() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let steps = payload
            .chunks(50)
            .map(|c| Step::Data(c.to_vec()))
            .chain(std::iter::once(Step::Zero))
            .collect();
        let mut reader = MessageReader::with_backoff(
            ScriptedChannel::new(steps),
            ReadConfig {
                initial_capacity: 16,
                ..ReadConfig::default()
            },
            RecordingBackoff::default(),
        );

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), payload.as_slice());
        assert_eq!(msg.as_bytes_with_nul().len(), payload.len() + 1);
    }

    #[test]
    fn records_longer_than_chunk_are_read_across_calls() {
        let mut reader = reader(vec![Step::Data(vec![9u8; 1000]), Step::Zero]);

        let msg = reader.read_message().unwrap();

        assert_eq!(msg.len(), 1000);
        // 1000 bytes in 160-byte chunks, then the zero-byte read.
        assert_eq!(reader.get_ref().reads, 8);
    }

    #[test]
    fn oversized_message_reports_partial() {
        let mut reader = MessageReader::with_backoff(
            ScriptedChannel::new(vec![
                Step::Data(vec![1u8; 40]),
                Step::Data(vec![2u8; 40]),
            ]),
            ReadConfig {
                initial_capacity: 32,
                max_message_size: 64,
                ..ReadConfig::default()
            },
            RecordingBackoff::default(),
        );

        let err = reader.read_message().unwrap_err();

        assert!(matches!(
            err,
            IoError::MessageTooLarge {
                size: 80,
                max: 64,
                ..
            }
        ));
        let partial = err.into_partial().unwrap();
        assert_eq!(partial.as_bytes(), &[1u8; 40][..]);
        assert_eq!(
            partial.outcome(),
            ReadOutcome::Aborted(AbortReason::BufferExhausted)
        );
    }

    #[test]
    fn allocation_failure_is_out_of_memory_with_partial() {
        let config = ReadConfig::default();
        let mut op = ReadOperation::start(&config).unwrap();
        op.on_data(b"kept bytes").unwrap();

        let source = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let err = op.fail(BufferError::Alloc {
            requested: 4096,
            source,
        });

        assert!(matches!(
            err,
            IoError::OutOfMemory {
                requested: 4096,
                ..
            }
        ));
        assert!(err.to_string().contains("10 bytes kept"));
        let partial = err.into_partial().unwrap();
        assert_eq!(partial.as_bytes(), b"kept bytes");
        assert_eq!(partial.as_bytes_with_nul(), b"kept bytes\0");
        assert!(!partial.end_of_connection());
        assert_eq!(
            partial.outcome(),
            ReadOutcome::Aborted(AbortReason::BufferExhausted)
        );
    }

    #[test]
    fn capacity_overflow_is_out_of_memory_with_partial() {
        let config = ReadConfig::default();
        let mut op = ReadOperation::start(&config).unwrap();
        op.on_data(&[3u8; 200]).unwrap();

        let err = op.fail(BufferError::CapacityOverflow);

        assert!(matches!(
            err,
            IoError::OutOfMemory {
                requested: usize::MAX,
                ..
            }
        ));
        let partial = err.into_partial().unwrap();
        assert_eq!(partial.as_bytes(), &[3u8; 200][..]);
    }

    #[test]
    fn failed_initial_allocation_has_empty_partial() {
        let config = ReadConfig {
            initial_capacity: isize::MAX as usize,
            max_message_size: usize::MAX,
            ..ReadConfig::default()
        };

        let err = ReadOperation::start(&config).err().unwrap();

        assert!(matches!(err, IoError::OutOfMemory { .. }));
        let partial = err.into_partial().unwrap();
        assert!(partial.is_empty());
        assert_eq!(partial.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn consecutive_reads_have_independent_state() {
        let mut reader = reader(vec![
            Step::Data(b"one".to_vec()),
            want_read(),
            want_read(),
            want_read(),
            Step::Data(b"two".to_vec()),
            Step::Zero,
            Step::Zero,
        ]);

        let first = reader.read_message().unwrap();
        let second = reader.read_message().unwrap();
        let third = reader.read_message().unwrap();

        assert_eq!(first.as_bytes(), b"one");
        assert_eq!(second.as_bytes(), b"two");
        assert!(!second.end_of_connection());
        assert!(third.is_empty());
        assert!(third.end_of_connection());
    }

    #[test]
    fn invalid_config_rejected() {
        let mut reader = MessageReader::with_backoff(
            ScriptedChannel::new(vec![]),
            ReadConfig {
                chunk_size: 0,
                ..ReadConfig::default()
            },
            RecordingBackoff::default(),
        );
        assert!(matches!(
            reader.read_message(),
            Err(IoError::InvalidConfig(_))
        ));
        assert_eq!(reader.get_ref().reads, 0);
    }

    #[test]
    fn free_function_reads_through_borrowed_channel() {
        let mut channel = ScriptedChannel::new(vec![Step::Data(b"hi".to_vec()), Step::Zero]);
        let msg = read_full_message(&mut channel).unwrap();
        assert_eq!(msg.as_bytes(), b"hi");
        assert_eq!(channel.reads, 2);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = reader(vec![]);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().chunk_size, 160);
        reader.set_config(ReadConfig {
            chunk_size: 8,
            ..ReadConfig::default()
        });
        assert_eq!(reader.config().chunk_size, 8);
        let _inner = reader.into_inner();
    }

    #[test]
    fn state_terminality() {
        assert!(!ReadState::AwaitingFirstByte.is_terminal());
        assert!(!ReadState::Reading.is_terminal());
        assert!(ReadState::Done.is_terminal());
        assert!(ReadState::Aborted(AbortReason::BufferExhausted).is_terminal());
    }

    #[test]
    #[cfg(unix)]
    fn reads_message_from_socket_pair() {
        use std::io::Write;

        use tlsmsg_channel::IoChannel;

        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        right
            .set_read_timeout(Some(Duration::from_millis(5)))
            .unwrap();

        left.write_all(b"hello ").unwrap();
        left.write_all(b"world").unwrap();

        let config = ReadConfig {
            backoff: Duration::from_millis(1),
            ..ReadConfig::default()
        };
        let mut reader = MessageReader::with_config(IoChannel::new(right), config);
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.as_bytes(), b"hello world");
        assert!(!msg.end_of_connection());
        assert!(msg.outcome().is_complete());

        drop(left);
        let closed = reader.read_message().unwrap();
        assert!(closed.is_empty());
        assert!(closed.end_of_connection());
    }
}
