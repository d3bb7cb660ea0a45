use std::ops::Index;

use bytes::{Bytes, BytesMut};

use crate::{
    error::{MessageError, ProtocolViolation},
    frames::{Buffered, DecodedFrame, Frame, Opcode},
};

/// Ordered frames of one message.
///
/// Only [`MessageAssembler::add_frame`] can append, and nothing can replace
/// or remove a frame once it is held:
///
/// ```compile_fail
/// use wust_message::{MessageAssembler, frames::DecodedFrame};
///
/// let mut msg = MessageAssembler::<DecodedFrame>::new();
/// let first = msg.frames()[0].clone();
/// msg.frames()[0] = first;
/// ```
///
/// ```compile_fail
/// use wust_message::{MessageAssembler, frames::DecodedFrame};
///
/// let mut msg = MessageAssembler::<DecodedFrame>::new();
/// msg.frames().remove(0);
/// ```
#[derive(Debug)]
pub struct Frames<F> {
    inner: Vec<F>,
}

impl<F> Frames<F> {
    fn new() -> Self { Self { inner: Vec::new() } }

    fn append(&mut self, frame: F) { self.inner.push(frame); }

    #[must_use]
    pub fn len(&self) -> usize { self.inner.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.is_empty() }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&F> { self.inner.get(index) }

    #[must_use]
    pub fn first(&self) -> Option<&F> { self.inner.first() }

    #[must_use]
    pub fn last(&self) -> Option<&F> { self.inner.last() }

    pub fn iter(&self) -> std::slice::Iter<'_, F> { self.inner.iter() }
}

impl<F> Index<usize> for Frames<F> {
    type Output = F;

    fn index(&self, index: usize) -> &F { &self.inner[index] }
}

impl<'a, F> IntoIterator for &'a Frames<F> {
    type Item = &'a F;
    type IntoIter = std::slice::Iter<'a, F>;

    fn into_iter(self) -> Self::IntoIter { self.inner.iter() }
}

/// How far along a message is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Completion {
    #[default]
    Empty,
    /// At least one frame held, the last is not yet final or not yet fully
    /// buffered.
    Accumulating,
    /// The final fragment has arrived with all of its bytes.
    Coalesced,
}

/// Reassembles one logical message out of its fragments.
///
/// Frames must be added in arrival order by a single writer. Control frames
/// interleaved with the fragments belong to the connection, not the message,
/// and should be routed elsewhere before reaching here.
#[derive(Debug)]
pub struct MessageAssembler<F: Frame = DecodedFrame> {
    frames: Frames<F>,
    binary: bool,
    completion: Completion,
    fin_seen: bool,
}

impl<F: Frame> Default for MessageAssembler<F> {
    fn default() -> Self { Self::new() }
}

impl<F: Frame> MessageAssembler<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: Frames::new(),
            binary: false,
            completion: Completion::Empty,
            fin_seen: false,
        }
    }

    /// Append the next frame of the message.
    ///
    /// A rejected frame is dropped and leaves the message untouched; the
    /// caller must close the connection with
    /// [`ProtocolViolation::close_reason`].
    pub fn add_frame(&mut self, frame: F) -> Result<(), ProtocolViolation> {
        let opcode = frame.opcode();
        if self.frames.is_empty() {
            // recorded before the frame is validated
            self.binary = opcode == Opcode::Bin;
        }

        tracing::trace!(
            opcode = ?opcode,
            fin = frame.is_final(),
            held = self.frames.len(),
            "adding frame"
        );

        let violation = match (self.frames.is_empty(), opcode) {
            (true, Opcode::Cont) => Some(ProtocolViolation::UnexpectedContinuation),
            (false, Opcode::Cont) if self.fin_seen => Some(ProtocolViolation::MessageComplete),
            (false, op) if op != Opcode::Cont => Some(ProtocolViolation::UnfinishedMessage),
            _ => None,
        };
        if let Some(v) = violation {
            tracing::warn!(opcode = ?opcode, held = self.frames.len(), "rejected frame: {v}");
            return Err(v);
        }

        self.fin_seen = frame.is_final();
        self.completion = if frame.is_final() && frame.is_coalesced() {
            Completion::Coalesced
        } else {
            Completion::Accumulating
        };
        self.frames.append(frame);
        Ok(())
    }

    #[must_use]
    pub fn count(&self) -> usize { self.frames.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    pub fn get(&self, index: usize) -> Result<&F, MessageError> {
        self.frames.get(index).ok_or(MessageError::OutOfRange {
            index,
            len: self.frames.len(),
        })
    }

    /// Read-only view of the held frames.
    #[must_use]
    pub fn frames(&self) -> &Frames<F> { &self.frames }

    /// A final frame appended while its own bytes were still arriving leaves
    /// the stored state at `Accumulating`; it counts as `Coalesced` as soon as
    /// that frame reports all of its bytes.
    #[must_use]
    pub fn completion(&self) -> Completion {
        match self.completion {
            Completion::Accumulating
                if self.fin_seen && self.frames.last().is_some_and(Frame::is_coalesced) =>
            {
                Completion::Coalesced
            }
            state => state,
        }
    }

    #[must_use]
    pub fn is_coalesced(&self) -> bool { self.completion() == Completion::Coalesced }

    /// Opcode of the frame that started the message.
    pub fn opcode(&self) -> Result<Opcode, MessageError> {
        self.frames
            .first()
            .map(Frame::opcode)
            .ok_or(MessageError::EmptyMessage)
    }

    /// Payload bytes buffered so far. Frames that cannot report a length yet
    /// count as zero.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.frames
            .iter()
            .filter_map(|f| f.payload_len().ready())
            .sum()
    }

    /// Decoded application payload of the whole message.
    pub fn payload(&self) -> Result<Bytes, MessageError> {
        let buf = self.concat(|f| match f.payload() {
            Buffered::Ready(bytes) => Ok(bytes),
            Buffered::Pending => Err(MessageError::NotReady),
        })?;

        tracing::debug!(
            "Reassembled {} bytes in {} frames",
            buf.len(),
            self.frames.len()
        );
        Ok(buf)
    }

    /// Wire representation of every frame, back to back.
    pub fn contents(&self) -> Result<Bytes, MessageError> { self.concat(|f| Ok(f.contents())) }

    #[must_use]
    pub fn is_binary(&self) -> bool { self.binary }

    fn concat<'a>(
        &'a self,
        part: impl Fn(&'a F) -> Result<&'a [u8], MessageError>,
    ) -> Result<Bytes, MessageError> {
        if !self.is_coalesced() {
            return Err(MessageError::NotReady);
        }

        let mut buf = BytesMut::new();
        for frame in &self.frames {
            buf.extend_from_slice(part(frame)?);
        }
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::OnceCell, rc::Rc};

    use paste::paste;
    use proptest::{collection::vec, option, prelude::*};

    use super::*;

    // payload cell shared with the test so bytes can land after `add_frame`
    type PayloadCell = Rc<OnceCell<Vec<u8>>>;

    #[derive(Debug, Clone)]
    struct TestFrame {
        opcode: Opcode,
        fin: bool,
        payload: PayloadCell,
    }

    impl TestFrame {
        fn new(opcode: Opcode, fin: bool, payload: &[u8]) -> Self {
            Self {
                opcode,
                fin,
                payload: Rc::new(OnceCell::from(payload.to_vec())),
            }
        }

        // header bytes still arriving
        fn buffering(opcode: Opcode, fin: bool) -> (Self, PayloadCell) {
            let payload = PayloadCell::default();
            let frame = Self {
                opcode,
                fin,
                payload: Rc::clone(&payload),
            };
            (frame, payload)
        }

        fn bytes(&self) -> Option<&[u8]> { self.payload.get().map(Vec::as_slice) }
    }

    impl Frame for TestFrame {
        fn opcode(&self) -> Opcode { self.opcode }

        fn is_final(&self) -> bool { self.fin }

        fn is_coalesced(&self) -> bool { self.payload.get().is_some() }

        fn payload(&self) -> Buffered<&[u8]> {
            match self.bytes() {
                Some(p) => Buffered::Ready(p),
                None => Buffered::Pending,
            }
        }

        fn payload_len(&self) -> Buffered<usize> {
            match self.bytes() {
                Some(p) => Buffered::Ready(p.len()),
                None => Buffered::Pending,
            }
        }

        // no wire form in these tests, reuse the payload
        fn contents(&self) -> &[u8] { self.bytes().unwrap_or_default() }
    }

    fn text(fin: bool, payload: &[u8]) -> TestFrame { TestFrame::new(Opcode::Text, fin, payload) }

    fn cont(fin: bool, payload: &[u8]) -> TestFrame { TestFrame::new(Opcode::Cont, fin, payload) }

    #[test]
    fn empty_message() {
        let msg = MessageAssembler::<TestFrame>::new();
        assert_eq!(msg.count(), 0);
        assert_eq!(msg.completion(), Completion::Empty);
        assert!(!msg.is_coalesced());
        assert!(!msg.is_binary());
        assert_eq!(msg.opcode(), Err(MessageError::EmptyMessage));
        assert_eq!(msg.payload_len(), 0);
        assert_eq!(msg.payload(), Err(MessageError::NotReady));
        assert_eq!(msg.contents(), Err(MessageError::NotReady));
    }

    #[test]
    fn leading_continuation_is_rejected() {
        let mut msg = MessageAssembler::new();
        assert_eq!(
            msg.add_frame(cont(true, b"x")),
            Err(ProtocolViolation::UnexpectedContinuation)
        );
        assert_eq!(msg.count(), 0);
        assert!(!msg.is_binary());
        assert_eq!(msg.completion(), Completion::Empty);
    }

    #[test]
    fn single_text_frame() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(text(true, b"hello")).unwrap();
        assert!(!msg.is_binary());
        assert!(msg.is_coalesced());
        assert_eq!(msg.opcode(), Ok(Opcode::Text));
        assert_eq!(msg.payload().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn binary_then_continuation() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(TestFrame::new(Opcode::Bin, false, &[1, 2]))
            .unwrap();
        assert!(msg.is_binary());
        assert!(!msg.is_coalesced());
        assert_eq!(msg.completion(), Completion::Accumulating);
        assert_eq!(msg.payload(), Err(MessageError::NotReady));
        assert_eq!(msg.contents(), Err(MessageError::NotReady));

        msg.add_frame(cont(true, &[3])).unwrap();
        assert!(msg.is_binary());
        assert!(msg.is_coalesced());
        assert_eq!(msg.opcode(), Ok(Opcode::Bin));
        assert_eq!(msg.payload().unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(msg.payload_len(), 3);
    }

    #[test]
    fn payload_concatenates_in_order() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(text(false, b"Hel")).unwrap();
        msg.add_frame(cont(false, b"")).unwrap();
        msg.add_frame(cont(false, b"lo, ")).unwrap();
        msg.add_frame(cont(true, b"world")).unwrap();
        assert_eq!(msg.count(), 4);
        assert_eq!(msg.payload().unwrap().as_ref(), b"Hello, world");
        assert_eq!(msg.contents().unwrap().as_ref(), b"Hello, world");
        assert_eq!(msg.payload_len(), 12);
    }

    #[test]
    fn final_frame_completes_once_buffered() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(text(false, b"abc")).unwrap();
        let (last, bytes) = TestFrame::buffering(Opcode::Cont, true);
        msg.add_frame(last).unwrap();

        assert!(!msg.is_coalesced());
        assert_eq!(msg.completion(), Completion::Accumulating);
        // pending frame contributes nothing
        assert_eq!(msg.payload_len(), 3);
        assert_eq!(msg.payload(), Err(MessageError::NotReady));
        assert_eq!(msg.contents(), Err(MessageError::NotReady));

        bytes.set(b"de".to_vec()).unwrap();
        assert!(msg.is_coalesced());
        assert_eq!(msg.completion(), Completion::Coalesced);
        assert_eq!(msg.payload_len(), 5);
        assert_eq!(msg.payload().unwrap().as_ref(), b"abcde");
        assert_eq!(msg.contents().unwrap().as_ref(), b"abcde");

        // the message is over, nothing more may join it
        assert_eq!(
            msg.add_frame(cont(true, b"f")),
            Err(ProtocolViolation::MessageComplete)
        );
    }

    #[test]
    fn single_frame_message_completes_once_buffered() {
        let mut msg = MessageAssembler::new();
        let (frame, bytes) = TestFrame::buffering(Opcode::Text, true);
        msg.add_frame(frame).unwrap();
        assert!(!msg.is_coalesced());
        assert_eq!(msg.opcode(), Ok(Opcode::Text));

        bytes.set(b"hi".to_vec()).unwrap();
        assert!(msg.is_coalesced());
        assert_eq!(msg.payload().unwrap().as_ref(), b"hi");
    }

    #[test]
    fn non_final_frame_finishing_does_not_complete() {
        let mut msg = MessageAssembler::new();
        let (frame, bytes) = TestFrame::buffering(Opcode::Bin, false);
        msg.add_frame(frame).unwrap();
        bytes.set(vec![1]).unwrap();
        assert!(!msg.is_coalesced());
        assert_eq!(msg.payload_len(), 1);
    }

    #[test]
    fn frame_after_final_is_rejected() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(text(true, b"done")).unwrap();
        assert_eq!(
            msg.add_frame(cont(true, b"more")),
            Err(ProtocolViolation::MessageComplete)
        );
        assert_eq!(msg.count(), 1);
        assert!(msg.is_coalesced());
    }

    #[test]
    fn indexed_reads() {
        let mut msg = MessageAssembler::new();
        msg.add_frame(text(false, b"a")).unwrap();
        msg.add_frame(cont(true, b"b")).unwrap();

        assert_eq!(msg.get(1).unwrap().bytes(), Some(&b"b"[..]));
        assert_eq!(msg.frames()[0].opcode, Opcode::Text);
        assert_eq!(
            msg.get(2).unwrap_err(),
            MessageError::OutOfRange { index: 2, len: 2 }
        );
        let opcodes: Vec<_> = msg.frames().iter().map(|f| f.opcode).collect();
        assert_eq!(opcodes, vec![Opcode::Text, Opcode::Cont]);
    }

    macro_rules! non_continuation_second_frame {
        ($($name:ident => $op:expr),* $(,)?) => {
            $(paste! {
                #[test]
                fn [<second_ $name _frame_is_rejected>]() {
                    let mut msg = MessageAssembler::new();
                    msg.add_frame(text(false, b"first")).unwrap();
                    assert_eq!(
                        msg.add_frame(TestFrame::new($op, true, b"")),
                        Err(ProtocolViolation::UnfinishedMessage)
                    );
                    assert_eq!(msg.count(), 1);
                    assert_eq!(msg.completion(), Completion::Accumulating);
                }
            })*
        };
    }

    non_continuation_second_frame!(
        text => Opcode::Text,
        binary => Opcode::Bin,
        close => Opcode::Close,
        ping => Opcode::Ping,
        pong => Opcode::Pong,
        reserved => Opcode::Reserved(0x3),
    );

    fn opcode_strategy() -> impl Strategy<Value = Opcode> {
        prop_oneof![
            Just(Opcode::Cont),
            Just(Opcode::Text),
            Just(Opcode::Bin),
            Just(Opcode::Ping),
        ]
    }

    proptest! {
        // `None` payloads stand for frames still buffering when appended
        #[test]
        fn accepted_frames_follow_fragmentation_rules(
            frames in vec(
                (opcode_strategy(), any::<bool>(), option::of(vec(any::<u8>(), 0..8))),
                0..16,
            ),
        ) {
            let mut msg = MessageAssembler::new();
            let mut accepted: Vec<(TestFrame, Vec<u8>)> = Vec::new();

            for (opcode, fin, payload) in frames {
                let (frame, late) = match payload {
                    Some(p) => (TestFrame::new(opcode, fin, &p), None),
                    None => {
                        let (frame, _) = TestFrame::buffering(opcode, fin);
                        (frame, Some(vec![0xAB; 3]))
                    }
                };
                let before = msg.count();
                if msg.add_frame(frame.clone()).is_ok() {
                    let bytes = late.unwrap_or_else(|| frame.bytes().unwrap_or_default().to_vec());
                    accepted.push((frame, bytes));
                } else {
                    prop_assert_eq!(msg.count(), before);
                }
            }

            prop_assert_eq!(msg.count(), accepted.len());
            if let Some((first, _)) = accepted.first() {
                prop_assert_ne!(first.opcode, Opcode::Cont);
                prop_assert!(accepted[1..].iter().all(|(f, _)| f.opcode == Opcode::Cont));
                prop_assert_eq!(msg.is_binary(), first.opcode == Opcode::Bin);
                prop_assert_eq!(msg.opcode(), Ok(first.opcode));
            }

            // buffering frames count as zero
            let buffered: usize = accepted.iter().filter_map(|(f, _)| f.bytes()).map(<[u8]>::len).sum();
            prop_assert_eq!(msg.payload_len(), buffered);

            let fin = accepted.last().is_some_and(|(f, _)| f.fin);
            let last_ready = accepted.last().is_some_and(|(f, _)| f.is_coalesced());
            prop_assert_eq!(msg.is_coalesced(), fin && last_ready);

            // let every frame finish buffering
            for (frame, bytes) in &accepted {
                let _ = frame.payload.set(bytes.clone());
            }
            let expected: Vec<u8> = accepted.iter().flat_map(|(_, b)| b.clone()).collect();
            prop_assert_eq!(msg.payload_len(), expected.len());
            prop_assert_eq!(msg.is_coalesced(), fin);
            if fin {
                let payload = msg.payload().unwrap();
                prop_assert_eq!(payload.as_ref(), expected.as_slice());
            } else {
                prop_assert_eq!(msg.payload(), Err(MessageError::NotReady));
            }
        }
    }
}
