//! Length-prefixed Fiat-Shamir transcript.

use crate::common::group::Group;

/// An append-only byte transcript.
///
/// Every message is written as `I2OSP(len(label), 8) || label ||
/// I2OSP(len(msg), 8) || msg`, so two different sequences of messages never
/// produce the same bytes.
#[derive(Debug, Clone)]
pub(crate) struct Transcript {
    bytes: Vec<u8>,
}

impl Transcript {
    pub(crate) fn new(domain: &[u8]) -> Self {
        let mut transcript = Self { bytes: Vec::new() };
        transcript.append_message(b"domain", domain);
        transcript
    }

    pub(crate) fn append_message(&mut self, label: &[u8], message: &[u8]) {
        self.bytes.extend_from_slice(&(label.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(label);
        self.bytes.extend_from_slice(&(message.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(message);
    }

    pub(crate) fn append_elem<G: Group>(&mut self, label: &[u8], elem: &G::Elem) {
        self.append_message(label, &G::serialize_elem(elem));
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_boundaries_are_unambiguous() {
        let mut left = Transcript::new(b"test");
        left.append_message(b"a", b"bc");
        let mut right = Transcript::new(b"test");
        right.append_message(b"ab", b"c");
        assert_ne!(left.as_bytes(), right.as_bytes());
    }

    #[test]
    fn encoding_layout() {
        let mut transcript = Transcript::new(b"");
        transcript.append_message(b"x", &[7]);
        let mut expected = Vec::new();
        expected.extend_from_slice(&6u64.to_be_bytes());
        expected.extend_from_slice(b"domain");
        expected.extend_from_slice(&0u64.to_be_bytes());
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.extend_from_slice(b"x");
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.push(7);
        assert_eq!(transcript.as_bytes(), expected.as_slice());
    }
}
