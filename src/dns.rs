//! Captive-portal DNS responder
//!
//! In access point mode every name must resolve to the device so the
//! provisioning client lands on its setup page. [`build_captive_response`]
//! answers a single-question query with the device address;
//! [`CaptiveDns`] drains datagrams from a [`NetworkDriver`] and replies.
//!
//! Only what a captive portal needs is handled: standard queries get an A
//! answer (or an empty answer for non-address types), other opcodes get
//! `NOTIMP`, and anything malformed is dropped.
//!
//! ## Example
//!
//! ```
//! use duo_epd::dns::build_captive_response;
//!
//! // ID 0x1234, RD, one question: "a." IN A
//! let query = [
//!     0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0,
//!     1, b'a', 0, 0, 1, 0, 1,
//! ];
//! let mut out = [0u8; 512];
//! let len = build_captive_response(&query, [192, 168, 4, 1], &mut out).unwrap();
//!
//! assert_eq!(&out[..2], &[0x12, 0x34]);
//! assert_eq!(&out[len - 4..len], &[192, 168, 4, 1]);
//! ```

use log::{debug, trace};

use crate::network::NetworkDriver;

/// Largest datagram handled, the classic UDP DNS limit
pub const MAX_DATAGRAM: usize = 512;

/// TTL of the captive answer in seconds
pub const ANSWER_TTL: u32 = 60;

const HEADER_LEN: usize = 12;
const ANSWER_LEN: usize = 16;

const FLAG_QR: u16 = 0x8000;
const FLAG_AA: u16 = 0x0400;
const FLAG_RD: u16 = 0x0100;
const FLAG_RA: u16 = 0x0080;
const OPCODE_MASK: u16 = 0x7800;
const RCODE_NOT_IMPLEMENTED: u16 = 4;

const TYPE_A: u16 = 1;
const TYPE_ANY: u16 = 255;
const CLASS_IN: u16 = 1;

/// Pointer to the question name at offset 12
const NAME_POINTER: u16 = 0xC00C;

fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn write_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

/// Offset just past the question section, or `None` if it is malformed
fn question_end(query: &[u8]) -> Option<usize> {
    let mut at = HEADER_LEN;
    loop {
        let len = usize::from(*query.get(at)?);
        at += 1;
        if len == 0 {
            break;
        }
        // Compression pointers and extended labels never appear in a
        // client's question
        if len > 63 {
            return None;
        }
        at += len;
    }
    // QTYPE + QCLASS
    let end = at + 4;
    (end <= query.len()).then_some(end)
}

/// Build the reply to `query` into `out`
///
/// Returns the reply length, or `None` when the datagram should be dropped:
/// it is a response, it is malformed, or `out` is too small.
pub fn build_captive_response(query: &[u8], addr: [u8; 4], out: &mut [u8]) -> Option<usize> {
    let flags = read_u16(query, 2)?;
    if flags & FLAG_QR != 0 {
        return None;
    }

    if flags & OPCODE_MASK != 0 {
        if out.len() < HEADER_LEN {
            return None;
        }
        out[..HEADER_LEN].fill(0);
        out[..2].copy_from_slice(&query[..2]);
        let reply = FLAG_QR | (flags & (OPCODE_MASK | FLAG_RD)) | RCODE_NOT_IMPLEMENTED;
        write_u16(out, 2, reply);
        return Some(HEADER_LEN);
    }

    if read_u16(query, 4)? != 1 {
        return None;
    }
    let end = question_end(query)?;
    let qtype = read_u16(query, end - 4)?;
    let qclass = read_u16(query, end - 2)?;
    let answer = matches!(qtype, TYPE_A | TYPE_ANY) && qclass == CLASS_IN;

    let len = end + if answer { ANSWER_LEN } else { 0 };
    if out.len() < len {
        return None;
    }

    out[..2].copy_from_slice(&query[..2]);
    write_u16(out, 2, FLAG_QR | FLAG_AA | (flags & FLAG_RD) | FLAG_RA);
    write_u16(out, 4, 1);
    write_u16(out, 6, u16::from(answer));
    write_u16(out, 8, 0);
    write_u16(out, 10, 0);
    out[HEADER_LEN..end].copy_from_slice(&query[HEADER_LEN..end]);

    if answer {
        write_u16(out, end, NAME_POINTER);
        write_u16(out, end + 2, TYPE_A);
        write_u16(out, end + 4, CLASS_IN);
        out[end + 6..end + 10].copy_from_slice(&ANSWER_TTL.to_be_bytes());
        write_u16(out, end + 10, 4);
        out[end + 12..end + 16].copy_from_slice(&addr);
    }
    Some(len)
}

/// Answers every DNS lookup with one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptiveDns {
    address: [u8; 4],
    answered: u32,
}

impl CaptiveDns {
    /// Responder answering with `address`
    pub fn new(address: [u8; 4]) -> Self {
        Self {
            address,
            answered: 0,
        }
    }

    /// Handle at most one pending query
    ///
    /// Returns whether a datagram was taken from the driver.
    pub fn poll<N: NetworkDriver>(&mut self, driver: &mut N) -> Result<bool, N::Error> {
        let mut query = [0u8; MAX_DATAGRAM];
        let Some((len, source, port)) = driver.recv_dns(&mut query)? else {
            return Ok(false);
        };

        let mut reply = [0u8; MAX_DATAGRAM];
        match build_captive_response(&query[..len], self.address, &mut reply) {
            Some(n) => {
                driver.send_dns(&reply[..n], source, port)?;
                self.answered = self.answered.saturating_add(1);
                trace!("dns reply to {source:?}:{port}");
            }
            None => debug!("dropped {len} byte dns datagram from {source:?}"),
        }
        Ok(true)
    }

    /// Address every name resolves to
    pub fn address(&self) -> [u8; 4] {
        self.address
    }

    /// Replies sent so far
    pub fn answered(&self) -> u32 {
        self.answered
    }
}
