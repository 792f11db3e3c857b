//! Minimal STUN (RFC 5389) binding request/response codec, extended with
//! the RFC 5780 attributes (`OTHER-ADDRESS`, `CHANGE-REQUEST`) needed for
//! NAT behaviour discovery. Hand-rolled rather than pulled from a
//! general-purpose STUN/TURN crate because those two attributes aren't
//! part of the base RFC 5389 set most STUN crates implement.

use bytes::{Buf, BufMut, BytesMut};
use rand::RngCore;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;

pub const MAGIC_COOKIE: u32 = 0x2112_A442;
const HEADER_LEN: usize = 20;

pub const METHOD_BINDING_REQUEST: u16 = 0x0001;
pub const METHOD_BINDING_RESPONSE: u16 = 0x0101;

const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_CHANGE_REQUEST: u16 = 0x0003;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
const ATTR_OTHER_ADDRESS: u16 = 0x802C;

const FAMILY_IPV4: u8 = 0x01;
const FAMILY_IPV6: u8 = 0x02;

/// Bit flags for the RFC 5780 CHANGE-REQUEST attribute.
pub const CHANGE_IP: u32 = 0x04;
pub const CHANGE_PORT: u32 = 0x02;

#[derive(Debug, Error)]
pub enum StunError {
    #[error("message shorter than the 20-byte STUN header")]
    Truncated,
    #[error("not a STUN message (bad magic cookie)")]
    NotStun,
    #[error("declared length doesn't match the buffer")]
    LengthMismatch,
    #[error("unsupported address family {0:#x}")]
    BadFamily(u8),
}

#[derive(Debug, Clone)]
pub struct StunMessage {
    pub method: u16,
    pub transaction_id: [u8; 12],
    pub mapped_address: Option<SocketAddr>,
    pub other_address: Option<SocketAddr>,
    pub change_request: Option<u32>,
}

impl StunMessage {
    pub fn new_binding_request() -> Self {
        let mut tid = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut tid);
        Self {
            method: METHOD_BINDING_REQUEST,
            transaction_id: tid,
            mapped_address: None,
            other_address: None,
            change_request: None,
        }
    }

    pub fn with_change_request(mut self, flags: u32) -> Self {
        self.change_request = Some(flags);
        self
    }

    pub fn encode(&self) -> BytesMut {
        let mut attrs = BytesMut::new();
        if let Some(flags) = self.change_request {
            put_attr_header(&mut attrs, ATTR_CHANGE_REQUEST, 4);
            attrs.put_u32(flags);
        }

        let mut buf = BytesMut::with_capacity(HEADER_LEN + attrs.len());
        buf.put_u16(self.method);
        buf.put_u16(attrs.len() as u16);
        buf.put_u32(MAGIC_COOKIE);
        buf.put_slice(&self.transaction_id);
        buf.put_slice(&attrs);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, StunError> {
        if buf.len() < HEADER_LEN {
            return Err(StunError::Truncated);
        }
        let mut cur = buf;
        let method = cur.get_u16();
        let declared_len = cur.get_u16() as usize;
        let cookie = cur.get_u32();
        if cookie != MAGIC_COOKIE {
            return Err(StunError::NotStun);
        }
        let mut transaction_id = [0u8; 12];
        transaction_id.copy_from_slice(&cur[..12]);
        cur.advance(12);

        if cur.len() < declared_len {
            return Err(StunError::LengthMismatch);
        }
        let mut attrs = &cur[..declared_len];

        let mut mapped_address = None;
        let mut other_address = None;
        let mut change_request = None;

        while attrs.len() >= 4 {
            let attr_type = (&attrs[..2]).get_u16();
            let attr_len = (&attrs[2..4]).get_u16() as usize;
            attrs.advance(4);
            if attrs.len() < attr_len {
                break;
            }
            let value = &attrs[..attr_len];
            match attr_type {
                ATTR_XOR_MAPPED_ADDRESS => {
                    mapped_address = decode_xor_address(value, &transaction_id).ok();
                }
                ATTR_MAPPED_ADDRESS if mapped_address.is_none() => {
                    mapped_address = decode_plain_address(value).ok();
                }
                ATTR_OTHER_ADDRESS => {
                    other_address = decode_plain_address(value).ok();
                }
                ATTR_CHANGE_REQUEST if value.len() == 4 => {
                    change_request = Some((&value[..]).get_u32());
                }
                _ => {}
            }
            let padded = (attr_len + 3) & !3;
            attrs.advance(padded.saturating_sub(attr_len).min(attrs.len()));
        }

        Ok(Self {
            method,
            transaction_id,
            mapped_address,
            other_address,
            change_request,
        })
    }
}

fn put_attr_header(buf: &mut BytesMut, attr_type: u16, len: u16) {
    buf.put_u16(attr_type);
    buf.put_u16(len);
}

fn decode_plain_address(value: &[u8]) -> Result<SocketAddr, StunError> {
    if value.len() < 4 {
        return Err(StunError::Truncated);
    }
    let family = value[0 + 1];
    let port = u16::from_be_bytes([value[2], value[3]]);
    match family {
        FAMILY_IPV4 if value.len() >= 8 => {
            let ip = Ipv4Addr::new(value[4], value[5], value[6], value[7]);
            Ok(SocketAddr::new(IpAddr::V4(ip), port))
        }
        FAMILY_IPV6 if value.len() >= 20 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&value[4..20]);
            Ok(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
        }
        other => Err(StunError::BadFamily(other)),
    }
}

fn decode_xor_address(value: &[u8], transaction_id: &[u8; 12]) -> Result<SocketAddr, StunError> {
    if value.len() < 4 {
        return Err(StunError::Truncated);
    }
    let family = value[1];
    let xport = u16::from_be_bytes([value[2], value[3]]);
    let port = xport ^ ((MAGIC_COOKIE >> 16) as u16);

    match family {
        FAMILY_IPV4 if value.len() >= 8 => {
            let cookie_bytes = MAGIC_COOKIE.to_be_bytes();
            let mut octets = [0u8; 4];
            for i in 0..4 {
                octets[i] = value[4 + i] ^ cookie_bytes[i];
            }
            Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port))
        }
        FAMILY_IPV6 if value.len() >= 20 => {
            let mut xor_key = [0u8; 16];
            xor_key[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
            xor_key[4..].copy_from_slice(transaction_id);
            let mut octets = [0u8; 16];
            for i in 0..16 {
                octets[i] = value[4 + i] ^ xor_key[i];
            }
            Ok(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
        }
        other => Err(StunError::BadFamily(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_change_request_and_decodes_it_back() {
        let msg = StunMessage::new_binding_request().with_change_request(CHANGE_IP | CHANGE_PORT);
        let encoded = msg.encode();
        let decoded = StunMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.method, METHOD_BINDING_REQUEST);
        assert_eq!(decoded.change_request, Some(CHANGE_IP | CHANGE_PORT));
    }

    #[test]
    fn rejects_non_stun_buffers() {
        let garbage = [0u8; 20];
        assert!(matches!(StunMessage::decode(&garbage), Err(StunError::NotStun)));
    }

    #[test]
    fn xor_mapped_address_matches_known_vector() {
        // Vector from RFC 5769 §2.3 (modified: we only check the XOR math).
        let transaction_id: [u8; 12] = [
            0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6, 0x86, 0xfa, 0x87, 0xdf, 0xae,
        ];
        let addr: SocketAddr = "192.0.2.1:32853".parse().unwrap();
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.octets(),
            _ => unreachable!(),
        };
        let port = addr.port();

        let xport = port ^ ((MAGIC_COOKIE >> 16) as u16);
        let cookie_bytes = MAGIC_COOKIE.to_be_bytes();
        let mut xip = [0u8; 4];
        for i in 0..4 {
            xip[i] = ip[i] ^ cookie_bytes[i];
        }

        let mut value = vec![0u8, FAMILY_IPV4];
        value.extend_from_slice(&xport.to_be_bytes());
        value.extend_from_slice(&xip);

        let decoded = decode_xor_address(&value, &transaction_id).unwrap();
        assert_eq!(decoded, addr);
    }
}
