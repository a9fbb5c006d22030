// Relay wire format shared by the server and peer links.
//
// Frame (little-endian): [type_len:u16][type:utf8][sender_id:i64][payload_len:u32][payload]

use crate::domain::PlayerId;
use crate::use_cases::ProtocolError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Control frame the relay emits when a connection closes; sender is the departed player.
pub const PEER_LEFT_MESSAGE: &str = "relay:peer-left";

const HEADER_LEN: usize = 2 + 8 + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub message_type: String,
    pub sender_id: PlayerId,
    pub payload: Vec<u8>,
}

pub fn encode_relay_frame(message_type: &str, sender_id: PlayerId, payload: &[u8]) -> Vec<u8> {
    // Message types are short protocol constants; longer ones are cut at the u16 limit.
    let type_bytes = &message_type.as_bytes()[..message_type.len().min(u16::MAX as usize)];
    let mut buf = Vec::with_capacity(HEADER_LEN + type_bytes.len() + payload.len());
    // Writes into a Vec are infallible.
    let _ = buf.write_u16::<LittleEndian>(type_bytes.len() as u16);
    buf.extend_from_slice(type_bytes);
    let _ = buf.write_i64::<LittleEndian>(sender_id);
    let _ = buf.write_u32::<LittleEndian>(payload.len() as u32);
    buf.extend_from_slice(payload);
    buf
}

pub fn decode_relay_frame(bytes: &[u8]) -> Result<RelayMessage, ProtocolError> {
    let mut cursor = Cursor::new(bytes);

    let type_len = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)? as usize;
    let mut type_bytes = vec![0u8; type_len];
    cursor
        .read_exact(&mut type_bytes)
        .map_err(|_| ProtocolError::Truncated)?;
    let message_type = String::from_utf8(type_bytes)
        .map_err(|_| ProtocolError::Payload("message type is not utf-8".to_string()))?;

    let sender_id = cursor
        .read_i64::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)?;
    let payload_len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)? as usize;

    let start = cursor.position() as usize;
    let remaining = bytes.len() - start;
    if remaining < payload_len {
        return Err(ProtocolError::Truncated);
    }
    if remaining > payload_len {
        return Err(ProtocolError::Payload(format!(
            "{} trailing bytes after payload",
            remaining - payload_len
        )));
    }

    Ok(RelayMessage {
        message_type,
        sender_id,
        payload: bytes[start..].to_vec(),
    })
}

/// Reads only the sender id, without copying the payload.
pub fn peek_sender(bytes: &[u8]) -> Result<PlayerId, ProtocolError> {
    let mut cursor = Cursor::new(bytes);
    let type_len = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)?;
    cursor.set_position(2 + type_len as u64);
    cursor
        .read_i64::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)
}
