//! gRPC server reflection client
//!
//! Discovers the services reachable over the forwarded port. The reflection
//! exchange is tiny, so instead of pulling in generated protobuf types the
//! request is written and the response read directly in wire format through
//! a raw passthrough codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tonic::client::Grpc;
use tonic::transport::Channel;

use crate::errors::{HoplinkError, Result};

/// Standard gRPC reflection service names, newest first.
pub const REFLECTION_SERVICE_V1: &str = "grpc.reflection.v1.ServerReflection";
pub const REFLECTION_SERVICE_V1ALPHA: &str = "grpc.reflection.v1alpha.ServerReflection";

/// ServerReflectionRequest.list_services
const LIST_SERVICES_FIELD: u32 = 7;
/// ServerReflectionResponse.list_services_response
const LIST_SERVICES_RESPONSE_FIELD: u32 = 6;
/// ListServiceResponse.service
const SERVICE_FIELD: u32 = 1;
/// ServiceResponse.name
const NAME_FIELD: u32 = 1;

/// List the full service names the endpoint exposes via reflection.
///
/// Tries the v1 reflection service first, falling back to v1alpha; the
/// built-in reflection services themselves are filtered out of the result.
pub async fn list_services(channel: Channel) -> Result<Vec<String>> {
    for service_name in [REFLECTION_SERVICE_V1, REFLECTION_SERVICE_V1ALPHA] {
        let mut client = Grpc::new(channel.clone());
        if client.ready().await.is_err() {
            continue;
        }

        let mut encoder = WireEncoder::new();
        encoder.write_string(LIST_SERVICES_FIELD, "");
        let request = tonic::Request::new(RawMessage(encoder.finish()));

        let path: http::uri::PathAndQuery = format!("/{}/ServerReflectionInfo", service_name)
            .parse()
            .map_err(|e| HoplinkError::Grpc(format!("invalid reflection path: {}", e)))?;

        match client.unary(request, path, RawCodec).await {
            Ok(response) => {
                let (_, body, _) = response.into_parts();
                return decode_service_names(&body.0);
            }
            Err(_) => continue,
        }
    }

    Err(HoplinkError::Grpc(
        "gRPC reflection not available on the forwarded endpoint; \
         is the service built with reflection enabled?"
            .to_string(),
    ))
}

/// Extract service names from a ServerReflectionResponse body.
fn decode_service_names(body: &[u8]) -> Result<Vec<String>> {
    let mut services = Vec::new();

    for (field, value) in WireReader::new(body) {
        let (LIST_SERVICES_RESPONSE_FIELD, WireValue::Bytes(list)) = (field, value) else {
            continue;
        };
        for (field, value) in WireReader::new(list) {
            let (SERVICE_FIELD, WireValue::Bytes(service)) = (field, value) else {
                continue;
            };
            for (field, value) in WireReader::new(service) {
                if let (NAME_FIELD, WireValue::Bytes(name)) = (field, value) {
                    let name = String::from_utf8_lossy(name).to_string();
                    if !name.is_empty() && !name.starts_with("grpc.reflection") {
                        services.push(name);
                    }
                }
            }
        }
    }

    if services.is_empty() {
        return Err(HoplinkError::Grpc(
            "no services found in reflection response".to_string(),
        ));
    }
    Ok(services)
}

/// Protobuf wire types used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

/// Minimal protobuf wire-format writer.
pub struct WireEncoder {
    buf: BytesMut,
}

impl WireEncoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.buf.put_u8(byte);
            if value == 0 {
                break;
            }
        }
    }

    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        let tag = (field_number << 3) | (wire_type as u32);
        self.write_varint(tag as u64);
    }

    pub fn write_length_delimited(&mut self, field_number: u32, data: &[u8]) {
        self.write_tag(field_number, WireType::LengthDelimited);
        self.write_varint(data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    pub fn write_string(&mut self, field_number: u32, value: &str) {
        self.write_length_delimited(field_number, value.as_bytes());
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for WireEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded wire value, borrowing length-delimited payloads. Varint and
/// fixed-width values are consumed for framing but their payloads are not
/// needed here.
enum WireValue<'a> {
    Varint,
    Bytes(&'a [u8]),
}

/// Iterator over a message's top-level fields. Malformed trailing bytes end
/// the iteration rather than erroring; reflection payloads from a healthy
/// server never hit that path.
struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn read_varint(&mut self) -> Option<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let (&byte, rest) = self.buf.split_first()?;
            self.buf = rest;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
            if shift >= 64 {
                return None;
            }
        }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.buf.len() < len {
            return None;
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Some(head)
    }
}

impl<'a> Iterator for WireReader<'a> {
    type Item = (u32, WireValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        let tag = self.read_varint()?;
        let field_number = (tag >> 3) as u32;
        match tag & 0x7 {
            0 => {
                self.read_varint()?;
                Some((field_number, WireValue::Varint))
            }
            1 => {
                let bytes = self.take(8)?;
                Some((field_number, WireValue::Bytes(bytes)))
            }
            2 => {
                let len = self.read_varint()? as usize;
                Some((field_number, WireValue::Bytes(self.take(len)?)))
            }
            5 => {
                let bytes = self.take(4)?;
                Some((field_number, WireValue::Bytes(bytes)))
            }
            _ => None,
        }
    }
}

/// Raw message wrapper for untyped gRPC calls.
#[derive(Debug, Clone)]
pub struct RawMessage(pub Bytes);

/// Codec that passes bytes through without transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl tonic::codec::Codec for RawCodec {
    type Encode = RawMessage;
    type Decode = RawMessage;
    type Encoder = RawEncoder;
    type Decoder = RawDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        RawEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawDecoder
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl tonic::codec::Encoder for RawEncoder {
    type Item = RawMessage;
    type Error = tonic::Status;

    fn encode(
        &mut self,
        item: Self::Item,
        dst: &mut tonic::codec::EncodeBuf<'_>,
    ) -> std::result::Result<(), Self::Error> {
        dst.put_slice(&item.0);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl tonic::codec::Decoder for RawDecoder {
    type Item = RawMessage;
    type Error = tonic::Status;

    fn decode(
        &mut self,
        src: &mut tonic::codec::DecodeBuf<'_>,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        if len == 0 {
            return Ok(Some(RawMessage(Bytes::new())));
        }
        let bytes = src.copy_to_bytes(len);
        Ok(Some(RawMessage(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a ServerReflectionResponse body carrying a list_services_response.
    fn reflection_response(names: &[&str]) -> Bytes {
        let mut list = WireEncoder::new();
        for name in names {
            let mut service = WireEncoder::new();
            service.write_string(NAME_FIELD, name);
            list.write_length_delimited(SERVICE_FIELD, &service.finish());
        }

        let mut response = WireEncoder::new();
        response.write_string(1, "localhost:9000"); // valid_host
        response.write_length_delimited(LIST_SERVICES_RESPONSE_FIELD, &list.finish());
        response.finish()
    }

    #[test]
    fn test_decode_service_names() {
        let body = reflection_response(&["search.v1.SearchService", "grpc.health.v1.Health"]);
        let services = decode_service_names(&body).unwrap();
        assert_eq!(
            services,
            vec!["search.v1.SearchService", "grpc.health.v1.Health"]
        );
    }

    #[test]
    fn test_decode_filters_reflection_services() {
        let body = reflection_response(&[
            "search.v1.SearchService",
            "grpc.reflection.v1.ServerReflection",
        ]);
        let services = decode_service_names(&body).unwrap();
        assert_eq!(services, vec!["search.v1.SearchService"]);
    }

    #[test]
    fn test_decode_empty_response_is_an_error() {
        let body = reflection_response(&[]);
        assert!(decode_service_names(&body).is_err());
    }

    #[test]
    fn test_varint_round_trip() {
        let mut encoder = WireEncoder::new();
        encoder.write_varint(300);
        let bytes = encoder.finish();
        assert_eq!(&bytes[..], &[0xAC, 0x02]);

        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_varint(), Some(300));
    }

    #[test]
    fn test_list_services_request_encoding() {
        let mut encoder = WireEncoder::new();
        encoder.write_string(LIST_SERVICES_FIELD, "");
        // tag (7 << 3 | 2) followed by a zero length
        assert_eq!(&encoder.finish()[..], &[0x3A, 0x00]);
    }
}
