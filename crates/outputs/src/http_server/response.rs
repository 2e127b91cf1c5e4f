//! Response bodies
//!
//! How a batch is laid out on each endpoint:
//!
//! - single-shot: one part as raw bytes, several parts as `multipart/form-data`
//! - stream: one part as raw bytes, several parts joined by `\n` with a
//!   trailing `\n`; every batch is followed by a `\n` delimiter
//! - websocket: one binary frame per part (no encoding needed)

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use conduit_message::Batch;

/// Content type of a single raw part
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Plain text error response
pub fn text_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

/// Single-shot response for a batch
pub fn batch_response(batch: &Batch) -> Response {
    if batch.len() > 1 {
        let boundary = uuid::Uuid::new_v4().simple().to_string();
        let body = multipart_body(batch, &boundary);
        (
            [(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )],
            body,
        )
            .into_response()
    } else {
        let data = batch.get(0).map(|p| p.data().clone()).unwrap_or_default();
        ([(header::CONTENT_TYPE, OCTET_STREAM.to_string())], data).into_response()
    }
}

/// Encode every part as an `application/octet-stream` form part
pub fn multipart_body(batch: &Batch, boundary: &str) -> Bytes {
    let mut body = BytesMut::with_capacity(batch.total_bytes() + batch.len() * 96);

    for (i, part) in batch.iter().enumerate() {
        if i > 0 {
            body.put_slice(b"\r\n");
        }
        body.put_slice(b"--");
        body.put_slice(boundary.as_bytes());
        body.put_slice(b"\r\nContent-Type: ");
        body.put_slice(OCTET_STREAM.as_bytes());
        body.put_slice(b"\r\n\r\n");
        body.put_slice(part.data());
    }

    body.put_slice(b"\r\n--");
    body.put_slice(boundary.as_bytes());
    body.put_slice(b"--\r\n");
    body.freeze()
}

/// Encode a batch as one chunk of the continuous stream, delimiter included
pub fn stream_chunk(batch: &Batch) -> Bytes {
    if batch.len() == 1 {
        let data = batch.get(0).map(|p| p.data().as_ref()).unwrap_or_default();
        let mut chunk = BytesMut::with_capacity(data.len() + 1);
        chunk.put_slice(data);
        chunk.put_u8(b'\n');
        return chunk.freeze();
    }

    let mut chunk = BytesMut::with_capacity(batch.total_bytes() + batch.len() + 1);
    for part in batch.iter() {
        chunk.put_slice(part.data());
        chunk.put_u8(b'\n');
    }
    chunk.put_u8(b'\n');
    chunk.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_single_part() {
        let chunk = stream_chunk(&Batch::quick(["hello"]));
        assert_eq!(&chunk[..], b"hello\n");
    }

    #[test]
    fn test_stream_chunk_multi_part() {
        let chunk = stream_chunk(&Batch::quick(["a", "b"]));
        assert_eq!(&chunk[..], b"a\nb\n\n");
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body(&Batch::quick(["first", "second"]), "xyz");
        let expected = "--xyz\r\nContent-Type: application/octet-stream\r\n\r\nfirst\r\n\
                        --xyz\r\nContent-Type: application/octet-stream\r\n\r\nsecond\r\n\
                        --xyz--\r\n";
        assert_eq!(std::str::from_utf8(&body).unwrap(), expected);
    }

    #[test]
    fn test_batch_response_single_part_content_type() {
        let response = batch_response(&Batch::quick(["x"]));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[test]
    fn test_batch_response_multi_part_content_type() {
        let response = batch_response(&Batch::quick(["x", "y"]));
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }
}
