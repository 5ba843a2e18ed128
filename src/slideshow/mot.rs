//! MOT object framing for slideshow payloads.
//!
//! Emits the MOT header core (body size, header size, content type and
//! subtype packed into seven bytes) followed by ContentName and MimeType
//! header-extension parameters and the payload, preceded by the 16-bit
//! transport id. X-PAD packetization and MSC data-group segmentation belong
//! to the sink collaborator.

use super::cache::ImageEntry;
use crate::codec::ImageFormat;

/// MOT content type for still images.
const CONTENT_TYPE_IMAGE: u8 = 0x02;

/// Header-extension parameter ids.
const PARAM_CONTENT_NAME: u8 = 0x0C;
const PARAM_MIME_TYPE: u8 = 0x10;

/// Character set indicator prefixed to ContentName: ISO Latin 1.
const CONTENT_NAME_CHARSET: u8 = 0x40;

fn content_subtype(format: ImageFormat) -> u16 {
    match format {
        // JFIF and PNG carry their standardized slideshow subtypes; the
        // newer formats rely on the MimeType parameter.
        ImageFormat::Jpeg => 0x001,
        ImageFormat::Png => 0x003,
        ImageFormat::Webp | ImageFormat::Heif => 0x000,
    }
}

/// A framed MOT object ready for the PAD sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MotObject {
    pub transport_id: u16,
    pub mime: &'static str,
    pub body_size: usize,
    pub bytes: Vec<u8>,
}

/// Header-extension parameter with a one-byte data-field length
/// (PLI = 0b11, extension flag clear). Values longer than 127 bytes are
/// truncated; names and MIME strings never approach that.
fn extension_parameter(param_id: u8, data: &[u8]) -> Vec<u8> {
    let data = &data[..data.len().min(127)];
    let mut out = Vec::with_capacity(2 + data.len());
    out.push(0b1100_0000 | (param_id & 0x3F));
    out.push(data.len() as u8);
    out.extend_from_slice(data);
    out
}

/// Pack the 7-byte MOT header core:
/// body size (28 bits), header size (13 bits), content type (6 bits),
/// content subtype (9 bits).
fn header_core(body_size: u32, header_size: u16, content_type: u8, subtype: u16) -> [u8; 7] {
    let packed: u64 = ((body_size as u64 & 0x0FFF_FFFF) << 28)
        | ((header_size as u64 & 0x1FFF) << 15)
        | ((content_type as u64 & 0x3F) << 9)
        | (subtype as u64 & 0x1FF);
    let bytes = packed.to_be_bytes();
    [bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

/// Frame a carousel entry as one MOT object under the given transport id.
pub fn frame(entry: &ImageEntry, transport_id: u16) -> MotObject {
    let mut extension = Vec::new();
    let mut name = vec![CONTENT_NAME_CHARSET];
    name.extend_from_slice(entry.filename.as_bytes());
    extension.extend(extension_parameter(PARAM_CONTENT_NAME, &name));
    extension.extend(extension_parameter(
        PARAM_MIME_TYPE,
        entry.format.mime().as_bytes(),
    ));

    let header_size = (7 + extension.len()) as u16;
    let core = header_core(
        entry.payload.len() as u32,
        header_size,
        CONTENT_TYPE_IMAGE,
        content_subtype(entry.format),
    );

    let mut bytes = Vec::with_capacity(2 + header_size as usize + entry.payload.len());
    bytes.extend_from_slice(&transport_id.to_be_bytes());
    bytes.extend_from_slice(&core);
    bytes.extend_from_slice(&extension);
    bytes.extend_from_slice(&entry.payload);

    MotObject {
        transport_id,
        mime: entry.format.mime(),
        body_size: entry.payload.len(),
        bytes,
    }
}
