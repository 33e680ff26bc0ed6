//! Fixed-layout message header written at the start of every message.
//!
//! The header occupies [`MESSAGE_HEADER_LEN`] bytes:
//! `[index u64][timestamp_ns u64][kind u32][shape 72 bytes][magic u32]`, all
//! big-endian. Shapes shorter than the shape area are zero padded so every
//! header has the same length regardless of its payload kind.

use bincode::{Decode, Encode, decode_from_slice, encode_into_slice};

use super::{ImageFormat, ImageShape, MessageError, PayloadShape, PointCloudShape, ShapeError};
use crate::byte_order::wire_config;

/// Magic number closing every valid message header.
pub const MESSAGE_MAGIC: u32 = 0x55AA_55AA;

const SHAPE_LEN: usize = 72;

/// Encoded length of a [`MessageHeader`].
pub const MESSAGE_HEADER_LEN: usize = 8 + 8 + 4 + SHAPE_LEN + 4;

/// Header identifying one logical message.
///
/// # Examples
///
/// ```
/// use chunkwire::message::{
///     ImageFormat,
///     ImageShape,
///     MESSAGE_HEADER_LEN,
///     MessageHeader,
///     PayloadShape,
/// };
///
/// let header = MessageHeader::new(
///     3,
///     0,
///     PayloadShape::Image(ImageShape {
///         format: ImageFormat::Rgb,
///         width: 4,
///         height: 2,
///     }),
/// );
/// assert_eq!(header.message_size(), Ok(MESSAGE_HEADER_LEN + 24));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MessageHeader {
    index: u64,
    timestamp_ns: u64,
    shape: PayloadShape,
}

impl MessageHeader {
    /// Create a header for message `index` captured at `timestamp_ns`.
    #[must_use]
    pub const fn new(index: u64, timestamp_ns: u64, shape: PayloadShape) -> Self {
        Self {
            index,
            timestamp_ns,
            shape,
        }
    }

    /// Sequence number of the message since session start.
    #[must_use]
    pub const fn index(&self) -> u64 { self.index }

    /// Capture time in nanoseconds since session start.
    #[must_use]
    pub const fn timestamp_ns(&self) -> u64 { self.timestamp_ns }

    /// Payload description.
    #[must_use]
    pub const fn shape(&self) -> &PayloadShape { &self.shape }

    /// Total message length in bytes: header plus payload.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::SizeOverflow`] when the payload length does not
    /// fit in `usize`.
    pub fn message_size(&self) -> Result<usize, MessageError> {
        self.shape
            .payload_len()?
            .checked_add(MESSAGE_HEADER_LEN)
            .ok_or(MessageError::SizeOverflow)
    }

    /// Encode the header into its fixed wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Codec`] if bincode rejects a field.
    pub fn to_bytes(&self) -> Result<[u8; MESSAGE_HEADER_LEN], MessageError> {
        let mut shape = [0_u8; SHAPE_LEN];
        match &self.shape {
            PayloadShape::PointCloud(cloud) => encode(RawPointCloud::from(cloud), &mut shape)?,
            PayloadShape::Image(image) => encode(RawImage::from(image), &mut shape)?,
        }
        let raw = RawMessageHeader {
            index: self.index,
            timestamp_ns: self.timestamp_ns,
            kind: self.shape.kind(),
            shape,
            magic: MESSAGE_MAGIC,
        };
        let mut bytes = [0_u8; MESSAGE_HEADER_LEN];
        encode(raw, &mut bytes)?;
        Ok(bytes)
    }

    /// Decode and validate a header from the start of `bytes`.
    ///
    /// Trailing bytes beyond [`MESSAGE_HEADER_LEN`] are ignored so the whole
    /// reassembled message can be passed in.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Truncated`] when fewer than
    /// [`MESSAGE_HEADER_LEN`] bytes are available,
    /// [`MessageError::BadMagic`] when the magic number is wrong, and
    /// [`MessageError::InvalidPayloadShape`] for unknown kinds or pixel
    /// formats.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let Some(header_bytes) = bytes.get(..MESSAGE_HEADER_LEN) else {
            return Err(MessageError::Truncated {
                available: bytes.len(),
            });
        };
        let raw: RawMessageHeader = decode(header_bytes)?;
        if raw.magic != MESSAGE_MAGIC {
            return Err(MessageError::BadMagic { found: raw.magic });
        }

        let shape = match raw.kind {
            PayloadShape::POINT_CLOUD_KIND => {
                PayloadShape::PointCloud(decode::<RawPointCloud>(&raw.shape)?.into())
            }
            PayloadShape::IMAGE_KIND => {
                PayloadShape::Image(decode::<RawImage>(&raw.shape)?.try_into()?)
            }
            other => return Err(ShapeError::UnknownKind(other).into()),
        };

        Ok(Self::new(raw.index, raw.timestamp_ns, shape))
    }
}

/// On-wire field order of a message header.
#[derive(Encode, Decode)]
struct RawMessageHeader {
    index: u64,
    timestamp_ns: u64,
    kind: u32,
    shape: [u8; SHAPE_LEN],
    magic: u32,
}

/// Point-cloud shape area: exactly [`SHAPE_LEN`] bytes.
#[derive(Encode, Decode)]
struct RawPointCloud {
    tracker_state: u32,
    integral_state: u32,
    translation: [f64; 3],
    rotation: [f64; 4],
    point_count: u64,
}

impl From<&PointCloudShape> for RawPointCloud {
    fn from(cloud: &PointCloudShape) -> Self {
        Self {
            tracker_state: cloud.tracker_state,
            integral_state: cloud.integral_state,
            translation: cloud.translation,
            rotation: cloud.rotation,
            point_count: cloud.point_count,
        }
    }
}

impl From<RawPointCloud> for PointCloudShape {
    fn from(raw: RawPointCloud) -> Self {
        Self {
            tracker_state: raw.tracker_state,
            integral_state: raw.integral_state,
            translation: raw.translation,
            rotation: raw.rotation,
            point_count: raw.point_count,
        }
    }
}

/// Image shape area; the rest of the shape bytes stay zero.
#[derive(Encode, Decode)]
struct RawImage {
    format: u32,
    width: u32,
    height: u32,
}

impl From<&ImageShape> for RawImage {
    fn from(image: &ImageShape) -> Self {
        Self {
            format: image.format.code(),
            width: image.width,
            height: image.height,
        }
    }
}

impl TryFrom<RawImage> for ImageShape {
    type Error = ShapeError;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        Ok(Self {
            format: ImageFormat::try_from(raw.format)?,
            width: raw.width,
            height: raw.height,
        })
    }
}

fn encode<E: Encode>(value: E, out: &mut [u8]) -> Result<(), MessageError> {
    encode_into_slice(value, out, wire_config())
        .map(drop)
        .map_err(|_| MessageError::Codec { operation: "encoding" })
}

fn decode<D: Decode<()>>(bytes: &[u8]) -> Result<D, MessageError> {
    decode_from_slice(bytes, wire_config())
        .map(|(value, _)| value)
        .map_err(|_| MessageError::Codec { operation: "decoding" })
}
