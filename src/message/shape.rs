//! Typed payload shapes carried by message headers.

use super::{MessageError, ShapeError};

/// Width in bytes of one point-cloud element: three `f32` coordinates.
pub const POINT_WIDTH: usize = 12;

/// Pixel layouts supported by image messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// One byte of luminance per pixel.
    Gray,
    /// Three bytes per pixel.
    Rgb,
    /// Four bytes per pixel.
    Rgba,
}

impl ImageFormat {
    /// Number of bytes occupied by one pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Wire code of the format.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Gray => 0,
            Self::Rgb => 1,
            Self::Rgba => 2,
        }
    }
}

impl TryFrom<u32> for ImageFormat {
    type Error = ShapeError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Gray),
            1 => Ok(Self::Rgb),
            2 => Ok(Self::Rgba),
            other => Err(ShapeError::UnknownImageFormat(other)),
        }
    }
}

/// Point-cloud payload description together with the camera pose it was
/// captured from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointCloudShape {
    /// Tracker state: `0` when tracking is lost, `1` when tracking.
    pub tracker_state: u32,
    /// Integrator state reported by the producer.
    pub integral_state: u32,
    /// Camera centre position.
    pub translation: [f64; 3],
    /// Camera orientation as a quaternion.
    pub rotation: [f64; 4],
    /// Number of points in the payload.
    pub point_count: u64,
}

/// Image payload description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageShape {
    /// Pixel layout.
    pub format: ImageFormat,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// The closed set of payload shapes a message can carry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PayloadShape {
    /// Map points, [`POINT_WIDTH`] bytes each.
    PointCloud(PointCloudShape),
    /// A camera frame.
    Image(ImageShape),
}

impl PayloadShape {
    pub(crate) const POINT_CLOUD_KIND: u32 = 0;
    pub(crate) const IMAGE_KIND: u32 = 1;

    /// Wire tag identifying the shape.
    #[must_use]
    pub const fn kind(&self) -> u32 {
        match self {
            Self::PointCloud(_) => Self::POINT_CLOUD_KIND,
            Self::Image(_) => Self::IMAGE_KIND,
        }
    }

    /// Number of payload elements (points or pixels).
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::SizeOverflow`] if the count does not fit in
    /// `usize`.
    pub fn element_count(&self) -> Result<usize, MessageError> {
        let count = match self {
            Self::PointCloud(cloud) => cloud.point_count,
            Self::Image(image) => u64::from(image.width) * u64::from(image.height),
        };
        usize::try_from(count).map_err(|_| MessageError::SizeOverflow)
    }

    /// Width in bytes of one payload element.
    #[must_use]
    pub const fn element_width(&self) -> usize {
        match self {
            Self::PointCloud(_) => POINT_WIDTH,
            Self::Image(image) => image.format.bytes_per_pixel(),
        }
    }

    /// Number of payload bytes following the header.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::SizeOverflow`] if the byte count does not fit
    /// in `usize`.
    pub fn payload_len(&self) -> Result<usize, MessageError> {
        self.element_count()?
            .checked_mul(self.element_width())
            .ok_or(MessageError::SizeOverflow)
    }
}
