//! Synthetic point-cloud producer used by the demo sender.
//!
//! A [`PointGrid`] lays points on the `x = 0` plane, spaced `step` apart
//! across a `width` by `height` field centred on the origin, and composes
//! them into a ready-to-send message buffer.

use std::f64::consts::PI;

use crate::{
    byte_order::write_network_f32,
    fragment::{BufferError, ReassemblyBuffer},
    message::{MessageHeader, POINT_WIDTH, PayloadShape, PointCloudShape},
};

/// Planar grid of points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointGrid {
    /// Spacing between neighbouring points.
    pub step: f32,
    /// Extent along the first in-plane axis.
    pub width: f32,
    /// Extent along the second in-plane axis.
    pub height: f32,
}

impl Default for PointGrid {
    fn default() -> Self {
        Self {
            step: 0.1,
            width: 4.0,
            height: 6.0,
        }
    }
}

impl PointGrid {
    /// Number of points along each axis.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "grid extents are small positive values; truncation matches the point spacing"
    )]
    pub fn dimensions(&self) -> (usize, usize) {
        if self.step <= 0.0 || !self.step.is_finite() {
            return (0, 0);
        }
        let columns = (self.width / self.step).max(0.0) as usize;
        let rows = (self.height / self.step).max(0.0) as usize;
        (columns, rows)
    }

    /// Total number of points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        let (columns, rows) = self.dimensions();
        columns.saturating_mul(rows)
    }

    /// Message header for message `index`: a tracking camera at
    /// `(1.0, 0.2, 0.0)` rotated by `0.1 * pi` about the z axis.
    #[must_use]
    pub fn header(&self, index: u64, timestamp_ns: u64) -> MessageHeader {
        let half_angle = 0.5 * 0.1 * PI;
        MessageHeader::new(
            index,
            timestamp_ns,
            PayloadShape::PointCloud(PointCloudShape {
                tracker_state: 1,
                integral_state: 1,
                translation: [1.0, 0.2, 0.0],
                rotation: [0.0, 0.0, half_angle.sin(), half_angle.cos()],
                point_count: self.point_count() as u64,
            }),
        )
    }

    /// Compose message `index` into a buffer cut for `mtu`-byte packets.
    ///
    /// # Errors
    ///
    /// Returns the [`BufferError`] raised while sizing or allocating the
    /// buffer.
    #[expect(
        clippy::cast_precision_loss,
        reason = "grid indices stay far below f32 precision limits"
    )]
    pub fn compose(
        &self,
        index: u64,
        timestamp_ns: u64,
        mtu: usize,
    ) -> Result<ReassemblyBuffer, BufferError> {
        let mut buffer = ReassemblyBuffer::for_send(&self.header(index, timestamp_ns), mtu)?;
        let (columns, rows) = self.dimensions();
        let mut points = buffer.payload_mut().chunks_exact_mut(POINT_WIDTH);
        for column in 0..columns {
            let v = -0.5 * self.width + self.step * column as f32;
            for row in 0..rows {
                let w = -0.5 * self.height + self.step * row as f32;
                let Some(point) = points.next() else {
                    return Ok(buffer);
                };
                for (slot, coordinate) in point.chunks_exact_mut(4).zip([0.0, v, w]) {
                    slot.copy_from_slice(&write_network_f32(coordinate));
                }
            }
        }
        Ok(buffer)
    }
}
