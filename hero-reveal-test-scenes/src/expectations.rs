/// What a pixel must look like after rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expected {
    /// Premultiplied RGBA within a per-channel tolerance.
    Rgba([u8; 4]),
    /// Alpha of at least this value, colour unchecked.
    AlphaAtLeast(u8),
}

/// A single pixel expectation to validate after rendering.
#[derive(Debug, Clone)]
pub struct PixelExpectation {
    pub x: u32,
    pub y: u32,
    pub expected: Expected,
    /// Per-channel tolerance for [`Expected::Rgba`] (default 3).
    pub tolerance: u8,
    /// Human-readable label for failure messages.
    pub label: &'static str,
}

impl PixelExpectation {
    pub fn rgba(x: u32, y: u32, rgba: [u8; 4], label: &'static str) -> Self {
        Self {
            x,
            y,
            expected: Expected::Rgba(rgba),
            tolerance: 3,
            label,
        }
    }

    pub fn transparent(x: u32, y: u32, label: &'static str) -> Self {
        Self::rgba(x, y, [0, 0, 0, 0], label)
    }

    pub fn alpha_at_least(x: u32, y: u32, alpha: u8, label: &'static str) -> Self {
        Self {
            x,
            y,
            expected: Expected::AlphaAtLeast(alpha),
            tolerance: 0,
            label,
        }
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Reads the RGBA of `(x, y)` from premultiplied BGRA8 rows.
pub fn pixel_rgba(pixel_data: &[u8], width: u32, x: u32, y: u32) -> Option<[u8; 4]> {
    let offset = ((y as usize) * (width as usize) + x as usize) * 4;
    let bgra = pixel_data.get(offset..offset + 4)?;
    Some([bgra[2], bgra[1], bgra[0], bgra[3]])
}

/// Validates expectations against BGRA8 data from `render_to_buffer()`.
///
/// Returns one description per failed expectation.
pub fn check_pixels(
    pixel_data: &[u8],
    width: u32,
    height: u32,
    expectations: &[PixelExpectation],
) -> Vec<String> {
    let mut failures = Vec::new();

    for expectation in expectations {
        if expectation.x >= width || expectation.y >= height {
            failures.push(format!(
                "[{}] pixel ({},{}) is outside canvas {}x{}",
                expectation.label, expectation.x, expectation.y, width, height,
            ));
            continue;
        }
        let Some(actual) = pixel_rgba(pixel_data, width, expectation.x, expectation.y) else {
            failures.push(format!(
                "[{}] pixel ({},{}) is out of bounds (buffer len {})",
                expectation.label,
                expectation.x,
                expectation.y,
                pixel_data.len(),
            ));
            continue;
        };

        let matches = match expectation.expected {
            Expected::Rgba(rgba) => rgba
                .iter()
                .zip(actual)
                .all(|(&want, got)| (want as i16 - got as i16).abs() <= expectation.tolerance as i16),
            Expected::AlphaAtLeast(alpha) => actual[3] >= alpha,
        };
        if !matches {
            failures.push(format!(
                "[{}] pixel ({},{}) expected {:?} ±{} but got rgba{:?}",
                expectation.label,
                expectation.x,
                expectation.y,
                expectation.expected,
                expectation.tolerance,
                actual,
            ));
        }
    }

    failures
}
