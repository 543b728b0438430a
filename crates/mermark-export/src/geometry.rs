//! Page geometry.

/// Page width in millimeters (A4).
pub const PAGE_WIDTH_MM: f64 = 210.0;

/// Page height in millimeters (A4).
pub const PAGE_HEIGHT_MM: f64 = 297.0;

/// Margin on every side of the page, in millimeters.
pub const PAGE_MARGIN_MM: f64 = 10.0;

/// CSS reference pixels per millimeter (96 px per inch).
pub const CSS_PX_PER_MM: f64 = 96.0 / 25.4;

/// Size and margins of an export page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width_mm: PAGE_WIDTH_MM,
            height_mm: PAGE_HEIGHT_MM,
            margin_mm: PAGE_MARGIN_MM,
        }
    }
}

impl PageGeometry {
    /// Width available for content, in millimeters.
    #[must_use]
    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }

    /// Height available for content, in millimeters.
    #[must_use]
    pub fn content_height_mm(&self) -> f64 {
        self.height_mm - 2.0 * self.margin_mm
    }

    /// Width available for content, in CSS pixels.
    #[must_use]
    pub fn content_width_px(&self) -> f64 {
        self.content_width_mm() * CSS_PX_PER_MM
    }

    /// Check that the margins leave room for content.
    ///
    /// Returns a description of the problem if they do not.
    pub fn validate(&self) -> Result<(), String> {
        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(format!("margin must be non-negative, got {}mm", self.margin_mm));
        }
        if !is_positive(self.content_width_mm()) || !is_positive(self.content_height_mm()) {
            return Err(format!(
                "{}mm margins leave no content area on a {}mm x {}mm page",
                self.margin_mm, self.width_mm, self.height_mm
            ));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
