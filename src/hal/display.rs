//! Round LCD wiring (GC9A01, 240x240, on SPI2).

/// LCD panel and SPI wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdConfig {
    pub pin_mosi: i32,
    pub pin_sclk: i32,
    pub pin_cs: i32,
    pub pin_dc: i32,
    pub pin_rst: i32,
    pub pin_backlight: i32,
    pub width: u16,
    pub height: u16,
    /// SPI clock.
    pub spi_hz: u32,
    /// Panel wants BGR ordering.
    pub bgr: bool,
    /// Panel needs colour inversion.
    pub invert_colors: bool,
    /// Mirror horizontally.
    pub mirror_x: bool,
    /// Label colour, 0xRRGGBB.
    pub label_rgb: u32,
}

impl LcdConfig {
    /// Reference board wiring.
    pub const GC9A01_REFERENCE: Self = Self {
        pin_mosi: 15,
        pin_sclk: 14,
        pin_cs: 5,
        pin_dc: 27,
        pin_rst: 33,
        pin_backlight: 32,
        width: 240,
        height: 240,
        spi_hz: 40_000_000,
        bgr: true,
        invert_colors: true,
        mirror_x: true,
        label_rgb: 0x9027ff,
    };

    /// Centre of the panel in pixels.
    pub const fn center(&self) -> (i32, i32) {
        (self.width as i32 / 2, self.height as i32 / 2)
    }

    /// Label colour split into 8-bit channels.
    pub const fn label_channels(&self) -> (u8, u8, u8) {
        (
            (self.label_rgb >> 16) as u8,
            (self.label_rgb >> 8) as u8,
            self.label_rgb as u8,
        )
    }
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self::GC9A01_REFERENCE
    }
}
