//! GC9A01 round LCD as a [`LabelTarget`].
//!
//! The panel shows a single centred line. Each update clears the label band
//! and redraws the text; nothing else on screen is touched.

use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig, SPI2};
use esp_idf_svc::hal::units::Hertz;

use embedded_graphics::mono_font::{ascii::FONT_10X20, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::info;
use mipidsi::interface::SpiInterface;
use mipidsi::models::GC9A01;
use mipidsi::options::{ColorInversion, ColorOrder, Orientation};
use mipidsi::Builder;

use hall_rpm_gauge::hal::display::LcdConfig;
use hall_rpm_gauge::sink::{LabelTarget, SinkError};

use super::PlatformError;

/// Height of the band cleared before each redraw.
const LABEL_BAND_HEIGHT: u32 = 32;

/// SPI staging buffer for the display interface.
const SPI_BUFFER_LEN: usize = 512;

type Spi = SpiDeviceDriver<'static, SpiDriver<'static>>;
type Pin = PinDriver<'static, AnyOutputPin, Output>;
type Panel = mipidsi::Display<SpiInterface<'static, Spi, Pin>, GC9A01, Pin>;

pub struct LcdLabel {
    panel: Panel,
    center: Point,
    band: Rectangle,
    style: MonoTextStyle<'static, Rgb565>,
    _backlight: Pin,
}

/// Bring up SPI, the panel and the backlight, and clear the screen.
pub fn init(spi: SPI2, cfg: &LcdConfig) -> Result<LcdLabel, PlatformError> {
    // SAFETY: pin numbers come from the board configuration and are not
    // claimed by any other driver
    let (sclk, mosi, cs, dc, rst, bl) = unsafe {
        (
            AnyIOPin::new(cfg.pin_sclk),
            AnyIOPin::new(cfg.pin_mosi),
            AnyOutputPin::new(cfg.pin_cs),
            AnyOutputPin::new(cfg.pin_dc),
            AnyOutputPin::new(cfg.pin_rst),
            AnyOutputPin::new(cfg.pin_backlight),
        )
    };

    let driver = SpiDriver::new(spi, sclk, mosi, Option::<AnyIOPin>::None, &SpiDriverConfig::new())?;
    let device = SpiDeviceDriver::new(
        driver,
        Some(cs),
        &SpiConfig::new().baudrate(Hertz(cfg.spi_hz)),
    )?;

    let buffer: &'static mut [u8; SPI_BUFFER_LEN] = Box::leak(Box::new([0u8; SPI_BUFFER_LEN]));
    let di = SpiInterface::new(device, PinDriver::output(dc)?, buffer);

    let mut orientation = Orientation::new();
    if cfg.mirror_x {
        orientation = orientation.flip_horizontal();
    }

    let mut panel = Builder::new(GC9A01, di)
        .display_size(cfg.width, cfg.height)
        .reset_pin(PinDriver::output(rst)?)
        .invert_colors(if cfg.invert_colors {
            ColorInversion::Inverted
        } else {
            ColorInversion::Normal
        })
        .color_order(if cfg.bgr { ColorOrder::Bgr } else { ColorOrder::Rgb })
        .orientation(orientation)
        .init(&mut Ets)
        .map_err(|_| PlatformError::Display)?;

    panel.clear(Rgb565::BLACK).map_err(|_| PlatformError::Display)?;

    let mut backlight = PinDriver::output(bl)?;
    backlight.set_high()?;

    let (cx, cy) = cfg.center();
    let center = Point::new(cx, cy);
    let (r, g, b) = cfg.label_channels();

    info!("LCD up: GC9A01 {}x{} @ {} Hz", cfg.width, cfg.height, cfg.spi_hz);

    Ok(LcdLabel {
        panel,
        center,
        band: Rectangle::with_center(center, Size::new(cfg.width as u32, LABEL_BAND_HEIGHT)),
        style: MonoTextStyle::new(&FONT_10X20, Rgb565::from(Rgb888::new(r, g, b))),
        _backlight: backlight,
    })
}

impl LabelTarget for LcdLabel {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError> {
        self.panel
            .fill_solid(&self.band, Rgb565::BLACK)
            .map_err(|_| SinkError::RenderFailed)?;

        let layout = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(text, self.center, self.style, layout)
            .draw(&mut self.panel)
            .map_err(|_| SinkError::RenderFailed)?;

        Ok(())
    }
}
