//! Intensity and per-channel histogram modules.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::stats::histogram;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ModuleError;
use crate::imaging;
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::load_failure;
use crate::modules::preview::PreviewEncoder;
use crate::types::{AnalysisOutcome, ModuleOutput};

const CHART_HEIGHT: u32 = 128;

/// Which plane a [`Histogram`] module counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Luma,
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn module_name(self) -> &'static str {
        match self {
            Channel::Luma => "Histogram 1: Intensity (Gray/Luma)",
            Channel::Red => "Histogram 2: Red Channel (R)",
            Channel::Green => "Histogram 3: Green Channel (G)",
            Channel::Blue => "Histogram 4: Blue Channel (B)",
        }
    }

    fn priority(self) -> i32 {
        match self {
            Channel::Luma => 60,
            Channel::Red => 61,
            Channel::Green => 62,
            Channel::Blue => 63,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Channel::Luma => "intensity",
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }

    /// Bin this channel of a decoded image.
    fn counts(self, image: &DynamicImage) -> [u32; 256] {
        match self {
            Channel::Luma => histogram(&imaging::to_gray(image)).channels[0],
            Channel::Red => histogram(&image.to_rgb8()).channels[0],
            Channel::Green => histogram(&image.to_rgb8()).channels[1],
            Channel::Blue => histogram(&image.to_rgb8()).channels[2],
        }
    }
}

/// 256-bin histogram of one channel.
#[derive(Debug, Clone)]
pub struct Histogram {
    channel: Channel,
    preview: PreviewEncoder,
}

impl Histogram {
    pub fn new(channel: Channel, preview: PreviewEncoder) -> Self {
        Self { channel, preview }
    }

    pub fn analyze(&self, image: &DynamicImage) -> AnalysisOutcome {
        let counts = self.channel.counts(image);
        let bins: Vec<u32> = (0..256).collect();

        let mut outcome = AnalysisOutcome::new()
            .with_metric("bins", bins)
            .with_metric("counts", counts.to_vec());

        outcome = match self.channel {
            Channel::Luma => outcome.with_detail("Intensity (lightness) histogram computed."),
            channel => {
                let mean = imaging::histogram_mean(&counts);
                outcome
                    .with_detail(format!(
                        "Mean {} level: {}/255",
                        channel.label(),
                        mean as u32
                    ))
                    .with_metric("mean", crate::modules::round_to(mean, 2))
            }
        };

        if self.preview.is_enabled() {
            let chart = DynamicImage::ImageLuma8(render_chart(&counts));
            outcome = self.preview.attach(outcome, &[("histogram", &chart)]);
        }
        outcome
    }
}

/// Bar chart of a histogram: one column per bin, dark bars on white.
pub fn render_chart(counts: &[u32; 256]) -> GrayImage {
    let max = counts.iter().copied().max().unwrap_or(0).max(1);
    let mut chart = GrayImage::from_pixel(256, CHART_HEIGHT, Luma([imaging::WHITE]));
    for (x, &c) in counts.iter().enumerate() {
        let bar = (c as f64 / max as f64 * CHART_HEIGHT as f64).round() as u32;
        for y in CHART_HEIGHT - bar.min(CHART_HEIGHT)..CHART_HEIGHT {
            chart.put_pixel(x as u32, y, Luma([0]));
        }
    }
    chart
}

impl AnalysisModule for Histogram {
    fn name(&self) -> &str {
        self.channel.module_name()
    }

    fn priority(&self) -> i32 {
        self.channel.priority()
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let image = match input.load_image() {
            Ok(image) => image,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&image).into())
    }
}

fn build(channel: Channel, config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(Histogram::new(
        channel,
        PreviewEncoder::new(&config.modules),
    )))
}

pub fn gray_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(Channel::Luma, config)
}

pub fn red_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(Channel::Red, config)
}

pub fn green_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(Channel::Green, config)
}

pub fn blue_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(Channel::Blue, config)
}
