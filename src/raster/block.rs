use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{BoundingBox, CanvasSize};
use crate::foundation::error::{StrokeFxError, StrokeFxResult};

/// Channel layout of an [`ImageBlock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    /// Three channels, no alpha plane.
    Rgb,
    /// Four channels, straight (non-premultiplied) alpha.
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> u8 {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    pub fn from_channels(channels: u8) -> StrokeFxResult<Self> {
        match channels {
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            n => Err(StrokeFxError::invalid_parameter(format!(
                "pixel grids must have 3 or 4 channels, got {n}"
            ))),
        }
    }
}

/// Row-major 8-bit pixel grid. Used for the canvas, job crops and effect results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBlock {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl ImageBlock {
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> StrokeFxResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrokeFxError::invalid_parameter(
                "image block width/height must be non-zero",
            ));
        }
        let expected = width as usize * height as usize * usize::from(layout.channels());
        if data.len() != expected {
            return Err(StrokeFxError::invalid_parameter(format!(
                "image block data has {} bytes, expected {expected} for {width}x{height}x{}",
                data.len(),
                layout.channels()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Block with every pixel set to `pixel` (which must have `layout.channels()` entries).
    pub fn filled(width: u32, height: u32, layout: PixelLayout, pixel: &[u8]) -> StrokeFxResult<Self> {
        if pixel.len() != usize::from(layout.channels()) {
            return Err(StrokeFxError::invalid_parameter(
                "fill pixel length must match the channel count",
            ));
        }
        let data = pixel.repeat(width as usize * height as usize);
        Self::new(width, height, layout, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> u8 {
        self.layout.channels()
    }

    /// `(width, height, channels)`.
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels())
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize {
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn row_stride(&self) -> usize {
        self.width as usize * usize::from(self.channels())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * usize::from(self.channels())
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let o = self.offset(x, y);
        &self.data[o..o + usize::from(self.channels())]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let o = self.offset(x, y);
        let c = usize::from(self.channels());
        &mut self.data[o..o + c]
    }

    /// Copy of the pixels inside `bbox`. Fails if the box leaves the block.
    pub fn crop(&self, bbox: BoundingBox) -> StrokeFxResult<ImageBlock> {
        if !bbox.fits_within(self.size()) {
            return Err(StrokeFxError::out_of_bounds(format!(
                "crop box {bbox:?} exceeds {}x{} block",
                self.width, self.height
            )));
        }
        let c = usize::from(self.channels());
        let row_len = bbox.width() as usize * c;
        let mut data = Vec::with_capacity(row_len * bbox.height() as usize);
        for y in bbox.top..=bbox.bottom {
            let o = self.offset(bbox.left, y);
            data.extend_from_slice(&self.data[o..o + row_len]);
        }
        ImageBlock::new(bbox.width(), bbox.height(), self.layout, data)
    }

    /// RGB view of this block (alpha plane dropped).
    pub fn to_rgb(&self) -> ImageBlock {
        match self.layout {
            PixelLayout::Rgb => self.clone(),
            PixelLayout::Rgba => {
                let data = self
                    .data
                    .chunks_exact(4)
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect();
                ImageBlock {
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Rgb,
                    data,
                }
            }
        }
    }

    /// RGBA view of this block; RGB input gets an opaque alpha plane.
    pub fn to_rgba(&self) -> ImageBlock {
        match self.layout {
            PixelLayout::Rgba => self.clone(),
            PixelLayout::Rgb => {
                let data = self
                    .data
                    .chunks_exact(3)
                    .flat_map(|p| [p[0], p[1], p[2], 255])
                    .collect();
                ImageBlock {
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Rgba,
                    data,
                }
            }
        }
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> StrokeFxResult<Self> {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelLayout::Rgba, img.into_raw())
    }

    pub fn to_rgba_image(&self) -> StrokeFxResult<image::RgbaImage> {
        let rgba = self.to_rgba();
        image::RgbaImage::from_raw(rgba.width, rgba.height, rgba.data)
            .ok_or_else(|| StrokeFxError::invalid_parameter("rgba buffer size mismatch (bug)"))
    }

    /// Decode any image file the `image` crate understands into an RGBA block.
    pub fn load(path: &Path) -> StrokeFxResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("decode image '{}'", path.display()))?
            .to_rgba8();
        Self::from_rgba_image(img)
    }

    /// Write this block as an RGBA8 PNG.
    pub fn save_png(&self, path: &Path) -> StrokeFxResult<()> {
        let img = self.to_rgba_image()?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/block.rs"]
mod tests;
