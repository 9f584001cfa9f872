//! Compositor: writes an effect result back into a full-canvas copy through the stroke mask.

use rayon::prelude::*;

use crate::foundation::core::BoundingBox;
use crate::foundation::error::{StrokeFxError, StrokeFxResult};
use crate::geometry::mask::StrokeMask;
use crate::raster::block::ImageBlock;

/// Produce the next canvas buffer.
///
/// Pixels covered by `mask` take their color from `result`; every other pixel is copied
/// unchanged from `canvas`. `result` and `mask` are box-local and must both match `bbox`.
/// Alpha comes from `result` only when `writes_alpha` is set and both blocks carry an alpha
/// plane; otherwise the canvas alpha is kept.
pub fn merge(
    canvas: &ImageBlock,
    result: &ImageBlock,
    mask: &StrokeMask,
    bbox: BoundingBox,
    writes_alpha: bool,
) -> StrokeFxResult<ImageBlock> {
    if !bbox.fits_within(canvas.size()) {
        return Err(StrokeFxError::out_of_bounds(format!(
            "merge box {bbox:?} exceeds {}x{} canvas",
            canvas.width(),
            canvas.height()
        )));
    }
    let (bw, bh) = (bbox.width(), bbox.height());
    if (result.width(), result.height()) != (bw, bh) {
        return Err(StrokeFxError::shape_mismatch(
            (bw, bh, result.channels()),
            result.shape(),
        ));
    }
    if (mask.width(), mask.height()) != (bw, bh) {
        return Err(StrokeFxError::shape_mismatch(
            (bw, bh, 1),
            (mask.width(), mask.height(), 1),
        ));
    }

    let cc = usize::from(canvas.channels());
    let rc = usize::from(result.channels());
    let copy = if writes_alpha && cc == 4 && rc == 4 { 4 } else { 3 };

    let mut out = canvas.clone();
    let stride = out.row_stride();
    let left = bbox.left as usize;
    let top = bbox.top as usize;

    out.data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(top)
        .take(bh as usize)
        .for_each(|(y, row)| {
            let ly = y - top;
            let src_stride = result.row_stride();
            let src_row = &result.data()[ly * src_stride..(ly + 1) * src_stride];
            let dst = &mut row[left * cc..(left + bw as usize) * cc];
            for ((d, s), &covered) in dst
                .chunks_exact_mut(cc)
                .zip(src_row.chunks_exact(rc))
                .zip(mask.row(ly as u32))
            {
                if covered {
                    d[..copy].copy_from_slice(&s[..copy]);
                }
            }
        });

    tracing::debug!(?bbox, writes_alpha = copy == 4, "merged effect result");
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
