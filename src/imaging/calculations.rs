//! Pure dimension math. No I/O, no images.

/// Target size for a derivative capped at `max_width`.
///
/// Returns `None` when the source already fits (derivatives are never
/// upscaled). Height follows the aspect ratio with integer arithmetic,
/// truncating, and never drops below one pixel.
///
/// ```
/// # use photosync::imaging::fit_width;
/// assert_eq!(fit_width((4000, 3000), 800), Some((800, 600)));
/// assert_eq!(fit_width((640, 480), 800), None);
/// ```
pub fn fit_width(source: (u32, u32), max_width: u32) -> Option<(u32, u32)> {
    let (width, height) = source;
    if width <= max_width || width == 0 {
        return None;
    }
    let scaled = u64::from(height) * u64::from(max_width) / u64::from(width);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    Some((max_width, scaled))
}
