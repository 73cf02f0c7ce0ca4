//! Pinhole-model distance estimation for detected signs

/// Pre-calibrated camera focal length (pixels).
pub const DEFAULT_FOCAL_LENGTH: f32 = 500.0;

/// Average physical width of a traffic sign (meters).
pub const DEFAULT_KNOWN_WIDTH_M: f32 = 0.5;

/// Stand-in bounding-box width until the classifier reports one.
// TODO: take the detector's actual bounding-box width once the model
// process reports it alongside class/confidence.
pub const STAND_IN_OBJECT_WIDTH_PX: f32 = 100.0;

/// Estimate the distance to an object using the simple pinhole camera
/// model: `distance = known_width * focal_length / object_width_pixels`.
///
/// A zero pixel width is the degenerate "no measurable extent" case and
/// yields a distance of 0.
pub fn estimate(object_width_px: f32, focal_length: f32, known_width_m: f32) -> f32 {
    if object_width_px == 0.0 {
        return 0.0;
    }
    (known_width_m * focal_length) / object_width_px
}

/// Spoken phrasing for an estimated distance: quantitative when the
/// estimate is positive, the qualitative "ahead" otherwise.
pub fn phrase(distance_m: f32) -> String {
    if distance_m > 0.0 {
        format!("{} meters ahead", distance_m as i64)
    } else {
        "ahead".to_string()
    }
}
