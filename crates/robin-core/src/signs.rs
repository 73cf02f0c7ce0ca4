//! Road sign class table (GTSRB ordering)

/// Display names for the 43 sign classes the classifier reports, indexed
/// by class id.
pub const CLASS_NAMES: [&str; 43] = [
    "Speed Limit 20 km/h",
    "Speed Limit 30 km/h",
    "Speed Limit 50 km/h",
    "Speed Limit 60 km/h",
    "Speed Limit 70 km/h",
    "Speed Limit 80 km/h",
    "End of Speed Limit 80 km/h",
    "Speed Limit 100 km/h",
    "Speed Limit 120 km/h",
    "No passing",
    "No passing for vehicles over 3.5 metric tons",
    "Right-of-way at the next intersection",
    "Priority road",
    "Yield",
    "Stop",
    "No vehicles",
    "Vehicles over 3.5 metric tons prohibited",
    "No entry",
    "General caution",
    "Dangerous curve to the left",
    "Dangerous curve to the right",
    "Double curve",
    "Bumpy road",
    "Slippery road",
    "Road narrows on the right",
    "Road work",
    "Traffic signals",
    "Pedestrians",
    "Children crossing",
    "Bicycles crossing",
    "Beware of ice/snow",
    "Wild animals crossing",
    "End of all speed and passing limits",
    "Turn right ahead",
    "Turn left ahead",
    "Ahead only",
    "Go straight or right",
    "Go straight or left",
    "Keep right",
    "Keep left",
    "Roundabout mandatory",
    "End of no passing",
    "End of no passing by vehicles over 3.5 metric tons",
];

/// Look up a class name by id, falling back to "Unknown" for ids the
/// table does not cover.
pub fn class_name(class_id: usize) -> &'static str {
    CLASS_NAMES.get(class_id).copied().unwrap_or("Unknown")
}
