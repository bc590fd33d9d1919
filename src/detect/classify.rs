use super::result::DetectionCategory;

/// Map a backend label to a detection category.
///
/// Case-insensitive substring match in fixed priority: `fire`, then `smoke`,
/// then `hot`. Anything else falls back to `Smoke`, which also catches generic
/// object classes (`person`, `car`) from a general-purpose model.
pub fn classify(label: &str) -> DetectionCategory {
    let label = label.to_lowercase();
    if label.contains("fire") {
        DetectionCategory::Fire
    } else if label.contains("smoke") {
        DetectionCategory::Smoke
    } else if label.contains("hot") {
        DetectionCategory::Hotspot
    } else {
        DetectionCategory::Smoke
    }
}
