use uuid::Uuid;

/// Draws a fresh random (v4) UUID.
///
/// Every identifier in the workspace comes from here so that the 128-bit
/// random space is used consistently for both peers and correlation ids.
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}
