use serde::Serialize;

/// Compares two values by their MessagePack encoding.
///
/// Sequences compare order-sensitively and object identity never matters.
/// A value that fails to encode is never equal to anything.
pub fn structurally_equal<T: Serialize + ?Sized>(a: &T, b: &T) -> bool {
    match (rmp_serde::to_vec(a), rmp_serde::to_vec(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
