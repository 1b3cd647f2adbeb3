///////////////////
// Vector macros //
///////////////////

/// Early return with `LayoutError::LengthMismatch` unless all vectors have
/// the same length.
#[macro_export]
macro_rules! ensure_same_len {
    ($($vec:expr),+ $(,)?) => {
        {
            let lengths: Vec<usize> = vec![$($vec.len()),+];
            let first_len = lengths[0];

            if !lengths.iter().all(|&len| len == first_len) {
                return Err($crate::error::LayoutError::LengthMismatch { lengths });
            }
        }
    };
}
