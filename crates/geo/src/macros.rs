//! Macros to call generic raster functions with the pixel type that matches a runtime [`crate::ArrayDataType`].

/// Calls `$fn::<T>(args...)` with `T` the pixel type of `$data_type`.
///
/// ```ignore
/// let summary = geo::dispatch_data_type!(desc.data_type, process, &input, &mut output)?;
/// ```
#[macro_export]
macro_rules! dispatch_data_type {
    ($data_type:expr, $fn:ident, $($args:expr),*) => {
        match $data_type {
            $crate::ArrayDataType::Int8 => $fn::<i8>($($args),*),
            $crate::ArrayDataType::Uint8 => $fn::<u8>($($args),*),
            $crate::ArrayDataType::Int16 => $fn::<i16>($($args),*),
            $crate::ArrayDataType::Uint16 => $fn::<u16>($($args),*),
            $crate::ArrayDataType::Int32 => $fn::<i32>($($args),*),
            $crate::ArrayDataType::Uint32 => $fn::<u32>($($args),*),
            $crate::ArrayDataType::Int64 => $fn::<i64>($($args),*),
            $crate::ArrayDataType::Uint64 => $fn::<u64>($($args),*),
            $crate::ArrayDataType::Float32 => $fn::<f32>($($args),*),
            $crate::ArrayDataType::Float64 => $fn::<f64>($($args),*),
        }
    };
}
