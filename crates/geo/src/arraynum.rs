use crate::{ArrayDataType, Nodata};

// Type requirements for pixel data in rasters
pub trait ArrayNum:
    Copy
    + Nodata
    + num::Num
    + num::NumCast
    + num::Bounded
    + std::cmp::PartialOrd
    + std::fmt::Debug
    + std::fmt::Display
    + Send
    + Sync
    + 'static
{
    const TYPE: ArrayDataType;
    const IS_SIGNED: bool;

    /// Lossless for all integer types up to 32 bits, 64 bit integers beyond 2^53 are rounded.
    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// Converts a value given as f64 (e.g. a nodata sentinel), integer types only accept whole values within their range.
    /// Floating point types accept any value within range, rounded to the nearest representable value.
    fn from_f64_exact(value: f64) -> Option<Self> {
        let converted = <Self as num::NumCast>::from(value)?;
        (Self::TYPE.is_floating() || converted.to_f64_lossy() == value).then_some(converted)
    }
}

macro_rules! impl_array_num {
    ( $t:ident, $dtype:ident, $signed:literal ) => {
        impl ArrayNum for $t {
            const TYPE: ArrayDataType = ArrayDataType::$dtype;
            const IS_SIGNED: bool = $signed;
        }
    };
}

impl_array_num!(i8, Int8, true);
impl_array_num!(u8, Uint8, false);
impl_array_num!(i16, Int16, true);
impl_array_num!(u16, Uint16, false);
impl_array_num!(i32, Int32, true);
impl_array_num!(u32, Uint32, false);
impl_array_num!(i64, Int64, true);
impl_array_num!(u64, Uint64, false);
impl_array_num!(f32, Float32, true);
impl_array_num!(f64, Float64, true);

#[cfg(test)]
#[generic_tests::define]
mod generictests {
    use super::*;

    #[test]
    fn type_matches_nodata_convention<T: ArrayNum>() {
        let default_nodata = T::TYPE.default_nodata_value();
        if T::TYPE.is_floating() {
            assert!(T::NODATA.to_f64_lossy().is_nan());
            assert!(default_nodata.is_nan());
        } else {
            assert_eq!(T::NODATA.to_f64_lossy(), default_nodata);
        }

        assert_eq!(T::IS_SIGNED, T::TYPE.is_signed());
    }

    #[test]
    fn exact_conversion<T: ArrayNum>() {
        assert_eq!(T::from_f64_exact(7.0), Some(num::NumCast::from(7).unwrap()));
        assert_eq!(T::from_f64_exact(1e20).is_some(), T::TYPE.is_floating());

        if T::TYPE.is_floating() {
            assert!(T::from_f64_exact(2.5).is_some());
        } else {
            assert_eq!(T::from_f64_exact(2.5), None);
        }
    }

    #[instantiate_tests(<u8>)]
    mod uint8 {}
    #[instantiate_tests(<i16>)]
    mod int16 {}
    #[instantiate_tests(<u32>)]
    mod uint32 {}
    #[instantiate_tests(<i32>)]
    mod int32 {}
    #[instantiate_tests(<f32>)]
    mod float32 {}
    #[instantiate_tests(<f64>)]
    mod float64 {}
}
