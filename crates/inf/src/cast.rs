use num::NumCast;

/// Check if a f64 value can be represented by the given numerical type.
pub fn fits_in_type<T: NumCast>(v: f64) -> bool {
    let x: Option<T> = NumCast::from(v);
    x.is_some()
}

pub fn option<To: NumCast>(from: Option<impl NumCast>) -> Option<To> {
    from.and_then(|x| NumCast::from(x))
}

/// Converts the value, falling back to `default` when it is not representable in the target type.
pub fn value_or<To: NumCast>(from: impl NumCast, default: To) -> To {
    NumCast::from(from).unwrap_or(default)
}
