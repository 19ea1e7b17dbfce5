use num_traits::{NumCast, PrimInt};

/// Checked narrowing conversion between integer types.
/// Returns `None` when the value does not fit the target width.
#[inline]
pub fn narrow<T: PrimInt, U: PrimInt + NumCast>(value: T) -> Option<U> {
    num_traits::cast(value)
}

/// Narrowing conversion that saturates at the target maximum instead of
/// failing. BIOS services that report sizes in 16-bit registers use this
/// (a 64 MiB machine still answers AH=88h with a clamped KB count).
#[inline]
pub fn saturate<T: PrimInt, U: PrimInt + NumCast>(value: T) -> U {
    num_traits::cast(value).unwrap_or_else(U::max_value)
}
