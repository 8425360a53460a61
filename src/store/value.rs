//! Conversion between cached values and the string form kept on disk.

use crate::error::StoreError;

// == Store Value ==
/// A value type the file store can persist as text.
///
/// An empty string always decodes to the type's default (zero or empty), which
/// is how an absent key surfaces from the store.
pub trait StoreValue: Sized + Default {
    fn to_store_string(&self) -> String;

    fn from_store_string(raw: &str) -> Result<Self, StoreError>;
}

impl StoreValue for String {
    fn to_store_string(&self) -> String {
        self.clone()
    }

    fn from_store_string(raw: &str) -> Result<Self, StoreError> {
        Ok(raw.to_string())
    }
}

macro_rules! impl_store_value_for_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StoreValue for $ty {
                fn to_store_string(&self) -> String {
                    self.to_string()
                }

                fn from_store_string(raw: &str) -> Result<Self, StoreError> {
                    if raw.is_empty() {
                        return Ok(<$ty>::default());
                    }
                    raw.trim().parse::<$ty>().map_err(|_| StoreError::Conversion {
                        value: raw.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_store_value_for_scalar!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_decodes_to_default() {
        assert_eq!(String::from_store_string("").unwrap(), "");
        assert_eq!(i32::from_store_string("").unwrap(), 0);
        assert_eq!(u64::from_store_string("").unwrap(), 0);
        assert_eq!(f64::from_store_string("").unwrap(), 0.0);
    }

    #[test]
    fn test_scalar_parsing() {
        assert_eq!(i64::from_store_string("-42").unwrap(), -42);
        assert_eq!(u32::from_store_string(" 7 ").unwrap(), 7);
        assert_eq!(f32::from_store_string("1.5").unwrap(), 1.5);
        assert_eq!(42i32.to_store_string(), "42");
    }

    #[test]
    fn test_malformed_scalar_is_rejected() {
        let err = i32::from_store_string("forty-two").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conversion { target: "i32", .. }
        ));
        assert!(u8::from_store_string("-1").is_err());
    }
}
