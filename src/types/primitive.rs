//! Scalar kinds: bool, fixed-width integers and floats.

use super::{compare_with, push_element, Borrowed, Type, TypeDescriptor};
use crate::codec::BlobInput;
use crate::error::BlobError;
use crate::value::{cast, Value};
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

/// A scalar with a fixed little-endian wire width.
pub trait Scalar: Copy + Default + fmt::Display + Send + Sync + 'static {
    const WIDTH: usize;
    fn write_le(self, out: &mut Vec<u8>);
    /// `bytes` holds at least `WIDTH` bytes.
    fn read_le(bytes: &[u8]) -> Self;
    fn order(a: Self, b: Self) -> Ordering;
    #[cfg(feature = "json")]
    fn json(self) -> serde_json::Value;
}

macro_rules! int_scalar {
    ($($t:ty => $json:expr),* $(,)?) => {
        $(
            impl Scalar for $t {
                const WIDTH: usize = core::mem::size_of::<$t>();

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$t>::from_le_bytes(raw)
                }

                fn order(a: Self, b: Self) -> Ordering {
                    a.cmp(&b)
                }

                #[cfg(feature = "json")]
                fn json(self) -> serde_json::Value {
                    let f: fn($t) -> serde_json::Value = $json;
                    f(self)
                }
            }
        )*
    };
}

int_scalar!(
    i8 => serde_json::Value::from,
    u8 => serde_json::Value::from,
    i16 => serde_json::Value::from,
    u16 => serde_json::Value::from,
    i32 => serde_json::Value::from,
    u32 => serde_json::Value::from,
    i64 => serde_json::Value::from,
    u64 => serde_json::Value::from,
    i128 => |v| i64::try_from(v)
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::String(v.to_string())),
    u128 => |v| u64::try_from(v)
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::String(v.to_string())),
);

macro_rules! float_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const WIDTH: usize = core::mem::size_of::<$t>();

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$t>::from_le_bytes(raw)
                }

                fn order(a: Self, b: Self) -> Ordering {
                    a.total_cmp(&b)
                }

                #[cfg(feature = "json")]
                fn json(self) -> serde_json::Value {
                    serde_json::Number::from_f64(f64::from(self))
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
        )*
    };
}

float_scalar!(f32, f64);

impl Scalar for bool {
    const WIDTH: usize = 1;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn order(a: Self, b: Self) -> Ordering {
        a.cmp(&b)
    }

    #[cfg(feature = "json")]
    fn json(self) -> serde_json::Value {
        serde_json::Value::Bool(self)
    }
}

/// Descriptor for a `Scalar` kind.
pub struct Primitive<T> {
    name: &'static str,
    xml_name: &'static str,
    _repr: PhantomData<fn() -> T>,
}

impl<T> Primitive<T> {
    pub const fn new(name: &'static str, xml_name: &'static str) -> Self {
        Primitive {
            name,
            xml_name,
            _repr: PhantomData,
        }
    }
}

impl<T: Scalar> TypeDescriptor for Primitive<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn xml_name(&self) -> Option<&'static str> {
        Some(self.xml_name)
    }

    fn data_is_pointer(&self) -> bool {
        false
    }

    fn accepts(&self, v: &dyn Any) -> bool {
        cast::<T>(v).is_some()
    }

    fn create(&self) -> Value {
        Value::new(T::default())
    }

    fn copy(&self, v: &dyn Any) -> Option<Value> {
        cast::<T>(v).map(|x| Value::new(*x))
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        compare_with(cast::<T>(a), cast::<T>(b), |a, b| T::order(*a, *b))
    }

    fn size(&self, _v: &dyn Any) -> usize {
        core::mem::size_of::<T>()
    }

    fn format_value(&self, v: &dyn Any) -> String {
        cast::<T>(v).map(ToString::to_string).unwrap_or_default()
    }

    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        let x = cast::<T>(v).ok_or(BlobError::TypeMismatch(self.name))?;
        x.write_le(out);
        Ok(())
    }

    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        let bytes = input.bytes();
        if bytes.len() < T::WIDTH {
            return Err(BlobError::Truncated {
                needed: T::WIDTH,
                available: bytes.len(),
            });
        }
        Ok((Value::new(T::read_le(bytes)), T::WIDTH))
    }

    fn clear(&self, v: &mut Value) {
        if let Some(x) = v.downcast_mut::<T>() {
            *x = T::default();
        }
    }

    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        push_element(out, element, &self.format_value(v));
    }

    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        cast::<T>(v)
            .map(|x| x.json())
            .unwrap_or(serde_json::Value::Null)
    }
}

macro_rules! primitive_types {
    ($($t:ty: $desc:ident, $twin_desc:ident => $public:ident, $twin:ident = $name:literal, $xml:literal;)*) => {
        $(
            static $desc: Primitive<$t> = Primitive::new($name, $xml);
            static $twin_desc: Borrowed = Borrowed::new(&$desc);
            #[doc = concat!("`", stringify!($t), "` values.")]
            pub static $public: Type = &$desc;
            #[doc = concat!("Borrowing twin of [`", stringify!($public), "`].")]
            pub static $twin: Type = &$twin_desc;
        )*
    };
}

primitive_types! {
    bool: BOOL_DESC, BOOL_NC => BOOL, BOOL_NO_COPY = "bool", "xs:boolean";
    i8: I8_DESC, I8_NC => I8, I8_NO_COPY = "i8", "xs:byte";
    u8: U8_DESC, U8_NC => U8, U8_NO_COPY = "u8", "xs:unsignedByte";
    i16: I16_DESC, I16_NC => I16, I16_NO_COPY = "i16", "xs:short";
    u16: U16_DESC, U16_NC => U16, U16_NO_COPY = "u16", "xs:unsignedShort";
    i32: I32_DESC, I32_NC => I32, I32_NO_COPY = "i32", "xs:int";
    u32: U32_DESC, U32_NC => U32, U32_NO_COPY = "u32", "xs:unsignedInt";
    i64: I64_DESC, I64_NC => I64, I64_NO_COPY = "i64", "xs:long";
    u64: U64_DESC, U64_NC => U64, U64_NO_COPY = "u64", "xs:unsignedLong";
    i128: I128_DESC, I128_NC => I128, I128_NO_COPY = "i128", "xs:integer";
    u128: U128_DESC, U128_NC => U128, U128_NO_COPY = "u128", "xs:nonNegativeInteger";
    f32: F32_DESC, F32_NC => F32, F32_NO_COPY = "f32", "xs:float";
    f64: F64_DESC, F64_NC => F64, F64_NO_COPY = "f64", "xs:double";
}
