//! Host-side values and declared types.
//!
//! [`Value`] is what crosses the boundary, [`HostType`] is what the host declared
//! for a parameter or return slot. Rust types opt in through [`HostTyped`],
//! [`IntoValue`] and [`FromValue`]; the marshaling layer only ever sees the
//! `Value`/`HostType` pair.

use std::fmt;

use crate::{
    error::{Error, Result},
    object::PyObject,
};

/// Declared host type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    /// Return only: the result is discarded.
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    F32,
    F64,
    Str,
    /// The generic object wrapper.
    Object,
    /// A proxy for the named interface.
    Interface(&'static str),
    Array(Box<HostType>),
    /// No declared type: the value's own kind decides.
    Any,
}

impl HostType {
    /// Scalars that cannot be null on the host side.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::F32 | Self::F64
        )
    }

    /// Inclusive range of an integer type.
    #[must_use]
    pub fn int_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::I16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::I32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::U8 => Some((0, u8::MAX.into())),
            Self::U16 => Some((0, u16::MAX.into())),
            Self::U32 => Some((0, u32::MAX.into())),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::I8 => f.write_str("i8"),
            Self::I16 => f.write_str("i16"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::U8 => f.write_str("u8"),
            Self::U16 => f.write_str("u16"),
            Self::U32 => f.write_str("u32"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Str => f.write_str("str"),
            Self::Object => f.write_str("PyObject"),
            Self::Interface(name) => f.write_str(name),
            Self::Array(item) => write!(f, "[{item}]"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// A host value on its way into or out of the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(PyObject),
}

impl Value {
    /// Short name of the variant, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Array(_) => "array",
            Self::Object(_) => "PyObject",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Object(obj) => obj.is_null(),
            _ => false,
        }
    }

    fn mismatch(&self, target: &str) -> Error {
        Error::conversion(format!("cannot convert {} to {target}", self.kind_name()))
    }
}

/// Rust types with a declared [`HostType`].
pub trait HostTyped {
    fn host_type() -> HostType;
}

/// Argument direction: Rust value to [`Value`].
pub trait IntoValue: HostTyped {
    fn into_value(self) -> Value;
}

/// Return direction: [`Value`] to Rust value.
pub trait FromValue: HostTyped + Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl HostTyped for () {
    fn host_type() -> HostType {
        HostType::Void
    }
}

impl FromValue for () {
    fn from_value(_value: Value) -> Result<Self> {
        Ok(())
    }
}

impl HostTyped for bool {
    fn host_type() -> HostType {
        HostType::Bool
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty => $host:ident),* $(,)?) => {$(
        impl HostTyped for $ty {
            fn host_type() -> HostType {
                HostType::$host
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::Int(self.into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                        Error::conversion(format!("{i} is out of range for {}", stringify!($ty)))
                    }),
                    other => Err(other.mismatch(stringify!($ty))),
                }
            }
        }
    )*};
}

int_value!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, u8 => U8, u16 => U16, u32 => U32);

impl HostTyped for f64 {
    fn host_type() -> HostType {
        HostType::F64
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    #[expect(clippy::cast_precision_loss, reason = "int to float widening")]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl HostTyped for f32 {
    fn host_type() -> HostType {
        HostType::F32
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self.into())
    }
}

impl FromValue for f32 {
    #[expect(clippy::cast_possible_truncation, reason = "range checked before narrowing")]
    fn from_value(value: Value) -> Result<Self> {
        let f = f64::from_value(value).map_err(|err| err.context("f32"))?;
        if f.is_finite() && f.abs() > f64::from(f32::MAX) {
            return Err(Error::conversion(format!("{f} is out of range for f32")));
        }
        Ok(f as f32)
    }
}

impl HostTyped for String {
    fn host_type() -> HostType {
        HostType::Str
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }
}

impl HostTyped for &str {
    fn host_type() -> HostType {
        HostType::Str
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl HostTyped for PyObject {
    fn host_type() -> HostType {
        HostType::Object
    }
}

impl IntoValue for PyObject {
    fn into_value(self) -> Value {
        if self.is_null() { Value::Null } else { Value::Object(self) }
    }
}

impl FromValue for PyObject {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::NULL),
            Value::Object(obj) => Ok(obj),
            other => Err(other.mismatch("PyObject")),
        }
    }
}

impl HostTyped for Value {
    fn host_type() -> HostType {
        HostType::Any
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: HostTyped> HostTyped for Vec<T> {
    fn host_type() -> HostType {
        HostType::Array(Box::new(T::host_type()))
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|err| err.context(format!("item {i}"))))
                .collect(),
            other => Err(other.mismatch("array")),
        }
    }
}

/// Optional values map `None` to the interpreter's null. Only reference types
/// (`str`, objects, arrays) accept null at the boundary.
impl<T: HostTyped> HostTyped for Option<T> {
    fn host_type() -> HostType {
        T::host_type()
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() { Ok(None) } else { T::from_value(value).map(Some) }
    }
}

/// Argument values of one call together with their declared types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub(crate) values: Vec<Value>,
    pub(crate) types: Vec<HostType>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a typed argument.
    #[must_use]
    pub fn arg<T: IntoValue>(mut self, value: T) -> Self {
        self.types.push(T::host_type());
        self.values.push(value.into_value());
        self
    }

    /// Appends an argument with an explicit declared type.
    #[must_use]
    pub fn typed(mut self, value: Value, ty: HostType) -> Self {
        self.values.push(value);
        self.types.push(ty);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Vec<HostType>) {
        (self.values, self.types)
    }
}

/// Conversion of a tuple of Rust values into [`Args`].
pub trait IntoArgs {
    fn into_args(self) -> Args;
}

impl IntoArgs for Args {
    fn into_args(self) -> Args {
        self
    }
}

impl IntoArgs for () {
    fn into_args(self) -> Args {
        Args::new()
    }
}

/// Untyped argument list; every slot is declared [`HostType::Any`].
impl IntoArgs for Vec<Value> {
    fn into_args(self) -> Args {
        let types = vec![HostType::Any; self.len()];
        Args { values: self, types }
    }
}

macro_rules! tuple_args {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoArgs for ($($name,)+) {
            #[expect(non_snake_case, reason = "tuple fields reuse type parameter names")]
            fn into_args(self) -> Args {
                let ($($name,)+) = self;
                Args::new()$(.arg($name))+
            }
        }
    };
}

tuple_args!(A);
tuple_args!(A, B);
tuple_args!(A, B, C);
tuple_args!(A, B, C, D);
tuple_args!(A, B, C, D, E);
tuple_args!(A, B, C, D, E, F);
tuple_args!(A, B, C, D, E, F, G);
tuple_args!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn tuple_args_carry_declared_types() {
        let args = ("A", 3_i32, vec![1.5_f32]).into_args();
        assert_eq!(
            args.types,
            vec![HostType::Str, HostType::I32, HostType::Array(Box::new(HostType::F32))]
        );
        assert_eq!(
            args.values,
            vec![Value::Str("A".to_owned()), Value::Int(3), Value::Array(vec![Value::Float(1.5)])]
        );
    }

    #[test]
    fn untyped_args_are_any() {
        let args = vec![Value::Int(1), Value::Null].into_args();
        assert_eq!(args.types, vec![HostType::Any, HostType::Any]);
    }

    #[test]
    fn int_narrowing_is_range_checked() {
        assert_eq!(i8::from_value(Value::Int(127)).unwrap(), 127);
        assert_eq!(i8::from_value(Value::Int(128)).unwrap_err().kind(), ErrorKind::Conversion);
        assert_eq!(u8::from_value(Value::Int(-1)).unwrap_err().kind(), ErrorKind::Conversion);
        assert_eq!(i32::from_value(Value::Float(1.0)).unwrap_err().kind(), ErrorKind::Conversion);
    }

    #[test]
    fn floats_widen_from_ints() {
        assert!((f64::from_value(Value::Int(2)).unwrap() - 2.0).abs() < f64::EPSILON);
        assert_eq!(f32::from_value(Value::Float(1e300)).unwrap_err().kind(), ErrorKind::Conversion);
    }

    #[test]
    fn options_map_null() {
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::Str("x".to_owned())).unwrap(),
            Some("x".to_owned())
        );
        assert_eq!(Some("x").into_value(), Value::Str("x".to_owned()));
        assert_eq!(None::<&str>.into_value(), Value::Null);
    }

    #[test]
    fn null_object_becomes_null_value() {
        assert_eq!(PyObject::NULL.into_value(), Value::Null);
        assert_eq!(PyObject::from_value(Value::Null).unwrap(), PyObject::NULL);
    }

    #[test]
    fn host_type_display() {
        assert_eq!(Vec::<Vec<i32>>::host_type().to_string(), "[[i32]]");
        assert!(HostType::F32.is_primitive());
        assert!(!HostType::Str.is_primitive());
        assert_eq!(HostType::U8.int_range(), Some((0, 255)));
        assert!(HostType::F32.is_float());
        assert!(!HostType::I64.is_float());
    }
}
