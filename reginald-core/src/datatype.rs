//! Storage-neutral column data types and value adapters
//!
//! `DataType` names the abstract column types a create query can declare;
//! every relational dialect maps them onto its own native type names.
//! `AdapterRegistry` converts application types without a native `Value`
//! representation (UUIDs, date-times, decimals) into their stored form and
//! back, keyed by `TypeId` instead of runtime reflection.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Abstract column data type, mapped per dialect to a native type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Double,
    Decimal,
    Float,
    Integer,
    Long,
    Char,
    String,
    LongText,
    Date,
    DateTime,
    Timestamp,
    Binary,
    Uuid,
    Document,
    Boolean,
}

impl DataType {
    pub const ALL: [DataType; 15] = [
        DataType::Double,
        DataType::Decimal,
        DataType::Float,
        DataType::Integer,
        DataType::Long,
        DataType::Char,
        DataType::String,
        DataType::LongText,
        DataType::Date,
        DataType::DateTime,
        DataType::Timestamp,
        DataType::Binary,
        DataType::Uuid,
        DataType::Document,
        DataType::Boolean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Double => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Float => "FLOAT",
            DataType::Integer => "INTEGER",
            DataType::Long => "LONG",
            DataType::Char => "CHAR",
            DataType::String => "STRING",
            DataType::LongText => "LONG_TEXT",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Binary => "BINARY",
            DataType::Uuid => "UUID",
            DataType::Document => "DOCUMENT",
            DataType::Boolean => "BOOLEAN",
        }
    }

    /// Case-insensitive lookup by abstract name, used by the schema loader
    pub fn from_name(name: &str) -> Result<DataType> {
        let upper = name.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == upper)
            .ok_or_else(|| Error::invalid_query(format!("unknown data type '{name}'")))
    }
}

/// Converts one application type to its stored form and back.
///
/// Implementations must round-trip: `read(write(x)) == x` for every value
/// the adapter accepts.
pub trait DataTypeAdapter: Send + Sync {
    type Target;

    fn write(&self, value: &Self::Target) -> Value;

    fn read(&self, value: &Value) -> Result<Self::Target>;
}

/// Explicit `TypeId -> adapter` mapping, built once at startup
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry preloaded with the adapters enabled by type-support features
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "uuid-support")]
        registry.register(UuidAdapter);
        #[cfg(feature = "datetime-support")]
        registry.register(DateTimeAdapter);
        #[cfg(feature = "decimal-support")]
        registry.register(DecimalAdapter);
        registry
    }

    pub fn register<A>(&mut self, adapter: A)
    where
        A: DataTypeAdapter + 'static,
        A::Target: 'static,
    {
        let erased: Arc<dyn DataTypeAdapter<Target = A::Target>> = Arc::new(adapter);
        self.adapters.insert(TypeId::of::<A::Target>(), Box::new(erased));
    }

    pub fn get<T: 'static>(&self) -> Option<Arc<dyn DataTypeAdapter<Target = T>>> {
        self.adapters
            .get(&TypeId::of::<T>())
            .and_then(|a| a.downcast_ref::<Arc<dyn DataTypeAdapter<Target = T>>>())
            .cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.adapters.contains_key(&TypeId::of::<T>())
    }

    /// Convert `value` to its stored form, if an adapter is registered
    pub fn write<T: 'static>(&self, value: &T) -> Option<Value> {
        self.get::<T>().map(|a| a.write(value))
    }

    /// Convert a stored value back to `T`
    pub fn read<T: 'static>(&self, stored: &Value) -> Result<T> {
        match self.get::<T>() {
            Some(adapter) => adapter.read(stored),
            None => Err(Error::translation(format!(
                "no adapter registered for {}",
                std::any::type_name::<T>()
            ))),
        }
    }
}

/// UUIDs travel as 16 bytes, most significant half first
#[cfg(feature = "uuid-support")]
pub struct UuidAdapter;

#[cfg(feature = "uuid-support")]
impl DataTypeAdapter for UuidAdapter {
    type Target = uuid::Uuid;

    fn write(&self, value: &uuid::Uuid) -> Value {
        Value::Bytes(value.as_u128().to_be_bytes().to_vec())
    }

    fn read(&self, value: &Value) -> Result<uuid::Uuid> {
        match value {
            Value::Bytes(bytes) if bytes.len() == 16 => {
                let mut buf = [0u8; 16];
                buf.copy_from_slice(bytes);
                Ok(uuid::Uuid::from_bytes(buf))
            }
            Value::Bytes(_) => Err(Error::conversion("BYTEA", "UUID")),
            Value::String(s) => {
                uuid::Uuid::parse_str(s).map_err(|_| Error::conversion("TEXT", "UUID"))
            }
            other => Err(Error::conversion(other.type_name(), "UUID")),
        }
    }
}

/// Naive date-times travel as `YYYY-MM-DD HH:MM:SS[.fff]` strings
#[cfg(feature = "datetime-support")]
pub struct DateTimeAdapter;

#[cfg(feature = "datetime-support")]
impl DataTypeAdapter for DateTimeAdapter {
    type Target = chrono::NaiveDateTime;

    fn write(&self, value: &chrono::NaiveDateTime) -> Value {
        Value::String(value.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }

    fn read(&self, value: &Value) -> Result<chrono::NaiveDateTime> {
        match value {
            Value::String(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| Error::conversion("TEXT", "DATETIME")),
            other => Err(Error::conversion(other.type_name(), "DATETIME")),
        }
    }
}

/// Decimals travel as exact decimal strings
#[cfg(feature = "decimal-support")]
pub struct DecimalAdapter;

#[cfg(feature = "decimal-support")]
impl DataTypeAdapter for DecimalAdapter {
    type Target = rust_decimal::Decimal;

    fn write(&self, value: &rust_decimal::Decimal) -> Value {
        Value::String(value.to_string())
    }

    fn read(&self, value: &Value) -> Result<rust_decimal::Decimal> {
        match value {
            Value::String(s) => rust_decimal::Decimal::from_str_exact(s)
                .map_err(|_| Error::conversion("TEXT", "DECIMAL")),
            Value::I32(i) => Ok(rust_decimal::Decimal::from(*i)),
            Value::I64(i) => Ok(rust_decimal::Decimal::from(*i)),
            other => Err(Error::conversion(other.type_name(), "DECIMAL")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_name() {
        assert_eq!(DataType::from_name("string").unwrap(), DataType::String);
        assert_eq!(DataType::from_name("LONG_TEXT").unwrap(), DataType::LongText);
        assert_eq!(DataType::from_name("Uuid").unwrap(), DataType::Uuid);
        assert!(DataType::from_name("varchar2").is_err());
    }

    #[test]
    fn test_missing_adapter_is_an_error() {
        let registry = AdapterRegistry::new();
        let result: Result<i32> = registry.read(&Value::I32(1));
        assert!(result.is_err());
        assert!(!registry.contains::<i32>());
    }

    #[cfg(feature = "uuid-support")]
    #[test]
    fn test_uuid_round_trip() {
        let registry = AdapterRegistry::with_builtins();
        let id = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();

        let stored = registry.write(&id).unwrap();
        match &stored {
            Value::Bytes(bytes) => {
                assert_eq!(bytes.len(), 16);
                // most significant half first
                assert_eq!(&bytes[..4], &[0x67, 0xe5, 0x50, 0x44]);
            }
            other => panic!("expected bytes, got {other:?}"),
        }

        let back: uuid::Uuid = registry.read(&stored).unwrap();
        assert_eq!(back, id);
    }

    #[cfg(feature = "uuid-support")]
    #[test]
    fn test_uuid_rejects_short_bytes() {
        let registry = AdapterRegistry::with_builtins();
        let result: Result<uuid::Uuid> = registry.read(&Value::Bytes(vec![1, 2, 3]));
        assert!(matches!(result, Err(Error::Conversion { .. })));
    }

    #[cfg(feature = "datetime-support")]
    #[test]
    fn test_datetime_round_trip() {
        let registry = AdapterRegistry::with_builtins();
        let dt = chrono::NaiveDate::from_ymd_opt(2021, 3, 14)
            .unwrap()
            .and_hms_milli_opt(9, 26, 53, 589)
            .unwrap();

        let stored = registry.write(&dt).unwrap();
        let back: chrono::NaiveDateTime = registry.read(&stored).unwrap();
        assert_eq!(back, dt);
    }

    #[cfg(feature = "decimal-support")]
    #[test]
    fn test_decimal_round_trip() {
        let registry = AdapterRegistry::with_builtins();
        let dec = rust_decimal::Decimal::from_str_exact("1234.5678").unwrap();

        let stored = registry.write(&dec).unwrap();
        let back: rust_decimal::Decimal = registry.read(&stored).unwrap();
        assert_eq!(back, dec);
    }
}
