//! Per-vendor translation rules for the relational family
//!
//! One shared SQL walker drives every relational dialect; everything a vendor
//! does differently lives in a `RelationalRules` value instead of a dialect
//! subclass.

use crate::datatype::DataType;

/// Native type mapping of one abstract data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTypeInfo {
    pub name: &'static str,
    pub sizeable: bool,
    pub default_size: Option<u32>,
}

impl DataTypeInfo {
    const fn sized(name: &'static str, default_size: u32) -> Self {
        Self {
            name,
            sizeable: true,
            default_size: Some(default_size),
        }
    }

    const fn sizeable(name: &'static str) -> Self {
        Self {
            name,
            sizeable: true,
            default_size: None,
        }
    }

    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            sizeable: false,
            default_size: None,
        }
    }
}

/// How auto-increment columns are declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrementStyle {
    /// `AUTO_INCREMENT` keyword after the type
    Keyword,
    /// Column type rewritten to `SERIAL`, no keyword
    Serial,
    /// `IDENTITY(1,1)` after the type
    Identity,
}

/// How column defaults are carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValueStyle {
    /// `DEFAULT ?` with the value bound
    Bind,
    /// Value rendered inline, strings quoted
    Inline,
}

/// Where index declarations go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStyle {
    /// `,INDEX name(field)` fragments inside the definition list
    Inline,
    /// `CREATE INDEX IF NOT EXISTS …` statements executed after the create
    SeparateStatement,
}

/// How result windows are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT ? OFFSET ?`, binds `[limit, offset]`
    LimitOffset,
    /// `OFFSET ? ROWS FETCH NEXT ? ROWS ONLY`, binds `[offset, limit]`
    OffsetFetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    Question,
    /// `?` renumbered to `$1…$n` in a final quote-aware pass
    Dollar,
}

/// How generated keys come back from an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeysStyle {
    /// `RETURNING <keys>` appended, rows fetched directly
    Returning,
    /// Key rows synthesized from last-insert-id and the affected-row count
    LastInsertId,
}

/// Everything one relational vendor does differently from the others
#[derive(Debug, Clone, Copy)]
pub struct RelationalRules {
    pub quote_open: char,
    pub quote_close: char,
    pub type_info: fn(DataType) -> DataTypeInfo,
    pub auto_increment: AutoIncrementStyle,
    pub default_values: DefaultValueStyle,
    pub index_style: IndexStyle,
    pub limit_style: LimitStyle,
    pub placeholders: PlaceholderStyle,
    pub generated_keys: GeneratedKeysStyle,
    pub supports_replace: bool,
    pub supports_engine: bool,
    /// Primary-key columns get an implicit UNIQUE so they stay valid
    /// foreign-key targets
    pub primary_key_implies_unique: bool,
}

impl RelationalRules {
    /// MySQL, MariaDB and the embedded H2 share one rule set
    pub fn mysql_family() -> Self {
        Self {
            quote_open: '`',
            quote_close: '`',
            type_info: mysql_type_info,
            auto_increment: AutoIncrementStyle::Keyword,
            default_values: DefaultValueStyle::Bind,
            index_style: IndexStyle::Inline,
            limit_style: LimitStyle::LimitOffset,
            placeholders: PlaceholderStyle::Question,
            generated_keys: GeneratedKeysStyle::LastInsertId,
            supports_replace: true,
            supports_engine: true,
            primary_key_implies_unique: false,
        }
    }

    pub fn postgres() -> Self {
        Self {
            quote_open: '"',
            quote_close: '"',
            type_info: postgres_type_info,
            auto_increment: AutoIncrementStyle::Serial,
            default_values: DefaultValueStyle::Inline,
            index_style: IndexStyle::SeparateStatement,
            limit_style: LimitStyle::LimitOffset,
            placeholders: PlaceholderStyle::Dollar,
            generated_keys: GeneratedKeysStyle::Returning,
            supports_replace: false,
            supports_engine: false,
            primary_key_implies_unique: true,
        }
    }

    pub fn mssql() -> Self {
        Self {
            quote_open: '[',
            quote_close: ']',
            type_info: mssql_type_info,
            auto_increment: AutoIncrementStyle::Identity,
            default_values: DefaultValueStyle::Inline,
            index_style: IndexStyle::Inline,
            limit_style: LimitStyle::OffsetFetch,
            placeholders: PlaceholderStyle::Question,
            generated_keys: GeneratedKeysStyle::LastInsertId,
            supports_replace: false,
            supports_engine: false,
            primary_key_implies_unique: false,
        }
    }

    pub fn quote(&self, part: &str) -> String {
        format!("{}{}{}", self.quote_open, part, self.quote_close)
    }
}

fn mysql_type_info(data_type: DataType) -> DataTypeInfo {
    match data_type {
        DataType::Double => DataTypeInfo::sizeable("DOUBLE"),
        DataType::Decimal => DataTypeInfo::sizeable("DECIMAL"),
        DataType::Float => DataTypeInfo::sizeable("REAL"),
        DataType::Integer => DataTypeInfo::sizeable("INTEGER"),
        DataType::Long => DataTypeInfo::sized("BIGINT", 8),
        DataType::Char => DataTypeInfo::sized("CHAR", 1),
        DataType::String => DataTypeInfo::sized("VARCHAR", 255),
        DataType::LongText => DataTypeInfo::plain("LONGTEXT"),
        DataType::Date => DataTypeInfo::sizeable("DATE"),
        DataType::DateTime => DataTypeInfo::sizeable("DATETIME"),
        DataType::Timestamp => DataTypeInfo::sizeable("TIMESTAMP"),
        DataType::Binary => DataTypeInfo::sizeable("BINARY"),
        DataType::Uuid => DataTypeInfo::sized("BINARY", 16),
        DataType::Document => DataTypeInfo::plain("LONGTEXT"),
        DataType::Boolean => DataTypeInfo::sized("BIT", 1),
    }
}

fn postgres_type_info(data_type: DataType) -> DataTypeInfo {
    match data_type {
        DataType::Double => DataTypeInfo::sizeable("DOUBLE PRECISION"),
        DataType::Decimal => DataTypeInfo::sizeable("DECIMAL"),
        DataType::Float => DataTypeInfo::sizeable("FLOAT"),
        DataType::Integer => DataTypeInfo::sizeable("INTEGER"),
        DataType::Long => DataTypeInfo::plain("BIGINT"),
        DataType::Char => DataTypeInfo::sized("CHAR", 1),
        DataType::String => DataTypeInfo::sized("VARCHAR", 255),
        DataType::LongText => DataTypeInfo::plain("TEXT"),
        DataType::Date => DataTypeInfo::sizeable("DATE"),
        DataType::DateTime => DataTypeInfo::sizeable("TIMESTAMP"),
        DataType::Timestamp => DataTypeInfo::sizeable("TIMESTAMP"),
        DataType::Binary => DataTypeInfo::plain("BYTEA"),
        DataType::Uuid => DataTypeInfo::plain("BYTEA"),
        DataType::Document => DataTypeInfo::plain("TEXT"),
        DataType::Boolean => DataTypeInfo::plain("BOOLEAN"),
    }
}

fn mssql_type_info(data_type: DataType) -> DataTypeInfo {
    match data_type {
        DataType::Boolean => DataTypeInfo::plain("BIT"),
        other => mysql_type_info(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_type_defaults() {
        let info = mysql_type_info(DataType::String);
        assert_eq!(info.name, "VARCHAR");
        assert_eq!(info.default_size, Some(255));

        let info = mysql_type_info(DataType::Uuid);
        assert_eq!(info.name, "BINARY");
        assert_eq!(info.default_size, Some(16));

        assert!(!mysql_type_info(DataType::LongText).sizeable);
    }

    #[test]
    fn test_postgres_type_overrides() {
        assert_eq!(postgres_type_info(DataType::Uuid).name, "BYTEA");
        assert_eq!(postgres_type_info(DataType::DateTime).name, "TIMESTAMP");
        assert!(!postgres_type_info(DataType::Long).sizeable);
    }

    #[test]
    fn test_mssql_bit_is_not_sizeable() {
        let info = mssql_type_info(DataType::Boolean);
        assert_eq!(info.name, "BIT");
        assert!(!info.sizeable);
        // everything else follows the MySQL table
        assert_eq!(mssql_type_info(DataType::String).name, "VARCHAR");
    }

    #[test]
    fn test_quote_pairs() {
        assert_eq!(RelationalRules::mysql_family().quote("user"), "`user`");
        assert_eq!(RelationalRules::postgres().quote("user"), "\"user\"");
        assert_eq!(RelationalRules::mssql().quote("user"), "[user]");
    }
}
