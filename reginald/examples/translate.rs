//! Translate the same query tree for several SQL dialects without
//! touching a database.

use reginald::{
    DataType, Dialect, DialectRegistry, FieldDefinition, FieldOption, FindQuery, Result, SearchOps,
};

fn main() -> Result<()> {
    let registry = DialectRegistry::with_builtins();

    let query = FindQuery::new(reginald::CollectionRef::new("testdb", "user"))
        .get(["id", "name"])
        .where_("age", 30)
        .or(|q| q.where_("age", 40).where_("age", 50))
        .order_by("name", reginald::Direction::Asc)
        .limit(10);

    for name in ["MySQL", "PostgreSQL", "MsSQL"] {
        let dialect = registry.get(name)?;
        let statement = dialect.translate_find(&query, &[])?.into_sql()?;
        println!("{name}:");
        println!("  {}", statement.sql);
        println!("  binds: {:?}", statement.binds);
    }

    // DDL differs more: PostgreSQL splits the index off into its own statement
    let create = reginald::CreateQuery::new(reginald::CollectionRef::new("testdb", "user"))
        .field(
            FieldDefinition::new("id", DataType::Integer)
                .with_options([FieldOption::PrimaryKey, FieldOption::AutoIncrement]),
        )
        .field(
            FieldDefinition::new("name", DataType::String)
                .with_size(64)
                .with_options([FieldOption::Index]),
        );

    let statement = Dialect::postgresql().translate_create(&create)?.into_sql()?;
    println!("PostgreSQL DDL:\n  {}", statement.sql);
    for additional in &statement.additional {
        println!("  then: {}", additional.sql);
    }

    Ok(())
}
