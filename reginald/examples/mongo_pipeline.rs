//! The same builder tree compiled to MongoDB stage documents.

use reginald::{CollectionRef, Dialect, FindQuery, MongoStatement, Result, SearchOps, Statement};

fn main() -> Result<()> {
    let dialect = Dialect::mongodb();

    let query = FindQuery::new(CollectionRef::new("testdb", "user"))
        .where_("age", 30)
        .or(|q| q.where_("age", 40).where_("age", 50))
        .limit(10)
        .offset(5);

    match dialect.translate_find(&query, &[])? {
        Statement::Mongo(MongoStatement::Find {
            collection,
            pipeline,
        }) => {
            println!("db.{collection}.aggregate([");
            for stage in &pipeline {
                println!("  {stage},");
            }
            println!("])");
        }
        other => println!("unexpected translation: {other:?}"),
    }

    Ok(())
}
