use crate::config::AppConfig;
use crate::storage::entity::{
    chart_computed_field, chart_config, chart_filter, chart_group_by, chart_metric, entity_def,
    entity_relationship, entity_row, entity_view, property, property_option, row_relation,
    row_value,
};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Info);

    let db = Database::connect(opt).await?;

    // 启用 WAL 模式
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA journal_mode=WAL;".to_string(),
    ))
    .await?;

    create_tables(&db).await?;

    info!("Database connection established with WAL mode and table initialized.");

    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = builder.build(schema.create_table_from_entity(entity).if_not_exists());
    db.execute(stmt).await?;
    Ok(())
}

/// 建表（如果不存在）。外键存在，按依赖顺序创建
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    // schema
    create_table(db, entity_def::Entity).await?;
    create_table(db, property::Entity).await?;
    create_table(db, property_option::Entity).await?;
    create_table(db, entity_relationship::Entity).await?;
    create_table(db, entity_view::Entity).await?;

    // rows
    create_table(db, entity_row::Entity).await?;
    create_table(db, row_value::Entity).await?;
    create_table(db, row_relation::Entity).await?;

    // charts
    create_table(db, chart_config::Entity).await?;
    create_table(db, chart_group_by::Entity).await?;
    create_table(db, chart_metric::Entity).await?;
    create_table(db, chart_filter::Entity).await?;
    create_table(db, chart_computed_field::Entity).await?;

    let indexes = [
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_tenant_slug ON entities(tenant_id, slug);",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_properties_entity_name ON properties(entity_id, name);",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_row_values_row_property ON row_values(row_id, property_id);",
        "CREATE INDEX IF NOT EXISTS idx_row_values_property ON row_values(property_id);",
        "CREATE INDEX IF NOT EXISTS idx_entity_rows_scope ON entity_rows(entity_id, tenant_id, created_at);",
        "CREATE INDEX IF NOT EXISTS idx_row_relations_parent ON row_relations(relationship_id, parent_row_id);",
        "CREATE INDEX IF NOT EXISTS idx_chart_configs_group ON chart_configs(group_slug, entity_id);",
    ];
    for sql in indexes {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await?;
    }

    Ok(())
}
